use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    CancelToken, ChartSeries, DerivedMetrics, Execution, RunOptions, SimulationError,
    SimulationParameters, Suggestion, chart_series, derive_metrics, simulate_down_payment,
    simulate_mortgage, suggest, validate,
};

#[derive(Parser, Debug)]
#[command(
    name = "homeplan",
    about = "Monte Carlo home purchase planner (down-payment saving + mortgage holding period)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API
    Serve {
        #[arg(default_value_t = 8080)]
        port: u16,
    },
    /// Run both phases once and print the report as JSON
    Simulate(PlanArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[arg(long, default_value_t = 800_000.0, help = "Savings already set aside")]
    initial_savings: f64,
    #[arg(long, default_value_t = 30_000.0)]
    monthly_savings: f64,
    #[arg(
        long,
        default_value_t = 85_000.0,
        help = "Monthly take-home income after the purchase"
    )]
    monthly_income: f64,
    #[arg(
        long,
        default_value_t = 25_000.0,
        help = "Monthly living expenses excluding mortgage and holding costs"
    )]
    monthly_expenses: f64,
    #[arg(long, default_value_t = 15_000_000.0)]
    target_house_price: f64,
    #[arg(long, default_value_t = 20.0, help = "Down payment in percent of price")]
    down_payment_ratio: f64,
    #[arg(long, default_value_t = 10)]
    prep_years_limit: u32,
    #[arg(long, default_value_t = 30)]
    mortgage_years: u32,
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Expected annual return while saving, in percent"
    )]
    annual_return_mean: f64,
    #[arg(
        long,
        default_value_t = 16.0,
        help = "Annual return volatility while saving, in percent"
    )]
    annual_return_std: f64,
    #[arg(long, default_value_t = 2.2, help = "Annual mortgage rate in percent")]
    mortgage_rate: f64,
    #[arg(
        long,
        default_value_t = 0.6,
        help = "Yearly holding cost (tax, fees, upkeep) in percent of price"
    )]
    annual_holding_cost_ratio: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Expected annual return after the purchase, in percent"
    )]
    post_purchase_return_mean: f64,
    #[arg(
        long,
        default_value_t = 14.0,
        help = "Annual return volatility after the purchase, in percent"
    )]
    post_purchase_return_std: f64,
    #[arg(long, default_value_t = 2_000)]
    simulations: u32,
    #[arg(long, help = "Fix the random seed for reproducible runs")]
    seed: Option<u64>,
    #[arg(long, help = "Run trials on all cores")]
    parallel: bool,
    #[arg(long, help = "Include every trial's trajectory in the report")]
    include_trajectories: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    initial_savings: Option<f64>,
    monthly_savings: Option<f64>,
    monthly_income: Option<f64>,
    monthly_expenses: Option<f64>,
    house_price: Option<f64>,
    down_payment: Option<f64>,
    prep_years: Option<u32>,
    mortgage_years: Option<u32>,
    return_mean: Option<f64>,
    return_vol: Option<f64>,
    mortgage_rate: Option<f64>,
    holding_cost: Option<f64>,
    holding_return_mean: Option<f64>,
    holding_return_vol: Option<f64>,
    simulations: Option<u32>,
    seed: Option<u64>,
    parallel: Option<bool>,
    include_trajectories: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub params: SimulationParameters,
    pub seed: Option<u64>,
    pub execution: Execution,
    pub include_trajectories: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PhaseOneSummary {
    success_rate: f64,
    average_years_to_goal: Option<f64>,
    target_down_payment: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    trajectories: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PhaseTwoSummary {
    monthly_mortgage_payment: f64,
    monthly_holding_cost: f64,
    asset_depletion_risk: f64,
    loan_amount: f64,
    surviving_trials: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    trajectories: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    parameters: SimulationParameters,
    seed: u64,
    execution: Execution,
    phase_one: PhaseOneSummary,
    phase_two: PhaseTwoSummary,
    metrics: DerivedMetrics,
    suggestions: Vec<Suggestion>,
    accumulation_chart: ChartSeries,
    net_worth_chart: ChartSeries,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Cancels the wrapped token when dropped, so a simulation whose request was
/// abandoned stops at the next trial boundary.
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

pub async fn run_cli(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Simulate(args) => {
            let request = build_request(args)?;
            let report = run_plan(&request, None).map_err(|e| e.to_string())?;
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| format!("Failed to encode report: {e}"))?;
            println!("{json}");
            Ok(())
        }
    }
}

fn build_request(args: PlanArgs) -> Result<RunRequest, String> {
    let params = SimulationParameters {
        initial_savings: args.initial_savings,
        monthly_savings: args.monthly_savings,
        monthly_income: args.monthly_income,
        monthly_expenses: args.monthly_expenses,
        target_house_price: args.target_house_price,
        down_payment_ratio: args.down_payment_ratio / 100.0,
        prep_years_limit: args.prep_years_limit,
        mortgage_years: args.mortgage_years,
        annual_return_mean: args.annual_return_mean / 100.0,
        annual_return_std: args.annual_return_std / 100.0,
        mortgage_rate: args.mortgage_rate / 100.0,
        annual_holding_cost_ratio: args.annual_holding_cost_ratio / 100.0,
        post_purchase_return_mean: args.post_purchase_return_mean / 100.0,
        post_purchase_return_std: args.post_purchase_return_std / 100.0,
        simulations: args.simulations,
    };
    validate(&params).map_err(|e| e.to_string())?;

    Ok(RunRequest {
        params,
        seed: args.seed,
        execution: if args.parallel {
            Execution::Parallel
        } else {
            Execution::Sequential
        },
        include_trajectories: args.include_trajectories,
    })
}

pub fn run_plan(
    request: &RunRequest,
    cancel: Option<CancelToken>,
) -> Result<PlanReport, SimulationError> {
    let mut options = match request.seed {
        Some(seed) => RunOptions::seeded(seed),
        None => RunOptions::from_entropy(),
    };
    if request.execution == Execution::Parallel {
        options = options.parallel();
    }
    if let Some(cancel) = cancel {
        options = options.with_cancel(cancel);
    }
    let params = &request.params;

    let phase_one = simulate_down_payment(params, &options)?;
    let phase_two = simulate_mortgage(params, &options)?;
    let metrics = derive_metrics(params, &phase_one, &phase_two);
    let suggestions = suggest(params, metrics.assessment);
    let accumulation_chart = chart_series(&phase_one.trajectories);
    let net_worth_chart = chart_series(&phase_two.trajectories);

    let keep = request.include_trajectories;
    Ok(PlanReport {
        parameters: params.clone(),
        seed: options.seed,
        execution: options.execution,
        phase_one: PhaseOneSummary {
            success_rate: phase_one.success_rate,
            average_years_to_goal: phase_one.average_years_to_goal,
            target_down_payment: phase_one.target_down_payment,
            trajectories: keep.then_some(phase_one.trajectories),
        },
        phase_two: PhaseTwoSummary {
            monthly_mortgage_payment: phase_two.monthly_mortgage_payment,
            monthly_holding_cost: phase_two.monthly_holding_cost,
            asset_depletion_risk: phase_two.asset_depletion_risk,
            loan_amount: phase_two.loan_amount,
            surviving_trials: phase_two.final_net_worths.len(),
            trajectories: keep.then_some(phase_two.trajectories),
        },
        metrics,
        suggestions,
        accumulation_chart,
        net_worth_chart,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("homeplan HTTP API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            log::warn!("rejected simulate request: {msg}");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let guard = CancelOnDrop(CancelToken::new());
    let cancel = guard.0.clone();
    let outcome = tokio::task::spawn_blocking(move || run_plan(&request, Some(cancel))).await;
    drop(guard);

    match outcome {
        Ok(Ok(report)) => json_response(StatusCode::OK, report),
        Ok(Err(e)) => error_response(StatusCode::SERVICE_UNAVAILABLE, &e.to_string()),
        Err(e) => {
            log::warn!("simulation task failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<RunRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<RunRequest, String> {
    let mut args = default_plan_args();

    if let Some(v) = payload.initial_savings {
        args.initial_savings = v;
    }
    if let Some(v) = payload.monthly_savings {
        args.monthly_savings = v;
    }
    if let Some(v) = payload.monthly_income {
        args.monthly_income = v;
    }
    if let Some(v) = payload.monthly_expenses {
        args.monthly_expenses = v;
    }
    if let Some(v) = payload.house_price {
        args.target_house_price = v;
    }
    if let Some(v) = payload.down_payment {
        args.down_payment_ratio = v;
    }
    if let Some(v) = payload.prep_years {
        args.prep_years_limit = v;
    }
    if let Some(v) = payload.mortgage_years {
        args.mortgage_years = v;
    }
    if let Some(v) = payload.return_mean {
        args.annual_return_mean = v;
    }
    if let Some(v) = payload.return_vol {
        args.annual_return_std = v;
    }
    if let Some(v) = payload.mortgage_rate {
        args.mortgage_rate = v;
    }
    if let Some(v) = payload.holding_cost {
        args.annual_holding_cost_ratio = v;
    }
    if let Some(v) = payload.holding_return_mean {
        args.post_purchase_return_mean = v;
    }
    if let Some(v) = payload.holding_return_vol {
        args.post_purchase_return_std = v;
    }
    if let Some(v) = payload.simulations {
        args.simulations = v;
    }
    if let Some(v) = payload.seed {
        args.seed = Some(v);
    }
    if let Some(v) = payload.parallel {
        args.parallel = v;
    }
    if let Some(v) = payload.include_trajectories {
        args.include_trajectories = v;
    }

    build_request(args)
}

fn default_plan_args() -> PlanArgs {
    PlanArgs {
        initial_savings: 800_000.0,
        monthly_savings: 30_000.0,
        monthly_income: 85_000.0,
        monthly_expenses: 25_000.0,
        target_house_price: 15_000_000.0,
        down_payment_ratio: 20.0,
        prep_years_limit: 10,
        mortgage_years: 30,
        annual_return_mean: 8.0,
        annual_return_std: 16.0,
        mortgage_rate: 2.2,
        annual_holding_cost_ratio: 0.6,
        post_purchase_return_mean: 6.0,
        post_purchase_return_std: 14.0,
        simulations: 2_000,
        seed: None,
        parallel: false,
        include_trajectories: false,
    }
}
