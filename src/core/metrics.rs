use super::engine::{median, months_in};
use super::types::{
    CashFlowBreakdown, ChartSeries, DerivedMetrics, PhaseOneResult, PhaseTwoResult,
    PlanAssessment, SimulationParameters, StressBand,
};

pub const COMFORTABLE_STRESS_LIMIT: f64 = 0.3;
pub const OBSERVATION_STRESS_LIMIT: f64 = 0.4;
pub const CRITICAL_STRESS_LIMIT: f64 = 0.6;

pub const ROBUST_SUCCESS_RATE: f64 = 0.8;
pub const HEALTHY_STRESS_LIMIT: f64 = 0.4;

pub const CHART_PATH_LIMIT: usize = 100;

/// Share of monthly income spent on the mortgage payment and holding costs.
/// Zero income yields 0 rather than a division by zero.
pub fn stress_index(monthly_payment: f64, monthly_holding_cost: f64, monthly_income: f64) -> f64 {
    if monthly_income > 0.0 {
        (monthly_payment + monthly_holding_cost) / monthly_income
    } else {
        0.0
    }
}

impl StressBand {
    pub fn classify(stress_index: f64) -> Self {
        if stress_index < COMFORTABLE_STRESS_LIMIT {
            StressBand::Comfortable
        } else if stress_index < OBSERVATION_STRESS_LIMIT {
            StressBand::Observation
        } else if stress_index <= CRITICAL_STRESS_LIMIT {
            StressBand::Critical
        } else {
            StressBand::OffScale
        }
    }
}

/// Position on a gauge that ends at the critical limit. The index itself is
/// never clamped.
pub fn gauge_position(stress_index: f64) -> f64 {
    stress_index.clamp(0.0, CRITICAL_STRESS_LIMIT)
}

pub fn assess(phase_one: &PhaseOneResult, stress_index: f64) -> PlanAssessment {
    PlanAssessment {
        down_payment_robust: phase_one.success_rate >= ROBUST_SUCCESS_RATE,
        mortgage_healthy: stress_index <= HEALTHY_STRESS_LIMIT,
    }
}

pub fn derive_metrics(
    params: &SimulationParameters,
    phase_one: &PhaseOneResult,
    phase_two: &PhaseTwoResult,
) -> DerivedMetrics {
    let stress = stress_index(
        phase_two.monthly_mortgage_payment,
        phase_two.monthly_holding_cost,
        params.monthly_income,
    );
    let term_months = months_in(params.mortgage_years) as f64;

    let monthly_surplus = params.monthly_income
        - phase_two.monthly_mortgage_payment
        - phase_two.monthly_holding_cost
        - params.monthly_expenses;

    let median_final_financial_assets = median(&phase_two.final_financial_assets);
    let median_final_net_worth = median(&phase_two.final_net_worths);
    let final_house_value = params.target_house_price;

    let total_mortgage_paid = phase_two.monthly_mortgage_payment * term_months;
    let total_interest = total_mortgage_paid - phase_two.loan_amount;
    let total_holding_cost = phase_two.monthly_holding_cost * term_months;
    let total_cost = params.target_house_price + total_interest + total_holding_cost;
    let total_final_assets = final_house_value + median_final_financial_assets;

    DerivedMetrics {
        stress_index: stress,
        stress_band: StressBand::classify(stress),
        gauge_position: gauge_position(stress),
        assessment: assess(phase_one, stress),
        monthly_surplus,
        cash_flow: CashFlowBreakdown {
            monthly_income: params.monthly_income,
            mortgage_payment: phase_two.monthly_mortgage_payment,
            holding_cost: phase_two.monthly_holding_cost,
            living_expenses: params.monthly_expenses,
            investable_surplus: monthly_surplus.max(0.0),
        },
        median_final_financial_assets,
        median_final_net_worth,
        final_house_value,
        total_mortgage_paid,
        total_interest,
        total_holding_cost,
        total_cost,
        total_final_assets,
        net_gain_loss: total_final_assets - total_cost,
    }
}

/// Per-month median across trials. A month only counts the trials whose
/// trajectory is still running at that index.
pub fn median_trajectory(trajectories: &[Vec<f64>]) -> Vec<f64> {
    let longest = trajectories.iter().map(Vec::len).max().unwrap_or(0);
    let mut column = Vec::with_capacity(trajectories.len());
    (0..longest)
        .map(|month| {
            column.clear();
            column.extend(trajectories.iter().filter_map(|t| t.get(month).copied()));
            median(&column)
        })
        .collect()
}

pub fn chart_series(trajectories: &[Vec<f64>]) -> ChartSeries {
    ChartSeries {
        paths: trajectories.iter().take(CHART_PATH_LIMIT).cloned().collect(),
        median: median_trajectory(trajectories),
    }
}
