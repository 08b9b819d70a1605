use super::amortization::periodic_payment;
use super::engine::{
    MONTHS_PER_YEAR, MORTGAGE_PHASE, MonthlyReturns, Rng, SimulationError, months_in,
    run_trials,
};
use super::types::{PhaseTwoResult, RunOptions, SimulationParameters};

/// Loan figures fixed at purchase time; they do not vary between trials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MortgageTerms {
    pub house_value: f64,
    pub loan_amount: f64,
    pub monthly_rate: f64,
    pub payments: u32,
    pub monthly_payment: f64,
    pub monthly_holding_cost: f64,
}

impl MortgageTerms {
    pub fn from_params(params: &SimulationParameters) -> Self {
        let house_value = params.target_house_price;
        let loan_amount = house_value - params.target_down_payment();
        let monthly_rate = params.mortgage_rate / MONTHS_PER_YEAR as f64;
        let payments = months_in(params.mortgage_years);
        Self {
            house_value,
            loan_amount,
            monthly_rate,
            payments,
            monthly_payment: periodic_payment(loan_amount, monthly_rate, payments),
            monthly_holding_cost: house_value * params.annual_holding_cost_ratio
                / MONTHS_PER_YEAR as f64,
        }
    }

    pub fn monthly_housing_cost(&self) -> f64 {
        self.monthly_payment + self.monthly_holding_cost
    }
}

#[derive(Debug, Clone, Copy)]
struct HoldingPlan {
    terms: MortgageTerms,
    disposable_income: f64,
    returns: MonthlyReturns,
}

impl HoldingPlan {
    fn from_params(params: &SimulationParameters) -> Self {
        let terms = MortgageTerms::from_params(params);
        Self {
            terms,
            disposable_income: params.monthly_income
                - params.monthly_expenses
                - terms.monthly_housing_cost(),
            returns: MonthlyReturns::from_annual(
                params.post_purchase_return_mean,
                params.post_purchase_return_std,
            ),
        }
    }
}

#[derive(Debug)]
struct HoldingTrial {
    trajectory: Vec<f64>,
    depleted_at: Option<u32>,
    final_financial_assets: f64,
}

/// Simulates net worth over the mortgage term. Each month the leftover income
/// is invested, the investments earn a random return and the loan amortizes.
/// A trial whose investable assets go negative is frozen for the rest of the
/// term and excluded from the terminal-value lists.
pub fn simulate_mortgage(
    params: &SimulationParameters,
    options: &RunOptions,
) -> Result<PhaseTwoResult, SimulationError> {
    let plan = HoldingPlan::from_params(params);
    let terms = plan.terms;
    log::debug!(
        "mortgage run: {} trials, {:?}, payment {:.2}, holding cost {:.2}, disposable {:.2}",
        params.simulations,
        options.execution,
        terms.monthly_payment,
        terms.monthly_holding_cost,
        plan.disposable_income
    );

    let trials = run_trials(params.simulations, MORTGAGE_PHASE, options, |rng| {
        simulate_holding_trial(&plan, rng)
    })?;

    let mut depleted = 0_u32;
    let mut trajectories = Vec::with_capacity(trials.len());
    let mut final_net_worths = Vec::with_capacity(trials.len());
    let mut final_financial_assets = Vec::with_capacity(trials.len());
    for trial in trials {
        match trial.depleted_at {
            Some(_) => depleted += 1,
            None => {
                if let Some(&last) = trial.trajectory.last() {
                    final_net_worths.push(last);
                }
                final_financial_assets.push(trial.final_financial_assets);
            }
        }
        trajectories.push(trial.trajectory);
    }

    let asset_depletion_risk = if params.simulations == 0 {
        0.0
    } else {
        depleted as f64 / params.simulations as f64
    };

    log::debug!("mortgage run finished: depletion risk {asset_depletion_risk:.3}");

    Ok(PhaseTwoResult {
        monthly_mortgage_payment: terms.monthly_payment,
        monthly_holding_cost: terms.monthly_holding_cost,
        asset_depletion_risk,
        trajectories,
        final_net_worths,
        final_financial_assets,
        loan_amount: terms.loan_amount,
    })
}

fn simulate_holding_trial(plan: &HoldingPlan, rng: &mut Rng) -> HoldingTrial {
    let terms = &plan.terms;
    let mut financial_assets = 0.0;
    let mut remaining_loan = terms.loan_amount;
    let mut net_worth = terms.house_value - remaining_loan;
    let mut depleted_at = None;

    let mut trajectory = Vec::with_capacity(terms.payments as usize + 1);
    trajectory.push(net_worth);

    for month in 1..=terms.payments {
        if depleted_at.is_some() {
            trajectory.push(net_worth);
            continue;
        }

        financial_assets += plan.disposable_income;
        financial_assets *= 1.0 + plan.returns.sample(rng);

        let interest = remaining_loan * terms.monthly_rate;
        remaining_loan -= terms.monthly_payment - interest;

        // The stored balance may end a hair below zero; only the reported
        // net worth is clamped.
        net_worth = financial_assets + terms.house_value - remaining_loan.max(0.0);
        trajectory.push(net_worth);

        if financial_assets < 0.0 {
            depleted_at = Some(month);
        }
    }

    HoldingTrial {
        trajectory,
        depleted_at,
        final_financial_assets: financial_assets,
    }
}
