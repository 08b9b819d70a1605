use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

/// One complete set of planning inputs. Monetary values are per month unless
/// the name says otherwise; rates and ratios are fractions, not percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    pub initial_savings: f64,
    pub monthly_savings: f64,
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub target_house_price: f64,
    pub down_payment_ratio: f64,
    pub prep_years_limit: u32,
    pub mortgage_years: u32,
    pub annual_return_mean: f64,
    pub annual_return_std: f64,
    pub mortgage_rate: f64,
    pub annual_holding_cost_ratio: f64,
    pub post_purchase_return_mean: f64,
    pub post_purchase_return_std: f64,
    pub simulations: u32,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            initial_savings: 800_000.0,
            monthly_savings: 30_000.0,
            monthly_income: 85_000.0,
            monthly_expenses: 25_000.0,
            target_house_price: 15_000_000.0,
            down_payment_ratio: 0.20,
            prep_years_limit: 10,
            mortgage_years: 30,
            annual_return_mean: 0.08,
            annual_return_std: 0.16,
            mortgage_rate: 0.022,
            annual_holding_cost_ratio: 0.006,
            post_purchase_return_mean: 0.06,
            post_purchase_return_std: 0.14,
            simulations: 2_000,
        }
    }
}

impl SimulationParameters {
    pub fn target_down_payment(&self) -> f64 {
        self.target_house_price * self.down_payment_ratio
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Execution {
    #[default]
    Sequential,
    Parallel,
}

/// Shared flag checked between trials. Cloning hands out another handle to
/// the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub seed: u64,
    pub execution: Execution,
    pub cancel: Option<CancelToken>,
}

impl RunOptions {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn from_entropy() -> Self {
        let mut hasher = RandomState::new().build_hasher();
        hasher.write_u64(0x686f_6d65_706c_616e);
        Self::seeded(hasher.finish())
    }

    pub fn parallel(mut self) -> Self {
        self.execution = Execution::Parallel;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseOneResult {
    pub success_rate: f64,
    pub average_years_to_goal: Option<f64>,
    pub trajectories: Vec<Vec<f64>>,
    pub target_down_payment: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTwoResult {
    pub monthly_mortgage_payment: f64,
    pub monthly_holding_cost: f64,
    pub asset_depletion_risk: f64,
    pub trajectories: Vec<Vec<f64>>,
    /// Only trials that never depleted their financial assets.
    pub final_net_worths: Vec<f64>,
    /// Only trials that never depleted their financial assets.
    pub final_financial_assets: Vec<f64>,
    pub loan_amount: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StressBand {
    Comfortable,
    Observation,
    Critical,
    OffScale,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanAssessment {
    pub down_payment_robust: bool,
    pub mortgage_healthy: bool,
}

impl PlanAssessment {
    pub fn is_sound(self) -> bool {
        self.down_payment_robust && self.mortgage_healthy
    }
}

/// Where each month of income goes once the house is bought. The surplus is
/// floored at zero here; the signed value lives in `DerivedMetrics`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowBreakdown {
    pub monthly_income: f64,
    pub mortgage_payment: f64,
    pub holding_cost: f64,
    pub living_expenses: f64,
    pub investable_surplus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub stress_index: f64,
    pub stress_band: StressBand,
    pub gauge_position: f64,
    pub assessment: PlanAssessment,
    pub monthly_surplus: f64,
    pub cash_flow: CashFlowBreakdown,
    pub median_final_financial_assets: f64,
    pub median_final_net_worth: f64,
    pub final_house_value: f64,
    pub total_mortgage_paid: f64,
    pub total_interest: f64,
    pub total_holding_cost: f64,
    pub total_cost: f64,
    pub total_final_assets: f64,
    pub net_gain_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub paths: Vec<Vec<f64>>,
    pub median: Vec<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionKind {
    IncreaseSavings,
    ExtendPreparation,
    LowerPrice,
    RaiseDownPayment,
    ExtendMortgage,
    RaiseIncome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub parameters: SimulationParameters,
    pub projected_stress_index: Option<f64>,
}
