mod amortization;
mod down_payment;
mod engine;
mod metrics;
mod mortgage;
mod suggestions;
mod types;
mod validate;

pub use amortization::{periodic_payment, remaining_balance};
pub use down_payment::simulate_down_payment;
pub use engine::SimulationError;
pub use metrics::{
    CHART_PATH_LIMIT, HEALTHY_STRESS_LIMIT, ROBUST_SUCCESS_RATE, assess, chart_series,
    derive_metrics, gauge_position, median_trajectory, stress_index,
};
pub use mortgage::{MortgageTerms, simulate_mortgage};
pub use suggestions::{projected_stress_index, suggest};
pub use types::{
    CancelToken, CashFlowBreakdown, ChartSeries, DerivedMetrics, Execution, PhaseOneResult,
    PhaseTwoResult, PlanAssessment, RunOptions, SimulationParameters, StressBand, Suggestion,
    SuggestionKind,
};
pub use validate::{
    MAX_MORTGAGE_YEARS, MAX_PREPARATION_YEARS, MAX_SIMULATIONS, ParameterError, validate,
};
