use thiserror::Error;

use super::types::SimulationParameters;

pub const MAX_PREPARATION_YEARS: u32 = 100;
pub const MAX_MORTGAGE_YEARS: u32 = 100;
pub const MAX_SIMULATIONS: u32 = 100_000;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParameterError {
    #[error("simulations must be > 0")]
    NoTrials,
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} must be >= 0, got {value}")]
    NegativeAmount { field: &'static str, value: f64 },
    #[error("{field} must be between 0 and 1, got {value}")]
    RatioOutOfRange { field: &'static str, value: f64 },
    #[error("{field} must be >= 0, got {value}")]
    NegativeRate { field: &'static str, value: f64 },
    #[error("{field} must be at most {max}, got {value}")]
    AboveLimit {
        field: &'static str,
        value: u32,
        max: u32,
    },
}

/// Boundary check run before any simulation. The simulators themselves
/// assume these ranges hold.
pub fn validate(params: &SimulationParameters) -> Result<(), ParameterError> {
    if params.simulations == 0 {
        return Err(ParameterError::NoTrials);
    }

    for (field, value, max) in [
        ("simulations", params.simulations, MAX_SIMULATIONS),
        ("prep_years_limit", params.prep_years_limit, MAX_PREPARATION_YEARS),
        ("mortgage_years", params.mortgage_years, MAX_MORTGAGE_YEARS),
    ] {
        if value > max {
            return Err(ParameterError::AboveLimit { field, value, max });
        }
    }

    let amounts = [
        ("initial_savings", params.initial_savings),
        ("monthly_savings", params.monthly_savings),
        ("monthly_income", params.monthly_income),
        ("monthly_expenses", params.monthly_expenses),
        ("target_house_price", params.target_house_price),
    ];
    let ratios = [
        ("down_payment_ratio", params.down_payment_ratio),
        ("annual_holding_cost_ratio", params.annual_holding_cost_ratio),
    ];
    let rates = [
        ("annual_return_mean", params.annual_return_mean),
        ("annual_return_std", params.annual_return_std),
        ("mortgage_rate", params.mortgage_rate),
        ("post_purchase_return_mean", params.post_purchase_return_mean),
        ("post_purchase_return_std", params.post_purchase_return_std),
    ];

    for &(field, value) in amounts.iter().chain(&ratios).chain(&rates) {
        if !value.is_finite() {
            return Err(ParameterError::NotFinite { field });
        }
    }

    for (field, value) in amounts {
        if value < 0.0 {
            return Err(ParameterError::NegativeAmount { field, value });
        }
    }

    for (field, value) in ratios {
        if !(0.0..=1.0).contains(&value) {
            return Err(ParameterError::RatioOutOfRange { field, value });
        }
    }

    for (field, value) in rates {
        if value < 0.0 {
            return Err(ParameterError::NegativeRate { field, value });
        }
    }

    Ok(())
}
