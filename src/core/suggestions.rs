use super::metrics::stress_index;
use super::mortgage::MortgageTerms;
use super::types::{PlanAssessment, SimulationParameters, Suggestion, SuggestionKind};

pub const SAVINGS_RAISE: f64 = 1.15;
pub const EXTRA_PREPARATION_YEARS: u32 = 2;
pub const PRICE_CUT: f64 = 0.9;
pub const DOWN_PAYMENT_STEP: f64 = 0.05;
pub const LONGEST_MORTGAGE_YEARS: u32 = 40;
pub const INCOME_RAISE: f64 = 1.1;

/// Stress index the plan would carry, computed from the loan terms alone.
pub fn projected_stress_index(params: &SimulationParameters) -> f64 {
    let terms = MortgageTerms::from_params(params);
    stress_index(
        terms.monthly_payment,
        terms.monthly_holding_cost,
        params.monthly_income,
    )
}

/// Single-parameter adjustments for whichever phase falls short. These are
/// point estimates; none of them re-run the simulators.
pub fn suggest(params: &SimulationParameters, assessment: PlanAssessment) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    if assessment.is_sound() {
        return suggestions;
    }

    if !assessment.down_payment_robust {
        suggestions.push(Suggestion {
            kind: SuggestionKind::IncreaseSavings,
            parameters: SimulationParameters {
                monthly_savings: (params.monthly_savings * SAVINGS_RAISE).trunc(),
                ..params.clone()
            },
            projected_stress_index: None,
        });
        suggestions.push(Suggestion {
            kind: SuggestionKind::ExtendPreparation,
            parameters: SimulationParameters {
                prep_years_limit: params.prep_years_limit + EXTRA_PREPARATION_YEARS,
                ..params.clone()
            },
            projected_stress_index: None,
        });
    }

    if !assessment.mortgage_healthy {
        let mut candidates = vec![
            (
                SuggestionKind::LowerPrice,
                SimulationParameters {
                    target_house_price: (params.target_house_price * PRICE_CUT).trunc(),
                    ..params.clone()
                },
            ),
            (
                SuggestionKind::RaiseDownPayment,
                SimulationParameters {
                    down_payment_ratio: (params.down_payment_ratio + DOWN_PAYMENT_STEP).min(1.0),
                    ..params.clone()
                },
            ),
        ];
        if params.mortgage_years < LONGEST_MORTGAGE_YEARS {
            candidates.push((
                SuggestionKind::ExtendMortgage,
                SimulationParameters {
                    mortgage_years: LONGEST_MORTGAGE_YEARS,
                    ..params.clone()
                },
            ));
        }
        candidates.push((
            SuggestionKind::RaiseIncome,
            SimulationParameters {
                monthly_income: (params.monthly_income * INCOME_RAISE).trunc(),
                ..params.clone()
            },
        ));

        suggestions.extend(candidates.into_iter().map(|(kind, parameters)| Suggestion {
            kind,
            projected_stress_index: Some(projected_stress_index(&parameters)),
            parameters,
        }));
    }

    suggestions
}
