use super::engine::{
    DOWN_PAYMENT_PHASE, MONTHS_PER_YEAR, MonthlyReturns, Rng, SimulationError, months_in,
    run_trials,
};
use super::types::{PhaseOneResult, RunOptions, SimulationParameters};

#[derive(Debug, Clone, Copy)]
struct SavingsPlan {
    initial_savings: f64,
    monthly_savings: f64,
    target: f64,
    months_limit: u32,
    returns: MonthlyReturns,
}

impl SavingsPlan {
    fn from_params(params: &SimulationParameters) -> Self {
        Self {
            initial_savings: params.initial_savings,
            monthly_savings: params.monthly_savings,
            target: params.target_down_payment(),
            months_limit: months_in(params.prep_years_limit),
            returns: MonthlyReturns::from_annual(
                params.annual_return_mean,
                params.annual_return_std,
            ),
        }
    }
}

#[derive(Debug)]
struct SavingsTrial {
    trajectory: Vec<f64>,
    months_to_goal: Option<u32>,
}

/// Simulates saving toward the down payment. Each trial contributes, then
/// grows, month by month until the balance reaches the target or the
/// preparation limit runs out.
pub fn simulate_down_payment(
    params: &SimulationParameters,
    options: &RunOptions,
) -> Result<PhaseOneResult, SimulationError> {
    let plan = SavingsPlan::from_params(params);
    log::debug!(
        "down-payment run: {} trials, {:?}, target {:.0} within {} months",
        params.simulations,
        options.execution,
        plan.target,
        plan.months_limit
    );

    let trials = run_trials(params.simulations, DOWN_PAYMENT_PHASE, options, |rng| {
        simulate_savings_trial(&plan, rng)
    })?;

    let mut months_to_goal = Vec::new();
    let mut trajectories = Vec::with_capacity(trials.len());
    for trial in trials {
        if let Some(month) = trial.months_to_goal {
            months_to_goal.push(month);
        }
        trajectories.push(trial.trajectory);
    }

    let success_rate = if params.simulations == 0 {
        0.0
    } else {
        months_to_goal.len() as f64 / params.simulations as f64
    };
    let average_years_to_goal = if months_to_goal.is_empty() {
        None
    } else {
        let total: f64 = months_to_goal.iter().map(|&m| m as f64).sum();
        Some(total / months_to_goal.len() as f64 / MONTHS_PER_YEAR as f64)
    };

    log::debug!(
        "down-payment run finished: success rate {success_rate:.3}, average years {average_years_to_goal:?}"
    );

    Ok(PhaseOneResult {
        success_rate,
        average_years_to_goal,
        trajectories,
        target_down_payment: plan.target,
    })
}

fn simulate_savings_trial(plan: &SavingsPlan, rng: &mut Rng) -> SavingsTrial {
    let mut balance = plan.initial_savings;
    let mut trajectory = Vec::with_capacity(plan.months_limit as usize + 1);
    trajectory.push(balance);

    if balance >= plan.target {
        return SavingsTrial {
            trajectory,
            months_to_goal: Some(0),
        };
    }

    for month in 1..=plan.months_limit {
        balance += plan.monthly_savings;
        balance *= 1.0 + plan.returns.sample(rng);
        trajectory.push(balance);

        if balance >= plan.target {
            return SavingsTrial {
                trajectory,
                months_to_goal: Some(month),
            };
        }
    }

    SavingsTrial {
        trajectory,
        months_to_goal: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn sample_params() -> SimulationParameters {
        SimulationParameters {
            simulations: 300,
            ..SimulationParameters::default()
        }
    }

    fn deterministic_params() -> SimulationParameters {
        SimulationParameters {
            initial_savings: 0.0,
            monthly_savings: 10_000.0,
            target_house_price: 1_000_000.0,
            down_payment_ratio: 0.2,
            prep_years_limit: 2,
            annual_return_mean: 0.0,
            annual_return_std: 0.0,
            simulations: 50,
            ..SimulationParameters::default()
        }
    }

    /// Months the noise-free path needs to reach the target, if it does.
    fn deterministic_months(params: &SimulationParameters) -> Option<u32> {
        let returns = MonthlyReturns::from_annual(params.annual_return_mean, 0.0);
        let target = params.target_down_payment();
        let mut balance = params.initial_savings;
        if balance >= target {
            return Some(0);
        }
        for month in 1..=params.prep_years_limit * 12 {
            balance = (balance + params.monthly_savings) * (1.0 + returns.mean);
            if balance >= target {
                return Some(month);
            }
        }
        None
    }

    #[test]
    fn target_is_price_times_ratio() {
        let result = simulate_down_payment(&sample_params(), &RunOptions::seeded(1)).unwrap();
        assert_relative_eq!(result.target_down_payment, 3_000_000.0);
        assert_eq!(result.trajectories.len(), 300);
    }

    #[test]
    fn flat_savings_reach_target_after_exact_month_count() {
        let result =
            simulate_down_payment(&deterministic_params(), &RunOptions::seeded(5)).unwrap();
        assert_eq!(result.success_rate, 1.0);
        assert_relative_eq!(result.average_years_to_goal.unwrap(), 20.0 / 12.0);
        for trajectory in &result.trajectories {
            assert_eq!(trajectory.len(), 21);
            assert_eq!(trajectory[0], 0.0);
            assert_eq!(trajectory[20], 200_000.0);
        }
    }

    #[test]
    fn target_out_of_reach_fails_every_trial() {
        let mut params = deterministic_params();
        params.prep_years_limit = 1;
        let result = simulate_down_payment(&params, &RunOptions::seeded(5)).unwrap();
        assert_eq!(result.success_rate, 0.0);
        assert_eq!(result.average_years_to_goal, None);
        assert!(result.trajectories.iter().all(|t| t.len() == 13));
    }

    #[test]
    fn savings_already_at_target_succeed_immediately() {
        let params = SimulationParameters {
            initial_savings: 3_000_000.0,
            monthly_savings: 0.0,
            annual_return_mean: 0.0,
            annual_return_std: 0.0,
            simulations: 1_000,
            ..SimulationParameters::default()
        };
        let result = simulate_down_payment(&params, &RunOptions::seeded(11)).unwrap();
        assert_eq!(result.success_rate, 1.0);
        assert_eq!(result.average_years_to_goal, Some(0.0));
        assert!(result.trajectories.iter().all(|t| t == &vec![3_000_000.0]));
    }

    #[test]
    fn zero_savings_with_volatility_still_runs_full_horizon() {
        let params = SimulationParameters {
            initial_savings: 0.0,
            monthly_savings: 0.0,
            simulations: 20,
            ..SimulationParameters::default()
        };
        let result = simulate_down_payment(&params, &RunOptions::seeded(2)).unwrap();
        assert_eq!(result.success_rate, 0.0);
        assert!(result.trajectories.iter().all(|t| t.len() == 121));
    }

    #[test]
    fn same_seed_reproduces_results_bit_for_bit() {
        let params = sample_params();
        let a = simulate_down_payment(&params, &RunOptions::seeded(77)).unwrap();
        let b = simulate_down_payment(&params, &RunOptions::seeded(77)).unwrap();
        let c = simulate_down_payment(&params, &RunOptions::seeded(77).parallel()).unwrap();
        assert_eq!(a.success_rate.to_bits(), b.success_rate.to_bits());
        assert_eq!(a.trajectories, b.trajectories);
        assert_eq!(a.trajectories, c.trajectories);
        assert_eq!(a.average_years_to_goal, c.average_years_to_goal);
    }

    #[test]
    fn different_seeds_give_different_paths() {
        let params = sample_params();
        let a = simulate_down_payment(&params, &RunOptions::seeded(1)).unwrap();
        let b = simulate_down_payment(&params, &RunOptions::seeded(2)).unwrap();
        assert_ne!(a.trajectories, b.trajectories);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(24))]

        #[test]
        fn prop_success_rate_is_a_fraction_and_trajectories_are_bounded(
            seed in proptest::prelude::any::<u64>(),
            initial in 0u32..3_000_000,
            monthly in 0u32..80_000,
            years in 0u32..8,
            mean_bp in 0u32..1500,
            std_bp in 0u32..3000,
            simulations in 1u32..40
        ) {
            let params = SimulationParameters {
                initial_savings: initial as f64,
                monthly_savings: monthly as f64,
                prep_years_limit: years,
                annual_return_mean: mean_bp as f64 / 10_000.0,
                annual_return_std: std_bp as f64 / 10_000.0,
                simulations,
                ..SimulationParameters::default()
            };
            let result = simulate_down_payment(&params, &RunOptions::seeded(seed)).unwrap();
            prop_assert!((0.0..=1.0).contains(&result.success_rate));
            prop_assert_eq!(result.trajectories.len(), simulations as usize);
            for trajectory in &result.trajectories {
                prop_assert!(!trajectory.is_empty());
                prop_assert!(trajectory.len() <= (years * 12 + 1) as usize);
            }
            match result.average_years_to_goal {
                Some(avg) => prop_assert!(result.success_rate > 0.0 && avg <= years as f64),
                None => prop_assert_eq!(result.success_rate, 0.0),
            }
        }

        #[test]
        fn prop_zero_volatility_is_all_or_nothing(
            initial in 0u32..2_000_000,
            monthly in 0u32..60_000,
            years in 1u32..10,
            mean_bp in 0u32..1200
        ) {
            let params = SimulationParameters {
                initial_savings: initial as f64,
                monthly_savings: monthly as f64,
                prep_years_limit: years,
                annual_return_mean: mean_bp as f64 / 10_000.0,
                annual_return_std: 0.0,
                simulations: 15,
                ..SimulationParameters::default()
            };
            let result = simulate_down_payment(&params, &RunOptions::seeded(3)).unwrap();
            let expected = deterministic_months(&params);
            prop_assert_eq!(result.success_rate, if expected.is_some() { 1.0 } else { 0.0 });
            prop_assert_eq!(
                result.average_years_to_goal,
                expected.map(|m| m as f64 / 12.0)
            );
        }

        #[test]
        fn prop_more_savings_never_lowers_success(
            seed in proptest::prelude::any::<u64>(),
            monthly in 0u32..60_000,
            extra in 0u32..30_000,
            std_bp in 0u32..3000
        ) {
            let base = SimulationParameters {
                monthly_savings: monthly as f64,
                prep_years_limit: 6,
                annual_return_std: std_bp as f64 / 10_000.0,
                simulations: 40,
                ..SimulationParameters::default()
            };
            let richer = SimulationParameters {
                monthly_savings: (monthly + extra) as f64,
                ..base.clone()
            };
            let options = RunOptions::seeded(seed);
            let low = simulate_down_payment(&base, &options).unwrap();
            let high = simulate_down_payment(&richer, &options).unwrap();
            prop_assert!(high.success_rate >= low.success_rate);
        }
    }
}
