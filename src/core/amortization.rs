/// Fixed payment that retires `principal` in `periods` equal installments at
/// `rate` per period.
pub fn periodic_payment(principal: f64, rate: f64, periods: u32) -> f64 {
    if periods == 0 {
        return 0.0;
    }
    if rate > 0.0 {
        let growth = (1.0 + rate).powi(periods as i32);
        return principal * (rate * growth) / (growth - 1.0);
    }
    principal / periods as f64
}

/// Balance left after `paid` installments of `payment`. Can dip slightly
/// below zero at the end of the schedule through rounding.
pub fn remaining_balance(principal: f64, rate: f64, payment: f64, paid: u32) -> f64 {
    let mut balance = principal;
    for _ in 0..paid {
        balance -= payment - balance * rate;
    }
    balance
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use proptest::prelude::{prop_assert, proptest};

    #[test]
    fn zero_rate_splits_principal_evenly() {
        assert_eq!(periodic_payment(12_000.0, 0.0, 12), 1_000.0);
        assert_eq!(periodic_payment(1_000.0, 0.0, 3), 1_000.0 / 3.0);
    }

    #[test]
    fn zero_periods_pays_nothing() {
        assert_eq!(periodic_payment(500_000.0, 0.01, 0), 0.0);
        assert_eq!(periodic_payment(500_000.0, 0.0, 0), 0.0);
    }

    #[test]
    fn thirty_year_loan_at_two_point_two_percent() {
        let payment = periodic_payment(12_000_000.0, 0.022 / 12.0, 360);
        assert_relative_eq!(payment, 45_564.10, epsilon = 0.01);
    }

    #[test]
    fn single_period_repays_principal_plus_interest() {
        assert_relative_eq!(periodic_payment(1_000.0, 0.05, 1), 1_050.0, epsilon = 1e-9);
    }

    #[test]
    fn schedule_retires_the_loan() {
        let rate = 0.022 / 12.0;
        let payment = periodic_payment(12_000_000.0, rate, 360);
        let left = remaining_balance(12_000_000.0, rate, payment, 360);
        assert_abs_diff_eq!(left, 0.0, epsilon = 1e-3);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_balance_converges_to_zero(
            principal in 1_000u32..50_000_000,
            rate_bp in 0u32..120,
            periods in 1u32..600
        ) {
            let principal = principal as f64;
            let rate = rate_bp as f64 / 10_000.0;
            let payment = periodic_payment(principal, rate, periods);
            let left = remaining_balance(principal, rate, payment, periods);
            prop_assert!(left.abs() <= principal * 1e-6, "left {left} of {principal}");
        }

        #[test]
        fn prop_payment_covers_first_interest(
            principal in 1_000u32..50_000_000,
            rate_bp in 1u32..120,
            periods in 1u32..600
        ) {
            let principal = principal as f64;
            let rate = rate_bp as f64 / 10_000.0;
            prop_assert!(periodic_payment(principal, rate, periods) > principal * rate);
        }
    }
}
