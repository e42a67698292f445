//! Workload arithmetic shared by the backend services.
//!
//! Every function here is total: no rounding, no clamping, and no errors.
//! Negative results are meaningful and signal over-allocation, so callers
//! must not treat them as failures.
#![expect(
    clippy::float_arithmetic,
    reason = "workload figures are fractional hours"
)]

/// Sum of allocated teaching and admin hours.
///
/// # Examples
/// ```
/// assert_eq!(workload_calculator::total_allocated(300.0, 120.0), 420.0);
/// ```
#[must_use]
pub fn total_allocated(teaching: f64, admin: f64) -> f64 {
    teaching + admin
}

/// Remaining contracted hours after allocations.
///
/// Negative when the lecturer is over-allocated.
///
/// # Examples
/// ```
/// assert_eq!(workload_calculator::capacity(1000.0, 1200.0), -200.0);
/// ```
#[must_use]
pub fn capacity(total_contract: f64, total_allocated: f64) -> f64 {
    total_contract - total_allocated
}

/// Teaching hours still available within the teaching budget.
#[must_use]
pub fn teaching_availability(max_teaching: f64, used_teaching: f64) -> f64 {
    max_teaching - used_teaching
}

/// Admin hours still available within the admin budget.
#[must_use]
pub fn admin_availability(max_admin: f64, used_admin: f64) -> f64 {
    max_admin - used_admin
}

#[cfg(test)]
mod tests {
    //! Arithmetic identities for the workload helpers.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.0, 0.0)]
    #[case(300.0, 120.0, 420.0)]
    #[case(12.5, 7.25, 19.75)]
    #[case(-10.0, 5.0, -5.0)]
    fn total_allocated_adds_both_sides(
        #[case] teaching: f64,
        #[case] admin: f64,
        #[case] expected: f64,
    ) {
        assert_eq!(total_allocated(teaching, admin), expected);
    }

    #[rstest]
    #[case(1000.0, 400.0, 600.0)]
    #[case(1000.0, 1000.0, 0.0)]
    #[case(1000.0, 1200.0, -200.0)]
    fn capacity_is_contract_minus_allocated(
        #[case] contract: f64,
        #[case] allocated: f64,
        #[case] expected: f64,
    ) {
        assert_eq!(capacity(contract, allocated), expected);
    }

    #[rstest]
    #[case(550.0, 500.0, 50.0)]
    #[case(550.0, 600.0, -50.0)]
    fn availability_keeps_negative_results(
        #[case] max: f64,
        #[case] used: f64,
        #[case] expected: f64,
    ) {
        assert_eq!(teaching_availability(max, used), expected);
        assert_eq!(admin_availability(max, used), expected);
    }

    #[test]
    fn helpers_compose_without_clamping() {
        let total = total_allocated(700.0, 400.0);
        assert_eq!(capacity(1000.0, total), -100.0);
    }
}
