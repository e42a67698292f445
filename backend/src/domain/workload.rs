//! Lecturer workload aggregation.
//!
//! [`WorkloadAggregate::compute`] is the only code path that derives a
//! lecturer's allocated totals, capacity and availability. Lecturer
//! normalisation, the allocation service, reports and the backfill migration
//! all go through it.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Largest difference in hours treated as equal when comparing figures.
pub const HOURS_TOLERANCE: f64 = 1e-6;

/// Contracted budgets a lecturer's allocations are measured against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadLimits {
    pub total_contract: f64,
    pub max_teaching_hours: f64,
    pub max_admin_hours: f64,
}

/// Derived workload figures for one lecturer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadAggregate {
    pub allocated_teaching_hours: f64,
    pub allocated_admin_hours: f64,
    pub total_allocated: f64,
    pub capacity: f64,
    pub teaching_availability: f64,
    pub admin_availability: f64,
}

impl WorkloadAggregate {
    /// Derive every figure from the budgets and allocated hours.
    ///
    /// # Examples
    /// ```
    /// use workload_backend::domain::workload::{WorkloadAggregate, WorkloadLimits};
    ///
    /// let limits = WorkloadLimits {
    ///     total_contract: 1000.0,
    ///     max_teaching_hours: 550.0,
    ///     max_admin_hours: 450.0,
    /// };
    /// let aggregate = WorkloadAggregate::compute(&limits, 600.0, 500.0);
    /// assert_eq!(aggregate.total_allocated, 1100.0);
    /// assert_eq!(aggregate.capacity, -100.0);
    /// assert!(aggregate.is_over_allocated());
    /// ```
    #[must_use]
    pub fn compute(limits: &WorkloadLimits, teaching: f64, admin: f64) -> Self {
        let total = workload_calculator::total_allocated(teaching, admin);
        Self {
            allocated_teaching_hours: teaching,
            allocated_admin_hours: admin,
            total_allocated: total,
            capacity: workload_calculator::capacity(limits.total_contract, total),
            teaching_availability: workload_calculator::teaching_availability(
                limits.max_teaching_hours,
                teaching,
            ),
            admin_availability: workload_calculator::admin_availability(
                limits.max_admin_hours,
                admin,
            ),
        }
    }

    /// Derive figures from individual allocation hour values.
    pub fn from_allocations<M, A>(limits: &WorkloadLimits, teaching: M, admin: A) -> Self
    where
        M: IntoIterator<Item = f64>,
        A: IntoIterator<Item = f64>,
    {
        Self::compute(limits, teaching.into_iter().sum(), admin.into_iter().sum())
    }

    /// Whether every figure agrees with `other` within [`HOURS_TOLERANCE`].
    ///
    /// Sums of fractional hours depend on the order they were added in, so
    /// stored and recomputed figures are compared this way rather than with
    /// `==`.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        [
            (self.allocated_teaching_hours, other.allocated_teaching_hours),
            (self.allocated_admin_hours, other.allocated_admin_hours),
            (self.total_allocated, other.total_allocated),
            (self.capacity, other.capacity),
            (self.teaching_availability, other.teaching_availability),
            (self.admin_availability, other.admin_availability),
        ]
        .iter()
        .all(|(left, right)| (left - right).abs() <= HOURS_TOLERANCE)
    }

    /// Whether allocations exceed the contract.
    #[must_use]
    pub fn is_over_allocated(&self) -> bool {
        self.capacity < 0.0
    }

    /// Share of the contract already allocated, if the contract is non-zero.
    #[must_use]
    pub fn utilisation(&self, limits: &WorkloadLimits) -> Option<f64> {
        (limits.total_contract > 0.0).then(|| self.total_allocated / limits.total_contract)
    }
}
