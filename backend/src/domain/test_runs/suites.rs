//! Built-in diagnostic suites run in-process by the tooling endpoints.
//!
//! Each check returns `Err` with a short explanation on failure. The suites
//! exercise the same code the API uses, so a failing run points at a real
//! regression in the deployed build.

use crate::domain::entities::{AdminAllocation, Lecturer};
use crate::domain::entity::{Entity, prepare};
use crate::domain::format::{cn, format_duration, format_percentage, is_valid_academic_year};
use crate::domain::validation::ValidationError;
use crate::domain::workload::{WorkloadAggregate, WorkloadLimits};
use crate::domain::document::DocumentId;

/// A named synchronous check.
pub(super) type Check = (&'static str, fn() -> Result<(), String>);

fn expect_eq<T: PartialEq + std::fmt::Debug>(actual: T, expected: T) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected:?}, got {actual:?}"))
    }
}

fn limits() -> WorkloadLimits {
    WorkloadLimits {
        total_contract: 1000.0,
        max_teaching_hours: 550.0,
        max_admin_hours: 450.0,
    }
}

pub(super) const CALCULATOR: &[Check] = &[
    ("total allocated adds teaching and admin", || {
        expect_eq(workload_calculator::total_allocated(300.0, 150.0), 450.0)
    }),
    ("capacity may go negative", || {
        expect_eq(workload_calculator::capacity(1000.0, 1100.0), -100.0)
    }),
    ("availability subtracts used hours", || {
        expect_eq(workload_calculator::teaching_availability(550.0, 200.0), 350.0)?;
        expect_eq(workload_calculator::admin_availability(450.0, 500.0), -50.0)
    }),
    ("aggregate sums allocations", || {
        let aggregate = WorkloadAggregate::from_allocations(&limits(), [100.0, 50.0], [25.0]);
        expect_eq(aggregate.total_allocated, 175.0)?;
        expect_eq(aggregate.capacity, 825.0)
    }),
];

pub(super) const FORMATTING: &[Check] = &[
    ("durations", || {
        expect_eq(format_duration(0).as_str(), "0ms")?;
        expect_eq(format_duration(1500).as_str(), "1.5s")?;
        expect_eq(format_duration(-1000).as_str(), "-1.0s")
    }),
    ("percentages", || {
        expect_eq(format_percentage(0.5).as_str(), "50%")?;
        expect_eq(format_percentage(0.123).as_str(), "12.3%")
    }),
    ("class names", || {
        expect_eq(cn(&[Some("a"), None, None, Some("b")]).as_str(), "a b")
    }),
    ("academic years", || {
        expect_eq(is_valid_academic_year("2024-25"), true)?;
        expect_eq(is_valid_academic_year("2024-26"), false)
    }),
];

fn admin_allocation(hours: f64) -> AdminAllocation {
    AdminAllocation {
        lecturer_id: DocumentId::random(),
        allocation_type_id: None,
        academic_year_id: None,
        title: "Diagnostics".to_owned(),
        description: None,
        hours,
    }
}

pub(super) const VALIDATION: &[Check] = &[
    ("allocation hours must be positive", || {
        expect_eq(
            admin_allocation(0.0).validate(),
            Err(ValidationError::NotPositive { field: "hours" }),
        )?;
        expect_eq(admin_allocation(1.0).validate(), Ok(()))
    }),
    ("lecturer fte is a fraction", || {
        let payload = serde_json::json!({
            "fullName": "Diagnostics",
            "email": "diagnostics@example.ac.uk",
            "contractFte": 1.5,
            "totalContract": 100.0,
            "maxTeachingHours": 50.0,
            "maxAdminHours": 50.0,
        });
        let serde_json::Value::Object(body) = payload else {
            return Err("payload is not an object".to_owned());
        };
        match prepare::<Lecturer>(body) {
            Err(ValidationError::OutOfRange { field: "contractFte", .. }) => Ok(()),
            other => Err(format!("expected contractFte range error, got {other:?}")),
        }
    }),
];
