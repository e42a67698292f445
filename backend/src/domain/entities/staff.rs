//! Teams and lecturers.

use serde::{Deserialize, Serialize};

use super::{trim, trim_optional};
use crate::domain::document::{Collection, DocumentId};
use crate::domain::entity::{Entity, FilterField, Reference, UniqueKey};
use crate::domain::validation::{
    ValidationError, ensure_email, ensure_non_negative, ensure_not_blank,
};
use crate::domain::workload::{WorkloadAggregate, WorkloadLimits};

/// A group of lecturers reported on together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Team {
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_lecturer_id: Option<DocumentId>,
}

impl Entity for Team {
    const COLLECTION: Collection = Collection::Teams;
    const FILTERS: &'static [FilterField] = &[
        FilterField::text("code"),
        FilterField::id("leadLecturerId"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("name", &self.name)?;
        ensure_not_blank("code", &self.code)
    }

    fn normalise(&mut self) {
        trim(&mut self.name);
        trim(&mut self.code);
        trim_optional(&mut self.description);
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::per_organisation("code", &self.code)]
    }

    fn references(&self) -> Vec<Reference> {
        Reference::maybe("leadLecturerId", Collection::Lecturers, self.lead_lecturer_id)
            .into_iter()
            .collect()
    }
}

/// A lecturer with contracted budgets and cached workload figures.
///
/// The six derived fields are a denormalised cache of
/// [`WorkloadAggregate::compute`]. Clients never write them; they are
/// recomputed on every normalisation from the allocated hours already held
/// in the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Lecturer {
    pub full_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<DocumentId>,
    pub contract_fte: f64,
    pub total_contract: f64,
    pub max_teaching_hours: f64,
    pub max_admin_hours: f64,
    #[serde(default)]
    pub allocated_teaching_hours: f64,
    #[serde(default)]
    pub allocated_admin_hours: f64,
    #[serde(default)]
    pub total_allocated: f64,
    #[serde(default)]
    pub capacity: f64,
    #[serde(default)]
    pub teaching_availability: f64,
    #[serde(default)]
    pub admin_availability: f64,
}

impl Lecturer {
    /// Contracted budgets.
    #[must_use]
    pub fn limits(&self) -> WorkloadLimits {
        WorkloadLimits {
            total_contract: self.total_contract,
            max_teaching_hours: self.max_teaching_hours,
            max_admin_hours: self.max_admin_hours,
        }
    }

    /// Currently cached workload figures.
    #[must_use]
    pub fn aggregate(&self) -> WorkloadAggregate {
        WorkloadAggregate {
            allocated_teaching_hours: self.allocated_teaching_hours,
            allocated_admin_hours: self.allocated_admin_hours,
            total_allocated: self.total_allocated,
            capacity: self.capacity,
            teaching_availability: self.teaching_availability,
            admin_availability: self.admin_availability,
        }
    }

    /// Overwrite the cached figures.
    pub fn apply_aggregate(&mut self, aggregate: WorkloadAggregate) {
        self.allocated_teaching_hours = aggregate.allocated_teaching_hours;
        self.allocated_admin_hours = aggregate.allocated_admin_hours;
        self.total_allocated = aggregate.total_allocated;
        self.capacity = aggregate.capacity;
        self.teaching_availability = aggregate.teaching_availability;
        self.admin_availability = aggregate.admin_availability;
    }
}

impl Entity for Lecturer {
    const COLLECTION: Collection = Collection::Lecturers;
    const FILTERS: &'static [FilterField] =
        &[FilterField::id("teamId"), FilterField::text("email")];
    const DERIVED_FIELDS: &'static [&'static str] = &[
        "allocatedTeachingHours",
        "allocatedAdminHours",
        "totalAllocated",
        "capacity",
        "teachingAvailability",
        "adminAvailability",
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("fullName", &self.full_name)?;
        ensure_email("email", &self.email)?;
        if !(self.contract_fte > 0.0 && self.contract_fte <= 1.0) {
            return Err(ValidationError::OutOfRange {
                field: "contractFte",
                min: 0.0,
                max: 1.0,
            });
        }
        ensure_non_negative("totalContract", self.total_contract)?;
        ensure_non_negative("maxTeachingHours", self.max_teaching_hours)?;
        ensure_non_negative("maxAdminHours", self.max_admin_hours)
    }

    fn normalise(&mut self) {
        trim(&mut self.full_name);
        trim(&mut self.email);
        self.email.make_ascii_lowercase();
        let aggregate = WorkloadAggregate::compute(
            &self.limits(),
            self.allocated_teaching_hours,
            self.allocated_admin_hours,
        );
        self.apply_aggregate(aggregate);
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::per_organisation("email", &self.email)]
    }

    fn references(&self) -> Vec<Reference> {
        Reference::maybe("teamId", Collection::Teams, self.team_id)
            .into_iter()
            .collect()
    }
}
