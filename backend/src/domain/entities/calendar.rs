//! Academic years and the periods inside them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::trim;
use crate::domain::document::{Collection, DocumentId};
use crate::domain::entity::{Entity, FilterField, Reference, UniqueKey};
use crate::domain::format::is_valid_academic_year;
use crate::domain::validation::{ValidationError, ensure_date_order, ensure_not_blank};

/// An academic year labelled `YYYY-YY`.
///
/// Only one year per organisation should be active at a time; the calendar
/// service enforces that when a year is activated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AcademicYear {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Entity for AcademicYear {
    const COLLECTION: Collection = Collection::AcademicYears;
    const FILTERS: &'static [FilterField] = &[FilterField::text("name")];

    fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_academic_year(&self.name) {
            return Err(ValidationError::InvalidFormat {
                field: "name",
                expected: "an academic year label such as 2024-25",
            });
        }
        ensure_date_order(("startDate", self.start_date), ("endDate", self.end_date))
    }

    fn normalise(&mut self) {
        trim(&mut self.name);
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::per_organisation("name", &self.name)]
    }
}

/// A semester or term within an academic year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SemesterPeriod {
    pub academic_year_id: DocumentId,
    pub name: String,
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Entity for SemesterPeriod {
    const COLLECTION: Collection = Collection::SemesterPeriods;
    const FILTERS: &'static [FilterField] = &[
        FilterField::id("academicYearId"),
        FilterField::text("code"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("name", &self.name)?;
        ensure_not_blank("code", &self.code)?;
        ensure_date_order(("startDate", self.start_date), ("endDate", self.end_date))
    }

    fn normalise(&mut self) {
        trim(&mut self.name);
        trim(&mut self.code);
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::within_parent(
            "code",
            self.code.clone().into(),
            "academicYearId",
            self.academic_year_id,
        )]
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::to(
            "academicYearId",
            Collection::AcademicYears,
            self.academic_year_id,
        )]
    }
}
