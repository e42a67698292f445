//! Allocation categories, allocations and calculation rules.

use serde::{Deserialize, Serialize};

use super::{trim, trim_optional};
use crate::domain::document::{Collection, DocumentId};
use crate::domain::entity::{Entity, FilterField, Reference, UniqueKey};
use crate::domain::validation::{
    ValidationError, ensure_in_range, ensure_non_negative, ensure_not_blank, ensure_positive,
};

/// Broad grouping for allocation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationCategory {
    Teaching,
    Admin,
    Assessment,
    Other,
}

/// A category of allocatable work, e.g. "Programme leader".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AllocationType {
    pub name: String,
    pub code: String,
    pub category: AllocationCategory,
    #[serde(default)]
    pub default_hours: f64,
}

impl Entity for AllocationType {
    const COLLECTION: Collection = Collection::AllocationTypes;
    const FILTERS: &'static [FilterField] =
        &[FilterField::text("code"), FilterField::text("category")];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("name", &self.name)?;
        ensure_not_blank("code", &self.code)?;
        ensure_non_negative("defaultHours", self.default_hours)
    }

    fn normalise(&mut self) {
        trim(&mut self.name);
        trim(&mut self.code);
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::per_organisation("code", &self.code)]
    }
}

/// A category of assessment with its marking effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssessmentType {
    pub name: String,
    pub code: String,
    pub weighting: f64,
    #[serde(default)]
    pub marking_minutes_per_script: f64,
}

impl Entity for AssessmentType {
    const COLLECTION: Collection = Collection::AssessmentTypes;
    const FILTERS: &'static [FilterField] = &[FilterField::text("code")];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("name", &self.name)?;
        ensure_not_blank("code", &self.code)?;
        ensure_in_range("weighting", self.weighting, 0.0, 100.0)?;
        ensure_non_negative("markingMinutesPerScript", self.marking_minutes_per_script)
    }

    fn normalise(&mut self) {
        trim(&mut self.name);
        trim(&mut self.code);
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::per_organisation("code", &self.code)]
    }
}

/// Admin hours assigned to a lecturer.
///
/// Writes go through the allocation service so the owning lecturer's cached
/// totals change in the same commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AdminAllocation {
    pub lecturer_id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_type_id: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_year_id: Option<DocumentId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub hours: f64,
}

impl Entity for AdminAllocation {
    const COLLECTION: Collection = Collection::AdminAllocations;
    const FILTERS: &'static [FilterField] = &[
        FilterField::id("lecturerId"),
        FilterField::id("allocationTypeId"),
        FilterField::id("academicYearId"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_positive("hours", self.hours)?;
        ensure_not_blank("title", &self.title)
    }

    fn normalise(&mut self) {
        trim(&mut self.title);
        trim_optional(&mut self.description);
    }

    fn references(&self) -> Vec<Reference> {
        [
            Some(Reference::to(
                "lecturerId",
                Collection::Lecturers,
                self.lecturer_id,
            )),
            Reference::maybe(
                "allocationTypeId",
                Collection::AllocationTypes,
                self.allocation_type_id,
            ),
            Reference::maybe(
                "academicYearId",
                Collection::AcademicYears,
                self.academic_year_id,
            ),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Teaching hours assigned to a lecturer on a module iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModuleAllocation {
    pub lecturer_id: DocumentId,
    pub module_iteration_id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub hours: f64,
}

impl Entity for ModuleAllocation {
    const COLLECTION: Collection = Collection::ModuleAllocations;
    const FILTERS: &'static [FilterField] = &[
        FilterField::id("lecturerId"),
        FilterField::id("moduleIterationId"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_positive("hours", self.hours)
    }

    fn normalise(&mut self) {
        trim_optional(&mut self.role);
    }

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference::to("lecturerId", Collection::Lecturers, self.lecturer_id),
            Reference::to(
                "moduleIterationId",
                Collection::ModuleIterations,
                self.module_iteration_id,
            ),
        ]
    }
}

/// Formula turning a student count into allocation hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkloadCalculationRule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_type_id: Option<DocumentId>,
    #[serde(default)]
    pub base_hours: f64,
    #[serde(default)]
    pub hours_per_student: f64,
    pub multiplier: f64,
}

impl WorkloadCalculationRule {
    /// `(baseHours + hoursPerStudent × students) × multiplier`.
    ///
    /// # Examples
    /// ```
    /// use workload_backend::domain::entities::WorkloadCalculationRule;
    ///
    /// let rule = WorkloadCalculationRule {
    ///     name: "Marking".into(),
    ///     allocation_type_id: None,
    ///     base_hours: 10.0,
    ///     hours_per_student: 0.5,
    ///     multiplier: 2.0,
    /// };
    /// assert_eq!(rule.evaluate(40), 60.0);
    /// ```
    #[must_use]
    pub fn evaluate(&self, student_count: u32) -> f64 {
        (self.base_hours + self.hours_per_student * f64::from(student_count)) * self.multiplier
    }
}

impl Entity for WorkloadCalculationRule {
    const COLLECTION: Collection = Collection::WorkloadCalculationRules;
    const FILTERS: &'static [FilterField] = &[FilterField::id("allocationTypeId")];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("name", &self.name)?;
        ensure_non_negative("baseHours", self.base_hours)?;
        ensure_non_negative("hoursPerStudent", self.hours_per_student)?;
        ensure_positive("multiplier", self.multiplier)
    }

    fn normalise(&mut self) {
        trim(&mut self.name);
    }

    fn references(&self) -> Vec<Reference> {
        Reference::maybe(
            "allocationTypeId",
            Collection::AllocationTypes,
            self.allocation_type_id,
        )
        .into_iter()
        .collect()
    }
}
