//! Typed bodies for every collection.
//!
//! Each type implements [`Entity`](super::entity::Entity) and declares its
//! own filters, uniqueness rules and references next to its fields.

mod allocation;
mod calendar;
mod curriculum;
mod organisation;
mod records;
mod reporting;
mod staff;

pub use allocation::{
    AdminAllocation, AllocationCategory, AllocationType, AssessmentType, ModuleAllocation,
    WorkloadCalculationRule,
};
pub use calendar::{AcademicYear, SemesterPeriod};
pub use curriculum::{
    Cohort, Course, CourseModule, EmbeddedAssessment, Module, ModuleAssessment, ModuleIteration,
};
pub use organisation::{DEFAULT_ORGANISATION_CODE, Organisation, Role, UserAccount};
pub use records::{
    AuditAction, AuditLog, MigrationRecordError, MigrationRun, MigrationStatus, TestCaseResult,
    TestRun, TestStatus,
};
pub use reporting::{ReportRow, ReportStatus, ReportTotals, TeamSummary, WorkloadReport};
pub use staff::{Lecturer, Team};

/// Trim surrounding whitespace in place.
pub(crate) fn trim(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_owned();
    }
}

/// Trim an optional string, dropping it when nothing remains.
pub(crate) fn trim_optional(value: &mut Option<String>) {
    if let Some(text) = value.as_mut() {
        trim(text);
    }
    if value.as_deref().is_some_and(str::is_empty) {
        *value = None;
    }
}
