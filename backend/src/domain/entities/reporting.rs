//! Server-generated aggregates: team summaries and workload reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::document::{Collection, DocumentId};
use crate::domain::entity::{Entity, FilterField};

/// Aggregate workload for one team, optionally within one academic year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TeamSummary {
    pub team_id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_year_id: Option<DocumentId>,
    pub lecturer_count: u32,
    pub total_contract: f64,
    pub total_allocated: f64,
    pub capacity: f64,
    pub over_allocated_count: u32,
    pub generated_at: DateTime<Utc>,
}

impl Entity for TeamSummary {
    const COLLECTION: Collection = Collection::TeamSummaries;
    const FILTERS: &'static [FilterField] = &[
        FilterField::id("teamId"),
        FilterField::id("academicYearId"),
    ];
    const READ_ONLY: bool = true;
}

/// Lifecycle of a workload report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Generated,
    Published,
}

/// One lecturer's line in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub lecturer_id: DocumentId,
    pub full_name: String,
    pub total_contract: f64,
    pub teaching_hours: f64,
    pub admin_hours: f64,
    pub total_allocated: f64,
    pub capacity: f64,
    /// Share of the contract allocated, e.g. `"87.5%"`; `None` for a zero contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilisation: Option<String>,
    pub over_allocated: bool,
}

/// Column totals for a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    pub lecturer_count: u32,
    pub total_contract: f64,
    pub teaching_hours: f64,
    pub admin_hours: f64,
    pub total_allocated: f64,
    pub capacity: f64,
    pub over_allocated_count: u32,
}

/// A generated workload report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkloadReport {
    pub academic_year_id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<DocumentId>,
    pub title: String,
    pub status: ReportStatus,
    pub rows: Vec<ReportRow>,
    pub totals: ReportTotals,
    pub generated_by: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Entity for WorkloadReport {
    const COLLECTION: Collection = Collection::WorkloadReports;
    const FILTERS: &'static [FilterField] = &[
        FilterField::id("academicYearId"),
        FilterField::id("teamId"),
        FilterField::text("status"),
    ];
    const READ_ONLY: bool = true;
}
