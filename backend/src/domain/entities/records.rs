//! Operational records: audit entries, migration runs and test runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::trim;
use crate::domain::document::{Collection, DocumentId};
use crate::domain::entity::{Entity, FilterField};
use crate::domain::format::format_duration;
use crate::domain::validation::{ValidationError, ensure_not_blank};

/// Kind of mutation recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Replace,
    Recalculate,
    Activate,
    Generate,
    Publish,
    Migrate,
}

/// One entry of the append-only mutation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuditLog {
    pub action: AuditAction,
    pub entity_type: Collection,
    pub entity_id: DocumentId,
    pub actor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Entity for AuditLog {
    const COLLECTION: Collection = Collection::AuditLogs;
    const FILTERS: &'static [FilterField] = &[
        FilterField::text("action"),
        FilterField::text("entityType"),
        FilterField::id("entityId"),
        FilterField::text("actorId"),
    ];
    const READ_ONLY: bool = true;
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Completed,
    CompletedWithErrors,
    Failed,
}

/// A record the migration could not fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecordError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    pub message: String,
}

/// Audit record for one execution of a data migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MigrationRun {
    pub migration: String,
    pub status: MigrationStatus,
    pub scanned: u32,
    pub patched: u32,
    #[serde(default)]
    pub errors: Vec<MigrationRecordError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub duration_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl Entity for MigrationRun {
    const COLLECTION: Collection = Collection::MigrationRuns;
    const FILTERS: &'static [FilterField] =
        &[FilterField::text("migration"), FilterField::text("status")];
    const READ_ONLY: bool = true;
}

/// Outcome of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
}

/// Result of one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A recorded diagnostic test run.
///
/// `status` and `durationLabel` are derived from the counts and duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TestRun {
    pub suite: String,
    #[serde(default = "default_test_status")]
    pub status: TestStatus,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub duration_ms: i64,
    #[serde(default)]
    pub duration_label: String,
    #[serde(default)]
    pub cases: Vec<TestCaseResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
}

const fn default_test_status() -> TestStatus {
    TestStatus::Passed
}

impl Entity for TestRun {
    const COLLECTION: Collection = Collection::TestRuns;
    const FILTERS: &'static [FilterField] =
        &[FilterField::text("suite"), FilterField::text("status")];
    const READ_ONLY: bool = true;

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("suite", &self.suite)?;
        if u64::from(self.passed) + u64::from(self.failed) != u64::from(self.total) {
            return Err(ValidationError::InvalidFormat {
                field: "total",
                expected: "the sum of passed and failed",
            });
        }
        if self.duration_ms < 0 {
            return Err(ValidationError::Negative {
                field: "durationMs",
            });
        }
        Ok(())
    }

    fn normalise(&mut self) {
        trim(&mut self.suite);
        self.status = if self.failed == 0 {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        };
        self.duration_label = format_duration(self.duration_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::prepare;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn object(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[rstest]
    fn test_runs_derive_status_and_label() {
        let run: TestRun = prepare(object(json!({
            "suite": "calculator",
            "total": 3,
            "passed": 2,
            "failed": 1,
            "durationMs": 1500,
        })))
        .expect("valid run");
        assert_eq!(run.status, TestStatus::Failed);
        assert_eq!(run.duration_label, "1.5s");
    }

    #[rstest]
    fn test_run_counts_must_add_up() {
        let result = prepare::<TestRun>(object(json!({
            "suite": "calculator",
            "total": 5,
            "passed": 2,
            "failed": 1,
            "durationMs": 10,
        })));
        assert!(matches!(
            result,
            Err(ValidationError::InvalidFormat { field: "total", .. })
        ));
    }
}
