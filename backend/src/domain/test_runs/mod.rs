//! Recorded diagnostic runs and the in-process suites behind them.

mod suites;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;

use super::document::{Collection, Document, DocumentMeta};
use super::entities::{AuditAction, TestCaseResult, TestRun, TestStatus};
use super::entity::{Entity, prepare, split_payload};
use super::format::{format_duration, format_percentage};
use super::ports::{DocumentQuery, WriteBatch};
use super::store_access::{StoreAccess, encode};
use super::Error;

use suites::Check;

/// Listing entry for a runnable suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SuiteInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub cases: usize,
}

/// Aggregate view over recorded runs.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestRunStats {
    pub total_runs: usize,
    pub passed_runs: usize,
    pub failed_runs: usize,
    pub pass_rate: String,
    pub last_run_at: Option<DateTime<Utc>>,
}

const STORE_SUITE: &str = "store";
const STORE_CASES: usize = 2;

const SUITES: &[(&str, &str, &[Check])] = &[
    (
        "calculator",
        "Workload arithmetic and the shared aggregate",
        suites::CALCULATOR,
    ),
    (
        "formatting",
        "Duration, percentage, class-name and academic-year helpers",
        suites::FORMATTING,
    ),
    (
        "validation",
        "Entity validation rules",
        suites::VALIDATION,
    ),
];

/// Tooling use-cases over `test_runs`.
#[derive(Clone)]
pub struct TestRunService {
    access: StoreAccess,
}

impl TestRunService {
    /// Service over `access`.
    pub fn new(access: StoreAccess) -> Self {
        Self { access }
    }

    /// Runnable suite names.
    pub fn suites(&self) -> Vec<SuiteInfo> {
        SUITES
            .iter()
            .map(|(name, description, checks)| SuiteInfo {
                name,
                description,
                cases: checks.len(),
            })
            .chain(std::iter::once(SuiteInfo {
                name: STORE_SUITE,
                description: "Document store reachability",
                cases: STORE_CASES,
            }))
            .collect()
    }

    /// Recorded runs, newest first.
    pub async fn history(&self, limit: Option<usize>) -> Result<Vec<Document<TestRun>>, Error> {
        let mut runs: Vec<_> = self
            .access
            .query_entities::<TestRun>(&DocumentQuery::new(TestRun::COLLECTION))
            .await?
            .into_iter()
            .map(|(_, typed)| typed)
            .collect();
        runs.reverse();
        if let Some(limit) = limit {
            runs.truncate(limit);
        }
        Ok(runs)
    }

    /// Pass/fail counts across every recorded run.
    pub async fn stats(&self) -> Result<TestRunStats, Error> {
        let runs = self.history(None).await?;
        let passed_runs = runs
            .iter()
            .filter(|run| run.body.status == TestStatus::Passed)
            .count();
        let total_runs = runs.len();
        let pass_rate = if total_runs == 0 {
            0.0
        } else {
            passed_runs as f64 / total_runs as f64
        };
        Ok(TestRunStats {
            total_runs,
            passed_runs,
            failed_runs: total_runs - passed_runs,
            pass_rate: format_percentage(pass_rate),
            last_run_at: runs.first().map(|run| run.meta.created_at),
        })
    }

    async fn store_run(&self, run: TestRun, actor: &str) -> Result<Document<TestRun>, Error> {
        let next = encode(DocumentMeta::new(None, self.access.now()), &run)?;
        let mut batch = WriteBatch::new();
        batch.insert(next.clone());
        batch.insert(self.access.audit(AuditAction::Create, &next, actor, None)?);
        self.access.commit(batch).await?;
        info!(suite = %run.suite, status = ?run.status, "test run recorded");
        Ok(Document {
            meta: next.meta,
            body: run,
        })
    }

    /// Record a run reported by an external runner.
    pub async fn record(&self, payload: Value, actor: &str) -> Result<Document<TestRun>, Error> {
        let (_, body) = split_payload(payload, &["status", "durationLabel"])?;
        let run: TestRun = prepare(body)?;
        self.store_run(run, actor).await
    }

    /// Soft-delete every recorded run, returning how many were removed.
    pub async fn clear(&self, actor: &str) -> Result<usize, Error> {
        let runs = self
            .access
            .query(&DocumentQuery::new(Collection::TestRuns))
            .await?;
        let now = self.access.now();
        let mut batch = WriteBatch::new();
        for run in &runs {
            let mut next = run.clone();
            next.meta.deleted_at = Some(now);
            next.meta.updated_at = now;
            batch.replace_if_unchanged(next, run.meta.updated_at);
            batch.insert(self.access.audit(AuditAction::Delete, run, actor, None)?);
        }
        self.access.commit(batch).await?;
        info!(removed = runs.len(), "test history cleared");
        Ok(runs.len())
    }

    async fn store_checks(&self) -> Vec<TestCaseResult> {
        let probe = DocumentQuery::new(Collection::Organisations).limit(Some(1));
        let reachable = self.access.query(&probe).await;
        let history = self
            .access
            .query_entities::<TestRun>(&DocumentQuery::new(Collection::TestRuns).limit(Some(1)))
            .await;
        vec![
            TestCaseResult {
                name: "store answers queries".to_owned(),
                passed: reachable.is_ok(),
                message: reachable.err().map(|err| err.message().to_owned()),
            },
            TestCaseResult {
                name: "recorded runs decode".to_owned(),
                passed: history.is_ok(),
                message: history.err().map(|err| err.message().to_owned()),
            },
        ]
    }

    async fn execute(&self, name: &str) -> Vec<TestCaseResult> {
        if name == STORE_SUITE {
            return self.store_checks().await;
        }
        SUITES
            .iter()
            .find(|(suite, _, _)| *suite == name)
            .map(|(_, _, checks)| {
                checks
                    .iter()
                    .map(|(case, check)| {
                        let outcome = check();
                        TestCaseResult {
                            name: (*case).to_owned(),
                            passed: outcome.is_ok(),
                            message: outcome.err(),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Run one suite, or every suite for `all`, recording each run.
    pub async fn run(&self, suite: &str, triggered_by: &str) -> Result<Vec<Document<TestRun>>, Error> {
        let names: Vec<&'static str> = if suite == "all" {
            self.suites().into_iter().map(|info| info.name).collect()
        } else {
            let known = self
                .suites()
                .into_iter()
                .find(|info| info.name == suite)
                .ok_or_else(|| Error::not_found(format!("unknown test suite `{suite}`")))?;
            vec![known.name]
        };

        let mut recorded = Vec::with_capacity(names.len());
        for name in names {
            let started = self.access.now();
            let cases = self.execute(name).await;
            let duration_ms = (self.access.now() - started).num_milliseconds();
            let total = u32::try_from(cases.len()).unwrap_or(u32::MAX);
            let passed = u32::try_from(cases.iter().filter(|case| case.passed).count())
                .unwrap_or(u32::MAX);
            let mut run = TestRun {
                suite: name.to_owned(),
                status: TestStatus::Passed,
                total,
                passed,
                failed: total - passed,
                duration_ms,
                duration_label: format_duration(duration_ms),
                cases,
                triggered_by: Some(triggered_by.to_owned()),
            };
            run.normalise();
            recorded.push(self.store_run(run, triggered_by).await?);
        }
        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::test_fixtures::Harness;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn harness() -> Harness {
        Harness::new()
    }

    #[rstest]
    #[tokio::test]
    async fn running_all_suites_records_one_run_each(harness: Harness) {
        let service = TestRunService::new(harness.access.clone());
        let runs = service.run("all", "tooling").await.expect("runs");

        assert_eq!(runs.len(), 4);
        assert!(runs.iter().all(|run| run.body.status == TestStatus::Passed));
        let history = service.history(Some(2)).await.expect("history");
        assert_eq!(history.len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_suites_are_not_found(harness: Harness) {
        let err = TestRunService::new(harness.access.clone())
            .run("chaos", "tooling")
            .await
            .expect_err("unknown");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn recorded_runs_feed_the_stats(harness: Harness) {
        let service = TestRunService::new(harness.access.clone());
        for failed in [0, 0, 0, 1] {
            service
                .record(
                    json!({
                        "suite": "e2e",
                        "total": 4,
                        "passed": 4 - failed,
                        "failed": failed,
                        "durationMs": 2500,
                    }),
                    "ci",
                )
                .await
                .expect("recorded");
        }

        let stats = service.stats().await.expect("stats");
        assert_eq!(stats.total_runs, 4);
        assert_eq!(stats.failed_runs, 1);
        assert_eq!(stats.pass_rate, "75%");
        assert!(stats.last_run_at.is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn invalid_records_are_rejected(harness: Harness) {
        let err = TestRunService::new(harness.access.clone())
            .record(
                json!({ "suite": "e2e", "total": 3, "passed": 1, "failed": 1, "durationMs": 5 }),
                "ci",
            )
            .await
            .expect_err("counts do not add up");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn clearing_soft_deletes_history(harness: Harness) {
        let service = TestRunService::new(harness.access.clone());
        service.run("formatting", "tooling").await.expect("run");

        assert_eq!(service.clear("tooling").await.expect("cleared"), 1);
        assert!(service.history(None).await.expect("history").is_empty());
        assert_eq!(harness.all(Collection::TestRuns).await.len(), 1);
        assert_eq!(service.clear("tooling").await.expect("cleared again"), 0);
    }
}
