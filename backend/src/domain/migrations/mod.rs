//! Best-effort data migrations over stored documents.
//!
//! A [`DataMigration`] scans documents and patches them one commit at a
//! time. Failures on individual records are collected in the
//! [`MigrationReport`] and the scan carries on; only an error returned from
//! [`DataMigration::run`] marks the whole run as failed. Every run, failed
//! or not, is recorded as a `migration_runs` document, and every patched
//! record is committed with a `migrate` audit entry naming the run's actor.

mod default_organisation;
mod embedded_assessments;
mod lecturer_aggregates;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::document::{Document, DocumentId, DocumentMeta, StoredDocument};
use super::entities::{AuditAction, MigrationRecordError, MigrationRun, MigrationStatus};
use super::entity::Entity;
use super::format::format_duration;
use super::ports::{DocumentQuery, WriteBatch};
use super::store_access::{StoreAccess, encode};
use super::Error;

pub use default_organisation::AssignDefaultOrganisation;
pub use embedded_assessments::SplitEmbeddedAssessments;
pub use lecturer_aggregates::RecalculateLecturerAggregates;

/// Counters and record-level failures gathered during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationReport {
    migration: String,
    actor: String,
    scanned: u32,
    patched: u32,
    errors: Vec<MigrationRecordError>,
}

impl MigrationReport {
    /// Empty report for `migration` run on behalf of `actor`.
    pub fn new(migration: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            migration: migration.into(),
            actor: actor.into(),
            scanned: 0,
            patched: 0,
            errors: Vec::new(),
        }
    }

    /// Actor the run's writes are attributed to.
    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Audit entry recording that the run wrote `target`.
    pub fn audit(
        &self,
        access: &StoreAccess,
        target: &StoredDocument,
    ) -> Result<StoredDocument, Error> {
        access.audit(
            AuditAction::Migrate,
            target,
            &self.actor,
            Some(self.migration.clone()),
        )
    }
    /// Count one examined document.
    pub fn scanned(&mut self) {
        self.scanned += 1;
    }

    /// Note a record that could not be migrated.
    pub fn record_error(&mut self, document_id: Option<DocumentId>, message: impl Into<String>) {
        let message = message.into();
        warn!(?document_id, %message, "migration record failed");
        self.errors.push(MigrationRecordError {
            document_id,
            message,
        });
    }

    /// Commit one record's patch with its audit entry, counting it or
    /// recording the failure.
    ///
    /// `target` is the patched document as staged in `batch`.
    pub async fn apply(
        &mut self,
        access: &StoreAccess,
        target: &StoredDocument,
        mut batch: WriteBatch,
    ) {
        let outcome = match self.audit(access, target) {
            Ok(entry) => {
                batch.insert(entry);
                access.commit(batch).await
            }
            Err(err) => Err(err),
        };
        match outcome {
            Ok(()) => self.patched += 1,
            Err(err) => self.record_error(Some(target.meta.id), err.message()),
        }
    }

    /// Documents examined so far.
    #[must_use]
    pub fn scanned_count(&self) -> u32 {
        self.scanned
    }

    /// Documents patched so far.
    #[must_use]
    pub fn patched_count(&self) -> u32 {
        self.patched
    }

    /// Record-level failures so far.
    #[must_use]
    pub fn errors(&self) -> &[MigrationRecordError] {
        &self.errors
    }
}

/// A named, re-runnable data fix-up.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataMigration: Send + Sync {
    /// Stable kebab-case name used to invoke the migration.
    fn name(&self) -> &'static str;

    /// One-line summary.
    fn description(&self) -> &'static str;

    /// Scan and patch documents, reporting progress into `report`.
    async fn run(&self, access: &StoreAccess, report: &mut MigrationReport) -> Result<(), Error>;
}

/// Listing entry for an available migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MigrationInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// Runs migrations by name and records their outcome.
#[derive(Clone)]
pub struct DataMigrationService {
    access: StoreAccess,
    migrations: Vec<Arc<dyn DataMigration>>,
}

impl DataMigrationService {
    /// Runner over an explicit migration set.
    pub fn new(access: StoreAccess, migrations: Vec<Arc<dyn DataMigration>>) -> Self {
        Self { access, migrations }
    }

    /// Runner with every built-in migration.
    pub fn with_builtin(access: StoreAccess) -> Self {
        Self::new(
            access,
            vec![
                Arc::new(AssignDefaultOrganisation),
                Arc::new(RecalculateLecturerAggregates),
                Arc::new(SplitEmbeddedAssessments),
            ],
        )
    }

    /// Available migrations in registration order.
    pub fn list(&self) -> Vec<MigrationInfo> {
        self.migrations
            .iter()
            .map(|migration| MigrationInfo {
                name: migration.name(),
                description: migration.description(),
            })
            .collect()
    }

    /// Recorded runs, newest first.
    pub async fn history(&self, limit: Option<usize>) -> Result<Vec<Document<MigrationRun>>, Error> {
        let mut runs: Vec<_> = self
            .access
            .query_entities::<MigrationRun>(&DocumentQuery::new(MigrationRun::COLLECTION))
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

    /// Run `name` and record the outcome.
    ///
    /// A migration that fails outright still yields `Ok` with a `failed`
    /// run; only an unknown name or a failure to record the run is an error.
    pub async fn run(&self, name: &str, actor: &str) -> Result<Document<MigrationRun>, Error> {
        let migration = self
            .migrations
            .iter()
            .find(|migration| migration.name() == name)
            .ok_or_else(|| Error::not_found(format!("unknown migration `{name}`")))?;

        info!(migration = name, "data migration started");
        let started_at = self.access.now();
        let mut report = MigrationReport::new(name, actor);
        let outcome = migration.run(&self.access, &mut report).await;
        let finished_at = self.access.now();
        let duration_ms = (finished_at - started_at).num_milliseconds();

        let (status, failure) = match outcome {
            Err(err) => (MigrationStatus::Failed, Some(err.message().to_owned())),
            Ok(()) if report.errors.is_empty() => (MigrationStatus::Completed, None),
            Ok(()) => (MigrationStatus::CompletedWithErrors, None),
        };
        let run = MigrationRun {
            migration: migration.name().to_owned(),
            status,
            scanned: report.scanned,
            patched: report.patched,
            errors: report.errors,
            started_at,
            finished_at,
            duration_ms,
            duration_label: format_duration(duration_ms),
            failure,
        };

        let next = encode(DocumentMeta::new(None, finished_at), &run)?;
        let mut batch = WriteBatch::new();
        batch.insert(next.clone());
        batch.insert(self.access.audit(
            AuditAction::Migrate,
            &next,
            actor,
            Some(format!("{name}: {status:?}")),
        )?);
        self.access.commit(batch).await?;
        info!(
            migration = name,
            ?status,
            scanned = run.scanned,
            patched = run.patched,
            errors = run.errors.len(),
            "data migration finished"
        );
        Ok(Document {
            meta: next.meta,
            body: run,
        })
    }
}

#[cfg(test)]
mod tests;
