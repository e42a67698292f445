//! Tests for the migration runner and built-in migrations.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{Duration, Utc};
use mockable::MockClock;
use rstest::rstest;
use serde_json::json;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::document::{Collection, StoredDocument};
use crate::domain::document_service::DocumentService;
use crate::domain::entities::{AuditLog, Lecturer, ModuleAssessment, Organisation, Team};
use crate::domain::ports::DocumentStore;
use crate::domain::test_fixtures::{ACTOR, Harness, fixture_timestamp, lecturer_payload};
use crate::outbound::memory::MemoryDocumentStore;

fn runner(harness: &Harness) -> DataMigrationService {
    DataMigrationService::with_builtin(harness.access.clone())
}

async fn seed(harness: &Harness, document: StoredDocument) {
    let mut batch = WriteBatch::new();
    batch.insert(document);
    harness.store.commit(batch).await.expect("seeded");
}

/// `migrate` audit entries written for documents of `collection`.
async fn migrate_entries(harness: &Harness, collection: Collection) -> Vec<AuditLog> {
    harness
        .all(Collection::AuditLogs)
        .await
        .iter()
        .map(|document| document.decode::<AuditLog>().expect("audit entry"))
        .filter(|entry| entry.action == AuditAction::Migrate && entry.entity_type == collection)
        .collect()
}

#[rstest]
#[tokio::test]
async fn unknown_migrations_are_not_found() {
    let harness = Harness::new();
    let err = runner(&harness)
        .run("drop-everything", ACTOR)
        .await
        .expect_err("unknown");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
fn builtin_migrations_are_listed() {
    let harness = Harness::new();
    let names: Vec<_> = runner(&harness)
        .list()
        .into_iter()
        .map(|info| info.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "assign-default-organisation",
            "recalculate-lecturer-aggregates",
            "split-embedded-assessments",
        ]
    );
}

#[rstest]
#[tokio::test]
async fn top_level_failures_are_recorded_as_failed_runs() {
    let harness = Harness::new();
    let mut migration = MockDataMigration::new();
    migration.expect_name().return_const("explode");
    migration.expect_description().return_const("always fails");
    migration.expect_run().times(1).returning(|_, report| {
        report.scanned();
        Err(Error::service_unavailable("store offline"))
    });
    let service = DataMigrationService::new(harness.access.clone(), vec![Arc::new(migration)]);

    let run = service.run("explode", ACTOR).await.expect("run recorded");

    assert_eq!(run.body.status, MigrationStatus::Failed);
    assert_eq!(run.body.failure.as_deref(), Some("store offline"));
    assert_eq!(run.body.scanned, 1);
    assert_eq!(run.body.duration_label, "0ms");
    let history = service.history(None).await.expect("history");
    assert_eq!(history.len(), 1);
}

#[rstest]
#[tokio::test]
async fn durations_come_from_the_clock() {
    let ticks = Arc::new(AtomicI64::new(0));
    let mut clock = MockClock::new();
    clock.expect_utc().returning(move || {
        let tick = ticks.fetch_add(1, Ordering::SeqCst);
        fixture_timestamp() + Duration::milliseconds(1500 * tick)
    });
    let access = StoreAccess::new(Arc::new(MemoryDocumentStore::new()), Arc::new(clock));
    let mut migration = MockDataMigration::new();
    migration.expect_name().return_const("noop");
    migration.expect_description().return_const("does nothing");
    migration.expect_run().times(1).returning(|_, _| Ok(()));

    let run = DataMigrationService::new(access, vec![Arc::new(migration)])
        .run("noop", ACTOR)
        .await
        .expect("run recorded");

    assert_eq!(run.body.duration_ms, 1500);
    assert_eq!(run.body.duration_label, "1.5s");
}

#[rstest]
#[tokio::test]
async fn orphaned_documents_join_the_default_organisation() {
    let harness = Harness::new();
    let team = DocumentService::<Team>::new(harness.access.clone())
        .create(json!({ "name": "Computing", "code": "COMP" }), ACTOR)
        .await
        .expect("team");

    let run = runner(&harness)
        .run("assign-default-organisation", ACTOR)
        .await
        .expect("run");

    assert_eq!(run.body.status, MigrationStatus::Completed);
    assert_eq!(run.body.patched, 1);
    let organisations = harness.all(Collection::Organisations).await;
    assert_eq!(organisations.len(), 1);
    let default: Organisation = organisations[0].decode().expect("organisation");
    assert_eq!(default.code, "DEFAULT");
    let stored = harness.stored(Collection::Teams, team.meta.id).await;
    assert_eq!(stored.meta.organisation_id, Some(organisations[0].meta.id));
    let entries = migrate_entries(&harness, Collection::Teams).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entity_id, team.meta.id);
    assert_eq!(entries[0].actor_id, ACTOR);
    assert_eq!(entries[0].summary.as_deref(), Some("assign-default-organisation"));

    let again = runner(&harness)
        .run("assign-default-organisation", ACTOR)
        .await
        .expect("second run");
    assert_eq!(again.body.patched, 0);
    assert_eq!(harness.all(Collection::Organisations).await.len(), 1);
}

#[rstest]
#[tokio::test]
async fn drifted_lecturers_are_recalculated() {
    let harness = Harness::new();
    let service = DocumentService::<Lecturer>::new(harness.access.clone());
    let healthy = service
        .create(lecturer_payload("ada@example.ac.uk"), ACTOR)
        .await
        .expect("lecturer");
    let drifted = service
        .create(lecturer_payload("grace@example.ac.uk"), ACTOR)
        .await
        .expect("lecturer");
    let mut stored = harness.stored(Collection::Lecturers, drifted.meta.id).await;
    stored.body["allocatedTeachingHours"] = json!(75.0);
    stored.body["totalAllocated"] = json!(75.0);
    let mut batch = WriteBatch::new();
    batch.replace(stored);
    harness.store.commit(batch).await.expect("drift");

    let run = runner(&harness)
        .run("recalculate-lecturer-aggregates", ACTOR)
        .await
        .expect("run");

    assert_eq!(run.body.scanned, 2);
    assert_eq!(run.body.patched, 1);
    let repaired: Lecturer = harness
        .stored(Collection::Lecturers, drifted.meta.id)
        .await
        .decode()
        .expect("lecturer");
    assert_eq!(repaired.allocated_teaching_hours, 0.0);
    assert_eq!(repaired.capacity, 1000.0);
    let untouched = harness.stored(Collection::Lecturers, healthy.meta.id).await;
    assert_eq!(untouched.meta.updated_at, healthy.meta.updated_at);
    let entries = migrate_entries(&harness, Collection::Lecturers).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entity_id, drifted.meta.id);
}

#[rstest]
#[tokio::test]
async fn embedded_assessments_are_split_and_bad_entries_reported() {
    let harness = Harness::new();
    let iteration = StoredDocument {
        collection: Collection::ModuleIterations,
        meta: DocumentMeta::new(None, Utc::now()),
        body: json!({
            "moduleId": DocumentId::random().to_string(),
            "academicYearId": DocumentId::random().to_string(),
            "assessments": [
                { "title": "Coursework", "weighting": 40.0 },
                { "title": "Exam", "weighting": 60.0 },
                { "title": "Viva", "weighting": 140.0 },
                "garbage",
            ],
        }),
    };
    let iteration_id = iteration.meta.id;
    seed(&harness, iteration).await;

    let run = runner(&harness)
        .run("split-embedded-assessments", ACTOR)
        .await
        .expect("run");

    assert_eq!(run.body.status, MigrationStatus::CompletedWithErrors);
    assert_eq!(run.body.patched, 1);
    assert_eq!(run.body.errors.len(), 2);
    assert!(
        run.body
            .errors
            .iter()
            .all(|error| error.document_id == Some(iteration_id))
    );

    let assessments: Vec<ModuleAssessment> = harness
        .all(Collection::ModuleAssessments)
        .await
        .iter()
        .map(|document| document.decode().expect("assessment"))
        .collect();
    assert_eq!(assessments.len(), 2);
    assert!(assessments.iter().all(|a| a.module_iteration_id == iteration_id));

    let remaining = harness
        .stored(Collection::ModuleIterations, iteration_id)
        .await;
    assert_eq!(
        remaining.field("assessments").and_then(|value| value.as_array()).map(Vec::len),
        Some(2)
    );
    assert_eq!(
        migrate_entries(&harness, Collection::ModuleIterations).await.len(),
        1
    );
    assert_eq!(
        migrate_entries(&harness, Collection::ModuleAssessments).await.len(),
        2
    );
}
