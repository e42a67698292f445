//! Tests for the generic CRUD service.

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::entities::{AuditLog, Lecturer, Team, TeamSummary};
use crate::domain::test_fixtures::{ACTOR, Harness, fixture_timestamp, lecturer_payload};

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

fn teams(harness: &Harness) -> DocumentService<Team> {
    DocumentService::new(harness.access.clone())
}

#[rstest]
#[tokio::test]
async fn create_stamps_metadata_and_writes_an_audit_entry(harness: Harness) {
    let team = teams(&harness)
        .create(json!({ "name": " Computing ", "code": "COMP" }), ACTOR)
        .await
        .expect("created");

    assert_eq!(team.body.name, "Computing");
    assert_eq!(team.meta.created_at, fixture_timestamp());
    assert_eq!(team.meta.updated_at, fixture_timestamp());
    assert!(team.meta.is_active);

    let audit = harness.all(Collection::AuditLogs).await;
    let entry: AuditLog = audit
        .first()
        .expect("audit entry")
        .decode()
        .expect("audit body");
    assert_eq!(entry.action, AuditAction::Create);
    assert_eq!(entry.entity_id, team.meta.id);
    assert_eq!(entry.actor_id, ACTOR);
}

#[rstest]
#[tokio::test]
async fn duplicate_codes_in_one_organisation_conflict(harness: Harness) {
    let service = teams(&harness);
    service
        .create(json!({ "name": "Computing", "code": "COMP" }), ACTOR)
        .await
        .expect("first team");

    let err = service
        .create(json!({ "name": "Computing 2", "code": "COMP" }), ACTOR)
        .await
        .expect_err("duplicate code");
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(harness.all(Collection::Teams).await.len(), 1);
}

#[rstest]
#[tokio::test]
async fn list_filters_on_declared_fields_only(harness: Harness) {
    let service = teams(&harness);
    for code in ["COMP", "MATH"] {
        service
            .create(json!({ "name": code, "code": code }), ACTOR)
            .await
            .expect("team");
    }

    let filtered = service
        .list(ListParams {
            filters: vec![("code".to_owned(), "MATH".to_owned())],
            ..ListParams::default()
        })
        .await
        .expect("filtered list");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].body.code, "MATH");

    let err = service
        .list(ListParams {
            filters: vec![("colour".to_owned(), "red".to_owned())],
            ..ListParams::default()
        })
        .await
        .expect_err("unknown filter");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn update_merges_and_clears_fields(harness: Harness) {
    let service = teams(&harness);
    let team = service
        .create(
            json!({ "name": "Computing", "code": "COMP", "description": "Old" }),
            ACTOR,
        )
        .await
        .expect("team");

    let updated = service
        .update(
            team.meta.id,
            json!({ "description": null, "name": "Computer Science", "isActive": false }),
            ACTOR,
        )
        .await
        .expect("updated");
    assert_eq!(updated.body.name, "Computer Science");
    assert_eq!(updated.body.description, None);
    assert_eq!(updated.body.code, "COMP");
    assert!(!updated.meta.is_active);
}

#[rstest]
#[tokio::test]
async fn derived_lecturer_fields_are_rejected(harness: Harness) {
    let service: DocumentService<Lecturer> = DocumentService::new(harness.access.clone());
    let mut payload = lecturer_payload("ada@example.ac.uk");
    payload["capacity"] = json!(5);

    let err = service.create(payload, ACTOR).await.expect_err("derived");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.message(), "capacity is read-only");
}

#[rstest]
#[tokio::test]
async fn removed_documents_disappear(harness: Harness) {
    let service = teams(&harness);
    let team = service
        .create(json!({ "name": "Computing", "code": "COMP" }), ACTOR)
        .await
        .expect("team");

    service.remove(team.meta.id, ACTOR).await.expect("removed");

    let err = service.get(team.meta.id).await.expect_err("gone");
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert!(
        service
            .list(ListParams::default())
            .await
            .expect("list")
            .is_empty()
    );
    let deleted = service
        .list(ListParams {
            include_deleted: true,
            ..ListParams::default()
        })
        .await
        .expect("list with deleted");
    assert_eq!(deleted.len(), 1);

    let second = service.remove(team.meta.id, ACTOR).await.expect_err("twice");
    assert_eq!(second.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn references_must_be_live(harness: Harness) {
    let service = teams(&harness);
    let err = service
        .create(
            json!({
                "name": "Computing",
                "code": "COMP",
                "leadLecturerId": DocumentId::random().to_string(),
            }),
            ACTOR,
        )
        .await
        .expect_err("dangling lead");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert!(harness.all(Collection::Teams).await.is_empty());
}

#[rstest]
#[tokio::test]
async fn read_only_collections_refuse_writes(harness: Harness) {
    let service: DocumentService<TeamSummary> = DocumentService::new(harness.access.clone());
    let err = service
        .create(json!({ "teamId": DocumentId::random().to_string() }), ACTOR)
        .await
        .expect_err("read-only");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}
