//! Tests for summaries, reports and rules.

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::domain::ErrorCode;
use crate::domain::allocation_service::AllocationService;
use crate::domain::document::Collection;
use crate::domain::document_service::DocumentService;
use crate::domain::entities::Organisation;
use crate::domain::test_fixtures::{ACTOR, Harness, lecturer_payload};

struct Department {
    harness: Harness,
    team: DocumentId,
    year: DocumentId,
}

#[fixture]
async fn department() -> Department {
    let harness = Harness::new();
    let access = harness.access.clone();
    let team = DocumentService::<Team>::new(access.clone())
        .create(json!({ "name": "Computing", "code": "COMP" }), ACTOR)
        .await
        .expect("team")
        .meta
        .id;
    let year = DocumentService::<AcademicYear>::new(access.clone())
        .create(
            json!({ "name": "2025-26", "startDate": "2025-09-01", "endDate": "2026-07-31" }),
            ACTOR,
        )
        .await
        .expect("year")
        .meta
        .id;

    let allocations = AllocationService::new(access.clone());
    for (email, name, hours) in [
        ("grace@example.ac.uk", "Grace Hopper", 1200.0),
        ("ada@example.ac.uk", "Ada Lovelace", 500.0),
    ] {
        let mut payload: Value = lecturer_payload(email);
        payload["fullName"] = json!(name);
        payload["teamId"] = json!(team.to_string());
        let lecturer = DocumentService::<Lecturer>::new(access.clone())
            .create(payload, ACTOR)
            .await
            .expect("lecturer");
        allocations
            .create_admin_allocation(
                json!({
                    "lecturerId": lecturer.meta.id.to_string(),
                    "title": "Leadership",
                    "hours": hours,
                }),
                ACTOR,
            )
            .await
            .expect("allocation");
    }
    Department {
        harness,
        team,
        year,
    }
}

#[rstest]
#[tokio::test]
async fn reports_snapshot_each_lecturer(#[future] department: Department) {
    let department = department.await;
    let service = ReportingService::new(department.harness.access.clone());

    let report = service
        .generate_workload_report(
            GenerateReport {
                academic_year_id: department.year,
                team_id: Some(department.team),
                title: None,
            },
            ACTOR,
        )
        .await
        .expect("report");

    let body = &report.body;
    assert_eq!(body.title, "Computing workload 2025-26");
    assert_eq!(body.status, ReportStatus::Generated);
    assert_eq!(body.rows.len(), 2);
    assert_eq!(body.rows[0].full_name, "Ada Lovelace");
    assert_eq!(body.rows[0].utilisation.as_deref(), Some("50%"));
    assert!(!body.rows[0].over_allocated);
    assert!(body.rows[1].over_allocated);
    assert_eq!(body.totals.lecturer_count, 2);
    assert_eq!(body.totals.total_allocated, 1700.0);
    assert_eq!(body.totals.over_allocated_count, 1);
}

#[rstest]
#[tokio::test]
async fn publishing_twice_conflicts(#[future] department: Department) {
    let department = department.await;
    let service = ReportingService::new(department.harness.access.clone());
    let report = service
        .generate_workload_report(
            GenerateReport {
                academic_year_id: department.year,
                team_id: None,
                title: Some("Autumn review".to_owned()),
            },
            ACTOR,
        )
        .await
        .expect("report");

    let published = service
        .publish_report(report.meta.id, ACTOR)
        .await
        .expect("published");
    assert_eq!(published.body.status, ReportStatus::Published);
    assert!(published.body.published_at.is_some());

    let err = service
        .publish_report(report.meta.id, ACTOR)
        .await
        .expect_err("already published");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn exports_render_csv_and_html(#[future] department: Department) {
    let department = department.await;
    let service = ReportingService::new(department.harness.access.clone());
    let report = service
        .generate_workload_report(
            GenerateReport {
                academic_year_id: department.year,
                team_id: None,
                title: None,
            },
            ACTOR,
        )
        .await
        .expect("report");

    let csv = service
        .export_report(report.meta.id, ReportFormat::Csv)
        .await
        .expect("csv");
    assert_eq!(csv.content_type, "text/csv; charset=utf-8");
    let mut lines = csv.body.lines();
    assert_eq!(lines.next(), Some(CSV_HEADER));
    assert_eq!(
        lines.next(),
        Some("Ada Lovelace,1000,0,500,500,500,50%,no")
    );

    let html = service
        .export_report(report.meta.id, ReportFormat::Html)
        .await
        .expect("html");
    assert!(html.body.contains("<tr class=\"report-row over-allocated\">"));
    assert!(html.body.contains("<tr class=\"report-row\">"));
}

#[rstest]
#[tokio::test]
async fn team_summaries_are_upserted(#[future] department: Department) {
    let department = department.await;
    let service = ReportingService::new(department.harness.access.clone());

    let first = service
        .refresh_team_summary(department.team, Some(department.year), ACTOR)
        .await
        .expect("summary");
    let second = service
        .refresh_team_summary(department.team, Some(department.year), ACTOR)
        .await
        .expect("summary again");

    assert_eq!(first.meta.id, second.meta.id);
    assert_eq!(second.body.lecturer_count, 2);
    assert_eq!(second.body.over_allocated_count, 1);
    assert_eq!(
        department.harness.all(Collection::TeamSummaries).await.len(),
        1
    );
}

#[rstest]
#[tokio::test]
async fn reports_stay_within_the_organisation() {
    let harness = Harness::new();
    let access = harness.access.clone();
    let mut organisations = Vec::new();
    for (name, code) in [("North University", "NORTH"), ("South University", "SOUTH")] {
        let organisation = DocumentService::<Organisation>::new(access.clone())
            .create(json!({ "name": name, "code": code }), ACTOR)
            .await
            .expect("organisation");
        organisations.push(organisation.meta.id.to_string());
    }
    let north = &organisations[0];
    let team = DocumentService::<Team>::new(access.clone())
        .create(
            json!({ "name": "Computing", "code": "COMP", "organisationId": north }),
            ACTOR,
        )
        .await
        .expect("team")
        .meta
        .id;
    let year = DocumentService::<AcademicYear>::new(access.clone())
        .create(
            json!({
                "name": "2025-26",
                "startDate": "2025-09-01",
                "endDate": "2026-07-31",
                "organisationId": north,
            }),
            ACTOR,
        )
        .await
        .expect("year")
        .meta
        .id;
    for (email, organisation) in [
        ("ada@north.ac.uk", &organisations[0]),
        ("grace@south.ac.uk", &organisations[1]),
    ] {
        let mut payload: Value = lecturer_payload(email);
        payload["teamId"] = json!(team.to_string());
        payload["organisationId"] = json!(organisation);
        DocumentService::<Lecturer>::new(access.clone())
            .create(payload, ACTOR)
            .await
            .expect("lecturer");
    }
    let service = ReportingService::new(access);

    let report = service
        .generate_workload_report(
            GenerateReport {
                academic_year_id: year,
                team_id: None,
                title: None,
            },
            ACTOR,
        )
        .await
        .expect("report");
    assert_eq!(report.meta.organisation_id.map(|id| id.to_string()).as_ref(), Some(north));
    assert_eq!(report.body.rows.len(), 1);

    let summary = service
        .refresh_team_summary(team, Some(year), ACTOR)
        .await
        .expect("summary");
    assert_eq!(summary.body.lecturer_count, 1);
}

#[rstest]
#[case(0, 10.0)]
#[case(30, 40.0)]
#[tokio::test]
async fn rules_scale_with_students(#[case] students: u32, #[case] expected: f64) {
    let harness = Harness::new();
    let rule = DocumentService::<WorkloadCalculationRule>::new(harness.access.clone())
        .create(
            json!({
                "name": "Project supervision",
                "baseHours": 5.0,
                "hoursPerStudent": 0.5,
                "multiplier": 2.0,
            }),
            ACTOR,
        )
        .await
        .expect("rule");

    let evaluation = ReportingService::new(harness.access.clone())
        .evaluate_rule(rule.meta.id, students)
        .await
        .expect("evaluated");
    assert_eq!(evaluation.hours, expected);
}

#[rstest]
fn unknown_export_formats_are_rejected() {
    let err = "pdf".parse::<ReportFormat>().expect_err("unsupported");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}
