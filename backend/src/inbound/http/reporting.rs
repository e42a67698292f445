//! Team summaries, workload reports and calculation rules.
//!
//! ```text
//! POST /api/v1/teams/{id}/summary?academicYearId=
//! POST /api/v1/workload-reports/generate {"academicYearId":"...","teamId":"..."}
//! POST /api/v1/workload-reports/{id}/publish
//! GET  /api/v1/workload-reports/{id}/export?format=csv|html
//! GET  /api/v1/workload-calculation-rules/{id}/evaluate?studentCount=N
//! ```

use actix_web::http::header;
use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use utoipa::IntoParams;

use super::ApiResult;
use super::documents::path_id;
use super::session::SessionContext;
use super::state::HttpState;
use super::validation::{FieldName, missing_field_error, parse_count, parse_id};
use crate::domain::Error;
use crate::domain::document::Document;
use crate::domain::entities::{TeamSummary, WorkloadReport};
use crate::domain::reporting_service::{GenerateReport, ReportFormat, RuleEvaluation};

/// Query for [`refresh_team_summary`].
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    /// Restrict the summary to one academic year.
    pub academic_year_id: Option<String>,
}

/// Query for [`export_report`].
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// `csv` (default) or `html`.
    pub format: Option<String>,
}

/// Query for [`evaluate_rule`].
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateQuery {
    pub student_count: Option<String>,
}

/// Recompute and store a team's summary.
#[utoipa::path(
    post,
    path = "/api/v1/teams/{id}/summary",
    params(("id" = String, Path, description = "Team id"), SummaryQuery),
    responses(
        (status = 200, description = "Stored summary", body = Object),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown team or year", body = Error),
    ),
    tags = ["reporting"],
    operation_id = "refreshTeamSummary"
)]
#[post("/teams/{id}/summary")]
pub async fn refresh_team_summary(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
    query: web::Query<SummaryQuery>,
) -> ApiResult<web::Json<Document<TeamSummary>>> {
    let actor = session.actor()?;
    let team_id = path_id(&id)?;
    let year_id = query
        .academic_year_id
        .as_deref()
        .map(|raw| parse_id(raw, FieldName::new("academicYearId")))
        .transpose()?;
    let summary = state
        .reporting
        .refresh_team_summary(team_id, year_id, &actor)
        .await?;
    Ok(web::Json(summary))
}

/// Snapshot every lecturer's workload into a new report.
#[utoipa::path(
    post,
    path = "/api/v1/workload-reports/generate",
    request_body = GenerateReport,
    responses(
        (status = 201, description = "Generated report", body = Object),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown team or year", body = Error),
    ),
    tags = ["reporting"],
    operation_id = "generateWorkloadReport"
)]
#[post("/workload-reports/generate")]
pub async fn generate_report(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: web::Json<GenerateReport>,
) -> ApiResult<HttpResponse> {
    let actor = session.actor()?;
    let report = state
        .reporting
        .generate_workload_report(request.into_inner(), &actor)
        .await?;
    Ok(HttpResponse::Created().json(report))
}

/// Publish a generated report.
#[utoipa::path(
    post,
    path = "/api/v1/workload-reports/{id}/publish",
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 200, description = "Published report", body = Object),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown report", body = Error),
        (status = 409, description = "Already published", body = Error),
    ),
    tags = ["reporting"],
    operation_id = "publishWorkloadReport"
)]
#[post("/workload-reports/{id}/publish")]
pub async fn publish_report(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
) -> ApiResult<web::Json<Document<WorkloadReport>>> {
    let actor = session.actor()?;
    let id = path_id(&id)?;
    Ok(web::Json(state.reporting.publish_report(id, &actor).await?))
}

/// Download a report as CSV or HTML.
#[utoipa::path(
    get,
    path = "/api/v1/workload-reports/{id}/export",
    params(("id" = String, Path, description = "Report id"), ExportQuery),
    responses(
        (status = 200, description = "Rendered CSV or HTML report", body = String, content_type = "text/csv"),
        (status = 400, description = "Unsupported format", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown report", body = Error),
    ),
    tags = ["reporting"],
    operation_id = "exportWorkloadReport"
)]
#[get("/workload-reports/{id}/export")]
pub async fn export_report(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
    query: web::Query<ExportQuery>,
) -> ApiResult<HttpResponse> {
    session.require_user_id()?;
    let id = path_id(&id)?;
    let format: ReportFormat = query.format.as_deref().unwrap_or("csv").parse()?;
    let exported = state.reporting.export_report(id, format).await?;
    Ok(HttpResponse::Ok()
        .content_type(exported.content_type)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", exported.filename),
        ))
        .body(exported.body))
}

/// Apply a calculation rule to a student count.
#[utoipa::path(
    get,
    path = "/api/v1/workload-calculation-rules/{id}/evaluate",
    params(("id" = String, Path, description = "Rule id"), EvaluateQuery),
    responses(
        (status = 200, description = "Computed hours", body = RuleEvaluation),
        (status = 400, description = "Missing or invalid student count", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown rule", body = Error),
    ),
    tags = ["reporting"],
    operation_id = "evaluateCalculationRule"
)]
#[get("/workload-calculation-rules/{id}/evaluate")]
pub async fn evaluate_rule(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
    query: web::Query<EvaluateQuery>,
) -> ApiResult<web::Json<RuleEvaluation>> {
    session.require_user_id()?;
    let id = path_id(&id)?;
    let field = FieldName::new("studentCount");
    let raw = query
        .student_count
        .as_deref()
        .ok_or_else(|| missing_field_error(field))?;
    let students = parse_count(raw, field)?;
    Ok(web::Json(state.reporting.evaluate_rule(id, students).await?))
}
