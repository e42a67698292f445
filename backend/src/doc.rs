//! OpenAPI document for the `/api/v1` surface and health probes.
//!
//! Only the fixed-path handlers are listed. The per-collection CRUD routes
//! are mounted generically and share the `Error` schema registered here.
//! Swagger UI serves this document at `/docs` in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::allocation_service::LecturerWorkload;
use crate::domain::migrations::MigrationInfo;
use crate::domain::reporting_service::{GenerateReport, RuleEvaluation};
use crate::domain::test_runs::{SuiteInfo, TestRunStats};
use crate::domain::workload::{WorkloadAggregate, WorkloadLimits};
use crate::domain::{Error, ErrorCode};
use crate::inbound::http::auth::{CurrentUser, LoginRequest};

/// Adds the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the workload API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Workload backend API",
        description = "Lecturer workload allocation, reporting and academic calendar management."
    ),
    servers((url = "/", description = "Relative to the deployment base URL")),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::current_user,
        crate::inbound::http::allocations::set_admin_allocations,
        crate::inbound::http::allocations::recalculate_lecturer,
        crate::inbound::http::allocations::lecturer_workload,
        crate::inbound::http::calendar::activate_academic_year,
        crate::inbound::http::reporting::refresh_team_summary,
        crate::inbound::http::reporting::generate_report,
        crate::inbound::http::reporting::publish_report,
        crate::inbound::http::reporting::export_report,
        crate::inbound::http::reporting::evaluate_rule,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        LoginRequest,
        CurrentUser,
        LecturerWorkload,
        WorkloadLimits,
        WorkloadAggregate,
        GenerateReport,
        RuleEvaluation,
        MigrationInfo,
        SuiteInfo,
        TestRunStats,
    )),
    tags(
        (name = "session", description = "Login and the signed-in user"),
        (name = "workload", description = "Allocations and lecturer figures"),
        (name = "calendar", description = "Academic years"),
        (name = "reporting", description = "Summaries, reports and calculation rules"),
        (name = "health", description = "Probes")
    )
)]
pub struct ApiDoc;
