//! Route table for the `/api/v1` scope.
//!
//! Fixed paths such as `/workload-reports/generate` and `/users/me` are
//! registered before the collection resources, whose `{id}` segment would
//! otherwise capture them.

use actix_web::web;

use super::allocations::{
    allocation_routes, lecturer_workload, recalculate_lecturer, set_admin_allocations,
};
use super::auth::{current_user, login, logout};
use super::calendar::activate_academic_year;
use super::documents::{collection_routes, read_routes};
use super::reporting::{
    evaluate_rule, export_report, generate_report, publish_report, refresh_team_summary,
};
use crate::domain::entities::{
    AcademicYear, AdminAllocation, AllocationType, AssessmentType, AuditLog, Cohort, Course,
    CourseModule, Lecturer, MigrationRun, Module, ModuleAllocation, ModuleAssessment,
    ModuleIteration, Organisation, SemesterPeriod, Team, TeamSummary, TestRun, UserAccount,
    WorkloadCalculationRule, WorkloadReport,
};

/// Register every `/api/v1` handler on `cfg`.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(logout)
        .service(current_user)
        .service(set_admin_allocations)
        .service(recalculate_lecturer)
        .service(lecturer_workload)
        .service(activate_academic_year)
        .service(refresh_team_summary)
        .service(generate_report)
        .service(publish_report)
        .service(export_report)
        .service(evaluate_rule);

    cfg.configure(collection_routes::<Organisation>)
        .configure(collection_routes::<UserAccount>)
        .configure(collection_routes::<AcademicYear>)
        .configure(collection_routes::<SemesterPeriod>)
        .configure(collection_routes::<Team>)
        .configure(collection_routes::<Lecturer>)
        .configure(collection_routes::<Module>)
        .configure(collection_routes::<ModuleIteration>)
        .configure(collection_routes::<ModuleAssessment>)
        .configure(collection_routes::<Course>)
        .configure(collection_routes::<CourseModule>)
        .configure(collection_routes::<Cohort>)
        .configure(collection_routes::<AllocationType>)
        .configure(collection_routes::<AssessmentType>)
        .configure(collection_routes::<WorkloadCalculationRule>)
        .configure(allocation_routes::<AdminAllocation>)
        .configure(allocation_routes::<ModuleAllocation>)
        .configure(read_routes::<TeamSummary>)
        .configure(read_routes::<WorkloadReport>)
        .configure(read_routes::<AuditLog>)
        .configure(read_routes::<MigrationRun>)
        .configure(read_routes::<TestRun>);
}
