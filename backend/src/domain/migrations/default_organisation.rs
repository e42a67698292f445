//! Assign documents that predate tenancy to the default organisation.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::{DataMigration, MigrationReport};
use crate::domain::document::{Collection, DocumentId};
use crate::domain::document_service::DocumentService;
use crate::domain::entities::{DEFAULT_ORGANISATION_CODE, Organisation};
use crate::domain::entity::Entity;
use crate::domain::ports::{DocumentQuery, WriteBatch};
use crate::domain::store_access::StoreAccess;
use crate::domain::Error;

/// Collections whose documents belong to an organisation.
const SCOPED: &[Collection] = &[
    Collection::Users,
    Collection::AcademicYears,
    Collection::SemesterPeriods,
    Collection::Teams,
    Collection::Lecturers,
    Collection::Modules,
    Collection::ModuleIterations,
    Collection::ModuleAssessments,
    Collection::Courses,
    Collection::CourseModules,
    Collection::Cohorts,
    Collection::AllocationTypes,
    Collection::AssessmentTypes,
    Collection::AdminAllocations,
    Collection::ModuleAllocations,
    Collection::WorkloadCalculationRules,
    Collection::TeamSummaries,
    Collection::WorkloadReports,
];

/// Ensure the `DEFAULT` organisation exists and adopt orphaned documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignDefaultOrganisation;

impl AssignDefaultOrganisation {
    async fn default_organisation(access: &StoreAccess, actor: &str) -> Result<DocumentId, Error> {
        let query = DocumentQuery::new(Organisation::COLLECTION)
            .filter("code", DEFAULT_ORGANISATION_CODE);
        if let Some(existing) = access.query(&query).await?.into_iter().next() {
            return Ok(existing.meta.id);
        }
        let created = DocumentService::<Organisation>::new(access.clone())
            .create(
                json!({ "name": "Default organisation", "code": DEFAULT_ORGANISATION_CODE }),
                actor,
            )
            .await?;
        info!(id = %created.meta.id, "default organisation created");
        Ok(created.meta.id)
    }
}

#[async_trait]
impl DataMigration for AssignDefaultOrganisation {
    fn name(&self) -> &'static str {
        "assign-default-organisation"
    }

    fn description(&self) -> &'static str {
        "Create the DEFAULT organisation and assign it to documents without one"
    }

    async fn run(&self, access: &StoreAccess, report: &mut MigrationReport) -> Result<(), Error> {
        let organisation_id = Self::default_organisation(access, report.actor()).await?;
        let now = access.now();
        for collection in SCOPED {
            for document in access.query(&DocumentQuery::new(*collection)).await? {
                report.scanned();
                if document.meta.organisation_id.is_some() {
                    continue;
                }
                let expected = document.meta.updated_at;
                let mut next = document;
                next.meta.organisation_id = Some(organisation_id);
                next.meta.updated_at = now;
                let mut batch = WriteBatch::new();
                batch.replace_if_unchanged(next.clone(), expected);
                report.apply(access, &next, batch).await;
            }
        }
        Ok(())
    }
}
