//! Academic calendar operations.

use tracing::info;

use super::document::{Document, DocumentId};
use super::entities::{AcademicYear, AuditAction};
use super::entity::Entity;
use super::ports::{DocumentQuery, WriteBatch};
use super::store_access::StoreAccess;
use super::Error;

/// Calendar use-cases that span several academic years.
#[derive(Clone)]
pub struct AcademicCalendarService {
    access: StoreAccess,
}

impl AcademicCalendarService {
    /// Service over `access`.
    pub fn new(access: StoreAccess) -> Self {
        Self { access }
    }

    /// Make `id` the only active academic year in its organisation.
    pub async fn activate_academic_year(
        &self,
        id: DocumentId,
        actor: &str,
    ) -> Result<Document<AcademicYear>, Error> {
        let (stored, mut year) = self.access.load_entity::<AcademicYear>(id).await?;
        let organisation_id = stored.meta.organisation_id;
        let now = self.access.now();

        let query = DocumentQuery::new(AcademicYear::COLLECTION)
            .in_organisation(organisation_id)
            .active(Some(true));
        let mut batch = WriteBatch::new();
        let mut deactivated = 0_usize;
        for other in self.access.query(&query).await? {
            if other.meta.id == id || other.meta.organisation_id != organisation_id {
                continue;
            }
            let expected = other.meta.updated_at;
            let mut next = other;
            next.meta.is_active = false;
            next.meta.updated_at = now;
            batch.replace_if_unchanged(next, expected);
            deactivated += 1;
        }

        let mut next = stored.clone();
        next.meta.is_active = true;
        next.meta.updated_at = now;
        batch.replace_if_unchanged(next.clone(), stored.meta.updated_at);
        batch.insert(self.access.audit(
            AuditAction::Activate,
            &next,
            actor,
            Some(format!("{} activated; {deactivated} deactivated", year.body.name)),
        )?);
        self.access.commit(batch).await?;
        info!(%id, deactivated, "academic year activated");

        year.meta = next.meta;
        Ok(year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::document::Collection;
    use crate::domain::document_service::{DocumentService, ListParams};
    use crate::domain::test_fixtures::{ACTOR, Harness};
    use rstest::rstest;
    use serde_json::json;

    async fn year(harness: &Harness, name: &str, start: &str, end: &str) -> DocumentId {
        DocumentService::<AcademicYear>::new(harness.access.clone())
            .create(
                json!({ "name": name, "startDate": start, "endDate": end }),
                ACTOR,
            )
            .await
            .expect("academic year")
            .meta
            .id
    }

    #[rstest]
    #[tokio::test]
    async fn activation_leaves_one_active_year() {
        let harness = Harness::new();
        let previous = year(&harness, "2024-25", "2024-09-01", "2025-07-31").await;
        let next = year(&harness, "2025-26", "2025-09-01", "2026-07-31").await;
        let service = AcademicCalendarService::new(harness.access.clone());

        let activated = service
            .activate_academic_year(next, ACTOR)
            .await
            .expect("activated");
        assert!(activated.meta.is_active);

        let active = DocumentService::<AcademicYear>::new(harness.access.clone())
            .list(ListParams {
                active: Some(true),
                ..ListParams::default()
            })
            .await
            .expect("active years");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].meta.id, next);
        assert!(!harness.stored(Collection::AcademicYears, previous).await.meta.is_active);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_years_are_not_found() {
        let harness = Harness::new();
        let err = AcademicCalendarService::new(harness.access.clone())
            .activate_academic_year(DocumentId::random(), ACTOR)
            .await
            .expect_err("missing");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
