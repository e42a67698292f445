//! Allocation writes and the lecturer aggregates they drive.
//!
//! Every allocation change is committed in one batch with the recomputed
//! figures of each affected lecturer and the matching audit entries. The
//! lecturer replacement is guarded by the `updatedAt` read before the
//! change, so a concurrent writer surfaces as a conflict rather than a lost
//! update.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;

use super::document::{Document, DocumentId, StoredDocument};
use super::document_service::{Draft, DocumentService};
use super::entities::{AdminAllocation, AuditAction, Lecturer, ModuleAllocation};
use super::entity::Entity;
use super::format::format_percentage;
use super::ports::{DocumentQuery, WriteBatch};
use super::store_access::{StoreAccess, encode};
use super::workload::{WorkloadAggregate, WorkloadLimits};
use super::Error;

/// Which side of the aggregate an allocation feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoursKind {
    Teaching,
    Admin,
}

/// Entities whose hours count towards a lecturer's workload.
pub trait Allocation: Entity {
    /// Aggregate side this allocation contributes to.
    const KIND: HoursKind;

    /// Owning lecturer.
    fn lecturer_id(&self) -> DocumentId;

    /// Allocated hours.
    fn hours(&self) -> f64;
}

impl Allocation for AdminAllocation {
    const KIND: HoursKind = HoursKind::Admin;

    fn lecturer_id(&self) -> DocumentId {
        self.lecturer_id
    }

    fn hours(&self) -> f64 {
        self.hours
    }
}

impl Allocation for ModuleAllocation {
    const KIND: HoursKind = HoursKind::Teaching;

    fn lecturer_id(&self) -> DocumentId {
        self.lecturer_id
    }

    fn hours(&self) -> f64 {
        self.hours
    }
}

/// Result of an allocation write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationOutcome<A> {
    /// The allocation as written.
    pub allocation: Document<A>,
    /// Lecturers whose figures were recomputed.
    pub lecturers: Vec<Document<Lecturer>>,
}

/// A lecturer together with the allocations behind their figures.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LecturerWorkload {
    #[schema(value_type = Object)]
    pub lecturer: Document<Lecturer>,
    pub limits: WorkloadLimits,
    /// Figures recomputed from the live allocations.
    pub aggregate: WorkloadAggregate,
    /// Whether the lecturer's stored figures match `aggregate`.
    pub in_sync: bool,
    pub over_allocated: bool,
    pub utilisation: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub admin_allocations: Vec<Document<AdminAllocation>>,
    #[schema(value_type = Vec<Object>)]
    pub module_allocations: Vec<Document<ModuleAllocation>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ExtraHours {
    teaching: f64,
    admin: f64,
}

impl ExtraHours {
    fn of(kind: HoursKind, hours: f64) -> Self {
        match kind {
            HoursKind::Teaching => Self {
                teaching: hours,
                admin: 0.0,
            },
            HoursKind::Admin => Self {
                teaching: 0.0,
                admin: hours,
            },
        }
    }
}

struct LecturerRewrite {
    expected_updated_at: chrono::DateTime<chrono::Utc>,
    next: StoredDocument,
    lecturer: Document<Lecturer>,
}

/// Allocation use-cases.
#[derive(Clone)]
pub struct AllocationService {
    access: StoreAccess,
}

impl AllocationService {
    /// Service over `access`.
    pub fn new(access: StoreAccess) -> Self {
        Self { access }
    }

    fn documents<A: Entity>(&self) -> DocumentService<A> {
        DocumentService::new(self.access.clone())
    }

    /// Live allocations of a lecturer that count towards their figures.
    async fn live_allocations<A: Allocation>(
        &self,
        lecturer_id: DocumentId,
    ) -> Result<Vec<Document<A>>, Error> {
        self.lecturer_allocations(lecturer_id, Some(true)).await
    }

    /// Live allocations of a lecturer, filtered on `isActive` when given.
    async fn lecturer_allocations<A: Allocation>(
        &self,
        lecturer_id: DocumentId,
        active: Option<bool>,
    ) -> Result<Vec<Document<A>>, Error> {
        let query = DocumentQuery::new(A::COLLECTION)
            .filter("lecturerId", lecturer_id.to_string())
            .active(active);
        Ok(self
            .access
            .query_entities::<A>(&query)
            .await?
            .into_iter()
            .map(|(_, typed)| typed)
            .collect())
    }

    async fn allocated_hours<A: Allocation>(
        &self,
        lecturer_id: DocumentId,
        excluded: &HashSet<DocumentId>,
    ) -> Result<f64, Error> {
        Ok(self
            .live_allocations::<A>(lecturer_id)
            .await?
            .iter()
            .filter(|allocation| !excluded.contains(&allocation.meta.id))
            .map(|allocation| allocation.body.hours())
            .sum())
    }

    async fn fresh_aggregate(
        &self,
        lecturer: &Lecturer,
        lecturer_id: DocumentId,
        excluded: &HashSet<DocumentId>,
        extra: ExtraHours,
    ) -> Result<WorkloadAggregate, Error> {
        let teaching = self
            .allocated_hours::<ModuleAllocation>(lecturer_id, excluded)
            .await?
            + extra.teaching;
        let admin = self
            .allocated_hours::<AdminAllocation>(lecturer_id, excluded)
            .await?
            + extra.admin;
        Ok(WorkloadAggregate::compute(&lecturer.limits(), teaching, admin))
    }

    /// Recompute a lecturer as if `excluded` were gone and `extra` added.
    ///
    /// Returns `None` when the lecturer is no longer live.
    async fn rewrite_lecturer(
        &self,
        lecturer_id: DocumentId,
        excluded: &HashSet<DocumentId>,
        extra: ExtraHours,
    ) -> Result<Option<LecturerRewrite>, Error> {
        let Some(stored) = self
            .access
            .find(Lecturer::COLLECTION, lecturer_id)
            .await?
            .filter(|document| document.meta.is_live())
        else {
            return Ok(None);
        };
        let mut lecturer = super::store_access::decode::<Lecturer>(&stored)?;
        let aggregate = self
            .fresh_aggregate(&lecturer.body, lecturer_id, excluded, extra)
            .await?;
        lecturer.body.apply_aggregate(aggregate);
        lecturer.meta.updated_at = self.access.now();
        let next = encode(lecturer.meta.clone(), &lecturer.body)?;
        Ok(Some(LecturerRewrite {
            expected_updated_at: stored.meta.updated_at,
            next,
            lecturer,
        }))
    }

    fn stage_lecturer(
        &self,
        rewrite: &LecturerRewrite,
        actor: &str,
        batch: &mut WriteBatch,
    ) -> Result<(), Error> {
        let figures = &rewrite.lecturer.body;
        let summary = format!(
            "teaching {} h, admin {} h, capacity {} h",
            figures.allocated_teaching_hours, figures.allocated_admin_hours, figures.capacity
        );
        batch.replace_if_unchanged(rewrite.next.clone(), rewrite.expected_updated_at);
        batch.insert(self.access.audit(
            AuditAction::Recalculate,
            &rewrite.next,
            actor,
            Some(summary),
        )?);
        Ok(())
    }

    async fn commit_allocation<A: Allocation>(
        &self,
        draft: Draft<A>,
        action: AuditAction,
        actor: &str,
    ) -> Result<AllocationOutcome<A>, Error> {
        let id = draft.next.meta.id;
        let counts = draft.next.meta.is_live() && draft.next.meta.is_active;
        let after = counts.then(|| draft.entity.lecturer_id());
        let before = draft
            .previous
            .as_ref()
            .map(|(_, previous)| previous.body.lecturer_id());

        let mut batch = WriteBatch::new();
        draft.stage(&self.access, action, actor, &mut batch)?;

        let excluded = HashSet::from([id]);
        let mut affected: Vec<DocumentId> = after.into_iter().collect();
        affected.extend(before.filter(|lecturer| Some(*lecturer) != after));

        let mut lecturers = Vec::with_capacity(affected.len());
        for lecturer_id in affected {
            let extra = if Some(lecturer_id) == after {
                ExtraHours::of(A::KIND, draft.entity.hours())
            } else {
                ExtraHours::default()
            };
            if let Some(rewrite) = self.rewrite_lecturer(lecturer_id, &excluded, extra).await? {
                self.stage_lecturer(&rewrite, actor, &mut batch)?;
                lecturers.push(rewrite.lecturer);
            }
        }

        self.access.commit(batch).await?;
        info!(
            collection = %A::COLLECTION,
            %id,
            ?action,
            recalculated = lecturers.len(),
            "allocation written"
        );
        Ok(AllocationOutcome {
            allocation: draft.document(),
            lecturers,
        })
    }

    /// Create an allocation and update its lecturer.
    pub async fn create<A: Allocation>(
        &self,
        payload: Value,
        actor: &str,
    ) -> Result<AllocationOutcome<A>, Error> {
        let draft = self.documents::<A>().draft_create(payload).await?;
        self.commit_allocation(draft, AuditAction::Create, actor)
            .await
    }

    /// Patch an allocation and update every lecturer it touches.
    pub async fn update<A: Allocation>(
        &self,
        id: DocumentId,
        patch: Value,
        actor: &str,
    ) -> Result<AllocationOutcome<A>, Error> {
        let draft = self.documents::<A>().draft_update(id, patch).await?;
        self.commit_allocation(draft, AuditAction::Update, actor)
            .await
    }

    /// Soft-delete an allocation and release its hours.
    pub async fn remove<A: Allocation>(
        &self,
        id: DocumentId,
        actor: &str,
    ) -> Result<AllocationOutcome<A>, Error> {
        let draft = self.documents::<A>().draft_remove(id).await?;
        self.commit_allocation(draft, AuditAction::Delete, actor)
            .await
    }

    /// Create an admin allocation.
    pub async fn create_admin_allocation(
        &self,
        payload: Value,
        actor: &str,
    ) -> Result<AllocationOutcome<AdminAllocation>, Error> {
        self.create(payload, actor).await
    }

    /// Update an admin allocation.
    pub async fn update_admin_allocation(
        &self,
        id: DocumentId,
        patch: Value,
        actor: &str,
    ) -> Result<AllocationOutcome<AdminAllocation>, Error> {
        self.update(id, patch, actor).await
    }

    /// Remove an admin allocation.
    pub async fn remove_admin_allocation(
        &self,
        id: DocumentId,
        actor: &str,
    ) -> Result<AllocationOutcome<AdminAllocation>, Error> {
        self.remove(id, actor).await
    }

    /// Create a module (teaching) allocation.
    pub async fn create_module_allocation(
        &self,
        payload: Value,
        actor: &str,
    ) -> Result<AllocationOutcome<ModuleAllocation>, Error> {
        self.create(payload, actor).await
    }

    /// Update a module allocation.
    pub async fn update_module_allocation(
        &self,
        id: DocumentId,
        patch: Value,
        actor: &str,
    ) -> Result<AllocationOutcome<ModuleAllocation>, Error> {
        self.update(id, patch, actor).await
    }

    /// Remove a module allocation.
    pub async fn remove_module_allocation(
        &self,
        id: DocumentId,
        actor: &str,
    ) -> Result<AllocationOutcome<ModuleAllocation>, Error> {
        self.remove(id, actor).await
    }

    /// Replace every admin allocation of a lecturer in one batch.
    ///
    /// Items may omit `lecturerId`; a different id is rejected. All items are
    /// validated before anything is written.
    pub async fn set_admin_allocations_for_lecturer(
        &self,
        lecturer_id: DocumentId,
        items: Vec<Value>,
        actor: &str,
    ) -> Result<LecturerWorkload, Error> {
        let (lecturer_doc, _) = self.access.load_entity::<Lecturer>(lecturer_id).await?;
        let service = self.documents::<AdminAllocation>();

        let mut drafts = Vec::with_capacity(items.len());
        for item in items {
            let item = Self::bind_to_lecturer(item, &lecturer_doc)?;
            drafts.push(service.draft_create(item).await?);
        }

        let existing = self
            .lecturer_allocations::<AdminAllocation>(lecturer_id, None)
            .await?;
        let mut batch = WriteBatch::new();
        let now = self.access.now();
        for allocation in &existing {
            let mut deleted = encode(allocation.meta.clone(), &allocation.body)?;
            deleted.meta.deleted_at = Some(now);
            deleted.meta.updated_at = now;
            batch.replace_if_unchanged(deleted, allocation.meta.updated_at);
        }
        let mut admin_total = 0.0;
        for draft in &drafts {
            batch.insert(draft.next.clone());
            if draft.next.meta.is_active {
                admin_total += draft.entity.hours();
            }
        }

        let mut excluded: HashSet<DocumentId> =
            existing.iter().map(|allocation| allocation.meta.id).collect();
        excluded.extend(drafts.iter().map(|draft| draft.next.meta.id));
        let rewrite = self
            .rewrite_lecturer(lecturer_id, &excluded, ExtraHours::of(HoursKind::Admin, admin_total))
            .await?
            .ok_or_else(|| Error::not_found(format!("lecturers {lecturer_id} not found")))?;
        batch.replace_if_unchanged(rewrite.next.clone(), rewrite.expected_updated_at);
        batch.insert(self.access.audit(
            AuditAction::Replace,
            &rewrite.next,
            actor,
            Some(format!(
                "replaced {} admin allocations with {}",
                existing.len(),
                drafts.len()
            )),
        )?);

        self.access.commit(batch).await?;
        info!(
            %lecturer_id,
            removed = existing.len(),
            added = drafts.len(),
            "admin allocations replaced"
        );
        self.lecturer_workload(lecturer_id).await
    }

    fn bind_to_lecturer(item: Value, lecturer: &StoredDocument) -> Result<Value, Error> {
        let Value::Object(mut map) = item else {
            return Err(Error::invalid_request("each allocation must be a JSON object"));
        };
        let expected = lecturer.meta.id.to_string();
        match map.get("lecturerId") {
            Some(Value::String(given)) if *given != expected => {
                return Err(Error::invalid_request(format!(
                    "allocation lecturerId {given} does not match lecturer {expected}"
                )));
            }
            Some(Value::String(_)) => {}
            Some(_) => {
                return Err(Error::invalid_request("lecturerId must be a string"));
            }
            None => {
                map.insert("lecturerId".to_owned(), Value::String(expected));
            }
        }
        if let Some(organisation_id) = lecturer.meta.organisation_id {
            map.entry("organisationId")
                .or_insert_with(|| Value::String(organisation_id.to_string()));
        }
        Ok(Value::Object(map))
    }

    /// Rebuild a lecturer's stored figures from live allocations.
    pub async fn recalculate_lecturer(
        &self,
        lecturer_id: DocumentId,
        actor: &str,
    ) -> Result<LecturerWorkload, Error> {
        let (_, current) = self.access.load_entity::<Lecturer>(lecturer_id).await?;
        let rewrite = self
            .rewrite_lecturer(lecturer_id, &HashSet::new(), ExtraHours::default())
            .await?
            .ok_or_else(|| Error::not_found(format!("lecturers {lecturer_id} not found")))?;
        if !rewrite.lecturer.body.aggregate().matches(&current.body.aggregate()) {
            let mut batch = WriteBatch::new();
            self.stage_lecturer(&rewrite, actor, &mut batch)?;
            self.access.commit(batch).await?;
            info!(%lecturer_id, "lecturer aggregates repaired");
        }
        self.lecturer_workload(lecturer_id).await
    }

    /// Aggregate view of one lecturer.
    pub async fn lecturer_workload(&self, lecturer_id: DocumentId) -> Result<LecturerWorkload, Error> {
        let (_, lecturer) = self.access.load_entity::<Lecturer>(lecturer_id).await?;
        let admin_allocations = self.live_allocations::<AdminAllocation>(lecturer_id).await?;
        let module_allocations = self.live_allocations::<ModuleAllocation>(lecturer_id).await?;
        let limits = lecturer.body.limits();
        let aggregate = WorkloadAggregate::from_allocations(
            &limits,
            module_allocations.iter().map(|allocation| allocation.body.hours),
            admin_allocations.iter().map(|allocation| allocation.body.hours),
        );
        Ok(LecturerWorkload {
            in_sync: lecturer.body.aggregate().matches(&aggregate),
            over_allocated: aggregate.is_over_allocated(),
            utilisation: aggregate.utilisation(&limits).map(format_percentage),
            lecturer,
            limits,
            aggregate,
            admin_allocations,
            module_allocations,
        })
    }
}

#[cfg(test)]
#[path = "allocation_service_tests.rs"]
mod tests;
