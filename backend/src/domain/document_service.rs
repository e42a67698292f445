//! Generic CRUD over one entity collection.
//!
//! [`DocumentService`] is the single implementation behind every
//! collection's `getAll`, `getByX`, `getById`, `create`, `update` and
//! `remove` operations. Writes run the shared pipeline (payload split,
//! decode, normalise, validate, references, uniqueness) and commit the
//! document together with its audit entry.

use std::marker::PhantomData;

use serde_json::{Map, Value, json};
use tracing::info;

use super::document::{Document, DocumentId, DocumentMeta, StoredDocument};
use super::entities::AuditAction;
use super::entity::{Entity, MetaPatch, Reference, merge_patch, prepare, split_payload};
use super::document::Collection;
use super::ports::{DocumentQuery, WriteBatch};
use super::store_access::{StoreAccess, encode};
use super::Error;

/// Scan parameters accepted by `getAll` and `getByX`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub organisation_id: Option<DocumentId>,
    pub active: Option<bool>,
    pub include_deleted: bool,
    /// Raw `field=value` pairs, checked against the entity's filters.
    pub filters: Vec<(String, String)>,
}

/// A validated write waiting to be committed.
#[derive(Debug, Clone)]
pub struct Draft<T> {
    /// Stored revision being replaced; `None` for inserts.
    pub previous: Option<(StoredDocument, Document<T>)>,
    pub next: StoredDocument,
    pub entity: T,
}

impl<T: Entity> Draft<T> {
    /// Typed view of the written document.
    pub fn document(&self) -> Document<T> {
        Document {
            meta: self.next.meta.clone(),
            body: self.entity.clone(),
        }
    }

    /// Queue the write and its audit entry on `batch`.
    pub fn stage(
        &self,
        access: &StoreAccess,
        action: AuditAction,
        actor: &str,
        batch: &mut WriteBatch,
    ) -> Result<(), Error> {
        match &self.previous {
            None => batch.insert(self.next.clone()),
            Some((stored, _)) => {
                batch.replace_if_unchanged(self.next.clone(), stored.meta.updated_at)
            }
        };
        batch.insert(access.audit(action, &self.next, actor, None)?);
        Ok(())
    }
}

/// CRUD service for entity `T`.
pub struct DocumentService<T> {
    access: StoreAccess,
    entity: PhantomData<fn() -> T>,
}

impl<T> Clone for DocumentService<T> {
    fn clone(&self) -> Self {
        Self {
            access: self.access.clone(),
            entity: PhantomData,
        }
    }
}

impl<T: Entity> DocumentService<T> {
    /// Service over `access`.
    pub fn new(access: StoreAccess) -> Self {
        Self {
            access,
            entity: PhantomData,
        }
    }

    fn writable() -> Result<(), Error> {
        if T::READ_ONLY {
            return Err(Error::forbidden(format!(
                "{} are maintained by the server and cannot be written directly",
                T::COLLECTION
            )));
        }
        Ok(())
    }

    fn organisation_reference(meta: &DocumentMeta) -> Option<Reference> {
        if T::COLLECTION == Collection::Organisations {
            return None;
        }
        Reference::maybe(
            "organisationId",
            Collection::Organisations,
            meta.organisation_id,
        )
    }

    /// Live documents oldest first, narrowed by `params`.
    pub async fn list(&self, params: ListParams) -> Result<Vec<Document<T>>, Error> {
        let mut query = DocumentQuery::new(T::COLLECTION)
            .in_organisation(params.organisation_id)
            .active(params.active)
            .including_deleted(params.include_deleted);
        for (name, raw) in &params.filters {
            let filter = T::FILTERS
                .iter()
                .find(|filter| filter.name == name)
                .ok_or_else(|| {
                    Error::invalid_request(format!(
                        "unknown filter `{name}` for {}",
                        T::COLLECTION
                    ))
                    .with_details(json!({ "field": name, "code": "unknown_filter" }))
                })?;
            query = query.filter(filter.name, filter.parse(raw)?);
        }
        Ok(self
            .access
            .query_entities::<T>(&query)
            .await?
            .into_iter()
            .map(|(_, typed)| typed)
            .collect())
    }

    /// One live document.
    pub async fn get(&self, id: DocumentId) -> Result<Document<T>, Error> {
        let (_, typed) = self.access.load_entity::<T>(id).await?;
        Ok(typed)
    }

    /// Validate a create payload without writing anything.
    pub async fn draft_create(&self, payload: Value) -> Result<Draft<T>, Error> {
        let (meta_patch, body) = split_payload(payload, T::DERIVED_FIELDS)?;
        let entity: T = prepare(body)?;
        let mut meta = DocumentMeta::new(meta_patch.organisation_id, self.access.now());
        if let Some(active) = meta_patch.is_active {
            meta.is_active = active;
        }
        self.access
            .check_references(
                entity
                    .references()
                    .into_iter()
                    .chain(Self::organisation_reference(&meta)),
            )
            .await?;
        self.access
            .check_unique(
                T::COLLECTION,
                entity.unique_keys(),
                meta.organisation_id,
                None,
            )
            .await?;
        let next = encode(meta, &entity)?;
        Ok(Draft {
            previous: None,
            next,
            entity,
        })
    }

    /// Validate a merge patch against the stored document.
    pub async fn draft_update(&self, id: DocumentId, patch: Value) -> Result<Draft<T>, Error> {
        let (stored, typed) = self.access.load_entity::<T>(id).await?;
        let (meta_patch, changes) = split_payload(patch, T::DERIVED_FIELDS)?;
        let mut body = match &stored.body {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        merge_patch(&mut body, changes);
        let entity: T = prepare(body)?;
        let meta = Self::patched_meta(&stored.meta, meta_patch, self.access.now());
        self.access
            .check_references(
                entity
                    .references()
                    .into_iter()
                    .chain(Self::organisation_reference(&meta)),
            )
            .await?;
        self.access
            .check_unique(
                T::COLLECTION,
                entity.unique_keys(),
                meta.organisation_id,
                Some(id),
            )
            .await?;
        let next = encode(meta, &entity)?;
        Ok(Draft {
            previous: Some((stored, typed)),
            next,
            entity,
        })
    }

    /// Prepare a soft delete of a live document.
    pub async fn draft_remove(&self, id: DocumentId) -> Result<Draft<T>, Error> {
        let (stored, typed) = self.access.load_entity::<T>(id).await?;
        let now = self.access.now();
        let mut next = stored.clone();
        next.meta.deleted_at = Some(now);
        next.meta.updated_at = now;
        let entity = typed.body.clone();
        Ok(Draft {
            previous: Some((stored, typed)),
            next,
            entity,
        })
    }

    fn patched_meta(
        current: &DocumentMeta,
        patch: MetaPatch,
        now: chrono::DateTime<chrono::Utc>,
    ) -> DocumentMeta {
        let mut meta = current.clone();
        if let Some(organisation_id) = patch.organisation_id {
            meta.organisation_id = Some(organisation_id);
        }
        if let Some(active) = patch.is_active {
            meta.is_active = active;
        }
        meta.updated_at = now;
        meta
    }

    async fn commit(
        &self,
        draft: &Draft<T>,
        action: AuditAction,
        actor: &str,
    ) -> Result<(), Error> {
        let mut batch = WriteBatch::new();
        draft.stage(&self.access, action, actor, &mut batch)?;
        self.access.commit(batch).await?;
        info!(
            collection = %T::COLLECTION,
            id = %draft.next.meta.id,
            ?action,
            actor,
            "document written"
        );
        Ok(())
    }

    /// Create a document from a client payload.
    pub async fn create(&self, payload: Value, actor: &str) -> Result<Document<T>, Error> {
        Self::writable()?;
        let draft = self.draft_create(payload).await?;
        self.commit(&draft, AuditAction::Create, actor).await?;
        Ok(draft.document())
    }

    /// Apply a JSON merge patch.
    pub async fn update(
        &self,
        id: DocumentId,
        patch: Value,
        actor: &str,
    ) -> Result<Document<T>, Error> {
        Self::writable()?;
        let draft = self.draft_update(id, patch).await?;
        self.commit(&draft, AuditAction::Update, actor).await?;
        Ok(draft.document())
    }

    /// Soft-delete a document.
    pub async fn remove(&self, id: DocumentId, actor: &str) -> Result<(), Error> {
        Self::writable()?;
        let draft = self.draft_remove(id).await?;
        self.commit(&draft, AuditAction::Delete, actor).await
    }
}

#[cfg(test)]
#[path = "document_service_tests.rs"]
mod tests;
