//! Shared access to the document store for domain services.
//!
//! Every service needs the same handful of reads (live lookups, typed scans,
//! reference and uniqueness checks) and the same audit entry on writes.
//! [`StoreAccess`] bundles the store with the clock so each service gets
//! these helpers without duplicating error mapping.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;
use tracing::warn;

use super::document::{Collection, Document, DocumentId, DocumentMeta, StoredDocument, stamp};
use super::entities::{AuditAction, AuditLog};
use super::entity::{Entity, Reference, UniqueKey, UniqueScope};
use super::ports::{DocumentQuery, DocumentStore, DocumentStoreError, WriteBatch};
use super::validation::ValidationError;
use super::Error;

/// Map store failures onto domain errors.
pub fn map_store_error(error: DocumentStoreError) -> Error {
    match error {
        DocumentStoreError::Connection { message } => {
            Error::service_unavailable(format!("document store unavailable: {message}"))
        }
        DocumentStoreError::Query { message } => {
            Error::internal(format!("document store error: {message}"))
        }
        DocumentStoreError::Duplicate { id } => {
            Error::conflict(format!("document {id} already exists"))
        }
        DocumentStoreError::Missing { collection, id } => {
            Error::not_found(format!("{collection} {id} not found"))
        }
        DocumentStoreError::Stale { collection, id } => {
            Error::conflict(format!("{collection} {id} was modified concurrently")).with_details(
                json!({ "collection": collection, "id": id, "code": "stale_document" }),
            )
        }
    }
}

/// Decode a stored body, treating schema drift as an internal fault.
pub fn decode<T: Entity>(stored: &StoredDocument) -> Result<Document<T>, Error> {
    Document::try_from(stored).map_err(|err| {
        warn!(collection = %stored.collection, id = %stored.meta.id, %err, "stored body does not decode");
        Error::internal(format!(
            "{} {} has an unreadable body",
            stored.collection, stored.meta.id
        ))
    })
}

/// Encode a typed body, treating serialisation failure as an internal fault.
pub fn encode<T: Entity>(meta: DocumentMeta, body: &T) -> Result<StoredDocument, Error> {
    StoredDocument::encode(T::COLLECTION, meta, body)
        .map_err(|err| Error::internal(format!("failed to encode {}: {err}", T::COLLECTION)))
}

/// Store and clock shared by every domain service.
#[derive(Clone)]
pub struct StoreAccess {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl StoreAccess {
    /// Bundle a store with the clock that stamps its documents.
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Current time at stored precision.
    pub fn now(&self) -> DateTime<Utc> {
        stamp(self.clock.utc())
    }

    /// Fetch a document regardless of its deletion state.
    pub async fn find(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> Result<Option<StoredDocument>, Error> {
        self.store
            .get(collection, id)
            .await
            .map_err(map_store_error)
    }

    /// Fetch a live document or fail with `not_found`.
    pub async fn load(&self, collection: Collection, id: DocumentId) -> Result<StoredDocument, Error> {
        self.find(collection, id)
            .await?
            .filter(|document| document.meta.is_live())
            .ok_or_else(|| Error::not_found(format!("{collection} {id} not found")))
    }

    /// Fetch and decode a live document.
    pub async fn load_entity<T: Entity>(
        &self,
        id: DocumentId,
    ) -> Result<(StoredDocument, Document<T>), Error> {
        let stored = self.load(T::COLLECTION, id).await?;
        let typed = decode(&stored)?;
        Ok((stored, typed))
    }

    /// Run a raw scan.
    pub async fn query(&self, query: &DocumentQuery) -> Result<Vec<StoredDocument>, Error> {
        self.store.query(query).await.map_err(map_store_error)
    }

    /// Run a scan and decode every result.
    pub async fn query_entities<T: Entity>(
        &self,
        query: &DocumentQuery,
    ) -> Result<Vec<(StoredDocument, Document<T>)>, Error> {
        self.query(query)
            .await?
            .into_iter()
            .map(|stored| decode(&stored).map(|typed| (stored, typed)))
            .collect()
    }

    /// Apply a batch atomically.
    pub async fn commit(&self, batch: WriteBatch) -> Result<(), Error> {
        if batch.is_empty() {
            return Ok(());
        }
        self.store.commit(batch).await.map_err(map_store_error)
    }

    /// Fail unless every reference resolves to a live document.
    pub async fn check_references(
        &self,
        references: impl IntoIterator<Item = Reference>,
    ) -> Result<(), Error> {
        for reference in references {
            let live = self
                .find(reference.collection, reference.id)
                .await?
                .is_some_and(|document| document.meta.is_live());
            if !live {
                return Err(ValidationError::MissingReference {
                    field: reference.field,
                    collection: reference.collection.as_str(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Fail if another live document already holds any of `keys`.
    pub async fn check_unique(
        &self,
        collection: Collection,
        keys: Vec<UniqueKey>,
        organisation_id: Option<DocumentId>,
        exclude: Option<DocumentId>,
    ) -> Result<(), Error> {
        for key in keys {
            let mut query = key
                .filters()
                .into_iter()
                .fold(DocumentQuery::new(collection), |query, (field, value)| {
                    query.filter(field, value)
                });
            if key.scope == UniqueScope::Organisation {
                query = query.in_organisation(organisation_id);
            }
            let clash = self.query(&query).await?.into_iter().any(|document| {
                Some(document.meta.id) != exclude
                    && (key.scope == UniqueScope::Global
                        || document.meta.organisation_id == organisation_id)
            });
            if clash {
                return Err(ValidationError::Duplicate {
                    field: key.field,
                    value: key.display_value(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Build the audit entry accompanying a mutation.
    pub fn audit(
        &self,
        action: AuditAction,
        target: &StoredDocument,
        actor: &str,
        summary: Option<String>,
    ) -> Result<StoredDocument, Error> {
        let entry = AuditLog {
            action,
            entity_type: target.collection,
            entity_id: target.meta.id,
            actor_id: actor.to_owned(),
            summary,
        };
        encode(
            DocumentMeta::new(target.meta.organisation_id, self.now()),
            &entry,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::entities::Team;
    use crate::domain::ports::MockDocumentStore;
    use mockable::DefaultClock;
    use rstest::rstest;

    fn access(store: MockDocumentStore) -> StoreAccess {
        StoreAccess::new(Arc::new(store), Arc::new(DefaultClock))
    }

    fn team_document(org: Option<DocumentId>, code: &str) -> StoredDocument {
        StoredDocument {
            collection: Collection::Teams,
            meta: DocumentMeta::new(org, Utc::now()),
            body: json!({ "name": "Computing", "code": code }),
        }
    }

    #[rstest]
    #[case(DocumentStoreError::connection("down"), ErrorCode::ServiceUnavailable)]
    #[case(DocumentStoreError::query("boom"), ErrorCode::InternalError)]
    #[case(DocumentStoreError::duplicate("x"), ErrorCode::Conflict)]
    #[case(DocumentStoreError::missing("teams", "x"), ErrorCode::NotFound)]
    #[case(DocumentStoreError::stale("teams", "x"), ErrorCode::Conflict)]
    fn store_errors_map_to_domain_codes(
        #[case] error: DocumentStoreError,
        #[case] expected: ErrorCode,
    ) {
        assert_eq!(map_store_error(error).code(), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn deleted_documents_do_not_load() {
        let mut deleted = team_document(None, "COMP");
        deleted.meta.deleted_at = Some(Utc::now());
        let id = deleted.meta.id;
        let mut store = MockDocumentStore::new();
        store
            .expect_get()
            .times(1)
            .return_once(move |_, _| Ok(Some(deleted)));

        let err = access(store)
            .load(Collection::Teams, id)
            .await
            .expect_err("soft-deleted");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_references_are_invalid_requests() {
        let mut store = MockDocumentStore::new();
        store.expect_get().times(1).return_once(|_, _| Ok(None));

        let err = access(store)
            .check_references([Reference::to(
                "teamId",
                Collection::Teams,
                DocumentId::random(),
            )])
            .await
            .expect_err("dangling reference");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(
            err.details(),
            Some(&json!({ "field": "teamId", "code": "missing_reference" }))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn uniqueness_ignores_the_document_itself_and_other_organisations() {
        let org = Some(DocumentId::random());
        let own = team_document(org, "COMP");
        let own_id = own.meta.id;
        let foreign = team_document(Some(DocumentId::random()), "COMP");
        let mut store = MockDocumentStore::new();
        store
            .expect_query()
            .times(1)
            .return_once(move |_| Ok(vec![own, foreign]));

        let team = Team {
            name: "Computing".to_owned(),
            code: "COMP".to_owned(),
            description: None,
            lead_lecturer_id: None,
        };
        access(store)
            .check_unique(Collection::Teams, team.unique_keys(), org, Some(own_id))
            .await
            .expect("no clash");
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_codes_conflict() {
        let org = Some(DocumentId::random());
        let existing = team_document(org, "COMP");
        let mut store = MockDocumentStore::new();
        store
            .expect_query()
            .times(1)
            .return_once(move |_| Ok(vec![existing]));

        let err = access(store)
            .check_unique(
                Collection::Teams,
                vec![UniqueKey::per_organisation("code", "COMP")],
                org,
                None,
            )
            .await
            .expect_err("clash");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }
}
