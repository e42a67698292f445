//! In-process document store.
//!
//! Used when no database is configured and throughout the test suites. A
//! batch is staged against an overlay first and only merged into the map
//! once every write has been checked, so a failing batch leaves no trace.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::document::{Collection, DocumentId, StoredDocument};
use crate::domain::ports::{DocumentQuery, DocumentStore, DocumentStoreError, WriteBatch, WriteOp};

/// Document store backed by a `HashMap` behind a lock.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<DocumentId, StoredDocument>>,
}

impl MemoryDocumentStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `documents`.
    #[must_use]
    pub fn with_documents(documents: impl IntoIterator<Item = StoredDocument>) -> Self {
        let map = documents
            .into_iter()
            .map(|document| (document.meta.id, document))
            .collect();
        Self {
            documents: RwLock::new(map),
        }
    }
}

fn poisoned() -> DocumentStoreError {
    DocumentStoreError::query("memory store lock poisoned")
}

fn stage(
    current: &HashMap<DocumentId, StoredDocument>,
    staged: &mut HashMap<DocumentId, StoredDocument>,
    op: WriteOp,
) -> Result<(), DocumentStoreError> {
    match op {
        WriteOp::Insert(document) => {
            let id = document.meta.id;
            if staged.contains_key(&id) || current.contains_key(&id) {
                return Err(DocumentStoreError::duplicate(id.to_string()));
            }
            staged.insert(id, document);
        }
        WriteOp::Replace {
            document,
            expected_updated_at,
        } => {
            let id = document.meta.id;
            let existing = staged
                .get(&id)
                .or_else(|| current.get(&id))
                .filter(|existing| existing.collection == document.collection)
                .ok_or_else(|| {
                    DocumentStoreError::missing(document.collection.as_str(), id.to_string())
                })?;
            if expected_updated_at.is_some_and(|expected| existing.meta.updated_at != expected) {
                return Err(DocumentStoreError::stale(
                    document.collection.as_str(),
                    id.to_string(),
                ));
            }
            staged.insert(id, document);
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> Result<Option<StoredDocument>, DocumentStoreError> {
        let documents = self.documents.read().map_err(|_| poisoned())?;
        Ok(documents
            .get(&id)
            .filter(|document| document.collection == collection)
            .cloned())
    }

    async fn query(
        &self,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, DocumentStoreError> {
        let documents = self.documents.read().map_err(|_| poisoned())?;
        let mut found: Vec<StoredDocument> = documents
            .values()
            .filter(|document| query.matches(document))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.meta
                .created_at
                .cmp(&b.meta.created_at)
                .then_with(|| a.meta.id.cmp(&b.meta.id))
        });
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), DocumentStoreError> {
        let mut documents = self.documents.write().map_err(|_| poisoned())?;
        let mut staged = HashMap::new();
        let count = batch.len();
        for op in batch.into_ops() {
            stage(&documents, &mut staged, op)?;
        }
        documents.extend(staged);
        debug!(writes = count, "memory batch committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::DocumentMeta;
    use chrono::{Duration, Utc};
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn document(collection: Collection, code: &str) -> StoredDocument {
        StoredDocument {
            collection,
            meta: DocumentMeta::new(None, Utc::now()),
            body: json!({ "code": code }),
        }
    }

    #[fixture]
    fn store() -> MemoryDocumentStore {
        MemoryDocumentStore::new()
    }

    #[rstest]
    #[tokio::test]
    async fn inserted_documents_are_readable(store: MemoryDocumentStore) {
        let team = document(Collection::Teams, "COMP");
        let mut batch = WriteBatch::new();
        batch.insert(team.clone());
        store.commit(batch).await.expect("commit");

        let fetched = store.get(Collection::Teams, team.meta.id).await.expect("get");
        assert_eq!(fetched, Some(team.clone()));
        let wrong = store
            .get(Collection::Modules, team.meta.id)
            .await
            .expect("get");
        assert!(wrong.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn failing_batches_leave_no_trace(store: MemoryDocumentStore) {
        let team = document(Collection::Teams, "COMP");
        let ghost = document(Collection::Teams, "GHOST");
        let mut batch = WriteBatch::new();
        batch.insert(team.clone()).replace(ghost);

        let err = store.commit(batch).await.expect_err("missing replace target");
        assert!(matches!(err, DocumentStoreError::Missing { .. }));
        let all = store
            .query(&DocumentQuery::new(Collection::Teams))
            .await
            .expect("query");
        assert!(all.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn stale_replacements_are_rejected() {
        let team = document(Collection::Teams, "COMP");
        let store = MemoryDocumentStore::with_documents([team.clone()]);
        let mut changed = team.clone();
        changed.meta.updated_at = team.meta.updated_at + Duration::seconds(1);

        let mut batch = WriteBatch::new();
        batch.replace_if_unchanged(changed.clone(), team.meta.updated_at - Duration::seconds(5));
        let err = store.commit(batch).await.expect_err("stale");
        assert!(matches!(err, DocumentStoreError::Stale { .. }));

        let mut batch = WriteBatch::new();
        batch.replace_if_unchanged(changed.clone(), team.meta.updated_at);
        store.commit(batch).await.expect("fresh replace");
        let fetched = store.get(Collection::Teams, team.meta.id).await.expect("get");
        assert_eq!(fetched, Some(changed));
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let team = document(Collection::Teams, "COMP");
        let store = MemoryDocumentStore::with_documents([team.clone()]);
        let mut batch = WriteBatch::new();
        batch.insert(team);
        assert!(matches!(
            store.commit(batch).await,
            Err(DocumentStoreError::Duplicate { .. })
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn queries_are_ordered_and_limited() {
        let mut first = document(Collection::Teams, "A");
        first.meta.created_at -= Duration::minutes(5);
        let second = document(Collection::Teams, "B");
        let store = MemoryDocumentStore::with_documents([second.clone(), first.clone()]);

        let all = store
            .query(&DocumentQuery::new(Collection::Teams))
            .await
            .expect("query");
        assert_eq!(all, vec![first.clone(), second]);

        let limited = store
            .query(&DocumentQuery::new(Collection::Teams).limit(Some(1)))
            .await
            .expect("query");
        assert_eq!(limited, vec![first]);
    }
}
