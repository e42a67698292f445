//! Driven port for schema-validated document storage.
//!
//! Stores hold [`StoredDocument`]s grouped by [`Collection`]. Reads are
//! plain lookups and filtered scans; every write goes through
//! [`DocumentStore::commit`], which applies a [`WriteBatch`] atomically.
//! Related writes (an allocation, its lecturer's cached totals and the audit
//! entry) therefore land together or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::define_port_error;
use crate::domain::document::{Collection, DocumentId, StoredDocument};

define_port_error! {
    /// Errors raised by document store adapters.
    pub enum DocumentStoreError {
        /// The backing store could not be reached.
        Connection { message: String } => "document store connection failed: {message}",
        /// A read or write failed inside the store.
        Query { message: String } => "document store query failed: {message}",
        /// An insert reused an existing identifier.
        Duplicate { id: String } => "document {id} already exists",
        /// A replacement targeted a document that does not exist.
        Missing { collection: String, id: String } => "{collection} document {id} does not exist",
        /// A conditional replacement found a newer revision.
        Stale { collection: String, id: String } => "{collection} document {id} was modified concurrently",
    }
}

/// Filtered scan over one collection.
///
/// Results are ordered oldest first by `createdAt`, then by id. Soft-deleted
/// documents are excluded unless [`DocumentQuery::including_deleted`] is set.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    pub collection: Collection,
    /// Top-level body fields that must equal the given JSON values.
    pub filters: Vec<(String, Value)>,
    pub organisation_id: Option<DocumentId>,
    pub active: Option<bool>,
    pub include_deleted: bool,
    pub limit: Option<usize>,
}

impl DocumentQuery {
    /// Every live document of `collection`.
    #[must_use]
    pub const fn new(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            organisation_id: None,
            active: None,
            include_deleted: false,
            limit: None,
        }
    }

    /// Require `field == value` on the body.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Restrict to one organisation when `organisation_id` is set.
    #[must_use]
    pub const fn in_organisation(mut self, organisation_id: Option<DocumentId>) -> Self {
        self.organisation_id = organisation_id;
        self
    }

    /// Restrict by the `isActive` flag.
    #[must_use]
    pub const fn active(mut self, active: Option<bool>) -> Self {
        self.active = active;
        self
    }

    /// Include soft-deleted documents.
    #[must_use]
    pub const fn including_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub const fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Whether `document` satisfies every predicate except the limit.
    #[must_use]
    pub fn matches(&self, document: &StoredDocument) -> bool {
        document.collection == self.collection
            && (self.include_deleted || document.meta.is_live())
            && self
                .organisation_id
                .is_none_or(|org| document.meta.organisation_id == Some(org))
            && self
                .active
                .is_none_or(|active| document.meta.is_active == active)
            && self
                .filters
                .iter()
                .all(|(field, value)| document.field(field) == Some(value))
    }
}

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Add a new document; its id must be unused.
    Insert(StoredDocument),
    /// Overwrite an existing document.
    ///
    /// When `expected_updated_at` is set the replacement only applies if the
    /// stored revision still carries that timestamp.
    Replace {
        document: StoredDocument,
        expected_updated_at: Option<DateTime<Utc>>,
    },
}

impl WriteOp {
    /// The document being written.
    #[must_use]
    pub const fn document(&self) -> &StoredDocument {
        match self {
            Self::Insert(document) | Self::Replace { document, .. } => document,
        }
    }
}

/// Ordered writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Queue an insert.
    pub fn insert(&mut self, document: StoredDocument) -> &mut Self {
        self.ops.push(WriteOp::Insert(document));
        self
    }

    /// Queue an unconditional replacement.
    pub fn replace(&mut self, document: StoredDocument) -> &mut Self {
        self.ops.push(WriteOp::Replace {
            document,
            expected_updated_at: None,
        });
        self
    }

    /// Queue a replacement guarded by the revision the caller read.
    pub fn replace_if_unchanged(
        &mut self,
        document: StoredDocument,
        expected_updated_at: DateTime<Utc>,
    ) -> &mut Self {
        self.ops.push(WriteOp::Replace {
            document,
            expected_updated_at: Some(expected_updated_at),
        });
        self
    }

    /// Queued writes in order.
    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Consume the batch.
    #[must_use]
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Number of queued writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Persistence port for documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id, including soft-deleted ones.
    async fn get(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> Result<Option<StoredDocument>, DocumentStoreError>;

    /// Run a filtered scan.
    async fn query(&self, query: &DocumentQuery)
    -> Result<Vec<StoredDocument>, DocumentStoreError>;

    /// Apply every write in `batch` atomically.
    async fn commit(&self, batch: WriteBatch) -> Result<(), DocumentStoreError>;
}
