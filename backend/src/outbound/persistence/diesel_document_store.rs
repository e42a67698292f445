//! PostgreSQL-backed [`DocumentStore`] using Diesel ORM.
//!
//! All collections share the `documents` table. Body filters use JSONB
//! containment, which for the scalar values `getByX` accepts is the same as
//! equality. A batch runs inside one transaction; conditional replacements
//! lock the target row before comparing revisions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::DocumentRow;
use super::pool::DbPool;
use super::schema::documents;
use crate::domain::document::{Collection, DocumentId, StoredDocument};
use crate::domain::ports::{DocumentQuery, DocumentStore, DocumentStoreError, WriteBatch, WriteOp};

/// Diesel-backed implementation of the document store port.
#[derive(Clone)]
pub struct DieselDocumentStore {
    pool: DbPool,
}

impl DieselDocumentStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside a commit transaction.
///
/// Diesel needs `From<diesel::result::Error>` on the transaction error type;
/// domain failures ride alongside so they also roll the transaction back.
#[derive(Debug)]
enum CommitFailure {
    Store(DocumentStoreError),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for CommitFailure {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl From<CommitFailure> for DocumentStoreError {
    fn from(failure: CommitFailure) -> Self {
        match failure {
            CommitFailure::Store(error) => error,
            CommitFailure::Diesel(error) => map_diesel_error(error),
        }
    }
}

fn to_document(row: DocumentRow) -> Result<StoredDocument, DocumentStoreError> {
    let id = row.id;
    StoredDocument::try_from(row).map_err(|message| {
        warn!(%id, %message, "skipping unreadable document row");
        DocumentStoreError::query(format!("unreadable document {id}: {message}"))
    })
}

async fn apply(conn: &mut AsyncPgConnection, op: WriteOp) -> Result<(), CommitFailure> {
    match op {
        WriteOp::Insert(document) => {
            let row = DocumentRow::from(&document);
            diesel::insert_into(documents::table)
                .values(&row)
                .execute(conn)
                .await
                .map_err(|error| match error {
                    diesel::result::Error::DatabaseError(
                        diesel::result::DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => CommitFailure::Store(DocumentStoreError::duplicate(
                        document.meta.id.to_string(),
                    )),
                    other => CommitFailure::Diesel(other),
                })?;
        }
        WriteOp::Replace {
            document,
            expected_updated_at,
        } => {
            let row = DocumentRow::from(&document);
            let current: Option<DateTime<Utc>> = documents::table
                .filter(documents::id.eq(row.id))
                .filter(documents::collection.eq(&row.collection))
                .select(documents::updated_at)
                .for_update()
                .first(conn)
                .await
                .optional()?;
            let Some(current) = current else {
                return Err(CommitFailure::Store(DocumentStoreError::missing(
                    document.collection.as_str(),
                    document.meta.id.to_string(),
                )));
            };
            if expected_updated_at.is_some_and(|expected| expected != current) {
                return Err(CommitFailure::Store(DocumentStoreError::stale(
                    document.collection.as_str(),
                    document.meta.id.to_string(),
                )));
            }
            diesel::update(documents::table.find(row.id))
                .set(&row)
                .execute(conn)
                .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for DieselDocumentStore {
    async fn get(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> Result<Option<StoredDocument>, DocumentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = documents::table
            .filter(documents::id.eq(id.as_uuid()))
            .filter(documents::collection.eq(collection.as_str()))
            .select(DocumentRow::as_select())
            .first::<DocumentRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_document).transpose()
    }

    async fn query(
        &self,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, DocumentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut statement = documents::table
            .filter(documents::collection.eq(query.collection.as_str()))
            .select(DocumentRow::as_select())
            .order((documents::created_at.asc(), documents::id.asc()))
            .into_boxed();

        if !query.include_deleted {
            statement = statement.filter(documents::deleted_at.is_null());
        }
        if let Some(organisation_id) = query.organisation_id {
            statement = statement.filter(documents::organisation_id.eq(*organisation_id.as_uuid()));
        }
        if let Some(active) = query.active {
            statement = statement.filter(documents::is_active.eq(active));
        }
        if !query.filters.is_empty() {
            let fragment: Map<String, Value> = query.filters.iter().cloned().collect();
            statement = statement.filter(documents::body.contains(Value::Object(fragment)));
        }
        if let Some(limit) = query.limit {
            statement = statement.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = statement
            .load::<DocumentRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(to_document).collect()
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), DocumentStoreError> {
        let count = batch.len();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction::<_, CommitFailure, _>(|conn| {
            async move {
                for op in batch.into_ops() {
                    apply(conn, op).await?;
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await?;
        debug!(writes = count, "document batch committed");
        Ok(())
    }
}
