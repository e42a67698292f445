//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::documents;
use crate::domain::document::{DocumentId, DocumentMeta, StoredDocument};

/// Row struct for the documents table, used for reads and writes alike.
///
/// `treat_none_as_null` makes replacements clear `deleted_at` and
/// `organisation_id` instead of leaving the old value in place.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct DocumentRow {
    pub id: Uuid,
    pub collection: String,
    pub organisation_id: Option<Uuid>,
    pub is_active: bool,
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<&StoredDocument> for DocumentRow {
    fn from(document: &StoredDocument) -> Self {
        let meta = &document.meta;
        Self {
            id: *meta.id.as_uuid(),
            collection: document.collection.as_str().to_owned(),
            organisation_id: meta.organisation_id.map(|id| *id.as_uuid()),
            is_active: meta.is_active,
            body: document.body.clone(),
            created_at: meta.created_at,
            updated_at: meta.updated_at,
            deleted_at: meta.deleted_at,
        }
    }
}

impl TryFrom<DocumentRow> for StoredDocument {
    type Error = String;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let collection = row.collection.parse().map_err(|err| format!("{err}"))?;
        Ok(Self {
            collection,
            meta: DocumentMeta {
                id: DocumentId::from_uuid(row.id),
                organisation_id: row.organisation_id.map(DocumentId::from_uuid),
                is_active: row.is_active,
                created_at: row.created_at,
                updated_at: row.updated_at,
                deleted_at: row.deleted_at,
            },
            body: row.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::Collection;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn rows_round_trip_documents() {
        let document = StoredDocument {
            collection: Collection::AdminAllocations,
            meta: DocumentMeta::new(Some(DocumentId::random()), Utc::now()),
            body: json!({ "hours": 10.0 }),
        };
        let row = DocumentRow::from(&document);
        assert_eq!(row.collection, "admin_allocations");
        assert_eq!(StoredDocument::try_from(row), Ok(document));
    }

    #[rstest]
    fn unknown_collections_fail_to_load() {
        let row = DocumentRow {
            id: Uuid::new_v4(),
            collection: "widgets".to_owned(),
            organisation_id: None,
            is_active: true,
            body: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        assert!(StoredDocument::try_from(row).is_err());
    }
}
