//! Shared fixtures for domain service tests.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use serde_json::{Value, json};

use super::document::{Collection, DocumentId, StoredDocument};
use super::ports::{DocumentQuery, DocumentStore};
use super::store_access::StoreAccess;
use crate::outbound::memory::MemoryDocumentStore;

pub(crate) const ACTOR: &str = "123e4567-e89b-12d3-a456-426614174000";

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    })
}

/// In-memory store plus the access handle services use.
pub(crate) struct Harness {
    pub store: Arc<MemoryDocumentStore>,
    pub access: StoreAccess,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        let access = StoreAccess::new(store.clone(), fixture_clock());
        Self { store, access }
    }

    pub async fn all(&self, collection: Collection) -> Vec<StoredDocument> {
        self.store
            .query(&DocumentQuery::new(collection).including_deleted(true))
            .await
            .expect("query succeeds")
    }

    pub async fn stored(&self, collection: Collection, id: DocumentId) -> StoredDocument {
        self.store
            .get(collection, id)
            .await
            .expect("get succeeds")
            .expect("document exists")
    }
}

pub(crate) fn lecturer_payload(email: &str) -> Value {
    json!({
        "fullName": "Ada Lovelace",
        "email": email,
        "contractFte": 1.0,
        "totalContract": 1000.0,
        "maxTeachingHours": 550.0,
        "maxAdminHours": 450.0,
    })
}
