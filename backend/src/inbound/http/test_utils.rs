//! Helpers for handler tests.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::Key;
use mockable::DefaultClock;

use super::state::HttpState;
use crate::domain::ports::FixtureLoginService;
use crate::domain::store_access::StoreAccess;
use crate::outbound::memory::MemoryDocumentStore;

/// Cookie sessions with a throwaway key and the `Secure` flag off.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Handler state over an empty in-memory store.
pub fn memory_state() -> HttpState {
    let access = StoreAccess::new(
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(DefaultClock),
    );
    HttpState::new(Arc::new(FixtureLoginService), access)
}
