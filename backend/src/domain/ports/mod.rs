//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod document_store;
mod login_service;

#[cfg(test)]
pub use document_store::MockDocumentStore;
pub use document_store::{DocumentQuery, DocumentStore, DocumentStoreError, WriteBatch, WriteOp};
pub use login_service::{FIXTURE_ADMIN_ID, FixtureLoginService, LoginService};
