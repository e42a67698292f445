//! Workload allocation backend.
//!
//! The domain layer tracks lecturers, their teaching and administrative
//! allocations, and the derived capacity figures. Inbound adapters expose it
//! over HTTP; outbound adapters persist documents in PostgreSQL or memory.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
