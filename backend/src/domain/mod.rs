//! Workload domain: documents, entities and the services that change them.
//!
//! Public surface:
//! - Error (alias to `error::Error`) — API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`) — stable error identifier.
//! - Document services, allocation and reporting use-cases, and the tooling
//!   services behind the diagnostics endpoints.
//!
//! Ports live in [`ports`]; adapters live under `crate::outbound`.

pub mod allocation_service;
pub mod auth;
pub mod calendar_service;
pub mod document;
pub mod document_service;
pub mod entities;
pub mod entity;
pub mod error;
pub mod format;
pub mod migrations;
pub mod ports;
pub mod reporting_service;
pub mod store_access;
pub mod test_runs;
pub mod trace_id;
pub mod validation;
pub mod workload;

#[cfg(test)]
mod test_fixtures;

pub use self::auth::{LoginCredentials, LoginValidationError, UserId};
pub use self::error::{Error, ErrorCode};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use workload_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
