//! HTTP inbound adapter.
//!
//! `/api/v1` carries the session-authenticated JSON API, mounted through
//! [`routes::api_routes`]. The opt-in tooling routes live in [`tooling`].

pub mod allocations;
pub mod auth;
pub mod calendar;
pub mod documents;
pub mod error;
pub mod health;
pub mod reporting;
pub mod routes;
pub mod session;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod tooling;
pub(crate) mod validation;

pub use error::ApiResult;
