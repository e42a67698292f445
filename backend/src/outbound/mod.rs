//! Outbound adapters implementing the domain's driven ports.
//!
//! - **memory**: in-process store for development and tests
//! - **persistence**: PostgreSQL via Diesel
//!
//! Adapters only translate between domain documents and their storage
//! representation.

pub mod memory;
pub mod persistence;
