//! Diesel table definitions for the PostgreSQL schema.
//!
//! Must match `backend/migrations` exactly.

diesel::table! {
    /// Every document of every collection.
    ///
    /// Metadata lives in typed columns so scans can filter and order without
    /// touching the JSONB body.
    documents (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Collection storage name, e.g. `admin_allocations`.
        collection -> Text,
        /// Owning organisation, if the document is tenant scoped.
        organisation_id -> Nullable<Uuid>,
        /// Soft-enable flag.
        is_active -> Bool,
        /// Entity body in camelCase JSON.
        body -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp; doubles as the optimistic revision.
        updated_at -> Timestamptz,
        /// Soft-delete timestamp.
        deleted_at -> Nullable<Timestamptz>,
    }
}
