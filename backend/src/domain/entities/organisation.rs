//! Tenants and login identities.

use serde::{Deserialize, Serialize};

use super::{trim, trim_optional};
use crate::domain::document::{Collection, DocumentId};
use crate::domain::entity::{Entity, FilterField, Reference, UniqueKey};
use crate::domain::validation::{ValidationError, ensure_email, ensure_not_blank};

/// Organisation code assigned to documents that predate tenancy.
pub const DEFAULT_ORGANISATION_CODE: &str = "DEFAULT";

/// A tenant. Codes are unique across the whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Organisation {
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl Entity for Organisation {
    const COLLECTION: Collection = Collection::Organisations;
    const FILTERS: &'static [FilterField] = &[FilterField::text("code")];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("name", &self.name)?;
        ensure_not_blank("code", &self.code)
    }

    fn normalise(&mut self) {
        trim(&mut self.name);
        trim(&mut self.code);
        self.code.make_ascii_uppercase();
        trim_optional(&mut self.domain);
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::global("code", &self.code)]
    }
}

/// Access level of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Lecturer,
}

/// A login identity, optionally linked to a lecturer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserAccount {
    pub auth_subject: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lecturer_id: Option<DocumentId>,
}

impl Entity for UserAccount {
    const COLLECTION: Collection = Collection::Users;
    const FILTERS: &'static [FilterField] = &[
        FilterField::text("authSubject"),
        FilterField::text("email"),
        FilterField::text("role"),
        FilterField::id("lecturerId"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("authSubject", &self.auth_subject)?;
        ensure_email("email", &self.email)?;
        ensure_not_blank("displayName", &self.display_name)
    }

    fn normalise(&mut self) {
        trim(&mut self.auth_subject);
        trim(&mut self.email);
        self.email.make_ascii_lowercase();
        trim(&mut self.display_name);
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::global("authSubject", &self.auth_subject)]
    }

    fn references(&self) -> Vec<Reference> {
        Reference::maybe("lecturerId", Collection::Lecturers, self.lecturer_id)
            .into_iter()
            .collect()
    }
}
