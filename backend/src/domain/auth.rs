//! Session identity and login credentials.
//!
//! Handlers validate raw strings through these constructors before any port
//! is called, so services only ever see well-formed values.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Why a login payload or stored identity was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginValidationError {
    /// Username was missing or blank once trimmed.
    #[error("username must not be empty")]
    EmptyUsername,
    /// Password was blank.
    #[error("password must not be empty")]
    EmptyPassword,
    /// The user id is not a UUID.
    #[error("user id must be a valid UUID")]
    InvalidUserId,
}

/// Identifier of an authenticated user, stored in the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Parse a user id from its hyphenated form.
    ///
    /// # Errors
    /// [`LoginValidationError::InvalidUserId`] when `raw` is not a UUID.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, LoginValidationError> {
        Uuid::parse_str(raw.as_ref())
            .map(Self)
            .map_err(|_| LoginValidationError::InvalidUserId)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validated login credentials.
///
/// The username is trimmed; the password keeps caller whitespace and is
/// wiped from memory on drop.
///
/// # Examples
/// ```
/// use workload_backend::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" admin ", "password").expect("valid");
/// assert_eq!(creds.username(), "admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    username: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw inputs.
    ///
    /// # Errors
    /// Blank usernames or empty passwords.
    pub fn try_from_parts(username: &str, password: &str) -> Result<Self, LoginValidationError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LoginValidationError::EmptyUsername);
        }
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            username: username.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Username for lookups.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password as supplied.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}
