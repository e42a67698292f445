//! Process configuration loaded via OrthoConfig.
//!
//! Values layer command-line flags over `WORKLOAD_*` environment variables
//! over an optional config file.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use actix_web::cookie::Key;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;

const DEFAULT_BIND_HOST: &str = "0.0.0.0";
const DEFAULT_BIND_PORT: u16 = 8080;
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";

/// Settings for the `workload-backend` server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "WORKLOAD")]
pub struct AppSettings {
    /// PostgreSQL connection URL. The in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Interface to listen on.
    pub bind_host: Option<String>,
    /// Port to listen on.
    pub bind_port: Option<u16>,
    /// File holding the session signing key material.
    pub session_key_file: Option<PathBuf>,
    /// Generate a throwaway session key when the key file is unreadable.
    #[ortho_config(default = false)]
    pub session_allow_ephemeral: bool,
    /// Send session cookies without the `Secure` attribute.
    #[ortho_config(default = false)]
    pub insecure_cookies: bool,
    /// Mount the `/api` diagnostics and migration routes.
    #[ortho_config(default = false)]
    pub tooling_enabled: bool,
    /// Leave the database schema as it is at startup.
    #[ortho_config(default = false)]
    pub skip_schema_migrations: bool,
}

impl AppSettings {
    /// Socket address assembled from host and port.
    ///
    /// # Errors
    /// Returns [`io::ErrorKind::InvalidInput`] when the host is not an IP
    /// address.
    pub fn bind_addr(&self) -> io::Result<SocketAddr> {
        let host = self.bind_host.as_deref().unwrap_or(DEFAULT_BIND_HOST);
        let ip: IpAddr = host.parse().map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid bind host `{host}`: {err}"),
            )
        })?;
        Ok(SocketAddr::new(ip, self.bind_port.unwrap_or(DEFAULT_BIND_PORT)))
    }

    /// Path of the session key file.
    pub fn session_key_file(&self) -> &Path {
        self.session_key_file
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_SESSION_KEY_FILE))
    }

    /// Whether cookies carry the `Secure` attribute.
    pub const fn cookie_secure(&self) -> bool {
        !self.insecure_cookies
    }

    /// Load the session signing key.
    ///
    /// Debug builds, or `session_allow_ephemeral`, fall back to a generated
    /// key when the file cannot be read.
    ///
    /// # Errors
    /// Returns the read error when no fallback is permitted.
    pub fn session_key(&self) -> io::Result<Key> {
        let path = self.session_key_file();
        match std::fs::read(path) {
            Ok(bytes) => Ok(Key::derive_from(&bytes)),
            Err(err) if cfg!(debug_assertions) || self.session_allow_ephemeral => {
                warn!(path = %path.display(), error = %err, "using temporary session key (dev only)");
                Ok(Key::generate())
            }
            Err(err) => Err(io::Error::other(format!(
                "failed to read session key at {}: {err}",
                path.display()
            ))),
        }
    }
}
