//! Backend entry-point: loads settings, prepares the store and serves the API.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

mod server;

use std::io;

use actix_web::cookie::SameSite;
use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use server::{ServerConfig, create_server};
use workload_backend::inbound::http::health::HealthState;
use workload_backend::outbound::persistence::{DbPool, PoolConfig, run_schema_migrations};
use workload_backend::settings::AppSettings;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load()
        .map_err(|err| io::Error::other(format!("load settings: {err}")))?;
    let key = settings.session_key()?;
    let mut config = ServerConfig::new(
        key,
        settings.cookie_secure(),
        SameSite::Lax,
        settings.bind_addr()?,
    )
    .with_tooling(settings.tooling_enabled);

    if let Some(database_url) = settings.database_url.as_deref() {
        if settings.skip_schema_migrations {
            info!("schema migrations skipped");
        } else {
            run_schema_migrations(database_url)
                .await
                .map_err(io::Error::other)?;
        }
        let pool = DbPool::new(PoolConfig::new(database_url))
            .await
            .map_err(|err| io::Error::other(format!("create database pool: {err}")))?;
        config = config.with_db_pool(pool);
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome
}
