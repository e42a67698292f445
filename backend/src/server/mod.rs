//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::DefaultClock;
use tracing::{info, warn};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use workload_backend::Trace;
#[cfg(debug_assertions)]
use workload_backend::doc::ApiDoc;
use workload_backend::domain::ports::{DocumentStore, FixtureLoginService};
use workload_backend::domain::store_access::StoreAccess;
use workload_backend::inbound::http::health::{HealthState, live, ready};
use workload_backend::inbound::http::routes::api_routes;
use workload_backend::inbound::http::state::HttpState;
use workload_backend::inbound::http::tooling::tooling_routes;
use workload_backend::outbound::memory::MemoryDocumentStore;
use workload_backend::outbound::persistence::DieselDocumentStore;

/// Pick the document store: PostgreSQL when a pool is configured, memory
/// otherwise.
fn build_store(config: &ServerConfig) -> Arc<dyn DocumentStore> {
    match &config.db_pool {
        Some(pool) => Arc::new(DieselDocumentStore::new(pool.clone())),
        None => {
            warn!("no database configured; documents are held in memory");
            Arc::new(MemoryDocumentStore::new())
        }
    }
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
    tooling_enabled: bool,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
        tooling_enabled,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    // `/api/v1` must be registered before the wider `/api` tooling scope.
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(web::scope("/api/v1").wrap(session).configure(api_routes))
        .service(ready)
        .service(live);

    let app = app.configure(|cfg| {
        if tooling_enabled {
            cfg.service(web::scope("/api").configure(tooling_routes));
        }
    });

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Parameters
/// - `health_state`: shared readiness state updated once the server is initialised.
/// - `config`: pre-built [`ServerConfig`] with session, binding and store settings.
///
/// # Returns
/// A spawned [`Server`] that must be awaited to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let access = StoreAccess::new(build_store(&config), Arc::new(DefaultClock));
    let http_state = web::Data::new(HttpState::new(Arc::new(FixtureLoginService), access));
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        db_pool: _,
        tooling_enabled,
    } = config;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
            tooling_enabled,
        })
    })
    .bind(bind_addr)?
    .run();

    info!(%bind_addr, tooling_enabled, "server listening");
    health_state.mark_ready();
    Ok(server)
}
