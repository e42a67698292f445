//! Application fixtures shared by the HTTP integration tests.

use std::sync::Arc;

use actix_http::Request;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{App, test, web};
use mockable::DefaultClock;
use serde_json::{Value, json};

use workload_backend::Trace;
use workload_backend::domain::ports::FixtureLoginService;
use workload_backend::domain::store_access::StoreAccess;
use workload_backend::inbound::http::routes::api_routes;
use workload_backend::inbound::http::state::HttpState;
use workload_backend::inbound::http::tooling::tooling_routes;
use workload_backend::outbound::memory::MemoryDocumentStore;

/// Mount the server's route table over a fresh in-memory store.
pub async fn init_app()
-> impl Service<Request, Response = ServiceResponse, Error = actix_web::Error> {
    let access = StoreAccess::new(
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(DefaultClock),
    );
    let state = HttpState::new(Arc::new(FixtureLoginService), access);
    let session = SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build();

    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(Trace)
            .service(web::scope("/api/v1").wrap(session).configure(api_routes))
            .service(web::scope("/api").configure(tooling_routes)),
    )
    .await
}

/// Log in as the fixture administrator and return the session cookie.
pub async fn login<S>(app: &S) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let res = test::call_service(
        app,
        test::TestRequest::post()
            .uri("/api/v1/login")
            .set_json(json!({ "username": "admin", "password": "password" }))
            .to_request(),
    )
    .await;
    assert!(res.status().is_success(), "login failed: {}", res.status());
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}

/// Create a document through the API and return its id.
pub async fn create<S>(app: &S, cookie: &Cookie<'static>, path: &str, body: Value) -> String
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let res = test::call_service(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/v1{path}"))
            .cookie(cookie.clone())
            .set_json(body)
            .to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 201, "create {path}");
    let created: Value = test::read_body_json(res).await;
    created["id"].as_str().expect("document id").to_owned()
}
