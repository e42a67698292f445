//! Diagnostics and data-migration endpoints.
//!
//! ```text
//! GET    /api/test-history?action=list&limit=N | action=stats
//! POST   /api/test-history
//! DELETE /api/test-history
//! GET    /api/test-runner?action=suites
//! POST   /api/test-runner?action=run&suite=<name|all>
//! GET    /api/migrations/run?action=list | action=history
//! POST   /api/migrations/run?action=run&name=<migration>
//! ```
//!
//! These routes answer with `{ "success": true, ... }` envelopes instead of
//! the `/api/v1` error schema and do not require a session. They are only
//! mounted when tooling is enabled.

use actix_web::{HttpResponse, web};
use serde_json::{Value, json};

use super::error::tooling_failure;
use super::state::HttpState;
use super::validation::{FieldName, QueryPairs, parse_count};
use crate::domain::Error;

const TOOLING_ACTOR: &str = "tooling";
const ACTION: FieldName = FieldName::new("action");
const LIMIT: FieldName = FieldName::new("limit");

fn respond(result: Result<Value, Error>) -> HttpResponse {
    match result {
        Ok(Value::Object(mut fields)) => {
            fields.insert("success".to_owned(), Value::Bool(true));
            HttpResponse::Ok().json(Value::Object(fields))
        }
        Ok(other) => HttpResponse::Ok().json(json!({ "success": true, "data": other })),
        Err(err) => tooling_failure(&err),
    }
}

fn unknown_action(action: &str) -> Error {
    Error::invalid_request(format!("unknown action `{action}`"))
}

fn limit(query: &QueryPairs) -> Result<Option<usize>, Error> {
    query
        .get(LIMIT.as_str())
        .map(|raw| parse_count(raw, LIMIT))
        .transpose()
}

fn to_value(value: impl serde::Serialize) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|err| Error::internal(err.to_string()))
}

async fn read_history(state: &HttpState, query: &QueryPairs) -> Result<Value, Error> {
    match query.get(ACTION.as_str()).unwrap_or("list") {
        "list" => {
            let runs = state.test_runs.history(limit(query)?).await?;
            Ok(json!({ "runs": to_value(runs)? }))
        }
        "stats" => Ok(json!({ "stats": to_value(state.test_runs.stats().await?)? })),
        other => Err(unknown_action(other)),
    }
}

async fn test_history(
    state: web::Data<HttpState>,
    query: web::Query<Vec<(String, String)>>,
) -> HttpResponse {
    let query = QueryPairs::new(query.into_inner());
    respond(read_history(&state, &query).await)
}

async fn record_test_run(state: web::Data<HttpState>, payload: web::Json<Value>) -> HttpResponse {
    let result = state
        .test_runs
        .record(payload.into_inner(), TOOLING_ACTOR)
        .await
        .and_then(|run| Ok(json!({ "run": to_value(run)? })));
    respond(result)
}

async fn clear_test_history(state: web::Data<HttpState>) -> HttpResponse {
    let result = state
        .test_runs
        .clear(TOOLING_ACTOR)
        .await
        .map(|removed| json!({ "removed": removed }));
    respond(result)
}

async fn list_suites(
    state: web::Data<HttpState>,
    query: web::Query<Vec<(String, String)>>,
) -> HttpResponse {
    let query = QueryPairs::new(query.into_inner());
    let result = match query.get(ACTION.as_str()).unwrap_or("suites") {
        "suites" => to_value(state.test_runs.suites()).map(|suites| json!({ "suites": suites })),
        other => Err(unknown_action(other)),
    };
    respond(result)
}

async fn execute_suites(state: &HttpState, query: &QueryPairs) -> Result<Value, Error> {
    match query.require(ACTION)? {
        "run" => {
            let suite = query.get("suite").unwrap_or("all");
            let runs = state.test_runs.run(suite, TOOLING_ACTOR).await?;
            Ok(json!({ "runs": to_value(runs)? }))
        }
        other => Err(unknown_action(other)),
    }
}

async fn run_suites(
    state: web::Data<HttpState>,
    query: web::Query<Vec<(String, String)>>,
) -> HttpResponse {
    let query = QueryPairs::new(query.into_inner());
    respond(execute_suites(&state, &query).await)
}

async fn read_migrations(state: &HttpState, query: &QueryPairs) -> Result<Value, Error> {
    match query.get(ACTION.as_str()).unwrap_or("list") {
        "list" => Ok(json!({ "migrations": to_value(state.migrations.list())? })),
        "history" => {
            let runs = state.migrations.history(limit(query)?).await?;
            Ok(json!({ "runs": to_value(runs)? }))
        }
        other => Err(unknown_action(other)),
    }
}

async fn migrations(
    state: web::Data<HttpState>,
    query: web::Query<Vec<(String, String)>>,
) -> HttpResponse {
    let query = QueryPairs::new(query.into_inner());
    respond(read_migrations(&state, &query).await)
}

async fn execute_migration(state: &HttpState, query: &QueryPairs) -> Result<Value, Error> {
    match query.require(ACTION)? {
        "run" => {
            let name = query.require(FieldName::new("name"))?;
            let run = state.migrations.run(name, TOOLING_ACTOR).await?;
            Ok(json!({ "run": to_value(run)? }))
        }
        other => Err(unknown_action(other)),
    }
}

async fn run_migration(
    state: web::Data<HttpState>,
    query: web::Query<Vec<(String, String)>>,
) -> HttpResponse {
    let query = QueryPairs::new(query.into_inner());
    respond(execute_migration(&state, &query).await)
}

/// Mount the tooling routes under `/api`.
pub fn tooling_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/test-history")
            .route(web::get().to(test_history))
            .route(web::post().to(record_test_run))
            .route(web::delete().to(clear_test_history)),
    )
    .service(
        web::resource("/test-runner")
            .route(web::get().to(list_suites))
            .route(web::post().to(run_suites)),
    )
    .service(
        web::resource("/migrations/run")
            .route(web::get().to(migrations))
            .route(web::post().to(run_migration)),
    );
}
