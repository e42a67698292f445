//! Allocation writes and lecturer workload endpoints.
//!
//! ```text
//! POST   /api/v1/admin-allocations            (also /module-allocations)
//! PATCH  /api/v1/admin-allocations/{id}
//! DELETE /api/v1/admin-allocations/{id}
//! PUT    /api/v1/lecturers/{id}/admin-allocations [{"title":"...","hours":30}]
//! POST   /api/v1/lecturers/{id}/recalculate
//! GET    /api/v1/lecturers/{id}/workload
//! ```
//!
//! Allocation writes answer with the allocation and every lecturer whose
//! figures changed, so clients can refresh both without another round trip.

use actix_web::{HttpResponse, get, post, put, web};
use serde_json::Value;

use super::ApiResult;
use super::documents::{get_document, list_documents, path_id};
use super::session::SessionContext;
use super::state::HttpState;
use crate::domain::Error;
use crate::domain::allocation_service::{Allocation, AllocationOutcome, LecturerWorkload};

async fn create_allocation<A: Allocation>(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<Value>,
) -> ApiResult<HttpResponse> {
    let actor = session.actor()?;
    let outcome: AllocationOutcome<A> = state
        .allocations
        .create(payload.into_inner(), &actor)
        .await?;
    Ok(HttpResponse::Created().json(outcome))
}

async fn update_allocation<A: Allocation>(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
    payload: web::Json<Value>,
) -> ApiResult<web::Json<AllocationOutcome<A>>> {
    let actor = session.actor()?;
    let id = path_id(&id)?;
    let outcome = state
        .allocations
        .update(id, payload.into_inner(), &actor)
        .await?;
    Ok(web::Json(outcome))
}

async fn remove_allocation<A: Allocation>(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
) -> ApiResult<web::Json<AllocationOutcome<A>>> {
    let actor = session.actor()?;
    let id = path_id(&id)?;
    Ok(web::Json(state.allocations.remove(id, &actor).await?))
}

/// Generic reads plus lecturer-aware writes for allocation type `A`.
pub fn allocation_routes<A: Allocation>(cfg: &mut web::ServiceConfig) {
    let path = A::COLLECTION.path();
    cfg.service(
        web::resource(path)
            .route(web::get().to(list_documents::<A>))
            .route(web::post().to(create_allocation::<A>)),
    )
    .service(
        web::resource(format!("{path}/{{id}}"))
            .route(web::get().to(get_document::<A>))
            .route(web::patch().to(update_allocation::<A>))
            .route(web::delete().to(remove_allocation::<A>)),
    );
}

/// Replace every admin allocation of a lecturer.
#[utoipa::path(
    put,
    path = "/api/v1/lecturers/{id}/admin-allocations",
    params(("id" = String, Path, description = "Lecturer id")),
    request_body = Vec<Object>,
    responses(
        (status = 200, description = "Lecturer workload after the replacement", body = LecturerWorkload),
        (status = 400, description = "An item is invalid", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown lecturer", body = Error),
        (status = 409, description = "The lecturer changed concurrently", body = Error),
    ),
    tags = ["workload"],
    operation_id = "setAdminAllocations"
)]
#[put("/lecturers/{id}/admin-allocations")]
pub async fn set_admin_allocations(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
    items: web::Json<Vec<Value>>,
) -> ApiResult<web::Json<LecturerWorkload>> {
    let actor = session.actor()?;
    let id = path_id(&id)?;
    let workload = state
        .allocations
        .set_admin_allocations_for_lecturer(id, items.into_inner(), &actor)
        .await?;
    Ok(web::Json(workload))
}

/// Rebuild a lecturer's figures from their live allocations.
#[utoipa::path(
    post,
    path = "/api/v1/lecturers/{id}/recalculate",
    params(("id" = String, Path, description = "Lecturer id")),
    responses(
        (status = 200, description = "Recalculated workload", body = LecturerWorkload),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown lecturer", body = Error),
    ),
    tags = ["workload"],
    operation_id = "recalculateLecturer"
)]
#[post("/lecturers/{id}/recalculate")]
pub async fn recalculate_lecturer(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
) -> ApiResult<web::Json<LecturerWorkload>> {
    let actor = session.actor()?;
    let id = path_id(&id)?;
    Ok(web::Json(
        state.allocations.recalculate_lecturer(id, &actor).await?,
    ))
}

/// A lecturer's figures next to the allocations behind them.
#[utoipa::path(
    get,
    path = "/api/v1/lecturers/{id}/workload",
    params(("id" = String, Path, description = "Lecturer id")),
    responses(
        (status = 200, description = "Workload view", body = LecturerWorkload),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown lecturer", body = Error),
    ),
    tags = ["workload"],
    operation_id = "lecturerWorkload"
)]
#[get("/lecturers/{id}/workload")]
pub async fn lecturer_workload(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
) -> ApiResult<web::Json<LecturerWorkload>> {
    session.require_user_id()?;
    let id = path_id(&id)?;
    Ok(web::Json(state.allocations.lecturer_workload(id).await?))
}
