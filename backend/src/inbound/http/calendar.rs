//! Academic year activation.

use actix_web::{post, web};

use super::ApiResult;
use super::documents::path_id;
use super::session::SessionContext;
use super::state::HttpState;
use crate::domain::Error;
use crate::domain::document::Document;
use crate::domain::entities::AcademicYear;

/// Make one academic year the active year of its organisation.
#[utoipa::path(
    post,
    path = "/api/v1/academic-years/{id}/activate",
    params(("id" = String, Path, description = "Academic year id")),
    responses(
        (status = 200, description = "Activated year", body = Object),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown academic year", body = Error),
        (status = 409, description = "A year changed concurrently", body = Error),
    ),
    tags = ["calendar"],
    operation_id = "activateAcademicYear"
)]
#[post("/academic-years/{id}/activate")]
pub async fn activate_academic_year(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
) -> ApiResult<web::Json<Document<AcademicYear>>> {
    let actor = session.actor()?;
    let id = path_id(&id)?;
    Ok(web::Json(
        state.calendar.activate_academic_year(id, &actor).await?,
    ))
}
