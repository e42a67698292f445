//! Generic collection handlers.
//!
//! ```text
//! GET    /api/v1/{collection}?organisationId=&active=&includeDeleted=&{field}=
//! GET    /api/v1/{collection}/{id}
//! POST   /api/v1/{collection}
//! PATCH  /api/v1/{collection}/{id}
//! DELETE /api/v1/{collection}/{id}
//! ```
//!
//! One set of handlers serves every entity; [`collection_routes`] mounts them
//! at the entity's path.

use actix_web::{HttpResponse, web};
use serde_json::Value;

use super::ApiResult;
use super::session::SessionContext;
use super::state::HttpState;
use super::validation::{FieldName, parse_flag, parse_id};
use crate::domain::document::{Document, DocumentId};
use crate::domain::document_service::ListParams;
use crate::domain::entity::Entity;

const ORGANISATION_ID: FieldName = FieldName::new("organisationId");
const ACTIVE: FieldName = FieldName::new("active");
const INCLUDE_DELETED: FieldName = FieldName::new("includeDeleted");
const ID: FieldName = FieldName::new("id");

/// Split reserved scan parameters from body filters.
pub(crate) fn list_params(pairs: Vec<(String, String)>) -> ApiResult<ListParams> {
    let mut params = ListParams::default();
    for (key, value) in pairs {
        match key.as_str() {
            "organisationId" => params.organisation_id = Some(parse_id(&value, ORGANISATION_ID)?),
            "active" => params.active = Some(parse_flag(&value, ACTIVE)?),
            "includeDeleted" => params.include_deleted = parse_flag(&value, INCLUDE_DELETED)?,
            _ => params.filters.push((key, value)),
        }
    }
    Ok(params)
}

pub(crate) fn path_id(raw: &str) -> ApiResult<DocumentId> {
    parse_id(raw, ID)
}

pub(crate) async fn list_documents<T: Entity>(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<Vec<(String, String)>>,
) -> ApiResult<web::Json<Vec<Document<T>>>> {
    session.require_user_id()?;
    let params = list_params(query.into_inner())?;
    Ok(web::Json(state.documents::<T>().list(params).await?))
}

pub(crate) async fn get_document<T: Entity>(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
) -> ApiResult<web::Json<Document<T>>> {
    session.require_user_id()?;
    let id = path_id(&id)?;
    Ok(web::Json(state.documents::<T>().get(id).await?))
}

pub(crate) async fn create_document<T: Entity>(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<Value>,
) -> ApiResult<HttpResponse> {
    let actor = session.actor()?;
    let created = state
        .documents::<T>()
        .create(payload.into_inner(), &actor)
        .await?;
    Ok(HttpResponse::Created().json(created))
}

pub(crate) async fn update_document<T: Entity>(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
    payload: web::Json<Value>,
) -> ApiResult<web::Json<Document<T>>> {
    let actor = session.actor()?;
    let id = path_id(&id)?;
    let updated = state
        .documents::<T>()
        .update(id, payload.into_inner(), &actor)
        .await?;
    Ok(web::Json(updated))
}

pub(crate) async fn remove_document<T: Entity>(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.actor()?;
    let id = path_id(&id)?;
    state.documents::<T>().remove(id, &actor).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// `getAll`/`getByX` and `getById` for `T`.
pub fn read_routes<T: Entity>(cfg: &mut web::ServiceConfig) {
    let path = T::COLLECTION.path();
    cfg.service(web::resource(path).route(web::get().to(list_documents::<T>)))
        .service(
            web::resource(format!("{path}/{{id}}")).route(web::get().to(get_document::<T>)),
        );
}

/// The full CRUD surface for `T`.
pub fn collection_routes<T: Entity>(cfg: &mut web::ServiceConfig) {
    let path = T::COLLECTION.path();
    cfg.service(
        web::resource(path)
            .route(web::get().to(list_documents::<T>))
            .route(web::post().to(create_document::<T>)),
    )
    .service(
        web::resource(format!("{path}/{{id}}"))
            .route(web::get().to(get_document::<T>))
            .route(web::patch().to(update_document::<T>))
            .route(web::delete().to(remove_document::<T>)),
    );
}
