//! HTTP mapping for domain errors.
//!
//! The domain [`Error`] stays transport agnostic. This module gives it a
//! status code and a JSON body for the `/api/v1` surface, and builds the
//! `{ "success": false, "error": ... }` envelope the tooling routes use.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use tracing::{error, warn};

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

const fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Copy of `error` safe to show a client.
fn public_view(error: &Error) -> Error {
    if status_for(error.code()).is_server_error() && error.code() != ErrorCode::ServiceUnavailable
    {
        error!(message = error.message(), trace_id = ?error.trace_id(), "request failed");
        let redacted = Error::internal("Internal server error");
        match error.trace_id() {
            Some(id) => redacted.with_trace_id(id),
            None => redacted,
        }
    } else {
        error.clone()
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(public_view(self))
    }
}

/// Tooling failure envelope.
///
/// Bad input maps to 400, unknown names to 404 and everything else to 500.
pub fn tooling_failure(error: &Error) -> HttpResponse {
    let status = match error.code() {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(code = ?error.code(), message = error.message(), "tooling request failed");
    }
    HttpResponse::build(status).json(json!({
        "success": false,
        "error": error.message(),
    }))
}
