//! HTTP adapter mapping for domain errors.
//!
//! Domain errors become JSON bodies with a status derived from their code.
//! Internal failures are redacted before they leave the process, and the
//! helpers here build the request-shape errors the user handlers share.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use tracing::error;

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Body actually sent for `error`.
///
/// Internal errors lose their message and details; only the trace identifier
/// survives so the client can quote it.
fn client_view(error: &Error) -> Error {
    match error.code() {
        ErrorCode::InternalError => {
            let redacted = Error::internal("Internal server error");
            match error.trace_id() {
                Some(id) => redacted.with_trace_id(id.to_owned()),
                None => redacted,
            }
        }
        _ => error.clone(),
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut response = HttpResponse::build(status);
        if let Some(id) = self.trace_id() {
            response.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        response.json(client_view(self))
    }
}

/// Map a request body that is not the expected JSON document.
///
/// The parser's position information is kept in `details`; the message
/// itself stays generic.
pub fn invalid_json(err: &serde_json::Error) -> Error {
    Error::invalid_request("request body must be a JSON object").with_details(json!({
        "code": "invalid_json",
        "line": err.line(),
        "column": err.column(),
    }))
}

/// Map a well-formed JSON body whose top level is not an object.
pub fn not_a_json_object() -> Error {
    Error::invalid_request("request body must be a JSON object")
        .with_details(json!({ "code": "invalid_json" }))
}

/// Map a failure to encode a response body.
pub fn serialization_failed(err: &serde_json::Error) -> Error {
    error!(error = %err, "failed to serialise response body");
    Error::internal(format!("response serialisation failed: {err}"))
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "framework error surfaced as an internal error");
        Error::internal(err.to_string())
    }
}
