//! User API handlers.
//!
//! ```text
//! POST /            {"name":"Ada","email":"ada@x.com"}  -> {"user_id":"..."}
//! GET  /<user id>                                       -> {"id","name","email"}
//! ```
//!
//! `POST` is accepted on any path. `GET` uses the first path segment as the
//! user identifier. Storage failures keep the historical status codes: 404 on
//! reads and 400 on registration.

use actix_web::http::header::ContentType;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::domain::{Error, ErrorCode, NewUser, User, UserId, UserValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::{invalid_json, not_a_json_object, serialization_failed};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Registration request body.
///
/// Both fields are optional at the wire level so a missing field is reported
/// as a validation error naming it rather than as a parse failure.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "Ada Lovelace")]
    pub name: Option<String>,
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
}

/// Registration response body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateUserResponse {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub user_id: String,
}

/// Stored user as returned by `GET /{id}`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct GetUserResponse {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: String,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
}

impl From<&User> for GetUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            name: user.name().to_string(),
            email: user.email().to_string(),
        }
    }
}

fn json_ok<T: Serialize>(body: &T) -> ApiResult<HttpResponse> {
    let bytes = serde_json::to_vec(body).map_err(|err| serialization_failed(&err))?;
    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(bytes))
}

fn first_segment(path: &str) -> &str {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
}

fn user_not_found() -> Error {
    Error::not_found("user not found")
}

fn map_validation_error(err: UserValidationError) -> Error {
    Error::invalid_request(err.to_string()).with_details(json!({
        "field": err.field(),
        "code": err.code(),
    }))
}

fn map_registration_error(err: Error) -> Error {
    match err.code() {
        ErrorCode::Conflict | ErrorCode::InvalidRequest => err,
        _ => {
            error!(code = ?err.code(), error = %err, "user registration failed");
            Error::invalid_request("user could not be created")
                .with_details(json!({ "code": "registration_failed" }))
        }
    }
}

/// Fetch a user by identifier.
///
/// Unknown identifiers, identifiers that are not UUIDs, and storage failures
/// all answer 404.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use user_service::inbound::http::users::get_user;
///
/// let app = App::new().service(get_user);
/// ```
#[utoipa::path(
    get,
    path = "/{id}",
    params(("id" = String, Path, description = "User identifier (UUID)")),
    responses(
        (status = 200, description = "User found", body = GetUserResponse),
        (status = 404, description = "User not found", body = ErrorSchema),
        (status = 500, description = "Response could not be encoded", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/{tail:.*}")]
pub async fn get_user(state: web::Data<HttpState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    let raw_id = first_segment(req.match_info().query("tail"));
    let Ok(id) = UserId::new(raw_id) else {
        debug!(raw_id, "user id is not a UUID");
        return Err(user_not_found());
    };

    match state.lookup.find(&id).await {
        Ok(Some(user)) => json_ok(&GetUserResponse::from(&user)),
        Ok(None) => {
            debug!(user_id = %id, "user not found");
            Err(user_not_found())
        }
        Err(err) => {
            error!(user_id = %id, code = ?err.code(), error = %err, "user lookup failed");
            Err(user_not_found())
        }
    }
}

/// Decode a registration body, accepting only a top-level JSON object.
///
/// Sequence-shaped input would otherwise deserialise positionally into the
/// request fields.
fn parse_registration(body: &[u8]) -> Result<CreateUserRequest, Error> {
    let value: Value = serde_json::from_slice(body).map_err(|err| {
        debug!(error = %err, "rejected malformed registration body");
        invalid_json(&err)
    })?;
    if !value.is_object() {
        debug!("rejected non-object registration body");
        return Err(not_a_json_object());
    }
    serde_json::from_value(value).map_err(|err| {
        debug!(error = %err, "rejected malformed registration body");
        invalid_json(&err)
    })
}

/// Register a user.
///
/// Accepted on any path. Answers 409 when the email is already registered.
#[utoipa::path(
    post,
    path = "/",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Invalid body or storage failure", body = ErrorSchema),
        (status = 409, description = "Email already registered", body = ErrorSchema),
        (status = 500, description = "Response could not be encoded", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "createUser"
)]
#[post("/{tail:.*}")]
pub async fn create_user(
    state: web::Data<HttpState>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let request = parse_registration(&body)?;
    let new_user =
        NewUser::try_from_parts(request.name, request.email).map_err(map_validation_error)?;

    let user_id = state
        .registration
        .register(new_user)
        .await
        .map_err(map_registration_error)?;

    json_ok(&CreateUserResponse {
        user_id: user_id.to_string(),
    })
}
