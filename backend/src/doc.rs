//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the user and health endpoints plus the error schema
//! wrappers. The document backs Swagger UI in debug builds and is exported by
//! `cargo run --bin openapi-dump`.

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::users::{CreateUserRequest, CreateUserResponse, GetUserResponse};
use utoipa::OpenApi;

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "User service API",
        description = "Register users, look them up by identifier, and probe service health."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::users::get_user,
        crate::inbound::http::users::create_user,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        CreateUserRequest,
        CreateUserResponse,
        GetUserResponse
    )),
    tags(
        (name = "users", description = "User registration and lookup"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    fn object_fields(schema: &RefOr<Schema>) -> Vec<String> {
        match schema {
            RefOr::T(Schema::Object(obj)) => obj.properties.keys().cloned().collect(),
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn registers_user_and_health_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/{id}", "/", "/health/ready", "/health/live"] {
            assert!(doc.paths.paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn error_schema_exposes_code_and_message() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let fields = object_fields(schemas.get(ERROR_SCHEMA_NAME).expect("Error schema"));
        assert!(fields.contains(&"code".to_owned()));
        assert!(fields.contains(&"message".to_owned()));
    }

    #[test]
    fn create_response_uses_snake_case_user_id() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let fields = object_fields(schemas.get("CreateUserResponse").expect("response schema"));
        assert_eq!(fields, vec!["user_id".to_owned()]);
    }
}
