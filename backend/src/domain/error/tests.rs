//! Tests for the domain error payload.

use super::*;
use rstest::rstest;
use serde_json::json;
use uuid::Uuid;

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::not_found("missing"), ErrorCode::NotFound)]
#[case(Error::conflict("taken"), ErrorCode::Conflict)]
#[case(Error::service_unavailable("down"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn convenience_constructors_set_code(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
#[case("")]
#[case("   ")]
fn rejects_blank_messages(#[case] message: &str) {
    let result = Error::try_new(ErrorCode::InternalError, message);
    assert_eq!(result, Err(ErrorValidationError::EmptyMessage));
}

#[rstest]
fn serialises_camel_case_and_skips_empty_fields() {
    let error = Error::conflict("email is already registered")
        .with_details(json!({ "field": "email" }));
    let value = serde_json::to_value(&error).expect("serialise error");

    assert_eq!(value["code"], json!("conflict"));
    assert_eq!(value["message"], json!("email is already registered"));
    assert_eq!(value["details"]["field"], json!("email"));
    assert!(value.get("traceId").is_none());
}

#[rstest]
fn deserialisation_rejects_blank_message() {
    let payload = json!({ "code": "not_found", "message": " " });
    let result: Result<Error, _> = serde_json::from_value(payload);
    assert!(result.is_err());
}

#[rstest]
fn deserialisation_accepts_snake_case_trace_id_alias() {
    let payload = json!({ "code": "not_found", "message": "gone", "trace_id": "abc" });
    let error: Error = serde_json::from_value(payload).expect("valid payload");
    assert_eq!(error.trace_id(), Some("abc"));
}

#[tokio::test]
async fn captures_trace_id_in_scope() {
    let trace_id = TraceId::from_uuid(Uuid::nil());
    let error = TraceId::scope(trace_id, async { Error::internal("boom") }).await;
    assert_eq!(error.trace_id(), Some(Uuid::nil().to_string().as_str()));
}
