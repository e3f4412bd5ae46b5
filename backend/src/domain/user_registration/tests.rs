//! Tests for the user registration service.

use std::time::Duration;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{EventPublishError, MockEventPublisher, MockUserRepository};
use rstest::{fixture, rstest};
use tokio::sync::mpsc;

const ADA_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

#[fixture]
fn ada_registration() -> NewUser {
    NewUser::try_from_parts(Some("Ada".into()), Some("ada@x.com".into()))
        .expect("valid registration")
}

fn stored_ada() -> User {
    User::try_from_strings(ADA_ID, "Ada", "ada@x.com").expect("valid user")
}

/// Publisher double that forwards every payload to a channel and answers with
/// `outcome`.
fn channel_publisher(
    outcome: Result<(), EventPublishError>,
) -> (MockEventPublisher, mpsc::UnboundedReceiver<Vec<u8>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut publisher = MockEventPublisher::new();
    publisher.expect_publish().times(1).returning(move |payload| {
        tx.send(payload.to_vec()).expect("test receiver alive");
        outcome.clone()
    });
    (publisher, rx)
}

fn silent_publisher() -> MockEventPublisher {
    let mut publisher = MockEventPublisher::new();
    publisher.expect_publish().never();
    publisher
}

async fn next_payload(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> String {
    let payload = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("publish attempted in time")
        .expect("payload sent");
    String::from_utf8(payload).expect("utf8 payload")
}

fn service(repo: MockUserRepository, publisher: MockEventPublisher) -> UserRegistrationService {
    UserRegistrationService::new(Arc::new(repo), Arc::new(publisher))
}

#[rstest]
#[tokio::test]
async fn guarded_registration_writes_conditionally_and_publishes(ada_registration: NewUser) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_email().times(1).returning(|_| Ok(None));
    repo.expect_create_unique()
        .withf(|user: &User| user.name().as_ref() == "Ada" && user.email().as_ref() == "ada@x.com")
        .times(1)
        .returning(|_| Ok(()));
    repo.expect_create().never();
    let (publisher, mut rx) = channel_publisher(Ok(()));

    let user_id = service(repo, publisher)
        .register(ada_registration)
        .await
        .expect("registration succeeds");

    assert_eq!(next_payload(&mut rx).await, format!("user_created:{user_id}"));
}

#[rstest]
#[tokio::test]
async fn check_then_write_registration_uses_plain_create(ada_registration: NewUser) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_email().times(1).returning(|_| Ok(None));
    repo.expect_create().times(1).returning(|_| Ok(()));
    repo.expect_create_unique().never();
    let (publisher, mut rx) = channel_publisher(Ok(()));

    let user_id = service(repo, publisher)
        .with_email_uniqueness(EmailUniqueness::CheckThenWrite)
        .register(ada_registration)
        .await
        .expect("registration succeeds");

    assert_eq!(next_payload(&mut rx).await, format!("user_created:{user_id}"));
}

#[rstest]
#[tokio::test]
async fn envelope_format_publishes_json(ada_registration: NewUser) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_email().returning(|_| Ok(None));
    repo.expect_create_unique().returning(|_| Ok(()));
    let (publisher, mut rx) = channel_publisher(Ok(()));

    let user_id = service(repo, publisher)
        .with_event_format(EventFormat::Envelope)
        .register(ada_registration)
        .await
        .expect("registration succeeds");

    let payload: serde_json::Value =
        serde_json::from_str(&next_payload(&mut rx).await).expect("json payload");
    assert_eq!(payload["type"], "user_created");
    assert_eq!(payload["id"], user_id.as_ref());
    assert!(payload["occurredAt"].is_string());
}

#[rstest]
#[tokio::test]
async fn existing_email_is_a_conflict_without_writes(ada_registration: NewUser) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_email()
        .withf(|email: &EmailAddress| email.as_ref() == "ada@x.com")
        .times(1)
        .returning(|_| Ok(Some(stored_ada())));
    repo.expect_create().never();
    repo.expect_create_unique().never();

    let error = service(repo, silent_publisher())
        .register(ada_registration)
        .await
        .expect_err("duplicate email rejected");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(
        error.details().and_then(|d| d.get("code")).and_then(|c| c.as_str()),
        Some("email_taken")
    );
}

#[rstest]
#[tokio::test]
async fn losing_the_guard_race_is_a_conflict(ada_registration: NewUser) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_email().returning(|_| Ok(None));
    repo.expect_create_unique()
        .times(1)
        .returning(|user| Err(UserPersistenceError::email_taken(user.email().as_ref())));

    let error = service(repo, silent_publisher())
        .register(ada_registration)
        .await
        .expect_err("guard rejects duplicate");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[case(UserPersistenceError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(UserPersistenceError::query("bad reply"), ErrorCode::InternalError)]
#[case(UserPersistenceError::malformed_record("no name"), ErrorCode::InternalError)]
#[tokio::test]
async fn email_lookup_failures_abort_registration(
    ada_registration: NewUser,
    #[case] failure: UserPersistenceError,
    #[case] expected: ErrorCode,
) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_email()
        .times(1)
        .returning(move |_| Err(failure.clone()));
    repo.expect_create().never();
    repo.expect_create_unique().never();

    let error = service(repo, silent_publisher())
        .register(ada_registration)
        .await
        .expect_err("lookup failure propagates");

    assert_eq!(error.code(), expected);
}

#[rstest]
#[tokio::test]
async fn write_failure_skips_publication(ada_registration: NewUser) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_email().returning(|_| Ok(None));
    repo.expect_create_unique()
        .times(1)
        .returning(|_| Err(UserPersistenceError::connection("reset")));

    let error = service(repo, silent_publisher())
        .register(ada_registration)
        .await
        .expect_err("write failure propagates");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn publish_failure_does_not_fail_registration(ada_registration: NewUser) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_email().returning(|_| Ok(None));
    repo.expect_create_unique().returning(|_| Ok(()));
    let (publisher, mut rx) = channel_publisher(Err(EventPublishError::rejected("stream full")));

    let result = service(repo, publisher).register(ada_registration).await;

    let user_id = result.expect("registration still succeeds");
    assert_eq!(next_payload(&mut rx).await, format!("user_created:{user_id}"));
}

#[rstest]
#[tokio::test]
async fn lookup_passes_through_found_and_missing_users() {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_id()
        .times(2)
        .returning(|id| Ok((id.as_ref() == ADA_ID).then(stored_ada)));
    let service = service(repo, silent_publisher());

    let ada_id = UserId::new(ADA_ID).expect("valid id");
    assert_eq!(service.find(&ada_id).await, Ok(Some(stored_ada())));
    assert_eq!(service.find(&UserId::random()).await, Ok(None));
}

#[rstest]
#[tokio::test]
async fn lookup_maps_storage_failures() {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_id()
        .returning(|_| Err(UserPersistenceError::connection("refused")));

    let error = service(repo, silent_publisher())
        .find(&UserId::random())
        .await
        .expect_err("storage failure propagates");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[case("guarded", EmailUniqueness::Guarded)]
#[case("check-then-write", EmailUniqueness::CheckThenWrite)]
#[case("CHECK_THEN_WRITE", EmailUniqueness::CheckThenWrite)]
fn parses_uniqueness_names(#[case] raw: &str, #[case] expected: EmailUniqueness) {
    assert_eq!(raw.parse::<EmailUniqueness>(), Ok(expected));
}

#[rstest]
fn rejects_unknown_uniqueness_names() {
    assert!("optimistic".parse::<EmailUniqueness>().is_err());
}
