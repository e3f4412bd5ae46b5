//! Shared wiring for the HTTP behaviour tests.
//!
//! Builds the user service over the in-memory adapters and offers port
//! doubles for the failure and race scenarios.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};
use async_trait::async_trait;

use user_service::Trace;
use user_service::domain::ports::{
    EventPublishError, EventPublisher, UserPersistenceError, UserRepository,
};
use user_service::domain::{
    EmailAddress, EmailUniqueness, EventFormat, User, UserId, UserRegistrationService,
};
use user_service::inbound::http::state::HttpState;
use user_service::inbound::http::users::{create_user, get_user};
use user_service::outbound::persistence::{
    InMemoryItemStore, IndexQuery, ItemStore, SingleTableUserRepository, users_table,
};
use user_service::outbound::stream::{InMemoryEventStream, PublishedEvent};

/// Time allowed for a detached publish to land.
pub const PUBLISH_WAIT: Duration = Duration::from_secs(2);
/// Time waited before concluding that nothing was published.
pub const QUIET_WAIT: Duration = Duration::from_millis(100);

/// Service under test plus handles on its in-memory adapters.
pub struct TestWorld {
    pub store: Arc<InMemoryItemStore>,
    pub events: Arc<InMemoryEventStream>,
    pub state: HttpState,
}

/// How a [`TestWorld`] is wired.
pub struct WorldOptions {
    pub uniqueness: EmailUniqueness,
    pub event_format: EventFormat,
    pub wrap_repository: fn(Arc<dyn UserRepository>) -> Arc<dyn UserRepository>,
    pub publisher: Option<Arc<dyn EventPublisher>>,
}

impl Default for WorldOptions {
    fn default() -> Self {
        Self {
            uniqueness: EmailUniqueness::Guarded,
            event_format: EventFormat::Tagged,
            wrap_repository: |repository| repository,
            publisher: None,
        }
    }
}

impl TestWorld {
    /// Wire the service over fresh in-memory adapters.
    pub fn new() -> Self {
        Self::with_options(WorldOptions::default())
    }

    /// Wire the service with the given strategy and doubles.
    pub fn with_options(options: WorldOptions) -> Self {
        let store = Arc::new(InMemoryItemStore::new(users_table("users")));
        let events = Arc::new(InMemoryEventStream::new("user-events"));
        let repository: Arc<dyn UserRepository> =
            Arc::new(SingleTableUserRepository::new(store.clone()));
        let publisher = options
            .publisher
            .unwrap_or_else(|| events.clone() as Arc<dyn EventPublisher>);
        let service =
            UserRegistrationService::new((options.wrap_repository)(repository), publisher)
                .with_event_format(options.event_format)
                .with_email_uniqueness(options.uniqueness);
        Self {
            store,
            events,
            state: HttpState::from_service(Arc::new(service)),
        }
    }

    /// Wait for `count` published events.
    pub async fn published(&self, count: usize) -> Vec<PublishedEvent> {
        self.events.wait_for(count, PUBLISH_WAIT).await
    }

    /// Whether nothing was published within [`QUIET_WAIT`].
    pub async fn nothing_published(&self) -> bool {
        self.events.wait_for(1, QUIET_WAIT).await.is_empty()
    }

    /// Number of user records indexed under `email`.
    pub async fn users_with_email(&self, email: &str) -> usize {
        let query = IndexQuery {
            index: "GSI1SK".to_owned(),
            partition: "USER#".to_owned(),
            sort: format!("EMAIL#{email}"),
        };
        self.store
            .query_index(&query, 16)
            .await
            .expect("in-memory index query")
            .len()
    }
}

/// The user routes over `state`, wrapped in the trace middleware.
pub fn app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(Trace)
        .service(get_user)
        .service(create_user)
}

/// Publisher whose every append fails.
pub struct RejectingPublisher;

#[async_trait]
impl EventPublisher for RejectingPublisher {
    async fn publish(&self, _payload: &[u8]) -> Result<(), EventPublishError> {
        Err(EventPublishError::rejected("stream is read-only"))
    }
}

/// Repository whose store is unreachable.
pub struct UnreachableRepository;

impl UnreachableRepository {
    pub fn replace(_inner: Arc<dyn UserRepository>) -> Arc<dyn UserRepository> {
        Arc::new(Self)
    }
}

fn unreachable() -> UserPersistenceError {
    UserPersistenceError::connection("connection refused")
}

#[async_trait]
impl UserRepository for UnreachableRepository {
    async fn create(&self, _user: &User) -> Result<(), UserPersistenceError> {
        Err(unreachable())
    }

    async fn create_unique(&self, _user: &User) -> Result<(), UserPersistenceError> {
        Err(unreachable())
    }

    async fn find_by_id(&self, _id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        Err(unreachable())
    }

    async fn find_by_email(
        &self,
        _email: &EmailAddress,
    ) -> Result<Option<User>, UserPersistenceError> {
        Err(unreachable())
    }
}

/// Repository that yields to the scheduler between the email lookup and the
/// write, so two concurrent registrations both pass the lookup first.
pub struct YieldingRepository {
    inner: Arc<dyn UserRepository>,
}

impl YieldingRepository {
    pub fn wrap(inner: Arc<dyn UserRepository>) -> Arc<dyn UserRepository> {
        Arc::new(Self { inner })
    }
}

#[async_trait]
impl UserRepository for YieldingRepository {
    async fn create(&self, user: &User) -> Result<(), UserPersistenceError> {
        self.inner.create(user).await
    }

    async fn create_unique(&self, user: &User) -> Result<(), UserPersistenceError> {
        self.inner.create_unique(user).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, UserPersistenceError> {
        let found = self.inner.find_by_email(email).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        found
    }
}
