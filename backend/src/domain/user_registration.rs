//! Domain service behind the user HTTP surface.
//!
//! Registration checks the email index, writes the user record, and hands a
//! `UserCreated` event to the publisher on a detached task. Publication is
//! attempted exactly once and its outcome never reaches the caller.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    EventPublisher, UserLookup, UserPersistenceError, UserRegistration, UserRepository,
};
use crate::domain::{
    EmailAddress, Error, EventFormat, NewUser, TraceId, User, UserCreatedEvent, UserId,
};

/// How registration enforces the one-user-per-email invariant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmailUniqueness {
    /// Look up the email, then write the user together with an email guard
    /// record in one conditional transaction. Concurrent duplicates lose at
    /// the store.
    #[default]
    Guarded,
    /// Look up the email, then write unconditionally. Two concurrent
    /// requests for the same email can both succeed.
    CheckThenWrite,
}

/// Raised when a uniqueness strategy name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown email uniqueness strategy `{0}`; expected `guarded` or `check-then-write`")]
pub struct UnknownEmailUniqueness(pub String);

impl FromStr for EmailUniqueness {
    type Err = UnknownEmailUniqueness;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guarded" => Ok(Self::Guarded),
            "check-then-write" | "check_then_write" => Ok(Self::CheckThenWrite),
            _ => Err(UnknownEmailUniqueness(s.to_owned())),
        }
    }
}

/// User registration and lookup backed by the repository and event ports.
#[derive(Clone)]
pub struct UserRegistrationService {
    users: Arc<dyn UserRepository>,
    events: Arc<dyn EventPublisher>,
    event_format: EventFormat,
    uniqueness: EmailUniqueness,
}

impl UserRegistrationService {
    /// Build a service using the tagged event format and guarded uniqueness.
    pub fn new(users: Arc<dyn UserRepository>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            users,
            events,
            event_format: EventFormat::default(),
            uniqueness: EmailUniqueness::default(),
        }
    }

    /// Select the wire format of published events.
    #[must_use]
    pub fn with_event_format(mut self, event_format: EventFormat) -> Self {
        self.event_format = event_format;
        self
    }

    /// Select the email uniqueness strategy.
    #[must_use]
    pub fn with_email_uniqueness(mut self, uniqueness: EmailUniqueness) -> Self {
        self.uniqueness = uniqueness;
        self
    }

    async fn register_user(&self, new_user: NewUser) -> Result<UserId, Error> {
        let NewUser { name, email } = new_user;

        let existing = self
            .users
            .find_by_email(&email)
            .await
            .map_err(map_user_persistence_error)?;
        if existing.is_some() {
            debug!(email = %email, "registration rejected: email already registered");
            return Err(email_taken(&email));
        }

        let user = User::new(UserId::random(), name, email);
        let written = match self.uniqueness {
            EmailUniqueness::Guarded => self.users.create_unique(&user).await,
            EmailUniqueness::CheckThenWrite => self.users.create(&user).await,
        };
        written.map_err(|error| match error {
            UserPersistenceError::EmailTaken { .. } => {
                debug!(email = %user.email(), "registration lost the email guard race");
                email_taken(user.email())
            }
            other => map_user_persistence_error(other),
        })?;

        info!(user_id = %user.id(), "user registered");
        self.dispatch_created_event(user.id());
        Ok(user.id().clone())
    }

    fn dispatch_created_event(&self, user_id: &UserId) {
        let event = UserCreatedEvent::new(user_id.clone(), Utc::now());
        let payload = match event.encode(self.event_format) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%error, user_id = %user_id, "failed to encode user created event");
                return;
            }
        };

        let events = Arc::clone(&self.events);
        let user_id = user_id.clone();
        let trace_id = TraceId::current();
        tokio::spawn(TraceId::scope_optional(trace_id, async move {
            match events.publish(&payload).await {
                Ok(()) => debug!(user_id = %user_id, "user created event published"),
                Err(error) => warn!(
                    %error,
                    error_kind = error.kind(),
                    user_id = %user_id,
                    "user created event dropped"
                ),
            }
        }));
    }
}

fn email_taken(email: &EmailAddress) -> Error {
    Error::conflict("email is already registered").with_details(json!({
        "field": "email",
        "code": "email_taken",
        "value": email.as_ref(),
    }))
}

fn map_user_persistence_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => Error::service_unavailable(message),
        UserPersistenceError::Query { message } | UserPersistenceError::MalformedRecord { message } => {
            Error::internal(message)
        }
        UserPersistenceError::EmailTaken { email } => Error::conflict(format!(
            "email `{email}` is already registered"
        )),
    }
}

#[async_trait]
impl UserRegistration for UserRegistrationService {
    async fn register(&self, new_user: NewUser) -> Result<UserId, Error> {
        self.register_user(new_user).await
    }
}

#[async_trait]
impl UserLookup for UserRegistrationService {
    async fn find(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.users
            .find_by_id(id)
            .await
            .map_err(map_user_persistence_error)
    }
}

#[cfg(test)]
mod tests;
