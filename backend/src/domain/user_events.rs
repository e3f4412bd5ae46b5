//! Domain events emitted by user registration.
//!
//! Events stay transport agnostic; [`UserCreatedEvent::encode`] produces the
//! opaque bytes handed to whichever stream adapter is configured.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::domain::UserId;

/// Wire format for published events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventFormat {
    /// Tagged string payload: `user_created:<id>`.
    #[default]
    Tagged,
    /// JSON envelope carrying the event type, user id and creation time.
    Envelope,
}

/// Raised when an event format name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event format `{0}`; expected `tagged` or `envelope`")]
pub struct UnknownEventFormat(pub String);

impl FromStr for EventFormat {
    type Err = UnknownEventFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tagged" => Ok(Self::Tagged),
            "envelope" => Ok(Self::Envelope),
            _ => Err(UnknownEventFormat(s.to_owned())),
        }
    }
}

/// Event emitted once a user record has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCreatedEvent {
    user_id: UserId,
    occurred_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    id: &'a str,
    occurred_at: String,
}

impl UserCreatedEvent {
    /// Event type tag shared by both wire formats.
    pub const KIND: &'static str = "user_created";

    /// Build an event for `user_id` created at `occurred_at`.
    #[must_use]
    pub fn new(user_id: UserId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            occurred_at,
        }
    }

    /// Identifier of the created user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Encode the event into publishable bytes.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use user_service::domain::{EventFormat, UserCreatedEvent, UserId};
    ///
    /// let id = UserId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").expect("valid id");
    /// let event = UserCreatedEvent::new(id, Utc::now());
    /// let payload = event.encode(EventFormat::Tagged).expect("encodes");
    /// assert_eq!(payload, b"user_created:3fa85f64-5717-4562-b3fc-2c963f66afa6");
    /// ```
    pub fn encode(&self, format: EventFormat) -> Result<Vec<u8>, serde_json::Error> {
        match format {
            EventFormat::Tagged => Ok(format!("{}:{}", Self::KIND, self.user_id).into_bytes()),
            EventFormat::Envelope => serde_json::to_vec(&EventEnvelope {
                kind: Self::KIND,
                id: self.user_id.as_ref(),
                occurred_at: self
                    .occurred_at
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        }
    }
}
