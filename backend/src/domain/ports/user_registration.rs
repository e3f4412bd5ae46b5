//! Driving ports for the user HTTP surface.
//!
//! Inbound adapters depend on these traits rather than on the concrete
//! service so handler tests can swap in doubles.

use async_trait::async_trait;

use crate::domain::{Error, NewUser, User, UserId};

/// Use-case port for registering users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRegistration: Send + Sync {
    /// Register a new user and return its generated identifier.
    ///
    /// Fails with [`crate::domain::ErrorCode::Conflict`] when the email is
    /// already registered.
    async fn register(&self, new_user: NewUser) -> Result<UserId, Error>;
}

/// Use-case port for reading users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Fetch a user by identifier; `Ok(None)` when no record exists.
    async fn find(&self, id: &UserId) -> Result<Option<User>, Error>;
}
