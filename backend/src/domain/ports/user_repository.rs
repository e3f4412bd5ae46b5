//! Port abstraction for user persistence adapters and their errors.
//!
//! Not-found is an expected outcome, reported as `Ok(None)` by the lookups
//! rather than as an error.

use async_trait::async_trait;

use crate::domain::{EmailAddress, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Store connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Read or write failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// A stored record is missing attributes or carries invalid values.
        MalformedRecord { message: String } => "stored user record is malformed: {message}",
        /// A guarded write found the email already registered.
        EmailTaken { email: String } => "email `{email}` is already registered",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Write the user record unconditionally.
    ///
    /// A second call with the same id overwrites the first (last write wins).
    /// Email uniqueness is not checked.
    async fn create(&self, user: &User) -> Result<(), UserPersistenceError>;

    /// Write the user record only if no other user holds its email.
    ///
    /// The uniqueness check and the write happen atomically in the store.
    /// Returns [`UserPersistenceError::EmailTaken`] when the email is already
    /// registered.
    async fn create_unique(&self, user: &User) -> Result<(), UserPersistenceError>;

    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Fetch a user by email through the secondary index.
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, UserPersistenceError>;
}
