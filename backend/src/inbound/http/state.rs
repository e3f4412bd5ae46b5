//! Shared HTTP adapter state.
//!
//! Handlers receive this via `actix_web::web::Data` so they depend only on the
//! driving ports and stay testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{UserLookup, UserRegistration};

/// Dependency bundle for the user handlers.
#[derive(Clone)]
pub struct HttpState {
    pub registration: Arc<dyn UserRegistration>,
    pub lookup: Arc<dyn UserLookup>,
}

impl HttpState {
    /// Bundle the two driving ports.
    pub fn new(registration: Arc<dyn UserRegistration>, lookup: Arc<dyn UserLookup>) -> Self {
        Self {
            registration,
            lookup,
        }
    }

    /// Use one service for both ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use user_service::domain::UserRegistrationService;
    /// use user_service::inbound::http::state::HttpState;
    /// use user_service::outbound::persistence::{
    ///     InMemoryItemStore, SingleTableUserRepository, users_table,
    /// };
    /// use user_service::outbound::stream::InMemoryEventStream;
    ///
    /// let store = Arc::new(InMemoryItemStore::new(users_table("users")));
    /// let service = UserRegistrationService::new(
    ///     Arc::new(SingleTableUserRepository::new(store)),
    ///     Arc::new(InMemoryEventStream::new("user-events")),
    /// );
    /// let _state = HttpState::from_service(Arc::new(service));
    /// ```
    pub fn from_service<S>(service: Arc<S>) -> Self
    where
        S: UserRegistration + UserLookup + 'static,
    {
        Self {
            registration: service.clone(),
            lookup: service,
        }
    }
}
