//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod event_publisher;
mod user_registration;
mod user_repository;

#[cfg(test)]
pub use event_publisher::MockEventPublisher;
pub use event_publisher::{EventPublishError, EventPublisher};
#[cfg(test)]
pub use user_registration::{MockUserLookup, MockUserRegistration};
pub use user_registration::{UserLookup, UserRegistration};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserPersistenceError, UserRepository};
