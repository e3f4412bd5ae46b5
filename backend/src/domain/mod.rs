//! Domain primitives, services, and ports.
//!
//! Purpose: define the user model and the registration use-cases without any
//! knowledge of HTTP, Redis, or the stream transport. Adapters in
//! `inbound`/`outbound` depend on this module, never the other way round.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - User, UserId, UserName, EmailAddress, NewUser: the user model.
//! - UserCreatedEvent / EventFormat: the creation event and its encodings.
//! - UserRegistrationService / EmailUniqueness: the registration use-case.
//! - TraceId: request correlation identifier.

pub mod error;
pub mod ports;
pub mod trace_id;
pub mod user;
pub mod user_events;
pub mod user_registration;

pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::trace_id::TraceId;
pub use self::user::{EmailAddress, NewUser, User, UserId, UserName, UserValidationError};
pub use self::user_events::{EventFormat, UnknownEventFormat, UserCreatedEvent};
pub use self::user_registration::{
    EmailUniqueness, UnknownEmailUniqueness, UserRegistrationService,
};
