//! HTTP inbound adapter exposing the user and health endpoints.

pub mod error;
pub mod health;
pub mod schemas;
pub mod state;
pub mod users;

pub use error::ApiResult;
