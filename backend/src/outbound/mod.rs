//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: single-table user storage over an in-memory or Redis
//!   item store
//! - **stream**: event publication to Redis Streams or an in-memory stream
//!
//! Both Redis adapters share one [`RedisPool`]. Adapters are thin translators
//! between domain types and infrastructure representations.

pub mod persistence;
mod redis_pool;
pub mod stream;

pub use redis_pool::{PoolConfig, PoolError, RedisPool};
