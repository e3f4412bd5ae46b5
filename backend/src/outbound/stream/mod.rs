//! Event stream adapters implementing the `EventPublisher` port.
//!
//! Every publish becomes one stream record tagged with a fresh random
//! partition key. Neither adapter retries or deduplicates.

mod in_memory_event_stream;
mod redis_stream_publisher;

pub use in_memory_event_stream::{InMemoryEventStream, PublishedEvent};
pub use redis_stream_publisher::RedisStreamPublisher;
