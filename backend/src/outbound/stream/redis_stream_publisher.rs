//! Redis Streams-backed [`EventPublisher`].
//!
//! Each payload is appended with
//! `XADD <stream> * partition_key <uuid> data <payload>`; the server assigns
//! the entry id.

use async_trait::async_trait;
use bb8_redis::redis::{self, RedisError};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{EventPublishError, EventPublisher};
use crate::outbound::RedisPool;

/// Appends events to one Redis stream.
#[derive(Clone)]
pub struct RedisStreamPublisher {
    pool: RedisPool,
    stream: String,
}

impl RedisStreamPublisher {
    /// Publish to `stream` using connections from `pool`.
    pub fn new(pool: RedisPool, stream: impl Into<String>) -> Self {
        Self {
            pool,
            stream: stream.into(),
        }
    }

    /// Target stream name.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    fn append_command(&self, partition_key: Uuid, payload: &[u8]) -> redis::Cmd {
        let mut cmd = redis::cmd("XADD");
        cmd.arg(&self.stream)
            .arg("*")
            .arg("partition_key")
            .arg(partition_key.to_string())
            .arg("data")
            .arg(payload);
        cmd
    }
}

fn map_redis_error(error: RedisError) -> EventPublishError {
    if error.is_io_error()
        || error.is_connection_refusal()
        || error.is_connection_dropped()
        || error.is_timeout()
    {
        EventPublishError::connection(error.to_string())
    } else {
        EventPublishError::rejected(error.to_string())
    }
}

#[async_trait]
impl EventPublisher for RedisStreamPublisher {
    async fn publish(&self, payload: &[u8]) -> Result<(), EventPublishError> {
        let partition_key = Uuid::new_v4();
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| EventPublishError::connection(err.message()))?;
        let entry_id: String = self
            .append_command(partition_key, payload)
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        debug!(stream = %self.stream, %entry_id, %partition_key, "event appended");
        Ok(())
    }
}
