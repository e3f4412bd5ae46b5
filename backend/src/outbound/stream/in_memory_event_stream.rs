//! Process-local event stream for development and tests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{EventPublishError, EventPublisher};

/// One record appended to the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedEvent {
    /// Random partition key chosen at publish time.
    pub partition_key: Uuid,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
}

impl PublishedEvent {
    /// Payload as UTF-8 text, if it is valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// In-memory [`EventPublisher`] that records every published payload.
#[derive(Debug)]
pub struct InMemoryEventStream {
    name: String,
    records: Mutex<Vec<PublishedEvent>>,
    appended: Notify,
}

impl InMemoryEventStream {
    /// Create an empty stream called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Mutex::new(Vec::new()),
            appended: Notify::new(),
        }
    }

    /// Stream name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the records appended so far, oldest first.
    pub async fn records(&self) -> Vec<PublishedEvent> {
        self.records.lock().await.clone()
    }

    /// Wait until at least `count` records exist or `timeout` elapses, then
    /// return a snapshot.
    ///
    /// Publication happens on detached tasks, so callers observing the
    /// stream after a request use this instead of [`Self::records`].
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<PublishedEvent> {
        let reached = tokio::time::timeout(timeout, async {
            loop {
                let appended = self.appended.notified();
                if self.records.lock().await.len() >= count {
                    return;
                }
                appended.await;
            }
        })
        .await;
        if reached.is_err() {
            debug!(stream = %self.name, expected = count, "wait for published events timed out");
        }
        self.records().await
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventStream {
    async fn publish(&self, payload: &[u8]) -> Result<(), EventPublishError> {
        let record = PublishedEvent {
            partition_key: Uuid::new_v4(),
            payload: payload.to_vec(),
        };
        self.records.lock().await.push(record);
        self.appended.notify_waiters();
        Ok(())
    }
}
