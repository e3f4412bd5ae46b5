//! HTTP server configuration object and helpers.

use user_service::domain::{EmailUniqueness, EventFormat};
use user_service::outbound::RedisPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_host: String,
    pub(crate) port: u16,
    pub(crate) table_name: String,
    pub(crate) stream_name: String,
    pub(crate) event_format: EventFormat,
    pub(crate) email_uniqueness: EmailUniqueness,
    pub(crate) redis_pool: Option<RedisPool>,
}

impl ServerConfig {
    /// Construct a server configuration listening on `bind_host:port`.
    ///
    /// The store table and event stream names default to `users` and
    /// `user-events`; the adapters default to the in-memory implementations
    /// until a pool is attached.
    #[must_use]
    pub fn new(bind_host: impl Into<String>, port: u16) -> Self {
        Self {
            bind_host: bind_host.into(),
            port,
            table_name: "users".to_owned(),
            stream_name: "user-events".to_owned(),
            event_format: EventFormat::default(),
            email_uniqueness: EmailUniqueness::default(),
            redis_pool: None,
        }
    }

    /// Name the store table and the event stream.
    #[must_use]
    pub fn with_names(mut self, table_name: impl Into<String>, stream_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self.stream_name = stream_name.into();
        self
    }

    /// Select the creation event encoding.
    #[must_use]
    pub fn with_event_format(mut self, event_format: EventFormat) -> Self {
        self.event_format = event_format;
        self
    }

    /// Select how email uniqueness is enforced on registration.
    #[must_use]
    pub fn with_email_uniqueness(mut self, email_uniqueness: EmailUniqueness) -> Self {
        self.email_uniqueness = email_uniqueness;
        self
    }

    /// Attach a Redis pool; the store and stream adapters then use Redis.
    #[must_use]
    pub fn with_redis_pool(mut self, pool: RedisPool) -> Self {
        self.redis_pool = Some(pool);
        self
    }

    /// Return the host and port the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> (&str, u16) {
        (&self.bind_host, self.port)
    }
}
