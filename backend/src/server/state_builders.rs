//! Builders for the HTTP state and the adapters behind it.

use std::sync::Arc;

use actix_web::web;
use tracing::warn;

use user_service::domain::UserRegistrationService;
use user_service::domain::ports::{EventPublisher, UserRepository};
use user_service::inbound::http::state::HttpState;
use user_service::outbound::persistence::{
    InMemoryItemStore, RedisItemStore, SingleTableUserRepository, users_table,
};
use user_service::outbound::stream::{InMemoryEventStream, RedisStreamPublisher};

use super::ServerConfig;

/// Select the repository and publisher adapters.
///
/// Redis-backed adapters are used when a pool is configured; otherwise the
/// process-local adapters keep the service runnable without infrastructure.
fn build_adapters(config: &ServerConfig) -> (Arc<dyn UserRepository>, Arc<dyn EventPublisher>) {
    let schema = users_table(config.table_name.as_str());
    match &config.redis_pool {
        Some(pool) => (
            Arc::new(SingleTableUserRepository::new(Arc::new(
                RedisItemStore::new(pool.clone(), schema),
            ))),
            Arc::new(RedisStreamPublisher::new(
                pool.clone(),
                config.stream_name.as_str(),
            )),
        ),
        None => {
            warn!(
                table = %config.table_name,
                stream = %config.stream_name,
                "no Redis URL configured; users and events are kept in memory"
            );
            (
                Arc::new(SingleTableUserRepository::new(Arc::new(
                    InMemoryItemStore::new(schema),
                ))),
                Arc::new(InMemoryEventStream::new(config.stream_name.as_str())),
            )
        }
    }
}

/// Build the shared HTTP state from the configured adapters.
pub(super) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let (users, events) = build_adapters(config);
    let service = UserRegistrationService::new(users, events)
        .with_event_format(config.event_format)
        .with_email_uniqueness(config.email_uniqueness);
    web::Data::new(HttpState::from_service(Arc::new(service)))
}
