//! User service entry-point: loads configuration, selects adapters, and
//! serves the HTTP API.

mod server;

use actix_web::web;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use user_service::inbound::http::health::HealthState;
use user_service::outbound::{PoolConfig, RedisPool};
use user_service::settings::{ServiceSettings, SettingsError};

use server::{ServerConfig, create_server};

fn settings_error(err: SettingsError) -> std::io::Error {
    std::io::Error::other(err.to_string())
}

async fn build_server_config(settings: &ServiceSettings) -> std::io::Result<ServerConfig> {
    let config = ServerConfig::new(
        settings.bind_host().map_err(settings_error)?,
        settings.port(),
    )
    .with_names(
        settings.table_name().map_err(settings_error)?,
        settings.stream_name().map_err(settings_error)?,
    )
    .with_event_format(settings.event_format().map_err(settings_error)?)
    .with_email_uniqueness(settings.email_uniqueness().map_err(settings_error)?);

    match settings.redis_url() {
        Some(url) => {
            let pool = RedisPool::new(PoolConfig::new(url))
                .await
                .map_err(|err| std::io::Error::other(format!("redis pool: {err}")))?;
            Ok(config.with_redis_pool(pool))
        }
        None => Ok(config),
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServiceSettings::load_from_process().map_err(settings_error)?;
    let config = build_server_config(&settings).await?;
    let (host, port) = config.bind_addr();
    info!(%host, port, "starting user service");

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    let outcome = server.await;
    health_state.mark_unhealthy();
    info!("user service stopped");
    outcome
}
