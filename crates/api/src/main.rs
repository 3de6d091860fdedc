use std::net::SocketAddr;

use anyhow::Context;

use warden_infra::AppConfig;
use warden_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_from_env().context("failed to load configuration")?;

    warden_observability::init(&config.logging.level, LogFormat::from_json_flag(config.logging.json));

    let app = warden_api::app::build_app_from_config(&config)
        .await
        .context("failed to build application")?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
