use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use brigade_api::app::{self, services};
use brigade_api::config::{AppConfig, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_cli(Cli::parse())?;
    brigade_observability::init_with(config.log_format);

    let validator = Arc::new(services::build_validator(&config)?);
    let services = Arc::new(services::build_services(&config).await?);
    let app = app::build_app(validator, services);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
