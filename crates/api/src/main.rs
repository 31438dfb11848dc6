use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use stockroom_api::app;
use stockroom_infra::{ReaperRunner, ShopConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockroom_observability::init();

    let config = ShopConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(app::build_services(&config)?);

    let reaper = ReaperRunner::default()
        .with_interval(config.reaper_interval)
        .spawn("expiry-reaper", services.reaper())
        .context("failed to spawn expiry reaper")?;

    let router = app::build_app(services);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    info!("shutting down");
    reaper.shutdown();
    Ok(())
}
