//! Supercheck Worker - Entry Point

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use supercheck_worker::{webhook_processor, RedisJobQueue, WebhookDeliverer, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "supercheck_worker=info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting Supercheck worker v{}", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env();
    let conn = supercheck_shared::create_connection_manager(&config.redis_url)
        .await
        .context("connecting to Redis")?;
    info!("Connected to Redis");

    let deliverer = WebhookDeliverer::new(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    info!(queue = %config.queue, "Processing webhook queue");
    let queue = RedisJobQueue::new(conn, &config);
    let processor = tokio::spawn(webhook_processor::run(queue, deliverer, shutdown_rx));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    processor.await?;
    Ok(())
}
