use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coop_db::PgStore;
use coop_events::{EventBus, OutboxRelay};

mod config;

use config::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    init_tracing(config.json_logs);

    let pool = coop_db::create_pool(&config.database_url, config.max_connections)
        .await
        .context("failed to connect to the database")?;
    coop_db::health_check(&pool)
        .await
        .context("database health check failed")?;
    coop_db::run_migrations(&pool)
        .await
        .context("failed to apply migrations")?;
    tracing::info!(max_connections = config.max_connections, "Database ready");

    let bus = Arc::new(EventBus::default());
    let relay = OutboxRelay::new(PgStore::new(pool.clone()), bus.clone())
        .with_batch_size(config.batch_size)
        .with_interval(config.poll_interval);

    let cancel = CancellationToken::new();
    let relay_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { relay.run(cancel).await }
    });
    tracing::info!(
        interval_ms = config.poll_interval.as_millis() as u64,
        batch_size = config.batch_size,
        "Outbox relay started"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested");
    cancel.cancel();
    relay_task.await.context("outbox relay task panicked")?;
    pool.close().await;

    tracing::info!("Worker stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "coop_worker=debug,coop_events=info,coop_db=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
