use std::sync::Arc;

use orderdesk_common::config::AppConfig;
use orderdesk_common::db;
use orderdesk_notifier::listener::StatusChangeListener;
use orderdesk_notifier::queue::{NotificationQueue, QueuePolicy};
use orderdesk_notifier::store::PgOrderLookup;
use orderdesk_notifier::whatsapp::WhatsAppClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orderdesk_notifier=info".into()),
        )
        .json()
        .init();

    tracing::info!("OrderDesk notifier starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Connect to database
    let pool = db::connect(&config).await?;

    // Run migrations
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    let policy = QueuePolicy::from_config(&config);
    let sender = WhatsAppClient::from_config(&config)?;
    let lookup = PgOrderLookup::new(pool.clone());
    let queue = NotificationQueue::new(Arc::new(lookup), Arc::new(sender), policy.clone());

    let mut listener = StatusChangeListener::connect(&pool, queue.clone()).await?;

    tracing::info!(
        max_retries = policy.max_retries,
        delay_ms = policy.delay.as_millis() as u64,
        "Notification queue ready"
    );

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        result = listener.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Status change listener exited with error");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
    }

    // Give an in-flight attempt a chance to finish; anything still queued is lost.
    let grace = policy.attempt_timeout + policy.delay;
    if tokio::time::timeout(grace, queue.wait_idle()).await.is_err() {
        let stats = queue.stats();
        tracing::warn!(pending = stats.pending, "Shutting down with undelivered notifications");
    }

    tracing::info!("OrderDesk notifier stopped.");
    Ok(())
}
