use std::time::Duration;

use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;

/// How long an order lookup may wait for a free connection. Kept well below the
/// per-attempt delivery timeout so an exhausted pool surfaces as a lookup error.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connections are recycled after this long idle; the notifier is mostly quiet.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

fn pool_options(max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(Some(IDLE_TIMEOUT))
}

/// Open the pool shared by order lookups and the status-change listener.
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool = pool_options(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database pool ready"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_options() {
        let options = pool_options(3);
        assert_eq!(options.get_max_connections(), 3);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_acquire_timeout(), ACQUIRE_TIMEOUT);
        assert_eq!(options.get_idle_timeout(), Some(IDLE_TIMEOUT));
    }
}
