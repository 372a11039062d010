use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::cache::YearsTrackedCache;
use crate::config::AppConfig;
use crate::db::{queries, DbPool};
use crate::jobs;
use crate::models::import::Import;
use crate::progress::{LogProgress, ProgressBroadcaster};

/// Starts the import worker loop with a circuit breaker mechanism.
///
/// Queued imports are claimed straight from Postgres. FOR UPDATE SKIP
/// LOCKED in the claim query keeps multiple workers from processing the
/// same import twice.
pub async fn start_import_worker(config: &AppConfig, pool: DbPool) -> anyhow::Result<()> {
    info!(
        "Initializing import worker (unit: {}, poll interval: {}s)",
        config.distance_unit, config.worker_poll_interval
    );

    let pool = Arc::new(pool);
    let progress: Arc<dyn ProgressBroadcaster> = Arc::new(LogProgress);
    let cache = Arc::new(YearsTrackedCache::new(Duration::from_secs(
        config.years_tracked_ttl,
    )));
    let poll_interval = Duration::from_secs(config.worker_poll_interval);

    let mut consecutive_failures = 0;
    let max_retries = config.worker_max_retries;
    let cooldown_duration = Duration::from_secs(config.worker_circuit_breaker_cooldown);

    loop {
        // Circuit Breaker Check
        if consecutive_failures >= max_retries {
            warn!(
                "Circuit breaker tripped ({} consecutive failures)! Sleeping for {} seconds...",
                consecutive_failures, config.worker_circuit_breaker_cooldown
            );
            tokio::time::sleep(cooldown_duration).await;
            consecutive_failures = 0;
            info!("Circuit breaker reset. Resuming claims.");
        }

        match claim_next_import(&pool).await {
            Ok(Some(import)) => {
                consecutive_failures = 0;

                let pool_clone = pool.clone();
                let progress_clone = progress.clone();
                let cache_clone = cache.clone();
                let unit = config.distance_unit;

                // Process the import in a background task to not block the claim loop
                tokio::spawn(async move {
                    if let Err(e) = jobs::import::run(
                        &pool_clone,
                        unit,
                        progress_clone.as_ref(),
                        &cache_clone,
                        &import,
                    )
                    .await
                    {
                        error!("Error processing import {}: {:?}", import.id, e);
                    }
                });
            }
            Ok(None) => {
                consecutive_failures = 0;
                tokio::time::sleep(poll_interval).await;
            }
            Err(e) => {
                error!(
                    "Claim error: {}. Incrementing failure count ({} / {})",
                    e,
                    consecutive_failures + 1,
                    max_retries
                );
                consecutive_failures += 1;

                // Small delay to prevent tight loop in case of transient DB trouble
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }
}

/// Atomically claims the oldest queued import, marking it processing.
pub async fn claim_next_import(pool: &DbPool) -> anyhow::Result<Option<Import>> {
    let import = sqlx::query_as::<_, Import>(queries::CLAIM_QUEUED_IMPORT)
        .fetch_optional(pool)
        .await?;
    Ok(import)
}
