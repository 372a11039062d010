use anyhow::{bail, Result};
use chrono::DateTime;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::cache::YearsTrackedCache;
use crate::db::{queries, DbPool};
use crate::distance::DistanceUnit;
use crate::models::import::{Import, ImportSource, ImportStatus};
use crate::models::notification::NotificationKind;
use crate::notify;
use crate::parsers;
use crate::progress::ProgressBroadcaster;
use crate::stats;
use crate::time_chunks::time_chunks;
use crate::writer;

/// Queues a new import for processing and returns its id. The payload is
/// stored verbatim so a failed import can be reprocessed.
pub async fn create_import(
    pool: &DbPool,
    user_id: i64,
    source: ImportSource,
    name: &str,
    raw_data: &str,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(queries::INSERT_IMPORT)
        .bind(id)
        .bind(user_id)
        .bind(source.as_ref())
        .bind(name)
        .bind(raw_data)
        .execute(pool)
        .await?;
    info!("Queued {} import {} for user {}", source, id, user_id);
    Ok(id)
}

/// Processes one claimed import end to end: parse, write, refresh the
/// derived data. A parse or write failure marks the import failed and
/// notifies the user instead of bubbling up to the worker loop.
pub async fn run(
    pool: &DbPool,
    unit: DistanceUnit,
    progress: &dyn ProgressBroadcaster,
    cache: &YearsTrackedCache,
    import: &Import,
) -> Result<()> {
    info!(
        "Processing import {} ({}) for user {}",
        import.id, import.source, import.user_id
    );

    match ingest(pool, progress, import).await {
        Ok(inserted) => {
            // Points count and completion flip together or not at all.
            let mut tx = pool.begin().await?;
            sqlx::query(queries::UPDATE_IMPORT_POINTS_COUNT)
                .bind(import.id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(queries::UPDATE_IMPORT_STATUS)
                .bind(import.id)
                .bind(ImportStatus::Completed.as_i16())
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            info!("Import {} finished, {} new points", import.id, inserted);
            notify::create(
                pool,
                import.user_id,
                NotificationKind::Info,
                "Import finished",
                &format!("Import \"{}\" successfully finished.", import.name),
            )
            .await?;
            cache.invalidate(import.user_id).await;
            refresh_derived_data(pool, unit, import).await
        }
        Err(error) => {
            error!("Import {} failed: {:?}", import.id, error);
            set_status(pool, import.id, ImportStatus::Failed).await?;
            notify::create(
                pool,
                import.user_id,
                NotificationKind::Error,
                "Import failed",
                &format!("Import \"{}\" failed: {:#}", import.name, error),
            )
            .await
        }
    }
}

/// Deletes an import together with its points (FK cascade) and recomputes
/// the user's stats from what is left.
pub async fn destroy(
    pool: &DbPool,
    unit: DistanceUnit,
    cache: &YearsTrackedCache,
    user_id: i64,
    import_id: Uuid,
) -> Result<()> {
    let result = sqlx::query(queries::DELETE_IMPORT)
        .bind(import_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        bail!("import {} not found for user {}", import_id, user_id);
    }

    info!("Deleted import {} for user {}", import_id, user_id);
    cache.invalidate(user_id).await;
    stats::bulk_calculate(pool, unit, user_id).await
}

async fn ingest(
    pool: &DbPool,
    progress: &dyn ProgressBroadcaster,
    import: &Import,
) -> Result<u64> {
    let candidates = parsers::parse_import(import)?;
    writer::write_points(pool, progress, Some(import.id), candidates).await
}

async fn set_status(pool: &DbPool, import_id: Uuid, status: ImportStatus) -> Result<()> {
    sqlx::query(queries::UPDATE_IMPORT_STATUS)
        .bind(import_id)
        .bind(status.as_i16())
        .execute(pool)
        .await?;
    Ok(())
}

/// Recomputes stats for every month the import touched and logs the
/// calendar-year units downstream processing would cover.
async fn refresh_derived_data(pool: &DbPool, unit: DistanceUnit, import: &Import) -> Result<()> {
    let months: Vec<(i32, i32)> = sqlx::query_as(queries::SELECT_IMPORT_MONTHS)
        .bind(import.id)
        .fetch_all(pool)
        .await?;
    for (year, month) in &months {
        stats::calculate_month(pool, unit, import.user_id, *year, *month as u32).await?;
    }

    let (first, last): (Option<i64>, Option<i64>) = sqlx::query_as(queries::SELECT_IMPORT_SPAN)
        .bind(import.id)
        .fetch_one(pool)
        .await?;
    if let (Some(first), Some(last)) = (first, last) {
        let (Some(start), Some(end)) = (
            DateTime::from_timestamp(first, 0),
            DateTime::from_timestamp(last, 0),
        ) else {
            return Ok(());
        };
        let chunks = time_chunks(start, end);
        info!(
            "Import {} spans {} calendar-year unit(s)",
            import.id,
            chunks.len()
        );
        for chunk in &chunks {
            debug!("Year unit {} to {}", chunk.start, chunk.end_inclusive());
        }
    }
    Ok(())
}
