use std::collections::HashMap;

use anyhow::Result;
use sqlx::{Postgres, QueryBuilder};
use tracing::error;
use uuid::Uuid;

use crate::db::{queries, DbPool};
use crate::models::notification::NotificationKind;
use crate::models::point::NewPoint;
use crate::notify;
use crate::progress::ProgressBroadcaster;

/// Candidate points are persisted in batches of this size.
pub const CHUNK_SIZE: usize = 1000;

/// Writes candidate points in batches, skipping duplicates.
///
/// Within a batch the last occurrence of a (lat, lon, timestamp, user)
/// identity wins, duplicates of rows already stored are dropped by the
/// database's unique index. A failing batch is reported as an error
/// notification and does not stop the remaining batches. Returns the
/// number of rows actually inserted.
pub async fn write_points(
    pool: &DbPool,
    progress: &dyn ProgressBroadcaster,
    import_id: Option<Uuid>,
    candidates: Vec<NewPoint>,
) -> Result<u64> {
    let mut inserted = 0u64;
    let mut processed = 0u64;

    for chunk in candidates.chunks(CHUNK_SIZE) {
        processed += chunk.len() as u64;

        match insert_chunk(pool, &dedup_chunk(chunk)).await {
            Ok(count) => inserted += count,
            Err(error) => {
                error!("Failed to persist location batch: {:?}", error);
                if let Some(user_id) = chunk.first().map(|point| point.user_id) {
                    let content = format!("Failed to process location batch: {:#}", error);
                    if let Err(notify_error) = notify::create(
                        pool,
                        user_id,
                        NotificationKind::Error,
                        "Point batch failed",
                        &content,
                    )
                    .await
                    {
                        error!(
                            "Failed to store batch failure notification: {:?}",
                            notify_error
                        );
                    }
                }
            }
        }

        if let Some(import_id) = import_id {
            progress.report(import_id, processed);
        }
    }

    Ok(inserted)
}

/// Drops in-chunk duplicates, keeping the last occurrence of each
/// identity in its original position.
fn dedup_chunk(chunk: &[NewPoint]) -> Vec<&NewPoint> {
    let mut last_index: HashMap<(i64, i64, i64, i64), usize> =
        HashMap::with_capacity(chunk.len());
    for (index, point) in chunk.iter().enumerate() {
        last_index.insert(point.dedup_key(), index);
    }
    chunk
        .iter()
        .enumerate()
        .filter(|(index, point)| last_index[&point.dedup_key()] == *index)
        .map(|(_, point)| point)
        .collect()
}

async fn insert_chunk(pool: &DbPool, points: &[&NewPoint]) -> Result<u64> {
    if points.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(queries::INSERT_POINTS_PREFIX);
    builder.push_values(points.iter().copied(), |mut row, point| {
        row.push_bind(point.user_id)
            .push_bind(point.latitude)
            .push_bind(point.longitude)
            .push_bind(point.timestamp)
            .push_bind(point.altitude)
            .push_bind(point.velocity.as_deref())
            .push_bind(point.battery)
            .push_bind(point.accuracy)
            .push_bind(point.tracker_id.as_deref())
            .push_bind(point.topic.as_deref())
            .push_bind(point.raw_data.as_ref())
            .push_bind(point.import_id);
    });
    builder.push(queries::INSERT_POINTS_SUFFIX);

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(latitude: f64, longitude: f64, timestamp: i64, altitude: i32) -> NewPoint {
        let mut point = NewPoint::at(1, None, latitude, longitude, timestamp);
        point.altitude = Some(altitude);
        point
    }

    #[test]
    fn test_dedup_keeps_last_occurrence() {
        let chunk = vec![
            candidate(52.52, 13.405, 100, 1),
            candidate(48.85, 2.35, 200, 2),
            candidate(52.52, 13.405, 100, 3),
        ];

        let unique = dedup_chunk(&chunk);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].timestamp, 200);
        assert_eq!(unique[1].timestamp, 100);
        // The surviving duplicate carries the attributes of the last one.
        assert_eq!(unique[1].altitude, Some(3));
    }

    #[test]
    fn test_dedup_distinguishes_seventh_decimal() {
        let chunk = vec![
            candidate(52.5200000, 13.405, 100, 1),
            candidate(52.5200001, 13.405, 100, 2),
        ];

        let unique = dedup_chunk(&chunk);
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_dedup_collapses_below_seventh_decimal() {
        let chunk = vec![
            candidate(52.52000004, 13.405, 100, 1),
            candidate(52.52000001, 13.405, 100, 2),
        ];

        let unique = dedup_chunk(&chunk);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].altitude, Some(2));
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        assert!(dedup_chunk(&[]).is_empty());
    }
}
