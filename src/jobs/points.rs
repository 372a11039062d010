use anyhow::Result;
use serde_json::Value;

use crate::cache::YearsTrackedCache;
use crate::db::{queries, DbPool};
use crate::models::point::{NewPoint, Point};
use crate::parsers;
use crate::progress::NullProgress;
use crate::writer;

/// Stores a live OwnTracks submission (single message or array) for the
/// user. Returns the number of new points written.
pub async fn create_owntracks_points(
    pool: &DbPool,
    cache: &YearsTrackedCache,
    user_id: i64,
    payload: &Value,
) -> Result<u64> {
    let candidates = parsers::owntracks::parse(user_id, None, payload)?;
    persist(pool, cache, user_id, candidates).await
}

/// Stores a batch of GeoJSON features posted by a tracker app.
pub async fn create_batch(
    pool: &DbPool,
    cache: &YearsTrackedCache,
    user_id: i64,
    payload: &Value,
) -> Result<u64> {
    let candidates = parsers::geojson::parse(user_id, None, payload)?;
    persist(pool, cache, user_id, candidates).await
}

/// Writes the reverse-geocoding result for one point. The lookup itself
/// happens in an external service, this is the only column write it gets.
pub async fn mark_reverse_geocoded(
    pool: &DbPool,
    point_id: i64,
    country: Option<&str>,
    city: Option<&str>,
) -> Result<()> {
    sqlx::query(queries::UPDATE_POINT_GEOCODING)
        .bind(point_id)
        .bind(country)
        .bind(city)
        .execute(pool)
        .await?;
    Ok(())
}

/// Full point rows for a user in an inclusive epoch range, oldest first.
pub async fn points_in_range(
    pool: &DbPool,
    user_id: i64,
    from: i64,
    to: i64,
) -> Result<Vec<Point>> {
    let points = sqlx::query_as::<_, Point>(queries::SELECT_POINTS_RANGE)
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;
    Ok(points)
}

async fn persist(
    pool: &DbPool,
    cache: &YearsTrackedCache,
    user_id: i64,
    candidates: Vec<NewPoint>,
) -> Result<u64> {
    let inserted = writer::write_points(pool, &NullProgress, None, candidates).await?;
    if inserted > 0 {
        cache.invalidate(user_id).await;
    }
    Ok(inserted)
}
