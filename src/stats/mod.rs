use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;
use sqlx::types::Json;
use tracing::{error, info};

use crate::cache::YearsTrackedCache;
use crate::db::{queries, DbPool};
use crate::distance::{distance_between, DistanceUnit};
use crate::models::notification::NotificationKind;
use crate::models::point::TrackedPoint;
use crate::models::stat::{DailyDistance, Toponym};
use crate::notify;

pub mod toponyms;

/// One year of tracked data with the months that have points, newest
/// year first, months in calendar order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearTracked {
    pub year: i32,
    pub months: Vec<String>,
}

/// Recomputes and stores the stats row for one (user, year, month).
///
/// A month without points is a no-op, any existing row for it stays
/// untouched. Errors are logged and surfaced to the user as an error
/// notification instead of propagating, one broken month must not sink
/// the batch it is part of.
pub async fn calculate_month(
    pool: &DbPool,
    unit: DistanceUnit,
    user_id: i64,
    year: i32,
    month: u32,
) -> Result<()> {
    match compute_and_store(pool, unit, user_id, year, month).await {
        Ok(true) => {
            info!("Updated stats for user {} {}-{:02}", user_id, year, month);
            Ok(())
        }
        Ok(false) => Ok(()),
        Err(error) => {
            error!(
                "Stats update failed for user {} {}-{:02}: {:?}",
                user_id, year, month, error
            );
            notify::create(
                pool,
                user_id,
                NotificationKind::Error,
                "Stats update failed",
                &format!("Updating stats for {year}-{month:02} failed: {error:#}"),
            )
            .await
        }
    }
}

/// Recomputes every month the user has points in.
pub async fn bulk_calculate(pool: &DbPool, unit: DistanceUnit, user_id: i64) -> Result<()> {
    let months: Vec<(i32, i32)> = sqlx::query_as(queries::SELECT_TRACKED_MONTHS)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    let updates = months
        .iter()
        .map(|(year, month)| calculate_month(pool, unit, user_id, *year, *month as u32));
    for result in join_all(updates).await {
        result?;
    }
    Ok(())
}

async fn compute_and_store(
    pool: &DbPool,
    unit: DistanceUnit,
    user_id: i64,
    year: i32,
    month: u32,
) -> Result<bool> {
    let (month_start, month_end) = month_bounds(year, month)?;
    let points: Vec<TrackedPoint> = sqlx::query_as(queries::SELECT_MONTH_TRACKED_POINTS)
        .bind(user_id)
        .bind(month_start)
        .bind(month_end)
        .fetch_all(pool)
        .await?;
    if points.is_empty() {
        return Ok(false);
    }

    let (daily, raw_total) = daily_distances(&points, year, month, unit)?;
    let toponyms = toponyms::countries_and_cities(&points);

    sqlx::query(queries::UPSERT_STAT)
        .bind(user_id)
        .bind(year)
        .bind(month as i32)
        .bind(round1(raw_total))
        .bind(Json(daily))
        .bind(Json(toponyms))
        .execute(pool)
        .await?;
    Ok(true)
}

/// Per-day distance series for one month, plus the unrounded month total.
///
/// Every calendar day of the month gets an entry, days without movement
/// report 0.0. A day's distance only sums pairs where both fixes fall
/// inside that day, so a drive across midnight is never counted. Daily
/// figures are rounded to two decimals, the returned total is exact and
/// rounded once when stored.
fn daily_distances(
    points: &[TrackedPoint],
    year: i32,
    month: u32,
    unit: DistanceUnit,
) -> Result<(Vec<DailyDistance>, f64)> {
    let last_day = days_in_month(year, month)?;
    let mut daily = Vec::with_capacity(last_day as usize);
    let mut total = 0.0;

    for day in 1..=last_day {
        let (day_start, day_end) = day_bounds(year, month, day)?;
        let day_points: Vec<&TrackedPoint> = points
            .iter()
            .filter(|point| point.timestamp >= day_start && point.timestamp <= day_end)
            .collect();
        let distance: f64 = day_points
            .windows(2)
            .map(|pair| distance_between(pair[0], pair[1], unit))
            .sum();
        total += distance;
        daily.push((day, round2(distance)));
    }

    Ok((daily, total))
}

/// Monthly totals for a whole year, one entry per month January through
/// December, zero for months without a stats row.
pub async fn year_distance(pool: &DbPool, user_id: i64, year: i32) -> Result<Vec<(String, f64)>> {
    let rows: Vec<(i32, f64)> = sqlx::query_as(queries::SELECT_YEAR_DISTANCES)
        .bind(user_id)
        .bind(year)
        .fetch_all(pool)
        .await?;
    let by_month: HashMap<i32, f64> = rows.into_iter().collect();

    Ok((1..=12)
        .map(|month| {
            (
                month_name(month, "%B"),
                by_month.get(&month).copied().unwrap_or(0.0),
            )
        })
        .collect())
}

/// Lifetime distance across all aggregated months, in the configured unit.
pub async fn total_distance(pool: &DbPool, user_id: i64) -> Result<f64> {
    let total: f64 = sqlx::query_scalar(queries::SELECT_TOTAL_DISTANCE)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(round1(total))
}

pub async fn countries_visited(pool: &DbPool, user_id: i64) -> Result<Vec<String>> {
    let rows: Vec<Json<Vec<Toponym>>> = sqlx::query_scalar(queries::SELECT_USER_TOPONYMS)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    let mut countries = BTreeSet::new();
    for Json(toponyms) in rows {
        for toponym in toponyms {
            countries.insert(toponym.country);
        }
    }
    Ok(countries.into_iter().collect())
}

pub async fn cities_visited(pool: &DbPool, user_id: i64) -> Result<Vec<String>> {
    let rows: Vec<Json<Vec<Toponym>>> = sqlx::query_scalar(queries::SELECT_USER_TOPONYMS)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    let mut cities = BTreeSet::new();
    for Json(toponyms) in rows {
        for toponym in toponyms {
            for visit in toponym.cities {
                cities.insert(visit.city);
            }
        }
    }
    Ok(cities.into_iter().collect())
}

/// Years and months the user has data in, served from the cache when
/// fresh.
pub async fn years_tracked(
    pool: &DbPool,
    cache: &YearsTrackedCache,
    user_id: i64,
) -> Result<Vec<YearTracked>> {
    if let Some(cached) = cache.get(user_id).await {
        return Ok(cached);
    }

    let rows: Vec<(i32, i32)> = sqlx::query_as(queries::SELECT_TRACKED_MONTHS)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    // Rows come back ordered year desc, month asc.
    let mut years: Vec<YearTracked> = Vec::new();
    for (year, month) in rows {
        match years.last_mut() {
            Some(tracked) if tracked.year == year => tracked.months.push(month_name(month, "%b")),
            _ => years.push(YearTracked {
                year,
                months: vec![month_name(month, "%b")],
            }),
        }
    }

    cache.put(user_id, years.clone()).await;
    Ok(years)
}

fn month_bounds(year: i32, month: u32) -> Result<(i64, i64)> {
    let last_day = days_in_month(year, month)?;
    let (start, _) = day_bounds(year, month, 1)?;
    let (_, end) = day_bounds(year, month, last_day)?;
    Ok((start, end))
}

fn day_bounds(year: i32, month: u32, day: u32) -> Result<(i64, i64)> {
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("invalid date {year}-{month:02}-{day:02}"))?;
    let start = date
        .and_hms_opt(0, 0, 0)
        .context("failed to build start of day")?
        .and_utc()
        .timestamp();
    let end = date
        .and_hms_opt(23, 59, 59)
        .context("failed to build end of day")?
        .and_utc()
        .timestamp();
    Ok((start, end))
}

fn days_in_month(year: i32, month: u32) -> Result<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("invalid month {year}-{month:02}"))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .context("failed to compute following month")?;
    Ok(next.signed_duration_since(first).num_days() as u32)
}

fn month_name(month: i32, format: &str) -> String {
    NaiveDate::from_ymd_opt(2000, month as u32, 1)
        .map(|date| date.format(format).to_string())
        .unwrap_or_default()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(latitude: f64, longitude: f64, timestamp: i64) -> TrackedPoint {
        TrackedPoint {
            latitude,
            longitude,
            timestamp,
            city: None,
            country: None,
        }
    }

    fn ts(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> i64 {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, min, sec)
            .unwrap()
            .and_utc()
            .timestamp()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(days_in_month(2023, 2).unwrap(), 28);
        assert_eq!(days_in_month(2023, 4).unwrap(), 30);
        assert_eq!(days_in_month(2023, 12).unwrap(), 31);
        assert!(days_in_month(2023, 13).is_err());
    }

    #[test]
    fn test_month_bounds_are_inclusive_seconds() {
        let (start, end) = month_bounds(2024, 1).unwrap();
        assert_eq!(start, ts(2024, 1, 1, 0, 0, 0));
        assert_eq!(end, ts(2024, 1, 31, 23, 59, 59));
        assert_eq!(end + 1, ts(2024, 2, 1, 0, 0, 0));
    }

    #[test]
    fn test_daily_distances_cover_every_day() {
        let points = vec![
            fix(0.0, 13.0, ts(2024, 1, 5, 10, 0, 0)),
            fix(0.0, 13.001, ts(2024, 1, 5, 10, 10, 0)),
        ];

        let (daily, _) = daily_distances(&points, 2024, 1, DistanceUnit::Km).unwrap();
        assert_eq!(daily.len(), 31);
        assert_eq!(daily[0], (1, 0.0));
        // 0.001 degrees of longitude at the equator is about 111 meters.
        assert_eq!(daily[4], (5, 0.11));
        assert_eq!(daily[30], (31, 0.0));
    }

    #[test]
    fn test_midnight_crossing_is_not_counted() {
        // One fix just before midnight, the next just after. Each day has
        // a single point, so neither day accumulates distance.
        let points = vec![
            fix(52.52, 13.405, ts(2024, 1, 5, 23, 59, 30)),
            fix(52.62, 13.505, ts(2024, 1, 6, 0, 0, 30)),
        ];

        let (daily, total) = daily_distances(&points, 2024, 1, DistanceUnit::Km).unwrap();
        assert_eq!(daily[4], (5, 0.0));
        assert_eq!(daily[5], (6, 0.0));
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_total_is_unrounded_sum_of_days() {
        let points = vec![
            fix(0.0, 13.0, ts(2024, 1, 5, 10, 0, 0)),
            fix(0.0, 13.001, ts(2024, 1, 5, 10, 10, 0)),
            fix(0.0, 20.0, ts(2024, 1, 7, 9, 0, 0)),
            fix(0.0, 20.002, ts(2024, 1, 7, 9, 30, 0)),
        ];

        let (daily, total) = daily_distances(&points, 2024, 1, DistanceUnit::Km).unwrap();
        let expected_raw = distance_between(&points[0], &points[1], DistanceUnit::Km)
            + distance_between(&points[2], &points[3], DistanceUnit::Km);
        assert!((total - expected_raw).abs() < 1e-12);
        // Stored dailies are rounded, the total is not.
        assert_eq!(daily[4].1, round2(distance_between(&points[0], &points[1], DistanceUnit::Km)));
        assert_ne!(total, round2(total));
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_name(1, "%b"), "Jan");
        assert_eq!(month_name(12, "%b"), "Dec");
        assert_eq!(month_name(3, "%B"), "March");
        assert_eq!(month_name(0, "%B"), "");
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(round1(12.3456), 12.3);
        assert_eq!(round1(12.36), 12.4);
        assert_eq!(round2(0.111194), 0.11);
        assert_eq!(round2(1.005), 1.0); // 1.005 sits just below the half in binary
    }
}
