use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Point {
    pub id: i64,
    pub user_id: i64,
    pub latitude: f64,  // DDL says float8
    pub longitude: f64, // DDL says float8
    pub timestamp: i64, // epoch seconds
    pub altitude: Option<i32>,
    pub velocity: Option<String>, // trackers send "18" or "2.9", keep verbatim
    pub battery: Option<i32>,
    pub accuracy: Option<i32>,
    pub tracker_id: Option<String>,
    pub topic: Option<String>,
    pub raw_data: Option<Json<Value>>,
    pub import_id: Option<Uuid>, // NULL for live tracker submissions
    pub country: Option<String>,
    pub city: Option<String>,
    pub reverse_geocoded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Candidate point produced by a format parser, not yet persisted.
#[derive(Debug, Clone)]
pub struct NewPoint {
    pub user_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: i64,
    pub altitude: Option<i32>,
    pub velocity: Option<String>,
    pub battery: Option<i32>,
    pub accuracy: Option<i32>,
    pub tracker_id: Option<String>,
    pub topic: Option<String>,
    pub raw_data: Option<Value>,
    pub import_id: Option<Uuid>,
}

impl NewPoint {
    pub fn at(
        user_id: i64,
        import_id: Option<Uuid>,
        latitude: f64,
        longitude: f64,
        timestamp: i64,
    ) -> Self {
        Self {
            user_id,
            latitude,
            longitude,
            timestamp,
            altitude: None,
            velocity: None,
            battery: None,
            accuracy: None,
            tracker_id: None,
            topic: None,
            raw_data: None,
            import_id,
        }
    }

    /// Identity of a fix for dedup purposes. Coordinates are compared at
    /// 7 decimal places, which is the same precision the unique index sees.
    pub fn dedup_key(&self) -> (i64, i64, i64, i64) {
        (
            (self.latitude * 10_000_000.0).round() as i64,
            (self.longitude * 10_000_000.0).round() as i64,
            self.timestamp,
            self.user_id,
        )
    }
}

/// Slim projection of a point used by the aggregation queries.
#[derive(Debug, Clone, FromRow)]
pub struct TrackedPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: i64,
    pub city: Option<String>,
    pub country: Option<String>,
}
