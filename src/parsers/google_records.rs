use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::models::point::NewPoint;
use crate::parsers::{f64_string, timestamps, E7_SCALE};

/// Provenance markers stamped on every point from a Records.json export.
pub const RECORDS_TOPIC: &str = "Google Maps Timeline Export";
pub const RECORDS_TRACKER_ID: &str = "google-maps-timeline-export";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordEntry {
    latitude_e7: i64,
    longitude_e7: i64,
    timestamp: Option<Value>,
    timestamp_ms: Option<Value>,
    altitude: Option<f64>,
    velocity: Option<f64>,
    accuracy: Option<f64>,
}

/// Parses a Google "Records.json" takeout, either the whole file object
/// with its `locations` array or the array itself. Coordinates are E7
/// integers, timestamps appear as ISO strings in newer exports and as
/// millisecond strings (`timestampMs`) in older ones.
pub fn parse(user_id: i64, import_id: Option<Uuid>, raw: &Value) -> Result<Vec<NewPoint>> {
    let locations = raw
        .get("locations")
        .and_then(Value::as_array)
        .or_else(|| raw.as_array())
        .context("Records export has no locations array")?;

    let mut points = Vec::with_capacity(locations.len());
    for value in locations {
        let record: RecordEntry = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(error) => {
                warn!("Skipping malformed Records entry: {}", error);
                continue;
            }
        };

        let timestamp = record
            .timestamp
            .as_ref()
            .and_then(timestamps::parse_timestamp)
            .or_else(|| {
                record
                    .timestamp_ms
                    .as_ref()
                    .and_then(timestamps::parse_timestamp)
            });
        let Some(timestamp) = timestamp else {
            warn!("Skipping Records entry without usable timestamp");
            continue;
        };

        let mut point = NewPoint::at(
            user_id,
            import_id,
            record.latitude_e7 as f64 / E7_SCALE,
            record.longitude_e7 as f64 / E7_SCALE,
            timestamp,
        );
        point.altitude = record.altitude.map(|altitude| altitude.round() as i32);
        point.velocity = record.velocity.map(f64_string);
        point.accuracy = record.accuracy.map(|accuracy| accuracy.round() as i32);
        point.tracker_id = Some(RECORDS_TRACKER_ID.to_string());
        point.topic = Some(RECORDS_TOPIC.to_string());
        point.raw_data = Some(value.clone());
        points.push(point);
    }

    Ok(points)
}
