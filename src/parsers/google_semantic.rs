use anyhow::{Context, Result};
use serde_json::Value;
use uuid::Uuid;

use crate::models::point::NewPoint;
use crate::parsers::{timestamps, E7_SCALE};

/// Parses a Google Semantic Location History file (one month per file,
/// `{"timelineObjects": [...]}`).
///
/// Activity segments contribute their start and end fixes plus any
/// waypoint-path and simplified-raw-path samples, place visits contribute
/// the visited location at the visit's start time. Both generations of the
/// format are handled, ISO timestamps as well as the older millisecond
/// fields. Pieces with missing coordinates or times are skipped silently,
/// partial objects are the norm in these exports.
pub fn parse(user_id: i64, import_id: Option<Uuid>, raw: &Value) -> Result<Vec<NewPoint>> {
    let objects = raw
        .get("timelineObjects")
        .and_then(Value::as_array)
        .context("semantic history export has no timelineObjects array")?;

    let mut points = Vec::new();
    for object in objects {
        if let Some(segment) = object.get("activitySegment") {
            collect_activity_segment(user_id, import_id, object, segment, &mut points);
        }
        if let Some(visit) = object.get("placeVisit") {
            collect_place_visit(user_id, import_id, object, visit, &mut points);
        }
    }
    Ok(points)
}

fn collect_activity_segment(
    user_id: i64,
    import_id: Option<Uuid>,
    object: &Value,
    segment: &Value,
    points: &mut Vec<NewPoint>,
) {
    let duration = segment.get("duration");
    let start_ts = duration.and_then(|d| duration_bound(d, "startTimestamp", "startTimestampMs"));
    let end_ts = duration.and_then(|d| duration_bound(d, "endTimestamp", "endTimestampMs"));

    if let (Some((lat, lon)), Some(ts)) = (
        segment
            .get("startLocation")
            .and_then(|l| e7_pair(l, "latitudeE7", "longitudeE7")),
        start_ts,
    ) {
        points.push(raw_point(user_id, import_id, object, lat, lon, ts));
    }

    if let (Some(waypoints), Some(ts)) = (
        segment
            .get("waypointPath")
            .and_then(|p| p.get("waypoints"))
            .and_then(Value::as_array),
        start_ts,
    ) {
        for waypoint in waypoints {
            if let Some((lat, lon)) = e7_pair(waypoint, "latE7", "lngE7") {
                points.push(raw_point(user_id, import_id, object, lat, lon, ts));
            }
        }
    }

    if let Some(samples) = segment
        .get("simplifiedRawPath")
        .and_then(|p| p.get("points"))
        .and_then(Value::as_array)
    {
        for sample in samples {
            let ts = sample
                .get("timestampMs")
                .and_then(timestamps::parse_timestamp)
                .or_else(|| sample.get("timestamp").and_then(timestamps::parse_timestamp));
            if let (Some((lat, lon)), Some(ts)) = (e7_pair(sample, "latE7", "lngE7"), ts) {
                points.push(raw_point(user_id, import_id, object, lat, lon, ts));
            }
        }
    }

    if let (Some((lat, lon)), Some(ts)) = (
        segment
            .get("endLocation")
            .and_then(|l| e7_pair(l, "latitudeE7", "longitudeE7")),
        end_ts,
    ) {
        points.push(raw_point(user_id, import_id, object, lat, lon, ts));
    }
}

fn collect_place_visit(
    user_id: i64,
    import_id: Option<Uuid>,
    object: &Value,
    visit: &Value,
    points: &mut Vec<NewPoint>,
) {
    let coordinates = visit
        .get("location")
        .and_then(|l| e7_pair(l, "latitudeE7", "longitudeE7"));
    let ts = visit
        .get("duration")
        .and_then(|d| duration_bound(d, "startTimestamp", "startTimestampMs"));
    if let (Some((lat, lon)), Some(ts)) = (coordinates, ts) {
        points.push(raw_point(user_id, import_id, object, lat, lon, ts));
    }
}

fn raw_point(
    user_id: i64,
    import_id: Option<Uuid>,
    object: &Value,
    latitude: f64,
    longitude: f64,
    timestamp: i64,
) -> NewPoint {
    let mut point = NewPoint::at(user_id, import_id, latitude, longitude, timestamp);
    point.raw_data = Some(object.clone());
    point
}

fn duration_bound(duration: &Value, iso_key: &str, millis_key: &str) -> Option<i64> {
    duration
        .get(iso_key)
        .and_then(timestamps::parse_timestamp)
        .or_else(|| duration.get(millis_key).and_then(timestamps::parse_timestamp))
}

fn e7_pair(value: &Value, lat_key: &str, lng_key: &str) -> Option<(f64, f64)> {
    let lat = value.get(lat_key).and_then(Value::as_i64)?;
    let lng = value.get(lng_key).and_then(Value::as_i64)?;
    Some((lat as f64 / E7_SCALE, lng as f64 / E7_SCALE))
}
