use anyhow::{bail, Result};
use serde_json::Value;
use uuid::Uuid;

use crate::models::point::NewPoint;
use crate::parsers::{f64_string, timestamps};

/// Parses the phone-generated Google Timeline export.
///
/// Two layouts exist: the on-device "location-history.json" is a bare
/// array of semantic segments, the Takeout variant wraps them in
/// `{"semanticSegments": [...], "rawSignals": [...]}`. Coordinates come as
/// `"48.1234567°, 11.5891011°"` strings or `geo:` URIs, sometimes nested
/// under a `latLng` key.
pub fn parse(user_id: i64, import_id: Option<Uuid>, raw: &Value) -> Result<Vec<NewPoint>> {
    let segments = raw
        .get("semanticSegments")
        .and_then(Value::as_array)
        .or_else(|| raw.as_array());
    let signals = raw.get("rawSignals").and_then(Value::as_array);

    if segments.is_none() && signals.is_none() {
        bail!("unrecognized phone takeout export, expected semanticSegments or rawSignals");
    }

    let mut points = Vec::new();
    for segment in segments.into_iter().flatten() {
        collect_segment(user_id, import_id, segment, &mut points);
    }
    for signal in signals.into_iter().flatten() {
        collect_raw_signal(user_id, import_id, signal, &mut points);
    }
    Ok(points)
}

fn collect_segment(user_id: i64, import_id: Option<Uuid>, segment: &Value, points: &mut Vec<NewPoint>) {
    let start_ts = segment.get("startTime").and_then(timestamps::parse_timestamp);
    let end_ts = segment.get("endTime").and_then(timestamps::parse_timestamp);

    if let Some(path) = segment.get("timelinePath").and_then(Value::as_array) {
        for entry in path {
            let Some((lat, lon)) = entry.get("point").and_then(latlng_of) else {
                continue;
            };
            let ts = entry
                .get("time")
                .and_then(timestamps::parse_timestamp)
                .or_else(|| offset_timestamp(start_ts, entry));
            if let Some(ts) = ts {
                points.push(raw_point(user_id, import_id, segment, lat, lon, ts));
            }
        }
    }

    if let (Some((lat, lon)), Some(ts)) = (
        segment
            .get("visit")
            .and_then(|visit| visit.get("topCandidate"))
            .and_then(|candidate| candidate.get("placeLocation"))
            .and_then(latlng_of),
        start_ts,
    ) {
        points.push(raw_point(user_id, import_id, segment, lat, lon, ts));
    }

    if let Some(activity) = segment.get("activity") {
        if let (Some((lat, lon)), Some(ts)) = (activity.get("start").and_then(latlng_of), start_ts)
        {
            points.push(raw_point(user_id, import_id, segment, lat, lon, ts));
        }
        if let (Some((lat, lon)), Some(ts)) = (activity.get("end").and_then(latlng_of), end_ts) {
            points.push(raw_point(user_id, import_id, segment, lat, lon, ts));
        }
    }
}

fn collect_raw_signal(
    user_id: i64,
    import_id: Option<Uuid>,
    signal: &Value,
    points: &mut Vec<NewPoint>,
) {
    let Some(position) = signal.get("position") else {
        return;
    };
    let coordinates = position
        .get("LatLng")
        .and_then(latlng_of)
        .or_else(|| position.get("latLng").and_then(latlng_of));
    let ts = position.get("timestamp").and_then(timestamps::parse_timestamp);
    let (Some((lat, lon)), Some(ts)) = (coordinates, ts) else {
        return;
    };

    let mut point = raw_point(user_id, import_id, signal, lat, lon, ts);
    point.altitude = position
        .get("altitudeMeters")
        .and_then(Value::as_f64)
        .map(|meters| meters.round() as i32);
    point.velocity = position
        .get("speedMetersPerSecond")
        .and_then(Value::as_f64)
        .map(f64_string);
    point.accuracy = position
        .get("accuracyMeters")
        .and_then(Value::as_f64)
        .map(|meters| meters.round() as i32);
    points.push(point);
}

fn raw_point(
    user_id: i64,
    import_id: Option<Uuid>,
    source: &Value,
    latitude: f64,
    longitude: f64,
    timestamp: i64,
) -> NewPoint {
    let mut point = NewPoint::at(user_id, import_id, latitude, longitude, timestamp);
    point.raw_data = Some(source.clone());
    point
}

fn offset_timestamp(start_ts: Option<i64>, entry: &Value) -> Option<i64> {
    let offset = entry.get("durationMinutesOffsetFromStartTime")?;
    let minutes = match offset {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    Some(start_ts? + minutes * 60)
}

/// Accepts `"48.12°, 11.58°"`, `"geo:48.12,11.58"` and objects wrapping
/// either form under a `latLng` key.
fn latlng_of(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::String(text) => parse_coordinate_pair(text),
        Value::Object(_) => value
            .get("latLng")
            .or_else(|| value.get("LatLng"))
            .and_then(Value::as_str)
            .and_then(parse_coordinate_pair),
        _ => None,
    }
}

fn parse_coordinate_pair(text: &str) -> Option<(f64, f64)> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix("geo:").unwrap_or(trimmed);
    let (lat_text, lon_text) = trimmed.split_once(',')?;
    let lat = lat_text.trim().trim_end_matches('°').parse::<f64>().ok()?;
    let lon = lon_text.trim().trim_end_matches('°').parse::<f64>().ok()?;
    Some((lat, lon))
}
