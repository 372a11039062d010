use anyhow::{Context, Result};
use serde_json::Value;
use uuid::Uuid;

use crate::models::point::NewPoint;
use crate::parsers::timestamps;

/// Which photo manager produced the payload. The two APIs use different
/// field names for the same EXIF data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoSource {
    Immich,
    Photoprism,
}

/// Parses geotagged photo metadata fetched from an Immich or Photoprism
/// API into candidate points. Accepts a bare asset array or the paginated
/// wrappers `{"items": [...]}` and `{"assets": {"items": [...]}}`. Assets
/// without coordinates or capture time are skipped, as are fixes at 0/0
/// which these APIs emit for photos with no GPS data.
pub fn parse(
    user_id: i64,
    import_id: Option<Uuid>,
    raw: &Value,
    source: PhotoSource,
) -> Result<Vec<NewPoint>> {
    let assets = asset_values(raw).context("photo API payload has no asset array")?;

    let mut points = Vec::with_capacity(assets.len());
    for value in assets {
        let extracted = match source {
            PhotoSource::Immich => immich_point(user_id, import_id, value),
            PhotoSource::Photoprism => photoprism_point(user_id, import_id, value),
        };
        if let Some(point) = extracted {
            points.push(point);
        }
    }
    Ok(points)
}

fn asset_values(raw: &Value) -> Option<&Vec<Value>> {
    if let Some(array) = raw.as_array() {
        return Some(array);
    }
    if let Some(array) = raw.get("items").and_then(Value::as_array) {
        return Some(array);
    }
    raw.get("assets")
        .and_then(|assets| assets.get("items"))
        .and_then(Value::as_array)
}

fn immich_point(user_id: i64, import_id: Option<Uuid>, value: &Value) -> Option<NewPoint> {
    // Videos carry EXIF too but only photos are trustworthy fixes.
    if let Some(kind) = value.get("type").and_then(Value::as_str) {
        if kind != "IMAGE" {
            return None;
        }
    }
    let exif = value.get("exifInfo")?;
    let latitude = exif.get("latitude").and_then(Value::as_f64)?;
    let longitude = exif.get("longitude").and_then(Value::as_f64)?;
    let timestamp = exif
        .get("dateTimeOriginal")
        .and_then(timestamps::parse_timestamp)?;
    geotagged_point(user_id, import_id, value, latitude, longitude, timestamp)
}

fn photoprism_point(user_id: i64, import_id: Option<Uuid>, value: &Value) -> Option<NewPoint> {
    let latitude = value.get("Lat").and_then(Value::as_f64)?;
    let longitude = value.get("Lng").and_then(Value::as_f64)?;
    let timestamp = value.get("TakenAt").and_then(timestamps::parse_timestamp)?;
    geotagged_point(user_id, import_id, value, latitude, longitude, timestamp)
}

fn geotagged_point(
    user_id: i64,
    import_id: Option<Uuid>,
    value: &Value,
    latitude: f64,
    longitude: f64,
    timestamp: i64,
) -> Option<NewPoint> {
    if latitude == 0.0 && longitude == 0.0 {
        return None;
    }
    let mut point = NewPoint::at(user_id, import_id, latitude, longitude, timestamp);
    point.raw_data = Some(value.clone());
    Some(point)
}
