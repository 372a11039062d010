use anyhow::{bail, Result};
use geojson::Feature;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::models::point::NewPoint;
use crate::parsers::{int_field, number_string, timestamps};

/// Parses a GeoJSON payload into candidate points.
///
/// Accepts a FeatureCollection, a bare array of features, or the batch
/// shape `{"locations": [...]}` that live trackers post. Features that are
/// not points, carry no timestamp, or fail to deserialize are skipped.
pub fn parse(user_id: i64, import_id: Option<Uuid>, raw: &Value) -> Result<Vec<NewPoint>> {
    let Some(features) = feature_values(raw) else {
        bail!("payload is not a FeatureCollection, feature array or locations batch");
    };

    let mut points = Vec::with_capacity(features.len());
    for value in features {
        let feature: Feature = match serde_json::from_value(value.clone()) {
            Ok(feature) => feature,
            Err(error) => {
                warn!("Skipping invalid GeoJSON feature: {}", error);
                continue;
            }
        };

        let Some(geometry) = feature.geometry else {
            warn!("Skipping GeoJSON feature without geometry");
            continue;
        };
        let geojson::Value::Point(coordinates) = geometry.value else {
            warn!("Skipping non-point GeoJSON geometry");
            continue;
        };
        if coordinates.len() < 2 {
            warn!("Skipping GeoJSON point with incomplete coordinates");
            continue;
        }
        let (longitude, latitude) = (coordinates[0], coordinates[1]);

        let properties = feature.properties.unwrap_or_default();
        let Some(timestamp) = properties.get("timestamp").and_then(timestamps::parse_timestamp)
        else {
            warn!("Skipping GeoJSON feature without usable timestamp");
            continue;
        };

        let mut point = NewPoint::at(user_id, import_id, latitude, longitude, timestamp);
        point.altitude = properties.get("altitude").and_then(int_field);
        point.velocity = properties.get("velocity").and_then(number_string);
        point.battery = properties.get("battery").and_then(int_field);
        point.accuracy = properties.get("accuracy").and_then(int_field);
        point.tracker_id = properties
            .get("tracker_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        point.topic = properties
            .get("topic")
            .and_then(Value::as_str)
            .map(str::to_string);
        point.raw_data = Some(value.clone());
        points.push(point);
    }

    Ok(points)
}

fn feature_values(raw: &Value) -> Option<&Vec<Value>> {
    if let Some(array) = raw.as_array() {
        return Some(array);
    }
    if let Some(array) = raw.get("features").and_then(Value::as_array) {
        return Some(array);
    }
    // Batch submissions wrap features in a "locations" array.
    raw.get("locations").and_then(Value::as_array)
}
