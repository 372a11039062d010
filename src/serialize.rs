use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use serde_json::json;

use crate::models::point::Point;

/// Renders stored points as a GeoJSON FeatureCollection string, one Point
/// feature per fix with the canonical attributes as properties. This is
/// the inverse of the GeoJSON parser, an exported collection imports
/// cleanly again.
pub fn points_to_geojson(points: &[Point]) -> String {
    let features = points.iter().map(feature).collect();
    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
    .to_string()
}

fn feature(point: &Point) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), json!(point.id));
    properties.insert("timestamp".to_string(), json!(point.timestamp));
    properties.insert("altitude".to_string(), json!(point.altitude));
    properties.insert("velocity".to_string(), json!(point.velocity));
    properties.insert("battery".to_string(), json!(point.battery));
    properties.insert("accuracy".to_string(), json!(point.accuracy));
    properties.insert("tracker_id".to_string(), json!(point.tracker_id));
    properties.insert("topic".to_string(), json!(point.topic));
    properties.insert("country".to_string(), json!(point.country));
    properties.insert("city".to_string(), json!(point.city));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::Point(vec![
            point.longitude,
            point.latitude,
        ]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored_point(id: i64, latitude: f64, longitude: f64, timestamp: i64) -> Point {
        Point {
            id,
            user_id: 1,
            latitude,
            longitude,
            timestamp,
            altitude: Some(30),
            velocity: Some("12.5".to_string()),
            battery: Some(80),
            accuracy: None,
            tracker_id: Some("phone-1".to_string()),
            topic: None,
            raw_data: None,
            import_id: None,
            country: Some("Germany".to_string()),
            city: Some("Berlin".to_string()),
            reverse_geocoded_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_renders_feature_collection() {
        let points = vec![
            stored_point(1, 52.52, 13.405, 1_709_864_690),
            stored_point(2, 52.53, 13.415, 1_709_864_750),
        ];

        let output = points_to_geojson(&points);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);

        // GeoJSON wants lon before lat.
        assert_eq!(features[0]["geometry"]["type"], "Point");
        assert_eq!(features[0]["geometry"]["coordinates"][0], 13.405);
        assert_eq!(features[0]["geometry"]["coordinates"][1], 52.52);
        assert_eq!(features[0]["properties"]["id"], 1);
        assert_eq!(features[0]["properties"]["timestamp"], 1_709_864_690);
        assert_eq!(features[0]["properties"]["velocity"], "12.5");
        assert_eq!(features[0]["properties"]["accuracy"], serde_json::Value::Null);
        assert_eq!(features[0]["properties"]["city"], "Berlin");
    }

    #[test]
    fn test_export_reimports_cleanly() {
        let points = vec![stored_point(1, 48.8566, 2.3522, 1_700_000_000)];
        let output = points_to_geojson(&points);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        let reimported = crate::parsers::geojson::parse(1, None, &value).unwrap();
        assert_eq!(reimported.len(), 1);
        assert_eq!(reimported[0].latitude, 48.8566);
        assert_eq!(reimported[0].longitude, 2.3522);
        assert_eq!(reimported[0].timestamp, 1_700_000_000);
        assert_eq!(reimported[0].velocity, Some("12.5".to_string()));
    }

    #[test]
    fn test_empty_collection() {
        let output = points_to_geojson(&[]);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["features"].as_array().unwrap().len(), 0);
    }
}
