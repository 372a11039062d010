use anyhow::Result;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::models::point::NewPoint;
use crate::parsers::f64_string;

/// One OwnTracks location message. Anything without lat, lon and tst is
/// not a location (lwt, transition, card, ...) and gets skipped.
#[derive(Debug, Deserialize)]
struct OwntracksLocation {
    lat: f64,
    lon: f64,
    tst: i64, // epoch seconds
    #[serde(default, deserialize_with = "f64_or_string")]
    alt: Option<f64>,
    #[serde(default, deserialize_with = "f64_or_string")]
    vel: Option<f64>, // km/h
    #[serde(default, deserialize_with = "f64_or_string")]
    batt: Option<f64>,
    #[serde(default, deserialize_with = "f64_or_string")]
    acc: Option<f64>,
    tid: Option<String>,
    topic: Option<String>,
}

// Some OwnTracks builds quote their numeric fields.
fn f64_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(value)) => Ok(Some(value)),
        Some(NumberOrText::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed.parse().map(Some).map_err(serde::de::Error::custom)
            }
        }
        None => Ok(None),
    }
}

/// Parses an OwnTracks payload, either a single location object or an
/// array of them.
pub fn parse(user_id: i64, import_id: Option<Uuid>, raw: &Value) -> Result<Vec<NewPoint>> {
    let entries: Vec<&Value> = match raw.as_array() {
        Some(array) => array.iter().collect(),
        None => vec![raw],
    };

    let mut points = Vec::with_capacity(entries.len());
    for value in entries {
        let location: OwntracksLocation = match serde_json::from_value(value.clone()) {
            Ok(location) => location,
            Err(error) => {
                warn!("Skipping OwnTracks message without location fix: {}", error);
                continue;
            }
        };

        let mut point = NewPoint::at(
            user_id,
            import_id,
            location.lat,
            location.lon,
            location.tst,
        );
        point.altitude = location.alt.map(|meters| meters.round() as i32);
        point.velocity = location.vel.map(f64_string);
        point.battery = location.batt.map(|level| level.round() as i32);
        point.accuracy = location.acc.map(|meters| meters.round() as i32);
        point.tracker_id = location.tid;
        point.topic = location.topic;
        point.raw_data = Some(value.clone());
        points.push(point);
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_single_location() {
        let payload = json!({
            "_type": "location",
            "lat": 52.52,
            "lon": 13.405,
            "tst": 1_709_864_690,
            "alt": 36,
            "vel": 18,
            "batt": 85,
            "acc": 5,
            "tid": "A1",
            "topic": "owntracks/user/phone",
            "conn": "w"
        });

        let points = parse(6, None, &payload).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].latitude, 52.52);
        assert_eq!(points[0].longitude, 13.405);
        assert_eq!(points[0].timestamp, 1_709_864_690);
        assert_eq!(points[0].altitude, Some(36));
        assert_eq!(points[0].velocity, Some("18".to_string()));
        assert_eq!(points[0].battery, Some(85));
        assert_eq!(points[0].accuracy, Some(5));
        assert_eq!(points[0].tracker_id, Some("A1".to_string()));
        assert_eq!(points[0].topic, Some("owntracks/user/phone".to_string()));
        assert_eq!(points[0].user_id, 6);
        assert!(points[0].raw_data.is_some());
    }

    #[test]
    fn test_parses_array_and_skips_non_locations() {
        let payload = json!([
            {"_type": "lwt", "tst": 1_709_864_000},
            {"lat": 48.8566, "lon": 2.3522, "tst": 1_709_864_100},
            {"lat": 48.8570, "lon": 2.3530, "tst": 1_709_864_200, "vel": 2.5}
        ]);

        let points = parse(1, None, &payload).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, 1_709_864_100);
        assert_eq!(points[1].velocity, Some("2.5".to_string()));
    }

    #[test]
    fn test_quoted_numeric_fields() {
        let payload = json!({
            "lat": 52.52,
            "lon": 13.405,
            "tst": 1_709_864_690,
            "vel": "18",
            "batt": "85",
            "acc": ""
        });

        let points = parse(1, None, &payload).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].velocity, Some("18".to_string()));
        assert_eq!(points[0].battery, Some(85));
        assert_eq!(points[0].accuracy, None);
    }

    #[test]
    fn test_single_non_location_yields_empty() {
        let payload = json!({"_type": "cmd", "action": "reportLocation"});
        let points = parse(1, None, &payload).unwrap();
        assert!(points.is_empty());
    }
}
