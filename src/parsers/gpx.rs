use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gpx::{Gpx, Waypoint};
use tracing::warn;
use uuid::Uuid;

use crate::distance::haversine_meters;
use crate::models::point::NewPoint;

/// Parses a GPX document, walking tracks, segments and track points.
///
/// Track points without a `<time>` element are skipped. Velocity is taken
/// from the point's own speed field when present, otherwise derived from
/// the distance and elapsed time to the previous point of the same
/// segment, in meters per second with one decimal.
pub fn parse(user_id: i64, import_id: Option<Uuid>, raw: &str) -> Result<Vec<NewPoint>> {
    let document: Gpx = gpx::read(raw.as_bytes()).context("failed to parse GPX document")?;

    let mut points = Vec::new();
    for track in &document.tracks {
        for segment in &track.segments {
            let mut previous: Option<(f64, f64, i64)> = None;
            for waypoint in &segment.points {
                let coordinates = waypoint.point();
                let (latitude, longitude) = (coordinates.y(), coordinates.x());

                let Some(timestamp) = waypoint_timestamp(waypoint) else {
                    warn!("Skipping GPX track point without timestamp");
                    continue;
                };

                let speed = waypoint
                    .speed
                    .or_else(|| derived_speed(previous, latitude, longitude, timestamp));

                let mut point = NewPoint::at(user_id, import_id, latitude, longitude, timestamp);
                point.altitude = waypoint.elevation.map(|meters| meters.round() as i32);
                point.velocity = speed.map(|mps| format!("{:.1}", mps));
                points.push(point);

                previous = Some((latitude, longitude, timestamp));
            }
        }
    }
    Ok(points)
}

fn waypoint_timestamp(waypoint: &Waypoint) -> Option<i64> {
    let formatted = waypoint.time.as_ref()?.format().ok()?;
    formatted
        .parse::<DateTime<Utc>>()
        .ok()
        .map(|datetime| datetime.timestamp())
}

fn derived_speed(
    previous: Option<(f64, f64, i64)>,
    latitude: f64,
    longitude: f64,
    timestamp: i64,
) -> Option<f64> {
    let (prev_lat, prev_lon, prev_ts) = previous?;
    let elapsed = timestamp - prev_ts;
    if elapsed <= 0 {
        return None;
    }
    Some(haversine_meters(prev_lat, prev_lon, latitude, longitude) / elapsed as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_track_points_with_derived_velocity() {
        let raw = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="tracklog-test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Morning ride</name>
    <trkseg>
      <trkpt lat="0.0" lon="13.0">
        <ele>1066.0</ele>
        <time>2024-04-21T10:19:55Z</time>
      </trkpt>
      <trkpt lat="0.0" lon="13.001">
        <ele>1067.2</ele>
        <time>2024-04-21T10:20:05Z</time>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;

        let points = parse(9, None, raw).unwrap();
        assert_eq!(points.len(), 2);

        assert_eq!(points[0].latitude, 0.0);
        assert_eq!(points[0].longitude, 13.0);
        assert_eq!(points[0].timestamp, 1_713_694_795);
        assert_eq!(points[0].altitude, Some(1066));
        assert_eq!(points[0].velocity, None);
        assert_eq!(points[0].user_id, 9);

        // 0.001 degrees of longitude at the equator in 10 seconds.
        assert_eq!(points[1].timestamp, 1_713_694_805);
        assert_eq!(points[1].altitude, Some(1067));
        assert_eq!(points[1].velocity, Some("11.1".to_string()));
    }

    #[test]
    fn test_velocity_does_not_cross_segments() {
        let raw = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="tracklog-test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="10.0" lon="20.0"><time>2024-04-21T10:00:00Z</time></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="10.5" lon="20.5"><time>2024-04-21T10:00:30Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

        let points = parse(1, None, raw).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].velocity, None);
    }

    #[test]
    fn test_skips_points_without_time() {
        let raw = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="tracklog-test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="10.0" lon="20.0"></trkpt>
      <trkpt lat="10.1" lon="20.1"><time>2024-04-21T10:00:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

        let points = parse(1, None, raw).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].latitude, 10.1);
    }

    #[test]
    fn test_empty_track_yields_no_points() {
        let raw = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="tracklog-test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg></trkseg></trk>
</gpx>"#;

        assert!(parse(1, None, raw).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_invalid_xml() {
        assert!(parse(1, None, "not xml at all").is_err());
    }
}
