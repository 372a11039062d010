use geo::{Distance, Haversine, Point};
use strum::{Display, EnumString};

use crate::models::point::TrackedPoint;

pub const METERS_PER_KM: f64 = 1000.0;
pub const METERS_PER_MILE: f64 = 1609.344;

/// Unit every distance figure is reported in. Parsed from the
/// `DISTANCE_UNIT` setting ("km" or "mi").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DistanceUnit {
    #[default]
    Km,
    Mi,
}

impl DistanceUnit {
    pub fn from_meters(self, meters: f64) -> f64 {
        match self {
            DistanceUnit::Km => meters / METERS_PER_KM,
            DistanceUnit::Mi => meters / METERS_PER_MILE,
        }
    }
}

/// Great-circle distance in meters between two WGS84 coordinates.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Haversine::distance(Point::new(lon1, lat1), Point::new(lon2, lat2))
}

/// Distance between two stored points in the configured unit.
pub fn distance_between(from: &TrackedPoint, to: &TrackedPoint, unit: DistanceUnit) -> f64 {
    unit.from_meters(haversine_meters(
        from.latitude,
        from.longitude,
        to.latitude,
        to.longitude,
    ))
}

/// Length of a track as the sum of consecutive-pair distances. Fewer than
/// two points means no movement.
pub fn track_distance(points: &[TrackedPoint], unit: DistanceUnit) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .windows(2)
        .map(|pair| distance_between(&pair[0], &pair[1], unit))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(latitude: f64, longitude: f64, timestamp: i64) -> TrackedPoint {
        TrackedPoint {
            latitude,
            longitude,
            timestamp,
            city: None,
            country: None,
        }
    }

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_london_to_paris() {
        // London to Paris is approximately 344 km.
        let meters = haversine_meters(51.5074, -0.1278, 48.8566, 2.3522);
        assert!(approx_eq(meters, 343_560.0, 5_000.0));
    }

    #[test]
    fn test_unit_conversion() {
        let london = tracked(51.5074, -0.1278, 0);
        let paris = tracked(48.8566, 2.3522, 3600);
        let km = distance_between(&london, &paris, DistanceUnit::Km);
        let mi = distance_between(&london, &paris, DistanceUnit::Mi);
        assert!(approx_eq(km, 343.56, 5.0));
        assert!(approx_eq(km / mi, METERS_PER_MILE / METERS_PER_KM, 0.0001));
    }

    #[test]
    fn test_track_distance_sums_consecutive_pairs() {
        let track = vec![
            tracked(51.5074, -0.1278, 0),
            tracked(51.5080, -0.1290, 60),
            tracked(51.5090, -0.1300, 120),
        ];
        let length = track_distance(&track, DistanceUnit::Km);
        let manual = distance_between(&track[0], &track[1], DistanceUnit::Km)
            + distance_between(&track[1], &track[2], DistanceUnit::Km);
        assert!(approx_eq(length, manual, 1e-12));
        assert!(length > 0.0);
    }

    #[test]
    fn test_track_distance_degenerate_tracks() {
        assert_eq!(track_distance(&[], DistanceUnit::Km), 0.0);
        assert_eq!(
            track_distance(&[tracked(51.5, -0.1, 0)], DistanceUnit::Mi),
            0.0
        );
    }

    #[test]
    fn test_distance_unit_parsing() {
        assert_eq!("km".parse::<DistanceUnit>().unwrap(), DistanceUnit::Km);
        assert_eq!("mi".parse::<DistanceUnit>().unwrap(), DistanceUnit::Mi);
        assert!("leagues".parse::<DistanceUnit>().is_err());
        assert_eq!(DistanceUnit::Mi.to_string(), "mi");
    }
}
