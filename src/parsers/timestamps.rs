use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

/// Timestamps at or above this value are taken to be in milliseconds.
/// Epoch seconds stay below it until the year 5138.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Normalizes the many timestamp spellings seen in exports to epoch seconds.
///
/// Accepts integer or float epoch values (seconds or milliseconds), numeric
/// strings, and ISO 8601 strings with or without an offset. Returns `None`
/// for anything unparseable.
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Some(normalize_epoch(int))
            } else {
                number.as_f64().map(|float| normalize_epoch(float as i64))
            }
        }
        Value::String(text) => parse_timestamp_str(text),
        _ => None,
    }
}

pub fn parse_timestamp_str(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(normalize_epoch(int));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.timestamp());
    }
    // Some exports drop the offset entirely, treat those as UTC.
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc().timestamp());
        }
    }
    None
}

fn normalize_epoch(value: i64) -> i64 {
    if value.abs() >= MILLIS_THRESHOLD {
        value / 1000
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_epoch_seconds_pass_through() {
        assert_eq!(parse_timestamp(&json!(1_709_864_690)), Some(1_709_864_690));
        assert_eq!(parse_timestamp(&json!("1709864690")), Some(1_709_864_690));
    }

    #[test]
    fn test_epoch_millis_are_scaled_down() {
        assert_eq!(
            parse_timestamp(&json!(1_709_864_690_000i64)),
            Some(1_709_864_690)
        );
        // Old Google exports carry millis as strings.
        assert_eq!(
            parse_timestamp(&json!("1374870896929")),
            Some(1_374_870_896)
        );
    }

    #[test]
    fn test_iso8601_variants() {
        assert_eq!(
            parse_timestamp(&json!("2024-04-21T10:19:55Z")),
            Some(1_713_694_795)
        );
        assert_eq!(
            parse_timestamp(&json!("2022-01-12T17:18:24.190Z")),
            Some(1_642_007_904)
        );
        assert_eq!(
            parse_timestamp(&json!("2024-04-21T12:19:55+02:00")),
            Some(1_713_694_795)
        );
        assert_eq!(
            parse_timestamp(&json!("2024-04-21T10:19:55")),
            Some(1_713_694_795)
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(parse_timestamp(&json!("not a date")), None);
        assert_eq!(parse_timestamp(&json!(null)), None);
        assert_eq!(parse_timestamp(&json!({})), None);
        assert_eq!(parse_timestamp(&json!("")), None);
    }
}
