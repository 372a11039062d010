use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::import::{Import, ImportSource};
use crate::models::point::NewPoint;

pub mod geojson;
pub mod google_phone;
pub mod google_records;
pub mod google_semantic;
pub mod gpx;
pub mod owntracks;
pub mod photos;
pub mod timestamps;

/// Google exports encode coordinates as degrees times 1e7.
pub(crate) const E7_SCALE: f64 = 10_000_000.0;

/// Runs the parser selected by the import's source discriminator over its
/// stored payload and returns the candidate points, oldest first as they
/// appear in the file.
pub fn parse_import(import: &Import) -> Result<Vec<NewPoint>> {
    let source = import.source_kind()?;
    let user_id = import.user_id;
    let import_id = Some(import.id);
    let json = || -> Result<Value> {
        serde_json::from_str(&import.raw_data)
            .with_context(|| format!("import {} payload is not valid JSON", import.id))
    };

    match source {
        ImportSource::GoogleSemanticHistory => google_semantic::parse(user_id, import_id, &json()?),
        ImportSource::GooglePhoneTakeout => google_phone::parse(user_id, import_id, &json()?),
        ImportSource::GoogleRecords => google_records::parse(user_id, import_id, &json()?),
        ImportSource::Owntracks => owntracks::parse(user_id, import_id, &json()?),
        ImportSource::Gpx => gpx::parse(user_id, import_id, &import.raw_data),
        ImportSource::Geojson => geojson::parse(user_id, import_id, &json()?),
        ImportSource::ImmichApi => {
            photos::parse(user_id, import_id, &json()?, photos::PhotoSource::Immich)
        }
        ImportSource::PhotoprismApi => {
            photos::parse(user_id, import_id, &json()?, photos::PhotoSource::Photoprism)
        }
    }
}

/// Reads an integer-ish JSON field, tolerating floats and numeric strings.
pub(crate) fn int_field(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.round() as i64))
            .map(|int| int as i32),
        Value::String(text) => text.trim().parse::<i32>().ok(),
        _ => None,
    }
}

/// Velocity fields arrive as numbers or strings depending on the tracker.
/// Stored verbatim when a string, otherwise rendered without a trailing
/// `.0` for whole numbers.
pub(crate) fn number_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

pub(crate) fn f64_string(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_field_tolerates_spellings() {
        assert_eq!(int_field(&json!(42)), Some(42));
        assert_eq!(int_field(&json!(41.7)), Some(42));
        assert_eq!(int_field(&json!("88")), Some(88));
        assert_eq!(int_field(&json!("x")), None);
        assert_eq!(int_field(&json!(null)), None);
    }

    #[test]
    fn test_number_string_keeps_tracker_values_verbatim() {
        assert_eq!(number_string(&json!(18)), Some("18".to_string()));
        assert_eq!(number_string(&json!(2.5)), Some("2.5".to_string()));
        assert_eq!(number_string(&json!("2.9")), Some("2.9".to_string()));
        assert_eq!(number_string(&json!("")), None);
        assert_eq!(number_string(&json!([])), None);
    }

    #[test]
    fn test_f64_string_drops_trailing_zero() {
        assert_eq!(f64_string(3.0), "3");
        assert_eq!(f64_string(2.5), "2.5");
    }
}
