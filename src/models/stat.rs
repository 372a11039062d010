use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Day-of-month paired with the distance covered that day, already rounded
/// to two decimals. Serialized as `[day, distance]` in JSONB.
pub type DailyDistance = (u32, f64);

/// One aggregated month for a user. UNIQUE (user_id, year, month).
#[derive(Debug, Clone, FromRow)]
pub struct Stat {
    pub id: i64,
    pub user_id: i64,
    pub year: i32,
    pub month: i32,
    pub distance: f64, // monthly total in the configured unit
    pub daily_distance: Json<Vec<DailyDistance>>,
    pub toponyms: Json<Vec<Toponym>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A country visited in a month together with the cities seen there.
/// JSONB shape: `[{"country": "...", "cities": [{"city": "..."}]}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toponym {
    pub country: String,
    pub cities: Vec<CityVisit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityVisit {
    pub city: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toponym_json_shape() {
        let toponyms = vec![Toponym {
            country: "Germany".to_string(),
            cities: vec![CityVisit {
                city: "Berlin".to_string(),
            }],
        }];
        let json = serde_json::to_value(&toponyms).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"country": "Germany", "cities": [{"city": "Berlin"}]}])
        );
    }

    #[test]
    fn test_daily_distance_json_shape() {
        let daily: Vec<DailyDistance> = vec![(1, 0.0), (2, 13.5)];
        let json = serde_json::to_value(&daily).unwrap();
        assert_eq!(json, serde_json::json!([[1, 0.0], [2, 13.5]]));
    }
}
