use std::collections::{BTreeMap, BTreeSet};

use crate::models::point::TrackedPoint;
use crate::models::stat::{CityVisit, Toponym};

/// Rolls reverse-geocoded places up into one entry per country with the
/// distinct cities seen there, both alphabetically ordered. Points
/// without a country are left out. A country whose points carry no city
/// yields an empty city list.
pub fn countries_and_cities(points: &[TrackedPoint]) -> Vec<Toponym> {
    let mut countries: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for point in points {
        let Some(country) = point.country.as_deref().filter(|name| !name.is_empty()) else {
            continue;
        };
        let cities = countries.entry(country).or_default();
        if let Some(city) = point.city.as_deref().filter(|name| !name.is_empty()) {
            cities.insert(city);
        }
    }

    countries
        .into_iter()
        .map(|(country, cities)| Toponym {
            country: country.to_string(),
            cities: cities
                .into_iter()
                .map(|city| CityVisit {
                    city: city.to_string(),
                })
                .collect(),
        })
        .collect()
}
