use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::stats::YearTracked;

/// Per-user cache of the years/months summary, entries expire after the
/// configured TTL and are dropped eagerly whenever new points arrive for
/// the user.
pub struct YearsTrackedCache {
    ttl: Duration,
    entries: RwLock<HashMap<i64, CacheEntry>>,
}

struct CacheEntry {
    expires_at: Instant,
    years: Vec<YearTracked>,
}

impl YearsTrackedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, user_id: i64) -> Option<Vec<YearTracked>> {
        let entries = self.entries.read().await;
        let entry = entries.get(&user_id)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.years.clone())
    }

    pub async fn put(&self, user_id: i64, years: Vec<YearTracked>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            user_id,
            CacheEntry {
                expires_at: Instant::now() + self.ttl,
                years,
            },
        );
    }

    pub async fn invalidate(&self, user_id: i64) {
        self.entries.write().await.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_years() -> Vec<YearTracked> {
        vec![YearTracked {
            year: 2024,
            months: vec!["Jan".to_string(), "Feb".to_string()],
        }]
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = YearsTrackedCache::new(Duration::from_secs(60));
        assert!(cache.get(1).await.is_none());

        cache.put(1, sample_years()).await;
        assert_eq!(cache.get(1).await, Some(sample_years()));
        // Other users are unaffected.
        assert!(cache.get(2).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_drops_entry() {
        let cache = YearsTrackedCache::new(Duration::from_secs(60));
        cache.put(1, sample_years()).await;
        cache.invalidate(1).await;
        assert!(cache.get(1).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses() {
        let cache = YearsTrackedCache::new(Duration::ZERO);
        cache.put(1, sample_years()).await;
        assert!(cache.get(1).await.is_none());
    }
}
