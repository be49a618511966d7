use serde::Deserialize;
use std::time::Duration;

/// Cache sizing and freshness policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum retained datasets before the oldest insertion is evicted.
    pub max_entries: usize,
    /// Ceiling age for serving an entry as a stale fallback.
    #[serde(with = "wind_serde_millis")]
    pub stale_max_age: Duration,
    /// Age under which a manual refresh is satisfied from cache.
    #[serde(with = "wind_serde_millis")]
    pub manual_refresh_fresh: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 24,
            stale_max_age: Duration::from_secs(2 * 60 * 60),
            manual_refresh_fresh: Duration::from_secs(10 * 60),
        }
    }
}

pub(crate) mod wind_serde_millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
