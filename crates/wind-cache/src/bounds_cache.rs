//! Bounded FIFO cache of fetched datasets keyed by quantized viewport
//! bounds.
//!
//! Eviction is by insertion order, not recency of access: re-storing
//! an existing key replaces the payload in place without refreshing
//! its eviction position, so a viewport the user keeps returning to
//! still ages out once enough distinct viewports have been visited.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::debug;
use wind_common::{GeoBounds, GeoMode, GridSize, SamplePoint, WindSeries};

use crate::config::CacheConfig;

/// A cached dataset for one quantized viewport.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub mode: GeoMode,
    pub bounds: GeoBounds,
    pub grid: GridSize,
    pub samples: Vec<SamplePoint>,
    pub series: WindSeries,
    pub fetched_at: Instant,
}

impl CacheEntry {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }

    /// Whether this entry may still serve as a stale fallback.
    pub fn usable_at(&self, now: Instant, config: &CacheConfig) -> bool {
        self.age(now) <= config.stale_max_age
    }

    /// Whether this entry is fresh enough to satisfy a manual refresh
    /// without a new fetch.
    pub fn fresh_for_manual_refresh(&self, now: Instant, config: &CacheConfig) -> bool {
        self.age(now) <= config.manual_refresh_fresh
    }
}

/// FIFO-evicting map from bounds cache key to dataset.
#[derive(Debug)]
pub struct BoundsCache {
    config: CacheConfig,
    entries: HashMap<String, CacheEntry>,
    insertion_order: VecDeque<String>,
}

impl BoundsCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Store a dataset, evicting the oldest insertion once over
    /// capacity. Replacing an existing key keeps its original
    /// eviction position.
    pub fn put(&mut self, entry: CacheEntry) {
        let key = entry.key.clone();
        if self.entries.insert(key.clone(), entry).is_none() {
            self.insertion_order.push_back(key);
        }
        while self.entries.len() > self.config.max_entries {
            if let Some(oldest) = self.insertion_order.pop_front() {
                debug!(key = %oldest, "evicting oldest cache entry");
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    /// The most recently fetched usable entry for `mode`, ignoring
    /// entries past the stale ceiling. Used as a last-resort fallback
    /// when a fetch fails and the exact viewport has no entry.
    pub fn best_stale(&self, mode: GeoMode, now: Instant) -> Option<&CacheEntry> {
        self.entries
            .values()
            .filter(|entry| entry.mode == mode && entry.usable_at(now, &self.config))
            .max_by_key(|entry| entry.fetched_at)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
