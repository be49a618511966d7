//! Density-adaptive grid sizing with temporary rate-limit capping.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;
use wind_common::settings::{DENSITY_MAX, DENSITY_MIN};
use wind_common::GridSize;

/// Grid sizing parameters. The cap factor and cool-down are
/// empirically chosen and deliberately configurable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    /// Baseline grid shape at density level 5.
    pub base_rows: usize,
    pub base_cols: usize,
    pub min_rows: usize,
    pub max_rows: usize,
    pub min_cols: usize,
    pub max_cols: usize,
    /// Fetch grid uses this level regardless of the render density.
    pub fetch_level: u8,
    /// Effective-level multiplier applied after a rate limit (< 1).
    pub rate_limit_cap_factor: f64,
    /// How long a rate-limit cap stays active.
    #[serde(deserialize_with = "duration_from_millis")]
    pub rate_limit_cap_duration: Duration,
}

fn duration_from_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            base_rows: 9,
            base_cols: 11,
            min_rows: 3,
            max_rows: 18,
            min_cols: 4,
            max_cols: 22,
            fetch_level: 5,
            rate_limit_cap_factor: 0.6,
            rate_limit_cap_duration: Duration::from_secs(2 * 60),
        }
    }
}

/// Maps the 1-10 density level to a grid resolution and tracks the
/// temporary cap applied after observed upstream rate-limiting.
#[derive(Debug)]
pub struct DensityController {
    config: DensityConfig,
    cap_level: u8,
    cap_until: Option<Instant>,
}

impl DensityController {
    pub fn new(config: DensityConfig) -> Self {
        Self {
            config,
            cap_level: DENSITY_MAX,
            cap_until: None,
        }
    }

    /// Grid shape for a density level. Target point count scales
    /// linearly with the level relative to the level-5 baseline; the
    /// aspect ratio is fixed from the baseline shape.
    pub fn grid_for_level(&self, level: u8) -> GridSize {
        let level = level.clamp(DENSITY_MIN, DENSITY_MAX);
        let base_points = (self.config.base_rows * self.config.base_cols) as f64;
        let target_points = base_points * level as f64 / 5.0;
        let aspect = self.config.base_cols as f64 / self.config.base_rows as f64;

        let rows = ((target_points / aspect).sqrt().round() as usize)
            .clamp(self.config.min_rows, self.config.max_rows);
        let cols = ((rows as f64 * aspect).round() as usize)
            .clamp(self.config.min_cols, self.config.max_cols);

        GridSize::new(rows, cols)
    }

    /// The fixed-resolution grid used for fetching.
    pub fn fetch_grid(&self) -> GridSize {
        self.grid_for_level(self.config.fetch_level)
    }

    /// Requested level after applying any unexpired cap.
    pub fn effective_level(&mut self, requested: u8) -> u8 {
        self.effective_level_at(requested, Instant::now())
    }

    pub fn effective_level_at(&mut self, requested: u8, now: Instant) -> u8 {
        self.expire_cap(now);
        let requested = requested.clamp(DENSITY_MIN, DENSITY_MAX);
        match self.cap_until {
            Some(until) if now < until => requested.min(self.cap_level),
            _ => requested,
        }
    }

    /// Record an observed rate limit: cap the effective level for the
    /// cool-down window. The cap can only tighten.
    pub fn register_rate_limit(&mut self, requested: u8) {
        self.register_rate_limit_at(requested, Instant::now());
    }

    pub fn register_rate_limit_at(&mut self, requested: u8, now: Instant) {
        let requested = requested.clamp(DENSITY_MIN, DENSITY_MAX);
        let capped = ((requested as f64 * self.config.rate_limit_cap_factor).ceil() as u8)
            .max(DENSITY_MIN);
        self.cap_level = self.cap_level.min(capped);
        self.cap_until = Some(now + self.config.rate_limit_cap_duration);
        debug!(cap = self.cap_level, "density capped after rate limit");
    }

    fn expire_cap(&mut self, now: Instant) {
        if let Some(until) = self.cap_until {
            if now >= until {
                self.cap_until = None;
                self.cap_level = DENSITY_MAX;
            }
        }
    }
}
