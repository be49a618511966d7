//! Deriving renderable vectors from a cached dataset.

use chrono::{DateTime, Utc};
use wind_common::time::{closest_time_index, parse_utc_hour, target_forecast_time};
use wind_common::{GridSize, WindVector};
use wind_cache::CacheEntry;
use wind_grid::resample_by_density;

/// The renderable product of one derivation: vectors at the target
/// density plus the forecast instant they represent.
#[derive(Debug, Clone)]
pub struct DerivedSet {
    pub vectors: Vec<WindVector>,
    pub forecast_time: Option<DateTime<Utc>>,
}

/// Slice the cached series at the timestamp closest to now + offset,
/// then resample from the fetch grid to the render grid. Missing
/// values stay `None` and are skipped by the renderer.
pub fn derive_at_offset(
    entry: &CacheEntry,
    offset_hours: u32,
    target_grid: GridSize,
    now: DateTime<Utc>,
) -> DerivedSet {
    let target = target_forecast_time(now, offset_hours);
    let time_index = closest_time_index(&entry.series.times, target);

    let source: Vec<WindVector> = entry
        .samples
        .iter()
        .enumerate()
        .map(|(index, sample)| WindVector {
            lat: sample.lat,
            lon: sample.lon,
            speed: entry.series.speed_at(index, time_index),
            direction: entry.series.direction_at(index, time_index),
        })
        .collect();

    let vectors = resample_by_density(&source, entry.grid, target_grid, &entry.bounds);
    let forecast_time = entry
        .series
        .times
        .get(time_index)
        .and_then(|value| parse_utc_hour(value));

    DerivedSet {
        vectors,
        forecast_time,
    }
}
