//! Wind sample, series and vector types.

use serde::{Deserialize, Serialize};

/// A single fetch coordinate. Produced in row-major order (row 0 is
/// the northern edge); fetch results are correlated positionally, so
/// ordering is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub lat: f64,
    pub lon: f64,
}

/// Rows/columns of a sample or render grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl GridSize {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn point_count(&self) -> usize {
        self.rows * self.cols
    }
}

/// An hourly wind forecast for a set of sample points.
///
/// `times` holds UTC-hour timestamps as returned by the upstream API
/// (`YYYY-MM-DDTHH:MM`). The per-point series are indexed by sample
/// first, then by time; a value is `None` when the upstream series
/// was short or contained a null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindSeries {
    pub times: Vec<String>,
    pub speeds_by_point: Vec<Vec<Option<f64>>>,
    pub directions_by_point: Vec<Vec<Option<f64>>>,
}

impl WindSeries {
    /// Speed at (point, time index), if present.
    pub fn speed_at(&self, point: usize, time_index: usize) -> Option<f64> {
        self.speeds_by_point
            .get(point)
            .and_then(|series| series.get(time_index).copied().flatten())
    }

    /// Direction at (point, time index), if present.
    pub fn direction_at(&self, point: usize, time_index: usize) -> Option<f64> {
        self.directions_by_point
            .get(point)
            .and_then(|series| series.get(time_index).copied().flatten())
    }
}

/// The unit the resampler and renderer exchange.
///
/// Speed is km/h; direction is degrees in meteorological convention
/// (the direction the wind blows *from*). Either may be `None` when
/// the fetched series was short; the renderer skips such vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindVector {
    pub lat: f64,
    pub lon: f64,
    pub speed: Option<f64>,
    pub direction: Option<f64>,
}
