//! Geographic bounds and cache keying.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the current viewport geometry was obtained.
///
/// `Live` means a real map object supplied bounds and projection;
/// `Derived` means they were reconstructed from a `zoom/lat/lon`
/// view descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoMode {
    Live,
    Derived,
}

impl GeoMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoMode::Live => "live",
            GeoMode::Derived => "derived",
        }
    }
}

impl fmt::Display for GeoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A west/east/north/south geographic rectangle in degrees.
///
/// A valid bounds has `north > south`. `east` may be numerically
/// less than `west`, which encodes an antimeridian crossing; span
/// arithmetic must normalize east by +360 first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub west: f64,
    pub east: f64,
    pub north: f64,
    pub south: f64,
}

impl GeoBounds {
    pub fn new(west: f64, east: f64, north: f64, south: f64) -> Self {
        Self {
            west,
            east,
            north,
            south,
        }
    }

    /// Latitude span in degrees.
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Longitude span in degrees, normalized across the antimeridian.
    pub fn lon_span(&self) -> f64 {
        let east = if self.east < self.west {
            self.east + 360.0
        } else {
            self.east
        };
        east - self.west
    }

    pub fn is_valid(&self) -> bool {
        self.north > self.south
            && self.west.is_finite()
            && self.east.is_finite()
            && self.north.is_finite()
            && self.south.is_finite()
    }

    /// Cache key for this bounds in the given mode.
    ///
    /// Edges are quantized to 2 decimal degrees so sub-pixel viewport
    /// jitter maps onto the same key.
    pub fn cache_key(&self, mode: GeoMode) -> String {
        format!(
            "{}|{:.2}|{:.2}|{:.2}|{:.2}",
            mode, self.south, self.north, self.west, self.east
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_under_small_jitter() {
        let a = GeoBounds::new(-10.001, 10.002, 50.001, 40.0004);
        let b = GeoBounds::new(-10.003, 10.0001, 49.999, 40.003);
        assert_eq!(a.cache_key(GeoMode::Live), b.cache_key(GeoMode::Live));
    }

    #[test]
    fn key_differs_by_mode() {
        let bounds = GeoBounds::new(-10.0, 10.0, 50.0, 40.0);
        assert_ne!(
            bounds.cache_key(GeoMode::Live),
            bounds.cache_key(GeoMode::Derived)
        );
    }

    #[test]
    fn lon_span_wraps_antimeridian() {
        let bounds = GeoBounds::new(170.0, -170.0, 50.0, 40.0);
        assert!((bounds.lon_span() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn validity_requires_north_above_south() {
        assert!(GeoBounds::new(-10.0, 10.0, 50.0, 40.0).is_valid());
        assert!(!GeoBounds::new(-10.0, 10.0, 40.0, 50.0).is_valid());
    }
}
