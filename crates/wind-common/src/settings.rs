//! Overlay settings and their normalization.

use serde::{Deserialize, Serialize};

pub const DENSITY_MIN: u8 = 1;
pub const DENSITY_MAX: u8 = 10;
pub const DEFAULT_DENSITY_LEVEL: u8 = 5;
pub const MAX_OFFSET_HOURS: u32 = 24;
pub const OFFSET_STEP_HOURS: u32 = 2;

/// User-facing overlay settings.
///
/// Constructed from untrusted input; out-of-range or malformed values
/// are clamped and rounded rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlaySettings {
    pub enabled: bool,
    /// Forecast offset in hours from now, 0..=24 in steps of 2.
    pub offset_hours: u32,
    /// Render density, 1..=10.
    pub density_level: u8,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            offset_hours: 0,
            density_level: DEFAULT_DENSITY_LEVEL,
        }
    }
}

impl OverlaySettings {
    /// Build normalized settings from raw numeric input.
    pub fn normalized(enabled: bool, offset_hours: f64, density_level: f64) -> Self {
        Self {
            enabled,
            offset_hours: clamp_offset_hours(offset_hours),
            density_level: clamp_density_level(density_level),
        }
    }

    /// Re-apply clamping, e.g. after deserializing.
    pub fn normalize(self) -> Self {
        Self::normalized(
            self.enabled,
            self.offset_hours as f64,
            self.density_level as f64,
        )
    }
}

/// Clamp an offset to 0..=24 hours, rounded to the 2-hour step.
pub fn clamp_offset_hours(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    let step = OFFSET_STEP_HOURS as f64;
    let stepped = (value / step).round() * step;
    stepped.clamp(0.0, MAX_OFFSET_HOURS as f64) as u32
}

/// Clamp a density level to 1..=10, rounded to the nearest integer.
pub fn clamp_density_level(value: f64) -> u8 {
    if !value.is_finite() {
        return DEFAULT_DENSITY_LEVEL;
    }
    value.round().clamp(DENSITY_MIN as f64, DENSITY_MAX as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_rounds_to_step() {
        assert_eq!(clamp_offset_hours(3.0), 4);
        assert_eq!(clamp_offset_hours(5.2), 6);
        assert_eq!(clamp_offset_hours(-7.0), 0);
        assert_eq!(clamp_offset_hours(99.0), 24);
        assert_eq!(clamp_offset_hours(f64::NAN), 0);
    }

    #[test]
    fn density_clamps_to_range() {
        assert_eq!(clamp_density_level(0.0), 1);
        assert_eq!(clamp_density_level(7.4), 7);
        assert_eq!(clamp_density_level(25.0), 10);
        assert_eq!(clamp_density_level(f64::INFINITY), 10);
        assert_eq!(clamp_density_level(f64::NAN), DEFAULT_DENSITY_LEVEL);
    }

    #[test]
    fn normalize_is_idempotent() {
        let settings = OverlaySettings::normalized(true, 23.0, 4.6);
        assert_eq!(settings.offset_hours, 24);
        assert_eq!(settings.density_level, 5);
        assert_eq!(settings.normalize(), settings);
    }
}
