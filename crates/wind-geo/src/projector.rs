//! The forward-projection seam between geography and pixels.

use serde::{Deserialize, Serialize};

use crate::mercator;

/// A position in viewport pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// An axis-aligned pixel rectangle (clip region / container rect).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Containment test with a symmetric pixel margin.
    pub fn contains_with_margin(&self, point: ScreenPoint, margin: f64) -> bool {
        point.x >= self.left - margin
            && point.y >= self.top - margin
            && point.x <= self.right() + margin
            && point.y <= self.bottom() + margin
    }
}

/// Forward projection: geographic coordinate to screen pixel.
///
/// `None` means the point could not be projected (an adapter error,
/// or a non-finite result); callers skip such points.
pub trait Projector: Send + Sync {
    fn project(&self, lon: f64, lat: f64) -> Option<ScreenPoint>;
}

/// Pure Web-Mercator projector reconstructed from a view descriptor.
///
/// Captures the world size and center of the derived viewport. A
/// screen distance that crosses the antimeridian takes the shorter
/// wrap direction.
#[derive(Debug, Clone)]
pub struct DerivedProjector {
    world: f64,
    center_x: f64,
    center_y: f64,
    origin_x: f64,
    origin_y: f64,
}

impl DerivedProjector {
    pub fn new(zoom: f64, center_lat: f64, center_lon: f64, rect: PixelRect) -> Self {
        let world = mercator::world_size(zoom);
        Self {
            world,
            center_x: mercator::lon_to_world_x(center_lon, world),
            center_y: mercator::lat_to_world_y(center_lat, world),
            origin_x: rect.left + rect.width / 2.0,
            origin_y: rect.top + rect.height / 2.0,
        }
    }
}

impl Projector for DerivedProjector {
    fn project(&self, lon: f64, lat: f64) -> Option<ScreenPoint> {
        let x = mercator::lon_to_world_x(lon, self.world);
        let y = mercator::lat_to_world_y(lat, self.world);

        let mut dx = x - self.center_x;
        if dx > self.world / 2.0 {
            dx -= self.world;
        } else if dx < -self.world / 2.0 {
            dx += self.world;
        }

        let point = ScreenPoint {
            x: self.origin_x + dx,
            y: self.origin_y + (y - self.center_y),
        };
        (point.x.is_finite() && point.y.is_finite()).then_some(point)
    }
}
