//! Adapter interface for a live map object.
//!
//! Concrete map libraries are adapted to this trait at the host
//! boundary; discovering a usable map object in the host environment
//! is outside the pipeline. Any accessor may fail (`None`) because
//! the underlying object is owned by a third party.

use wind_common::GeoBounds;

use crate::projector::ScreenPoint;

pub trait MapHandle: Send + Sync {
    /// Current viewport bounds.
    fn bounds(&self) -> Option<GeoBounds>;

    /// Container size in CSS pixels.
    fn container_size(&self) -> Option<(u32, u32)>;

    /// Camera tilt in degrees; 0 when the adapter cannot tell.
    fn pitch(&self) -> f64 {
        0.0
    }

    /// Camera rotation in degrees; 0 when the adapter cannot tell.
    fn bearing(&self) -> f64 {
        0.0
    }

    /// Forward projection through the map's own transform.
    fn project(&self, lon: f64, lat: f64) -> Option<ScreenPoint>;
}
