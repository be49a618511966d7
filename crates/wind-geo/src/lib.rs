//! Viewport-to-geography resolution.
//!
//! Translates the current map viewport into geographic bounds and a
//! forward pixel projection. Two strategies: a live map adapter
//! (anything implementing [`MapHandle`]), or a derived Web-Mercator
//! reconstruction from a `zoom/lat/lon` view descriptor.

pub mod context;
pub mod descriptor;
pub mod handle;
pub mod mercator;
pub mod projector;

pub use context::{GeoContext, GeoResolver, ViewTilt, ViewportSnapshot};
pub use descriptor::ViewDescriptor;
pub use handle::MapHandle;
pub use projector::{DerivedProjector, PixelRect, Projector, ScreenPoint};
