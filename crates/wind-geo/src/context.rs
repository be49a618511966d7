//! GeoContext resolution.

use std::sync::Arc;

use tracing::debug;
use wind_common::{GeoBounds, GeoMode};

use crate::descriptor::ViewDescriptor;
use crate::handle::MapHandle;
use crate::projector::{DerivedProjector, PixelRect, Projector, ScreenPoint};

/// Minimum pixel footprint for a usable derived viewport. Guards
/// against computing bounds for an invisible or collapsed surface.
pub const MIN_VIEWPORT_WIDTH: f64 = 320.0;
pub const MIN_VIEWPORT_HEIGHT: f64 = 220.0;

/// Camera tilt/rotation snapshot used by the renderer to decide
/// whether flat trigonometric arrows would be visually wrong.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewTilt {
    pub pitch: f64,
    pub bearing: f64,
    /// The host requested a 3D view even though the context had to be
    /// derived; directions will only be approximate.
    pub request_3d: bool,
}

impl ViewTilt {
    /// Whether arrow directions need true-to-projection correction.
    pub fn is_significant(&self) -> bool {
        self.request_3d || self.pitch.abs() > 0.1 || self.bearing.abs() > 0.1
    }
}

/// Immutable snapshot of one viewport state: bounds, pixel geometry
/// and a forward projection. Recomputed on every viewport-affecting
/// event, never persisted.
#[derive(Clone)]
pub struct GeoContext {
    pub mode: GeoMode,
    pub bounds: GeoBounds,
    pub width: u32,
    pub height: u32,
    pub clip: PixelRect,
    pub tilt: ViewTilt,
    pub projector: Arc<dyn Projector>,
}

impl GeoContext {
    /// Cache key for this context's bounds and mode.
    pub fn area_key(&self) -> String {
        self.bounds.cache_key(self.mode)
    }

    /// True when the renderer must project arrow directions through
    /// the live map transform instead of flat trigonometry.
    pub fn needs_projected_direction(&self) -> bool {
        self.mode == GeoMode::Live && self.tilt.is_significant()
    }
}

impl std::fmt::Debug for GeoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoContext")
            .field("mode", &self.mode)
            .field("bounds", &self.bounds)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("clip", &self.clip)
            .field("tilt", &self.tilt)
            .finish_non_exhaustive()
    }
}

/// What the host observed about the viewport right now. Input to the
/// derived strategy; the live strategy reads the map handle instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewportSnapshot<'a> {
    /// Addressable location fragment, e.g. `#12/47.37/8.54`.
    pub location_fragment: Option<&'a str>,
    /// Visible viewport container rect in CSS pixels.
    pub container: Option<PixelRect>,
    /// Host requested a 3D view.
    pub request_3d: bool,
}

struct LiveProjector {
    handle: Arc<dyn MapHandle>,
}

impl Projector for LiveProjector {
    fn project(&self, lon: f64, lat: f64) -> Option<ScreenPoint> {
        let point = self.handle.project(lon, lat)?;
        (point.x.is_finite() && point.y.is_finite()).then_some(point)
    }
}

/// Resolves the current viewport into a [`GeoContext`], trying the
/// live map adapter first and falling back to the derived strategy.
/// `None` means "not ready", never an error.
#[derive(Default)]
pub struct GeoResolver {
    map: Option<Arc<dyn MapHandle>>,
}

impl GeoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map(map: Arc<dyn MapHandle>) -> Self {
        Self { map: Some(map) }
    }

    pub fn attach_map(&mut self, map: Arc<dyn MapHandle>) {
        self.map = Some(map);
    }

    pub fn detach_map(&mut self) {
        self.map = None;
    }

    pub fn has_map(&self) -> bool {
        self.map.is_some()
    }

    pub fn resolve(&self, snapshot: &ViewportSnapshot<'_>) -> Option<GeoContext> {
        if let Some(context) = self.resolve_live(snapshot) {
            return Some(context);
        }
        self.resolve_derived(snapshot)
    }

    fn resolve_live(&self, snapshot: &ViewportSnapshot<'_>) -> Option<GeoContext> {
        let map = self.map.as_ref()?;
        let bounds = map.bounds()?;
        let (width, height) = map.container_size()?;
        if width == 0 || height == 0 || !bounds.is_valid() {
            return None;
        }

        Some(GeoContext {
            mode: GeoMode::Live,
            bounds,
            width,
            height,
            clip: PixelRect::new(0.0, 0.0, width as f64, height as f64),
            tilt: ViewTilt {
                pitch: map.pitch(),
                bearing: map.bearing(),
                request_3d: snapshot.request_3d,
            },
            projector: Arc::new(LiveProjector { handle: map.clone() }),
        })
    }

    fn resolve_derived(&self, snapshot: &ViewportSnapshot<'_>) -> Option<GeoContext> {
        let rect = snapshot.container?;
        if rect.width < MIN_VIEWPORT_WIDTH || rect.height < MIN_VIEWPORT_HEIGHT {
            return None;
        }

        let view = ViewDescriptor::parse(snapshot.location_fragment?)?;
        let world = crate::mercator::world_size(view.zoom);
        let center_x = crate::mercator::lon_to_world_x(view.lon, world);
        let center_y = crate::mercator::lat_to_world_y(view.lat, world);

        let bounds = GeoBounds {
            west: crate::mercator::world_x_to_lon(center_x - rect.width / 2.0, world),
            east: crate::mercator::world_x_to_lon(center_x + rect.width / 2.0, world),
            north: crate::mercator::world_y_to_lat(center_y - rect.height / 2.0, world),
            south: crate::mercator::world_y_to_lat(center_y + rect.height / 2.0, world),
        };
        debug!(zoom = view.zoom, ?bounds, "derived viewport bounds");

        Some(GeoContext {
            mode: GeoMode::Derived,
            bounds,
            width: rect.width.round() as u32,
            height: rect.height.round() as u32,
            clip: rect,
            tilt: ViewTilt {
                pitch: 0.0,
                bearing: 0.0,
                request_3d: snapshot.request_3d,
            },
            projector: Arc::new(DerivedProjector::new(view.zoom, view.lat, view.lon, rect)),
        })
    }
}
