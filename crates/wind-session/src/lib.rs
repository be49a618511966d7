//! Refresh-cycle orchestration for the wind overlay.
//!
//! Ties the viewport resolver, fetch client, bounds cache, density
//! controller, and renderer into one stateful session with debounced
//! scheduling, cooperative cancellation, and de-duplicated UI state
//! emission.

pub mod config;
pub mod derive;
pub mod session;

pub use config::{ConfigError, OverlayConfig};
pub use derive::{derive_at_offset, DerivedSet};
pub use session::{
    FixedViewport, RefreshOptions, Session, SettingsPatch, ViewportSource,
};
