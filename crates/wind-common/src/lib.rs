//! Common types shared across the wind overlay crates.

pub mod bounds;
pub mod settings;
pub mod time;
pub mod ui;
pub mod wind;

pub use bounds::{GeoBounds, GeoMode};
pub use settings::OverlaySettings;
pub use ui::{StatusLevel, UiEmitter, UiState};
pub use wind::{GridSize, SamplePoint, WindSeries, WindVector};
