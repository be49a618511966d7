//! Sample lattice construction, density-adaptive grid sizing and
//! density resampling.

pub mod density;
pub mod resample;
pub mod sample;

pub use density::{DensityConfig, DensityController};
pub use resample::resample_by_density;
pub use sample::build_sample_points;
