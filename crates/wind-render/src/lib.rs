//! Wind arrow overlay rendering: a software RGBA surface, arrow
//! drawing with tilt-aware direction correction, and PNG encoding.

pub mod arrows;
pub mod png;
pub mod surface;

pub use arrows::{draw_vectors, wind_color};
pub use png::create_png;
pub use surface::{Color, PixelSurface};
