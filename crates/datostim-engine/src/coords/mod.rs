//! Coordinate and color types shared by the scene and the backends.
//!
//! Two spaces are in use:
//! - pixels: canvas-sized integer rectangles (screen viewports, square placement)
//! - normalized device coordinates: the whole canvas is `[-1, +1]` on both axes, +Y up
//!
//! Colors enter the configuration API as 8-bit RGBA and are converted to `[0, 1]`
//! floats right before they reach the GPU.

mod color;
mod ndc;
mod viewport;

pub use color::Rgba8;
pub use ndc::NdcRect;
pub use viewport::Viewport;
