//! GPU device and window surface.
//!
//! Creates the wgpu adapter, device and queue, keeps the surface configured, and hands out
//! one frame at a time to the render backend.

mod gpu;

pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
