//! datostim engine crate.
//!
//! A multi-screen visual-stimulus compositor: a [`stim::Stim`] scene records frames as
//! backend-neutral [`protocol`] requests; [`render::WgpuBackend`] executes them on the GPU
//! and [`window::Runtime`] drives a scene from a timer.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod mesh;
pub mod protocol;
pub mod render;
pub mod stim;
