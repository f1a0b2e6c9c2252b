//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the stimulus window, and drives the app timer.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
