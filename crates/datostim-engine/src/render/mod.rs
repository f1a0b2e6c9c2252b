//! wgpu implementation of the request protocol.
//!
//! Mapping conventions:
//! - descriptor slot `k` lives in bind group 0: a uniform at binding `2k`, a combined image
//!   sampler as texture `2k` plus sampler `2k + 1`
//! - push constants are a 256-byte uniform block at bind group 1, binding 0, selected per
//!   draw with a dynamic offset
//! - shader entry points are `main`; index buffers are `u32`

mod backend;
mod convert;
mod pipeline;
mod recording;
mod resources;

pub use backend::WgpuBackend;
