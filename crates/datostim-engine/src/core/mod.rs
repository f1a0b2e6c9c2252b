//! Contract between the runtime loop and stimulus programs.

mod app;
mod ctx;
mod headless;

pub use app::{App, AppControl};
pub use ctx::TickCtx;
pub use headless::run_recorded;
