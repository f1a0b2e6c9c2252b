use anyhow::Result;

use crate::protocol::Backend;
use crate::stim::Stim;

use super::ctx::TickCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Stimulus program driven by the runtime.
///
/// Both callbacks are generic over the backend, so the same program runs against the
/// window backend or a [`crate::protocol::RecordingBackend`].
pub trait App {
    /// Called once, after the scene is created and before its first update.
    fn setup<B: Backend>(&mut self, stim: &mut Stim<B>) -> Result<()>;

    /// Called on every timer tick.
    fn on_tick<B: Backend>(&mut self, ctx: &mut TickCtx<'_, B>) -> AppControl;
}
