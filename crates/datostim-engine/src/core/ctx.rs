use crate::input::InputState;
use crate::protocol::Backend;
use crate::stim::Stim;
use crate::time::StimTime;

/// Per-tick context passed to [`super::App::on_tick`].
///
/// The runtime calls [`Stim::update`] right after the callback returns, so setters made
/// here show up in the frame of the same tick.
pub struct TickCtx<'a, B: Backend> {
    pub stim: &'a mut Stim<B>,
    pub input: &'a mut InputState,
    pub time: StimTime,
    /// Presentation time of the previous frame on the same clock as `time.t`, once one
    /// has been presented.
    pub frame_time: Option<f64>,
}

impl<B: Backend> TickCtx<'_, B> {
    /// Seconds since the runtime started.
    #[inline]
    pub fn seconds(&self) -> f64 {
        self.time.t
    }
}
