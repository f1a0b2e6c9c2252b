//! Stimulus timing.

mod clock;

pub use clock::{StimClock, StimTime};
