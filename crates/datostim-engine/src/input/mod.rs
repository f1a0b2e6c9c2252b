//! Keyboard and mouse input.
//!
//! The runtime translates window events (see `platform`) and feeds them to an
//! [`InputState`], which apps poll from their timer callback.

pub(crate) mod platform;
mod state;
mod types;

pub use state::InputState;
pub use types::{InputEvent, Key, MouseButton};
