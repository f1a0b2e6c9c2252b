use std::fmt;

use super::{MAX_LAYERS, MAX_SCREENS};

/// A rejected scene configuration call.
///
/// The call that produced it made no change to the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StimError {
    ScreenOutOfRange { index: u32 },
    LayerOutOfRange { index: u32 },
    ZeroCanvasSize { width: u32, height: u32 },
}

impl fmt::Display for StimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StimError::ScreenOutOfRange { index } => {
                write!(f, "screen_idx must be lower than {MAX_SCREENS} (got {index})")
            }
            StimError::LayerOutOfRange { index } => {
                write!(f, "layer_idx must be lower than {MAX_LAYERS} (got {index})")
            }
            StimError::ZeroCanvasSize { width, height } => {
                write!(f, "canvas size cannot be zero (got {width}x{height})")
            }
        }
    }
}

impl std::error::Error for StimError {}
