use glam::Mat4;

use crate::coords::Viewport;
use crate::protocol::Backend;

use super::{Stim, StimError};

/// One display region: a viewport on the canvas plus its projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub viewport: Viewport,
    pub projection: Mat4,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            projection: Mat4::IDENTITY,
        }
    }
}

impl<B: Backend> Stim<B> {
    fn screen_mut(&mut self, screen_idx: u32) -> Result<&mut Screen, StimError> {
        match self.screens.define(screen_idx) {
            Some(screen) => Ok(screen),
            None => {
                let err = StimError::ScreenOutOfRange { index: screen_idx };
                log::error!("{err}");
                Err(err)
            }
        }
    }

    /// Sets the viewport of a screen, in canvas pixels.
    pub fn set_screen(
        &mut self,
        screen_idx: u32,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
    ) -> Result<(), StimError> {
        let screen = self.screen_mut(screen_idx)?;
        screen.viewport = Viewport::new(x, y, w, h);
        Ok(())
    }

    /// Sets the projection matrix of a screen.
    pub fn set_projection(&mut self, screen_idx: u32, projection: Mat4) -> Result<(), StimError> {
        let screen = self.screen_mut(screen_idx)?;
        screen.projection = projection;
        Ok(())
    }

    pub fn screen(&self, screen_idx: u32) -> Option<&Screen> {
        self.screens.get(screen_idx)
    }

    pub fn screen_count(&self) -> usize {
        self.screens.count()
    }
}
