use glam::Mat4;

use crate::coords::Rgba8;
use crate::protocol::{Backend, BlendType, ColorMask, Filter, Format, Id};

use super::{Stim, StimError};

/// Texture sampling filter of a layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Interpolation {
    #[default]
    Nearest,
    Linear,
}

impl From<Interpolation> for Filter {
    fn from(i: Interpolation) -> Self {
        match i {
            Interpolation::Nearest => Filter::Nearest,
            Interpolation::Linear => Filter::Linear,
        }
    }
}

/// Per-layer blending against what is already on the canvas.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Blend {
    #[default]
    None,
    Destination,
    Source,
    OneMinusSource,
}

impl From<Blend> for BlendType {
    fn from(b: Blend) -> Self {
        match b {
            Blend::None => BlendType::Disable,
            Blend::Destination => BlendType::Destination,
            Blend::Source => BlendType::Source,
            Blend::OneMinusSource => BlendType::OneMinusSource,
        }
    }
}

/// Private copy of a layer's pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerTexture {
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl LayerTexture {
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn shape(&self) -> [u32; 3] {
        [self.width, self.height, 1]
    }
}

/// GPU resources owned by a prepared layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LayerGpu {
    pub graphics: Id,
    pub texture: Id,
    pub sampler: Id,
    /// Texture size and format fixed at preparation.
    pub shape: [u32; 3],
    pub format: Format,
}

/// Whether a layer's pipeline, texture and sampler exist yet.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum LayerState {
    #[default]
    Unprepared,
    Ready(LayerGpu),
}

/// A textured dome-projection layer.
///
/// Pipeline fixed state (blend, mask), sampler state (interpolation, periodicity) and
/// texture size are captured once, when the layer is prepared. Later changes to those
/// fields are stored but not applied to the GPU objects; texture content keeps being
/// re-uploaded whenever it changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub view: Mat4,
    pub tex_offset: [f32; 2],
    pub tex_size: [f32; 2],
    pub tex_angle: f32,

    pub mask: ColorMask,
    pub min_color: Rgba8,
    pub max_color: Rgba8,

    pub texture: Option<LayerTexture>,

    pub interpolation: Interpolation,
    pub blend: Blend,
    pub is_periodic: bool,
    pub is_visible: bool,

    pub state: LayerState,
    /// Parameters changed since the last composed frame.
    pub is_dirty: bool,
    /// Pixel data changed since the last upload.
    pub is_texture_dirty: bool,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            tex_offset: [0.0, 0.0],
            tex_size: [1.0, 1.0],
            tex_angle: 0.0,
            mask: ColorMask::ALL,
            min_color: Rgba8::TRANSPARENT,
            max_color: Rgba8::WHITE,
            texture: None,
            interpolation: Interpolation::Nearest,
            blend: Blend::None,
            is_periodic: false,
            is_visible: false,
            state: LayerState::Unprepared,
            is_dirty: false,
            is_texture_dirty: false,
        }
    }
}

impl Layer {
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.state == LayerState::Unprepared
    }

    #[inline]
    pub fn gpu(&self) -> Option<&LayerGpu> {
        match &self.state {
            LayerState::Ready(gpu) => Some(gpu),
            LayerState::Unprepared => None,
        }
    }

    /// `true` when pending pixel data cannot be uploaded yet because the layer has no
    /// GPU texture.
    #[inline]
    pub fn is_upload_pending(&self) -> bool {
        self.is_texture_dirty && self.is_blank()
    }

    #[inline]
    fn touch(&mut self) {
        self.is_dirty = true;
    }
}

impl<B: Backend> Stim<B> {
    fn layer_mut(&mut self, layer_idx: u32) -> Result<&mut Layer, StimError> {
        match self.layers.define(layer_idx) {
            Some(layer) => Ok(layer),
            None => {
                let err = StimError::LayerOutOfRange { index: layer_idx };
                log::error!("{err}");
                Err(err)
            }
        }
    }

    /// Applies `f` to a layer and marks it dirty.
    fn edit_layer(
        &mut self,
        layer_idx: u32,
        f: impl FnOnce(&mut Layer),
    ) -> Result<(), StimError> {
        let layer = self.layer_mut(layer_idx)?;
        f(layer);
        layer.touch();
        Ok(())
    }

    /// Replaces the layer's pixel data with a copy of `rgba`.
    ///
    /// # Panics
    /// Panics if `width` or `height` is zero, or if `rgba` is not exactly
    /// `width * height` texels of `format`.
    pub fn set_layer_texture(
        &mut self,
        layer_idx: u32,
        format: Format,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), StimError> {
        assert!(width > 0 && height > 0, "texture size must be non-zero");
        assert!(!rgba.is_empty(), "texture data must not be empty");
        assert_eq!(
            rgba.len(),
            width as usize * height as usize * format.size() as usize,
            "texture data length does not match {width}x{height} {format:?}"
        );

        let layer = self.layer_mut(layer_idx)?;
        layer.texture = Some(LayerTexture {
            format,
            width,
            height,
            data: rgba.to_vec(),
        });
        layer.is_texture_dirty = true;
        layer.touch();
        Ok(())
    }

    pub fn set_layer_interpolation(
        &mut self,
        layer_idx: u32,
        interpolation: Interpolation,
    ) -> Result<(), StimError> {
        self.edit_layer(layer_idx, |l| l.interpolation = interpolation)
    }

    pub fn set_layer_periodic(&mut self, layer_idx: u32, is_periodic: bool) -> Result<(), StimError> {
        self.edit_layer(layer_idx, |l| l.is_periodic = is_periodic)
    }

    pub fn set_layer_blend(&mut self, layer_idx: u32, blend: Blend) -> Result<(), StimError> {
        self.edit_layer(layer_idx, |l| l.blend = blend)
    }

    pub fn set_layer_mask(
        &mut self,
        layer_idx: u32,
        red: bool,
        green: bool,
        blue: bool,
        alpha: bool,
    ) -> Result<(), StimError> {
        let mask = ColorMask::from_channels(red, green, blue, alpha);
        self.edit_layer(layer_idx, |l| l.mask = mask)
    }

    pub fn set_layer_view(&mut self, layer_idx: u32, view: Mat4) -> Result<(), StimError> {
        self.edit_layer(layer_idx, |l| l.view = view)
    }

    pub fn set_layer_angle(&mut self, layer_idx: u32, tex_angle: f32) -> Result<(), StimError> {
        self.edit_layer(layer_idx, |l| l.tex_angle = tex_angle)
    }

    pub fn set_layer_offset(&mut self, layer_idx: u32, x: f32, y: f32) -> Result<(), StimError> {
        self.edit_layer(layer_idx, |l| l.tex_offset = [x, y])
    }

    pub fn set_layer_size(&mut self, layer_idx: u32, x: f32, y: f32) -> Result<(), StimError> {
        self.edit_layer(layer_idx, |l| l.tex_size = [x, y])
    }

    pub fn set_layer_min_color(&mut self, layer_idx: u32, color: Rgba8) -> Result<(), StimError> {
        self.edit_layer(layer_idx, |l| l.min_color = color)
    }

    pub fn set_layer_max_color(&mut self, layer_idx: u32, color: Rgba8) -> Result<(), StimError> {
        self.edit_layer(layer_idx, |l| l.max_color = color)
    }

    /// Shows or hides a layer. Hidden layers are still prepared, just not drawn.
    pub fn set_layer_visible(&mut self, layer_idx: u32, is_visible: bool) -> Result<(), StimError> {
        let layer = self.layer_mut(layer_idx)?;
        layer.is_visible = is_visible;
        Ok(())
    }

    pub fn layer(&self, layer_idx: u32) -> Option<&Layer> {
        self.layers.get(layer_idx)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.count()
    }
}
