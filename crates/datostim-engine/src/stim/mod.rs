//! Stimulus scene: screens, sphere layers, the background and the indicator square.
//!
//! Setters only touch CPU-side state (and, for the static primitives, queue small uploads).
//! Everything else is reconciled and recorded by [`Stim::update`].

mod compositor;
mod error;
mod layer;
mod primitives;
mod push;
mod screen;
mod shaders;
mod sphere;
mod table;

pub use error::StimError;
pub use layer::{Blend, Interpolation, Layer, LayerGpu, LayerState, LayerTexture};
pub use primitives::{Rectangle, SquareVertex};
pub use push::StimPush;
pub use screen::Screen;
pub use table::BoundedTable;

use std::time::Instant;

use glam::Mat4;

use crate::coords::{NdcRect, Rgba8};
use crate::mesh::uv_sphere;
use crate::protocol::{Backend, Batch, Id};

use shaders::Shaders;
use sphere::SphereBuffers;

pub const MAX_SCREENS: usize = 8;
pub const MAX_LAYERS: usize = 16;

/// Scene construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StimConfig {
    pub width: u32,
    pub height: u32,
    pub clear_color: Rgba8,
    pub background: Rgba8,
    /// Square size in pixels. The square starts in the top-right corner of the canvas.
    pub square_size: [u32; 2],
    pub square_color: Rgba8,
    /// Resolution of the generated default sphere, as `(rings, segments)`.
    pub sphere_resolution: [u32; 2],
}

impl Default for StimConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 400,
            clear_color: Rgba8::BLACK,
            background: Rgba8::gray(127),
            square_size: [100, 100],
            square_color: Rgba8::new(0, 255, 255, 255),
            sphere_resolution: [90, 180],
        }
    }
}

/// The stimulus scene and the backend it renders through.
pub struct Stim<B: Backend> {
    backend: B,
    batch: Batch,

    width: u32,
    height: u32,
    canvas: Id,
    model: Mat4,

    shaders: Shaders,
    background: Rectangle,
    square: Rectangle,
    background_color: Rgba8,
    square_color: Rgba8,

    sphere: SphereBuffers,

    screens: BoundedTable<Screen, MAX_SCREENS>,
    layers: BoundedTable<Layer, MAX_LAYERS>,
}

impl<B: Backend> std::fmt::Debug for Stim<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stim")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("canvas", &self.canvas)
            .field("screens", &self.screens.count())
            .field("layers", &self.layers.count())
            .field("pending", &self.batch.len())
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Stim<B> {
    /// Builds the scene and queues creation of its static resources.
    ///
    /// Nothing reaches the backend before the first [`Stim::update`].
    pub fn new(backend: B, config: StimConfig) -> Result<Self, StimError> {
        let StimConfig {
            width,
            height,
            clear_color,
            background: background_color,
            square_size: [square_w, square_h],
            square_color,
            sphere_resolution: [rings, segments],
        } = config;

        if width == 0 || height == 0 {
            let err = StimError::ZeroCanvasSize { width, height };
            log::error!("{err}");
            return Err(err);
        }

        let mut batch = Batch::new();
        let shaders = Shaders::create(&mut batch);

        let background = Rectangle::create(&mut batch, &shaders);
        background.upload_rect(&mut batch, NdcRect::FULL);
        background.upload_color(&mut batch, background_color);

        let square = Rectangle::create(&mut batch, &shaders);
        let sphere = SphereBuffers::create(&mut batch, &uv_sphere(rings, segments));
        let canvas = batch.create_canvas(width, height, clear_color.to_array());

        let mut stim = Self {
            backend,
            batch,
            width,
            height,
            canvas,
            model: Mat4::IDENTITY,
            shaders,
            background,
            square,
            background_color,
            square_color,
            sphere,
            screens: BoundedTable::default(),
            layers: BoundedTable::default(),
        };
        stim.set_square_pos(
            width.saturating_sub(square_w),
            height.saturating_sub(square_h),
            square_w,
            square_h,
        );
        stim.set_square_color(square_color);

        log::info!("stim: {width}x{height} canvas {canvas}");
        Ok(stim)
    }

    /// Sets the background color.
    pub fn set_background(&mut self, color: Rgba8) {
        self.background_color = color;
        self.background.upload_color(&mut self.batch, color);
    }

    /// Moves the square, in canvas pixels (`y` measured from the bottom edge).
    pub fn set_square_pos(&mut self, x: u32, y: u32, w: u32, h: u32) {
        let rect = NdcRect::from_pixels(x, y, w, h, self.width, self.height);
        self.square.upload_rect(&mut self.batch, rect);
    }

    pub fn set_square_color(&mut self, color: Rgba8) {
        self.square_color = color;
        self.square.upload_color(&mut self.batch, color);
    }

    /// Sets the model matrix shared by every layer.
    pub fn set_model(&mut self, model: Mat4) {
        self.model = model;
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn canvas(&self) -> Id {
        self.canvas
    }

    #[inline]
    pub fn model(&self) -> &Mat4 {
        &self.model
    }

    #[inline]
    pub fn background_color(&self) -> Rgba8 {
        self.background_color
    }

    #[inline]
    pub fn square_color(&self) -> Rgba8 {
        self.square_color
    }

    /// Requests queued since the last update.
    #[inline]
    pub fn pending(&self) -> &Batch {
        &self.batch
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// When the last updated frame was presented, as reported by the backend.
    #[inline]
    pub fn last_present(&self) -> Option<Instant> {
        self.backend.last_present()
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Frees every layer's pixel data and tells the backend to release its resources.
    ///
    /// Returns the backend.
    pub fn cleanup(mut self) -> B {
        self.release();
        self.backend
    }

    /// In-place form of [`Stim::cleanup`], for owners that cannot give the scene up.
    ///
    /// The scene must not be updated afterwards.
    pub fn release(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.texture = None;
        }
        self.batch.clear();
        self.backend.destroy();
        log::debug!("stim: cleaned up");
    }
}
