use std::borrow::Cow;

use crate::protocol::{Batch, Id, ShaderSource, ShaderStage};

const SQUARE_VERT: &str = include_str!("shaders/square.vert.wgsl");
const SQUARE_FRAG: &str = include_str!("shaders/square.frag.wgsl");
const SPHERE_VERT: &str = include_str!("shaders/sphere.vert.wgsl");
const SPHERE_FRAG: &str = include_str!("shaders/sphere.frag.wgsl");

/// Shader modules shared by every pipeline of the scene.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct Shaders {
    pub square_vert: Id,
    pub square_frag: Id,
    pub sphere_vert: Id,
    pub sphere_frag: Id,
}

impl Shaders {
    pub(crate) fn create(batch: &mut Batch) -> Self {
        let mut wgsl = |stage, src: &'static str| {
            batch.create_shader(stage, ShaderSource::Wgsl(Cow::Borrowed(src)))
        };
        Self {
            square_vert: wgsl(ShaderStage::Vertex, SQUARE_VERT),
            square_frag: wgsl(ShaderStage::Fragment, SQUARE_FRAG),
            sphere_vert: wgsl(ShaderStage::Vertex, SPHERE_VERT),
            sphere_frag: wgsl(ShaderStage::Fragment, SPHERE_FRAG),
        }
    }

    pub(crate) fn bind_square(&self, batch: &mut Batch, graphics: Id) {
        batch.set_shader(graphics, self.square_vert);
        batch.set_shader(graphics, self.square_frag);
    }

    pub(crate) fn bind_sphere(&self, batch: &mut Batch, graphics: Id) {
        batch.set_shader(graphics, self.sphere_vert);
        batch.set_shader(graphics, self.sphere_frag);
    }
}
