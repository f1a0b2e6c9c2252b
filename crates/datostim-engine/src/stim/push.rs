use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::coords::Rgba8;

/// Per-draw parameters of a sphere layer, recorded as a push block.
///
/// Layout (256 bytes):
///
///  offset   0  model       mat4
///  offset  64  view        mat4
///  offset 128  projection  mat4
///  offset 192  min_color   vec4   (0..1)
///  offset 208  max_color   vec4   (0..1)
///  offset 224  tex_offset  vec2
///  offset 232  tex_size    vec2
///  offset 240  tex_angle   f32
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct StimPush {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub min_color: [f32; 4],
    pub max_color: [f32; 4],
    pub tex_offset: [f32; 2],
    pub tex_size: [f32; 2],
    pub tex_angle: f32,
    pub _pad: [f32; 3],
}

impl StimPush {
    pub const SIZE: u32 = std::mem::size_of::<StimPush>() as u32;

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: &Mat4,
        view: &Mat4,
        projection: &Mat4,
        min_color: Rgba8,
        max_color: Rgba8,
        tex_offset: [f32; 2],
        tex_size: [f32; 2],
        tex_angle: f32,
    ) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            min_color: min_color.to_unit(),
            max_color: max_color.to_unit(),
            tex_offset,
            tex_size,
            tex_angle,
            _pad: [0.0; 3],
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
