use bytemuck::{Pod, Zeroable};

use crate::coords::{NdcRect, Rgba8};
use crate::protocol::{Batch, DatFlags, DatKind, DescriptorType, Format, Id, PolygonMode, Topology, VertexRate};

use super::shaders::Shaders;

/// Vertex of a flat quad, position in NDC.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct SquareVertex {
    pub pos: [f32; 3],
}

/// Number of vertices of a quad (two triangles).
pub const RECT_VERTEX_COUNT: u32 = 6;

const COLOR_SIZE: u64 = std::mem::size_of::<[f32; 4]>() as u64;

/// A single-color quad with its own pipeline, vertex buffer and color uniform.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Rectangle {
    pub graphics: Id,
    pub vertex: Id,
    pub color: Id,
}

impl Rectangle {
    /// Creates the pipeline and buffers, and binds them. Nothing is uploaded.
    pub(crate) fn create(batch: &mut Batch, shaders: &Shaders) -> Self {
        let graphics = batch.create_graphics();
        shaders.bind_square(batch, graphics);
        batch.set_primitive(graphics, Topology::TriangleList);
        batch.set_polygon(graphics, PolygonMode::Fill);
        batch.set_vertex(
            graphics,
            0,
            std::mem::size_of::<SquareVertex>() as u64,
            VertexRate::Vertex,
        );
        batch.set_attr(
            graphics,
            0,
            0,
            Format::R32G32B32Sfloat,
            std::mem::offset_of!(SquareVertex, pos) as u64,
        );
        batch.set_slot(graphics, 0, DescriptorType::UniformBuffer);

        let vertex = batch.create_dat(
            DatKind::Vertex,
            RECT_VERTEX_COUNT as u64 * std::mem::size_of::<SquareVertex>() as u64,
            DatFlags::NONE,
        );
        batch.bind_vertex(graphics, 0, vertex, 0);

        let color = batch.create_dat(DatKind::Uniform, COLOR_SIZE, DatFlags::NONE);
        batch.bind_dat(graphics, 0, color, 0);

        Self {
            graphics,
            vertex,
            color,
        }
    }

    pub(crate) fn upload_rect(&self, batch: &mut Batch, rect: NdcRect) {
        let vertices = rect.triangles().map(|pos| SquareVertex { pos });
        batch.upload_dat(self.vertex, 0, bytemuck::cast_slice(&vertices));
    }

    pub(crate) fn upload_color(&self, batch: &mut Batch, color: Rgba8) {
        let rgba = color.to_unit();
        batch.upload_dat(self.color, 0, bytemuck::cast_slice(&rgba));
    }

    pub(crate) fn record_draw(&self, batch: &mut Batch, canvas: Id) {
        batch.record_draw(canvas, self.graphics, 0, RECT_VERTEX_COUNT, 0, 1);
    }
}
