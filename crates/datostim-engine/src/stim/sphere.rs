use crate::mesh::{SphereMesh, StimIndex, StimVertex};
use crate::protocol::{
    AddressMode, Backend, Batch, BlendType, CullMode, DatFlags, DatKind, DescriptorType, Filter,
    Format, FrontFace, Id, PolygonMode, ShaderStages, Topology, VertexRate,
};

use super::layer::{Layer, LayerGpu, LayerState, LayerTexture};
use super::push::StimPush;
use super::shaders::Shaders;
use super::Stim;

/// A growable GPU buffer: capacity only increases, and a larger buffer is a new dat.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct DatSlot {
    pub id: Id,
    pub capacity: u64,
}

impl DatSlot {
    fn create(batch: &mut Batch, kind: DatKind, size: u64) -> Self {
        Self {
            id: batch.create_dat(kind, size, DatFlags::NONE),
            capacity: size,
        }
    }

    /// Uploads `data` at offset 0, replacing the dat first if it is too small.
    ///
    /// Returns `true` when the dat was replaced.
    fn upload(&mut self, batch: &mut Batch, kind: DatKind, data: &[u8]) -> bool {
        let size = data.len() as u64;
        let grown = size > self.capacity;
        if grown {
            *self = Self::create(batch, kind, size);
        }
        batch.upload_dat(self.id, 0, data);
        grown
    }
}

/// Vertex and index buffers shared by every layer pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct SphereBuffers {
    pub vertex: DatSlot,
    pub index: DatSlot,
    pub index_count: u32,
}

impl SphereBuffers {
    pub(crate) fn create(batch: &mut Batch, mesh: &SphereMesh) -> Self {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&mesh.vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&mesh.indices);

        let vertex = DatSlot::create(batch, DatKind::Vertex, vertex_bytes.len() as u64);
        batch.upload_dat(vertex.id, 0, vertex_bytes);
        let index = DatSlot::create(batch, DatKind::Index, index_bytes.len() as u64);
        batch.upload_dat(index.id, 0, index_bytes);

        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

fn create_sphere_pipeline(batch: &mut Batch, shaders: &Shaders) -> Id {
    let graphics = batch.create_graphics();
    shaders.bind_sphere(batch, graphics);

    batch.set_primitive(graphics, Topology::TriangleList);
    batch.set_front(graphics, FrontFace::Clockwise);
    batch.set_cull(graphics, CullMode::None);
    batch.set_polygon(graphics, PolygonMode::Fill);

    batch.set_vertex(
        graphics,
        0,
        std::mem::size_of::<StimVertex>() as u64,
        VertexRate::Vertex,
    );
    batch.set_attr(
        graphics,
        0,
        0,
        Format::R32G32B32Sfloat,
        std::mem::offset_of!(StimVertex, pos) as u64,
    );
    batch.set_attr(
        graphics,
        0,
        1,
        Format::R32G32Sfloat,
        std::mem::offset_of!(StimVertex, uv) as u64,
    );

    batch.set_slot(graphics, 0, DescriptorType::CombinedImageSampler);
    batch.set_push(graphics, ShaderStages::VERTEX_FRAGMENT, 0, StimPush::SIZE);
    graphics
}

impl<B: Backend> Stim<B> {
    /// Replaces the shared sphere vertices.
    ///
    /// # Panics
    /// Panics if `vertices` is empty.
    pub fn set_vertices(&mut self, vertices: &[StimVertex]) {
        assert!(!vertices.is_empty(), "sphere vertices must not be empty");
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        if self.sphere.vertex.upload(&mut self.batch, DatKind::Vertex, bytes) {
            log::debug!("sphere vertex buffer grown to {} bytes", bytes.len());
            let dat = self.sphere.vertex.id;
            for gpu in self.layers.iter().filter_map(Layer::gpu) {
                self.batch.bind_vertex(gpu.graphics, 0, dat, 0);
            }
        }
    }

    /// Replaces the shared sphere indices. Draws use the new index count from the next
    /// update on.
    ///
    /// # Panics
    /// Panics if `indices` is empty.
    pub fn set_indices(&mut self, indices: &[StimIndex]) {
        assert!(!indices.is_empty(), "sphere indices must not be empty");
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        if self.sphere.index.upload(&mut self.batch, DatKind::Index, bytes) {
            log::debug!("sphere index buffer grown to {} bytes", bytes.len());
            let dat = self.sphere.index.id;
            for gpu in self.layers.iter().filter_map(Layer::gpu) {
                self.batch.bind_index(gpu.graphics, dat, 0);
            }
        }
        self.sphere.index_count = indices.len() as u32;
    }

    /// Number of indices drawn per layer.
    pub fn index_count(&self) -> u32 {
        self.sphere.index_count
    }

    /// Creates the pipeline, texture and sampler of an unprepared layer.
    ///
    /// Layers without pixel data stay unprepared until they get some.
    pub(crate) fn prepare_layer(&mut self, layer_idx: u32) {
        let Some(layer) = self.layers.get(layer_idx) else {
            return;
        };
        if !layer.is_blank() {
            return;
        }
        let Some(&LayerTexture {
            format,
            width,
            height,
            ..
        }) = layer.texture.as_ref()
        else {
            log::debug!("layer {layer_idx}: no texture yet, preparation deferred");
            return;
        };
        let filter = Filter::from(layer.interpolation);
        let address_mode = if layer.is_periodic {
            AddressMode::Repeat
        } else {
            AddressMode::ClampToBorder
        };
        let blend = BlendType::from(layer.blend);
        let mask = layer.mask;

        let batch = &mut self.batch;
        let graphics = create_sphere_pipeline(batch, &self.shaders);
        batch.bind_vertex(graphics, 0, self.sphere.vertex.id, 0);
        batch.bind_index(graphics, self.sphere.index.id, 0);

        let shape = [width, height, 1];
        let texture = batch.create_tex(2, format, shape);
        let sampler = batch.create_sampler(filter, address_mode);
        batch.bind_tex(graphics, 0, texture, sampler);

        batch.set_blend(graphics, blend);
        batch.set_mask(graphics, mask);

        log::debug!(
            "layer {layer_idx}: prepared {width}x{height} {format:?}, {filter:?}/{address_mode:?}, {blend:?}"
        );

        if let Some(layer) = self.layers.get_mut(layer_idx) {
            layer.state = LayerState::Ready(LayerGpu {
                graphics,
                texture,
                sampler,
                shape,
                format,
            });
        }
    }

    /// Re-uploads a prepared layer's pixel data if it changed.
    pub(crate) fn upload_layer_texture(&mut self, layer_idx: u32) {
        let Some(layer) = self.layers.get_mut(layer_idx) else {
            return;
        };
        if !layer.is_texture_dirty {
            return;
        }
        let (Some(gpu), Some(texture)) = (layer.gpu(), layer.texture.as_ref()) else {
            return;
        };
        if texture.shape() != gpu.shape || texture.format != gpu.format {
            log::warn!(
                "layer {layer_idx}: texture is {:?} {:?} but the GPU texture was created as {:?} {:?}, upload skipped",
                texture.shape(),
                texture.format,
                gpu.shape,
                gpu.format
            );
            layer.is_texture_dirty = false;
            return;
        }

        log::debug!("layer {layer_idx}: uploading {} texture bytes", texture.byte_len());
        self.batch
            .upload_tex(gpu.texture, [0, 0, 0], gpu.shape, &texture.data);
        layer.is_texture_dirty = false;
    }
}
