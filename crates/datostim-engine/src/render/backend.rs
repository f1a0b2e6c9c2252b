use std::collections::HashMap;
use std::time::Instant;

use anyhow::{Context, Result, bail, ensure};
use winit::dpi::PhysicalSize;

use crate::device::{Gpu, SurfaceErrorAction};
use crate::protocol::{AddressMode, Backend, Batch, DatKind, Id, Request, ShaderSource, ShaderStage};

use super::convert;
use super::pipeline::{BuildCtx, Graphics, PUSH_BLOCK_SIZE, PushRange, SlotBinding};
use super::recording::{Cmd, Recording, clip_viewport};
use super::resources::{Canvas, Dat, Resources, Shader, Tex};

const INITIAL_PUSH_BLOCKS: u64 = 64;

/// Uniform buffer standing in for push constants: one block per recorded push, selected
/// with a dynamic offset at bind group 1.
struct PushBuffer {
    layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: u64,
}

impl PushBuffer {
    fn new(device: &wgpu::Device) -> Self {
        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = PUSH_BLOCK_SIZE.next_multiple_of(align.max(1));

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("datostim push bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(PUSH_BLOCK_SIZE),
                },
                count: None,
            }],
        });
        let (buffer, bind_group) = Self::allocate(device, &layout, stride, INITIAL_PUSH_BLOCKS);

        Self {
            layout,
            buffer,
            bind_group,
            stride,
            capacity: INITIAL_PUSH_BLOCKS,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        blocks: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("datostim push ubo"),
            size: stride * blocks,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("datostim push bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(PUSH_BLOCK_SIZE),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, blocks: u64) {
        if blocks <= self.capacity {
            return;
        }
        let capacity = blocks.next_power_of_two();
        let (buffer, bind_group) = Self::allocate(device, &self.layout, self.stride, capacity);
        log::debug!("push buffer grown to {capacity} blocks");
        self.buffer = buffer;
        self.bind_group = bind_group;
        self.capacity = capacity;
    }
}

/// [`Backend`] that executes requests with wgpu and presents to the window surface.
///
/// Creation and upload requests run as soon as they are submitted. Recorded commands are
/// buffered until `RecordEnd`, then replayed into a single render pass on the next
/// surface texture, cleared with the canvas clear color.
pub struct WgpuBackend<'w> {
    gpu: Gpu<'w>,
    resources: Resources,
    graphics: HashMap<Id, Graphics>,
    push: PushBuffer,
    recording: Option<Recording>,
    border_supported: bool,
    warned_border: bool,
    frames: u64,
    last_present: Option<Instant>,
}

impl<'w> WgpuBackend<'w> {
    pub fn new(gpu: Gpu<'w>) -> Self {
        let border_supported = gpu
            .features()
            .contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER);
        let push = PushBuffer::new(gpu.device());
        log::debug!(
            "wgpu backend: push stride {} bytes, clamp-to-border {}",
            push.stride,
            if border_supported { "on" } else { "off" }
        );

        Self {
            gpu,
            resources: Resources::default(),
            graphics: HashMap::new(),
            push,
            recording: None,
            border_supported,
            warned_border: false,
            frames: 0,
            last_present: None,
        }
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size);
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn graphics_mut(&mut self, id: Id) -> Result<&mut Graphics> {
        self.graphics
            .get_mut(&id)
            .with_context(|| format!("unknown graphics {id}"))
    }

    /// Graphics whose fixed state changes; the pipeline is rebuilt on next use.
    fn graphics_state(&mut self, id: Id) -> Result<&mut Graphics> {
        let g = self.graphics_mut(id)?;
        if g.built.is_some() {
            log::debug!("graphics {id}: state changed, pipeline will be rebuilt");
            g.invalidate();
        }
        Ok(g)
    }

    fn recording_mut(&mut self, canvas: Id) -> Result<&mut Recording> {
        match self.recording.as_mut() {
            Some(rec) if rec.canvas == canvas => Ok(rec),
            Some(rec) => bail!("recording {} is open, got a command for {canvas}", rec.canvas),
            None => bail!("no recording open on {canvas}"),
        }
    }

    fn process(&mut self, request: Request) -> Result<()> {
        let device = self.gpu.device();
        match request {
            Request::CreateCanvas {
                id,
                width,
                height,
                clear_color,
            } => {
                let size = self.gpu.size();
                if (size.width, size.height) != (width, height) {
                    log::debug!(
                        "canvas {id}: {width}x{height} on a {}x{} surface",
                        size.width,
                        size.height
                    );
                }
                self.resources
                    .canvases
                    .insert(id, Canvas { clear_color });
            }

            Request::CreateGraphics { id } => {
                self.graphics.insert(id, Graphics::default());
            }
            Request::CreateShader { id, stage, source } => {
                let ShaderSource::Wgsl(src) = source;
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&format!("datostim shader {id}")),
                    source: wgpu::ShaderSource::Wgsl(src),
                });
                self.resources.shaders.insert(id, Shader { stage, module });
            }
            Request::SetShader { graphics, shader } => {
                let stage = self.resources.shader(shader)?.stage;
                let desc = &mut self.graphics_state(graphics)?.desc;
                match stage {
                    ShaderStage::Vertex => desc.vertex_shader = Some(shader),
                    ShaderStage::Fragment => desc.fragment_shader = Some(shader),
                }
            }
            Request::SetPrimitive { graphics, topology } => {
                self.graphics_state(graphics)?.desc.topology = topology;
            }
            Request::SetFront { graphics, front } => {
                self.graphics_state(graphics)?.desc.front = front;
            }
            Request::SetCull { graphics, cull } => {
                self.graphics_state(graphics)?.desc.cull = cull;
            }
            Request::SetPolygon { graphics, polygon } => {
                self.graphics_state(graphics)?.desc.polygon = polygon;
            }
            Request::SetVertex {
                graphics,
                binding,
                stride,
                rate,
            } => {
                let vb = self
                    .graphics_state(graphics)?
                    .desc
                    .vertex
                    .entry(binding)
                    .or_default();
                vb.stride = stride;
                vb.rate = rate;
            }
            Request::SetAttr {
                graphics,
                binding,
                location,
                format,
                offset,
            } => {
                let vb = self
                    .graphics_state(graphics)?
                    .desc
                    .vertex
                    .entry(binding)
                    .or_default();
                vb.attrs.retain(|&(l, _, _)| l != location);
                vb.attrs.push((location, format, offset));
            }
            Request::SetSlot {
                graphics,
                slot,
                kind,
            } => {
                self.graphics_state(graphics)?.desc.slots.insert(slot, kind);
            }
            Request::SetPush {
                graphics,
                stages,
                offset,
                size,
            } => {
                self.graphics_state(graphics)?.desc.push = Some(PushRange {
                    stages,
                    offset,
                    size,
                });
            }
            Request::SetBlend { graphics, blend } => {
                self.graphics_state(graphics)?.desc.blend = blend;
            }
            Request::SetMask { graphics, mask } => {
                self.graphics_state(graphics)?.desc.mask = mask;
            }

            Request::CreateDat {
                id,
                kind,
                size,
                flags: _,
            } => {
                let size = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("datostim dat {id}")),
                    size,
                    usage: convert::buffer_usages(kind),
                    mapped_at_creation: false,
                });
                log::debug!("dat {id}: {kind:?}, {size} bytes");
                self.resources.dats.insert(id, Dat { kind, buffer, size });
            }
            Request::UploadDat { dat, offset, data } => {
                let target = self.resources.dat(dat)?;
                ensure!(
                    offset % wgpu::COPY_BUFFER_ALIGNMENT == 0,
                    "dat {dat}: upload offset {offset} is not 4-byte aligned"
                );
                let mut data = data;
                data.resize(
                    data.len().next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize),
                    0,
                );
                ensure!(
                    offset + data.len() as u64 <= target.size,
                    "dat {dat}: upload of {} bytes at {offset} exceeds its {} bytes",
                    data.len(),
                    target.size
                );
                self.gpu.queue().write_buffer(&target.buffer, offset, &data);
            }
            Request::BindVertex {
                graphics,
                binding,
                dat,
                offset,
            } => {
                ensure!(
                    self.resources.dat(dat)?.kind == DatKind::Vertex,
                    "dat {dat} is not a vertex dat"
                );
                self.graphics_mut(graphics)?
                    .vertex_buffers
                    .insert(binding, (dat, offset));
            }
            Request::BindIndex {
                graphics,
                dat,
                offset,
            } => {
                ensure!(
                    self.resources.dat(dat)?.kind == DatKind::Index,
                    "dat {dat} is not an index dat"
                );
                self.graphics_mut(graphics)?.index_buffer = Some((dat, offset));
            }
            Request::BindDat {
                graphics,
                slot,
                dat,
                offset,
            } => {
                let g = self.graphics_mut(graphics)?;
                g.slot_bindings.insert(slot, SlotBinding::Dat { dat, offset });
                g.bind_group = None;
            }

            Request::CreateTex {
                id,
                dims,
                format,
                shape,
            } => {
                let (dimension, view_dimension) = convert::texture_dimension(dims);
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(&format!("datostim tex {id}")),
                    size: wgpu::Extent3d {
                        width: shape[0],
                        height: shape[1],
                        depth_or_array_layers: shape[2],
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension,
                    format: convert::texture_format(format)?,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                });
                let view = texture.create_view(&wgpu::TextureViewDescriptor {
                    dimension: Some(view_dimension),
                    ..Default::default()
                });
                log::debug!("tex {id}: {shape:?} {format:?}");
                self.resources.textures.insert(
                    id,
                    Tex {
                        texture,
                        view,
                        dims,
                        format,
                        shape,
                    },
                );
            }
            Request::UploadTex {
                tex,
                offset,
                shape,
                data,
            } => {
                let target = self.resources.texture(tex)?;
                for axis in 0..3 {
                    ensure!(
                        offset[axis] + shape[axis] <= target.shape[axis],
                        "tex {tex}: upload region {offset:?}+{shape:?} exceeds {:?}",
                        target.shape
                    );
                }
                let texel = target.format.size();
                let expected = (shape[0] * shape[1] * shape[2] * texel) as usize;
                ensure!(
                    data.len() == expected,
                    "tex {tex}: upload of {} bytes, region needs {expected}",
                    data.len()
                );
                self.gpu.queue().write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &target.texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d {
                            x: offset[0],
                            y: offset[1],
                            z: offset[2],
                        },
                        aspect: wgpu::TextureAspect::All,
                    },
                    &data,
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(shape[0] * texel),
                        rows_per_image: Some(shape[1]),
                    },
                    wgpu::Extent3d {
                        width: shape[0],
                        height: shape[1],
                        depth_or_array_layers: shape[2],
                    },
                );
            }
            Request::CreateSampler {
                id,
                filter,
                address_mode,
            } => {
                if address_mode == AddressMode::ClampToBorder
                    && !self.border_supported
                    && !self.warned_border
                {
                    log::warn!("clamp-to-border samplers unsupported, clamping to edge");
                    self.warned_border = true;
                }
                let mode = convert::address_mode(address_mode, self.border_supported);
                let filter = convert::filter_mode(filter);
                let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                    label: Some(&format!("datostim sampler {id}")),
                    address_mode_u: mode,
                    address_mode_v: mode,
                    address_mode_w: mode,
                    mag_filter: filter,
                    min_filter: filter,
                    mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                    border_color: (mode == wgpu::AddressMode::ClampToBorder)
                        .then_some(wgpu::SamplerBorderColor::TransparentBlack),
                    ..Default::default()
                });
                self.resources.samplers.insert(id, sampler);
            }
            Request::BindTex {
                graphics,
                slot,
                tex,
                sampler,
            } => {
                self.resources.texture(tex)?;
                self.resources.sampler(sampler)?;
                // The layout depends on the texture format.
                let g = self.graphics_state(graphics)?;
                g.slot_bindings.insert(slot, SlotBinding::Tex { tex, sampler });
                g.bind_group = None;
            }

            Request::RecordBegin { canvas } => {
                self.resources.canvas(canvas)?;
                if let Some(open) = &self.recording {
                    bail!("record_begin on {canvas} while {} is recording", open.canvas);
                }
                self.recording = Some(Recording::new(canvas));
            }
            Request::RecordViewport {
                canvas,
                offset,
                shape,
            } => {
                self.recording_mut(canvas)?
                    .cmds
                    .push(Cmd::Viewport { offset, shape });
            }
            Request::RecordPush {
                canvas,
                graphics: _,
                stages: _,
                offset,
                data,
            } => {
                self.recording_mut(canvas)?.push(offset, &data)?;
            }
            Request::RecordDraw {
                canvas,
                graphics,
                first_vertex,
                vertex_count,
                first_instance,
                instance_count,
            } => {
                let has_push = self.graphics_mut(graphics)?.has_push();
                let rec = self.recording_mut(canvas)?;
                let push = has_push.then(|| rec.block_for_draw());
                rec.cmds.push(Cmd::Draw {
                    graphics,
                    vertices: first_vertex..first_vertex + vertex_count,
                    instances: first_instance..first_instance + instance_count,
                    push,
                });
            }
            Request::RecordDrawIndexed {
                canvas,
                graphics,
                first_index,
                vertex_offset,
                index_count,
                first_instance,
                instance_count,
            } => {
                let has_push = self.graphics_mut(graphics)?.has_push();
                let rec = self.recording_mut(canvas)?;
                let push = has_push.then(|| rec.block_for_draw());
                rec.cmds.push(Cmd::DrawIndexed {
                    graphics,
                    indices: first_index..first_index + index_count,
                    base_vertex: vertex_offset,
                    instances: first_instance..first_instance + instance_count,
                    push,
                });
            }
            Request::RecordEnd { canvas } => {
                self.recording_mut(canvas)?;
                if let Some(rec) = self.recording.take() {
                    self.present(rec)?;
                }
            }
        }
        Ok(())
    }

    /// Builds what the recording needs, uploads its push blocks, and replays it.
    fn present(&mut self, rec: Recording) -> Result<()> {
        let canvas = self.resources.canvas(rec.canvas)?;

        let ctx = BuildCtx {
            device: self.gpu.device(),
            target_format: self.gpu.surface_format(),
            resources: &self.resources,
            push_layout: &self.push.layout,
        };
        for id in rec.graphics() {
            let g = self
                .graphics
                .get_mut(&id)
                .with_context(|| format!("unknown graphics {id}"))?;
            g.ensure_ready(id, &ctx)?;
        }

        if !rec.blocks.is_empty() {
            self.push
                .ensure_capacity(self.gpu.device(), rec.blocks.len() as u64);
            let bytes = rec.block_bytes(self.push.stride);
            self.gpu.queue().write_buffer(&self.push.buffer, 0, &bytes);
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => match self.gpu.handle_surface_error(err) {
                SurfaceErrorAction::Fatal => bail!("surface error: out of memory"),
                action => {
                    log::warn!("frame {} dropped: {action:?}", self.frames);
                    return Ok(());
                }
            },
        };

        let size = self.gpu.size();
        {
            let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("datostim canvas pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(convert::clear_color(canvas.clear_color)),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let mut visible = true;
            for cmd in &rec.cmds {
                match cmd {
                    Cmd::Viewport { offset, shape } => {
                        match clip_viewport(*offset, *shape, size.width, size.height) {
                            Some([x, y, w, h]) => {
                                pass.set_viewport(x, y, w, h, 0.0, 1.0);
                                visible = true;
                            }
                            None => visible = false,
                        }
                    }
                    Cmd::Draw {
                        graphics,
                        vertices,
                        instances,
                        push,
                    } => {
                        if !visible {
                            continue;
                        }
                        self.bind(&mut pass, *graphics, *push, false)?;
                        pass.draw(vertices.clone(), instances.clone());
                    }
                    Cmd::DrawIndexed {
                        graphics,
                        indices,
                        base_vertex,
                        instances,
                        push,
                    } => {
                        if !visible {
                            continue;
                        }
                        self.bind(&mut pass, *graphics, *push, true)?;
                        pass.draw_indexed(indices.clone(), *base_vertex, instances.clone());
                    }
                }
            }
        }

        self.gpu.submit(frame);
        self.last_present = Some(Instant::now());
        self.frames += 1;
        log::trace!("frame {}: {} commands", self.frames, rec.cmds.len());
        Ok(())
    }

    fn bind(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        id: Id,
        push: Option<u32>,
        indexed: bool,
    ) -> Result<()> {
        let g = self
            .graphics
            .get(&id)
            .with_context(|| format!("unknown graphics {id}"))?;
        let (Some(built), Some(bind_group)) = (g.built.as_ref(), g.bind_group.as_ref()) else {
            bail!("graphics {id} is not ready");
        };

        pass.set_pipeline(&built.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        if let Some(block) = push {
            let offset = block as u64 * self.push.stride;
            pass.set_bind_group(1, &self.push.bind_group, &[offset as u32]);
        }
        for (&binding, &(dat, offset)) in &g.vertex_buffers {
            let dat = self.resources.dat(dat)?;
            pass.set_vertex_buffer(binding, dat.buffer.slice(offset..));
        }
        if indexed {
            let (dat, offset) = g
                .index_buffer
                .with_context(|| format!("graphics {id} has no index buffer"))?;
            let dat = self.resources.dat(dat)?;
            pass.set_index_buffer(dat.buffer.slice(offset..), wgpu::IndexFormat::Uint32);
        }
        Ok(())
    }
}

/// Processes `requests` in order. The first failure drops the rest of them and runs
/// `abort`, which must leave `target` ready for the next batch.
fn process_all<T>(
    target: &mut T,
    requests: Vec<Request>,
    mut process: impl FnMut(&mut T, Request) -> Result<()>,
    abort: impl FnOnce(&mut T),
) -> Result<()> {
    for request in requests {
        let name = request.name();
        if let Err(e) = process(target, request) {
            abort(target);
            return Err(e.context(format!("{name} failed")));
        }
    }
    Ok(())
}

impl Backend for WgpuBackend<'_> {
    fn submit(&mut self, batch: &mut Batch) -> Result<()> {
        process_all(self, batch.take(), Self::process, |b| b.recording = None)
    }

    fn destroy(&mut self) {
        log::debug!(
            "wgpu backend: releasing {} graphics, {} dats, {} textures",
            self.graphics.len(),
            self.resources.dats.len(),
            self.resources.textures.len()
        );
        self.recording = None;
        self.graphics.clear();
        self.resources.clear();
    }

    fn last_present(&self) -> Option<Instant> {
        self.last_present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stand-in for the backend's recording bookkeeping.
    #[derive(Default)]
    struct Recorder {
        recording: Option<Recording>,
        draws: usize,
    }

    impl Recorder {
        fn process(&mut self, request: Request) -> Result<()> {
            match request {
                Request::RecordBegin { canvas } => {
                    if let Some(open) = &self.recording {
                        bail!("record_begin on {canvas} while {} is recording", open.canvas);
                    }
                    self.recording = Some(Recording::new(canvas));
                }
                Request::RecordDraw { vertex_count: 0, .. } => bail!("empty draw"),
                Request::RecordDraw { .. } => self.draws += 1,
                Request::RecordEnd { .. } => self.recording = None,
                _ => {}
            }
            Ok(())
        }
    }

    fn frame(vertex_count: u32) -> Vec<Request> {
        let (canvas, graphics) = (Id::new(1), Id::new(2));
        let mut batch = Batch::new();
        batch.record_begin(canvas);
        batch.record_draw(canvas, graphics, 0, vertex_count, 0, 1);
        batch.record_draw(canvas, graphics, 0, 6, 0, 1);
        batch.record_end(canvas);
        batch.take()
    }

    #[test]
    fn failed_batch_does_not_leave_a_recording_open() {
        let mut r = Recorder::default();
        let err = process_all(&mut r, frame(0), Recorder::process, |r| r.recording = None)
            .unwrap_err();
        assert!(format!("{err:#}").contains("record_draw failed"));
        assert!(r.recording.is_none());
        assert_eq!(r.draws, 0);

        process_all(&mut r, frame(6), Recorder::process, |r| r.recording = None).unwrap();
        assert_eq!(r.draws, 2);
    }
}
