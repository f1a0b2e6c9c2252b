use std::collections::BTreeMap;

use anyhow::{Context, Result, bail, ensure};

use crate::protocol::{
    BlendType, ColorMask, CullMode, DescriptorType, FrontFace, Id, PolygonMode, ShaderStage,
    ShaderStages, Topology, VertexRate,
};

use super::convert;
use super::resources::Resources;

/// Size of one emulated push block.
pub(super) const PUSH_BLOCK_SIZE: u64 = 256;

#[derive(Debug, Clone, Default)]
pub(super) struct VertexBinding {
    pub stride: u64,
    pub rate: VertexRate,
    /// `(location, format, offset)`
    pub attrs: Vec<(u32, crate::protocol::Format, u64)>,
}

#[derive(Debug, Copy, Clone)]
pub(super) struct PushRange {
    pub stages: ShaderStages,
    pub offset: u32,
    pub size: u32,
}

/// Fixed state accumulated from `Set*` requests.
#[derive(Debug, Clone, Default)]
pub(super) struct GraphicsDesc {
    pub vertex_shader: Option<Id>,
    pub fragment_shader: Option<Id>,
    pub topology: Topology,
    pub front: FrontFace,
    pub cull: CullMode,
    pub polygon: PolygonMode,
    pub vertex: BTreeMap<u32, VertexBinding>,
    pub slots: BTreeMap<u32, DescriptorType>,
    pub push: Option<PushRange>,
    pub blend: BlendType,
    pub mask: ColorMask,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(super) enum SlotBinding {
    Dat { dat: Id, offset: u64 },
    Tex { tex: Id, sampler: Id },
}

pub(super) struct Built {
    pub pipeline: wgpu::RenderPipeline,
    pub group0: wgpu::BindGroupLayout,
}

/// A custom graphics pipeline: its description, its bindings, and the wgpu objects built
/// from them on first use.
#[derive(Default)]
pub(super) struct Graphics {
    pub desc: GraphicsDesc,
    pub vertex_buffers: BTreeMap<u32, (Id, u64)>,
    pub index_buffer: Option<(Id, u64)>,
    pub slot_bindings: BTreeMap<u32, SlotBinding>,
    pub built: Option<Built>,
    pub bind_group: Option<wgpu::BindGroup>,
}

/// Binding numbers used by slot `slot` in bind group 0.
#[inline]
pub(super) fn slot_bindings(slot: u32) -> (u32, u32) {
    (2 * slot, 2 * slot + 1)
}

pub(super) struct BuildCtx<'a> {
    pub device: &'a wgpu::Device,
    pub target_format: wgpu::TextureFormat,
    pub resources: &'a Resources,
    pub push_layout: &'a wgpu::BindGroupLayout,
}

impl Graphics {
    #[inline]
    pub fn has_push(&self) -> bool {
        self.desc.push.is_some()
    }

    /// Drops the built pipeline so the next draw rebuilds it.
    pub fn invalidate(&mut self) {
        self.built = None;
        self.bind_group = None;
    }

    /// Builds the pipeline and bind group if they are missing.
    pub fn ensure_ready(&mut self, id: Id, ctx: &BuildCtx<'_>) -> Result<()> {
        if self.built.is_none() {
            let built = self
                .build(id, ctx)
                .with_context(|| format!("building graphics {id}"))?;
            log::debug!("graphics {id}: pipeline built");
            self.built = Some(built);
            self.bind_group = None;
        }
        if self.bind_group.is_none() {
            self.bind_group = Some(
                self.create_bind_group(id, ctx)
                    .with_context(|| format!("binding resources of graphics {id}"))?,
            );
        }
        Ok(())
    }

    fn group0_entries(&self, resources: &Resources) -> Result<Vec<wgpu::BindGroupLayoutEntry>> {
        let mut entries = Vec::new();
        for (&slot, &kind) in &self.desc.slots {
            let (first, second) = slot_bindings(slot);
            match kind {
                DescriptorType::UniformBuffer => entries.push(wgpu::BindGroupLayoutEntry {
                    binding: first,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }),
                DescriptorType::CombinedImageSampler => {
                    let Some(SlotBinding::Tex { tex, .. }) = self.slot_bindings.get(&slot) else {
                        bail!("slot {slot} has no texture bound");
                    };
                    let tex = resources.texture(*tex)?;
                    let (sample_type, sampler_type) = convert::sample_types(tex.format);
                    let (_, view_dimension) = convert::texture_dimension(tex.dims);
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: first,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type,
                            view_dimension,
                            multisampled: false,
                        },
                        count: None,
                    });
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: second,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(sampler_type),
                        count: None,
                    });
                }
            }
        }
        Ok(entries)
    }

    fn build(&self, id: Id, ctx: &BuildCtx<'_>) -> Result<Built> {
        let desc = &self.desc;
        let vs = desc.vertex_shader.context("no vertex shader")?;
        let vs = ctx.resources.shader(vs)?;
        ensure!(vs.stage == ShaderStage::Vertex, "vertex shader slot holds a fragment shader");
        let fs = match desc.fragment_shader {
            Some(fs) => {
                let fs = ctx.resources.shader(fs)?;
                ensure!(fs.stage == ShaderStage::Fragment, "fragment shader slot holds a vertex shader");
                Some(fs)
            }
            None => None,
        };

        if let Some(push) = desc.push {
            ensure!(push.stages != ShaderStages::NONE, "push range has no shader stage");
            ensure!(
                push.offset as u64 + push.size as u64 <= PUSH_BLOCK_SIZE,
                "push range {}..{} exceeds {PUSH_BLOCK_SIZE} bytes",
                push.offset,
                push.offset + push.size
            );
        }

        let label = format!("datostim graphics {id}");
        let group0 = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&label),
                entries: &self.group0_entries(ctx.resources)?,
            });
        let mut layouts = vec![&group0];
        if self.has_push() {
            layouts.push(ctx.push_layout);
        }
        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&label),
                bind_group_layouts: &layouts,
                immediate_size: 0,
            });

        // Vertex buffer slots must be dense: binding n is buffer slot n.
        let mut attributes = Vec::with_capacity(desc.vertex.len());
        for (expected, (&binding, vb)) in desc.vertex.iter().enumerate() {
            ensure!(
                binding as usize == expected,
                "vertex bindings must be contiguous from 0 (missing {expected})"
            );
            let attrs = vb
                .attrs
                .iter()
                .map(|&(location, format, offset)| {
                    Ok(wgpu::VertexAttribute {
                        format: convert::vertex_format(format)?,
                        offset,
                        shader_location: location,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            attributes.push(attrs);
        }
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = desc
            .vertex
            .values()
            .zip(&attributes)
            .map(|(vb, attrs)| wgpu::VertexBufferLayout {
                array_stride: vb.stride,
                step_mode: convert::step_mode(vb.rate),
                attributes: attrs,
            })
            .collect();

        let targets = [Some(wgpu::ColorTargetState {
            format: ctx.target_format,
            blend: convert::blend_state(desc.blend),
            write_mask: convert::color_writes(desc.mask),
        })];

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vs.module,
                    entry_point: Some("main"),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },
                fragment: fs.map(|fs| wgpu::FragmentState {
                    module: &fs.module,
                    entry_point: Some("main"),
                    compilation_options: Default::default(),
                    targets: &targets,
                }),
                primitive: wgpu::PrimitiveState {
                    topology: convert::topology(desc.topology),
                    strip_index_format: None,
                    front_face: convert::front_face(desc.front),
                    cull_mode: convert::cull_mode(desc.cull),
                    polygon_mode: convert::polygon_mode(desc.polygon),
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        Ok(Built { pipeline, group0 })
    }

    fn create_bind_group(&self, id: Id, ctx: &BuildCtx<'_>) -> Result<wgpu::BindGroup> {
        let Some(built) = self.built.as_ref() else {
            bail!("pipeline not built");
        };

        let mut entries = Vec::new();
        for (&slot, &kind) in &self.desc.slots {
            let (first, second) = slot_bindings(slot);
            match (kind, self.slot_bindings.get(&slot)) {
                (DescriptorType::UniformBuffer, Some(&SlotBinding::Dat { dat, offset })) => {
                    let dat = ctx.resources.dat(dat)?;
                    entries.push(wgpu::BindGroupEntry {
                        binding: first,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: &dat.buffer,
                            offset,
                            size: None,
                        }),
                    });
                }
                (DescriptorType::CombinedImageSampler, Some(&SlotBinding::Tex { tex, sampler })) => {
                    let tex = ctx.resources.texture(tex)?;
                    let sampler = ctx.resources.sampler(sampler)?;
                    entries.push(wgpu::BindGroupEntry {
                        binding: first,
                        resource: wgpu::BindingResource::TextureView(&tex.view),
                    });
                    entries.push(wgpu::BindGroupEntry {
                        binding: second,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    });
                }
                (kind, bound) => bail!("slot {slot} expects {kind:?}, bound {bound:?}"),
            }
        }

        Ok(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("datostim graphics {id} bind group")),
            layout: &built.group0,
            entries: &entries,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_use_two_bindings_each() {
        assert_eq!(slot_bindings(0), (0, 1));
        assert_eq!(slot_bindings(3), (6, 7));
    }

    #[test]
    fn new_graphics_has_no_push_and_writes_all() {
        let g = Graphics::default();
        assert!(!g.has_push());
        assert_eq!(g.desc.mask, ColorMask::ALL);
        assert_eq!(g.desc.blend, BlendType::Disable);
        assert_eq!(g.desc.topology, Topology::TriangleList);
    }
}
