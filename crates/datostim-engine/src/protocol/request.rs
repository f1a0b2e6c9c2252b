use std::borrow::Cow;

use super::id::Id;
use super::types::{
    AddressMode, BlendType, ColorMask, CullMode, DatFlags, DatKind, DescriptorType, Filter,
    Format, FrontFace, PolygonMode, ShaderStage, ShaderStages, Topology, VertexRate,
};

/// Shader code attached to a `CreateShader` request.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderSource {
    /// WGSL source. The entry point is `main`.
    Wgsl(Cow<'static, str>),
}

/// A single protocol request.
///
/// Requests fall into three groups:
/// - creation (`Create*`), which introduce a new [`Id`]
/// - pipeline state and bindings (`Set*`, `Bind*`) and data uploads (`Upload*`)
/// - command recording (`Record*`), scoped to a canvas between `RecordBegin` and `RecordEnd`
///
/// Backends must process requests in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    CreateCanvas {
        id: Id,
        width: u32,
        height: u32,
        clear_color: [u8; 4],
    },

    // ── pipelines ─────────────────────────────────────────────────────────
    CreateGraphics {
        id: Id,
    },
    CreateShader {
        id: Id,
        stage: ShaderStage,
        source: ShaderSource,
    },
    SetShader {
        graphics: Id,
        shader: Id,
    },
    SetPrimitive {
        graphics: Id,
        topology: Topology,
    },
    SetFront {
        graphics: Id,
        front: FrontFace,
    },
    SetCull {
        graphics: Id,
        cull: CullMode,
    },
    SetPolygon {
        graphics: Id,
        polygon: PolygonMode,
    },
    SetVertex {
        graphics: Id,
        binding: u32,
        stride: u64,
        rate: VertexRate,
    },
    SetAttr {
        graphics: Id,
        binding: u32,
        location: u32,
        format: Format,
        offset: u64,
    },
    SetSlot {
        graphics: Id,
        slot: u32,
        kind: DescriptorType,
    },
    SetPush {
        graphics: Id,
        stages: ShaderStages,
        offset: u32,
        size: u32,
    },
    SetBlend {
        graphics: Id,
        blend: BlendType,
    },
    SetMask {
        graphics: Id,
        mask: ColorMask,
    },

    // ── dats ──────────────────────────────────────────────────────────────
    CreateDat {
        id: Id,
        kind: DatKind,
        size: u64,
        flags: DatFlags,
    },
    UploadDat {
        dat: Id,
        offset: u64,
        data: Vec<u8>,
    },
    BindVertex {
        graphics: Id,
        binding: u32,
        dat: Id,
        offset: u64,
    },
    BindIndex {
        graphics: Id,
        dat: Id,
        offset: u64,
    },
    BindDat {
        graphics: Id,
        slot: u32,
        dat: Id,
        offset: u64,
    },

    // ── textures ──────────────────────────────────────────────────────────
    CreateTex {
        id: Id,
        dims: u32,
        format: Format,
        shape: [u32; 3],
    },
    UploadTex {
        tex: Id,
        offset: [u32; 3],
        shape: [u32; 3],
        data: Vec<u8>,
    },
    CreateSampler {
        id: Id,
        filter: Filter,
        address_mode: AddressMode,
    },
    BindTex {
        graphics: Id,
        slot: u32,
        tex: Id,
        sampler: Id,
    },

    // ── command recording ─────────────────────────────────────────────────
    RecordBegin {
        canvas: Id,
    },
    RecordViewport {
        canvas: Id,
        offset: [f32; 2],
        shape: [f32; 2],
    },
    RecordDraw {
        canvas: Id,
        graphics: Id,
        first_vertex: u32,
        vertex_count: u32,
        first_instance: u32,
        instance_count: u32,
    },
    RecordDrawIndexed {
        canvas: Id,
        graphics: Id,
        first_index: u32,
        vertex_offset: i32,
        index_count: u32,
        first_instance: u32,
        instance_count: u32,
    },
    RecordPush {
        canvas: Id,
        graphics: Id,
        stages: ShaderStages,
        offset: u32,
        data: Vec<u8>,
    },
    RecordEnd {
        canvas: Id,
    },
}

impl Request {
    /// Returns `true` for requests that belong to a command recording.
    pub fn is_record(&self) -> bool {
        matches!(
            self,
            Request::RecordBegin { .. }
                | Request::RecordViewport { .. }
                | Request::RecordDraw { .. }
                | Request::RecordDrawIndexed { .. }
                | Request::RecordPush { .. }
                | Request::RecordEnd { .. }
        )
    }

    /// Short request name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Request::CreateCanvas { .. } => "create_canvas",
            Request::CreateGraphics { .. } => "create_graphics",
            Request::CreateShader { .. } => "create_shader",
            Request::SetShader { .. } => "set_shader",
            Request::SetPrimitive { .. } => "set_primitive",
            Request::SetFront { .. } => "set_front",
            Request::SetCull { .. } => "set_cull",
            Request::SetPolygon { .. } => "set_polygon",
            Request::SetVertex { .. } => "set_vertex",
            Request::SetAttr { .. } => "set_attr",
            Request::SetSlot { .. } => "set_slot",
            Request::SetPush { .. } => "set_push",
            Request::SetBlend { .. } => "set_blend",
            Request::SetMask { .. } => "set_mask",
            Request::CreateDat { .. } => "create_dat",
            Request::UploadDat { .. } => "upload_dat",
            Request::BindVertex { .. } => "bind_vertex",
            Request::BindIndex { .. } => "bind_index",
            Request::BindDat { .. } => "bind_dat",
            Request::CreateTex { .. } => "create_tex",
            Request::UploadTex { .. } => "upload_tex",
            Request::CreateSampler { .. } => "create_sampler",
            Request::BindTex { .. } => "bind_tex",
            Request::RecordBegin { .. } => "record_begin",
            Request::RecordViewport { .. } => "record_viewport",
            Request::RecordDraw { .. } => "record_draw",
            Request::RecordDrawIndexed { .. } => "record_draw_indexed",
            Request::RecordPush { .. } => "record_push",
            Request::RecordEnd { .. } => "record_end",
        }
    }
}
