use super::id::Id;
use super::request::{Request, ShaderSource};
use super::types::{
    AddressMode, BlendType, ColorMask, CullMode, DatFlags, DatKind, DescriptorType, Filter,
    Format, FrontFace, PolygonMode, ShaderStage, ShaderStages, Topology, VertexRate,
};

/// Ordered list of pending requests, plus the id allocator.
///
/// Ids are allocated sequentially and never reused for the lifetime of the batch, so a
/// `Batch` is meant to live as long as the backend it feeds.
///
/// Performance characteristics:
/// - every request helper is O(1) apart from copying its payload
/// - `take()` hands the request buffer over without cloning
///
/// Every helper that takes an existing handle asserts it is not [`Id::NONE`].
#[derive(Debug)]
pub struct Batch {
    requests: Vec<Request>,
    next_id: u64,
}

impl Default for Batch {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            next_id: 1,
        }
    }
}

#[inline]
#[track_caller]
fn ann(id: Id) {
    assert!(!id.is_none(), "required resource id is NONE");
}

impl Batch {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns pending requests in submission order.
    #[inline]
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Removes and returns all pending requests. Id allocation is unaffected.
    #[inline]
    pub fn take(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    /// Drops pending requests without submitting them.
    #[inline]
    pub fn clear(&mut self) {
        self.requests.clear();
    }

    #[inline]
    pub fn push(&mut self, request: Request) {
        self.requests.push(request);
    }

    fn alloc(&mut self) -> Id {
        let id = Id::new(self.next_id);
        self.next_id += 1;
        id
    }

    // ── creation ──────────────────────────────────────────────────────────

    pub fn create_canvas(&mut self, width: u32, height: u32, clear_color: [u8; 4]) -> Id {
        assert!(width > 0 && height > 0, "canvas size must be non-zero");
        let id = self.alloc();
        self.push(Request::CreateCanvas {
            id,
            width,
            height,
            clear_color,
        });
        id
    }

    /// Creates a custom graphics pipeline. Its state is filled by the `set_*` helpers.
    pub fn create_graphics(&mut self) -> Id {
        let id = self.alloc();
        self.push(Request::CreateGraphics { id });
        id
    }

    pub fn create_shader(&mut self, stage: ShaderStage, source: ShaderSource) -> Id {
        let id = self.alloc();
        self.push(Request::CreateShader { id, stage, source });
        id
    }

    pub fn create_dat(&mut self, kind: DatKind, size: u64, flags: DatFlags) -> Id {
        assert!(size > 0, "dat size must be non-zero");
        let id = self.alloc();
        self.push(Request::CreateDat {
            id,
            kind,
            size,
            flags,
        });
        id
    }

    pub fn create_tex(&mut self, dims: u32, format: Format, shape: [u32; 3]) -> Id {
        assert!((1..=3).contains(&dims), "texture dims must be 1, 2 or 3");
        assert!(shape.iter().all(|&s| s > 0), "texture shape must be non-zero");
        let id = self.alloc();
        self.push(Request::CreateTex {
            id,
            dims,
            format,
            shape,
        });
        id
    }

    pub fn create_sampler(&mut self, filter: Filter, address_mode: AddressMode) -> Id {
        let id = self.alloc();
        self.push(Request::CreateSampler {
            id,
            filter,
            address_mode,
        });
        id
    }

    // ── pipeline state ────────────────────────────────────────────────────

    #[track_caller]
    pub fn set_shader(&mut self, graphics: Id, shader: Id) {
        ann(graphics);
        ann(shader);
        self.push(Request::SetShader { graphics, shader });
    }

    #[track_caller]
    pub fn set_primitive(&mut self, graphics: Id, topology: Topology) {
        ann(graphics);
        self.push(Request::SetPrimitive { graphics, topology });
    }

    #[track_caller]
    pub fn set_front(&mut self, graphics: Id, front: FrontFace) {
        ann(graphics);
        self.push(Request::SetFront { graphics, front });
    }

    #[track_caller]
    pub fn set_cull(&mut self, graphics: Id, cull: CullMode) {
        ann(graphics);
        self.push(Request::SetCull { graphics, cull });
    }

    #[track_caller]
    pub fn set_polygon(&mut self, graphics: Id, polygon: PolygonMode) {
        ann(graphics);
        self.push(Request::SetPolygon { graphics, polygon });
    }

    #[track_caller]
    pub fn set_vertex(&mut self, graphics: Id, binding: u32, stride: u64, rate: VertexRate) {
        ann(graphics);
        self.push(Request::SetVertex {
            graphics,
            binding,
            stride,
            rate,
        });
    }

    #[track_caller]
    pub fn set_attr(
        &mut self,
        graphics: Id,
        binding: u32,
        location: u32,
        format: Format,
        offset: u64,
    ) {
        ann(graphics);
        self.push(Request::SetAttr {
            graphics,
            binding,
            location,
            format,
            offset,
        });
    }

    #[track_caller]
    pub fn set_slot(&mut self, graphics: Id, slot: u32, kind: DescriptorType) {
        ann(graphics);
        self.push(Request::SetSlot {
            graphics,
            slot,
            kind,
        });
    }

    #[track_caller]
    pub fn set_push(&mut self, graphics: Id, stages: ShaderStages, offset: u32, size: u32) {
        ann(graphics);
        self.push(Request::SetPush {
            graphics,
            stages,
            offset,
            size,
        });
    }

    #[track_caller]
    pub fn set_blend(&mut self, graphics: Id, blend: BlendType) {
        ann(graphics);
        self.push(Request::SetBlend { graphics, blend });
    }

    #[track_caller]
    pub fn set_mask(&mut self, graphics: Id, mask: ColorMask) {
        ann(graphics);
        self.push(Request::SetMask { graphics, mask });
    }

    // ── data and bindings ─────────────────────────────────────────────────

    #[track_caller]
    pub fn upload_dat(&mut self, dat: Id, offset: u64, data: &[u8]) {
        ann(dat);
        assert!(!data.is_empty(), "dat upload must not be empty");
        self.push(Request::UploadDat {
            dat,
            offset,
            data: data.to_vec(),
        });
    }

    #[track_caller]
    pub fn bind_vertex(&mut self, graphics: Id, binding: u32, dat: Id, offset: u64) {
        ann(graphics);
        ann(dat);
        self.push(Request::BindVertex {
            graphics,
            binding,
            dat,
            offset,
        });
    }

    #[track_caller]
    pub fn bind_index(&mut self, graphics: Id, dat: Id, offset: u64) {
        ann(graphics);
        ann(dat);
        self.push(Request::BindIndex {
            graphics,
            dat,
            offset,
        });
    }

    #[track_caller]
    pub fn bind_dat(&mut self, graphics: Id, slot: u32, dat: Id, offset: u64) {
        ann(graphics);
        ann(dat);
        self.push(Request::BindDat {
            graphics,
            slot,
            dat,
            offset,
        });
    }

    #[track_caller]
    pub fn upload_tex(&mut self, tex: Id, offset: [u32; 3], shape: [u32; 3], data: &[u8]) {
        ann(tex);
        assert!(!data.is_empty(), "texture upload must not be empty");
        self.push(Request::UploadTex {
            tex,
            offset,
            shape,
            data: data.to_vec(),
        });
    }

    #[track_caller]
    pub fn bind_tex(&mut self, graphics: Id, slot: u32, tex: Id, sampler: Id) {
        ann(graphics);
        ann(tex);
        ann(sampler);
        self.push(Request::BindTex {
            graphics,
            slot,
            tex,
            sampler,
        });
    }

    // ── command recording ─────────────────────────────────────────────────

    #[track_caller]
    pub fn record_begin(&mut self, canvas: Id) {
        ann(canvas);
        self.push(Request::RecordBegin { canvas });
    }

    #[track_caller]
    pub fn record_viewport(&mut self, canvas: Id, offset: [f32; 2], shape: [f32; 2]) {
        ann(canvas);
        self.push(Request::RecordViewport {
            canvas,
            offset,
            shape,
        });
    }

    #[track_caller]
    pub fn record_draw(
        &mut self,
        canvas: Id,
        graphics: Id,
        first_vertex: u32,
        vertex_count: u32,
        first_instance: u32,
        instance_count: u32,
    ) {
        ann(canvas);
        ann(graphics);
        self.push(Request::RecordDraw {
            canvas,
            graphics,
            first_vertex,
            vertex_count,
            first_instance,
            instance_count,
        });
    }

    #[allow(clippy::too_many_arguments)]
    #[track_caller]
    pub fn record_draw_indexed(
        &mut self,
        canvas: Id,
        graphics: Id,
        first_index: u32,
        vertex_offset: i32,
        index_count: u32,
        first_instance: u32,
        instance_count: u32,
    ) {
        ann(canvas);
        ann(graphics);
        self.push(Request::RecordDrawIndexed {
            canvas,
            graphics,
            first_index,
            vertex_offset,
            index_count,
            first_instance,
            instance_count,
        });
    }

    #[track_caller]
    pub fn record_push(
        &mut self,
        canvas: Id,
        graphics: Id,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) {
        ann(canvas);
        ann(graphics);
        self.push(Request::RecordPush {
            canvas,
            graphics,
            stages,
            offset,
            data: data.to_vec(),
        });
    }

    #[track_caller]
    pub fn record_end(&mut self, canvas: Id) {
        ann(canvas);
        self.push(Request::RecordEnd { canvas });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_never_none() {
        let mut b = Batch::new();
        let a = b.create_graphics();
        let c = b.create_dat(DatKind::Vertex, 16, DatFlags::NONE);
        assert!(!a.is_none());
        assert_eq!(c.raw(), a.raw() + 1);
    }

    #[test]
    fn take_keeps_id_allocation() {
        let mut b = Batch::new();
        let first = b.create_graphics();
        let taken = b.take();
        assert_eq!(taken.len(), 1);
        assert!(b.is_empty());

        let second = b.create_graphics();
        assert_ne!(first, second);
    }

    #[test]
    fn upload_copies_payload() {
        let mut b = Batch::new();
        let dat = b.create_dat(DatKind::Uniform, 4, DatFlags::NONE);
        let mut bytes = vec![1u8, 2, 3, 4];
        b.upload_dat(dat, 0, &bytes);
        bytes[0] = 9;

        let Request::UploadDat { data, .. } = &b.requests()[1] else {
            panic!("expected upload_dat");
        };
        assert_eq!(data, &vec![1u8, 2, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "NONE")]
    fn none_handle_is_fatal() {
        let mut b = Batch::new();
        b.set_blend(Id::NONE, BlendType::Disable);
    }

    #[test]
    fn record_requests_are_flagged() {
        let mut b = Batch::new();
        let canvas = b.create_canvas(10, 10, [0, 0, 0, 255]);
        b.record_begin(canvas);
        b.record_end(canvas);

        let flags: Vec<bool> = b.requests().iter().map(Request::is_record).collect();
        assert_eq!(flags, vec![false, true, true]);
    }
}
