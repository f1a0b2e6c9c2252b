//! Protocol → wgpu conversions.

use anyhow::{Result, bail};

use crate::protocol::{
    AddressMode, BlendType, ColorMask, CullMode, DatKind, Filter, Format, FrontFace, PolygonMode,
    Topology, VertexRate,
};

pub(super) fn vertex_format(format: Format) -> Result<wgpu::VertexFormat> {
    Ok(match format {
        Format::R32Sfloat => wgpu::VertexFormat::Float32,
        Format::R32G32Sfloat => wgpu::VertexFormat::Float32x2,
        Format::R32G32B32Sfloat => wgpu::VertexFormat::Float32x3,
        Format::R32G32B32A32Sfloat => wgpu::VertexFormat::Float32x4,
        Format::R8G8B8A8Unorm => wgpu::VertexFormat::Unorm8x4,
        Format::R8Unorm | Format::B8G8R8A8Unorm => {
            bail!("{format:?} is not a supported vertex attribute format")
        }
    })
}

pub(super) fn texture_format(format: Format) -> Result<wgpu::TextureFormat> {
    Ok(match format {
        Format::R8Unorm => wgpu::TextureFormat::R8Unorm,
        Format::R8G8B8A8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        Format::B8G8R8A8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        Format::R32Sfloat => wgpu::TextureFormat::R32Float,
        Format::R32G32Sfloat => wgpu::TextureFormat::Rg32Float,
        Format::R32G32B32A32Sfloat => wgpu::TextureFormat::Rgba32Float,
        Format::R32G32B32Sfloat => bail!("{format:?} is not a supported texture format"),
    })
}

/// Sample and sampler binding types for a texture of `format`.
///
/// 32-bit float textures are not filterable without an extra device feature.
pub(super) fn sample_types(format: Format) -> (wgpu::TextureSampleType, wgpu::SamplerBindingType) {
    match format {
        Format::R32Sfloat
        | Format::R32G32Sfloat
        | Format::R32G32B32Sfloat
        | Format::R32G32B32A32Sfloat => (
            wgpu::TextureSampleType::Float { filterable: false },
            wgpu::SamplerBindingType::NonFiltering,
        ),
        Format::R8Unorm | Format::R8G8B8A8Unorm | Format::B8G8R8A8Unorm => (
            wgpu::TextureSampleType::Float { filterable: true },
            wgpu::SamplerBindingType::Filtering,
        ),
    }
}

pub(super) fn texture_dimension(dims: u32) -> (wgpu::TextureDimension, wgpu::TextureViewDimension) {
    match dims {
        1 => (wgpu::TextureDimension::D1, wgpu::TextureViewDimension::D1),
        3 => (wgpu::TextureDimension::D3, wgpu::TextureViewDimension::D3),
        _ => (wgpu::TextureDimension::D2, wgpu::TextureViewDimension::D2),
    }
}

pub(super) fn buffer_usages(kind: DatKind) -> wgpu::BufferUsages {
    let usage = match kind {
        DatKind::Vertex => wgpu::BufferUsages::VERTEX,
        DatKind::Index => wgpu::BufferUsages::INDEX,
        DatKind::Uniform => wgpu::BufferUsages::UNIFORM,
    };
    usage | wgpu::BufferUsages::COPY_DST
}

pub(super) fn topology(t: Topology) -> wgpu::PrimitiveTopology {
    match t {
        Topology::PointList => wgpu::PrimitiveTopology::PointList,
        Topology::LineList => wgpu::PrimitiveTopology::LineList,
        Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
    }
}

pub(super) fn front_face(f: FrontFace) -> wgpu::FrontFace {
    match f {
        FrontFace::CounterClockwise => wgpu::FrontFace::Ccw,
        FrontFace::Clockwise => wgpu::FrontFace::Cw,
    }
}

pub(super) fn cull_mode(c: CullMode) -> Option<wgpu::Face> {
    match c {
        CullMode::None => None,
        CullMode::Front => Some(wgpu::Face::Front),
        CullMode::Back => Some(wgpu::Face::Back),
    }
}

pub(super) fn polygon_mode(p: PolygonMode) -> wgpu::PolygonMode {
    match p {
        PolygonMode::Fill => wgpu::PolygonMode::Fill,
        PolygonMode::Line => wgpu::PolygonMode::Line,
        PolygonMode::Point => wgpu::PolygonMode::Point,
    }
}

pub(super) fn step_mode(rate: VertexRate) -> wgpu::VertexStepMode {
    match rate {
        VertexRate::Vertex => wgpu::VertexStepMode::Vertex,
        VertexRate::Instance => wgpu::VertexStepMode::Instance,
    }
}

pub(super) fn blend_state(blend: BlendType) -> Option<wgpu::BlendState> {
    use wgpu::BlendFactor as F;

    let (src_factor, dst_factor) = match blend {
        BlendType::Disable => return None,
        BlendType::Destination => (F::DstAlpha, F::OneMinusDstAlpha),
        BlendType::Source => (F::SrcAlpha, F::OneMinusSrcAlpha),
        BlendType::OneMinusSource => (F::OneMinusSrcAlpha, F::SrcAlpha),
    };
    let component = wgpu::BlendComponent {
        src_factor,
        dst_factor,
        operation: wgpu::BlendOperation::Add,
    };
    Some(wgpu::BlendState {
        color: component,
        alpha: component,
    })
}

pub(super) fn color_writes(mask: ColorMask) -> wgpu::ColorWrites {
    let mut writes = wgpu::ColorWrites::empty();
    for (channel, flag) in [
        (ColorMask::R, wgpu::ColorWrites::RED),
        (ColorMask::G, wgpu::ColorWrites::GREEN),
        (ColorMask::B, wgpu::ColorWrites::BLUE),
        (ColorMask::A, wgpu::ColorWrites::ALPHA),
    ] {
        if mask.contains(channel) {
            writes |= flag;
        }
    }
    writes
}

pub(super) fn filter_mode(filter: Filter) -> wgpu::FilterMode {
    match filter {
        Filter::Nearest => wgpu::FilterMode::Nearest,
        Filter::Linear => wgpu::FilterMode::Linear,
    }
}

/// Address mode for a sampler. Clamp-to-border needs a device feature; without it the
/// sampler clamps to the edge texel.
pub(super) fn address_mode(mode: AddressMode, border_supported: bool) -> wgpu::AddressMode {
    match mode {
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        AddressMode::ClampToBorder if border_supported => wgpu::AddressMode::ClampToBorder,
        AddressMode::ClampToBorder => wgpu::AddressMode::ClampToEdge,
    }
}

pub(super) fn clear_color(rgba: [u8; 4]) -> wgpu::Color {
    let c = |v: u8| v as f64 / 255.0;
    wgpu::Color {
        r: c(rgba[0]),
        g: c(rgba[1]),
        b: c(rgba[2]),
        a: c(rgba[3]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_maps_channel_by_channel() {
        assert_eq!(color_writes(ColorMask::ALL), wgpu::ColorWrites::ALL);
        assert_eq!(color_writes(ColorMask::A), wgpu::ColorWrites::ALPHA);
        assert_eq!(color_writes(ColorMask::NONE), wgpu::ColorWrites::empty());
        assert_eq!(
            color_writes(ColorMask::R | ColorMask::B),
            wgpu::ColorWrites::RED | wgpu::ColorWrites::BLUE
        );
    }

    #[test]
    fn destination_blend_uses_destination_alpha() {
        assert!(blend_state(BlendType::Disable).is_none());
        let b = blend_state(BlendType::Destination).unwrap();
        assert_eq!(b.color.src_factor, wgpu::BlendFactor::DstAlpha);
        assert_eq!(b.color.dst_factor, wgpu::BlendFactor::OneMinusDstAlpha);

        let b = blend_state(BlendType::OneMinusSource).unwrap();
        assert_eq!(b.color.src_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(b.color.dst_factor, wgpu::BlendFactor::SrcAlpha);
    }

    #[test]
    fn border_falls_back_to_edge() {
        assert_eq!(
            address_mode(AddressMode::ClampToBorder, true),
            wgpu::AddressMode::ClampToBorder
        );
        assert_eq!(
            address_mode(AddressMode::ClampToBorder, false),
            wgpu::AddressMode::ClampToEdge
        );
        assert_eq!(address_mode(AddressMode::Repeat, false), wgpu::AddressMode::Repeat);
    }

    #[test]
    fn formats() {
        assert_eq!(
            vertex_format(Format::R32G32B32Sfloat).unwrap(),
            wgpu::VertexFormat::Float32x3
        );
        assert_eq!(
            texture_format(Format::R8G8B8A8Unorm).unwrap(),
            wgpu::TextureFormat::Rgba8Unorm
        );
        assert!(texture_format(Format::R32G32B32Sfloat).is_err());
        assert!(vertex_format(Format::R8Unorm).is_err());
        assert_eq!(
            sample_types(Format::R32Sfloat).1,
            wgpu::SamplerBindingType::NonFiltering
        );
    }

    #[test]
    fn clear_color_is_normalized() {
        let c = clear_color([255, 0, 51, 255]);
        assert_eq!((c.r, c.g, c.a), (1.0, 0.0, 1.0));
        assert!((c.b - 0.2).abs() < 1e-9);
    }
}
