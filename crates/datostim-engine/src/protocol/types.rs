use core::ops::{BitOr, BitOrAssign};

/// Pixel / vertex attribute formats understood by the protocol.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Format {
    R8Unorm,
    R8G8B8A8Unorm,
    B8G8R8A8Unorm,
    R32Sfloat,
    R32G32Sfloat,
    R32G32B32Sfloat,
    R32G32B32A32Sfloat,
}

impl Format {
    /// Size of one texel (or one vertex attribute) in bytes.
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            Format::R8Unorm => 1,
            Format::R8G8B8A8Unorm | Format::B8G8R8A8Unorm | Format::R32Sfloat => 4,
            Format::R32G32Sfloat => 8,
            Format::R32G32B32Sfloat => 12,
            Format::R32G32B32A32Sfloat => 16,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Set of shader stages, used by push-constant ranges.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct ShaderStages(u8);

impl ShaderStages {
    pub const NONE: Self = Self(0);
    pub const VERTEX: Self = Self(1);
    pub const FRAGMENT: Self = Self(2);
    pub const VERTEX_FRAGMENT: Self = Self(1 | 2);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for ShaderStages {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Topology {
    PointList,
    LineList,
    #[default]
    TriangleList,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum FrontFace {
    #[default]
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
    Point,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum VertexRate {
    #[default]
    Vertex,
    Instance,
}

/// Kind of resource bound to a pipeline descriptor slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DescriptorType {
    UniformBuffer,
    CombinedImageSampler,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DatKind {
    Vertex,
    Index,
    Uniform,
}

/// Allocation hints for dats.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct DatFlags(u32);

impl DatFlags {
    pub const NONE: Self = Self(0);
    /// The dat is rewritten often; keep a staging copy around.
    pub const PERSISTENT_STAGING: Self = Self(1);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Filter {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum AddressMode {
    Repeat,
    ClampToEdge,
    #[default]
    ClampToBorder,
}

/// Fixed blend state of a pipeline.
///
/// Factors, as `(src, dst)` on the color equation:
/// - `Disable`: `(1, 0)`
/// - `Destination`: `(dst_alpha, 1 - dst_alpha)`
/// - `Source`: `(src_alpha, 1 - src_alpha)`
/// - `OneMinusSource`: `(1 - src_alpha, src_alpha)`
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BlendType {
    #[default]
    Disable,
    Destination,
    Source,
    OneMinusSource,
}

/// Color write mask over the R, G, B and A channels.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ColorMask(u8);

impl ColorMask {
    pub const NONE: Self = Self(0);
    pub const R: Self = Self(1);
    pub const G: Self = Self(2);
    pub const B: Self = Self(4);
    pub const A: Self = Self(8);
    pub const ALL: Self = Self(1 | 2 | 4 | 8);

    /// Builds a mask from per-channel flags.
    pub const fn from_channels(red: bool, green: bool, blue: bool, alpha: bool) -> Self {
        let mut bits = 0;
        if red {
            bits |= Self::R.0;
        }
        if green {
            bits |= Self::G.0;
        }
        if blue {
            bits |= Self::B.0;
        }
        if alpha {
            bits |= Self::A.0;
        }
        Self(bits)
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl Default for ColorMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for ColorMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ColorMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl core::fmt::Debug for ColorMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let ch = |m: ColorMask, c: char| if self.contains(m) { c } else { '-' };
        write!(
            f,
            "ColorMask({}{}{}{})",
            ch(Self::R, 'R'),
            ch(Self::G, 'G'),
            ch(Self::B, 'B'),
            ch(Self::A, 'A')
        )
    }
}
