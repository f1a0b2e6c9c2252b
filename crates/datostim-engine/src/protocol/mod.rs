//! GPU request protocol.
//!
//! The scene never talks to a graphics API directly. It queues [`Request`]s into a
//! [`Batch`] and hands the batch to a [`Backend`], which owns the actual GPU objects.
//!
//! Resource handles are plain [`Id`]s allocated by the batch at request time, so a
//! resource can be referenced by later requests of the same batch before the backend
//! has created it.

mod backend;
mod batch;
mod id;
mod request;
mod types;

pub use backend::{Backend, RecordingBackend};
pub use batch::Batch;
pub use id::Id;
pub use request::{Request, ShaderSource};
pub use types::{
    AddressMode, BlendType, ColorMask, CullMode, DatFlags, DatKind, DescriptorType, Filter,
    Format, FrontFace, PolygonMode, ShaderStage, ShaderStages, Topology, VertexRate,
};
