use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::protocol::{DatKind, Format, Id, ShaderStage};

pub(super) struct Shader {
    pub stage: ShaderStage,
    pub module: wgpu::ShaderModule,
}

pub(super) struct Dat {
    pub kind: DatKind,
    pub buffer: wgpu::Buffer,
    pub size: u64,
}

pub(super) struct Tex {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub dims: u32,
    pub format: Format,
    pub shape: [u32; 3],
}

#[derive(Debug, Copy, Clone)]
pub(super) struct Canvas {
    pub clear_color: [u8; 4],
}

/// Every GPU object created through the protocol, apart from pipelines.
#[derive(Default)]
pub(super) struct Resources {
    pub shaders: HashMap<Id, Shader>,
    pub dats: HashMap<Id, Dat>,
    pub textures: HashMap<Id, Tex>,
    pub samplers: HashMap<Id, wgpu::Sampler>,
    pub canvases: HashMap<Id, Canvas>,
}

impl Resources {
    pub fn shader(&self, id: Id) -> Result<&Shader> {
        self.shaders.get(&id).with_context(|| format!("unknown shader {id}"))
    }

    pub fn dat(&self, id: Id) -> Result<&Dat> {
        self.dats.get(&id).with_context(|| format!("unknown dat {id}"))
    }

    pub fn texture(&self, id: Id) -> Result<&Tex> {
        self.textures.get(&id).with_context(|| format!("unknown texture {id}"))
    }

    pub fn sampler(&self, id: Id) -> Result<&wgpu::Sampler> {
        self.samplers.get(&id).with_context(|| format!("unknown sampler {id}"))
    }

    pub fn canvas(&self, id: Id) -> Result<Canvas> {
        self.canvases
            .get(&id)
            .copied()
            .with_context(|| format!("unknown canvas {id}"))
    }

    pub fn clear(&mut self) {
        self.shaders.clear();
        self.dats.clear();
        self.textures.clear();
        self.samplers.clear();
        self.canvases.clear();
    }
}
