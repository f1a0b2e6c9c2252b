//! Stimulus data: raw binary files from the data directory, with procedural fallbacks.
//!
//! Every file is headerless native-endian data:
//! - `model`, `view`, `screen1..3`: one column-major 4×4 `f32` matrix
//! - `vertex`: [`StimVertex`] records, `index`: `u32` indices
//! - `gaussianStencil` (61×61), `sinusoidGrating` (37×1): RGBA8 texels

use std::f32::consts::TAU;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use glam::Mat4;

use datostim_engine::mesh::{SphereMesh, StimIndex, StimVertex};

pub const STENCIL_SIZE: u32 = 61;
pub const GRATING_WIDTH: u32 = 37;

/// RGBA8 texture ready for `set_layer_texture`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rgba8Image {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Everything the demo scene reads from disk.
#[derive(Debug, Clone)]
pub struct Assets {
    pub model: Mat4,
    pub view: Mat4,
    pub projections: [Mat4; 3],
    /// `None` keeps the generated default sphere.
    pub mesh: Option<SphereMesh>,
    pub stencil: Rgba8Image,
    pub grating: Rgba8Image,
}

impl Assets {
    /// Loads the data directory. Missing files fall back to identity matrices, the default
    /// sphere and generated textures; malformed files are errors.
    pub fn load(dir: &Path) -> Result<Self> {
        let data = DataDir(dir.to_path_buf());

        let projections = [
            data.mat4("screen1")?,
            data.mat4("screen2")?,
            data.mat4("screen3")?,
        ];

        let mesh = match (data.vertices()?, data.indices()?) {
            (Some(vertices), Some(indices)) => Some(SphereMesh { vertices, indices }),
            (None, None) => None,
            _ => {
                log::warn!("sphere mesh needs both `vertex` and `index`; using the default sphere");
                None
            }
        };

        let stencil = match data.image("gaussianStencil", STENCIL_SIZE, STENCIL_SIZE)? {
            Some(img) => img,
            None => gaussian_stencil(STENCIL_SIZE),
        };
        let grating = match data.image("sinusoidGrating", GRATING_WIDTH, 1)? {
            Some(img) => img,
            None => sinusoid_grating(GRATING_WIDTH),
        };

        Ok(Self {
            model: data.mat4("model")?,
            view: data.mat4("view")?,
            projections,
            mesh,
            stencil,
            grating,
        })
    }
}

struct DataDir(PathBuf);

impl DataDir {
    /// Reads a whole file; `None` if it does not exist.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.0.join(name);
        match std::fs::read(&path) {
            Ok(bytes) => {
                log::debug!("loaded {} ({} bytes)", path.display(), bytes.len());
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("{} not found, using the built-in fallback", path.display());
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn mat4(&self, name: &str) -> Result<Mat4> {
        let Some(bytes) = self.read(name)? else {
            return Ok(Mat4::IDENTITY);
        };
        parse_mat4(&bytes).with_context(|| format!("parsing matrix `{name}`"))
    }

    fn vertices(&self) -> Result<Option<Vec<StimVertex>>> {
        self.read("vertex")?
            .map(|bytes| parse_records::<StimVertex>(&bytes).context("parsing `vertex`"))
            .transpose()
    }

    fn indices(&self) -> Result<Option<Vec<StimIndex>>> {
        self.read("index")?
            .map(|bytes| parse_records::<StimIndex>(&bytes).context("parsing `index`"))
            .transpose()
    }

    fn image(&self, name: &str, width: u32, height: u32) -> Result<Option<Rgba8Image>> {
        let Some(data) = self.read(name)? else {
            return Ok(None);
        };
        let expected = width as usize * height as usize * 4;
        ensure!(
            data.len() == expected,
            "`{name}` holds {} bytes, expected {expected} ({width}x{height} RGBA8)",
            data.len()
        );
        Ok(Some(Rgba8Image {
            width,
            height,
            data,
        }))
    }
}

fn parse_mat4(bytes: &[u8]) -> Result<Mat4> {
    ensure!(bytes.len() >= 64, "expected 64 bytes, got {}", bytes.len());
    let cols: [f32; 16] = bytemuck::pod_read_unaligned(&bytes[..64]);
    Ok(Mat4::from_cols_array(&cols))
}

fn parse_records<T: bytemuck::Pod>(bytes: &[u8]) -> Result<Vec<T>> {
    let size = std::mem::size_of::<T>();
    ensure!(!bytes.is_empty(), "file is empty");
    ensure!(
        bytes.len() % size == 0,
        "{} bytes is not a whole number of {size}-byte records",
        bytes.len()
    );
    Ok(bytes.chunks_exact(size).map(bytemuck::pod_read_unaligned).collect())
}

/// Square Gaussian alpha stencil, opaque at the center, sigma of a sixth of the side.
pub fn gaussian_stencil(size: u32) -> Rgba8Image {
    let center = (size as f32 - 1.0) / 2.0;
    let sigma = size as f32 / 6.0;
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let g = (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
            data.extend_from_slice(&[0, 0, 0, (g * 255.0).round() as u8]);
        }
    }
    Rgba8Image {
        width: size,
        height: size,
        data,
    }
}

/// One period of a gray sinusoid across `width` texels, seamless when repeated.
pub fn sinusoid_grating(width: u32) -> Rgba8Image {
    let mut data = Vec::with_capacity((width * 4) as usize);
    for x in 0..width {
        let phase = TAU * x as f32 / width as f32;
        let v = (127.5 + 127.5 * phase.cos()).round() as u8;
        data.extend_from_slice(&[v, v, v, 255]);
    }
    Rgba8Image {
        width,
        height: 1,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("datostim-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn stencil_peaks_at_center() {
        let img = gaussian_stencil(STENCIL_SIZE);
        assert_eq!(img.data.len(), 61 * 61 * 4);
        let alpha = |x: usize, y: usize| img.data[(y * 61 + x) * 4 + 3];
        assert_eq!(alpha(30, 30), 255);
        assert!(alpha(0, 0) < 5);
        assert_eq!(alpha(10, 30), alpha(50, 30));
    }

    #[test]
    fn grating_is_one_period() {
        let img = sinusoid_grating(GRATING_WIDTH);
        assert_eq!((img.width, img.height), (37, 1));
        assert_eq!(img.data[0], 255);
        assert!(img.data[18 * 4] < 5);
        assert!(img.data.chunks_exact(4).all(|t| t[3] == 255 && t[0] == t[1]));
    }

    #[test]
    fn empty_directory_uses_fallbacks() {
        let dir = scratch_dir("empty");
        let assets = Assets::load(&dir).unwrap();
        assert_eq!(assets.model, Mat4::IDENTITY);
        assert_eq!(assets.projections[2], Mat4::IDENTITY);
        assert!(assets.mesh.is_none());
        assert_eq!(assets.stencil, gaussian_stencil(STENCIL_SIZE));
    }

    #[test]
    fn matrices_are_column_major() {
        let dir = scratch_dir("mat");
        let cols: Vec<f32> = (0..16).map(|i| i as f32).collect();
        std::fs::write(dir.join("view"), bytemuck::cast_slice::<f32, u8>(&cols)).unwrap();

        let assets = Assets::load(&dir).unwrap();
        assert_eq!(assets.view.col(1).x, 4.0);
        assert_eq!(assets.view.col(3).w, 15.0);
    }

    #[test]
    fn mesh_files_load_together() {
        let dir = scratch_dir("mesh");
        let vertices = [StimVertex {
            pos: [1.0, 2.0, 3.0],
            uv: [4.0, 5.0],
        }; 3];
        std::fs::write(dir.join("vertex"), bytemuck::cast_slice::<StimVertex, u8>(&vertices)).unwrap();
        std::fs::write(dir.join("index"), bytemuck::cast_slice::<u32, u8>(&[0, 1, 2])).unwrap();

        let mesh = Assets::load(&dir).unwrap().mesh.unwrap();
        assert_eq!(mesh.vertices, vertices.to_vec());
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn truncated_files_are_errors() {
        let dir = scratch_dir("bad");
        std::fs::write(dir.join("index"), [0u8; 6]).unwrap();
        std::fs::write(dir.join("vertex"), [0u8; 20]).unwrap();
        assert!(Assets::load(&dir).is_err());

        let dir = scratch_dir("badimg");
        std::fs::write(dir.join("sinusoidGrating"), [0u8; 12]).unwrap();
        assert!(Assets::load(&dir).is_err());
    }
}
