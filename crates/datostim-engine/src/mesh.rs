//! Sphere mesh shared by every layer pipeline.

use bytemuck::{Pod, Zeroable};

/// Vertex of the dome-projection sphere.
///
/// Layout (20 bytes):
///
///  offset  0  pos  [f32; 3]   loc 0
///  offset 12  uv   [f32; 2]   loc 1
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct StimVertex {
    pub pos: [f32; 3],
    /// Texture coordinates as `(azimuth, elevation)` in degrees.
    pub uv: [f32; 2],
}

/// Index type of the shared index buffer.
pub type StimIndex = u32;

/// CPU-side sphere geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SphereMesh {
    pub vertices: Vec<StimVertex>,
    pub indices: Vec<StimIndex>,
}

/// Builds a unit UV sphere.
///
/// `rings` splits elevation (`-90°..=90°`), `segments` splits azimuth (`-180°..=180°`).
/// The seam and the poles are duplicated so that every vertex carries its own UV.
pub fn uv_sphere(rings: u32, segments: u32) -> SphereMesh {
    assert!(rings >= 2 && segments >= 3, "sphere needs at least 2 rings and 3 segments");

    let cols = segments + 1;
    let mut vertices = Vec::with_capacity(((rings + 1) * cols) as usize);
    for r in 0..=rings {
        let elevation = -90.0 + 180.0 * r as f32 / rings as f32;
        let el = elevation.to_radians();
        for s in 0..=segments {
            let azimuth = -180.0 + 360.0 * s as f32 / segments as f32;
            let az = azimuth.to_radians();
            vertices.push(StimVertex {
                pos: [el.cos() * az.sin(), el.sin(), -el.cos() * az.cos()],
                uv: [azimuth, elevation],
            });
        }
    }

    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
    for r in 0..rings {
        for s in 0..segments {
            let i0 = r * cols + s;
            let i1 = i0 + 1;
            let i2 = i0 + cols;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }

    SphereMesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_packed() {
        assert_eq!(std::mem::size_of::<StimVertex>(), 20);
        assert_eq!(std::mem::offset_of!(StimVertex, uv), 12);
    }

    #[test]
    fn sphere_counts() {
        let m = uv_sphere(4, 8);
        assert_eq!(m.vertices.len(), 5 * 9);
        assert_eq!(m.indices.len(), 4 * 8 * 6);
        assert!(m.indices.iter().all(|&i| (i as usize) < m.vertices.len()));
    }

    #[test]
    fn sphere_is_unit_and_uv_in_degrees() {
        let m = uv_sphere(6, 12);
        for v in &m.vertices {
            let [x, y, z] = v.pos;
            assert!(((x * x + y * y + z * z).sqrt() - 1.0).abs() < 1e-5);
            assert!((-180.0..=180.0).contains(&v.uv[0]));
            assert!((-90.0..=90.0).contains(&v.uv[1]));
        }
        assert_eq!(m.vertices.first().map(|v| v.uv), Some([-180.0, -90.0]));
        assert_eq!(m.vertices.last().map(|v| v.uv), Some([180.0, 90.0]));
    }
}
