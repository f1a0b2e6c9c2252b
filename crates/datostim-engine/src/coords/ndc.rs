/// Axis-aligned rectangle in normalized device coordinates.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct NdcRect {
    /// Lower-left corner.
    pub origin: [f32; 2],
    pub size: [f32; 2],
}

impl NdcRect {
    /// The whole canvas: `[-1, -1]` to `[+1, +1]`.
    pub const FULL: Self = Self {
        origin: [-1.0, -1.0],
        size: [2.0, 2.0],
    };

    #[inline]
    pub const fn new(origin: [f32; 2], size: [f32; 2]) -> Self {
        Self { origin, size }
    }

    /// Maps a pixel rectangle on a `canvas_w × canvas_h` canvas to NDC.
    ///
    /// Pixel `y` grows with NDC `y`, i.e. it is measured from the bottom edge.
    pub fn from_pixels(x: u32, y: u32, w: u32, h: u32, canvas_w: u32, canvas_h: u32) -> Self {
        assert!(canvas_w > 0 && canvas_h > 0, "canvas size must be non-zero");
        let cw = canvas_w as f32;
        let ch = canvas_h as f32;
        Self {
            origin: [-1.0 + 2.0 * x as f32 / cw, -1.0 + 2.0 * y as f32 / ch],
            size: [2.0 * w as f32 / cw, 2.0 * h as f32 / ch],
        }
    }

    /// Two triangles covering the rectangle, `z = 0`.
    pub fn triangles(self) -> [[f32; 3]; 6] {
        let [x, y] = self.origin;
        let [w, h] = self.size;
        [
            // lower triangle
            [x, y, 0.0],
            [x + w, y, 0.0],
            [x, y + h, 0.0],
            // upper triangle
            [x + w, y + h, 0.0],
            [x, y + h, 0.0],
            [x + w, y, 0.0],
        ]
    }
}
