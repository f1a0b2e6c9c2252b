use std::ops::Range;

use anyhow::{Result, ensure};

use crate::protocol::Id;

use super::pipeline::PUSH_BLOCK_SIZE;

const BLOCK: usize = PUSH_BLOCK_SIZE as usize;

/// A command recorded between `RecordBegin` and `RecordEnd`, replayed into one render pass.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Cmd {
    Viewport {
        offset: [f32; 2],
        shape: [f32; 2],
    },
    Draw {
        graphics: Id,
        vertices: Range<u32>,
        instances: Range<u32>,
        push: Option<u32>,
    },
    DrawIndexed {
        graphics: Id,
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
        push: Option<u32>,
    },
}

/// Command list of one canvas recording, plus its push blocks.
///
/// Push data persists across draws like native push constants: every push updates the
/// current block, and the next draw that needs push data snapshots it.
#[derive(Debug)]
pub(super) struct Recording {
    pub canvas: Id,
    pub cmds: Vec<Cmd>,
    pub blocks: Vec<[u8; BLOCK]>,
    current: [u8; BLOCK],
    changed: bool,
}

impl Recording {
    pub fn new(canvas: Id) -> Self {
        Self {
            canvas,
            cmds: Vec::new(),
            blocks: Vec::new(),
            current: [0; BLOCK],
            changed: true,
        }
    }

    pub fn push(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let start = offset as usize;
        let end = start + data.len();
        ensure!(end <= BLOCK, "push {start}..{end} exceeds {BLOCK} bytes");
        self.current[start..end].copy_from_slice(data);
        self.changed = true;
        Ok(())
    }

    /// Index of the block a push-using draw reads from.
    pub fn block_for_draw(&mut self) -> u32 {
        if self.changed || self.blocks.is_empty() {
            self.blocks.push(self.current);
            self.changed = false;
        }
        (self.blocks.len() - 1) as u32
    }

    /// Every block laid out at `stride` bytes, ready for one buffer write.
    pub fn block_bytes(&self, stride: u64) -> Vec<u8> {
        let stride = stride as usize;
        let mut out = vec![0u8; self.blocks.len() * stride];
        for (i, block) in self.blocks.iter().enumerate() {
            out[i * stride..i * stride + BLOCK].copy_from_slice(block);
        }
        out
    }

    /// Graphics ids used by draws, in first-use order.
    pub fn graphics(&self) -> Vec<Id> {
        let mut out = Vec::new();
        for cmd in &self.cmds {
            let (Cmd::Draw { graphics, .. } | Cmd::DrawIndexed { graphics, .. }) = cmd else {
                continue;
            };
            if !out.contains(graphics) {
                out.push(*graphics);
            }
        }
        out
    }
}

/// Clips a viewport to a `width × height` target.
///
/// Returns `None` when nothing of it is visible; draws under such a viewport are skipped.
pub(super) fn clip_viewport(
    offset: [f32; 2],
    shape: [f32; 2],
    width: u32,
    height: u32,
) -> Option<[f32; 4]> {
    let (tw, th) = (width as f32, height as f32);
    let x0 = offset[0].clamp(0.0, tw);
    let y0 = offset[1].clamp(0.0, th);
    let x1 = (offset[0] + shape[0]).clamp(0.0, tw);
    let y1 = (offset[1] + shape[1]).clamp(0.0, th);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some([x0, y0, x1 - x0, y1 - y0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_without_new_push_share_a_block() {
        let mut rec = Recording::new(Id::new(1));
        assert_eq!(rec.block_for_draw(), 0);
        assert_eq!(rec.block_for_draw(), 0);

        rec.push(0, &[1, 2, 3, 4]).unwrap();
        assert_eq!(rec.block_for_draw(), 1);
        rec.push(4, &[9]).unwrap();
        assert_eq!(rec.block_for_draw(), 2);

        assert_eq!(rec.blocks[2][..5], [1, 2, 3, 4, 9]);
        assert_eq!(rec.blocks[0][..4], [0, 0, 0, 0]);
    }

    #[test]
    fn push_past_block_end_is_rejected() {
        let mut rec = Recording::new(Id::new(1));
        assert!(rec.push(250, &[0; 8]).is_err());
        assert!(rec.push(0, &[0; 256]).is_ok());
    }

    #[test]
    fn block_bytes_respects_stride() {
        let mut rec = Recording::new(Id::new(1));
        rec.push(0, &[7]).unwrap();
        rec.block_for_draw();
        rec.push(0, &[8]).unwrap();
        rec.block_for_draw();

        let bytes = rec.block_bytes(512);
        assert_eq!(bytes.len(), 1024);
        assert_eq!(bytes[0], 7);
        assert_eq!(bytes[512], 8);
    }

    #[test]
    fn graphics_are_listed_once() {
        let mut rec = Recording::new(Id::new(1));
        let (a, b) = (Id::new(2), Id::new(3));
        for g in [a, b, a] {
            rec.cmds.push(Cmd::Draw {
                graphics: g,
                vertices: 0..6,
                instances: 0..1,
                push: None,
            });
        }
        assert_eq!(rec.graphics(), vec![a, b]);
    }

    #[test]
    fn viewport_clipping() {
        assert_eq!(
            clip_viewport([0.0, 0.0], [320.0, 400.0], 960, 400),
            Some([0.0, 0.0, 320.0, 400.0])
        );
        assert_eq!(
            clip_viewport([900.0, 0.0], [320.0, 400.0], 960, 400),
            Some([900.0, 0.0, 60.0, 400.0])
        );
        assert_eq!(clip_viewport([0.0, 0.0], [0.0, 400.0], 960, 400), None);
        assert_eq!(clip_viewport([1000.0, 0.0], [10.0, 10.0], 960, 400), None);
    }
}
