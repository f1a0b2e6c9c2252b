use anyhow::Result;

use crate::coords::Viewport;
use crate::protocol::{Backend, ShaderStages};

use super::push::StimPush;
use super::Stim;

impl<B: Backend> Stim<B> {
    /// Composes one frame and submits it, together with every queued request.
    ///
    /// Order: background, then for each screen every visible layer, then the square.
    /// Layers are prepared and their textures uploaded first, visible or not.
    pub fn update(&mut self) -> Result<()> {
        let canvas = self.canvas;
        let full = Viewport::full(self.width, self.height);

        self.batch.record_begin(canvas);
        self.batch
            .record_viewport(canvas, full.offset_f32(), full.shape_f32());
        self.background.record_draw(&mut self.batch, canvas);

        let layer_count = self.layers.count() as u32;
        for layer_idx in 0..layer_count {
            self.prepare_layer(layer_idx);
            self.upload_layer_texture(layer_idx);
        }

        let index_count = self.sphere.index_count;
        for (screen_idx, screen) in self.screens.iter().enumerate() {
            let vp = screen.viewport;
            self.batch
                .record_viewport(canvas, vp.offset_f32(), vp.shape_f32());

            for (layer_idx, layer) in self.layers.iter().enumerate() {
                if !layer.is_visible {
                    continue;
                }
                let Some(gpu) = layer.gpu() else {
                    log::debug!("screen {screen_idx}: layer {layer_idx} is visible but not prepared");
                    continue;
                };

                let push = StimPush::new(
                    &self.model,
                    &layer.view,
                    &screen.projection,
                    layer.min_color,
                    layer.max_color,
                    layer.tex_offset,
                    layer.tex_size,
                    layer.tex_angle,
                );
                self.batch.record_push(
                    canvas,
                    gpu.graphics,
                    ShaderStages::VERTEX_FRAGMENT,
                    0,
                    push.as_bytes(),
                );
                self.batch
                    .record_draw_indexed(canvas, gpu.graphics, 0, 0, index_count, 0, 1);
                log::debug!("screen {screen_idx}: layer {layer_idx} drawn");
            }
        }

        self.batch
            .record_viewport(canvas, full.offset_f32(), full.shape_f32());
        self.square.record_draw(&mut self.batch, canvas);
        self.batch.record_end(canvas);

        log::trace!("stim: submitting {} requests", self.batch.len());
        self.backend.submit(&mut self.batch)?;

        for layer in self.layers.iter_mut() {
            layer.is_dirty = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use crate::coords::Rgba8;
    use crate::mesh::StimVertex;
    use crate::protocol::{
        AddressMode, Batch, BlendType, ColorMask, Filter, Format, Id, RecordingBackend, Request,
    };
    use crate::stim::{Blend, Interpolation, LayerState, StimConfig, StimPush};

    use super::*;

    fn stim() -> Stim<RecordingBackend> {
        let config = StimConfig {
            sphere_resolution: [4, 8],
            ..StimConfig::default()
        };
        Stim::new(RecordingBackend::new(), config).unwrap()
    }

    fn textured(s: &mut Stim<RecordingBackend>, layer_idx: u32, visible: bool) {
        let rgba = vec![128u8; 2 * 2 * 4];
        s.set_layer_texture(layer_idx, Format::R8G8B8A8Unorm, 2, 2, &rgba)
            .unwrap();
        s.set_layer_visible(layer_idx, visible).unwrap();
    }

    fn last(s: &Stim<RecordingBackend>) -> Vec<Request> {
        s.backend().last().map(<[Request]>::to_vec).unwrap_or_default()
    }

    fn graphics_of(s: &Stim<RecordingBackend>, layer_idx: u32) -> Id {
        s.layer(layer_idx).and_then(|l| l.gpu()).unwrap().graphics
    }

    /// Draw sequence of a submission: `(viewport index, graphics)` per draw.
    fn draws(requests: &[Request]) -> Vec<(usize, Id)> {
        let mut viewport = 0;
        let mut out = Vec::new();
        for r in requests {
            match r {
                Request::RecordViewport { .. } => viewport += 1,
                Request::RecordDraw { graphics, .. }
                | Request::RecordDrawIndexed { graphics, .. } => out.push((viewport, *graphics)),
                _ => {}
            }
        }
        out
    }

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn count(requests: &[Request], name: &str) -> usize {
        requests.iter().filter(|r| r.name() == name).count()
    }

    #[test]
    fn nothing_is_submitted_before_update() {
        let s = stim();
        assert!(s.backend().submissions().is_empty());
        assert!(!s.pending().is_empty());
    }

    #[test]
    fn first_update_creates_static_resources_then_records() {
        let mut s = stim();
        s.update().unwrap();

        let reqs = last(&s);
        assert_eq!(count(&reqs, "create_shader"), 4);
        assert_eq!(count(&reqs, "create_canvas"), 1);
        assert_eq!(count(&reqs, "create_graphics"), 2);

        let begin = reqs.iter().position(|r| r.name() == "record_begin").unwrap();
        assert!(reqs[..begin].iter().all(|r| !r.is_record()));
        assert_eq!(reqs.last().map(Request::name), Some("record_end"));
    }

    #[test]
    fn empty_scene_draws_background_then_square() {
        let mut s = stim();
        s.update().unwrap();
        s.update().unwrap();

        let reqs = last(&s);
        let names: Vec<&str> = reqs.iter().map(Request::name).collect();
        assert_eq!(
            names,
            [
                "record_begin",
                "record_viewport",
                "record_draw",
                "record_viewport",
                "record_draw",
                "record_end",
            ]
        );
        let d = draws(&reqs);
        assert_eq!(d[0].1, s.background.graphics);
        assert_eq!(d[1].1, s.square.graphics);
    }

    #[test]
    fn screens_outer_layers_inner() {
        let mut s = stim();
        s.set_screen(0, 0, 0, 480, 400).unwrap();
        s.set_screen(1, 480, 0, 480, 400).unwrap();
        textured(&mut s, 0, true);
        textured(&mut s, 1, true);
        s.update().unwrap();

        let l0 = graphics_of(&s, 0);
        let l1 = graphics_of(&s, 1);
        let d = draws(&last(&s));
        assert_eq!(
            d,
            [
                (1, s.background.graphics),
                (2, l0),
                (2, l1),
                (3, l0),
                (3, l1),
                (4, s.square.graphics),
            ]
        );

        let viewports: Vec<([f32; 2], [f32; 2])> = last(&s)
            .iter()
            .filter_map(|r| match r {
                Request::RecordViewport { offset, shape, .. } => Some((*offset, *shape)),
                _ => None,
            })
            .collect();
        assert_eq!(
            viewports,
            [
                ([0.0, 0.0], [960.0, 400.0]),
                ([0.0, 0.0], [480.0, 400.0]),
                ([480.0, 0.0], [480.0, 400.0]),
                ([0.0, 0.0], [960.0, 400.0]),
            ]
        );
    }

    #[test]
    fn each_layer_draw_is_preceded_by_its_push() {
        let mut s = stim();
        s.set_screen(0, 0, 0, 960, 400).unwrap();
        textured(&mut s, 0, true);
        s.update().unwrap();

        let reqs = last(&s);
        let draw = reqs
            .iter()
            .position(|r| matches!(r, Request::RecordDrawIndexed { .. }))
            .unwrap();
        let Request::RecordPush { graphics, stages, offset, data, .. } = &reqs[draw - 1] else {
            panic!("expected record_push before the layer draw");
        };
        assert_eq!(*graphics, graphics_of(&s, 0));
        assert_eq!(*stages, ShaderStages::VERTEX_FRAGMENT);
        assert_eq!(*offset, 0);
        assert_eq!(data.len(), 256);

        let Request::RecordDrawIndexed { index_count, instance_count, .. } = &reqs[draw] else {
            unreachable!();
        };
        assert_eq!(*index_count, s.index_count());
        assert_eq!(*instance_count, 1);
    }

    #[test]
    fn hidden_layers_are_prepared_but_not_drawn() {
        let mut s = stim();
        s.set_screen(0, 0, 0, 960, 400).unwrap();
        textured(&mut s, 0, false);
        s.update().unwrap();

        let layer = s.layer(0).unwrap();
        assert!(matches!(layer.state, LayerState::Ready(_)));
        assert!(!layer.is_texture_dirty);

        let reqs = last(&s);
        assert_eq!(count(&reqs, "upload_tex"), 1);
        assert_eq!(count(&reqs, "record_draw_indexed"), 0);
        assert_eq!(count(&reqs, "record_push"), 0);
    }

    #[test]
    fn layers_are_prepared_exactly_once() {
        let mut s = stim();
        s.set_screen(0, 0, 0, 960, 400).unwrap();
        textured(&mut s, 0, true);
        s.update().unwrap();
        let first = graphics_of(&s, 0);

        s.set_layer_angle(0, 30.0).unwrap();
        s.update().unwrap();
        s.update().unwrap();

        assert_eq!(graphics_of(&s, 0), first);
        let all: Vec<Request> = s.backend().requests().cloned().collect();
        assert_eq!(count(&all, "create_tex"), 1);
        assert_eq!(count(&all, "create_sampler"), 1);
        assert_eq!(count(&all, "create_graphics"), 3);
    }

    #[test]
    fn layer_preparation_uses_layer_state() {
        let mut s = stim();
        textured(&mut s, 0, true);
        s.set_layer_interpolation(0, Interpolation::Linear).unwrap();
        s.set_layer_blend(0, Blend::Destination).unwrap();
        s.set_layer_mask(0, false, false, false, true).unwrap();
        textured(&mut s, 1, true);
        s.set_layer_periodic(1, true).unwrap();
        s.update().unwrap();

        let reqs = last(&s);
        let samplers: Vec<(Filter, AddressMode)> = reqs
            .iter()
            .filter_map(|r| match r {
                Request::CreateSampler { filter, address_mode, .. } => Some((*filter, *address_mode)),
                _ => None,
            })
            .collect();
        assert_eq!(
            samplers,
            [
                (Filter::Linear, AddressMode::ClampToBorder),
                (Filter::Nearest, AddressMode::Repeat),
            ]
        );

        let g0 = graphics_of(&s, 0);
        assert!(reqs.contains(&Request::SetBlend {
            graphics: g0,
            blend: BlendType::Destination,
        }));
        assert!(reqs.contains(&Request::SetMask {
            graphics: g0,
            mask: ColorMask::A,
        }));
        assert!(reqs.contains(&Request::CreateTex {
            id: s.layer(0).and_then(|l| l.gpu()).unwrap().texture,
            dims: 2,
            format: Format::R8G8B8A8Unorm,
            shape: [2, 2, 1],
        }));
    }

    #[test]
    fn fixed_state_changes_after_preparation_are_not_applied() {
        let mut s = stim();
        textured(&mut s, 0, true);
        s.update().unwrap();

        s.set_layer_blend(0, Blend::Source).unwrap();
        s.set_layer_periodic(0, true).unwrap();
        s.update().unwrap();

        let reqs = last(&s);
        assert_eq!(count(&reqs, "set_blend"), 0);
        assert_eq!(count(&reqs, "create_sampler"), 0);
        assert_eq!(s.layer(0).unwrap().blend, Blend::Source);
    }

    #[test]
    fn texture_upload_follows_texture_writes() {
        let mut s = stim();
        textured(&mut s, 0, true);
        s.update().unwrap();
        assert_eq!(count(&last(&s), "upload_tex"), 1);
        assert!(!s.layer(0).unwrap().is_texture_dirty);

        s.update().unwrap();
        assert_eq!(count(&last(&s), "upload_tex"), 0);

        let pixels: Vec<u8> = (0..16).collect();
        s.set_layer_texture(0, Format::R8G8B8A8Unorm, 2, 2, &pixels)
            .unwrap();
        assert!(s.layer(0).unwrap().is_texture_dirty);
        s.update().unwrap();

        let reqs = last(&s);
        let uploads: Vec<&Request> = reqs.iter().filter(|r| r.name() == "upload_tex").collect();
        assert_eq!(uploads.len(), 1);
        let Request::UploadTex { tex, shape, data, .. } = uploads[0] else {
            unreachable!();
        };
        assert_eq!(*tex, s.layer(0).and_then(|l| l.gpu()).unwrap().texture);
        assert_eq!(*shape, [2, 2, 1]);
        assert_eq!(data, &pixels);
        assert!(!s.layer(0).unwrap().is_texture_dirty);
    }

    #[test]
    fn resized_texture_is_not_uploaded_to_old_texture() {
        let mut s = stim();
        textured(&mut s, 0, true);
        s.update().unwrap();

        s.set_layer_texture(0, Format::R8G8B8A8Unorm, 4, 1, &[0u8; 16])
            .unwrap();
        s.update().unwrap();
        assert_eq!(count(&last(&s), "upload_tex"), 0);
        assert!(!s.layer(0).unwrap().is_texture_dirty);
    }

    #[test]
    fn reformatted_texture_is_not_uploaded_to_old_texture() {
        let mut s = stim();
        textured(&mut s, 0, true);
        s.update().unwrap();

        s.set_layer_texture(0, Format::R8Unorm, 2, 2, &[0u8; 4]).unwrap();
        s.update().unwrap();
        assert_eq!(count(&last(&s), "upload_tex"), 0);
        assert!(!s.layer(0).unwrap().is_texture_dirty);
        assert_eq!(s.layer(0).unwrap().gpu().unwrap().format, Format::R8G8B8A8Unorm);

        s.set_layer_texture(0, Format::R8G8B8A8Unorm, 2, 2, &[9u8; 16])
            .unwrap();
        s.update().unwrap();
        assert_eq!(count(&last(&s), "upload_tex"), 1);
    }

    #[test]
    fn layers_without_texture_wait() {
        let mut s = stim();
        s.set_screen(0, 0, 0, 960, 400).unwrap();
        s.set_layer_visible(0, true).unwrap();
        s.update().unwrap();
        assert!(s.layer(0).unwrap().is_blank());
        assert_eq!(count(&last(&s), "record_draw_indexed"), 0);

        textured(&mut s, 0, true);
        s.update().unwrap();
        assert!(!s.layer(0).unwrap().is_blank());
        assert_eq!(count(&last(&s), "record_draw_indexed"), 1);
    }

    #[test]
    fn repeated_updates_are_identical() {
        let mut s = stim();
        s.set_screen(0, 0, 0, 480, 400).unwrap();
        s.set_screen(1, 480, 0, 480, 400).unwrap();
        textured(&mut s, 0, true);
        textured(&mut s, 1, true);
        s.update().unwrap();

        s.update().unwrap();
        let second = last(&s);
        s.update().unwrap();
        let third = last(&s);

        assert_eq!(second, third);
        assert!(second.iter().all(Request::is_record));
    }

    #[test]
    fn push_carries_screen_projection_and_layer_parameters() {
        let mut s = stim();
        let p0 = Mat4::from_scale(glam::Vec3::splat(2.0));
        let p1 = Mat4::from_scale(glam::Vec3::splat(3.0));
        let view = Mat4::from_rotation_y(0.5);
        let model = Mat4::from_translation(glam::Vec3::new(0.0, 1.0, 0.0));

        s.set_model(model);
        s.set_screen(0, 0, 0, 480, 400).unwrap();
        s.set_projection(0, p0).unwrap();
        s.set_screen(1, 480, 0, 480, 400).unwrap();
        s.set_projection(1, p1).unwrap();
        textured(&mut s, 0, true);
        s.set_layer_view(0, view).unwrap();
        s.set_layer_min_color(0, Rgba8::new(0, 255, 255, 255)).unwrap();
        s.set_layer_max_color(0, Rgba8::new(255, 0, 0, 0)).unwrap();
        s.set_layer_offset(0, -90.0, 0.0).unwrap();
        s.set_layer_size(0, 64.8, 64.8).unwrap();
        s.set_layer_angle(0, 15.0).unwrap();
        s.update().unwrap();

        let pushes: Vec<Vec<f32>> = last(&s)
            .iter()
            .filter_map(|r| match r {
                Request::RecordPush { data, .. } => Some(floats(data)),
                _ => None,
            })
            .collect();
        assert_eq!(pushes.len(), 2);

        let expected = |projection: &Mat4| {
            let push = StimPush::new(
                &model,
                &view,
                projection,
                Rgba8::new(0, 255, 255, 255),
                Rgba8::new(255, 0, 0, 0),
                [-90.0, 0.0],
                [64.8, 64.8],
                15.0,
            );
            floats(push.as_bytes())
        };
        assert_eq!(pushes[0], expected(&p0));
        assert_eq!(pushes[1], expected(&p1));
        assert_eq!(pushes[0][48..52], [0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn dirty_flag_clears_after_update() {
        let mut s = stim();
        s.set_layer_angle(0, 1.0).unwrap();
        assert!(s.layer(0).unwrap().is_dirty);
        s.update().unwrap();
        assert!(!s.layer(0).unwrap().is_dirty);
    }

    #[test]
    fn default_square_sits_in_the_top_right_corner() {
        let s = stim();
        let square_vertex = s.square.vertex;
        let data = s
            .pending()
            .requests()
            .iter()
            .find_map(|r| match r {
                Request::UploadDat { dat, data, .. } if *dat == square_vertex => Some(floats(data)),
                _ => None,
            })
            .unwrap();

        let close = |a: f32, b: f32| (a - b).abs() < 1e-4;
        assert!(close(data[0], 0.7917));
        assert!(close(data[1], 0.5));
        assert!(close(data[9], 1.0));
        assert!(close(data[10], 1.0));
    }

    #[test]
    fn square_color_is_reuploaded() {
        let mut s = stim();
        s.update().unwrap();
        s.set_square_color(Rgba8::new(255, 255, 0, 255));
        s.update().unwrap();

        let color_dat = s.square.color;
        let uploads: Vec<Vec<f32>> = last(&s)
            .iter()
            .filter_map(|r| match r {
                Request::UploadDat { dat, data, .. } if *dat == color_dat => Some(floats(data)),
                _ => None,
            })
            .collect();
        assert_eq!(uploads, [vec![1.0, 1.0, 0.0, 1.0]]);
        assert_eq!(s.square_color(), Rgba8::new(255, 255, 0, 255));
    }

    #[test]
    fn larger_mesh_rebinds_prepared_layers() {
        let mut s = stim();
        textured(&mut s, 0, true);
        s.update().unwrap();
        let g0 = graphics_of(&s, 0);

        let vertices = vec![StimVertex::default(); 10_000];
        s.set_vertices(&vertices);
        s.set_indices(&[0, 1, 2]);
        assert_eq!(s.index_count(), 3);
        s.update().unwrap();

        let reqs = last(&s);
        let new_vertex = reqs
            .iter()
            .find_map(|r| match r {
                Request::CreateDat { id, size, .. } if *size == 200_000 => Some(*id),
                _ => None,
            })
            .unwrap();
        assert!(reqs.contains(&Request::BindVertex {
            graphics: g0,
            binding: 0,
            dat: new_vertex,
            offset: 0,
        }));
        assert_eq!(count(&reqs, "bind_index"), 0);

        let Some(Request::RecordDrawIndexed { index_count, .. }) = reqs
            .iter()
            .find(|r| matches!(r, Request::RecordDrawIndexed { .. }))
        else {
            panic!("expected a layer draw");
        };
        assert_eq!(*index_count, 3);
    }

    #[test]
    fn zero_canvas_is_rejected() {
        let config = StimConfig {
            width: 0,
            ..StimConfig::default()
        };
        let err = Stim::new(RecordingBackend::new(), config).unwrap_err();
        assert_eq!(err, crate::stim::StimError::ZeroCanvasSize { width: 0, height: 400 });
    }

    #[test]
    fn out_of_range_screen_is_rejected() {
        let mut s = stim();
        assert!(s.set_screen(8, 0, 0, 10, 10).is_err());
        assert!(s.set_projection(8, Mat4::IDENTITY).is_err());
        assert_eq!(s.screen_count(), 0);

        s.set_projection(2, Mat4::IDENTITY).unwrap();
        assert_eq!(s.screen_count(), 3);
    }

    #[test]
    fn presentation_time_follows_updates() {
        let mut s = stim();
        assert!(s.last_present().is_none());

        s.update().unwrap();
        let first = s.last_present().unwrap();
        s.set_background(Rgba8::WHITE);
        s.update().unwrap();
        assert!(s.last_present().unwrap() >= first);
    }

    #[test]
    fn cleanup_destroys_backend() {
        let mut s = stim();
        textured(&mut s, 0, true);
        s.update().unwrap();
        let backend = s.cleanup();
        assert!(backend.is_destroyed());
        assert_eq!(backend.submissions().len(), 1);
    }

    #[test]
    fn backend_errors_propagate() {
        struct Failing;
        impl Backend for Failing {
            fn submit(&mut self, batch: &mut Batch) -> anyhow::Result<()> {
                batch.clear();
                anyhow::bail!("device lost")
            }
        }

        let mut s = Stim::new(Failing, StimConfig::default()).unwrap();
        let err = s.update().unwrap_err();
        assert_eq!(err.to_string(), "device lost");
    }
}
