use anyhow::Result;

use datostim_engine::coords::Rgba8;
use datostim_engine::core::{App, AppControl, TickCtx};
use datostim_engine::input::Key;
use datostim_engine::protocol::{Backend, Format};
use datostim_engine::stim::{Blend, Interpolation, Stim};

use crate::assets::Assets;

pub const SCREEN_COUNT: u32 = 3;
pub const STENCIL_LAYER: u32 = 0;
pub const GRATING_LAYER: u32 = 1;

/// Square color on odd ticks; even ticks use the scene's configured square color.
pub const SQUARE_ALT_COLOR: Rgba8 = Rgba8::new(255, 255, 0, 255);

/// Horizontal texture offset of both layers at `t` seconds: a 5 s sweep from -90° to 60°.
pub fn sweep_offset(t: f64) -> f32 {
    (-90.0 + 30.0 * t.rem_euclid(5.0)) as f32
}

/// Gaussian window over a drifting grating, on three side-by-side screens.
pub struct Program {
    assets: Assets,
    square_colors: [Rgba8; 2],
}

impl Program {
    pub fn new(assets: Assets, square_color: Rgba8) -> Self {
        Self {
            assets,
            square_colors: [square_color, SQUARE_ALT_COLOR],
        }
    }
}

impl App for Program {
    fn setup<B: Backend>(&mut self, stim: &mut Stim<B>) -> Result<()> {
        let assets = &self.assets;
        stim.set_model(assets.model);

        if let Some(mesh) = &assets.mesh {
            stim.set_vertices(&mesh.vertices);
            stim.set_indices(&mesh.indices);
            log::info!(
                "sphere mesh: {} vertices, {} indices",
                mesh.vertices.len(),
                mesh.indices.len()
            );
        }

        let w3 = stim.width() / SCREEN_COUNT;
        let h = stim.height();
        for (i, projection) in (0..SCREEN_COUNT).zip(assets.projections) {
            stim.set_screen(i, i * w3, 0, w3, h)?;
            stim.set_projection(i, projection)?;
        }

        let stencil = &assets.stencil;
        let l = STENCIL_LAYER;
        stim.set_layer_texture(l, Format::R8G8B8A8Unorm, stencil.width, stencil.height, &stencil.data)?;
        stim.set_layer_blend(l, Blend::None)?;
        stim.set_layer_mask(l, false, false, false, true)?;
        stim.set_layer_interpolation(l, Interpolation::Linear)?;
        stim.set_layer_periodic(l, false)?;
        stim.set_layer_view(l, assets.view)?;
        stim.set_layer_angle(l, 0.0)?;
        stim.set_layer_offset(l, -90.0, 0.0)?;
        stim.set_layer_size(l, 64.8, 64.8)?;
        stim.set_layer_min_color(l, Rgba8::TRANSPARENT)?;
        stim.set_layer_max_color(l, Rgba8::WHITE)?;
        stim.set_layer_visible(l, true)?;

        let grating = &assets.grating;
        let l = GRATING_LAYER;
        stim.set_layer_texture(l, Format::R8G8B8A8Unorm, grating.width, grating.height, &grating.data)?;
        stim.set_layer_view(l, assets.view)?;
        stim.set_layer_blend(l, Blend::Destination)?;
        stim.set_layer_mask(l, true, true, true, true)?;
        stim.set_layer_interpolation(l, Interpolation::Linear)?;
        stim.set_layer_periodic(l, true)?;
        stim.set_layer_angle(l, 0.0)?;
        stim.set_layer_offset(l, -90.0, 0.0)?;
        stim.set_layer_size(l, 5.2632, 180.0)?;
        stim.set_layer_min_color(l, Rgba8::TRANSPARENT)?;
        stim.set_layer_max_color(l, Rgba8::WHITE)?;
        stim.set_layer_visible(l, true)?;

        Ok(())
    }

    fn on_tick<B: Backend>(&mut self, ctx: &mut TickCtx<'_, B>) -> AppControl {
        if ctx.input.take_pressed().contains(&Key::Escape) {
            return AppControl::Exit;
        }
        log::trace!(
            "t={:.3} frame={:?} pointer={:?} last key={:?}",
            ctx.seconds(),
            ctx.frame_time,
            ctx.input.pointer,
            ctx.input.last_key
        );

        let offset = sweep_offset(ctx.seconds());
        for layer in [STENCIL_LAYER, GRATING_LAYER] {
            if let Err(e) = ctx.stim.set_layer_offset(layer, offset, 0.0) {
                log::warn!("layer {layer}: {e}");
            }
        }

        let color = self.square_colors[(ctx.time.step % 2) as usize];
        ctx.stim.set_square_color(color);

        AppControl::Continue
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use datostim_engine::core::run_recorded;
    use datostim_engine::protocol::Request;
    use datostim_engine::stim::StimConfig;

    use super::*;

    fn program(config: &StimConfig) -> Program {
        let assets = Assets::load(Path::new("/nonexistent/datostim-data")).unwrap();
        Program::new(assets, config.square_color)
    }

    #[test]
    fn sweep_wraps_every_five_seconds() {
        assert_eq!(sweep_offset(0.0), -90.0);
        assert_eq!(sweep_offset(1.0), -60.0);
        assert!((sweep_offset(4.999) - 59.97).abs() < 1e-3);
        assert_eq!(sweep_offset(5.0), -90.0);
        assert_eq!(sweep_offset(7.5), -15.0);
    }

    #[test]
    fn every_frame_draws_both_layers_on_three_screens() {
        let config = StimConfig::default();
        let mut app = program(&config);
        let backend = run_recorded(config, &mut app, 3, Duration::from_millis(50)).unwrap();

        assert_eq!(backend.submissions().len(), 4);
        for batch in backend.submissions() {
            let indexed = batch
                .iter()
                .filter(|r| matches!(r, Request::RecordDrawIndexed { .. }))
                .count();
            assert_eq!(indexed, 6);
        }
    }

    #[test]
    fn square_alternates_each_tick() {
        let config = StimConfig::default();
        let mut app = program(&config);
        let mut stim = Stim::new(datostim_engine::protocol::RecordingBackend::new(), config.clone()).unwrap();
        app.setup(&mut stim).unwrap();

        let mut input = datostim_engine::input::InputState::default();
        let mut colors = Vec::new();
        for step in 0..3 {
            let mut ctx = TickCtx {
                stim: &mut stim,
                input: &mut input,
                time: datostim_engine::time::StimTime {
                    t: 0.05 * (step + 1) as f64,
                    dt: 0.05,
                    step,
                },
                frame_time: None,
            };
            assert_eq!(app.on_tick(&mut ctx), AppControl::Continue);
            colors.push(stim.square_color());
        }
        assert_eq!(
            colors,
            vec![config.square_color, SQUARE_ALT_COLOR, config.square_color]
        );
        assert_eq!(stim.layer(GRATING_LAYER).unwrap().tex_offset[0], sweep_offset(0.15));
    }
}
