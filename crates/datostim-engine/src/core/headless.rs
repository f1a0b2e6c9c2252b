use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::input::InputState;
use crate::protocol::RecordingBackend;
use crate::stim::{Stim, StimConfig};
use crate::time::StimClock;

use super::app::{App, AppControl};
use super::ctx::TickCtx;

/// Runs `app` without a window: `setup` and one update, then up to `ticks` timer ticks
/// spaced `period` apart on a simulated clock.
///
/// Returns the cleaned-up backend holding every submission (the initial frame first).
pub fn run_recorded<A: App>(
    config: StimConfig,
    app: &mut A,
    ticks: u32,
    period: Duration,
) -> Result<RecordingBackend> {
    let mut stim = Stim::new(RecordingBackend::new(), config)?;
    app.setup(&mut stim).context("stimulus setup failed")?;
    stim.update()?;

    let start = Instant::now();
    let mut clock = StimClock::starting_at(start);
    let mut input = InputState::default();
    for step in 1..=ticks {
        let time = clock.tick_at(start + period * step);
        let frame_time = stim.last_present().map(|at| clock.seconds_at(at));
        let mut ctx = TickCtx {
            stim: &mut stim,
            input: &mut input,
            time,
            frame_time,
        };
        if app.on_tick(&mut ctx) == AppControl::Exit {
            log::debug!("headless run: exit after {step} ticks");
            break;
        }
        stim.update()?;
    }

    Ok(stim.cleanup())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rgba8;
    use crate::protocol::{Backend, Request};

    #[derive(Default)]
    struct Blinker {
        seen: Vec<f64>,
        frame_times: Vec<Option<f64>>,
        stop_after: Option<usize>,
    }

    impl App for Blinker {
        fn setup<B: Backend>(&mut self, stim: &mut Stim<B>) -> Result<()> {
            stim.set_background(Rgba8::new(10, 20, 30, 255));
            Ok(())
        }

        fn on_tick<B: Backend>(&mut self, ctx: &mut TickCtx<'_, B>) -> AppControl {
            self.seen.push(ctx.seconds());
            self.frame_times.push(ctx.frame_time);
            let color = if ctx.time.step % 2 == 0 { Rgba8::WHITE } else { Rgba8::BLACK };
            ctx.stim.set_square_color(color);
            match self.stop_after {
                Some(n) if self.seen.len() >= n => AppControl::Exit,
                _ => AppControl::Continue,
            }
        }
    }

    fn ends(batch: &[Request]) -> usize {
        batch
            .iter()
            .filter(|r| matches!(r, Request::RecordEnd { .. }))
            .count()
    }

    #[test]
    fn setup_frame_then_one_frame_per_tick() {
        let mut app = Blinker::default();
        let backend =
            run_recorded(StimConfig::default(), &mut app, 3, Duration::from_millis(50)).unwrap();

        assert_eq!(backend.submissions().len(), 4);
        assert!(backend.submissions().iter().all(|b| ends(b) == 1));
        assert!(backend.is_destroyed());

        assert_eq!(app.seen.len(), 3);
        assert!(app.frame_times.iter().all(Option::is_some));
        assert!((app.seen[0] - 0.05).abs() < 1e-9);
        assert!((app.seen[2] - 0.15).abs() < 1e-9);
    }

    #[test]
    fn exit_skips_the_update_of_that_tick() {
        let mut app = Blinker {
            stop_after: Some(2),
            ..Blinker::default()
        };
        let backend =
            run_recorded(StimConfig::default(), &mut app, 10, Duration::from_millis(50)).unwrap();

        assert_eq!(app.seen.len(), 2);
        assert_eq!(backend.submissions().len(), 2);
    }

    #[test]
    fn zero_canvas_fails_before_setup() {
        let mut app = Blinker::default();
        let config = StimConfig {
            width: 0,
            ..StimConfig::default()
        };
        assert!(run_recorded(config, &mut app, 1, Duration::from_millis(50)).is_err());
        assert!(app.seen.is_empty());
    }
}
