use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, TickCtx};
use crate::device::{Gpu, GpuInit};
use crate::input::InputState;
use crate::input::platform::translate_window_event;
use crate::render::WgpuBackend;
use crate::stim::{Stim, StimConfig};
use crate::time::StimClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    /// Period of the stimulus timer.
    pub timer: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "datostim".to_string(),
            timer: Duration::from_millis(50),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window sized to the canvas and runs `app` in it until it exits or the
    /// window closes.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, stim_config: StimConfig, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, stim_config, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    input: InputState,
    clock: StimClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    stim: Stim<WgpuBackend<'this>>,
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    stim_config: StimConfig,
    app: A,

    window: Option<WindowEntry>,
    next_tick: Instant,
    exit_requested: bool,
    failure: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, stim_config: StimConfig, app: A) -> Self {
        Self {
            config,
            gpu_init,
            stim_config,
            app,
            window: None,
            next_tick: Instant::now(),
            exit_requested: false,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure.get_or_insert(err);
        self.request_exit(event_loop);
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        if let Some(mut entry) = self.window.take() {
            entry.with_stim_mut(|stim| stim.release());
        }
        event_loop.exit();
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.stim_config.width, self.stim_config.height))
            .with_resizable(false);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let stim_config = self.stim_config.clone();

        WindowEntryTryBuilder {
            input: InputState::default(),
            clock: StimClock::new(),
            window,
            stim_builder: |w| {
                pollster::block_on(Gpu::new(w, gpu_init))
                    .context("GPU initialization failed for window")
                    .and_then(|gpu| {
                        Stim::new(WgpuBackend::new(gpu), stim_config).map_err(anyhow::Error::from)
                    })
            },
        }
        .try_build()
    }

    /// Creates the window and scene, runs `setup`, and shows the first frame.
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let mut entry = self.create_window_entry(event_loop)?;
        let app = &mut self.app;
        entry.with_stim_mut(|stim| -> Result<()> {
            app.setup(stim).context("stimulus setup failed")?;
            stim.update()
        })?;
        self.window = Some(entry);
        self.next_tick = Instant::now() + self.config.timer;
        Ok(())
    }

    /// Runs one timer tick: the app callback, then a scene update.
    fn tick(&mut self) -> Result<AppControl> {
        let (app, window) = (&mut self.app, &mut self.window);
        let Some(entry) = window.as_mut() else {
            return Ok(AppControl::Continue);
        };

        entry.with_mut(|fields| -> Result<AppControl> {
            let time = fields.clock.tick();
            let frame_time = fields.stim.last_present().map(|at| fields.clock.seconds_at(at));
            let control = {
                let mut ctx = TickCtx {
                    stim: &mut *fields.stim,
                    input: &mut *fields.input,
                    time,
                    frame_time,
                };
                app.on_tick(&mut ctx)
            };
            if control == AppControl::Continue {
                fields.stim.update()?;
            }
            Ok(control)
        })
    }

    fn redraw(&mut self) -> Result<()> {
        match self.window.as_mut() {
            Some(entry) => entry.with_stim_mut(|stim| stim.update()),
            None => Ok(()),
        }
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.exit_requested {
            return;
        }

        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e.context("failed to start stimulus window"));
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let now = Instant::now();
        if now >= self.next_tick {
            match self.tick() {
                Ok(AppControl::Continue) => {}
                Ok(AppControl::Exit) => {
                    log::info!("stimulus program requested exit");
                    self.request_exit(event_loop);
                    return;
                }
                Err(e) => {
                    self.fail(event_loop, e.context("stimulus tick failed"));
                    return;
                }
            }

            self.next_tick += self.config.timer;
            if self.next_tick <= now {
                // Fell behind; restart the schedule instead of bursting.
                self.next_tick = now + self.config.timer;
            }
        }

        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_tick));
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let Some(entry) = self.window.as_mut() else {
            return;
        };

        if let Some(ev) = translate_window_event(&event) {
            entry.with_input_mut(|input| input.apply(ev));
        }

        match &event {
            WindowEvent::CloseRequested => {
                log::info!("window closed");
                self.request_exit(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                entry.with_stim_mut(|stim| stim.backend_mut().resize(*new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                entry.with_stim_mut(|stim| stim.backend_mut().resize(new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e.context("redraw failed"));
                }
            }

            _ => {}
        }
    }
}

