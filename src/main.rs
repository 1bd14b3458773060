//! PlaneSim - flight simulator frame core
//!
//! Flies the aircraft over the water until it touches down, in a window or
//! headless with `--headless <frames>`.

use std::path::PathBuf;

use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowId,
};

use planesim::config::AppConfig;
use planesim::scene::{FlightScene, SceneBuilder};
use planesim::systems::{run_headless, WindowSystem};
use planesim_render::gpu::WgpuDevice;

#[derive(Parser)]
#[command(name = "planesim", about = "Flight simulator frame core")]
struct Cli {
    /// Run without a window for at most this many frames
    #[arg(long, value_name = "FRAMES")]
    headless: Option<u64>,

    /// Directory holding default.toml and user.toml
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,
}

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Main application state
struct App {
    config: AppConfig,
    window: Option<WindowSystem>,
    scene: Option<FlightScene>,
    /// First fatal error; reported when the event loop returns
    error: Option<Box<dyn std::error::Error>>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            window: None,
            scene: None,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> AppResult<()> {
        let window = WindowSystem::create(event_loop, &self.config.window)?;
        let device = pollster::block_on(WgpuDevice::new(
            window.window().clone(),
            self.config.window.vsync,
        ))?;
        let scene = SceneBuilder::new(&self.config).build(Box::new(device))?;

        window.request_redraw();
        self.window = Some(window);
        self.scene = Some(scene);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Box<dyn std::error::Error>) {
        log::error!("{}", error);
        self.error.get_or_insert(error);
        self.shutdown(event_loop);
    }

    /// Dispose the scene while the window still exists, then leave the loop
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut scene) = self.scene.take() {
            scene.game.dispose();
        }
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };

        match scene.game.step() {
            Ok(report) => {
                log::debug!(
                    "Frame {}: dt={:.4} updated={} drawn={}",
                    report.frame,
                    report.delta,
                    report.updated.len(),
                    report.render.draw_calls
                );
                if let Some(window) = &self.window {
                    window.update_title(scene.status_line().as_deref());
                }
                if report.exit_requested {
                    let flight = scene.flight.get();
                    log::info!(
                        "Touchdown after {:.1}s of flight ({} frames)",
                        flight.flight_time,
                        report.frame
                    );
                    self.shutdown(event_loop);
                } else if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            Err(e) => self.fail(event_loop, Box::new(e)),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() && self.error.is_none() {
            if let Err(e) = self.start(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Window closed");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(size) => {
                if let Some(scene) = &mut self.scene {
                    scene.game.renderer_mut().resize(size.width, size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => self.shutdown(event_loop),
                    PhysicalKey::Code(KeyCode::KeyF) => {
                        if let Some(window) = &self.window {
                            window.toggle_fullscreen();
                        }
                    }
                    _ => {}
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut scene) = self.scene.take() {
            scene.game.dispose();
        }
    }
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let (config, config_error) = match AppConfig::load_from(&cli.config_dir) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.debug.log_level.as_str()),
    )
    .init();
    log::info!("Starting PlaneSim");
    if let Some(e) = config_error {
        log::warn!("Failed to load config: {}. Using defaults.", e);
    }

    if let Some(frames) = cli.headless {
        let summary = run_headless(&config, frames)?;
        log::info!(
            "Headless run finished: {} frames, altitude {:.1} m{}",
            summary.frames,
            summary.final_altitude,
            if summary.crashed { ", touched down" } else { "" }
        );
        return Ok(());
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
