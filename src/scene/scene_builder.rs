//! SceneBuilder - assembles the flight scene around a graphics device

use std::cell::RefCell;
use std::rc::Rc;

use planesim_engine::{shared, Game, GameError, Renderer, SystemTimer, Timer};
use planesim_render::gpu::{GpuError, GraphicsDevice};

use crate::components::{
    Aircraft, ChaseCamera, FlightHandle, FlightRecorder, MonitoringHeader, WaterSurface,
};
use crate::config::AppConfig;

/// A built scene: the game plus typed handles to the components the
/// application inspects
pub struct FlightScene {
    pub game: Game,
    pub flight: FlightHandle,
    pub recorder: Rc<RefCell<FlightRecorder>>,
    pub header: Option<Rc<RefCell<MonitoringHeader>>>,
}

impl FlightScene {
    /// Status line of the telemetry header, if one is shown
    pub fn status_line(&self) -> Option<String> {
        self.header.as_ref().map(|h| h.borrow().status_line().to_string())
    }
}

/// Builder for the flight scene
///
/// # Example
/// ```ignore
/// let scene = SceneBuilder::new(&config)
///     .with_timer(Box::new(FixedTimer::from_secs(1.0 / 60.0)))
///     .build(Box::new(HeadlessDevice::new(1280, 720)))?;
/// ```
pub struct SceneBuilder<'c> {
    config: &'c AppConfig,
    timer: Option<Box<dyn Timer>>,
}

impl<'c> SceneBuilder<'c> {
    pub fn new(config: &'c AppConfig) -> Self {
        Self { config, timer: None }
    }

    /// Replace the wall-clock timer
    pub fn with_timer(mut self, timer: Box<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Create the components on `device` and register them
    ///
    /// Registration order is draw order: water first, header on top. The
    /// game ends once the aircraft reaches the water. If a component cannot
    /// be created, the partially built game is disposed and nothing stays
    /// allocated on the device.
    pub fn build(self, device: Box<dyn GraphicsDevice>) -> Result<FlightScene, SceneError> {
        let config = self.config;

        let aircraft = Aircraft::new(&config.aircraft);
        let flight = aircraft.handle();

        let camera = ChaseCamera::new(
            flight.clone(),
            config.camera.lens(),
            config.camera.chase_distance,
            config.camera.chase_height,
        );
        let renderer = Renderer::new(device, Box::new(camera))
            .with_clear_color(config.rendering.background_color);
        let timer = self.timer.unwrap_or_else(|| {
            Box::new(SystemTimer::new(config.timing.first_delta, config.timing.max_delta))
        });
        let mut game = Game::new(renderer, timer);

        game.register(shared(aircraft))?;

        let water = WaterSurface::new(game.device_mut()?, &config.water)?;
        game.register(shared(water))?;

        let recorder = shared(FlightRecorder::new(flight.clone(), &config.recorder));
        game.register(recorder.clone())?;

        let header = if config.debug.show_overlay {
            let header = shared(MonitoringHeader::new(game.device_mut()?, flight.clone())?);
            game.register(header.clone())?;
            Some(header)
        } else {
            None
        };

        let crashed = flight.clone();
        game.set_termination(move || crashed.is_crashed());

        log::info!("Flight scene ready with {} components", game.component_count());
        Ok(FlightScene {
            game,
            flight,
            recorder,
            header,
        })
    }
}

/// Error building the flight scene
#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    Gpu(GpuError),
    Game(GameError),
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::Gpu(e) => write!(f, "Failed to create scene resources: {}", e),
            SceneError::Game(e) => write!(f, "Failed to assemble scene: {}", e),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneError::Gpu(e) => Some(e),
            SceneError::Game(e) => Some(e),
        }
    }
}

impl From<GpuError> for SceneError {
    fn from(e: GpuError) -> Self {
        SceneError::Gpu(e)
    }
}

impl From<GameError> for SceneError {
    fn from(e: GameError) -> Self {
        SceneError::Game(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebugConfig;
    use planesim_engine::{FixedTimer, LoopState};
    use planesim_render::gpu::HeadlessDevice;

    fn build(config: &AppConfig, device: HeadlessDevice) -> Result<FlightScene, SceneError> {
        SceneBuilder::new(config)
            .with_timer(Box::new(FixedTimer::from_secs(0.5)))
            .build(Box::new(device))
    }

    #[test]
    fn test_default_scene() {
        let config = AppConfig::default();
        let scene = build(&config, HeadlessDevice::new(320, 240)).unwrap();
        assert_eq!(scene.game.component_count(), 4);
        assert_eq!(scene.game.renderer().draw_list_len(), 2);
        assert!(scene.header.is_some());
    }

    #[test]
    fn test_scene_without_overlay() {
        let config = AppConfig {
            debug: DebugConfig {
                show_overlay: false,
                ..DebugConfig::default()
            },
            ..AppConfig::default()
        };
        let scene = build(&config, HeadlessDevice::new(320, 240)).unwrap();
        assert_eq!(scene.game.component_count(), 3);
        assert_eq!(scene.game.renderer().draw_list_len(), 1);
        assert!(scene.status_line().is_none());
    }

    #[test]
    fn test_scene_ends_on_crash() {
        let mut config = AppConfig::default();
        config.aircraft.initial_altitude = 10.0;
        config.aircraft.sink_rate = 10.0;
        let mut scene = build(&config, HeadlessDevice::new(320, 240)).unwrap();

        // 0.5s steps at 10 m/s: reaches the water on the second frame
        assert_eq!(scene.game.run(Some(100)).unwrap(), 2);
        assert!(scene.flight.is_crashed());
        assert_eq!(scene.game.state(), LoopState::ExitRequested);
        assert_eq!(scene.game.renderer().frames_rendered(), 2);
    }

    #[test]
    fn test_header_draws_over_water() {
        let device = HeadlessDevice::new(320, 240);
        let monitor = device.monitor();
        let mut scene = build(&AppConfig::default(), device).unwrap();
        scene.game.step().unwrap();

        let frame = monitor.last_frame().unwrap();
        let order: Vec<&str> = frame.draws.iter().map(|d| d.vertex_entry.as_str()).collect();
        assert_eq!(order, ["water_vertex", "overlay_vertex"]);
    }

    #[test]
    fn test_failed_component_leaves_device_clean() {
        let device = HeadlessDevice::new(320, 240);
        let monitor = device.monitor();
        monitor.fail_compilation_of("overlay_vertex");

        let config = AppConfig::default();
        let result = build(&config, device);
        assert!(matches!(result, Err(SceneError::Gpu(GpuError::Compile { .. }))));

        // The partial game was dropped, disposing the water surface and the device
        assert!(monitor.is_shut_down());
        assert_eq!(monitor.released_at_shutdown(), 0);
        assert_eq!(monitor.total_created(), monitor.total_released());
    }
}
