//! Telemetry header drawn across the top of the screen

use planesim_engine::{ComponentError, GameComponent, Renderable};
use planesim_math::{mat4, Mat4};
use planesim_render::gpu::{DrawContext, GpuError, GraphicsDevice, OwnedResources, ResourceScope};
use planesim_render::shader::OverlayShader;
use planesim_render::Mesh;

use super::aircraft::FlightHandle;

/// Translucent red, so the scene stays visible behind the header
pub const HEADER_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 0.2];

/// Frames counted over a window of at least one second
#[derive(Debug, Default)]
pub struct FpsCounter {
    frames: u32,
    elapsed: f64,
    fps: u32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame lasting `delta` seconds
    pub fn frame(&mut self, delta: f64) {
        self.frames += 1;
        self.elapsed += delta;
        if self.elapsed >= 1.0 {
            self.fps = (self.frames as f64 / self.elapsed).round() as u32;
            self.frames = 0;
            self.elapsed = 0.0;
        }
    }

    /// Frames per second over the last completed window
    pub fn fps(&self) -> u32 {
        self.fps
    }
}

pub struct MonitoringHeader {
    shader: OverlayShader,
    rect: Mesh,
    resources: OwnedResources,
    flight: FlightHandle,
    device_name: String,
    fps: FpsCounter,
    status: String,
    enabled: bool,
}

impl MonitoringHeader {
    /// Build the header's GPU objects; on failure nothing stays allocated
    pub fn new(device: &mut dyn GraphicsDevice, flight: FlightHandle) -> Result<Self, GpuError> {
        let device_name = device.name().to_string();
        let mut scope = ResourceScope::new(device);
        let mut rect = Mesh::screen_rect(scope.device(), "monitoring_header", [-1.0, 0.9], [1.0, 1.0])?;
        scope.absorb(rect.take_resources());
        let mut shader = OverlayShader::new(scope.device())?;
        scope.absorb(shader.take_resources());

        Ok(Self {
            shader,
            rect,
            resources: scope.commit(),
            flight,
            device_name,
            fps: FpsCounter::new(),
            status: String::new(),
            enabled: true,
        })
    }

    /// Text shown with the header, refreshed every rendered frame
    pub fn status_line(&self) -> &str {
        &self.status
    }

    pub fn fps(&self) -> u32 {
        self.fps.fps()
    }
}

impl GameComponent for MonitoringHeader {
    fn name(&self) -> &str {
        "monitoring_header"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn update_priority(&self) -> i32 {
        100
    }

    fn update(&mut self, delta: f64) -> Result<(), ComponentError> {
        self.fps.frame(delta);
        Ok(())
    }

    fn as_renderable(&mut self) -> Option<&mut dyn Renderable> {
        Some(self)
    }

    fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        self.shader.dispose(device);
        self.rect.dispose(device);
        self.resources.release_all(device);
    }
}

impl Renderable for MonitoringHeader {
    fn render(&mut self, ctx: &mut DrawContext, _view: &Mat4, _projection: &Mat4) -> Result<(), ComponentError> {
        // The rectangle is already in clip space
        self.rect.bind(ctx)?;
        self.shader.render(
            ctx,
            self.rect.index_count(),
            &mat4::IDENTITY,
            &mat4::IDENTITY,
            &mat4::IDENTITY,
            HEADER_COLOR,
        )?;

        let flight = self.flight.get();
        self.status = format!(
            "{} FPS | {} | alt {:.0} m | {:.0} m/s",
            self.fps.fps(),
            self.device_name,
            flight.altitude(),
            flight.speed
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::aircraft::Aircraft;
    use crate::config::AircraftConfig;
    use planesim_render::gpu::HeadlessDevice;

    #[test]
    fn test_fps_window() {
        let mut counter = FpsCounter::new();
        for _ in 0..29 {
            counter.frame(1.0 / 30.0);
        }
        assert_eq!(counter.fps(), 0);
        counter.frame(1.0 / 30.0 + 0.001);
        assert_eq!(counter.fps(), 30);
    }

    #[test]
    fn test_status_line_after_render() {
        let mut device = HeadlessDevice::new(64, 64);
        let aircraft = Aircraft::new(&AircraftConfig::default());
        let mut header = MonitoringHeader::new(&mut device, aircraft.handle()).unwrap();
        assert!(header.status_line().is_empty());

        let mut ctx = DrawContext::new([0.0; 4]);
        header.render(&mut ctx, &mat4::IDENTITY, &mat4::IDENTITY).unwrap();
        assert_eq!(ctx.draw_count(), 1);
        assert!(header.status_line().starts_with("0 FPS | Headless"));

        header.dispose(&mut device);
        assert_eq!(device.live_resources(), 0);
    }

    #[test]
    fn test_failed_shader_releases_rect() {
        let mut device = HeadlessDevice::new(64, 64);
        let monitor = device.monitor();
        monitor.fail_compilation_of("overlay_pixel");

        let aircraft = Aircraft::new(&AircraftConfig::default());
        assert!(MonitoringHeader::new(&mut device, aircraft.handle()).is_err());
        assert_eq!(monitor.live_resources(), 0);
    }
}
