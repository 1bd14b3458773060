//! Frame renderer
//!
//! Owns the graphics device and the draw list. Each frame it records every
//! renderable into one [`DrawContext`] and hands it to the device.

use planesim_render::gpu::{DrawContext, GpuError, GraphicsDevice};
use planesim_render::ViewSource;

use crate::component::ComponentRef;
use crate::error::RenderError;

/// Outcome of one [`Renderer::render`] call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderStats {
    /// Renderables that recorded their work
    pub rendered: usize,
    /// Names of renderables whose render failed; their partial work was dropped
    pub failed: Vec<String>,
    pub draw_calls: usize,
    /// False when the surface was lost and the frame skipped
    pub presented: bool,
}

/// Device owner and ordered draw list
pub struct Renderer {
    device: Box<dyn GraphicsDevice>,
    view_source: Box<dyn ViewSource>,
    draw_list: Vec<ComponentRef>,
    clear_color: [f32; 4],
    frames: u64,
    disposed: bool,
}

impl Renderer {
    pub fn new(device: Box<dyn GraphicsDevice>, view_source: Box<dyn ViewSource>) -> Self {
        log::info!("Renderer created on '{}'", device.name());
        Self {
            device,
            view_source,
            draw_list: Vec::new(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            frames: 0,
            disposed: false,
        }
    }

    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    /// Append to the draw list; draw order is registration order
    pub fn register(&mut self, component: ComponentRef) {
        self.draw_list.push(component);
    }

    pub fn draw_list_len(&self) -> usize {
        self.draw_list.len()
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    /// Device access for creating or releasing resources
    pub fn device_mut(&mut self) -> Result<&mut dyn GraphicsDevice, RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        Ok(self.device.as_mut())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if !self.disposed {
            self.device.resize(width, height);
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Record every renderable in draw-list order and submit the frame
    ///
    /// A renderable that fails is logged and skipped; the rest still draw.
    /// Submission does not wait for the GPU.
    pub fn render(&mut self) -> Result<RenderStats, RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }

        let view = self.view_source.view_matrix();
        let projection = self.view_source.projection_matrix(self.device.aspect_ratio());
        let mut ctx = DrawContext::new(self.clear_color);
        let mut stats = RenderStats::default();

        for entry in &self.draw_list {
            let mut component = entry.borrow_mut();
            let name = component.name().to_string();
            let Some(renderable) = component.as_renderable() else {
                continue;
            };

            let mark = ctx.command_count();
            match renderable.render(&mut ctx, &view, &projection) {
                Ok(()) => stats.rendered += 1,
                Err(e) => {
                    log::error!("Render of '{}' failed: {}", name, e);
                    ctx.truncate(mark);
                    stats.failed.push(name);
                }
            }
        }

        stats.draw_calls = ctx.draw_count();
        self.frames += 1;
        match self.device.submit(ctx) {
            Ok(()) => stats.presented = true,
            Err(GpuError::SurfaceLost) => {
                log::warn!("Surface lost, frame {} skipped", self.frames);
            }
            Err(e) => return Err(RenderError::Device(e)),
        }
        Ok(stats)
    }

    /// Release the device and everything it still owns
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.draw_list.clear();
        self.device.shutdown();
        self.disposed = true;
        log::info!("Renderer disposed after {} frames", self.frames);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{shared, GameComponent, Renderable};
    use crate::error::ComponentError;
    use planesim_math::{mat4, Mat4, Vec3};
    use planesim_render::gpu::HeadlessDevice;
    use planesim_render::{FixedCamera, Lens};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
        fail: bool,
        renderable: bool,
    }

    impl GameComponent for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn is_enabled(&self) -> bool {
            true
        }

        fn set_enabled(&mut self, _enabled: bool) {}

        fn update(&mut self, _delta: f64) -> Result<(), ComponentError> {
            Ok(())
        }

        fn as_renderable(&mut self) -> Option<&mut dyn Renderable> {
            if self.renderable {
                Some(self)
            } else {
                None
            }
        }
    }

    impl Renderable for Recorder {
        fn render(&mut self, ctx: &mut DrawContext, _view: &Mat4, _projection: &Mat4) -> Result<(), ComponentError> {
            self.log.borrow_mut().push(self.name);
            if self.fail {
                // Would be rejected by the device if it were submitted
                ctx.draw_indexed(3, 0, 0);
                return Err(ComponentError::Failed("boom".to_string()));
            }
            Ok(())
        }
    }

    fn renderer(device: HeadlessDevice) -> Renderer {
        let camera = FixedCamera::new(Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO, Lens::default());
        Renderer::new(Box::new(device), Box::new(camera))
    }

    fn recorder(name: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) -> Recorder {
        Recorder {
            name,
            log: log.clone(),
            fail: false,
            renderable: true,
        }
    }

    #[test]
    fn test_draws_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut renderer = renderer(HeadlessDevice::new(4, 4));
        renderer.register(shared(recorder("second", &log)));
        renderer.register(shared(recorder("first", &log)));

        let stats = renderer.render().unwrap();
        assert_eq!(stats.rendered, 2);
        assert!(stats.presented);
        assert_eq!(*log.borrow(), ["second", "first"]);
    }

    #[test]
    fn test_failing_renderable_is_isolated() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let device = HeadlessDevice::new(4, 4);
        let monitor = device.monitor();
        let mut renderer = renderer(device);
        renderer.register(shared(Recorder { fail: true, ..recorder("broken", &log) }));
        renderer.register(shared(recorder("fine", &log)));

        let stats = renderer.render().unwrap();
        assert_eq!(stats.rendered, 1);
        assert_eq!(stats.failed, ["broken"]);
        // The broken component's partial draw never reached the device
        assert_eq!(monitor.frames_submitted(), 1);
    }

    #[test]
    fn test_non_renderable_entries_skipped() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut renderer = renderer(HeadlessDevice::new(4, 4));
        renderer.register(shared(Recorder { renderable: false, ..recorder("hidden", &log) }));

        let stats = renderer.render().unwrap();
        assert_eq!(stats.rendered, 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_surface_lost_skips_frame() {
        let device = HeadlessDevice::new(4, 4);
        let monitor = device.monitor();
        let mut renderer = renderer(device);

        monitor.fail_next_submit(GpuError::SurfaceLost);
        let stats = renderer.render().unwrap();
        assert!(!stats.presented);

        monitor.fail_next_submit(GpuError::OutOfMemory);
        assert_eq!(
            renderer.render(),
            Err(RenderError::Device(GpuError::OutOfMemory))
        );
    }

    #[test]
    fn test_dispose_twice() {
        let device = HeadlessDevice::new(4, 4);
        let monitor = device.monitor();
        let mut renderer = renderer(device);

        renderer.dispose();
        renderer.dispose();

        assert!(monitor.is_shut_down());
        assert!(renderer.is_disposed());
        assert_eq!(renderer.render(), Err(RenderError::Disposed));
        assert!(renderer.device_mut().is_err());
    }

    #[test]
    fn test_projection_uses_device_aspect() {
        let camera = FixedCamera::new(Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO, Lens::default());
        let wide = camera.projection_matrix(HeadlessDevice::new(200, 100).aspect_ratio());
        let expected = mat4::perspective_fov_lh(45f32.to_radians(), 2.0, 0.1, 5000.0);
        assert_eq!(wide, expected);
    }
}
