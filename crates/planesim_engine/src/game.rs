//! The frame loop
//!
//! One [`Game::step`] is one frame:
//!
//! 1. pending deferred registrations join the registry
//! 2. the timer ticks
//! 3. the registry is re-sorted if it changed
//! 4. every enabled component updates, in priority order
//! 5. the termination predicate is checked
//! 6. the renderer draws the frame, including the terminating one
//!
//! A failing update is logged and recorded in the [`FrameReport`]; the
//! remaining components still update and the registry is left untouched.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use planesim_render::gpu::GraphicsDevice;

use crate::component::ComponentRef;
use crate::error::{ComponentError, GameError};
use crate::registry::Registry;
use crate::renderer::{RenderStats, Renderer};
use crate::timer::Timer;

/// Lifecycle of the loop; transitions only move forward
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    ExitRequested,
    Disposed,
}

/// What happened during one frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// 1-based frame number
    pub frame: u64,
    pub delta: f64,
    /// Whether the registry was re-sorted this frame
    pub sorted: bool,
    /// Names of the components updated, in order
    pub updated: Vec<String>,
    pub failed_updates: Vec<(String, ComponentError)>,
    pub exit_requested: bool,
    pub render: RenderStats,
}

/// Cloneable handle for registering components from inside an update
///
/// Registrations are queued and join the registry at the start of the next
/// frame, before that frame's sort.
#[derive(Clone, Default)]
pub struct Registrar {
    pending: Rc<RefCell<Vec<ComponentRef>>>,
}

impl Registrar {
    pub fn register(&self, component: ComponentRef) {
        self.pending.borrow_mut().push(component);
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    fn take(&self) -> Vec<ComponentRef> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

type TerminationPredicate = Box<dyn FnMut() -> bool>;

/// Owns the registry, the timer and the renderer, and drives frames
pub struct Game {
    registry: Registry,
    renderer: Renderer,
    timer: Box<dyn Timer>,
    registrar: Registrar,
    termination: Option<TerminationPredicate>,
    state: LoopState,
    frame: u64,
}

impl Game {
    pub fn new(renderer: Renderer, timer: Box<dyn Timer>) -> Self {
        Self {
            registry: Registry::new(),
            renderer,
            timer,
            registrar: Registrar::default(),
            termination: None,
            state: LoopState::Running,
            frame: 0,
        }
    }

    /// Predicate checked after every frame's updates; `true` ends the loop
    pub fn set_termination(&mut self, predicate: impl FnMut() -> bool + 'static) {
        self.termination = Some(Box::new(predicate));
    }

    /// Add a component to the update registry and, if it can render, to the
    /// renderer's draw list
    ///
    /// The same component may be registered more than once; each
    /// registration updates and renders separately.
    pub fn register(&mut self, component: ComponentRef) -> Result<(), GameError> {
        if self.state == LoopState::Disposed {
            return Err(GameError::Disposed);
        }
        self.add(component);
        Ok(())
    }

    fn add(&mut self, component: ComponentRef) {
        let renderable = component.borrow_mut().as_renderable().is_some();
        log::debug!(
            "Registered '{}'{}",
            component.borrow().name(),
            if renderable { " (renderable)" } else { "" }
        );
        if renderable {
            self.renderer.register(component.clone());
        }
        self.registry.add(component);
    }

    pub fn registrar(&self) -> Registrar {
        self.registrar.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn component_count(&self) -> usize {
        self.registry.len()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Device access for building components before registration
    pub fn device_mut(&mut self) -> Result<&mut dyn GraphicsDevice, GameError> {
        if self.state == LoopState::Disposed {
            return Err(GameError::Disposed);
        }
        self.renderer.device_mut().map_err(GameError::from)
    }

    /// Stop producing frames (e.g. the window was closed)
    pub fn request_exit(&mut self) {
        if self.state == LoopState::Running {
            log::info!("Exit requested after frame {}", self.frame);
            self.state = LoopState::ExitRequested;
        }
    }

    /// Run one frame
    pub fn step(&mut self) -> Result<FrameReport, GameError> {
        match self.state {
            LoopState::Running => {}
            LoopState::ExitRequested => return Err(GameError::NotRunning),
            LoopState::Disposed => return Err(GameError::Disposed),
        }

        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            ..Default::default()
        };

        for component in self.registrar.take() {
            self.add(component);
        }

        report.delta = self.timer.tick();
        report.sorted = self.registry.sort_if_dirty();

        for entry in self.registry.iter() {
            let mut component = entry.borrow_mut();
            if !component.is_enabled() {
                continue;
            }
            let name = component.name().to_string();
            match component.update(report.delta) {
                Ok(()) => report.updated.push(name),
                Err(e) => {
                    log::error!("Update of '{}' failed on frame {}: {}", name, self.frame, e);
                    report.failed_updates.push((name, e));
                }
            }
        }

        if let Some(predicate) = self.termination.as_mut() {
            if predicate() {
                log::info!("Termination condition met on frame {}", self.frame);
                self.state = LoopState::ExitRequested;
                report.exit_requested = true;
            }
        }

        report.render = self.renderer.render()?;
        Ok(report)
    }

    /// Step until exit is requested or `max_frames` frames have run
    ///
    /// Returns the number of frames run by this call.
    pub fn run(&mut self, max_frames: Option<u64>) -> Result<u64, GameError> {
        let mut frames = 0;
        while self.is_running() && max_frames.map_or(true, |max| frames < max) {
            self.step()?;
            frames += 1;
        }
        Ok(frames)
    }

    /// Dispose every registered component, then the renderer
    ///
    /// Each component is disposed exactly once, even if it was registered
    /// more than once. Components release their GPU objects into the
    /// still-live device. Calling this again does nothing.
    pub fn dispose(&mut self) {
        if self.state == LoopState::Disposed {
            return;
        }

        let mut components = self.registry.drain();
        let unregistered = self.registrar.take();
        if !unregistered.is_empty() {
            log::debug!("Disposing {} components that never joined the registry", unregistered.len());
        }
        components.extend(unregistered);

        let mut seen = HashSet::new();
        components.retain(|c| seen.insert(Rc::as_ptr(c) as *const ()));

        match self.renderer.device_mut() {
            Ok(device) => {
                for component in &components {
                    component.borrow_mut().dispose(device);
                }
            }
            Err(e) => log::warn!("Components not disposed: {}", e),
        }
        self.renderer.dispose();

        self.state = LoopState::Disposed;
        log::info!("Game disposed after {} frames ({} components)", self.frame, components.len());
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{shared, GameComponent};
    use crate::timer::FixedTimer;
    use planesim_math::Vec3;
    use planesim_render::gpu::HeadlessDevice;
    use planesim_render::{FixedCamera, Lens};

    struct Ticker {
        ticks: u32,
    }

    impl GameComponent for Ticker {
        fn name(&self) -> &str {
            "ticker"
        }

        fn is_enabled(&self) -> bool {
            true
        }

        fn set_enabled(&mut self, _enabled: bool) {}

        fn update(&mut self, _delta: f64) -> Result<(), ComponentError> {
            self.ticks += 1;
            Ok(())
        }
    }

    fn game() -> Game {
        let camera = FixedCamera::new(Vec3::new(0.0, 5.0, -20.0), Vec3::ZERO, Lens::default());
        let renderer = Renderer::new(Box::new(HeadlessDevice::new(320, 240)), Box::new(camera));
        Game::new(renderer, Box::new(FixedTimer::from_secs(0.1)))
    }

    #[test]
    fn test_step_reports_delta() {
        let mut game = game();
        let report = game.step().unwrap();
        assert_eq!(report.frame, 1);
        assert_eq!(report.delta, 0.1);
        assert!(report.render.presented);
    }

    #[test]
    fn test_request_exit_stops_stepping() {
        let mut game = game();
        game.step().unwrap();
        game.request_exit();
        assert_eq!(game.state(), LoopState::ExitRequested);
        assert_eq!(game.step(), Err(GameError::NotRunning));
    }

    #[test]
    fn test_disposed_is_terminal() {
        let mut game = game();
        game.dispose();
        assert_eq!(game.state(), LoopState::Disposed);
        assert_eq!(game.step(), Err(GameError::Disposed));
        assert_eq!(game.register(shared(Ticker { ticks: 0 })), Err(GameError::Disposed));
        assert!(game.device_mut().is_err());

        // Exit after disposal does not move the state back
        game.request_exit();
        assert_eq!(game.state(), LoopState::Disposed);
    }

    #[test]
    fn test_run_respects_frame_limit() {
        let mut game = game();
        let ticker = shared(Ticker { ticks: 0 });
        game.register(ticker.clone()).unwrap();

        assert_eq!(game.run(Some(5)).unwrap(), 5);
        assert_eq!(ticker.borrow().ticks, 5);
        assert!(game.is_running());
    }
}
