//! Game components and the optional render capability

use std::cell::RefCell;
use std::rc::Rc;

use planesim_math::Mat4;
use planesim_render::gpu::{DrawContext, GraphicsDevice};

use crate::error::ComponentError;

/// A unit of per-frame behavior
///
/// Components are updated in ascending [`update_priority`](Self::update_priority)
/// order while enabled. A component that also draws something exposes the
/// [`Renderable`] capability through [`as_renderable`](Self::as_renderable);
/// the game checks for it once, at registration.
pub trait GameComponent {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Lower runs first. Read once when the component is registered.
    fn update_priority(&self) -> i32 {
        0
    }

    /// Advance by `delta` seconds
    fn update(&mut self, delta: f64) -> Result<(), ComponentError>;

    fn as_renderable(&mut self) -> Option<&mut dyn Renderable> {
        None
    }

    /// Release every GPU object the component owns
    ///
    /// Called once per registration at teardown, enabled or not. Must be
    /// safe to call again.
    fn dispose(&mut self, _device: &mut dyn GraphicsDevice) {}
}

/// Capability of components that record draw calls
pub trait Renderable {
    fn render(&mut self, ctx: &mut DrawContext, view: &Mat4, projection: &Mat4) -> Result<(), ComponentError>;
}

/// Shared handle to a registered component
pub type ComponentRef = Rc<RefCell<dyn GameComponent>>;

/// Wrap a component for registration, keeping a typed handle for the caller
pub fn shared<C: GameComponent + 'static>(component: C) -> Rc<RefCell<C>> {
    Rc::new(RefCell::new(component))
}
