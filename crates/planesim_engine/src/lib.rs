//! PlaneSim engine
//!
//! The fixed-order frame loop: a priority-sorted component registry, a
//! timer, and a renderer that dispatches renderable components to the
//! graphics device.
//!
//! ## Key Components
//!
//! - [`Game`] - owns everything and runs frames
//! - [`GameComponent`] / [`Renderable`] - per-frame behavior and the optional draw capability
//! - [`Registry`] - insertion-ordered components with a dirty bit
//! - [`Renderer`] - device owner and draw list
//! - [`Timer`] - frame delta source

pub mod component;
pub mod error;
pub mod game;
pub mod registry;
pub mod renderer;
pub mod timer;

pub use component::{shared, ComponentRef, GameComponent, Renderable};
pub use error::{ComponentError, GameError, RenderError};
pub use game::{FrameReport, Game, LoopState, Registrar};
pub use registry::Registry;
pub use renderer::{RenderStats, Renderer};
pub use timer::{FixedTimer, SystemTimer, Timer};
