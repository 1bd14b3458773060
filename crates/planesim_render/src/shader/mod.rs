//! Shader programs
//!
//! Each effect compiles its programs once, owns a constant buffer sized to its
//! payload, and records an upload, its bindings and a draw every frame it is
//! visible.

mod overlay;
mod program;
mod water;

pub use overlay::{OverlayConstants, OverlayShader};
pub use program::{ShaderProgram, ShaderProgramDesc};
pub use water::{WaterMatrices, WaterParams, WaterShader};
