//! PlaneSim rendering library
//!
//! Handle-based GPU device abstraction and the shader resource lifecycle
//! used by every visual effect of the simulator.
//!
//! ## Key Components
//!
//! - [`gpu::GraphicsDevice`] - retained-mode device contract
//! - [`gpu::WgpuDevice`] / [`gpu::HeadlessDevice`] - windowed and GPU-less backends
//! - [`gpu::DrawContext`] - per-frame command recording with discard-mapped uploads
//! - [`gpu::ResourceScope`] / [`gpu::OwnedResources`] - atomic construction and exhaustive release
//! - [`shader::WaterShader`] - reflection/refraction water surface
//! - [`shader::OverlayShader`] - translucent screen-space rectangles
//! - [`camera::ViewSource`] - view and projection supplied to renderables

pub mod camera;
pub mod gpu;
pub mod mesh;
pub mod shader;

pub use camera::{FixedCamera, Lens, ViewSource};
pub use mesh::{Mesh, PositionTexture};
pub use planesim_math::{mat4, Mat4, Vec3};
