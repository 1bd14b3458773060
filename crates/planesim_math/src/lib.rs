//! Math library for PlaneSim
//!
//! - [`Vec3`] - 3D vector used for positions and directions
//! - [`Mat4`] - row-major 4x4 matrix in the row-vector convention
//!   (`v' = v * M`, so `world * view * projection` applies world first)
//!
//! GPU programs read matrices column-major; [`mat4::transpose`] converts
//! before any constant buffer upload.

mod vec3;
pub mod mat4;

pub use vec3::Vec3;
pub use mat4::Mat4;
