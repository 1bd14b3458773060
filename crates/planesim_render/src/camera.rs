//! Camera matrices supplied to renderables

use planesim_math::{mat4, Mat4, Vec3};

/// Source of the per-frame view and projection matrices
///
/// The renderer queries this once per frame; the simulation owns the state
/// behind it.
pub trait ViewSource {
    fn view_matrix(&self) -> Mat4;

    fn projection_matrix(&self, aspect_ratio: f32) -> Mat4;
}

/// Perspective lens parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lens {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Lens {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 5000.0,
        }
    }
}

impl Lens {
    pub fn projection(&self, aspect_ratio: f32) -> Mat4 {
        mat4::perspective_fov_lh(self.fov_degrees.to_radians(), aspect_ratio, self.near, self.far)
    }
}

/// Camera at a fixed position looking at a fixed target
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub lens: Lens,
}

impl FixedCamera {
    pub fn new(eye: Vec3, target: Vec3, lens: Lens) -> Self {
        Self { eye, target, lens }
    }
}

impl ViewSource for FixedCamera {
    fn view_matrix(&self) -> Mat4 {
        mat4::look_at_lh(self.eye, self.target, Vec3::Y)
    }

    fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        self.lens.projection(aspect_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = FixedCamera::new(Vec3::new(0.0, 10.0, -50.0), Vec3::ZERO, Lens::default());
        let view_proj = mat4::mul(camera.view_matrix(), camera.projection_matrix(16.0 / 9.0));
        let ndc = mat4::transform_point(view_proj, Vec3::ZERO);
        assert!(ndc.x.abs() < 1e-4);
        assert!(ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
