//! Camera trailing the aircraft

use planesim_math::{mat4, Mat4, Vec3};
use planesim_render::{Lens, ViewSource};

use super::aircraft::FlightHandle;

/// Looks at the aircraft from behind and above
pub struct ChaseCamera {
    flight: FlightHandle,
    lens: Lens,
    distance: f32,
    height: f32,
}

impl ChaseCamera {
    pub fn new(flight: FlightHandle, lens: Lens, distance: f32, height: f32) -> Self {
        Self {
            flight,
            lens,
            distance,
            height,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let state = self.flight.get();
        state.position - state.forward() * self.distance + Vec3::Y * self.height
    }

    pub fn target(&self) -> Vec3 {
        self.flight.get().position
    }
}

impl ViewSource for ChaseCamera {
    fn view_matrix(&self) -> Mat4 {
        mat4::look_at_lh(self.eye(), self.target(), Vec3::Y)
    }

    fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        self.lens.projection(aspect_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::aircraft::Aircraft;
    use crate::config::AircraftConfig;
    use planesim_engine::GameComponent;

    #[test]
    fn test_eye_behind_and_above() {
        let aircraft = Aircraft::new(&AircraftConfig::default());
        let camera = ChaseCamera::new(aircraft.handle(), Lens::default(), 60.0, 15.0);
        assert_eq!(camera.eye(), Vec3::new(0.0, 1015.0, -60.0));
        assert_eq!(camera.target(), Vec3::new(0.0, 1000.0, 0.0));
    }

    #[test]
    fn test_follows_aircraft() {
        let mut aircraft = Aircraft::new(&AircraftConfig::default());
        let camera = ChaseCamera::new(aircraft.handle(), Lens::default(), 60.0, 15.0);
        let before = camera.view_matrix();

        aircraft.update(1.0).unwrap();
        assert_ne!(camera.view_matrix(), before);

        // The aircraft stays centred on screen
        let view_proj = mat4::mul(camera.view_matrix(), camera.projection_matrix(1.5));
        let ndc = mat4::transform_point(view_proj, aircraft.state().position);
        assert!(ndc.x.abs() < 1e-3);
        assert!(ndc.y.abs() < 1e-3);
    }
}
