//! Player aircraft
//!
//! A kinematic stand-in for flight dynamics: the aircraft flies straight
//! along its heading and sinks at a constant rate until it reaches the water.

use std::cell::Cell;
use std::rc::Rc;

use planesim_engine::{ComponentError, GameComponent};
use planesim_math::Vec3;

use crate::config::AircraftConfig;

/// Snapshot of the aircraft's kinematic state
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightState {
    /// World position; `y` is the altitude above the water
    pub position: Vec3,
    /// Heading in radians, clockwise from +Z
    pub heading: f32,
    /// Forward speed in meters per second
    pub speed: f32,
    /// Seconds flown so far
    pub flight_time: f64,
}

impl FlightState {
    pub fn altitude(&self) -> f32 {
        self.position.y
    }

    /// Unit vector along the heading, in the horizontal plane
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.heading.sin(), 0.0, self.heading.cos())
    }

    pub fn is_crashed(&self) -> bool {
        self.position.y <= 0.0
    }
}

/// Read-only view of the aircraft's state, shared with the camera,
/// the recorder and the termination check
#[derive(Clone, Debug)]
pub struct FlightHandle(Rc<Cell<FlightState>>);

impl FlightHandle {
    pub fn get(&self) -> FlightState {
        self.0.get()
    }

    pub fn is_crashed(&self) -> bool {
        self.get().is_crashed()
    }
}

pub struct Aircraft {
    state: Rc<Cell<FlightState>>,
    sink_rate: f32,
    enabled: bool,
}

impl Aircraft {
    pub fn new(config: &AircraftConfig) -> Self {
        let state = FlightState {
            position: Vec3::new(0.0, config.initial_altitude.max(0.0), 0.0),
            heading: 0.0,
            speed: config.initial_speed,
            flight_time: 0.0,
        };
        Self {
            state: Rc::new(Cell::new(state)),
            sink_rate: config.sink_rate,
            enabled: true,
        }
    }

    pub fn handle(&self) -> FlightHandle {
        FlightHandle(self.state.clone())
    }

    pub fn state(&self) -> FlightState {
        self.state.get()
    }

    pub fn is_crashed(&self) -> bool {
        self.state.get().is_crashed()
    }
}

impl GameComponent for Aircraft {
    fn name(&self) -> &str {
        "aircraft"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn update_priority(&self) -> i32 {
        -10
    }

    fn update(&mut self, delta: f64) -> Result<(), ComponentError> {
        let mut state = self.state.get();
        if state.is_crashed() {
            return Ok(());
        }

        let dt = delta as f32;
        state.position += state.forward() * (state.speed * dt);
        state.position.y = (state.position.y - self.sink_rate * dt).max(0.0);
        state.flight_time += delta;

        if state.is_crashed() {
            log::info!(
                "Aircraft reached the water after {:.1}s at ({:.0}, {:.0})",
                state.flight_time,
                state.position.x,
                state.position.z
            );
        }
        self.state.set(state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(altitude: f32, speed: f32, sink_rate: f32) -> AircraftConfig {
        AircraftConfig {
            initial_altitude: altitude,
            initial_speed: speed,
            sink_rate,
        }
    }

    #[test]
    fn test_initial_state() {
        let aircraft = Aircraft::new(&AircraftConfig::default());
        let state = aircraft.state();
        assert_eq!(state.altitude(), 1000.0);
        assert_eq!(state.speed, 200.0);
        assert!(!aircraft.is_crashed());
    }

    #[test]
    fn test_glide_path() {
        let mut aircraft = Aircraft::new(&config(100.0, 50.0, 10.0));
        aircraft.update(2.0).unwrap();

        let state = aircraft.state();
        assert_eq!(state.altitude(), 80.0);
        assert_eq!(state.position.z, 100.0);
        assert_eq!(state.flight_time, 2.0);
    }

    #[test]
    fn test_crash_clamps_to_water() {
        let mut aircraft = Aircraft::new(&config(15.0, 50.0, 10.0));
        let handle = aircraft.handle();

        aircraft.update(1.0).unwrap();
        assert!(!handle.is_crashed());
        aircraft.update(1.0).unwrap();
        assert!(handle.is_crashed());
        assert_eq!(handle.get().altitude(), 0.0);

        // Nothing moves after the crash
        let crashed = handle.get();
        aircraft.update(1.0).unwrap();
        assert_eq!(handle.get(), crashed);
    }
}
