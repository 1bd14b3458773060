//! Flight data recorder
//!
//! Samples the aircraft at a fixed interval into a bounded ring; the oldest
//! samples are dropped once the ring is full.

use std::collections::VecDeque;

use planesim_engine::{ComponentError, GameComponent};
use planesim_render::gpu::GraphicsDevice;

use super::aircraft::FlightHandle;
use crate::config::RecorderConfig;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightSample {
    pub flight_time: f64,
    pub altitude: f32,
    pub speed: f32,
    pub position: [f32; 3],
}

pub struct FlightRecorder {
    flight: FlightHandle,
    interval: f64,
    capacity: usize,
    since_sample: f64,
    samples: VecDeque<FlightSample>,
    dropped: usize,
    enabled: bool,
    finished: bool,
}

impl FlightRecorder {
    pub fn new(flight: FlightHandle, config: &RecorderConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            flight,
            interval: config.sample_interval.max(0.0),
            capacity,
            // Record the starting state on the first update
            since_sample: config.sample_interval.max(0.0),
            samples: VecDeque::with_capacity(capacity),
            dropped: 0,
            enabled: true,
            finished: false,
        }
    }

    /// Samples currently held, oldest first
    pub fn samples(&self) -> impl Iterator<Item = &FlightSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples discarded to stay within capacity
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn latest(&self) -> Option<&FlightSample> {
        self.samples.back()
    }

    fn record(&mut self) {
        let state = self.flight.get();
        let sample = FlightSample {
            flight_time: state.flight_time,
            altitude: state.altitude(),
            speed: state.speed,
            position: state.position.to_array(),
        };
        log::debug!(
            "t={:.1}s alt={:.1}m speed={:.1}m/s",
            sample.flight_time,
            sample.altitude,
            sample.speed
        );

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
            self.dropped += 1;
        }
        self.samples.push_back(sample);
    }
}

impl GameComponent for FlightRecorder {
    fn name(&self) -> &str {
        "flight_recorder"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// After the aircraft has moved
    fn update_priority(&self) -> i32 {
        10
    }

    fn update(&mut self, delta: f64) -> Result<(), ComponentError> {
        self.since_sample += delta;
        if self.since_sample >= self.interval {
            self.since_sample = 0.0;
            self.record();
        }
        Ok(())
    }

    fn dispose(&mut self, _device: &mut dyn GraphicsDevice) {
        if self.finished {
            return;
        }
        self.finished = true;
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => log::info!(
                "Flight recorder: {} samples ({} dropped), t={:.1}s..{:.1}s, altitude {:.0}m -> {:.0}m",
                self.samples.len(),
                self.dropped,
                first.flight_time,
                last.flight_time,
                first.altitude,
                last.altitude
            ),
            _ => log::info!("Flight recorder: no samples"),
        }
    }
}
