//! Frame timers
//!
//! A timer produces the elapsed time since its previous tick, in seconds.

use std::time::{Duration, Instant};

/// Source of per-frame time deltas
pub trait Timer {
    /// Advance the timer and return the seconds elapsed since the last tick
    ///
    /// Never negative.
    fn tick(&mut self) -> f64;
}

/// Wall-clock timer
pub struct SystemTimer {
    last: Option<Instant>,
    first_delta: f64,
    max_delta: f64,
}

impl SystemTimer {
    /// `first_delta` is reported by the first tick, when there is no previous
    /// frame to measure from. Later deltas are capped at `max_delta` so a
    /// stall (window drag, breakpoint) does not produce one huge step.
    pub fn new(first_delta: f64, max_delta: f64) -> Self {
        Self {
            last: None,
            first_delta: first_delta.max(0.0),
            max_delta: max_delta.max(first_delta).max(0.0),
        }
    }
}

impl Default for SystemTimer {
    fn default() -> Self {
        Self::new(1.0 / 60.0, 0.25)
    }
}

impl Timer for SystemTimer {
    fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let delta = match self.last {
            Some(last) => now.duration_since(last).as_secs_f64().min(self.max_delta),
            None => self.first_delta,
        };
        self.last = Some(now);
        delta
    }
}

/// Deterministic timer advancing by a fixed step every tick
#[derive(Clone, Debug)]
pub struct FixedTimer {
    step: f64,
    ticks: u64,
}

impl FixedTimer {
    pub fn new(step: Duration) -> Self {
        Self {
            step: step.as_secs_f64(),
            ticks: 0,
        }
    }

    pub fn from_secs(step: f64) -> Self {
        Self {
            step: step.max(0.0),
            ticks: 0,
        }
    }

    /// Total simulated time so far
    pub fn elapsed(&self) -> f64 {
        self.step * self.ticks as f64
    }
}

impl Timer for FixedTimer {
    fn tick(&mut self) -> f64 {
        self.ticks += 1;
        self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_reports_configured_delta() {
        let mut timer = SystemTimer::new(0.02, 0.25);
        assert_eq!(timer.tick(), 0.02);
    }

    #[test]
    fn test_system_timer_delta_is_capped() {
        let mut timer = SystemTimer::new(0.0, 0.01);
        timer.tick();
        std::thread::sleep(Duration::from_millis(30));
        let delta = timer.tick();
        assert!(delta <= 0.01);
        assert!(delta >= 0.0);
    }

    #[test]
    fn test_fixed_timer() {
        let mut timer = FixedTimer::from_secs(0.5);
        assert_eq!(timer.tick(), 0.5);
        assert_eq!(timer.tick(), 0.5);
        assert_eq!(timer.elapsed(), 1.0);
    }

    #[test]
    fn test_negative_step_clamped() {
        let mut timer = FixedTimer::from_secs(-1.0);
        assert_eq!(timer.tick(), 0.0);
    }
}
