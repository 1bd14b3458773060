//! Windowless run mode
//!
//! Runs the flight scene against the headless device with a fixed timestep,
//! for a bounded number of frames or until the aircraft reaches the water.

use planesim_engine::FixedTimer;
use planesim_render::gpu::HeadlessDevice;

use crate::config::AppConfig;
use crate::scene::{SceneBuilder, SceneError};

/// Outcome of a headless run
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSummary {
    pub frames: u64,
    pub crashed: bool,
    pub final_altitude: f32,
    pub samples_recorded: usize,
    pub draws_last_frame: usize,
    /// Device objects still alive when the device shut down
    pub leaked_resources: usize,
}

pub fn run_headless(config: &AppConfig, max_frames: u64) -> Result<HeadlessSummary, SceneError> {
    let device = HeadlessDevice::new(config.window.width, config.window.height);
    let monitor = device.monitor();

    let mut scene = SceneBuilder::new(config)
        .with_timer(Box::new(FixedTimer::from_secs(config.timing.headless_step)))
        .build(Box::new(device))?;

    log::info!("Headless run for up to {} frames", max_frames);
    let frames = scene.game.run(Some(max_frames))?;
    let flight = scene.flight.get();
    let samples_recorded = scene.recorder.borrow().len();
    if let Some(status) = scene.status_line() {
        log::info!("{}", status);
    }

    scene.game.dispose();

    let summary = HeadlessSummary {
        frames,
        crashed: flight.is_crashed(),
        final_altitude: flight.altitude(),
        samples_recorded,
        draws_last_frame: monitor.last_frame().map_or(0, |f| f.draws.len()),
        leaked_resources: monitor.released_at_shutdown(),
    };
    if summary.leaked_resources > 0 {
        log::warn!("{} resources were still alive at shutdown", summary.leaked_resources);
    }
    Ok(summary)
}
