//! Flight scene construction
//!
//! Both run modes build the same scene; only the device and timer differ.

mod scene_builder;

pub use scene_builder::{FlightScene, SceneBuilder, SceneError};
