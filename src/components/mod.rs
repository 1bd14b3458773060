//! Components making up the flight scene

pub mod aircraft;
pub mod chase_camera;
pub mod flight_recorder;
pub mod monitoring_header;
pub mod water_surface;

pub use aircraft::{Aircraft, FlightHandle, FlightState};
pub use chase_camera::ChaseCamera;
pub use flight_recorder::{FlightRecorder, FlightSample};
pub use monitoring_header::{FpsCounter, MonitoringHeader};
pub use water_surface::WaterSurface;
