//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`PLANESIM_SECTION__KEY`)

use figment::{Figment, providers::{Format, Toml, Env}};
use serde::{Serialize, Deserialize};
use std::path::Path;

use planesim_render::Lens;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Window configuration
    #[serde(default)]
    pub window: WindowConfig,
    /// Camera configuration
    #[serde(default)]
    pub camera: CameraConfig,
    /// Aircraft start state
    #[serde(default)]
    pub aircraft: AircraftConfig,
    /// Water surface configuration
    #[serde(default)]
    pub water: WaterConfig,
    /// Flight recorder configuration
    #[serde(default)]
    pub recorder: RecorderConfig,
    /// Frame timing configuration
    #[serde(default)]
    pub timing: TimingConfig,
    /// Rendering configuration
    #[serde(default)]
    pub rendering: RenderingConfig,
    /// Debug configuration
    #[serde(default)]
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`PLANESIM_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }

        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // PLANESIM_WATER__HEIGHT=2.5 -> water.height = 2.5
        figment = figment.merge(Env::prefixed("PLANESIM_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }
}

/// Window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Window width in pixels
    pub width: u32,
    /// Window height in pixels
    pub height: u32,
    /// Start in fullscreen mode
    pub fullscreen: bool,
    /// Enable VSync
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "PlaneSim".to_string(),
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
        }
    }
}

/// Chase camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Distance behind the aircraft
    pub chase_distance: f32,
    /// Height above the aircraft
    pub chase_height: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 45.0,
            near: 0.1,
            far: 5000.0,
            chase_distance: 60.0,
            chase_height: 15.0,
        }
    }
}

impl CameraConfig {
    pub fn lens(&self) -> Lens {
        Lens {
            fov_degrees: self.fov,
            near: self.near,
            far: self.far,
        }
    }
}

/// Initial aircraft state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftConfig {
    /// Altitude above the water in meters
    pub initial_altitude: f32,
    /// Forward speed in meters per second
    pub initial_speed: f32,
    /// Descent in meters per second
    pub sink_rate: f32,
}

impl Default for AircraftConfig {
    fn default() -> Self {
        Self {
            initial_altitude: 1000.0,
            initial_speed: 200.0,
            sink_rate: 25.0,
        }
    }
}

/// Water plane configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterConfig {
    /// Height of the water plane
    pub height: f32,
    /// Half the side length of the water quad
    pub half_extent: f32,
    /// Texture repeats across the quad
    pub tiling: f32,
    /// RGBA tint of the reflection map placeholder
    pub reflection_tint: [u8; 4],
    /// RGBA tint of the refraction map placeholder
    pub refraction_tint: [u8; 4],
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            height: 0.0,
            half_extent: 4000.0,
            tiling: 64.0,
            reflection_tint: [150, 180, 210, 255],
            refraction_tint: [10, 50, 80, 255],
        }
    }
}

/// Flight recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Seconds between samples
    pub sample_interval: f64,
    /// Samples kept before the oldest are dropped
    pub capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            sample_interval: 1.0,
            capacity: 600,
        }
    }
}

/// Frame timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delta reported by the first frame, in seconds
    pub first_delta: f64,
    /// Upper bound on a single frame's delta, in seconds
    pub max_delta: f64,
    /// Fixed step used by headless runs, in seconds
    pub headless_step: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            first_delta: 1.0 / 60.0,
            max_delta: 0.25,
            headless_step: 1.0 / 60.0,
        }
    }
}

/// Rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderingConfig {
    /// Background color [r, g, b, a]
    pub background_color: [f32; 4],
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            background_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Draw the telemetry header
    pub show_overlay: bool,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            show_overlay: true,
            log_level: "info".to_string(),
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.aircraft.initial_altitude, 1000.0);
        assert_eq!(config.aircraft.initial_speed, 200.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("title"));
        assert!(toml.contains("sample_interval"));
    }

    #[test]
    fn test_camera_lens() {
        let lens = CameraConfig::default().lens();
        assert_eq!(lens, Lens::default());
    }

    #[test]
    fn test_partial_section_rejected() {
        // A section present in a file must be complete; missing sections fall back to defaults
        let figment = Figment::new().merge(Toml::string("[water]\nheight = 3.0\n"));
        assert!(figment.extract::<AppConfig>().is_err());

        let figment = Figment::new().merge(Toml::string("[debug]\nshow_overlay = false\nlog_level = \"warn\"\n"));
        let config: AppConfig = figment.extract().unwrap();
        assert!(!config.debug.show_overlay);
        assert_eq!(config.aircraft.sink_rate, 25.0);
    }
}
