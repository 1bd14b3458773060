//! Window management system
//!
//! Handles window creation, fullscreen toggle, and title updates.

use std::sync::Arc;
use winit::{
    event_loop::ActiveEventLoop,
    window::{Fullscreen, Window},
};
use crate::config::WindowConfig;

/// Owns the application window
pub struct WindowSystem {
    window: Arc<Window>,
    base_title: String,
}

impl WindowSystem {
    /// Create window from config
    pub fn create(
        event_loop: &ActiveEventLoop,
        config: &WindowConfig,
    ) -> Result<Self, WindowError> {
        let mut attrs = Window::default_attributes()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.width,
                config.height,
            ));

        if config.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| WindowError::CreationFailed(e.to_string()))?,
        );

        Ok(Self {
            window,
            base_title: config.title.clone(),
        })
    }

    /// Window handle, shared with the graphics device's surface
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn toggle_fullscreen(&self) {
        let new_fullscreen = if self.window.fullscreen().is_some() {
            None
        } else {
            Some(Fullscreen::Borderless(None))
        };
        self.window.set_fullscreen(new_fullscreen);
    }

    /// Show the telemetry status line after the base title
    pub fn update_title(&self, status: Option<&str>) {
        self.window.set_title(&format_title(&self.base_title, status));
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

fn format_title(base: &str, status: Option<&str>) -> String {
    match status {
        Some(status) if !status.is_empty() => format!("{} - {}", base, status),
        _ => base.to_string(),
    }
}

#[derive(Debug)]
pub enum WindowError {
    CreationFailed(String),
}

impl std::fmt::Display for WindowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowError::CreationFailed(msg) => write!(f, "Window creation failed: {}", msg),
        }
    }
}

impl std::error::Error for WindowError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_with_status() {
        let title = format_title("PlaneSim", Some("60 FPS | Headless"));
        assert_eq!(title, "PlaneSim - 60 FPS | Headless");
    }

    #[test]
    fn test_title_without_status() {
        assert_eq!(format_title("PlaneSim", None), "PlaneSim");
        // Before the first rendered frame the status line is still empty
        assert_eq!(format_title("PlaneSim", Some("")), "PlaneSim");
    }
}
