//! Error types for components, the renderer and the game loop

use planesim_render::gpu::GpuError;

/// Failure inside one component's update or render
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentError {
    /// GPU work recorded by the component was rejected
    Gpu(GpuError),
    /// Component specific failure
    Failed(String),
}

impl std::fmt::Display for ComponentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentError::Gpu(e) => write!(f, "GPU error: {}", e),
            ComponentError::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ComponentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ComponentError::Gpu(e) => Some(e),
            ComponentError::Failed(_) => None,
        }
    }
}

impl From<GpuError> for ComponentError {
    fn from(e: GpuError) -> Self {
        ComponentError::Gpu(e)
    }
}

/// Renderer failures
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Submitting the frame to the device failed
    Device(GpuError),
    /// The renderer was already disposed
    Disposed,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Device(e) => write!(f, "Device error: {}", e),
            RenderError::Disposed => write!(f, "Renderer disposed"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Device(e) => Some(e),
            RenderError::Disposed => None,
        }
    }
}

impl From<GpuError> for RenderError {
    fn from(e: GpuError) -> Self {
        RenderError::Device(e)
    }
}

/// Game loop failures
#[derive(Debug, Clone, PartialEq)]
pub enum GameError {
    /// Operation attempted after the game was disposed
    Disposed,
    /// Step attempted after exit was requested
    NotRunning,
    /// Rendering the frame failed
    Render(RenderError),
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::Disposed => write!(f, "Game already disposed"),
            GameError::NotRunning => write!(f, "Game loop is no longer running"),
            GameError::Render(e) => write!(f, "Render failed: {}", e),
        }
    }
}

impl std::error::Error for GameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GameError::Render(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderError> for GameError {
    fn from(e: RenderError) -> Self {
        GameError::Render(e)
    }
}
