//! GPU error types

use super::ResourceKind;

/// Errors raised by device backends and shader programs
#[derive(Debug, Clone, PartialEq)]
pub enum GpuError {
    /// Program source failed to compile
    Compile { label: String, message: String },
    /// A device object could not be created
    Creation(String),
    /// A handle is unknown to the device (never created, or already released)
    InvalidHandle { kind: ResourceKind },
    /// A handle refers to a live object of another kind or stage
    WrongKind { expected: ResourceKind, detail: String },
    /// Byte count does not match the allocation
    SizeMismatch { expected: u64, actual: u64 },
    /// A draw was issued without the pipeline state it needs
    IncompleteState(&'static str),
    /// The owning object was disposed
    Disposed,
    /// Presentation surface was lost (resize, minimize, ...)
    SurfaceLost,
    /// GPU out of memory
    OutOfMemory,
    /// Other surface error
    Surface(String),
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::Compile { label, message } => {
                write!(f, "Failed to compile '{}': {}", label, message)
            }
            GpuError::Creation(msg) => write!(f, "Resource creation failed: {}", msg),
            GpuError::InvalidHandle { kind } => write!(f, "Invalid {} handle", kind),
            GpuError::WrongKind { expected, detail } => {
                write!(f, "Expected a {}: {}", expected, detail)
            }
            GpuError::SizeMismatch { expected, actual } => {
                write!(f, "Size mismatch: expected {} bytes, got {}", expected, actual)
            }
            GpuError::IncompleteState(what) => write!(f, "Incomplete pipeline state: {}", what),
            GpuError::Disposed => write!(f, "Resource used after disposal"),
            GpuError::SurfaceLost => write!(f, "Surface lost"),
            GpuError::OutOfMemory => write!(f, "Out of memory"),
            GpuError::Surface(msg) => write!(f, "Surface error: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {}
