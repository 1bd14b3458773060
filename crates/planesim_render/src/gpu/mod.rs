//! Graphics device abstraction
//!
//! Components talk to a [`GraphicsDevice`] through handles and record their
//! per-frame work into a [`DrawContext`]. Two backends implement the device:
//! [`WgpuDevice`] for windowed rendering and [`HeadlessDevice`] for tests and
//! GPU-less runs.

mod commands;
mod device;
mod error;
mod headless;
mod resources;
mod types;
mod wgpu_device;

pub use commands::{plan_batches, Batch, Command, DrawCall, DrawContext, MappedBuffer};
pub use device::GraphicsDevice;
pub use error::GpuError;
pub use headless::{DeviceMonitor, ExecutedDraw, ExecutedFrame, HeadlessDevice};
pub use resources::{OwnedResources, ResourceScope};
pub use types::*;
pub use wgpu_device::WgpuDevice;
