//! The retained-mode device contract

use super::{
    BufferDesc, BufferHandle, DrawContext, GpuError, LayoutHandle, ProgramHandle, ProgramSource,
    Resource, SamplerDesc, SamplerHandle, TextureDesc, TextureViewHandle, VertexFormat,
};

/// A graphics device that creates, executes against, and releases GPU objects
///
/// Objects are referenced through copyable handles. Every successful
/// `create_*`/`compile_program` call must eventually be matched by one
/// [`release`](Self::release); releasing an unknown handle is a no-op.
pub trait GraphicsDevice {
    /// Human readable adapter name
    fn name(&self) -> &str;

    /// Dedicated video memory in megabytes, if the backend can report it
    fn memory_mb(&self) -> Option<u64> {
        None
    }

    /// Compile a vertex or pixel program
    fn compile_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramHandle, GpuError>;

    /// Derive an input layout from a vertex program and the mesh vertex format
    fn create_input_layout(
        &mut self,
        vertex_program: ProgramHandle,
        format: &VertexFormat,
    ) -> Result<LayoutHandle, GpuError>;

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GpuError>;

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, GpuError>;

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureViewHandle, GpuError>;

    /// Destroy an object
    fn release(&mut self, resource: Resource);

    /// Execute a recorded frame and present it
    ///
    /// Returns once the work is queued; it does not wait for the GPU.
    fn submit(&mut self, frame: DrawContext) -> Result<(), GpuError>;

    /// Resize the presentation surface
    fn resize(&mut self, width: u32, height: u32);

    /// Width / height of the presentation surface
    fn aspect_ratio(&self) -> f32;

    /// Number of objects currently alive
    fn live_resources(&self) -> usize;

    /// Release every remaining object and the device itself
    fn shutdown(&mut self);
}
