//! Compile-once GPU program with a per-frame constant buffer

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::gpu::{
    BufferDesc, BufferHandle, DrawContext, GpuError, GraphicsDevice, LayoutHandle,
    OwnedResources, ProgramHandle, ProgramSource, ResourceScope, SamplerDesc, SamplerHandle,
    ShaderStage, VertexFormat,
};

/// Everything needed to build a [`ShaderProgram`]
#[derive(Clone, Copy, Debug)]
pub struct ShaderProgramDesc<'a> {
    pub label: &'a str,
    pub source: &'a str,
    pub vertex_entry: &'a str,
    pub pixel_entry: &'a str,
    pub vertex_target: &'a str,
    pub pixel_target: &'a str,
    pub vertex_format: VertexFormat,
    /// Pixel stage sampler at slot 0, if the program samples textures
    pub sampler: Option<SamplerDesc>,
}

struct Handles {
    vertex: ProgramHandle,
    pixel: ProgramHandle,
    layout: LayoutHandle,
    constants: BufferHandle,
    sampler: Option<SamplerHandle>,
}

/// Vertex and pixel programs, input layout, constant buffer and sampler
///
/// `C` is the constant buffer payload; the buffer is allocated at exactly
/// `size_of::<C>()` bytes and never resized.
pub struct ShaderProgram<C> {
    label: String,
    handles: Option<Handles>,
    owned: OwnedResources,
    _constants: PhantomData<C>,
}

impl<C: Pod> ShaderProgram<C> {
    /// Compile and allocate everything, or nothing
    pub fn new(device: &mut dyn GraphicsDevice, desc: &ShaderProgramDesc<'_>) -> Result<Self, GpuError> {
        let size = std::mem::size_of::<C>() as u64;
        if size == 0 || size % 16 != 0 {
            return Err(GpuError::Creation(format!(
                "constant payload of '{}' is {} bytes, expected a non-zero multiple of 16",
                desc.label, size
            )));
        }

        let mut scope = ResourceScope::new(device);
        let vertex = scope.compile_program(&ProgramSource {
            label: desc.label,
            source: desc.source,
            entry_point: desc.vertex_entry,
            stage: ShaderStage::Vertex,
            target: desc.vertex_target,
        })?;
        let pixel = scope.compile_program(&ProgramSource {
            label: desc.label,
            source: desc.source,
            entry_point: desc.pixel_entry,
            stage: ShaderStage::Pixel,
            target: desc.pixel_target,
        })?;
        let layout = scope.create_input_layout(vertex, &desc.vertex_format)?;
        let constants = scope.create_buffer(&BufferDesc::constant(desc.label, size))?;
        let sampler = match &desc.sampler {
            Some(sampler) => Some(scope.create_sampler(sampler)?),
            None => None,
        };
        let owned = scope.commit();

        log::info!("Shader '{}' ready ({} GPU objects)", desc.label, owned.len());
        Ok(Self {
            label: desc.label.to_string(),
            handles: Some(Handles {
                vertex,
                pixel,
                layout,
                constants,
                sampler,
            }),
            owned,
            _constants: PhantomData,
        })
    }

    fn handles(&self) -> Result<&Handles, GpuError> {
        self.handles.as_ref().ok_or(GpuError::Disposed)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Write `constants` into the constant buffer and bind it to vertex slot 0
    pub fn upload(&self, ctx: &mut DrawContext, constants: &C) -> Result<(), GpuError> {
        let handles = self.handles()?;
        {
            let mut mapped = ctx.map_discard(handles.constants, std::mem::size_of::<C>());
            mapped.write(constants)?;
        }
        ctx.set_constant_buffer(ShaderStage::Vertex, 0, handles.constants);
        Ok(())
    }

    /// Bind input layout, both programs and the sampler
    pub fn bind(&self, ctx: &mut DrawContext) -> Result<(), GpuError> {
        let handles = self.handles()?;
        ctx.set_input_layout(handles.layout);
        ctx.set_program(ShaderStage::Vertex, handles.vertex);
        ctx.set_program(ShaderStage::Pixel, handles.pixel);
        if let Some(sampler) = handles.sampler {
            ctx.set_sampler(0, sampler);
        }
        Ok(())
    }

    pub fn constant_buffer(&self) -> Option<BufferHandle> {
        self.handles.as_ref().map(|h| h.constants)
    }

    /// Number of GPU objects still owned
    pub fn owned_resources(&self) -> usize {
        self.owned.len()
    }

    /// Hand every GPU object to an outer owner, which becomes responsible
    /// for releasing them
    pub fn take_resources(&mut self) -> OwnedResources {
        std::mem::take(&mut self.owned)
    }

    /// Release every owned object; later calls do nothing
    pub fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        if self.handles.take().is_some() {
            log::debug!("Disposing shader '{}'", self.label);
        }
        self.owned.release_all(device);
    }

    pub fn is_disposed(&self) -> bool {
        self.handles.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessDevice;

    #[repr(C)]
    #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
    struct Tint {
        color: [f32; 4],
    }

    #[repr(C)]
    #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
    struct Odd {
        value: [f32; 3],
    }

    const SOURCE: &str = "fn vs_main() {}\nfn ps_main() {}";

    fn desc(sampler: Option<SamplerDesc>) -> ShaderProgramDesc<'static> {
        ShaderProgramDesc {
            label: "tint",
            source: SOURCE,
            vertex_entry: "vs_main",
            pixel_entry: "ps_main",
            vertex_target: "vs_4_0",
            pixel_target: "ps_4_0",
            vertex_format: VertexFormat::POSITION_TEXTURE,
            sampler,
        }
    }

    #[test]
    fn test_program_owns_every_handle() {
        let mut device = HeadlessDevice::new(8, 8);
        let monitor = device.monitor();

        let program = ShaderProgram::<Tint>::new(&mut device, &desc(Some(SamplerDesc::wrap_linear()))).unwrap();
        // vs, ps, layout, constant buffer, sampler
        assert_eq!(program.owned_resources(), 5);
        assert_eq!(monitor.live_resources(), 5);

        let cb = program.constant_buffer().unwrap();
        assert_eq!(monitor.buffer_contents(cb).unwrap().len(), 16);
    }

    #[test]
    fn test_program_without_sampler() {
        let mut device = HeadlessDevice::new(8, 8);
        let program = ShaderProgram::<Tint>::new(&mut device, &desc(None)).unwrap();
        assert_eq!(program.owned_resources(), 4);
    }

    #[test]
    fn test_unaligned_payload_rejected_before_allocation() {
        let mut device = HeadlessDevice::new(8, 8);
        let monitor = device.monitor();
        assert!(matches!(
            ShaderProgram::<Odd>::new(&mut device, &desc(None)),
            Err(GpuError::Creation(_))
        ));
        assert_eq!(monitor.total_created(), 0);
    }

    #[test]
    fn test_pixel_compile_failure_leaks_nothing() {
        let mut device = HeadlessDevice::new(8, 8);
        let monitor = device.monitor();
        monitor.fail_compilation_of("ps_main");

        let result = ShaderProgram::<Tint>::new(&mut device, &desc(Some(SamplerDesc::wrap_linear())));

        assert!(matches!(result, Err(GpuError::Compile { .. })));
        assert_eq!(monitor.total_created(), 1);
        assert_eq!(monitor.live_resources(), 0);
    }

    #[test]
    fn test_use_after_dispose_fails() {
        let mut device = HeadlessDevice::new(8, 8);
        let mut program = ShaderProgram::<Tint>::new(&mut device, &desc(None)).unwrap();
        program.dispose(&mut device);

        let mut ctx = DrawContext::new([0.0; 4]);
        assert_eq!(program.bind(&mut ctx), Err(GpuError::Disposed));
        assert_eq!(
            program.upload(&mut ctx, &Tint { color: [1.0; 4] }),
            Err(GpuError::Disposed)
        );
        assert!(ctx.commands().is_empty());
    }
}
