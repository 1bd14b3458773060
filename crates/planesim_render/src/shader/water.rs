//! Water surface shader
//!
//! Samples a reflection map and a refraction map (rendered by separate
//! off-screen passes) at the projected position of each surface point.

use planesim_math::{mat4, Mat4};

use super::program::{ShaderProgram, ShaderProgramDesc};
use crate::gpu::{
    BufferHandle, DrawContext, GpuError, GraphicsDevice, OwnedResources, SamplerDesc,
    TextureViewHandle, VertexFormat,
};

const SOURCE: &str = include_str!("../shaders/water.wgsl");

/// Constant buffer layout, matching `MatrixBuffer` in `water.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WaterMatrices {
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub reflection: Mat4,
}

impl WaterMatrices {
    /// Build the GPU payload from row-major matrices, transposing each one
    pub fn transposed(world: &Mat4, view: &Mat4, projection: &Mat4, reflection: &Mat4) -> Self {
        Self {
            world: mat4::transpose(*world),
            view: mat4::transpose(*view),
            projection: mat4::transpose(*projection),
            reflection: mat4::transpose(*reflection),
        }
    }
}

/// Per-draw inputs of [`WaterShader::render`]
#[derive(Clone, Copy, Debug)]
pub struct WaterParams {
    pub index_count: u32,
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    /// View matrix of the camera mirrored about the water plane
    pub reflection: Mat4,
    pub reflection_map: TextureViewHandle,
    pub refraction_map: TextureViewHandle,
}

/// Shader program drawing a reflective, refractive water plane
pub struct WaterShader {
    program: ShaderProgram<WaterMatrices>,
}

impl WaterShader {
    pub fn new(device: &mut dyn GraphicsDevice) -> Result<Self, GpuError> {
        let program = ShaderProgram::new(
            device,
            &ShaderProgramDesc {
                label: "water",
                source: SOURCE,
                vertex_entry: "water_vertex",
                pixel_entry: "water_pixel",
                vertex_target: "vs_4_0",
                pixel_target: "ps_4_0",
                vertex_format: VertexFormat::POSITION_TEXTURE,
                sampler: Some(SamplerDesc::wrap_linear()),
            },
        )?;
        Ok(Self { program })
    }

    /// Record the parameter upload, bindings and one indexed draw
    ///
    /// The mesh's vertex and index buffers must already be bound.
    pub fn render(&self, ctx: &mut DrawContext, params: &WaterParams) -> Result<(), GpuError> {
        if params.index_count == 0 {
            return Err(GpuError::IncompleteState("water draw with zero indices"));
        }
        self.set_parameters(ctx, params)?;
        self.program.bind(ctx)?;
        ctx.draw_indexed(params.index_count, 0, 0);
        Ok(())
    }

    fn set_parameters(&self, ctx: &mut DrawContext, params: &WaterParams) -> Result<(), GpuError> {
        let matrices = WaterMatrices::transposed(
            &params.world,
            &params.view,
            &params.projection,
            &params.reflection,
        );
        self.program.upload(ctx, &matrices)?;
        ctx.set_texture(0, params.reflection_map);
        ctx.set_texture(1, params.refraction_map);
        Ok(())
    }

    pub fn constant_buffer(&self) -> Option<BufferHandle> {
        self.program.constant_buffer()
    }

    pub fn take_resources(&mut self) -> OwnedResources {
        self.program.take_resources()
    }

    pub fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        self.program.dispose(device);
    }

    pub fn is_disposed(&self) -> bool {
        self.program.is_disposed()
    }
}
