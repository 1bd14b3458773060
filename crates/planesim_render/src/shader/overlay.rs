//! Solid colour screen-space overlay shader

use planesim_math::{mat4, Mat4};

use super::program::{ShaderProgram, ShaderProgramDesc};
use crate::gpu::{DrawContext, GpuError, GraphicsDevice, OwnedResources, VertexFormat};

const SOURCE: &str = include_str!("../shaders/overlay.wgsl");

/// Constant buffer layout, matching `OverlayBuffer` in `overlay.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayConstants {
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub color: [f32; 4],
}

/// Draws flat translucent rectangles such as the telemetry header
pub struct OverlayShader {
    program: ShaderProgram<OverlayConstants>,
}

impl OverlayShader {
    pub fn new(device: &mut dyn GraphicsDevice) -> Result<Self, GpuError> {
        let program = ShaderProgram::new(
            device,
            &ShaderProgramDesc {
                label: "overlay",
                source: SOURCE,
                vertex_entry: "overlay_vertex",
                pixel_entry: "overlay_pixel",
                vertex_target: "vs_4_0",
                pixel_target: "ps_4_0",
                vertex_format: VertexFormat::POSITION_TEXTURE,
                sampler: None,
            },
        )?;
        Ok(Self { program })
    }

    /// Draw `index_count` indices of the bound mesh in `color`
    pub fn render(
        &self,
        ctx: &mut DrawContext,
        index_count: u32,
        world: &Mat4,
        view: &Mat4,
        projection: &Mat4,
        color: [f32; 4],
    ) -> Result<(), GpuError> {
        if index_count == 0 {
            return Err(GpuError::IncompleteState("overlay draw with zero indices"));
        }
        let constants = OverlayConstants {
            world: mat4::transpose(*world),
            view: mat4::transpose(*view),
            projection: mat4::transpose(*projection),
            color,
        };
        self.program.upload(ctx, &constants)?;
        self.program.bind(ctx)?;
        ctx.draw_indexed(index_count, 0, 0);
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{Command, HeadlessDevice};

    #[test]
    fn test_overlay_constants_size() {
        assert_eq!(std::mem::size_of::<OverlayConstants>(), 208);
    }

    #[test]
    fn test_color_follows_matrices() {
        let mut device = HeadlessDevice::new(8, 8);
        let shader = OverlayShader::new(&mut device).unwrap();
        let color = [1.0, 0.0, 0.0, 0.2];

        let mut ctx = DrawContext::new([0.0; 4]);
        shader
            .render(&mut ctx, 6, &mat4::IDENTITY, &mat4::IDENTITY, &mat4::IDENTITY, color)
            .unwrap();

        let Command::UpdateBuffer { data, .. } = &ctx.commands()[0] else {
            panic!("first command should be the constant upload");
        };
        let floats: &[f32] = bytemuck::cast_slice(data);
        assert_eq!(&floats[48..52], &color);
    }
}
