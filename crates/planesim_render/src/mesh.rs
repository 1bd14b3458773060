//! Indexed triangle meshes in GPU buffers

use crate::gpu::{
    BufferDesc, BufferHandle, DrawContext, GpuError, GraphicsDevice, OwnedResources,
    ResourceScope, VertexFormat,
};

/// Vertex with a position and texture coordinates
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PositionTexture {
    pub position: [f32; 3],
    pub tex: [f32; 2],
}

impl PositionTexture {
    pub const FORMAT: VertexFormat = VertexFormat::POSITION_TEXTURE;

    pub const fn new(position: [f32; 3], tex: [f32; 2]) -> Self {
        Self { position, tex }
    }
}

struct MeshBuffers {
    vertices: BufferHandle,
    indices: BufferHandle,
}

/// Immutable vertex and index buffers for one mesh
pub struct Mesh {
    buffers: Option<MeshBuffers>,
    index_count: u32,
    owned: OwnedResources,
}

impl Mesh {
    pub fn new(
        device: &mut dyn GraphicsDevice,
        label: &str,
        vertices: &[PositionTexture],
        indices: &[u32],
    ) -> Result<Self, GpuError> {
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(GpuError::Creation(format!(
                "mesh '{}' index {} is out of range for {} vertices",
                label,
                bad,
                vertices.len()
            )));
        }

        let mut scope = ResourceScope::new(device);
        let vertex_buffer = scope.create_buffer(&BufferDesc::vertex(label, bytemuck::cast_slice(vertices)))?;
        let index_buffer = scope.create_buffer(&BufferDesc::index(label, bytemuck::cast_slice(indices)))?;

        Ok(Self {
            buffers: Some(MeshBuffers {
                vertices: vertex_buffer,
                indices: index_buffer,
            }),
            index_count: indices.len() as u32,
            owned: scope.commit(),
        })
    }

    /// Horizontal square of side `2 * half_extent` centred on the origin
    ///
    /// Texture coordinates repeat `tiling` times across the square.
    pub fn horizontal_quad(
        device: &mut dyn GraphicsDevice,
        label: &str,
        half_extent: f32,
        tiling: f32,
    ) -> Result<Self, GpuError> {
        let e = half_extent;
        let vertices = [
            PositionTexture::new([-e, 0.0, e], [0.0, 0.0]),
            PositionTexture::new([e, 0.0, e], [tiling, 0.0]),
            PositionTexture::new([e, 0.0, -e], [tiling, tiling]),
            PositionTexture::new([-e, 0.0, -e], [0.0, tiling]),
        ];
        Self::new(device, label, &vertices, &[0, 1, 2, 0, 2, 3])
    }

    /// Rectangle in normalized device coordinates at depth zero
    pub fn screen_rect(
        device: &mut dyn GraphicsDevice,
        label: &str,
        min: [f32; 2],
        max: [f32; 2],
    ) -> Result<Self, GpuError> {
        let vertices = [
            PositionTexture::new([min[0], max[1], 0.0], [0.0, 0.0]),
            PositionTexture::new([max[0], max[1], 0.0], [1.0, 0.0]),
            PositionTexture::new([max[0], min[1], 0.0], [1.0, 1.0]),
            PositionTexture::new([min[0], min[1], 0.0], [0.0, 1.0]),
        ];
        Self::new(device, label, &vertices, &[0, 1, 2, 0, 2, 3])
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Bind the vertex and index buffers
    pub fn bind(&self, ctx: &mut DrawContext) -> Result<(), GpuError> {
        let buffers = self.buffers.as_ref().ok_or(GpuError::Disposed)?;
        ctx.set_vertex_buffer(buffers.vertices, PositionTexture::FORMAT.stride);
        ctx.set_index_buffer(buffers.indices);
        Ok(())
    }

    /// Hand the buffers to an outer owner; the mesh keeps binding them
    /// until it is disposed, but no longer releases them itself
    pub fn take_resources(&mut self) -> OwnedResources {
        std::mem::take(&mut self.owned)
    }

    pub fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        self.buffers = None;
        self.owned.release_all(device);
    }

    pub fn is_disposed(&self) -> bool {
        self.buffers.is_none()
    }
}
