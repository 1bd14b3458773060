//! Reflective water plane
//!
//! The reflection and refraction maps are solid-tint textures standing in for
//! the off-screen passes that would normally produce them.

use planesim_engine::{ComponentError, GameComponent, Renderable};
use planesim_math::{mat4, Mat4, Vec3};
use planesim_render::gpu::{
    DrawContext, GpuError, GraphicsDevice, OwnedResources, ResourceScope, TextureDesc,
    TextureViewHandle,
};
use planesim_render::shader::{WaterParams, WaterShader};
use planesim_render::Mesh;

use crate::config::WaterConfig;

/// Side length of the placeholder map textures
const MAP_SIZE: u32 = 4;

struct Maps {
    reflection: TextureViewHandle,
    refraction: TextureViewHandle,
}

pub struct WaterSurface {
    mesh: Mesh,
    shader: WaterShader,
    maps: Option<Maps>,
    /// Maps, quad buffers and shader objects, released together
    resources: OwnedResources,
    height: f32,
    enabled: bool,
}

fn solid_texels(tint: [u8; 4]) -> Vec<u8> {
    tint.repeat((MAP_SIZE * MAP_SIZE) as usize)
}

impl WaterSurface {
    /// Create the mesh, both maps and the shader
    ///
    /// Everything is built inside one scope, so if any step fails whatever
    /// was already created is released before the error is returned.
    pub fn new(device: &mut dyn GraphicsDevice, config: &WaterConfig) -> Result<Self, GpuError> {
        let reflection_texels = solid_texels(config.reflection_tint);
        let refraction_texels = solid_texels(config.refraction_tint);

        let mut scope = ResourceScope::new(device);
        let reflection = scope.create_texture(&TextureDesc {
            label: "water_reflection",
            width: MAP_SIZE,
            height: MAP_SIZE,
            texels: &reflection_texels,
        })?;
        let refraction = scope.create_texture(&TextureDesc {
            label: "water_refraction",
            width: MAP_SIZE,
            height: MAP_SIZE,
            texels: &refraction_texels,
        })?;
        let mut mesh = Mesh::horizontal_quad(scope.device(), "water", config.half_extent, config.tiling)?;
        scope.absorb(mesh.take_resources());
        let mut shader = WaterShader::new(scope.device())?;
        scope.absorb(shader.take_resources());

        Ok(Self {
            mesh,
            shader,
            maps: Some(Maps { reflection, refraction }),
            resources: scope.commit(),
            height: config.height,
            enabled: true,
        })
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// World matrix placing the quad at the water height
    pub fn world_matrix(&self) -> Mat4 {
        mat4::translation(Vec3::new(0.0, self.height, 0.0))
    }

    /// The camera's view mirrored about the water plane
    pub fn reflection_matrix(&self, view: &Mat4) -> Mat4 {
        mat4::mul(mat4::reflection_y(self.height), *view)
    }

    pub fn is_disposed(&self) -> bool {
        self.maps.is_none()
    }
}

impl GameComponent for WaterSurface {
    fn name(&self) -> &str {
        "water_surface"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn update(&mut self, _delta: f64) -> Result<(), ComponentError> {
        Ok(())
    }

    fn as_renderable(&mut self) -> Option<&mut dyn Renderable> {
        Some(self)
    }

    fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        self.maps = None;
        self.shader.dispose(device);
        self.mesh.dispose(device);
        self.resources.release_all(device);
    }
}

impl Renderable for WaterSurface {
    fn render(&mut self, ctx: &mut DrawContext, view: &Mat4, projection: &Mat4) -> Result<(), ComponentError> {
        let maps = self.maps.as_ref().ok_or(GpuError::Disposed)?;
        self.mesh.bind(ctx)?;
        self.shader.render(
            ctx,
            &WaterParams {
                index_count: self.mesh.index_count(),
                world: self.world_matrix(),
                view: *view,
                projection: *projection,
                reflection: self.reflection_matrix(view),
                reflection_map: maps.reflection,
                refraction_map: maps.refraction,
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planesim_render::gpu::HeadlessDevice;

    #[test]
    fn test_creates_and_releases_everything() {
        let mut device = HeadlessDevice::new(64, 64);
        let monitor = device.monitor();
        let mut water = WaterSurface::new(&mut device, &WaterConfig::default()).unwrap();
        assert!(monitor.live_resources() > 0);

        water.dispose(&mut device);
        water.dispose(&mut device);
        assert!(water.is_disposed());
        assert_eq!(monitor.live_resources(), 0);
    }

    #[test]
    fn test_failed_shader_leaves_nothing() {
        let mut device = HeadlessDevice::new(64, 64);
        let monitor = device.monitor();
        monitor.fail_compilation_of("water_pixel");

        assert!(WaterSurface::new(&mut device, &WaterConfig::default()).is_err());
        assert_eq!(monitor.live_resources(), 0);
        assert_eq!(monitor.total_created(), monitor.total_released());
    }

    #[test]
    fn test_failed_vertex_program_releases_maps_and_quad() {
        let mut device = HeadlessDevice::new(64, 64);
        let monitor = device.monitor();
        monitor.fail_compilation_of("water_vertex");

        assert!(WaterSurface::new(&mut device, &WaterConfig::default()).is_err());
        // Two maps and the quad's vertex and index buffers
        assert_eq!(monitor.total_created(), 4);
        assert_eq!(monitor.total_released(), 4);
    }

    #[test]
    fn test_single_owner_for_every_object() {
        let mut device = HeadlessDevice::new(64, 64);
        let monitor = device.monitor();
        let mut water = WaterSurface::new(&mut device, &WaterConfig::default()).unwrap();
        assert_eq!(water.resources.len(), monitor.live_resources());

        water.dispose(&mut device);
        assert!(water.mesh.is_disposed());
        assert!(water.shader.is_disposed());
        assert_eq!(monitor.live_resources(), 0);
    }

    #[test]
    fn test_reflection_mirrors_about_plane() {
        let mut device = HeadlessDevice::new(64, 64);
        let config = WaterConfig { height: 5.0, ..WaterConfig::default() };
        let mut water = WaterSurface::new(&mut device, &config).unwrap();

        let mirrored = water.reflection_matrix(&mat4::IDENTITY);
        let p = mat4::transform_point(mirrored, Vec3::new(1.0, 8.0, 2.0));
        assert_eq!(p, Vec3::new(1.0, 2.0, 2.0));

        water.dispose(&mut device);
    }

    #[test]
    fn test_render_after_dispose_fails() {
        let mut device = HeadlessDevice::new(64, 64);
        let mut water = WaterSurface::new(&mut device, &WaterConfig::default()).unwrap();
        water.dispose(&mut device);

        let mut ctx = DrawContext::new([0.0; 4]);
        assert_eq!(
            water.render(&mut ctx, &mat4::IDENTITY, &mat4::IDENTITY),
            Err(ComponentError::Gpu(GpuError::Disposed))
        );
        assert_eq!(ctx.command_count(), 0);
    }
}
