//! Scoped acquisition and exhaustive release of device objects
//!
//! Everything a component allocates goes through a [`ResourceScope`]. If
//! construction fails part way, dropping the scope releases what was already
//! acquired. On success the scope is committed into an [`OwnedResources`]
//! list, which releases every entry on dispose, so a newly added handle can
//! never be left out of teardown.

use super::{
    BufferDesc, BufferHandle, GpuError, GraphicsDevice, LayoutHandle, ProgramHandle,
    ProgramSource, Resource, SamplerDesc, SamplerHandle, TextureDesc, TextureViewHandle,
    VertexFormat,
};

/// The complete set of device objects owned by one component
#[derive(Debug, Default)]
pub struct OwnedResources {
    handles: Vec<Resource>,
}

impl OwnedResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an already created object
    pub fn adopt(&mut self, resource: impl Into<Resource>) {
        self.handles.push(resource.into());
    }

    /// Number of objects still owned
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.handles.iter()
    }

    /// Move every object owned by `other` into this list
    pub fn absorb(&mut self, mut other: OwnedResources) {
        self.handles.append(&mut other.handles);
    }

    /// Release every owned object in reverse acquisition order
    ///
    /// Leaves the list empty, so calling it again is a no-op.
    pub fn release_all(&mut self, device: &mut dyn GraphicsDevice) {
        for resource in self.handles.drain(..).rev() {
            device.release(resource);
        }
    }
}

impl Drop for OwnedResources {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            log::warn!(
                "{} GPU resources dropped without release; they stay allocated until device shutdown",
                self.handles.len()
            );
        }
    }
}

/// Device borrow that records every object it creates
///
/// Dropping the scope without [`commit`](Self::commit) releases everything
/// created through it.
pub struct ResourceScope<'d> {
    device: &'d mut dyn GraphicsDevice,
    acquired: OwnedResources,
}

impl<'d> ResourceScope<'d> {
    pub fn new(device: &'d mut dyn GraphicsDevice) -> Self {
        Self {
            device,
            acquired: OwnedResources::new(),
        }
    }

    pub fn compile_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramHandle, GpuError> {
        let handle = self.device.compile_program(source)?;
        self.acquired.adopt(handle);
        Ok(handle)
    }

    pub fn create_input_layout(
        &mut self,
        vertex_program: ProgramHandle,
        format: &VertexFormat,
    ) -> Result<LayoutHandle, GpuError> {
        let handle = self.device.create_input_layout(vertex_program, format)?;
        self.acquired.adopt(handle);
        Ok(handle)
    }

    pub fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GpuError> {
        let handle = self.device.create_buffer(desc)?;
        self.acquired.adopt(handle);
        Ok(handle)
    }

    pub fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, GpuError> {
        let handle = self.device.create_sampler(desc)?;
        self.acquired.adopt(handle);
        Ok(handle)
    }

    pub fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureViewHandle, GpuError> {
        let handle = self.device.create_texture(desc)?;
        self.acquired.adopt(handle);
        Ok(handle)
    }

    /// The borrowed device, for building sub-objects inside this scope
    pub fn device(&mut self) -> &mut dyn GraphicsDevice {
        &mut *self.device
    }

    /// Track objects a sub-object created, so abandoning the scope releases them too
    pub fn absorb(&mut self, owned: OwnedResources) {
        self.acquired.absorb(owned);
    }

    /// Keep everything acquired so far
    pub fn commit(mut self) -> OwnedResources {
        std::mem::take(&mut self.acquired)
    }
}

impl Drop for ResourceScope<'_> {
    fn drop(&mut self) {
        if !self.acquired.is_empty() {
            log::debug!(
                "Releasing {} resources from an abandoned construction",
                self.acquired.len()
            );
            self.acquired.release_all(&mut *self.device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{HeadlessDevice, ShaderStage};

    const SOURCE: &str = "fn vs_main() {}\nfn ps_main() {}";

    fn program(entry: &str, stage: ShaderStage) -> ProgramSource<'_> {
        ProgramSource {
            label: "test",
            source: SOURCE,
            entry_point: entry,
            stage,
            target: "vs_4_0",
        }
    }

    #[test]
    fn test_committed_scope_keeps_resources() {
        let mut device = HeadlessDevice::new(800, 600);
        let monitor = device.monitor();

        let mut owned = {
            let mut scope = ResourceScope::new(&mut device);
            scope.compile_program(&program("vs_main", ShaderStage::Vertex)).unwrap();
            scope.create_buffer(&BufferDesc::constant("cb", 64)).unwrap();
            scope.commit()
        };

        assert_eq!(owned.len(), 2);
        assert_eq!(monitor.live_resources(), 2);

        owned.release_all(&mut device);
        assert!(owned.is_empty());
        assert_eq!(monitor.live_resources(), 0);
    }

    #[test]
    fn test_abandoned_scope_releases_everything() {
        let mut device = HeadlessDevice::new(800, 600);
        let monitor = device.monitor();

        let result: Result<OwnedResources, GpuError> = (|| {
            let mut scope = ResourceScope::new(&mut device);
            scope.compile_program(&program("vs_main", ShaderStage::Vertex))?;
            scope.create_buffer(&BufferDesc::constant("cb", 64))?;
            // Not declared in the source
            scope.compile_program(&program("missing", ShaderStage::Pixel))?;
            Ok(scope.commit())
        })();

        assert!(matches!(result, Err(GpuError::Compile { .. })));
        assert_eq!(monitor.live_resources(), 0);
        assert_eq!(monitor.total_created(), 2);
    }

    #[test]
    fn test_absorbed_resources_released_with_scope() {
        let mut device = HeadlessDevice::new(800, 600);
        let monitor = device.monitor();

        let result: Result<OwnedResources, GpuError> = (|| {
            let mut scope = ResourceScope::new(&mut device);
            scope.create_sampler(&SamplerDesc::wrap_linear())?;
            let inner = {
                let mut inner = ResourceScope::new(scope.device());
                inner.create_buffer(&BufferDesc::constant("cb", 64))?;
                inner.commit()
            };
            scope.absorb(inner);
            scope.compile_program(&program("missing", ShaderStage::Pixel))?;
            Ok(scope.commit())
        })();

        assert!(result.is_err());
        assert_eq!(monitor.total_created(), 2);
        assert_eq!(monitor.live_resources(), 0);
    }

    #[test]
    fn test_release_all_twice_is_noop() {
        let mut device = HeadlessDevice::new(800, 600);
        let monitor = device.monitor();

        let mut owned = {
            let mut scope = ResourceScope::new(&mut device);
            scope.create_sampler(&SamplerDesc::wrap_linear()).unwrap();
            scope.commit()
        };

        owned.release_all(&mut device);
        owned.release_all(&mut device);
        assert_eq!(monitor.total_released(), 1);
    }
}
