//! Device backend without a GPU
//!
//! Keeps every object in a slot map and executes submitted frames by
//! validating them and recording what each draw would have read. A
//! [`DeviceMonitor`] shares the state so tests and `--headless` runs can
//! inspect it after the device has been handed to a renderer.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use slotmap::SlotMap;

use super::{
    entry_point_declared, plan_batches, BindFlags, BufferDesc, BufferHandle, BufferUsage,
    DrawCall, DrawContext, GpuError, GraphicsDevice, LayoutHandle, ProgramHandle, ProgramSource,
    Resource, ResourceId, ResourceKind, SamplerDesc, SamplerHandle, ShaderStage, TextureDesc,
    TextureViewHandle, VertexFormat,
};

#[derive(Debug)]
enum HeadlessResource {
    Program { stage: ShaderStage, entry_point: String },
    InputLayout { stride: u32 },
    Buffer { usage: BufferUsage, bind: BindFlags, contents: Vec<u8> },
    Sampler(SamplerDesc),
    TextureView { width: u32, height: u32 },
}

impl HeadlessResource {
    fn kind(&self) -> ResourceKind {
        match self {
            HeadlessResource::Program { .. } => ResourceKind::Program,
            HeadlessResource::InputLayout { .. } => ResourceKind::InputLayout,
            HeadlessResource::Buffer { .. } => ResourceKind::Buffer,
            HeadlessResource::Sampler(_) => ResourceKind::Sampler,
            HeadlessResource::TextureView { .. } => ResourceKind::TextureView,
        }
    }
}

/// What one draw call of an executed frame read
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutedDraw {
    pub vertex_entry: String,
    pub pixel_entry: String,
    pub index_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
    /// Constant buffer bytes as seen by this draw, keyed by stage and slot
    pub constants: BTreeMap<(ShaderStage, u32), Vec<u8>>,
    pub textures: BTreeMap<u32, TextureViewHandle>,
    pub samplers: BTreeMap<u32, SamplerHandle>,
}

impl ExecutedDraw {
    /// Vertex stage constant buffer contents at `slot`
    pub fn vertex_constants(&self, slot: u32) -> Option<&[u8]> {
        self.constants.get(&(ShaderStage::Vertex, slot)).map(Vec::as_slice)
    }
}

/// One presented frame
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutedFrame {
    pub clear_color: [f32; 4],
    pub draws: Vec<ExecutedDraw>,
}

#[derive(Debug, Default)]
struct HeadlessState {
    resources: SlotMap<ResourceId, HeadlessResource>,
    total_created: usize,
    total_released: usize,
    programs_compiled: usize,
    released_at_shutdown: usize,
    failing_entries: HashSet<String>,
    pending_submit_error: Option<GpuError>,
    frames_submitted: usize,
    /// Only the most recent frame is kept; long headless runs stay flat
    last_frame: Option<ExecutedFrame>,
    shut_down: bool,
}

impl HeadlessState {
    fn insert(&mut self, resource: HeadlessResource) -> ResourceId {
        self.total_created += 1;
        self.resources.insert(resource)
    }

    fn lookup(&self, id: ResourceId, expected: ResourceKind) -> Result<&HeadlessResource, GpuError> {
        let resource = self
            .resources
            .get(id)
            .ok_or(GpuError::InvalidHandle { kind: expected })?;
        if resource.kind() != expected {
            return Err(GpuError::WrongKind {
                expected,
                detail: format!("found a {}", resource.kind()),
            });
        }
        Ok(resource)
    }

    fn program_entry(&self, handle: ProgramHandle, stage: ShaderStage) -> Result<String, GpuError> {
        match self.lookup(handle.0, ResourceKind::Program)? {
            HeadlessResource::Program { stage: actual, entry_point } if *actual == stage => {
                Ok(entry_point.clone())
            }
            HeadlessResource::Program { stage: actual, entry_point } => Err(GpuError::WrongKind {
                expected: ResourceKind::Program,
                detail: format!("'{}' is a {:?} program bound as {:?}", entry_point, actual, stage),
            }),
            _ => unreachable!("lookup checked the kind"),
        }
    }

    fn buffer(&self, handle: BufferHandle, bind: BindFlags) -> Result<&Vec<u8>, GpuError> {
        match self.lookup(handle.0, ResourceKind::Buffer)? {
            HeadlessResource::Buffer { bind: flags, contents, .. } if flags.contains(bind) => Ok(contents),
            HeadlessResource::Buffer { bind: flags, .. } => Err(GpuError::WrongKind {
                expected: ResourceKind::Buffer,
                detail: format!("buffer bound as {:?} but created for {:?}", bind, flags),
            }),
            _ => unreachable!("lookup checked the kind"),
        }
    }

    fn upload(&mut self, handle: BufferHandle, data: Vec<u8>) -> Result<(), GpuError> {
        self.lookup(handle.0, ResourceKind::Buffer)?;
        match self.resources.get_mut(handle.0) {
            Some(HeadlessResource::Buffer { usage: BufferUsage::Dynamic, contents, .. }) => {
                if contents.len() != data.len() {
                    return Err(GpuError::SizeMismatch {
                        expected: contents.len() as u64,
                        actual: data.len() as u64,
                    });
                }
                *contents = data;
                Ok(())
            }
            _ => Err(GpuError::WrongKind {
                expected: ResourceKind::Buffer,
                detail: "only dynamic buffers can be mapped".to_string(),
            }),
        }
    }

    fn execute(&self, draw: &DrawCall) -> Result<ExecutedDraw, GpuError> {
        let vertex_entry = self.program_entry(draw.vertex_program, ShaderStage::Vertex)?;
        let pixel_entry = self.program_entry(draw.pixel_program, ShaderStage::Pixel)?;

        let stride = match self.lookup(draw.layout.0, ResourceKind::InputLayout)? {
            HeadlessResource::InputLayout { stride } => *stride,
            _ => unreachable!("lookup checked the kind"),
        };
        if stride != draw.vertex_stride {
            return Err(GpuError::SizeMismatch {
                expected: stride as u64,
                actual: draw.vertex_stride as u64,
            });
        }

        let mut constants = BTreeMap::new();
        for (&key, &buffer) in &draw.constant_buffers {
            constants.insert(key, self.buffer(buffer, BindFlags::CONSTANT_BUFFER)?.clone());
        }
        for sampler in draw.samplers.values() {
            self.lookup(sampler.0, ResourceKind::Sampler)?;
        }
        for view in draw.textures.values() {
            self.lookup(view.0, ResourceKind::TextureView)?;
        }

        self.buffer(draw.vertex_buffer, BindFlags::VERTEX_BUFFER)?;
        let indices = self.buffer(draw.index_buffer, BindFlags::INDEX_BUFFER)?;
        let index_end = (draw.start_index as u64 + draw.index_count as u64) * 4;
        if index_end > indices.len() as u64 {
            return Err(GpuError::SizeMismatch {
                expected: indices.len() as u64,
                actual: index_end,
            });
        }

        Ok(ExecutedDraw {
            vertex_entry,
            pixel_entry,
            index_count: draw.index_count,
            start_index: draw.start_index,
            base_vertex: draw.base_vertex,
            constants,
            textures: draw.textures.clone(),
            samplers: draw.samplers.clone(),
        })
    }
}

/// GPU-less [`GraphicsDevice`]
pub struct HeadlessDevice {
    state: Rc<RefCell<HeadlessState>>,
    width: u32,
    height: u32,
}

impl HeadlessDevice {
    pub fn new(width: u32, height: u32) -> Self {
        log::info!("Using headless device ({}x{})", width, height);
        Self {
            state: Rc::new(RefCell::new(HeadlessState::default())),
            width,
            height,
        }
    }

    /// Shared view of this device's state
    pub fn monitor(&self) -> DeviceMonitor {
        DeviceMonitor {
            state: Rc::clone(&self.state),
        }
    }

    fn ensure_alive(&self) -> Result<(), GpuError> {
        if self.state.borrow().shut_down {
            Err(GpuError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn name(&self) -> &str {
        "Headless"
    }

    fn compile_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramHandle, GpuError> {
        self.ensure_alive()?;
        let mut state = self.state.borrow_mut();

        if !entry_point_declared(source.source, source.entry_point) {
            return Err(GpuError::Compile {
                label: source.label.to_string(),
                message: format!("entry point '{}' not found", source.entry_point),
            });
        }
        if state.failing_entries.contains(source.entry_point) {
            return Err(GpuError::Compile {
                label: source.label.to_string(),
                message: format!("injected failure compiling '{}'", source.entry_point),
            });
        }

        state.programs_compiled += 1;
        let id = state.insert(HeadlessResource::Program {
            stage: source.stage,
            entry_point: source.entry_point.to_string(),
        });
        log::debug!("Compiled {} ({}, {})", source.label, source.entry_point, source.target);
        Ok(ProgramHandle(id))
    }

    fn create_input_layout(
        &mut self,
        vertex_program: ProgramHandle,
        format: &VertexFormat,
    ) -> Result<LayoutHandle, GpuError> {
        self.ensure_alive()?;
        let mut state = self.state.borrow_mut();
        state.program_entry(vertex_program, ShaderStage::Vertex)?;
        if !format.is_consistent() {
            return Err(GpuError::Creation("vertex format elements exceed the stride".to_string()));
        }
        let id = state.insert(HeadlessResource::InputLayout { stride: format.stride });
        Ok(LayoutHandle(id))
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GpuError> {
        self.ensure_alive()?;
        desc.validate()?;
        let contents = match desc.contents {
            Some(data) => data.to_vec(),
            None => vec![0; desc.size as usize],
        };
        let id = self.state.borrow_mut().insert(HeadlessResource::Buffer {
            usage: desc.usage,
            bind: desc.bind,
            contents,
        });
        Ok(BufferHandle(id))
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, GpuError> {
        self.ensure_alive()?;
        let id = self.state.borrow_mut().insert(HeadlessResource::Sampler(*desc));
        Ok(SamplerHandle(id))
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureViewHandle, GpuError> {
        self.ensure_alive()?;
        desc.validate()?;
        let id = self.state.borrow_mut().insert(HeadlessResource::TextureView {
            width: desc.width,
            height: desc.height,
        });
        Ok(TextureViewHandle(id))
    }

    fn release(&mut self, resource: Resource) {
        let mut state = self.state.borrow_mut();
        if state.resources.remove(resource.id()).is_some() {
            state.total_released += 1;
        } else {
            log::debug!("Ignoring release of unknown {} handle", resource.kind());
        }
    }

    fn submit(&mut self, frame: DrawContext) -> Result<(), GpuError> {
        self.ensure_alive()?;
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.pending_submit_error.take() {
            return Err(err);
        }

        let clear_color = frame.clear_color();
        let mut draws = Vec::new();
        for batch in plan_batches(frame.into_commands())? {
            for (buffer, data) in batch.uploads {
                state.upload(buffer, data)?;
            }
            for draw in &batch.draws {
                draws.push(state.execute(draw)?);
            }
        }

        state.frames_submitted += 1;
        state.last_frame = Some(ExecutedFrame { clear_color, draws });
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    fn live_resources(&self) -> usize {
        self.state.borrow().resources.len()
    }

    fn shutdown(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.shut_down {
            return;
        }
        let leftover = state.resources.len();
        if leftover > 0 {
            log::warn!("Headless device shut down with {} live resources", leftover);
        }
        state.resources.clear();
        state.released_at_shutdown = leftover;
        state.shut_down = true;
    }
}

/// Read access to a [`HeadlessDevice`] plus failure injection
#[derive(Clone)]
pub struct DeviceMonitor {
    state: Rc<RefCell<HeadlessState>>,
}

impl DeviceMonitor {
    pub fn live_resources(&self) -> usize {
        self.state.borrow().resources.len()
    }

    pub fn total_created(&self) -> usize {
        self.state.borrow().total_created
    }

    pub fn total_released(&self) -> usize {
        self.state.borrow().total_released
    }

    pub fn programs_compiled(&self) -> usize {
        self.state.borrow().programs_compiled
    }

    /// Objects still alive when the device was shut down
    pub fn released_at_shutdown(&self) -> usize {
        self.state.borrow().released_at_shutdown
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.borrow().shut_down
    }

    pub fn frames_submitted(&self) -> usize {
        self.state.borrow().frames_submitted
    }

    pub fn last_frame(&self) -> Option<ExecutedFrame> {
        self.state.borrow().last_frame.clone()
    }

    /// Current contents of a buffer, if it is alive
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        match self.state.borrow().resources.get(buffer.0) {
            Some(HeadlessResource::Buffer { contents, .. }) => Some(contents.clone()),
            _ => None,
        }
    }

    /// Size of a texture, if it is alive
    pub fn texture_size(&self, view: TextureViewHandle) -> Option<(u32, u32)> {
        match self.state.borrow().resources.get(view.0) {
            Some(HeadlessResource::TextureView { width, height }) => Some((*width, *height)),
            _ => None,
        }
    }

    /// Make every later compile of `entry_point` fail
    pub fn fail_compilation_of(&self, entry_point: &str) {
        self.state.borrow_mut().failing_entries.insert(entry_point.to_string());
    }

    /// Make the next submit fail with `error` without executing anything
    pub fn fail_next_submit(&self, error: GpuError) {
        self.state.borrow_mut().pending_submit_error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "fn vs() {}\nfn ps() {}";

    fn source(entry: &'static str, stage: ShaderStage) -> ProgramSource<'static> {
        ProgramSource {
            label: "test",
            source: SOURCE,
            entry_point: entry,
            stage,
            target: "vs_4_0",
        }
    }

    #[test]
    fn test_release_unknown_handle_is_noop() {
        let mut device = HeadlessDevice::new(8, 8);
        let monitor = device.monitor();
        let buffer = device.create_buffer(&BufferDesc::constant("cb", 16)).unwrap();

        device.release(buffer.into());
        device.release(buffer.into());

        assert_eq!(monitor.total_released(), 1);
        assert_eq!(monitor.live_resources(), 0);
    }

    #[test]
    fn test_injected_compile_failure() {
        let mut device = HeadlessDevice::new(8, 8);
        device.monitor().fail_compilation_of("ps");

        assert!(device.compile_program(&source("vs", ShaderStage::Vertex)).is_ok());
        assert!(matches!(
            device.compile_program(&source("ps", ShaderStage::Pixel)),
            Err(GpuError::Compile { .. })
        ));
    }

    #[test]
    fn test_layout_requires_vertex_program() {
        let mut device = HeadlessDevice::new(8, 8);
        let ps = device.compile_program(&source("ps", ShaderStage::Pixel)).unwrap();
        assert!(matches!(
            device.create_input_layout(ps, &VertexFormat::POSITION_TEXTURE),
            Err(GpuError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_upload_to_released_buffer_fails_submit() {
        let mut device = HeadlessDevice::new(8, 8);
        let buffer = device.create_buffer(&BufferDesc::constant("cb", 4)).unwrap();
        device.release(buffer.into());

        let mut ctx = DrawContext::new([0.0; 4]);
        ctx.map_discard(buffer, 4).write(&1u32).unwrap();

        assert!(matches!(
            device.submit(ctx),
            Err(GpuError::InvalidHandle { kind: ResourceKind::Buffer })
        ));
    }

    #[test]
    fn test_upload_size_must_match() {
        let mut device = HeadlessDevice::new(8, 8);
        let buffer = device.create_buffer(&BufferDesc::constant("cb", 8)).unwrap();

        let mut ctx = DrawContext::new([0.0; 4]);
        ctx.map_discard(buffer, 4).write(&1u32).unwrap();

        assert!(matches!(device.submit(ctx), Err(GpuError::SizeMismatch { .. })));
    }

    #[test]
    fn test_shutdown_releases_leftovers() {
        let mut device = HeadlessDevice::new(8, 8);
        let monitor = device.monitor();
        device.create_sampler(&SamplerDesc::wrap_linear()).unwrap();

        device.shutdown();
        device.shutdown();

        assert!(monitor.is_shut_down());
        assert_eq!(monitor.released_at_shutdown(), 1);
        assert_eq!(monitor.live_resources(), 0);
        assert!(matches!(
            device.submit(DrawContext::new([0.0; 4])),
            Err(GpuError::Disposed)
        ));
    }

    #[test]
    fn test_empty_frame_is_recorded() {
        let mut device = HeadlessDevice::new(8, 8);
        let monitor = device.monitor();
        device.submit(DrawContext::new([0.1, 0.2, 0.3, 1.0])).unwrap();

        let frame = monitor.last_frame().unwrap();
        assert_eq!(frame.clear_color, [0.1, 0.2, 0.3, 1.0]);
        assert!(frame.draws.is_empty());
    }

    #[test]
    fn test_long_run_keeps_only_last_frame() {
        let mut device = HeadlessDevice::new(8, 8);
        let monitor = device.monitor();
        for i in 0..1000 {
            device.submit(DrawContext::new([i as f32, 0.0, 0.0, 1.0])).unwrap();
        }

        assert_eq!(monitor.frames_submitted(), 1000);
        assert_eq!(monitor.last_frame().unwrap().clear_color[0], 999.0);
    }

    #[test]
    fn test_aspect_ratio_ignores_zero_resize() {
        let mut device = HeadlessDevice::new(800, 600);
        device.resize(0, 0);
        assert!((device.aspect_ratio() - 800.0 / 600.0).abs() < 1e-6);
    }
}
