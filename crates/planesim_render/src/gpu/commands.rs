//! Per-frame command recording
//!
//! Components record pipeline bindings, constant-buffer writes and draw calls
//! into a [`DrawContext`]. The device turns the recording into
//! [`Batch`]es: buffer uploads that must land before a group of draws.
//! A buffer rewritten after a draw already read it starts a new batch, so
//! every draw samples exactly the bytes that were written before it.

use std::collections::{BTreeMap, HashSet};

use bytemuck::Pod;

use super::{
    BufferHandle, GpuError, LayoutHandle, ProgramHandle, SamplerHandle, ShaderStage,
    TextureViewHandle,
};

/// One recorded pipeline operation
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Whole-buffer replacement published when a mapped write is unmapped
    UpdateBuffer { buffer: BufferHandle, data: Vec<u8> },
    SetConstantBuffer { stage: ShaderStage, slot: u32, buffer: BufferHandle },
    SetInputLayout(LayoutHandle),
    SetProgram { stage: ShaderStage, program: ProgramHandle },
    /// Pixel stage sampler
    SetSampler { slot: u32, sampler: SamplerHandle },
    /// Pixel stage texture
    SetTexture { slot: u32, view: TextureViewHandle },
    SetVertexBuffer { buffer: BufferHandle, stride: u32 },
    SetIndexBuffer(BufferHandle),
    DrawIndexed { index_count: u32, start_index: u32, base_vertex: i32 },
}

/// Recording surface handed to every renderable for one frame
#[derive(Debug)]
pub struct DrawContext {
    clear_color: [f32; 4],
    commands: Vec<Command>,
}

impl DrawContext {
    pub fn new(clear_color: [f32; 4]) -> Self {
        Self {
            clear_color,
            commands: Vec::new(),
        }
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Discard everything recorded after the first `len` commands
    pub fn truncate(&mut self, len: usize) {
        self.commands.truncate(len);
    }

    /// Number of draw calls recorded so far
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawIndexed { .. }))
            .count()
    }

    /// Map a dynamic buffer for writing with discard semantics
    ///
    /// The returned guard owns a fresh zeroed region of `size` bytes. Its
    /// contents are published as a single whole-buffer update when the guard
    /// is dropped (unmap). A region that was not completely written, or saw a
    /// rejected write, is discarded instead, so no draw observes a partial write.
    pub fn map_discard(&mut self, buffer: BufferHandle, size: usize) -> MappedBuffer<'_> {
        MappedBuffer {
            ctx: self,
            buffer,
            data: vec![0; size],
            cursor: 0,
            failed: false,
        }
    }

    pub fn set_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: BufferHandle) {
        self.commands.push(Command::SetConstantBuffer { stage, slot, buffer });
    }

    pub fn set_input_layout(&mut self, layout: LayoutHandle) {
        self.commands.push(Command::SetInputLayout(layout));
    }

    pub fn set_program(&mut self, stage: ShaderStage, program: ProgramHandle) {
        self.commands.push(Command::SetProgram { stage, program });
    }

    pub fn set_sampler(&mut self, slot: u32, sampler: SamplerHandle) {
        self.commands.push(Command::SetSampler { slot, sampler });
    }

    pub fn set_texture(&mut self, slot: u32, view: TextureViewHandle) {
        self.commands.push(Command::SetTexture { slot, view });
    }

    pub fn set_vertex_buffer(&mut self, buffer: BufferHandle, stride: u32) {
        self.commands.push(Command::SetVertexBuffer { buffer, stride });
    }

    pub fn set_index_buffer(&mut self, buffer: BufferHandle) {
        self.commands.push(Command::SetIndexBuffer(buffer));
    }

    pub fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32) {
        self.commands.push(Command::DrawIndexed {
            index_count,
            start_index,
            base_vertex,
        });
    }
}

/// CPU-side write window into a dynamic buffer; dropping it unmaps
pub struct MappedBuffer<'a> {
    ctx: &'a mut DrawContext,
    buffer: BufferHandle,
    data: Vec<u8>,
    cursor: usize,
    failed: bool,
}

impl MappedBuffer<'_> {
    /// Append `value` at the current write position
    pub fn write<T: Pod>(&mut self, value: &T) -> Result<(), GpuError> {
        let bytes = bytemuck::bytes_of(value);
        let end = self.cursor + bytes.len();
        if end > self.data.len() {
            self.failed = true;
            return Err(GpuError::SizeMismatch {
                expected: self.data.len() as u64,
                actual: end as u64,
            });
        }
        self.data[self.cursor..end].copy_from_slice(bytes);
        self.cursor = end;
        Ok(())
    }

    /// Size of the mapped region in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether dropping the guard will publish the region
    pub fn is_complete(&self) -> bool {
        !self.failed && self.cursor == self.data.len()
    }
}

impl Drop for MappedBuffer<'_> {
    fn drop(&mut self) {
        if !self.is_complete() {
            log::warn!(
                "Discarding partial write to buffer {:?} ({} of {} bytes{})",
                self.buffer,
                self.cursor,
                self.data.len(),
                if self.failed { ", write rejected" } else { "" }
            );
            return;
        }
        let data = std::mem::take(&mut self.data);
        self.ctx.commands.push(Command::UpdateBuffer {
            buffer: self.buffer,
            data,
        });
    }
}

/// Fully resolved pipeline state of one draw call
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub vertex_program: ProgramHandle,
    pub pixel_program: ProgramHandle,
    pub layout: LayoutHandle,
    pub constant_buffers: BTreeMap<(ShaderStage, u32), BufferHandle>,
    pub samplers: BTreeMap<u32, SamplerHandle>,
    pub textures: BTreeMap<u32, TextureViewHandle>,
    pub vertex_buffer: BufferHandle,
    pub vertex_stride: u32,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
}

/// Uploads followed by the draws that read them
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    pub uploads: Vec<(BufferHandle, Vec<u8>)>,
    pub draws: Vec<DrawCall>,
}

#[derive(Default)]
struct PipelineState {
    vertex_program: Option<ProgramHandle>,
    pixel_program: Option<ProgramHandle>,
    layout: Option<LayoutHandle>,
    constant_buffers: BTreeMap<(ShaderStage, u32), BufferHandle>,
    samplers: BTreeMap<u32, SamplerHandle>,
    textures: BTreeMap<u32, TextureViewHandle>,
    vertex_buffer: Option<(BufferHandle, u32)>,
    index_buffer: Option<BufferHandle>,
}

impl PipelineState {
    fn resolve(&self, index_count: u32, start_index: u32, base_vertex: i32) -> Result<DrawCall, GpuError> {
        let vertex_program = self.vertex_program.ok_or(GpuError::IncompleteState("no vertex program bound"))?;
        let pixel_program = self.pixel_program.ok_or(GpuError::IncompleteState("no pixel program bound"))?;
        let layout = self.layout.ok_or(GpuError::IncompleteState("no input layout bound"))?;
        let (vertex_buffer, vertex_stride) = self
            .vertex_buffer
            .ok_or(GpuError::IncompleteState("no vertex buffer bound"))?;
        let index_buffer = self.index_buffer.ok_or(GpuError::IncompleteState("no index buffer bound"))?;
        if index_count == 0 {
            return Err(GpuError::IncompleteState("draw with zero indices"));
        }

        Ok(DrawCall {
            vertex_program,
            pixel_program,
            layout,
            constant_buffers: self.constant_buffers.clone(),
            samplers: self.samplers.clone(),
            textures: self.textures.clone(),
            vertex_buffer,
            vertex_stride,
            index_buffer,
            index_count,
            start_index,
            base_vertex,
        })
    }

    fn buffers_read(&self) -> impl Iterator<Item = BufferHandle> + '_ {
        self.constant_buffers
            .values()
            .copied()
            .chain(self.vertex_buffer.map(|(b, _)| b))
            .chain(self.index_buffer)
    }
}

/// Split a recorded frame into upload/draw batches
pub fn plan_batches(commands: Vec<Command>) -> Result<Vec<Batch>, GpuError> {
    let mut batches = Vec::new();
    let mut current = Batch::default();
    let mut read_in_batch: HashSet<BufferHandle> = HashSet::new();
    let mut state = PipelineState::default();

    for command in commands {
        match command {
            Command::UpdateBuffer { buffer, data } => {
                if read_in_batch.contains(&buffer) {
                    batches.push(std::mem::take(&mut current));
                    read_in_batch.clear();
                }
                // Later writes in the same batch supersede earlier ones
                current.uploads.retain(|(b, _)| *b != buffer);
                current.uploads.push((buffer, data));
            }
            Command::SetConstantBuffer { stage, slot, buffer } => {
                state.constant_buffers.insert((stage, slot), buffer);
            }
            Command::SetInputLayout(layout) => state.layout = Some(layout),
            Command::SetProgram { stage: ShaderStage::Vertex, program } => {
                state.vertex_program = Some(program)
            }
            Command::SetProgram { stage: ShaderStage::Pixel, program } => {
                state.pixel_program = Some(program)
            }
            Command::SetSampler { slot, sampler } => {
                state.samplers.insert(slot, sampler);
            }
            Command::SetTexture { slot, view } => {
                state.textures.insert(slot, view);
            }
            Command::SetVertexBuffer { buffer, stride } => state.vertex_buffer = Some((buffer, stride)),
            Command::SetIndexBuffer(buffer) => state.index_buffer = Some(buffer),
            Command::DrawIndexed { index_count, start_index, base_vertex } => {
                let draw = state.resolve(index_count, start_index, base_vertex)?;
                read_in_batch.extend(state.buffers_read());
                current.draws.push(draw);
            }
        }
    }

    if !current.uploads.is_empty() || !current.draws.is_empty() {
        batches.push(current);
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{BufferDesc, GraphicsDevice, HeadlessDevice, VertexFormat};
    use crate::gpu::ProgramSource;

    struct Fixture {
        vs: ProgramHandle,
        ps: ProgramHandle,
        layout: LayoutHandle,
        cb: BufferHandle,
        vb: BufferHandle,
        ib: BufferHandle,
    }

    fn fixture(device: &mut HeadlessDevice) -> Fixture {
        let source = "fn vs() {}\nfn ps() {}";
        let vs = device
            .compile_program(&ProgramSource {
                label: "t",
                source,
                entry_point: "vs",
                stage: ShaderStage::Vertex,
                target: "vs_4_0",
            })
            .unwrap();
        let ps = device
            .compile_program(&ProgramSource {
                label: "t",
                source,
                entry_point: "ps",
                stage: ShaderStage::Pixel,
                target: "ps_4_0",
            })
            .unwrap();
        let layout = device.create_input_layout(vs, &VertexFormat::POSITION_TEXTURE).unwrap();
        let cb = device.create_buffer(&BufferDesc::constant("cb", 4)).unwrap();
        let vb = device.create_buffer(&BufferDesc::vertex("vb", &[0u8; 60])).unwrap();
        let ib = device.create_buffer(&BufferDesc::index("ib", &[0u8; 12])).unwrap();
        Fixture { vs, ps, layout, cb, vb, ib }
    }

    fn bind(ctx: &mut DrawContext, f: &Fixture) {
        ctx.set_constant_buffer(ShaderStage::Vertex, 0, f.cb);
        ctx.set_input_layout(f.layout);
        ctx.set_program(ShaderStage::Vertex, f.vs);
        ctx.set_program(ShaderStage::Pixel, f.ps);
        ctx.set_vertex_buffer(f.vb, 20);
        ctx.set_index_buffer(f.ib);
    }

    #[test]
    fn test_mapped_write_is_published_on_drop() {
        let mut device = HeadlessDevice::new(4, 4);
        let f = fixture(&mut device);
        let mut ctx = DrawContext::new([0.0; 4]);

        {
            let mut mapped = ctx.map_discard(f.cb, 4);
            mapped.write(&7u32).unwrap();
            // Nothing visible while mapped
        }

        assert_eq!(
            ctx.commands(),
            &[Command::UpdateBuffer { buffer: f.cb, data: 7u32.to_ne_bytes().to_vec() }]
        );
    }

    #[test]
    fn test_mapped_write_overflow_rejected() {
        let mut device = HeadlessDevice::new(4, 4);
        let f = fixture(&mut device);
        let mut ctx = DrawContext::new([0.0; 4]);
        {
            let mut mapped = ctx.map_discard(f.cb, 4);
            assert!(mapped.write(&1u64).is_err());
            assert!(!mapped.is_complete());
        }
        assert!(ctx.commands().is_empty());
    }

    #[test]
    fn test_partial_mapped_write_is_discarded() {
        let mut device = HeadlessDevice::new(4, 4);
        let f = fixture(&mut device);
        let mut ctx = DrawContext::new([0.0; 4]);

        {
            let mut mapped = ctx.map_discard(f.cb, 16);
            mapped.write(&7u32).unwrap();
            assert!(!mapped.is_complete());
        }
        assert!(ctx.commands().is_empty());

        {
            let mut mapped = ctx.map_discard(f.cb, 16);
            mapped.write(&[1u32, 2, 3, 4]).unwrap();
            assert!(mapped.is_complete());
        }
        assert!(matches!(
            ctx.commands(),
            [Command::UpdateBuffer { data, .. }] if data.len() == 16
        ));
    }

    #[test]
    fn test_write_after_rejected_write_is_still_discarded() {
        let mut device = HeadlessDevice::new(4, 4);
        let f = fixture(&mut device);
        let mut ctx = DrawContext::new([0.0; 4]);

        {
            let mut mapped = ctx.map_discard(f.cb, 4);
            assert!(mapped.write(&1u64).is_err());
            mapped.write(&1u32).unwrap();
        }
        assert!(ctx.commands().is_empty());
    }

    #[test]
    fn test_rewrite_after_draw_starts_new_batch() {
        let mut device = HeadlessDevice::new(4, 4);
        let f = fixture(&mut device);
        let mut ctx = DrawContext::new([0.0; 4]);

        for value in [1u32, 2u32] {
            ctx.map_discard(f.cb, 4).write(&value).unwrap();
            bind(&mut ctx, &f);
            ctx.draw_indexed(3, 0, 0);
        }

        let batches = plan_batches(ctx.into_commands()).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].uploads[0].1, 1u32.to_ne_bytes().to_vec());
        assert_eq!(batches[1].uploads[0].1, 2u32.to_ne_bytes().to_vec());
        assert_eq!(batches[0].draws.len(), 1);
        assert_eq!(batches[1].draws.len(), 1);
    }

    #[test]
    fn test_draw_without_program_is_incomplete() {
        let mut device = HeadlessDevice::new(4, 4);
        let f = fixture(&mut device);
        let mut ctx = DrawContext::new([0.0; 4]);
        ctx.set_vertex_buffer(f.vb, 20);
        ctx.set_index_buffer(f.ib);
        ctx.draw_indexed(3, 0, 0);

        assert!(matches!(
            plan_batches(ctx.into_commands()),
            Err(GpuError::IncompleteState(_))
        ));
    }

    #[test]
    fn test_empty_frame_has_no_batches() {
        let ctx = DrawContext::new([0.0; 4]);
        assert!(plan_batches(ctx.into_commands()).unwrap().is_empty());
    }
}
