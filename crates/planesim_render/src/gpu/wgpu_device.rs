//! Windowed device backed by wgpu
//!
//! Programs are WGSL modules. A render pipeline is built lazily for each
//! (vertex program, pixel program, input layout) triple and cached until
//! one of the three is released. All programs share one bind group layout:
//!
//! | binding | contents                         |
//! |---------|----------------------------------|
//! | 0       | constant buffer, slot 0          |
//! | 1       | pixel sampler, slot 0            |
//! | 2       | pixel texture, slot 0            |
//! | 3       | pixel texture, slot 1            |
//!
//! Unbound slots are filled with small fallback objects.

use std::collections::HashMap;
use std::sync::Arc;

use slotmap::SlotMap;
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{
    entry_point_declared, plan_batches, AddressMode, BindFlags, BufferDesc, BufferHandle,
    BufferUsage, DrawCall, DrawContext, Filter, GpuError, GraphicsDevice, LayoutHandle,
    ProgramHandle, ProgramSource, Resource, ResourceId, ResourceKind, SamplerDesc, SamplerHandle,
    ShaderStage, TextureDesc, TextureViewHandle, VertexElementFormat, VertexFormat,
};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const FALLBACK_UNIFORM_SIZE: u64 = 256;

enum WgpuResource {
    Program {
        module: wgpu::ShaderModule,
        entry_point: String,
        stage: ShaderStage,
    },
    InputLayout {
        stride: u32,
        attributes: Vec<wgpu::VertexAttribute>,
    },
    Buffer {
        buffer: wgpu::Buffer,
        size: u64,
        usage: BufferUsage,
        bind: BindFlags,
    },
    Sampler(wgpu::Sampler),
    TextureView {
        _texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
}

impl WgpuResource {
    fn kind(&self) -> ResourceKind {
        match self {
            WgpuResource::Program { .. } => ResourceKind::Program,
            WgpuResource::InputLayout { .. } => ResourceKind::InputLayout,
            WgpuResource::Buffer { .. } => ResourceKind::Buffer,
            WgpuResource::Sampler(_) => ResourceKind::Sampler,
            WgpuResource::TextureView { .. } => ResourceKind::TextureView,
        }
    }
}

type PipelineKey = (ResourceId, ResourceId, ResourceId);

/// Objects bound in place of empty slots
struct Fallbacks {
    uniform: wgpu::Buffer,
    sampler: wgpu::Sampler,
    _texture: wgpu::Texture,
    texture_view: wgpu::TextureView,
}

/// [`GraphicsDevice`] presenting to a winit window
pub struct WgpuDevice {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    adapter_name: String,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    depth_view: wgpu::TextureView,
    fallbacks: Fallbacks,
    resources: SlotMap<ResourceId, WgpuResource>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    shut_down: bool,
}

impl WgpuDevice {
    /// Create a device presenting to `window`
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| GpuError::Creation(format!("surface: {}", e)))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| GpuError::Creation("no suitable GPU adapter".to_string()))?;

        let adapter_name = adapter.get_info().name;
        log::info!("Using adapter: {} ({:?})", adapter_name, adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("PlaneSim Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| GpuError::Creation(format!("device: {}", e)))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| GpuError::Creation("surface has no formats".to_string()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Program Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture_entry(2),
                texture_entry(3),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Program Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let depth_view = create_depth_view(&device, config.width, config.height);
        let fallbacks = create_fallbacks(&device, &queue);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            adapter_name,
            bind_group_layout,
            pipeline_layout,
            depth_view,
            fallbacks,
            resources: SlotMap::with_key(),
            pipelines: HashMap::new(),
            shut_down: false,
        })
    }

    fn ensure_alive(&self) -> Result<(), GpuError> {
        if self.shut_down {
            Err(GpuError::Disposed)
        } else {
            Ok(())
        }
    }

    fn lookup(&self, id: ResourceId, expected: ResourceKind) -> Result<&WgpuResource, GpuError> {
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

    fn program(&self, handle: ProgramHandle, stage: ShaderStage) -> Result<(&wgpu::ShaderModule, &str), GpuError> {
        match self.lookup(handle.0, ResourceKind::Program)? {
            WgpuResource::Program { module, entry_point, stage: actual } if *actual == stage => {
                Ok((module, entry_point.as_str()))
            }
            _ => Err(GpuError::WrongKind {
                expected: ResourceKind::Program,
                detail: format!("program bound to the {:?} stage was compiled for another", stage),
            }),
        }
    }

    fn buffer(&self, handle: BufferHandle, bind: BindFlags) -> Result<(&wgpu::Buffer, u64), GpuError> {
        match self.lookup(handle.0, ResourceKind::Buffer)? {
            WgpuResource::Buffer { buffer, size, bind: flags, .. } if flags.contains(bind) => Ok((buffer, *size)),
            _ => Err(GpuError::WrongKind {
                expected: ResourceKind::Buffer,
                detail: format!("buffer not created for {:?}", bind),
            }),
        }
    }

    fn sampler(&self, handle: Option<&SamplerHandle>) -> Result<&wgpu::Sampler, GpuError> {
        match handle {
            None => Ok(&self.fallbacks.sampler),
            Some(h) => match self.lookup(h.0, ResourceKind::Sampler)? {
                WgpuResource::Sampler(sampler) => Ok(sampler),
                _ => Err(GpuError::InvalidHandle { kind: ResourceKind::Sampler }),
            },
        }
    }

    fn texture_view(&self, handle: Option<&TextureViewHandle>) -> Result<&wgpu::TextureView, GpuError> {
        match handle {
            None => Ok(&self.fallbacks.texture_view),
            Some(h) => match self.lookup(h.0, ResourceKind::TextureView)? {
                WgpuResource::TextureView { view, .. } => Ok(view),
                _ => Err(GpuError::InvalidHandle { kind: ResourceKind::TextureView }),
            },
        }
    }

    fn ensure_pipeline(&mut self, draw: &DrawCall) -> Result<PipelineKey, GpuError> {
        let key = (draw.vertex_program.0, draw.pixel_program.0, draw.layout.0);
        if self.pipelines.contains_key(&key) {
            return Ok(key);
        }

        let (vs_module, vs_entry) = self.program(draw.vertex_program, ShaderStage::Vertex)?;
        let (ps_module, ps_entry) = self.program(draw.pixel_program, ShaderStage::Pixel)?;
        let (stride, attributes) = match self.lookup(draw.layout.0, ResourceKind::InputLayout)? {
            WgpuResource::InputLayout { stride, attributes } => (*stride, attributes.as_slice()),
            _ => return Err(GpuError::InvalidHandle { kind: ResourceKind::InputLayout }),
        };

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Program Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: vs_module,
                entry_point: Some(vs_entry),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: stride as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: ps_module,
                entry_point: Some(ps_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Cw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        log::debug!("Created pipeline for {} / {}", vs_entry, ps_entry);
        self.pipelines.insert(key, pipeline);
        Ok(key)
    }

    fn create_bind_group(&self, draw: &DrawCall) -> Result<wgpu::BindGroup, GpuError> {
        let constants = draw
            .constant_buffers
            .get(&(ShaderStage::Vertex, 0))
            .or_else(|| draw.constant_buffers.get(&(ShaderStage::Pixel, 0)));
        let uniform = match constants {
            Some(handle) => self.buffer(*handle, BindFlags::CONSTANT_BUFFER)?.0,
            None => &self.fallbacks.uniform,
        };

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Program Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(self.sampler(draw.samplers.get(&0))?),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(
                        self.texture_view(draw.textures.get(&0))?,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(
                        self.texture_view(draw.textures.get(&1))?,
                    ),
                },
            ],
        }))
    }

    fn acquire_frame(&mut self) -> Result<wgpu::SurfaceTexture, GpuError> {
        match self.surface.get_current_texture() {
            Ok(output) => Ok(output),
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                Err(GpuError::SurfaceLost)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(GpuError::OutOfMemory),
            Err(e) => Err(GpuError::Surface(format!("{:?}", e))),
        }
    }
}

impl GraphicsDevice for WgpuDevice {
    fn name(&self) -> &str {
        &self.adapter_name
    }

    fn compile_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramHandle, GpuError> {
        self.ensure_alive()?;
        if !entry_point_declared(source.source, source.entry_point) {
            return Err(GpuError::Compile {
                label: source.label.to_string(),
                message: format!("entry point '{}' not found", source.entry_point),
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(source.label),
            source: wgpu::ShaderSource::Wgsl(source.source.into()),
        });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GpuError::Compile {
                label: source.label.to_string(),
                message: error.to_string(),
            });
        }

        log::debug!("Compiled {} ({}, {})", source.label, source.entry_point, source.target);
        let id = self.resources.insert(WgpuResource::Program {
            module,
            entry_point: source.entry_point.to_string(),
            stage: source.stage,
        });
        Ok(ProgramHandle(id))
    }

    fn create_input_layout(
        &mut self,
        vertex_program: ProgramHandle,
        format: &VertexFormat,
    ) -> Result<LayoutHandle, GpuError> {
        self.ensure_alive()?;
        self.program(vertex_program, ShaderStage::Vertex)?;
        if !format.is_consistent() {
            return Err(GpuError::Creation("vertex format elements exceed the stride".to_string()));
        }

        let attributes = format
            .elements
            .iter()
            .enumerate()
            .map(|(location, element)| wgpu::VertexAttribute {
                format: match element.format {
                    VertexElementFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
                    VertexElementFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
                    VertexElementFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
                },
                offset: element.offset as wgpu::BufferAddress,
                shader_location: location as u32,
            })
            .collect();

        let id = self.resources.insert(WgpuResource::InputLayout {
            stride: format.stride,
            attributes,
        });
        Ok(LayoutHandle(id))
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GpuError> {
        self.ensure_alive()?;
        desc.validate()?;

        let mut usage = wgpu::BufferUsages::COPY_DST;
        if desc.bind.contains(BindFlags::CONSTANT_BUFFER) {
            usage |= wgpu::BufferUsages::UNIFORM;
        }
        if desc.bind.contains(BindFlags::VERTEX_BUFFER) {
            usage |= wgpu::BufferUsages::VERTEX;
        }
        if desc.bind.contains(BindFlags::INDEX_BUFFER) {
            usage |= wgpu::BufferUsages::INDEX;
        }

        let buffer = match desc.contents {
            Some(contents) => self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(desc.label),
                contents,
                usage,
            }),
            None => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(desc.label),
                size: desc.size,
                usage,
                mapped_at_creation: false,
            }),
        };

        let id = self.resources.insert(WgpuResource::Buffer {
            buffer,
            size: desc.size,
            usage: desc.usage,
            bind: desc.bind,
        });
        Ok(BufferHandle(id))
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, GpuError> {
        self.ensure_alive()?;
        if desc.mip_lod_bias != 0.0 {
            log::debug!("Mip LOD bias {} is not supported and will be ignored", desc.mip_lod_bias);
        }

        let all_linear = [desc.min_filter, desc.mag_filter, desc.mip_filter]
            .iter()
            .all(|f| *f == Filter::Linear);
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sampler"),
            address_mode_u: address_mode(desc.address_u),
            address_mode_v: address_mode(desc.address_v),
            address_mode_w: address_mode(desc.address_w),
            mag_filter: filter_mode(desc.mag_filter),
            min_filter: filter_mode(desc.min_filter),
            mipmap_filter: filter_mode(desc.mip_filter),
            lod_min_clamp: desc.min_lod.clamp(0.0, 32.0),
            lod_max_clamp: desc.max_lod.min(32.0).max(desc.min_lod.clamp(0.0, 32.0)),
            compare: None,
            anisotropy_clamp: if all_linear { desc.max_anisotropy.clamp(1, 16) } else { 1 },
            border_color: None,
        });

        let id = self.resources.insert(WgpuResource::Sampler(sampler));
        Ok(SamplerHandle(id))
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureViewHandle, GpuError> {
        self.ensure_alive()?;
        desc.validate()?;

        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(desc.label),
                size: wgpu::Extent3d {
                    width: desc.width,
                    height: desc.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            desc.texels,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = self.resources.insert(WgpuResource::TextureView {
            _texture: texture,
            view,
        });
        Ok(TextureViewHandle(id))
    }

    fn release(&mut self, resource: Resource) {
        let id = resource.id();
        if self.resources.remove(id).is_none() {
            log::debug!("Ignoring release of unknown {} handle", resource.kind());
            return;
        }
        if matches!(resource, Resource::Program(_) | Resource::InputLayout(_)) {
            self.pipelines
                .retain(|(vs, ps, layout), _| *vs != id && *ps != id && *layout != id);
        }
    }

    fn submit(&mut self, frame: DrawContext) -> Result<(), GpuError> {
        self.ensure_alive()?;
        let clear = frame.clear_color();
        let batches = plan_batches(frame.into_commands())?;

        // Validate the whole frame before touching the surface
        let mut keys = Vec::new();
        for batch in &batches {
            for draw in &batch.draws {
                keys.push(self.ensure_pipeline(draw)?);
            }
            for (buffer, data) in &batch.uploads {
                match self.lookup(buffer.0, ResourceKind::Buffer)? {
                    WgpuResource::Buffer { usage: BufferUsage::Dynamic, size, .. } => {
                        if *size != data.len() as u64 {
                            return Err(GpuError::SizeMismatch {
                                expected: *size,
                                actual: data.len() as u64,
                            });
                        }
                    }
                    _ => {
                        return Err(GpuError::WrongKind {
                            expected: ResourceKind::Buffer,
                            detail: "only dynamic buffers can be mapped".to_string(),
                        })
                    }
                }
            }
        }

        let output = self.acquire_frame()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let clear_color = wgpu::Color {
            r: clear[0] as f64,
            g: clear[1] as f64,
            b: clear[2] as f64,
            a: clear[3] as f64,
        };

        let mut keys = keys.into_iter();
        let pass_count = batches.len().max(1);
        for pass_index in 0..pass_count {
            let batch = batches.get(pass_index);

            // Each batch is its own queue submission so its uploads are seen
            // by its draws and not by earlier ones
            if let Some(batch) = batch {
                for (buffer, data) in &batch.uploads {
                    let (target, _) = self.buffer(*buffer, BindFlags::empty())?;
                    self.queue.write_buffer(target, 0, data);
                }
            }

            let mut prepared = Vec::new();
            if let Some(batch) = batch {
                for draw in &batch.draws {
                    let key = keys.next().ok_or(GpuError::IncompleteState("pipeline missing"))?;
                    let pipeline = self
                        .pipelines
                        .get(&key)
                        .ok_or(GpuError::IncompleteState("pipeline missing"))?;
                    let bind_group = self.create_bind_group(draw)?;
                    let (vertex_buffer, _) = self.buffer(draw.vertex_buffer, BindFlags::VERTEX_BUFFER)?;
                    let (index_buffer, _) = self.buffer(draw.index_buffer, BindFlags::INDEX_BUFFER)?;
                    prepared.push((draw, pipeline, bind_group, vertex_buffer, index_buffer));
                }
            }

            let (color_load, depth_load) = if pass_index == 0 {
                (wgpu::LoadOp::Clear(clear_color), wgpu::LoadOp::Clear(1.0))
            } else {
                (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
            };

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                });
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Frame Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: color_load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.depth_view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                for (draw, pipeline, bind_group, vertex_buffer, index_buffer) in &prepared {
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                    pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(
                        draw.start_index..draw.start_index + draw.index_count,
                        draw.base_vertex,
                        0..1,
                    );
                }
            }
            self.queue.submit(std::iter::once(encoder.finish()));
        }

        output.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || self.shut_down {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    fn live_resources(&self) -> usize {
        self.resources.len()
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        if !self.resources.is_empty() {
            log::warn!("Device shut down with {} live resources", self.resources.len());
        }
        self.pipelines.clear();
        self.resources.clear();
        let _ = self.device.poll(wgpu::Maintain::Wait);
        self.shut_down = true;
        log::info!("Graphics device shut down");
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_fallbacks(device: &wgpu::Device, queue: &wgpu::Queue) -> Fallbacks {
    let uniform = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Fallback Uniform Buffer"),
        size: FALLBACK_UNIFORM_SIZE,
        usage: wgpu::BufferUsages::UNIFORM,
        mapped_at_creation: false,
    });
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor::default());
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("Fallback Texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &[255, 255, 255, 255],
    );
    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Fallbacks {
        uniform,
        sampler,
        _texture: texture,
        texture_view,
    }
}

fn filter_mode(filter: Filter) -> wgpu::FilterMode {
    match filter {
        Filter::Point => wgpu::FilterMode::Nearest,
        Filter::Linear => wgpu::FilterMode::Linear,
    }
}

fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::Wrap => wgpu::AddressMode::Repeat,
        AddressMode::Mirror => wgpu::AddressMode::MirrorRepeat,
        AddressMode::Clamp => wgpu::AddressMode::ClampToEdge,
    }
}
