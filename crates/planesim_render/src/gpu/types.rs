//! Handles and resource descriptors shared by every device backend
//!
//! Handles are plain copyable keys. Ownership of the underlying GPU object is
//! tracked separately by [`OwnedResources`](super::OwnedResources); a handle
//! outliving its release is detected by the device when a frame executes.

use bitflags::bitflags;
use slotmap::new_key_type;

new_key_type! {
    /// Generational key of any device resource
    pub struct ResourceId;
}

/// Compiled vertex or pixel program
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) ResourceId);

/// Mapping from vertex memory to vertex program input slots
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayoutHandle(pub(crate) ResourceId);

/// Constant, vertex or index buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) ResourceId);

/// Texture sampler state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SamplerHandle(pub(crate) ResourceId);

/// Sampleable view of a texture (e.g. a reflection or refraction map)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureViewHandle(pub(crate) ResourceId);

/// The kind of object a handle refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Program,
    InputLayout,
    Buffer,
    Sampler,
    TextureView,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Program => "program",
            ResourceKind::InputLayout => "input layout",
            ResourceKind::Buffer => "buffer",
            ResourceKind::Sampler => "sampler",
            ResourceKind::TextureView => "texture view",
        };
        write!(f, "{}", name)
    }
}

/// Any owned device resource, as stored in a release list
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Program(ProgramHandle),
    InputLayout(LayoutHandle),
    Buffer(BufferHandle),
    Sampler(SamplerHandle),
    TextureView(TextureViewHandle),
}

impl Resource {
    /// The underlying device key
    pub fn id(&self) -> ResourceId {
        match self {
            Resource::Program(h) => h.0,
            Resource::InputLayout(h) => h.0,
            Resource::Buffer(h) => h.0,
            Resource::Sampler(h) => h.0,
            Resource::TextureView(h) => h.0,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Program(_) => ResourceKind::Program,
            Resource::InputLayout(_) => ResourceKind::InputLayout,
            Resource::Buffer(_) => ResourceKind::Buffer,
            Resource::Sampler(_) => ResourceKind::Sampler,
            Resource::TextureView(_) => ResourceKind::TextureView,
        }
    }
}

impl From<ProgramHandle> for Resource {
    fn from(h: ProgramHandle) -> Self {
        Resource::Program(h)
    }
}

impl From<LayoutHandle> for Resource {
    fn from(h: LayoutHandle) -> Self {
        Resource::InputLayout(h)
    }
}

impl From<BufferHandle> for Resource {
    fn from(h: BufferHandle) -> Self {
        Resource::Buffer(h)
    }
}

impl From<SamplerHandle> for Resource {
    fn from(h: SamplerHandle) -> Self {
        Resource::Sampler(h)
    }
}

impl From<TextureViewHandle> for Resource {
    fn from(h: TextureViewHandle) -> Self {
        Resource::TextureView(h)
    }
}

/// Pipeline stage a program runs in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

/// Program source text plus the entry point and target profile to build
#[derive(Clone, Copy, Debug)]
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub source: &'a str,
    pub entry_point: &'a str,
    pub stage: ShaderStage,
    /// Target stage/version string, e.g. `vs_4_0`
    pub target: &'a str,
}

/// Whether `source` declares a function named `entry_point`
pub fn entry_point_declared(source: &str, entry_point: &str) -> bool {
    let needle = format!("fn {}", entry_point);
    source.match_indices(&needle).any(|(at, _)| {
        let rest = &source[at + needle.len()..];
        rest.trim_start().starts_with('(')
    })
}

/// Format of one vertex element
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexElementFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexElementFormat {
    /// Size in bytes
    pub const fn size(self) -> u32 {
        match self {
            VertexElementFormat::Float32x2 => 8,
            VertexElementFormat::Float32x3 => 12,
            VertexElementFormat::Float32x4 => 16,
        }
    }
}

/// One field of a vertex, bound to the program input at the same index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexElement {
    pub semantic: &'static str,
    pub format: VertexElementFormat,
    pub offset: u32,
}

/// Memory layout of a vertex type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexFormat {
    pub stride: u32,
    pub elements: &'static [VertexElement],
}

impl VertexFormat {
    /// Position (xyz) followed by texture coordinates (uv)
    pub const POSITION_TEXTURE: VertexFormat = VertexFormat {
        stride: 20,
        elements: &[
            VertexElement {
                semantic: "POSITION",
                format: VertexElementFormat::Float32x3,
                offset: 0,
            },
            VertexElement {
                semantic: "TEXCOORD",
                format: VertexElementFormat::Float32x2,
                offset: 12,
            },
        ],
    };

    /// Whether every element lies inside the stride
    pub fn is_consistent(&self) -> bool {
        !self.elements.is_empty()
            && self
                .elements
                .iter()
                .all(|e| e.offset + e.format.size() <= self.stride)
    }
}

bitflags! {
    /// Pipeline bind points a buffer may be attached to
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct BindFlags: u32 {
        const CONSTANT_BUFFER = 1 << 0;
        const VERTEX_BUFFER = 1 << 1;
        const INDEX_BUFFER = 1 << 2;
    }
}

/// How a buffer's contents change over its lifetime
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once at creation, GPU read only
    Immutable,
    /// CPU-writable every frame through a discard map, GPU read only
    Dynamic,
}

/// Buffer creation parameters
#[derive(Clone, Copy, Debug)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub size: u64,
    pub usage: BufferUsage,
    pub bind: BindFlags,
    /// Initial contents; required for immutable buffers
    pub contents: Option<&'a [u8]>,
}

impl<'a> BufferDesc<'a> {
    /// A dynamic constant buffer of exactly `size` bytes
    pub fn constant(label: &'a str, size: u64) -> Self {
        Self {
            label,
            size,
            usage: BufferUsage::Dynamic,
            bind: BindFlags::CONSTANT_BUFFER,
            contents: None,
        }
    }

    /// An immutable vertex buffer holding `contents`
    pub fn vertex(label: &'a str, contents: &'a [u8]) -> Self {
        Self {
            label,
            size: contents.len() as u64,
            usage: BufferUsage::Immutable,
            bind: BindFlags::VERTEX_BUFFER,
            contents: Some(contents),
        }
    }

    /// An immutable index buffer of 32-bit indices
    pub fn index(label: &'a str, contents: &'a [u8]) -> Self {
        Self {
            label,
            size: contents.len() as u64,
            usage: BufferUsage::Immutable,
            bind: BindFlags::INDEX_BUFFER,
            contents: Some(contents),
        }
    }

    /// Check the description is self-consistent
    pub fn validate(&self) -> Result<(), super::GpuError> {
        use super::GpuError;

        if self.size == 0 {
            return Err(GpuError::Creation(format!("buffer '{}' has zero size", self.label)));
        }
        if self.bind.is_empty() {
            return Err(GpuError::Creation(format!("buffer '{}' has no bind flags", self.label)));
        }
        match (self.usage, self.contents) {
            (BufferUsage::Immutable, None) => Err(GpuError::Creation(format!(
                "immutable buffer '{}' needs initial contents",
                self.label
            ))),
            (_, Some(data)) if data.len() as u64 != self.size => Err(GpuError::SizeMismatch {
                expected: self.size,
                actual: data.len() as u64,
            }),
            _ => Ok(()),
        }
    }
}

/// Texel filter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    Point,
    Linear,
}

/// Texture coordinate addressing outside `[0, 1]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressMode {
    Wrap,
    Mirror,
    Clamp,
}

/// Sampler state description
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerDesc {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mip_filter: Filter,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub mip_lod_bias: f32,
    pub max_anisotropy: u16,
    pub border_color: [f32; 4],
    pub min_lod: f32,
    pub max_lod: f32,
}

impl SamplerDesc {
    /// Wrap on all axes, linear minification and mip blending
    pub fn wrap_linear() -> Self {
        Self {
            min_filter: Filter::Linear,
            mag_filter: Filter::Point,
            mip_filter: Filter::Linear,
            address_u: AddressMode::Wrap,
            address_v: AddressMode::Wrap,
            address_w: AddressMode::Wrap,
            mip_lod_bias: 0.0,
            max_anisotropy: 1,
            border_color: [0.0, 0.0, 0.0, 0.0],
            min_lod: 0.0,
            max_lod: f32::MAX,
        }
    }
}

/// 2D RGBA8 texture with initial texels
#[derive(Clone, Copy, Debug)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub texels: &'a [u8],
}

impl TextureDesc<'_> {
    pub fn validate(&self) -> Result<(), super::GpuError> {
        let expected = self.width as u64 * self.height as u64 * 4;
        if self.width == 0 || self.height == 0 {
            return Err(super::GpuError::Creation(format!(
                "texture '{}' has zero extent",
                self.label
            )));
        }
        if self.texels.len() as u64 != expected {
            return Err(super::GpuError::SizeMismatch {
                expected,
                actual: self.texels.len() as u64,
            });
        }
        Ok(())
    }
}
