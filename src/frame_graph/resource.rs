//! Frame graph resources

use crate::backend::types::*;
use crate::backend::{BufferHandle, TextureHandle};
use crate::frame_graph::handle::ResourceId;
use crate::frame_graph::pass::PassId;

/// Descriptor of a texture or buffer resource
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceDescriptor {
    Texture(TextureDescriptor),
    Buffer(BufferDescriptor),
}

impl ResourceDescriptor {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResourceDescriptor::Texture(_) => "texture",
            ResourceDescriptor::Buffer(_) => "buffer",
        }
    }

    /// Whether two descriptors describe interchangeable GPU objects.
    pub fn is_compatible_with(&self, other: &ResourceDescriptor) -> bool {
        match (self, other) {
            (ResourceDescriptor::Texture(a), ResourceDescriptor::Texture(b)) => {
                a.is_compatible_with(b)
            }
            (ResourceDescriptor::Buffer(a), ResourceDescriptor::Buffer(b)) => {
                a.is_compatible_with(b)
            }
            _ => false,
        }
    }

    pub fn size_in_bytes(&self) -> u64 {
        match self {
            ResourceDescriptor::Texture(desc) => desc.size_in_bytes(),
            ResourceDescriptor::Buffer(desc) => desc.size,
        }
    }

    pub fn as_texture(&self) -> Option<&TextureDescriptor> {
        match self {
            ResourceDescriptor::Texture(desc) => Some(desc),
            ResourceDescriptor::Buffer(_) => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&BufferDescriptor> {
        match self {
            ResourceDescriptor::Buffer(desc) => Some(desc),
            ResourceDescriptor::Texture(_) => None,
        }
    }
}

/// Backing GPU object of a realized or retained resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceStorage {
    Texture(TextureHandle),
    Buffer(BufferHandle),
}

/// One version of a resource: the pass that produced it and the passes that
/// read it before it was overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceVersion {
    /// `None` for the initial contents of a retained resource
    pub producer: Option<PassId>,
    pub readers: Vec<PassId>,
}

/// A texture or buffer tracked by the registry.
///
/// Transient resources get `storage` only while realized. Retained resources
/// hold their external object from registration on and are never freed here.
#[derive(Debug, Clone)]
pub struct FrameGraphResource {
    pub name: String,
    pub id: ResourceId,
    pub is_transient: bool,
    pub descriptor: ResourceDescriptor,
    pub storage: Option<ResourceStorage>,
    pub creator: Option<PassId>,
    pub writers: Vec<PassId>,
    pub readers: Vec<PassId>,
    /// Version history; `write` and `resolve` append to it.
    pub versions: Vec<ResourceVersion>,
    /// Keeps the producers of this resource alive during culling.
    pub is_root: bool,
    pub(crate) retained_validated: bool,
}

impl FrameGraphResource {
    pub(crate) fn new(
        name: String,
        id: ResourceId,
        descriptor: ResourceDescriptor,
        retained: Option<ResourceStorage>,
    ) -> Self {
        Self {
            name,
            id,
            is_transient: retained.is_none(),
            descriptor,
            storage: retained,
            creator: None,
            writers: Vec::new(),
            readers: Vec::new(),
            versions: vec![ResourceVersion::default()],
            is_root: false,
            retained_validated: false,
        }
    }

    pub fn is_retained(&self) -> bool {
        !self.is_transient
    }

    pub fn is_realized(&self) -> bool {
        if self.is_transient {
            self.storage.is_some()
        } else {
            self.retained_validated
        }
    }

    /// Latest version handed out for this resource.
    pub fn version(&self) -> u32 {
        self.versions.len().saturating_sub(1) as u32
    }

    /// Creator followed by writers in declaration order, without duplicates.
    pub fn producers(&self) -> Vec<PassId> {
        let mut producers: Vec<PassId> = self.creator.into_iter().collect();
        for writer in &self.writers {
            if !producers.contains(writer) {
                producers.push(*writer);
            }
        }
        producers
    }
}

/// GPU access state of a resource between passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Undefined,
    ColorAttachment,
    DepthStencilAttachment,
    ShaderRead,
    ShaderWrite,
    ResolveDestination,
    TransferSource,
    TransferDestination,
    Present,
}

/// State transition that must be recorded before a pass runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBarrier {
    pub resource: ResourceId,
    pub name: String,
    pub from: ResourceState,
    pub to: ResourceState,
}

/// Lifetime of a resource within the compiled order, as step indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLifetime {
    pub first_use: usize,
    pub last_use: usize,
}

impl ResourceLifetime {
    pub fn contains(&self, step: usize) -> bool {
        step >= self.first_use && step <= self.last_use
    }

    pub fn overlaps(&self, other: &ResourceLifetime) -> bool {
        self.first_use <= other.last_use && other.first_use <= self.last_use
    }
}

/// Texture dimensions, absolute or relative to the frame size
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureSize {
    Absolute { width: u32, height: u32 },
    /// 1.0 = full frame
    Relative { width_scale: f32, height_scale: f32 },
}

impl Default for TextureSize {
    fn default() -> Self {
        TextureSize::FULL_FRAME
    }
}

impl TextureSize {
    /// Same extent as the frame
    pub const FULL_FRAME: TextureSize = TextureSize::Relative {
        width_scale: 1.0,
        height_scale: 1.0,
    };

    pub fn resolve(&self, frame_width: u32, frame_height: u32) -> (u32, u32) {
        match self {
            TextureSize::Absolute { width, height } => (*width, *height),
            TextureSize::Relative {
                width_scale,
                height_scale,
            } => (
                (((frame_width as f32) * width_scale) as u32).max(1),
                (((frame_height as f32) * height_scale) as u32).max(1),
            ),
        }
    }
}
