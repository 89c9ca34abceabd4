//! Typed, versioned resource handles.
//!
//! A handle names a resource by its index in the owning builder's registry.
//! It also carries the serial of that builder, so a handle cannot be used
//! with another graph, and a version that `write` and `resolve` bump.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::backend::{BufferDescriptor, BufferHandle, TextureDescriptor, TextureHandle};
use crate::frame_graph::resource::{ResourceDescriptor, ResourceStorage};

/// Untyped resource index, stable for the lifetime of one builder/graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) u32);

impl ResourceId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Maps a resource kind to its descriptor and backing object types.
pub trait ResourceKind: 'static {
    const NAME: &'static str;
    type Descriptor: Clone + fmt::Debug;
    type Object: Copy + fmt::Debug;

    fn wrap_descriptor(desc: Self::Descriptor) -> ResourceDescriptor;
    fn descriptor(desc: &ResourceDescriptor) -> Option<&Self::Descriptor>;
    fn object(storage: &ResourceStorage) -> Option<Self::Object>;
    fn wrap_object(object: Self::Object) -> ResourceStorage;
}

/// Kind tag for textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {}

/// Kind tag for buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {}

impl ResourceKind for TextureKind {
    const NAME: &'static str = "texture";
    type Descriptor = TextureDescriptor;
    type Object = TextureHandle;

    fn wrap_descriptor(desc: TextureDescriptor) -> ResourceDescriptor {
        ResourceDescriptor::Texture(desc)
    }

    fn descriptor(desc: &ResourceDescriptor) -> Option<&TextureDescriptor> {
        match desc {
            ResourceDescriptor::Texture(desc) => Some(desc),
            ResourceDescriptor::Buffer(_) => None,
        }
    }

    fn object(storage: &ResourceStorage) -> Option<TextureHandle> {
        match storage {
            ResourceStorage::Texture(texture) => Some(*texture),
            ResourceStorage::Buffer(_) => None,
        }
    }

    fn wrap_object(object: TextureHandle) -> ResourceStorage {
        ResourceStorage::Texture(object)
    }
}

impl ResourceKind for BufferKind {
    const NAME: &'static str = "buffer";
    type Descriptor = BufferDescriptor;
    type Object = BufferHandle;

    fn wrap_descriptor(desc: BufferDescriptor) -> ResourceDescriptor {
        ResourceDescriptor::Buffer(desc)
    }

    fn descriptor(desc: &ResourceDescriptor) -> Option<&BufferDescriptor> {
        match desc {
            ResourceDescriptor::Buffer(desc) => Some(desc),
            ResourceDescriptor::Texture(_) => None,
        }
    }

    fn object(storage: &ResourceStorage) -> Option<BufferHandle> {
        match storage {
            ResourceStorage::Buffer(buffer) => Some(*buffer),
            ResourceStorage::Texture(_) => None,
        }
    }

    fn wrap_object(object: BufferHandle) -> ResourceStorage {
        ResourceStorage::Buffer(object)
    }
}

/// Handle to a frame graph resource of kind `K`.
pub struct ResourceHandle<K> {
    pub(crate) graph: u64,
    pub(crate) index: u32,
    pub(crate) version: u32,
    _kind: PhantomData<fn() -> K>,
}

pub type TextureId = ResourceHandle<TextureKind>;
pub type BufferId = ResourceHandle<BufferKind>;

impl<K> ResourceHandle<K> {
    pub(crate) fn new(graph: u64, index: u32, version: u32) -> Self {
        Self {
            graph,
            index,
            version,
            _kind: PhantomData,
        }
    }

    pub fn id(&self) -> ResourceId {
        ResourceId(self.index)
    }

    /// Number of writes the resource had seen when this handle was issued.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Serial of the builder that issued this handle.
    pub fn graph_serial(&self) -> u64 {
        self.graph
    }
}

/// Placeholder that belongs to no graph; resolving it fails.
impl<K> Default for ResourceHandle<K> {
    fn default() -> Self {
        Self::new(0, u32::MAX, 0)
    }
}

impl<K> Clone for ResourceHandle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for ResourceHandle<K> {}

impl<K> PartialEq for ResourceHandle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.graph == other.graph && self.index == other.index && self.version == other.version
    }
}

impl<K> Eq for ResourceHandle<K> {}

impl<K> Hash for ResourceHandle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.graph.hash(state);
        self.index.hash(state);
        self.version.hash(state);
    }
}

impl<K: ResourceKind> fmt::Debug for ResourceHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}v{}@{}",
            K::NAME,
            self.index,
            self.version,
            self.graph
        )
    }
}

impl<K> From<ResourceHandle<K>> for ResourceId {
    fn from(handle: ResourceHandle<K>) -> Self {
        handle.id()
    }
}
