//! Frame passes

use std::any::Any;
use std::fmt;

use crate::backend::{BufferHandle, TextureHandle};
use crate::frame_graph::command::CommandRecorder;
use crate::frame_graph::error::{FrameGraphError, FrameGraphResult};
use crate::frame_graph::handle::{ResourceHandle, ResourceId, ResourceKind};
use crate::frame_graph::registry::ResourceRegistry;
use crate::frame_graph::{BufferId, TextureId};

/// Unique identifier for a pass within one builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

impl PassId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Type of frame pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PassType {
    /// Graphics render pass
    #[default]
    Graphics,
    /// Compute pass
    Compute,
    /// Transfer/copy pass
    Transfer,
}

/// Name, type and declared resource usage of a pass.
///
/// These lists are the only input to dependency analysis.
#[derive(Debug, Clone)]
pub struct FramePassBase {
    pub name: String,
    pub id: PassId,
    pub pass_type: PassType,
    pub created: Vec<ResourceId>,
    pub read: Vec<ResourceId>,
    pub written: Vec<ResourceId>,
    /// Subset of `read` sampled in shaders
    pub sampled: Vec<ResourceId>,
    /// Subset of `written` used as multisample resolve destinations
    pub resolved: Vec<ResourceId>,
    pub side_effect: bool,
}

impl FramePassBase {
    pub(crate) fn new(name: &str, id: PassId, pass_type: PassType) -> Self {
        Self {
            name: name.to_string(),
            id,
            pass_type,
            created: Vec::new(),
            read: Vec::new(),
            written: Vec::new(),
            sampled: Vec::new(),
            resolved: Vec::new(),
            side_effect: false,
        }
    }

    pub fn creates(&self, id: ResourceId) -> bool {
        self.created.contains(&id)
    }

    pub fn reads(&self, id: ResourceId) -> bool {
        self.read.contains(&id)
    }

    pub fn writes(&self, id: ResourceId) -> bool {
        self.written.contains(&id)
    }

    /// Whether the pass declared any kind of access to `id`.
    pub fn declares(&self, id: ResourceId) -> bool {
        self.creates(id) || self.reads(id) || self.writes(id)
    }

    /// Every resource the pass touches, without duplicates, in declaration order.
    pub fn accessed(&self) -> Vec<ResourceId> {
        let mut accessed = Vec::new();
        for id in self
            .created
            .iter()
            .chain(self.read.iter())
            .chain(self.written.iter())
        {
            if !accessed.contains(id) {
                accessed.push(*id);
            }
        }
        accessed
    }
}

/// Resolves handles to backing objects for one executing pass.
///
/// Only resources the pass declared during build can be resolved.
pub struct FrameGraphResources<'a> {
    registry: &'a ResourceRegistry,
    pass: &'a FramePassBase,
}

impl<'a> FrameGraphResources<'a> {
    pub(crate) fn new(registry: &'a ResourceRegistry, pass: &'a FramePassBase) -> Self {
        Self { registry, pass }
    }

    pub fn pass_name(&self) -> &str {
        &self.pass.name
    }

    fn check_declared<K: ResourceKind>(&self, handle: ResourceHandle<K>) -> FrameGraphResult<()> {
        let resource = self.registry.validate(handle, &self.pass.name)?;
        if !self.pass.declares(handle.id()) {
            return Err(FrameGraphError::UndeclaredAccess {
                pass: self.pass.name.clone(),
                resource: resource.name.clone(),
            });
        }
        Ok(())
    }

    /// Backing object for a declared resource.
    pub fn get<K: ResourceKind>(&self, handle: ResourceHandle<K>) -> FrameGraphResult<K::Object> {
        self.check_declared(handle)?;
        self.registry.resolve(handle)
    }

    pub fn texture(&self, handle: TextureId) -> FrameGraphResult<TextureHandle> {
        self.get(handle)
    }

    pub fn buffer(&self, handle: BufferId) -> FrameGraphResult<BufferHandle> {
        self.get(handle)
    }

    pub fn descriptor<K: ResourceKind>(
        &self,
        handle: ResourceHandle<K>,
    ) -> FrameGraphResult<&'a K::Descriptor> {
        self.check_declared(handle)?;
        self.registry.descriptor(handle)
    }
}

/// Execute callback of a pass
pub type ExecuteFn<Data> = Box<
    dyn FnOnce(&Data, &FrameGraphResources, &mut dyn CommandRecorder) -> FrameGraphResult<()>,
>;

/// Object-safe view of a pass, independent of its data type
pub trait ExecutablePass {
    fn base(&self) -> &FramePassBase;

    /// Run the execute callback against `registry`. A pass executes at most once.
    fn execute(
        &mut self,
        registry: &ResourceRegistry,
        recorder: &mut dyn CommandRecorder,
    ) -> FrameGraphResult<()>;

    /// Allow downcasting to `FramePass<Data>`
    fn as_any(&self) -> &dyn Any;
}

/// A pass with a typed data payload shared by its build and execute callbacks.
pub struct FramePass<Data> {
    pub(crate) base: FramePassBase,
    pub(crate) data: Data,
    execute: Option<ExecuteFn<Data>>,
}

impl<Data: 'static> FramePass<Data> {
    pub(crate) fn new(base: FramePassBase, data: Data, execute: ExecuteFn<Data>) -> Self {
        Self {
            base,
            data,
            execute: Some(execute),
        }
    }

    pub fn data(&self) -> &Data {
        &self.data
    }
}

impl<Data: 'static> ExecutablePass for FramePass<Data> {
    fn base(&self) -> &FramePassBase {
        &self.base
    }

    fn execute(
        &mut self,
        registry: &ResourceRegistry,
        recorder: &mut dyn CommandRecorder,
    ) -> FrameGraphResult<()> {
        let execute = self.execute.take().ok_or(FrameGraphError::AlreadyExecuted)?;
        let resources = FrameGraphResources::new(registry, &self.base);
        execute(&self.data, &resources, recorder)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<Data> fmt::Debug for FramePass<Data> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePass")
            .field("base", &self.base)
            .field("executed", &self.execute.is_none())
            .finish()
    }
}
