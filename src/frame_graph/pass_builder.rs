//! Declaration API used inside a pass's build callback.
//!
//! Every call updates the registry and the pass's own usage lists together.

use crate::backend::{BufferDescriptor, TextureDescriptor};
use crate::frame_graph::error::{FrameGraphError, FrameGraphResult};
use crate::frame_graph::handle::{ResourceHandle, ResourceKind};
use crate::frame_graph::pass::{ExecutablePass, FramePassBase, PassId, PassType};
use crate::frame_graph::registry::ResourceRegistry;
use crate::frame_graph::resource::{FrameGraphResource, ResourceVersion, TextureSize};
use crate::frame_graph::{BufferId, BufferKind, TextureId, TextureKind};

pub struct FramePassBuilder<'a> {
    registry: &'a mut ResourceRegistry,
    pass: &'a mut FramePassBase,
    passes: &'a [Box<dyn ExecutablePass>],
    frame_size: (u32, u32),
}

impl<'a> FramePassBuilder<'a> {
    pub(crate) fn new(
        registry: &'a mut ResourceRegistry,
        pass: &'a mut FramePassBase,
        passes: &'a [Box<dyn ExecutablePass>],
        frame_size: (u32, u32),
    ) -> Self {
        Self {
            registry,
            pass,
            passes,
            frame_size,
        }
    }

    pub fn pass_name(&self) -> &str {
        &self.pass.name
    }

    pub fn pass_type(&self) -> PassType {
        self.pass.pass_type
    }

    /// Size of the frame the graph is built for
    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    fn pass_name_of(&self, id: PassId) -> String {
        if id == self.pass.id {
            return self.pass.name.clone();
        }
        self.passes
            .get(id.index())
            .map(|pass| pass.base().name.clone())
            .unwrap_or_else(|| format!("pass #{}", id.0))
    }

    fn resource_mut<'r, K: ResourceKind>(
        registry: &'r mut ResourceRegistry,
        pass: &FramePassBase,
        handle: ResourceHandle<K>,
    ) -> FrameGraphResult<&'r mut FrameGraphResource> {
        registry.validate(handle, &pass.name)?;
        registry
            .resource_mut(handle.id())
            .ok_or_else(|| FrameGraphError::UnknownResource {
                pass: pass.name.clone(),
                index: handle.index,
            })
    }

    /// Create a transient resource with this pass as its creator.
    pub fn create<K: ResourceKind>(
        &mut self,
        name: &str,
        desc: K::Descriptor,
    ) -> FrameGraphResult<ResourceHandle<K>> {
        let handle = self.registry.add_transient::<K>(name, desc)?;
        let id = handle.id();
        if self.pass.creates(id) {
            return Err(FrameGraphError::DuplicateCreate {
                pass: self.pass.name.clone(),
                resource: name.to_string(),
            });
        }

        let pass_id = self.pass.id;
        let existing_creator = Self::resource_mut(self.registry, self.pass, handle)?.creator;
        if let Some(creator) = existing_creator {
            return Err(FrameGraphError::CreatorAlreadySet {
                resource: name.to_string(),
                creator: self.pass_name_of(creator),
                pass: self.pass.name.clone(),
            });
        }

        let resource = Self::resource_mut(self.registry, self.pass, handle)?;
        resource.creator = Some(pass_id);
        if let Some(initial) = resource.versions.first_mut() {
            if initial.producer.is_none() {
                initial.producer = Some(pass_id);
            }
        }
        self.pass.created.push(id);
        Ok(handle)
    }

    pub fn create_texture(
        &mut self,
        name: &str,
        desc: TextureDescriptor,
    ) -> FrameGraphResult<TextureId> {
        self.create::<TextureKind>(name, desc)
    }

    pub fn create_buffer(
        &mut self,
        name: &str,
        desc: BufferDescriptor,
    ) -> FrameGraphResult<BufferId> {
        self.create::<BufferKind>(name, desc)
    }

    /// Create a texture whose extent comes from `size` resolved against the
    /// frame. The width and height of `desc` are ignored.
    pub fn create_texture_sized(
        &mut self,
        name: &str,
        size: TextureSize,
        desc: TextureDescriptor,
    ) -> FrameGraphResult<TextureId> {
        let (width, height) = size.resolve(self.frame_size.0, self.frame_size.1);
        self.create_texture(
            name,
            TextureDescriptor {
                width,
                height,
                ..desc
            },
        )
    }

    /// Declare a read of the version `handle` names. Returns the handle
    /// unchanged.
    ///
    /// The pass is ordered after the producer of that version and before the
    /// pass that overwrites it.
    pub fn read<K: ResourceKind>(
        &mut self,
        handle: ResourceHandle<K>,
    ) -> FrameGraphResult<ResourceHandle<K>> {
        let pass_id = self.pass.id;
        let resource = Self::resource_mut(self.registry, self.pass, handle)?;
        let version = resource
            .versions
            .get_mut(handle.version as usize)
            .ok_or_else(|| FrameGraphError::UnknownResource {
                pass: self.pass.name.clone(),
                index: handle.index,
            })?;
        if !version.readers.contains(&pass_id) {
            version.readers.push(pass_id);
        }
        if !resource.readers.contains(&pass_id) {
            resource.readers.push(pass_id);
        }
        if !self.pass.reads(handle.id()) {
            self.pass.read.push(handle.id());
        }
        Ok(handle)
    }

    /// Declare a write. Returns a handle to the new version of the resource.
    ///
    /// Writes always build on the latest version, so a stale input handle
    /// still orders this pass after every earlier producer.
    pub fn write<K: ResourceKind>(
        &mut self,
        handle: ResourceHandle<K>,
    ) -> FrameGraphResult<ResourceHandle<K>> {
        let pass_id = self.pass.id;
        let graph = self.registry.graph_serial();
        let resource = Self::resource_mut(self.registry, self.pass, handle)?;
        if handle.version != resource.version() {
            log::debug!(
                "Pass '{}' writes '{}' through stale version {} (current {})",
                self.pass.name,
                resource.name,
                handle.version,
                resource.version()
            );
        }
        if !resource.writers.contains(&pass_id) {
            resource.writers.push(pass_id);
        }
        resource.versions.push(ResourceVersion {
            producer: Some(pass_id),
            readers: Vec::new(),
        });
        let version = resource.version();

        if !self.pass.writes(handle.id()) {
            self.pass.written.push(handle.id());
        }
        Ok(ResourceHandle::new(graph, handle.index, version))
    }

    /// `read` plus shader-sampling intent.
    pub fn sample(&mut self, texture: TextureId) -> FrameGraphResult<TextureId> {
        let texture = self.read(texture)?;
        if !self.pass.sampled.contains(&texture.id()) {
            self.pass.sampled.push(texture.id());
        }
        Ok(texture)
    }

    /// `write` plus multisample-resolve-destination intent.
    pub fn resolve(&mut self, texture: TextureId) -> FrameGraphResult<TextureId> {
        let texture = self.write(texture)?;
        if !self.pass.resolved.contains(&texture.id()) {
            self.pass.resolved.push(texture.id());
        }
        Ok(texture)
    }

    /// Keep the producers of this resource alive during culling.
    pub fn mark_root<K: ResourceKind>(
        &mut self,
        handle: ResourceHandle<K>,
    ) -> FrameGraphResult<()> {
        Self::resource_mut(self.registry, self.pass, handle)?.is_root = true;
        Ok(())
    }

    /// Keep this pass alive even if nothing it produces is consumed.
    pub fn set_side_effect(&mut self) {
        self.pass.side_effect = true;
    }

    pub fn descriptor<K: ResourceKind>(
        &self,
        handle: ResourceHandle<K>,
    ) -> FrameGraphResult<&K::Descriptor> {
        self.registry.descriptor(handle)
    }
}
