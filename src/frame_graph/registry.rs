//! Resource registry
//!
//! Owns every resource declared during one build cycle and the backing
//! objects of realized transients. Resources live in a dense array and are
//! addressed by index.

use std::collections::HashMap;

use crate::backend::{
    BufferDescriptor, BufferHandle, GraphicsBackend, TextureDescriptor, TextureHandle,
};
use crate::frame_graph::error::{FrameGraphError, FrameGraphResult};
use crate::frame_graph::handle::{ResourceHandle, ResourceId, ResourceKind};
use crate::frame_graph::resource::{FrameGraphResource, ResourceDescriptor, ResourceStorage};
use crate::frame_graph::{BufferKind, TextureKind};

#[derive(Debug)]
pub struct ResourceRegistry {
    graph: u64,
    resources: Vec<FrameGraphResource>,
    by_name: HashMap<String, ResourceId>,
}

impl ResourceRegistry {
    pub(crate) fn new(graph: u64) -> Self {
        Self {
            graph,
            resources: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Serial of the builder this registry belongs to.
    pub fn graph_serial(&self) -> u64 {
        self.graph
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resources(&self) -> &[FrameGraphResource] {
        &self.resources
    }

    pub fn resource(&self, id: ResourceId) -> Option<&FrameGraphResource> {
        self.resources.get(id.index())
    }

    pub(crate) fn resource_mut(&mut self, id: ResourceId) -> Option<&mut FrameGraphResource> {
        self.resources.get_mut(id.index())
    }

    pub fn find(&self, name: &str) -> Option<&FrameGraphResource> {
        self.by_name.get(name).and_then(|id| self.resource(*id))
    }

    pub fn add_transient_texture(
        &mut self,
        name: &str,
        desc: TextureDescriptor,
    ) -> FrameGraphResult<ResourceHandle<TextureKind>> {
        self.add_transient::<TextureKind>(name, desc)
    }

    pub fn add_transient_buffer(
        &mut self,
        name: &str,
        desc: BufferDescriptor,
    ) -> FrameGraphResult<ResourceHandle<BufferKind>> {
        self.add_transient::<BufferKind>(name, desc)
    }

    /// Register a transient resource.
    ///
    /// Redeclaring a name with an identical descriptor returns the existing
    /// resource at its current version.
    pub fn add_transient<K: ResourceKind>(
        &mut self,
        name: &str,
        desc: K::Descriptor,
    ) -> FrameGraphResult<ResourceHandle<K>> {
        let descriptor = K::wrap_descriptor(desc);

        if let Some(&id) = self.by_name.get(name) {
            let existing = &self.resources[id.index()];
            if existing.is_transient && existing.descriptor == descriptor {
                return Ok(ResourceHandle::new(self.graph, id.0, existing.version()));
            }
            return Err(FrameGraphError::DescriptorMismatch {
                name: name.to_string(),
            });
        }

        Ok(self.push(name, descriptor, None))
    }

    pub fn set_retained_texture(
        &mut self,
        name: &str,
        desc: TextureDescriptor,
        texture: TextureHandle,
    ) -> FrameGraphResult<ResourceHandle<TextureKind>> {
        self.set_retained::<TextureKind>(name, desc, texture)
    }

    pub fn set_retained_buffer(
        &mut self,
        name: &str,
        desc: BufferDescriptor,
        buffer: BufferHandle,
    ) -> FrameGraphResult<ResourceHandle<BufferKind>> {
        self.set_retained::<BufferKind>(name, desc, buffer)
    }

    /// Register an externally owned resource.
    ///
    /// The descriptor is checked against the object when the resource is
    /// realized. Rebinding a retained name with the same descriptor swaps the
    /// backing object.
    pub fn set_retained<K: ResourceKind>(
        &mut self,
        name: &str,
        desc: K::Descriptor,
        object: K::Object,
    ) -> FrameGraphResult<ResourceHandle<K>> {
        let descriptor = K::wrap_descriptor(desc);
        let storage = K::wrap_object(object);

        if let Some(&id) = self.by_name.get(name) {
            let existing = &mut self.resources[id.index()];
            if existing.is_retained() && existing.descriptor == descriptor {
                existing.storage = Some(storage);
                existing.retained_validated = false;
                return Ok(ResourceHandle::new(self.graph, id.0, existing.version()));
            }
            return Err(FrameGraphError::DescriptorMismatch {
                name: name.to_string(),
            });
        }

        Ok(self.push(name, descriptor, Some(storage)))
    }

    fn push<K>(
        &mut self,
        name: &str,
        descriptor: ResourceDescriptor,
        retained: Option<ResourceStorage>,
    ) -> ResourceHandle<K> {
        let id = ResourceId(self.resources.len() as u32);
        self.resources.push(FrameGraphResource::new(
            name.to_string(),
            id,
            descriptor,
            retained,
        ));
        self.by_name.insert(name.to_string(), id);
        ResourceHandle::new(self.graph, id.0, 0)
    }

    /// Check that a handle was issued by this registry for a resource of
    /// kind `K`. `pass` names the declaring pass in error messages.
    pub(crate) fn validate<K: ResourceKind>(
        &self,
        handle: ResourceHandle<K>,
        pass: &str,
    ) -> FrameGraphResult<&FrameGraphResource> {
        if handle.graph != self.graph {
            return Err(FrameGraphError::ForeignHandle {
                index: handle.index,
                handle_graph: handle.graph,
                graph: self.graph,
            });
        }
        let resource =
            self.resources
                .get(handle.index as usize)
                .ok_or_else(|| FrameGraphError::UnknownResource {
                    pass: pass.to_string(),
                    index: handle.index,
                })?;
        if K::descriptor(&resource.descriptor).is_none() {
            return Err(FrameGraphError::ResourceKindMismatch {
                name: resource.name.clone(),
                expected: K::NAME,
                actual: resource.descriptor.kind_name(),
            });
        }
        Ok(resource)
    }

    /// Allocate the backing object of a transient resource, or validate the
    /// external object of a retained one. Realizing twice is a no-op.
    pub fn realize<B: GraphicsBackend + ?Sized>(
        &mut self,
        id: impl Into<ResourceId>,
        backend: &B,
    ) -> FrameGraphResult<()> {
        let id = id.into();
        let resource = self
            .resources
            .get_mut(id.index())
            .ok_or_else(|| FrameGraphError::UnknownResource {
                pass: String::new(),
                index: id.0,
            })?;

        if resource.is_realized() {
            return Ok(());
        }

        if resource.is_retained() {
            validate_retained(resource, backend)?;
            resource.retained_validated = true;
            log::trace!(
                "Validated retained {} '{}'",
                resource.descriptor.kind_name(),
                resource.name
            );
            return Ok(());
        }

        let storage = match &resource.descriptor {
            ResourceDescriptor::Texture(desc) => {
                let mut desc = desc.clone();
                if desc.label.is_none() {
                    desc.label = Some(resource.name.clone());
                }
                ResourceStorage::Texture(backend.create_texture(&desc)?)
            }
            ResourceDescriptor::Buffer(desc) => {
                let mut desc = desc.clone();
                if desc.label.is_none() {
                    desc.label = Some(resource.name.clone());
                }
                ResourceStorage::Buffer(backend.create_buffer(&desc)?)
            }
        };
        log::trace!("Realized {} '{}'", resource.descriptor.kind_name(), resource.name);
        resource.storage = Some(storage);
        Ok(())
    }

    /// Release the backing object of a transient resource.
    ///
    /// Retained resources are left untouched. Derealizing a transient that is
    /// not realized fails with [`FrameGraphError::NotRealized`].
    pub fn derealize<B: GraphicsBackend + ?Sized>(
        &mut self,
        id: impl Into<ResourceId>,
        backend: &B,
    ) -> FrameGraphResult<()> {
        let id = id.into();
        let resource = self
            .resources
            .get_mut(id.index())
            .ok_or_else(|| FrameGraphError::UnknownResource {
                pass: String::new(),
                index: id.0,
            })?;

        if resource.is_retained() {
            return Ok(());
        }

        // Clear storage before destroying so a backend failure cannot lead
        // to a second destroy of the same object.
        let storage = resource
            .storage
            .take()
            .ok_or_else(|| FrameGraphError::NotRealized {
                name: resource.name.clone(),
            })?;
        log::trace!("Derealized {} '{}'", resource.descriptor.kind_name(), resource.name);
        match storage {
            ResourceStorage::Texture(texture) => backend.destroy_texture(texture)?,
            ResourceStorage::Buffer(buffer) => backend.destroy_buffer(buffer)?,
        }
        Ok(())
    }

    /// Derealize every transient that is still realized. Returns how many
    /// objects were released.
    pub fn release_transients<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> FrameGraphResult<usize> {
        let realized: Vec<ResourceId> = self
            .resources
            .iter()
            .filter(|r| r.is_transient && r.storage.is_some())
            .map(|r| r.id)
            .collect();
        for id in &realized {
            self.derealize(*id, backend)?;
        }
        Ok(realized.len())
    }

    /// Number of transients currently holding a backing object.
    pub fn realized_transient_count(&self) -> usize {
        self.resources
            .iter()
            .filter(|r| r.is_transient && r.storage.is_some())
            .count()
    }

    /// Backing object of a realized resource.
    pub fn resolve<K: ResourceKind>(
        &self,
        handle: ResourceHandle<K>,
    ) -> FrameGraphResult<K::Object> {
        let resource = self.validate(handle, "")?;
        if !resource.is_realized() {
            return Err(FrameGraphError::NotRealized {
                name: resource.name.clone(),
            });
        }
        resource
            .storage
            .as_ref()
            .and_then(K::object)
            .ok_or_else(|| FrameGraphError::NotRealized {
                name: resource.name.clone(),
            })
    }

    pub fn descriptor<K: ResourceKind>(
        &self,
        handle: ResourceHandle<K>,
    ) -> FrameGraphResult<&K::Descriptor> {
        let resource = self.validate(handle, "")?;
        K::descriptor(&resource.descriptor).ok_or_else(|| FrameGraphError::ResourceKindMismatch {
            name: resource.name.clone(),
            expected: K::NAME,
            actual: resource.descriptor.kind_name(),
        })
    }
}

fn validate_retained<B: GraphicsBackend + ?Sized>(
    resource: &FrameGraphResource,
    backend: &B,
) -> FrameGraphResult<()> {
    let missing = || FrameGraphError::RetainedObjectMissing {
        name: resource.name.clone(),
    };
    let actual = match resource.storage {
        Some(ResourceStorage::Texture(texture)) => {
            ResourceDescriptor::Texture(backend.texture_descriptor(texture).ok_or_else(missing)?)
        }
        Some(ResourceStorage::Buffer(buffer)) => {
            ResourceDescriptor::Buffer(backend.buffer_descriptor(buffer).ok_or_else(missing)?)
        }
        None => return Err(missing()),
    };

    if !resource.descriptor.is_compatible_with(&actual) {
        return Err(FrameGraphError::RetainedMismatch {
            name: resource.name.clone(),
            reason: format!(
                "declared {:?}, backing object is {:?}",
                resource.descriptor, actual
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BufferUsage, DummyBackend, TextureFormat};

    fn color_desc() -> TextureDescriptor {
        TextureDescriptor::render_target(128, 64, TextureFormat::Rgba16Float)
    }

    #[test]
    fn test_redeclare_same_descriptor_is_idempotent() {
        let mut registry = ResourceRegistry::new(1);
        let a = registry.add_transient_texture("color", color_desc()).unwrap();
        let b = registry.add_transient_texture("color", color_desc()).unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_redeclare_different_descriptor_fails() {
        let mut registry = ResourceRegistry::new(1);
        registry.add_transient_texture("color", color_desc()).unwrap();
        let err = registry
            .add_transient_texture("color", color_desc().with_sample_count(4))
            .unwrap_err();
        assert_eq!(
            err,
            FrameGraphError::DescriptorMismatch {
                name: "color".into()
            }
        );
    }

    #[test]
    fn test_realize_is_idempotent() {
        let backend = DummyBackend::new();
        let mut registry = ResourceRegistry::new(1);
        let color = registry.add_transient_texture("color", color_desc()).unwrap();

        registry.realize(color, &backend).unwrap();
        let first = registry.resolve(color).unwrap();
        registry.realize(color, &backend).unwrap();

        assert_eq!(backend.textures_created(), 1);
        assert_eq!(registry.resolve(color).unwrap(), first);
    }

    #[test]
    fn test_resolve_matches_descriptor() {
        let backend = DummyBackend::new();
        let mut registry = ResourceRegistry::new(1);
        let color = registry.add_transient_texture("color", color_desc()).unwrap();
        registry.realize(color, &backend).unwrap();

        let texture = registry.resolve(color).unwrap();
        let actual = backend.texture_descriptor(texture).unwrap();
        assert!(actual.is_compatible_with(&color_desc()));
        assert_eq!(actual.label.as_deref(), Some("color"));
    }

    #[test]
    fn test_derealize_unrealized_transient_fails() {
        let backend = DummyBackend::new();
        let mut registry = ResourceRegistry::new(1);
        let color = registry.add_transient_texture("color", color_desc()).unwrap();
        assert_eq!(
            registry.derealize(color, &backend),
            Err(FrameGraphError::NotRealized {
                name: "color".into()
            })
        );

        registry.realize(color, &backend).unwrap();
        registry.derealize(color, &backend).unwrap();
        assert!(registry.derealize(color, &backend).is_err());
        assert_eq!(backend.textures_destroyed(), 1);
    }

    #[test]
    fn test_failed_realize_leaves_resource_unrealized() {
        let backend = DummyBackend::new();
        backend.fail_allocations_after(0);
        let mut registry = ResourceRegistry::new(1);
        let color = registry.add_transient_texture("color", color_desc()).unwrap();

        assert!(registry.realize(color, &backend).is_err());
        assert_eq!(registry.realized_transient_count(), 0);
        assert!(registry.derealize(color, &backend).is_err());
        assert_eq!(backend.textures_destroyed(), 0);
    }

    #[test]
    fn test_retained_resource_is_validated_and_never_freed() {
        let backend = DummyBackend::new();
        let external = backend.create_texture(&color_desc()).unwrap();
        let mut registry = ResourceRegistry::new(1);
        let handle = registry
            .set_retained_texture("history", color_desc(), external)
            .unwrap();

        registry.realize(handle, &backend).unwrap();
        assert_eq!(registry.resolve(handle).unwrap(), external);
        registry.derealize(handle, &backend).unwrap();
        assert_eq!(backend.live_texture_count(), 1);
    }

    #[test]
    fn test_retained_mismatch_detected_at_realize() {
        let backend = DummyBackend::new();
        let external = backend.create_texture(&color_desc()).unwrap();
        let mut registry = ResourceRegistry::new(1);
        let wrong = TextureDescriptor::render_target(64, 64, TextureFormat::Rgba16Float);
        let handle = registry
            .set_retained_texture("history", wrong, external)
            .unwrap();

        let err = registry.realize(handle, &backend).unwrap_err();
        assert!(matches!(err, FrameGraphError::RetainedMismatch { .. }));
    }

    #[test]
    fn test_retained_object_missing() {
        let backend = DummyBackend::new();
        let external = backend
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::STORAGE))
            .unwrap();
        backend.destroy_buffer(external).unwrap();

        let mut registry = ResourceRegistry::new(1);
        let handle = registry
            .set_retained_buffer(
                "lights",
                BufferDescriptor::new(64, BufferUsage::STORAGE),
                external,
            )
            .unwrap();
        assert_eq!(
            registry.realize(handle, &backend),
            Err(FrameGraphError::RetainedObjectMissing {
                name: "lights".into()
            })
        );
    }

    #[test]
    fn test_foreign_and_mistyped_handles() {
        let mut registry = ResourceRegistry::new(1);
        registry.add_transient_texture("color", color_desc()).unwrap();

        let foreign = ResourceHandle::<TextureKind>::new(2, 0, 0);
        assert!(matches!(
            registry.resolve(foreign),
            Err(FrameGraphError::ForeignHandle { .. })
        ));

        let mistyped = ResourceHandle::<BufferKind>::new(1, 0, 0);
        assert!(matches!(
            registry.resolve(mistyped),
            Err(FrameGraphError::ResourceKindMismatch { .. })
        ));

        let unknown = ResourceHandle::<TextureKind>::new(1, 7, 0);
        assert!(matches!(
            registry.resolve(unknown),
            Err(FrameGraphError::UnknownResource { index: 7, .. })
        ));
    }
}
