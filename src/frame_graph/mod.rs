//! Frame Graph System
//!
//! Passes declare the textures and buffers they create, read, write, sample
//! and resolve. Compilation infers execution order, culls passes that
//! contribute nothing, and plans when each transient resource is allocated
//! and freed. A compiled graph executes once per frame; a ring of graphs
//! covers the frames in flight.
//!
//! ```ignore
//! let mut builder = FrameGraphBuilder::new(&mut ctx);
//! builder.set_backbuffer_name("backbuffer");
//! builder.add_pass::<ShadowData, _, _>(
//!     "shadow",
//!     |b, data| {
//!         data.shadow_map = b.create_texture("shadow_map", shadow_desc)?;
//!         Ok(())
//!     },
//!     |data, resources, recorder| {
//!         let _target = resources.texture(data.shadow_map)?;
//!         recorder.draw(3, 1);
//!         Ok(())
//!     },
//! )?;
//! let mut graph = builder.compile(&mut ctx)?;
//! graph.execute(&backend, &mut recorder)?;
//! ```

pub mod builder;
pub mod command;
pub mod compiler;
pub mod context;
pub mod error;
pub mod graph;
pub mod handle;
pub mod pass;
pub mod pass_builder;
pub mod registry;
pub mod resource;
pub mod ring;

pub use builder::FrameGraphBuilder;
pub use command::{CommandRecorder, RecordedCommand, RecordingCommandList};
pub use compiler::{AliasSlot, CompileStats, CompiledStep};
pub use context::FrameGraphContext;
pub use error::{FrameGraphError, FrameGraphResult};
pub use graph::FrameGraph;
pub use handle::{
    BufferId, BufferKind, ResourceHandle, ResourceId, ResourceKind, TextureId, TextureKind,
};
pub use pass::{ExecutablePass, FramePass, FramePassBase, FrameGraphResources, PassId, PassType};
pub use pass_builder::FramePassBuilder;
pub use registry::ResourceRegistry;
pub use resource::{
    FrameGraphResource, ResourceBarrier, ResourceDescriptor, ResourceLifetime, ResourceState,
    ResourceStorage, TextureSize,
};
pub use ring::FrameGraphRing;
