//! Scene graph
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Slots are
//! reused after removal; a generation counter makes ids of removed nodes
//! stale instead of letting them alias the new occupant. Mutations
//! queue [`SceneEvent`]s instead of notifying observers; [`SceneGraph::update`]
//! drains the queue once per frame, in submission order, and recomputes the
//! world matrices of the affected subtrees.

use bevy_ecs::prelude::*;
use glam::Mat4;
use thiserror::Error;

use crate::scene::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("unknown scene node {0:?}")]
    UnknownNode(NodeId),
    #[error("cannot parent {child:?} under its own descendant {parent:?}")]
    CycleDetected { child: NodeId, parent: NodeId },
    #[error("the root node cannot be removed or reparented")]
    RootImmutable,
}

/// Change recorded by the scene graph, drained by [`SceneGraph::update`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneEvent {
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    TransformChanged(NodeId),
    Reparented { node: NodeId, parent: NodeId },
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Transform,
    world: Mat4,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Resource, Debug)]
pub struct SceneGraph {
    nodes: Vec<Slot>,
    free: Vec<u32>,
    events: Vec<SceneEvent>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: vec![Slot {
                generation: 0,
                node: Some(Node {
                    parent: None,
                    children: Vec::new(),
                    local: Transform::IDENTITY,
                    world: Mat4::IDENTITY,
                }),
            }],
            free: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId {
            index: 0,
            generation: 0,
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(SceneError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(SceneError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub fn pending_events(&self) -> &[SceneEvent] {
        &self.events
    }

    pub fn add_node(&mut self, parent: NodeId, local: Transform) -> Result<NodeId, SceneError> {
        self.node(parent)?;
        let node = Node {
            parent: Some(parent),
            children: Vec::new(),
            local,
            world: Mat4::IDENTITY,
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.nodes[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.nodes.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.nodes.len() as u32 - 1,
                    generation: 0,
                }
            }
        };
        self.node_mut(parent)?.children.push(id);
        self.events.push(SceneEvent::NodeAdded(id));
        Ok(id)
    }

    pub fn set_local_transform(
        &mut self,
        id: NodeId,
        local: Transform,
    ) -> Result<(), SceneError> {
        self.node_mut(id)?.local = local;
        self.events.push(SceneEvent::TransformChanged(id));
        Ok(())
    }

    pub fn local_transform(&self, id: NodeId) -> Option<Transform> {
        self.node(id).ok().map(|node| node.local)
    }

    /// World matrix as of the last [`SceneGraph::update`]
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        self.node(id).ok().map(|node| node.world)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.parent(node) {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    pub fn reparent(&mut self, id: NodeId, parent: NodeId) -> Result<(), SceneError> {
        if id == self.root() {
            return Err(SceneError::RootImmutable);
        }
        self.node(parent)?;
        if id == parent || self.is_ancestor(id, parent) {
            return Err(SceneError::CycleDetected { child: id, parent });
        }

        let old_parent = self.node(id)?.parent;
        if let Some(old_parent) = old_parent {
            self.node_mut(old_parent)?.children.retain(|&child| child != id);
        }
        self.node_mut(id)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(id);
        self.events.push(SceneEvent::Reparented { node: id, parent });
        Ok(())
    }

    /// Remove a node and its whole subtree.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id == self.root() {
            return Err(SceneError::RootImmutable);
        }
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|&child| child != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.nodes.get_mut(current.index()) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                stack.extend(node.children);
                self.free.push(current.index);
                self.events.push(SceneEvent::NodeRemoved(current));
            }
        }
        Ok(())
    }

    /// Drain pending events and refresh world matrices of touched subtrees.
    ///
    /// Returns the drained events in the order they were queued.
    pub fn update(&mut self) -> Vec<SceneEvent> {
        let events = std::mem::take(&mut self.events);

        let mut dirty: Vec<NodeId> = Vec::new();
        for event in &events {
            let node = match *event {
                SceneEvent::NodeAdded(node)
                | SceneEvent::TransformChanged(node)
                | SceneEvent::Reparented { node, .. } => node,
                SceneEvent::NodeRemoved(_) => continue,
            };
            if self.contains(node) && !dirty.contains(&node) {
                dirty.push(node);
            }
        }

        // Skip nodes whose ancestor is refreshed anyway.
        let roots: Vec<NodeId> = dirty
            .iter()
            .copied()
            .filter(|&node| !dirty.iter().any(|&other| self.is_ancestor(other, node)))
            .collect();

        for node in roots {
            let parent_world = self
                .parent(node)
                .and_then(|parent| self.world_matrix(parent))
                .unwrap_or(Mat4::IDENTITY);
            self.propagate(node, parent_world);
        }

        events
    }

    fn propagate(&mut self, id: NodeId, parent_world: Mat4) {
        let mut stack = vec![(id, parent_world)];
        while let Some((current, parent_world)) = stack.pop() {
            let Ok(node) = self.node_mut(current) else {
                continue;
            };
            node.world = parent_world * node.local.matrix();
            let world = node.world;
            stack.extend(node.children.iter().map(|&child| (child, world)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn translation(graph: &SceneGraph, id: NodeId) -> Vec3 {
        graph.world_matrix(id).unwrap().w_axis.truncate()
    }

    #[test]
    fn test_world_matrices_follow_hierarchy() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let parent = graph
            .add_node(root, Transform::from_position(Vec3::new(10.0, 0.0, 0.0)))
            .unwrap();
        let child = graph
            .add_node(parent, Transform::from_position(Vec3::new(0.0, 5.0, 0.0)))
            .unwrap();

        graph.update();
        assert_eq!(translation(&graph, child), Vec3::new(10.0, 5.0, 0.0));

        graph
            .set_local_transform(parent, Transform::from_position(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        assert_eq!(translation(&graph, child), Vec3::new(10.0, 5.0, 0.0));
        graph.update();
        assert_eq!(translation(&graph, child), Vec3::new(1.0, 5.0, 0.0));
    }

    #[test]
    fn test_events_drain_in_order() {
        let mut graph = SceneGraph::new();
        let a = graph.add_node(graph.root(), Transform::IDENTITY).unwrap();
        graph.set_local_transform(a, Transform::IDENTITY).unwrap();

        let events = graph.update();
        assert_eq!(
            events,
            vec![SceneEvent::NodeAdded(a), SceneEvent::TransformChanged(a)]
        );
        assert!(graph.pending_events().is_empty());
        assert!(graph.update().is_empty());
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut graph = SceneGraph::new();
        let a = graph.add_node(graph.root(), Transform::IDENTITY).unwrap();
        let b = graph.add_node(a, Transform::IDENTITY).unwrap();

        assert_eq!(
            graph.reparent(a, b),
            Err(SceneError::CycleDetected { child: a, parent: b })
        );
        assert_eq!(graph.reparent(graph.root(), a), Err(SceneError::RootImmutable));

        let c = graph.add_node(graph.root(), Transform::IDENTITY).unwrap();
        graph.reparent(b, c).unwrap();
        assert_eq!(graph.parent(b), Some(c));
        assert!(graph.children(a).is_empty());
    }

    #[test]
    fn test_remove_subtree_recycles_ids() {
        let mut graph = SceneGraph::new();
        let a = graph.add_node(graph.root(), Transform::IDENTITY).unwrap();
        let b = graph.add_node(a, Transform::IDENTITY).unwrap();
        graph.update();

        graph.remove_node(a).unwrap();
        assert!(!graph.contains(a));
        assert!(!graph.contains(b));
        assert_eq!(graph.len(), 1);

        let events = graph.update();
        assert!(events.contains(&SceneEvent::NodeRemoved(a)));
        assert!(events.contains(&SceneEvent::NodeRemoved(b)));

        let reused = graph.add_node(graph.root(), Transform::IDENTITY).unwrap();
        assert!(reused.index() == a.index() || reused.index() == b.index());
        assert_ne!(reused, a);
        assert_ne!(reused, b);
    }

    #[test]
    fn test_stale_id_does_not_reach_reused_slot() {
        let mut graph = SceneGraph::new();
        let old = graph
            .add_node(graph.root(), Transform::from_position(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        graph.remove_node(old).unwrap();

        let new = graph
            .add_node(graph.root(), Transform::from_position(Vec3::new(2.0, 0.0, 0.0)))
            .unwrap();
        assert_eq!(new.index(), old.index());
        assert_eq!(new.generation(), old.generation() + 1);

        assert_eq!(
            graph.set_local_transform(old, Transform::IDENTITY),
            Err(SceneError::UnknownNode(old))
        );
        assert_eq!(graph.remove_node(old), Err(SceneError::UnknownNode(old)));
        assert!(graph.local_transform(old).is_none());
        graph.update();
        assert_eq!(translation(&graph, new), Vec3::new(2.0, 0.0, 0.0));
    }
}
