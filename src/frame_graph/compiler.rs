//! Frame graph compilation.
//!
//! Turns the passes and resources accumulated by a
//! [`FrameGraphBuilder`](super::FrameGraphBuilder) into an execution plan:
//!
//! 1. **Dependencies** - every write starts a new version of a resource. A
//!    reader runs after the producer of the version its handle names, and the
//!    next writer runs after that producer and every reader of it.
//! 2. **Topological sort** - Kahn's algorithm with a min-heap, so passes with
//!    no ordering constraint keep their insertion order.
//! 3. **Culling** - passes that do not contribute to a root resource (the
//!    backbuffer or anything marked with `mark_root`) and are not side-effecting
//!    are dropped. Without any root, every pass is kept.
//! 4. **Lifetimes** - each transient is realized before its first surviving
//!    use and derealized after its last.
//! 5. **Barriers** - state transitions derived from declared usage.
//! 6. **Aliasing plan** - transients with compatible descriptors and disjoint
//!    lifetimes are grouped into shared slots. The plan is informational;
//!    execution still realizes each transient on its own.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use crate::frame_graph::error::{FrameGraphError, FrameGraphResult};
use crate::frame_graph::handle::ResourceId;
use crate::frame_graph::pass::{ExecutablePass, FramePassBase, PassId, PassType};
use crate::frame_graph::registry::ResourceRegistry;
use crate::frame_graph::resource::{
    FrameGraphResource, ResourceBarrier, ResourceDescriptor, ResourceLifetime, ResourceState,
};

/// One entry of the execution schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStep {
    pub pass: PassId,
    /// Transients to realize before the pass runs
    pub realize: Vec<ResourceId>,
    /// Transients to derealize after the pass runs
    pub derealize: Vec<ResourceId>,
    /// Transitions to record before the pass runs
    pub barriers: Vec<ResourceBarrier>,
}

/// Transients that could share one allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasSlot {
    pub descriptor: ResourceDescriptor,
    pub resources: Vec<ResourceId>,
    last_use: usize,
}

impl AliasSlot {
    pub fn size_in_bytes(&self) -> u64 {
        self.descriptor.size_in_bytes()
    }
}

/// Summary of one compilation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub declared_passes: usize,
    pub scheduled_passes: usize,
    pub culled_passes: usize,
    pub transient_resources: usize,
    pub retained_resources: usize,
    pub barriers: usize,
    pub alias_slots: usize,
    /// Bytes needed if every transient gets its own allocation
    pub transient_bytes: u64,
    /// Bytes needed if the aliasing plan were applied
    pub aliased_bytes: u64,
}

#[derive(Debug)]
pub(crate) struct CompiledPlan {
    pub steps: Vec<CompiledStep>,
    pub culled: Vec<PassId>,
    pub retained: Vec<ResourceId>,
    pub lifetimes: HashMap<ResourceId, ResourceLifetime>,
    pub final_barriers: Vec<ResourceBarrier>,
    pub alias_slots: Vec<AliasSlot>,
    pub stats: CompileStats,
}

pub(crate) fn compile(
    passes: &[Box<dyn ExecutablePass>],
    registry: &ResourceRegistry,
    backbuffer: Option<&str>,
) -> FrameGraphResult<CompiledPlan> {
    validate_producers(passes, registry)?;

    let dependencies = build_dependencies(passes.len(), registry);
    let order = topological_sort(passes, &dependencies.order)?;
    let live = find_live_passes(passes, registry, &dependencies.data, backbuffer);

    let order: Vec<usize> = order.into_iter().filter(|&index| live[index]).collect();
    let culled: Vec<PassId> = (0..passes.len())
        .filter(|&index| !live[index])
        .map(|index| passes[index].base().id)
        .collect();
    for id in &culled {
        log::trace!("Culled pass '{}'", passes[id.index()].base().name);
    }

    let lifetimes = compute_lifetimes(passes, &order);

    let mut steps: Vec<CompiledStep> = order
        .iter()
        .map(|&index| CompiledStep {
            pass: passes[index].base().id,
            realize: Vec::new(),
            derealize: Vec::new(),
            barriers: Vec::new(),
        })
        .collect();

    let mut retained = Vec::new();
    let mut transients: Vec<(ResourceId, ResourceLifetime)> = Vec::new();
    for resource in registry.resources() {
        let Some(lifetime) = lifetimes.get(&resource.id) else {
            continue;
        };
        if resource.is_transient {
            steps[lifetime.first_use].realize.push(resource.id);
            steps[lifetime.last_use].derealize.push(resource.id);
            transients.push((resource.id, *lifetime));
        } else {
            retained.push(resource.id);
        }
    }

    let final_barriers = plan_barriers(passes, registry, &order, &mut steps, backbuffer);
    let alias_slots = plan_aliasing(registry, &transients);

    let transient_bytes = transients
        .iter()
        .filter_map(|(id, _)| registry.resource(*id))
        .map(|resource| resource.descriptor.size_in_bytes())
        .sum();
    let stats = CompileStats {
        declared_passes: passes.len(),
        scheduled_passes: steps.len(),
        culled_passes: culled.len(),
        transient_resources: transients.len(),
        retained_resources: retained.len(),
        barriers: steps.iter().map(|step| step.barriers.len()).sum::<usize>()
            + final_barriers.len(),
        alias_slots: alias_slots.len(),
        transient_bytes,
        aliased_bytes: alias_slots.iter().map(AliasSlot::size_in_bytes).sum(),
    };

    Ok(CompiledPlan {
        steps,
        culled,
        retained,
        lifetimes,
        final_barriers,
        alias_slots,
        stats,
    })
}

/// Every resource a pass reads or writes must exist, and transients must
/// have a creator somewhere in the builder.
fn validate_producers(
    passes: &[Box<dyn ExecutablePass>],
    registry: &ResourceRegistry,
) -> FrameGraphResult<()> {
    for pass in passes {
        let base = pass.base();
        for id in base.read.iter().chain(base.written.iter()) {
            let resource = registry
                .resource(*id)
                .ok_or_else(|| FrameGraphError::UnknownResource {
                    pass: base.name.clone(),
                    index: id.0,
                })?;
            if resource.is_transient && resource.creator.is_none() {
                return Err(FrameGraphError::MissingProducer {
                    pass: base.name.clone(),
                    resource: resource.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Predecessor sets, indexed by pass.
struct Dependencies {
    /// Everything a pass must run after, including earlier readers of the
    /// version it overwrites
    order: Vec<BTreeSet<usize>>,
    /// Passes whose output a pass consumes; culling follows only these
    data: Vec<BTreeSet<usize>>,
}

fn build_dependencies(pass_count: usize, registry: &ResourceRegistry) -> Dependencies {
    let mut order = vec![BTreeSet::new(); pass_count];
    let mut data = vec![BTreeSet::new(); pass_count];

    for resource in registry.resources() {
        for version in &resource.versions {
            let Some(producer) = version.producer.map(|id| id.index()) else {
                continue;
            };
            for reader in version.readers.iter().map(PassId::index) {
                if reader != producer {
                    order[reader].insert(producer);
                    data[reader].insert(producer);
                }
            }
        }

        for pair in resource.versions.windows(2) {
            let (previous, next) = (&pair[0], &pair[1]);
            let Some(writer) = next.producer.map(|id| id.index()) else {
                continue;
            };
            if let Some(producer) = previous.producer.map(|id| id.index()) {
                if producer != writer {
                    order[writer].insert(producer);
                    data[writer].insert(producer);
                }
            }
            // Readers of the previous version must finish before it is overwritten.
            for reader in previous.readers.iter().map(PassId::index) {
                if reader != writer {
                    order[writer].insert(reader);
                }
            }
        }
    }

    Dependencies { order, data }
}

fn topological_sort(
    passes: &[Box<dyn ExecutablePass>],
    dependencies: &[BTreeSet<usize>],
) -> FrameGraphResult<Vec<usize>> {
    let pass_count = dependencies.len();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); pass_count];
    let mut in_degree: Vec<usize> = vec![0; pass_count];
    for (pass, preds) in dependencies.iter().enumerate() {
        in_degree[pass] = preds.len();
        for &pred in preds {
            dependents[pred].push(pass);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(pass, _)| Reverse(pass))
        .collect();

    let mut sorted = Vec::with_capacity(pass_count);
    while let Some(Reverse(pass)) = ready.pop() {
        sorted.push(pass);
        for &dependent in &dependents[pass] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if sorted.len() != pass_count {
        let passes = cycle_participants(&in_degree, &dependents)
            .into_iter()
            .map(|index| passes[index].base().name.clone())
            .collect();
        return Err(FrameGraphError::CyclicDependency { passes });
    }

    Ok(sorted)
}

/// Passes left unsorted, minus those that only sit downstream of a cycle.
fn cycle_participants(in_degree: &[usize], dependents: &[Vec<usize>]) -> Vec<usize> {
    let mut remaining: Vec<bool> = in_degree.iter().map(|&degree| degree > 0).collect();
    loop {
        let mut pruned = false;
        for pass in 0..remaining.len() {
            if remaining[pass] && !dependents[pass].iter().any(|&d| remaining[d]) {
                remaining[pass] = false;
                pruned = true;
            }
        }
        if !pruned {
            break;
        }
    }
    (0..remaining.len()).filter(|&pass| remaining[pass]).collect()
}

fn find_live_passes(
    passes: &[Box<dyn ExecutablePass>],
    registry: &ResourceRegistry,
    dependencies: &[BTreeSet<usize>],
    backbuffer: Option<&str>,
) -> Vec<bool> {
    let pass_count = passes.len();
    let is_backbuffer = |resource: &FrameGraphResource| Some(resource.name.as_str()) == backbuffer;

    if let Some(name) = backbuffer {
        if registry.find(name).is_none() {
            log::warn!("Backbuffer '{}' is not declared by any pass", name);
        }
    }

    let roots: Vec<&FrameGraphResource> = registry
        .resources()
        .iter()
        .filter(|resource| resource.is_root || is_backbuffer(resource))
        .collect();
    if roots.is_empty() {
        log::debug!("No root resources, culling skipped");
        return vec![true; pass_count];
    }

    let mut live = vec![false; pass_count];
    let mut stack: Vec<usize> = roots
        .iter()
        .flat_map(|resource| resource.producers())
        .map(|id| id.index())
        .chain(
            passes
                .iter()
                .filter(|pass| pass.base().side_effect)
                .map(|pass| pass.base().id.index()),
        )
        .collect();

    while let Some(pass) = stack.pop() {
        if live[pass] {
            continue;
        }
        live[pass] = true;
        stack.extend(dependencies[pass].iter().copied().filter(|&d| !live[d]));
    }

    live
}

fn compute_lifetimes(
    passes: &[Box<dyn ExecutablePass>],
    order: &[usize],
) -> HashMap<ResourceId, ResourceLifetime> {
    let mut lifetimes: HashMap<ResourceId, ResourceLifetime> = HashMap::new();
    for (step, &pass) in order.iter().enumerate() {
        for id in passes[pass].base().accessed() {
            lifetimes
                .entry(id)
                .and_modify(|lifetime| lifetime.last_use = step)
                .or_insert(ResourceLifetime {
                    first_use: step,
                    last_use: step,
                });
        }
    }
    lifetimes
}

/// State a pass needs `id` in while it runs.
pub(crate) fn required_state(
    pass: &FramePassBase,
    id: ResourceId,
    descriptor: &ResourceDescriptor,
) -> ResourceState {
    let texture = descriptor.as_texture();
    let is_depth = texture.is_some_and(|desc| desc.format.is_depth());

    if pass.resolved.contains(&id) {
        return ResourceState::ResolveDestination;
    }

    if pass.creates(id) || pass.writes(id) {
        return match (pass.pass_type, texture) {
            (PassType::Transfer, _) => ResourceState::TransferDestination,
            (PassType::Graphics, Some(_)) if is_depth => ResourceState::DepthStencilAttachment,
            (PassType::Graphics, Some(_)) => ResourceState::ColorAttachment,
            _ => ResourceState::ShaderWrite,
        };
    }

    match pass.pass_type {
        PassType::Transfer => ResourceState::TransferSource,
        PassType::Graphics if is_depth && !pass.sampled.contains(&id) => {
            ResourceState::DepthStencilAttachment
        }
        _ => ResourceState::ShaderRead,
    }
}

/// Fill per-step barriers and return the transitions recorded after the
/// last step (backbuffer to `Present`).
fn plan_barriers(
    passes: &[Box<dyn ExecutablePass>],
    registry: &ResourceRegistry,
    order: &[usize],
    steps: &mut [CompiledStep],
    backbuffer: Option<&str>,
) -> Vec<ResourceBarrier> {
    let mut states: HashMap<ResourceId, ResourceState> = HashMap::new();

    for (step, &pass) in steps.iter_mut().zip(order) {
        let base = passes[pass].base();
        for id in base.accessed() {
            let Some(resource) = registry.resource(id) else {
                continue;
            };
            let to = required_state(base, id, &resource.descriptor);
            let from = states.get(&id).copied().unwrap_or(ResourceState::Undefined);
            if from != to {
                step.barriers.push(ResourceBarrier {
                    resource: id,
                    name: resource.name.clone(),
                    from,
                    to,
                });
            }
            states.insert(id, to);
        }
    }

    let mut final_barriers = Vec::new();
    if let Some(resource) = backbuffer.and_then(|name| registry.find(name)) {
        if let Some(&from) = states.get(&resource.id) {
            if from != ResourceState::Present {
                final_barriers.push(ResourceBarrier {
                    resource: resource.id,
                    name: resource.name.clone(),
                    from,
                    to: ResourceState::Present,
                });
            }
        }
    }
    final_barriers
}

/// Greedy first-fit assignment of transients to alias slots.
fn plan_aliasing(
    registry: &ResourceRegistry,
    transients: &[(ResourceId, ResourceLifetime)],
) -> Vec<AliasSlot> {
    let mut ordered = transients.to_vec();
    ordered.sort_by_key(|(id, lifetime)| (lifetime.first_use, *id));

    let mut slots: Vec<AliasSlot> = Vec::new();
    for (id, lifetime) in ordered {
        let Some(resource) = registry.resource(id) else {
            continue;
        };
        let slot = slots.iter_mut().find(|slot| {
            slot.last_use < lifetime.first_use
                && slot.descriptor.is_compatible_with(&resource.descriptor)
        });
        match slot {
            Some(slot) => {
                slot.resources.push(id);
                slot.last_use = lifetime.last_use;
            }
            None => slots.push(AliasSlot {
                descriptor: resource.descriptor.clone(),
                resources: vec![id],
                last_use: lifetime.last_use,
            }),
        }
    }
    slots
}
