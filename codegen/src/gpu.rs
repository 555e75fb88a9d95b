//! GPU execution contexts.
//!
//! A contiguous stretch of the computation flow whose entry LPS is mapped to
//! a GPU PPS executes as one context: the host generates LPU batches and
//! ships them at the context boundary. Inside a context no primitive can
//! synchronize updates across SMs within one kernel, so each repeat-delimited
//! kernel group is split into a series of kernels at every synchronization
//! point intra-kernel barriers cannot bridge.

use std::collections::VecDeque;

use indexmap::IndexMap;
use itertools::Itertools;
use tessel_flow::{AccessMap, CompositeVariant, Condition, FlowTree, StageId};
use tessel_space::{MappingNode, SpaceId, TaskSpaces};
use tracing::debug;

use crate::error::{Result, UnmappedSpaceSnafu};

/// How LPUs of a context are distributed over the GPU's PPUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuContextType {
    /// Some LPS inside the context is sub-partitioned: the LPU-to-PPU
    /// mapping must be precise.
    LocationSensitive,
    /// Batched LPUs may be multiplexed onto arbitrary PPUs.
    LocationIndependent,
}

/// One kernel: a maximal run of stages whose internal dependencies stay
/// bridgeable by intra-kernel barriers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    pub stages: Vec<StageId>,
}

/// The portion of a context grouped under one host-level repeat: the host
/// iterates, each iteration launches the group's kernels in order.
#[derive(Debug, Clone)]
pub struct KernelGroupConfig {
    group_id: usize,
    repeat_condition: Option<Condition>,
    subflow: Vec<StageId>,
    kernels: Vec<KernelConfig>,
}

impl KernelGroupConfig {
    pub fn group_id(&self) -> usize {
        self.group_id
    }

    pub fn repeat_condition(&self) -> Option<&Condition> {
        self.repeat_condition.as_ref()
    }

    pub fn subflow(&self) -> &[StageId] {
        &self.subflow
    }

    pub fn kernels(&self) -> &[KernelConfig] {
        &self.kernels
    }
}

/// A sub-flow of the task's computation flow dedicated to GPU execution.
#[derive(Debug)]
pub struct GpuExecutionContext {
    context_lps: SpaceId,
    context_flow: Vec<StageId>,
    context_type: GpuContextType,
    access_log: AccessMap,
    kernel_groups: Vec<KernelGroupConfig>,
}

impl GpuExecutionContext {
    /// Analyze one GPU-bound stretch of top-level flow stages.
    /// `topmost_gpu_pps` is the highest PPS id the hybrid model runs on the
    /// GPU; every PPS at or below it is a GPU level.
    pub fn new(
        topmost_gpu_pps: usize,
        context_flow: Vec<StageId>,
        tree: &FlowTree,
        spaces: &TaskSpaces,
        mapping: &MappingNode,
    ) -> Result<Self> {
        assert!(!context_flow.is_empty(), "a GPU context needs at least one stage");
        let entry_lps = tree.space(context_flow[0]);
        let context_lps = context_lps_for(topmost_gpu_pps, entry_lps, spaces, mapping)?;

        let context_type = if spaces_inside(tree, &context_flow)
            .into_iter()
            .any(|s| spaces.space(s).is_subpartition())
        {
            GpuContextType::LocationSensitive
        } else {
            GpuContextType::LocationIndependent
        };

        let mut access_log = AccessMap::new();
        for &stage in &context_flow {
            merge_subtree_accesses(tree, stage, &mut access_log);
        }

        let kernel_groups = build_kernel_groups(tree, mapping, context_lps, &context_flow)?;
        debug!(
            context = ?context_lps,
            groups = kernel_groups.len(),
            ?context_type,
            "gpu execution context built"
        );

        Ok(Self { context_lps, context_flow, context_type, access_log, kernel_groups })
    }

    pub fn context_lps(&self) -> SpaceId {
        self.context_lps
    }

    pub fn context_type(&self) -> GpuContextType {
        self.context_type
    }

    pub fn kernel_groups(&self) -> &[KernelGroupConfig] {
        &self.kernel_groups
    }

    /// The context id is the index of its first flow stage; generated
    /// executor classes are searched by it.
    pub fn context_id(&self, tree: &FlowTree) -> usize {
        tree.index(self.context_flow[0])
    }

    pub fn context_name(&self, tree: &FlowTree) -> String {
        format!("GpuExecutionContext_{}", self.context_id(tree))
    }

    /// Every task-global variable the context touches.
    pub fn accessed_variables(&self) -> impl Iterator<Item = &str> {
        self.access_log.iter().map(|a| a.name.as_str())
    }

    /// Variables the context modifies; these must stage out of GPU memory.
    pub fn modified_variables(&self) -> impl Iterator<Item = &str> {
        self.access_log.modified().map(|a| a.name.as_str())
    }

    pub fn epoch_dependent_variables(&self) -> impl Iterator<Item = &str> {
        self.access_log.epoch_dependent().map(|a| a.name.as_str())
    }

    pub fn epoch_independent_variables(&self) -> impl Iterator<Item = &str> {
        self.access_log.iter().filter(|a| !a.epoch_dependent).map(|a| a.name.as_str())
    }
}

/// The topmost LPS on the root-to-entry path mapped to a GPU PPS. Even when
/// the flow dives into a deeper GPU LPS directly from the host, batching
/// happens at this boundary; deeper LPUs are generated inside the kernels.
fn context_lps_for(
    topmost_gpu_pps: usize,
    entry_lps: SpaceId,
    spaces: &TaskSpaces,
    mapping: &MappingNode,
) -> Result<SpaceId> {
    let path = spaces.path_to_root(entry_lps);
    for &lps in path.iter().rev() {
        let Some(pps) = mapping.pps_for(lps) else { continue };
        if pps <= topmost_gpu_pps {
            return Ok(lps);
        }
    }
    UnmappedSpaceSnafu { name: spaces.space(entry_lps).name() }.fail()
}

/// All distinct spaces of stages in and below the given flow stretch.
fn spaces_inside(tree: &FlowTree, flow: &[StageId]) -> Vec<SpaceId> {
    let mut queue: VecDeque<StageId> = flow.iter().copied().collect();
    let mut found = Vec::new();
    while let Some(stage) = queue.pop_front() {
        found.push(tree.space(stage));
        queue.extend(tree.children(stage).iter().copied());
    }
    found.into_iter().unique().collect()
}

fn merge_subtree_accesses(tree: &FlowTree, at: StageId, into: &mut AccessMap) {
    into.merge(tree.access_map(at));
    for &child in tree.children(at) {
        merge_subtree_accesses(tree, child, into);
    }
}

/// Walk the context flow with a queue. A repeat cycle closes the running
/// group and opens one carrying its condition; other composites expand in
/// place; leaves and syncs accumulate into the running group's sub-flow.
fn build_kernel_groups(
    tree: &FlowTree,
    mapping: &MappingNode,
    context_lps: SpaceId,
    flow: &[StageId],
) -> Result<Vec<KernelGroupConfig>> {
    let mut groups = Vec::new();
    let mut running: Vec<StageId> = Vec::new();
    let mut queue: VecDeque<StageId> = flow.iter().copied().collect();

    let mut flush = |running: &mut Vec<StageId>, repeat: Option<Condition>, groups: &mut Vec<KernelGroupConfig>| {
        if running.is_empty() && repeat.is_none() {
            return;
        }
        let subflow = std::mem::take(running);
        let kernels = split_into_kernels(tree, mapping, context_lps, &subflow);
        groups.push(KernelGroupConfig {
            group_id: groups.len(),
            repeat_condition: repeat,
            subflow,
            kernels,
        });
    };

    while let Some(stage) = queue.pop_front() {
        match tree.composite_variant(stage) {
            Some(CompositeVariant::Repeat { condition, .. }) => {
                flush(&mut running, None, &mut groups);
                let mut body = Vec::new();
                flatten_subflow(tree, stage, &mut body);
                let mut body_flow = body;
                flush(&mut body_flow, Some(condition.clone()), &mut groups);
            }
            Some(_) => {
                // expand in place, preserving order
                for &child in tree.children(stage).iter().rev() {
                    queue.push_front(child);
                }
            }
            None => running.push(stage),
        }
    }
    flush(&mut running, None, &mut groups);
    Ok(groups)
}

/// Depth-first flattening of a composite's stages into one sub-flow.
fn flatten_subflow(tree: &FlowTree, at: StageId, into: &mut Vec<StageId>) {
    for &child in tree.children(at) {
        if tree.is_composite(child) {
            flatten_subflow(tree, child, into);
        } else {
            into.push(child);
        }
    }
}

/// Split a sub-flow at every synchronization point intra-kernel barriers
/// cannot bridge: a dependency is bridgeable only when its writer's space is
/// mapped strictly below the context PPS (the update never leaves an SM).
fn split_into_kernels(
    tree: &FlowTree,
    mapping: &MappingNode,
    context_lps: SpaceId,
    subflow: &[StageId],
) -> Vec<KernelConfig> {
    let context_pps = mapping.pps_for(context_lps).expect("context LPS is mapped by construction");
    let bridgeable =
        |space: SpaceId| mapping.pps_for(space).is_some_and(|pps| pps < context_pps);

    let mut kernels = Vec::new();
    let mut current: Vec<StageId> = Vec::new();
    // most recent writer space per variable within the current kernel
    let mut writers: IndexMap<String, SpaceId> = IndexMap::new();

    let mut close = |current: &mut Vec<StageId>, writers: &mut IndexMap<String, SpaceId>| {
        if !current.is_empty() {
            kernels.push(KernelConfig { stages: std::mem::take(current) });
        }
        writers.clear();
    };

    for &stage in subflow {
        if tree.is_sync(stage) {
            // an implanted sync materializes here as either an in-kernel
            // barrier or a kernel boundary
            if !bridgeable(tree.space(stage)) {
                close(&mut current, &mut writers);
            }
            continue;
        }

        let map = tree.access_map(stage);
        let splits = map
            .iter()
            .filter(|a| a.read)
            .filter_map(|a| writers.get(&a.name))
            .any(|&writer_space| !bridgeable(writer_space));
        if splits {
            close(&mut current, &mut writers);
        }

        for access in map.modified() {
            writers.insert(access.name.clone(), tree.space(stage));
        }
        current.push(stage);
    }
    close(&mut current, &mut writers);
    kernels
}
