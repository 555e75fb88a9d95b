//! Per-task thread-state planning.
//!
//! The generated program navigates LPUs with a small amount of per-thread
//! state: how many threads the task runs, which PPU of each LPS a thread
//! stands for, how LPS ids chain to their parents, and how the next LPU of an
//! LPS is put together from ancestor LPUs and get-part calls. Everything here
//! is derived from the mapping tree and the PCubeS model; the PPU-id
//! computation is directly executable, the LPU routines come out as plans for
//! the emitter.

use indexmap::{IndexMap, IndexSet};
use tessel_space::{DataStructure, MappingNode, PcubesModel, SpaceId, TaskSpaces};
use tracing::debug;

/// Total-thread and threads-per-core constants of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadCounts {
    pub total_threads: usize,
    pub threads_per_core: usize,
}

/// Thread counts from the mapping: the total is the product of PPS unit
/// counts from the highest PPS any partitioned LPS maps to down to the lowest
/// mapped PPS, inclusive; threads-per-core multiplies the levels strictly
/// below the core space.
pub fn compute_thread_counts(mapping: &MappingNode, pcubes: &PcubesModel, spaces: &TaskSpaces) -> ThreadCounts {
    let lowest_mapped = mapping.lowest_mapped_pps();
    let highest_partitioned =
        mapping.bfs().filter(|n| spaces.space(n.lps).is_partitioned()).map(|n| n.pps).max();

    let total_threads = match highest_partitioned {
        Some(highest) => pcubes.units_product(lowest_mapped, highest),
        None => 1,
    };
    let core = pcubes.core_space_id();
    let threads_per_core = if core > lowest_mapped { pcubes.units_product(lowest_mapped, core - 1) } else { 1 };

    debug!(total_threads, threads_per_core, "thread count constants");
    ThreadCounts { total_threads, threads_per_core }
}

/// PPU standing of one thread within one LPS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpuIds {
    /// Threads per PPU group at this LPS.
    pub group_size: usize,
    /// Which group the thread belongs to.
    pub group_id: usize,
    /// How many PPUs the LPS runs on.
    pub ppu_count: usize,
    /// The PPU this thread represents; `None` for threads that only assist
    /// the group's representative.
    pub id: Option<usize>,
}

/// Per-LPS PPU standings of one thread.
#[derive(Debug, Clone)]
pub struct ThreadIds {
    pub thread_no: usize,
    pub ppu_ids: IndexMap<SpaceId, PpuIds>,
}

/// Compute the PPU standings of thread `thread_no` by walking the mapping
/// tree breadth first.
///
/// Sub-partition LPSes copy their parent's group size and always claim PPU 0
/// of a single-PPU group; whether that stays correct when a sub-partitioned
/// LPS maps below the core PPS is an open modeling question, kept as-is.
pub fn ppu_ids_for_thread(
    thread_no: usize,
    mapping: &MappingNode,
    pcubes: &PcubesModel,
    spaces: &TaskSpaces,
    counts: ThreadCounts,
) -> ThreadIds {
    let mut ppu_ids: IndexMap<SpaceId, PpuIds> = IndexMap::new();
    // the thread's index within its group, per LPS, for downstream levels
    let mut group_thread_ids: IndexMap<SpaceId, usize> = IndexMap::new();

    let root_lps = mapping.lps;
    group_thread_ids.insert(root_lps, thread_no);
    ppu_ids.insert(
        root_lps,
        PpuIds {
            group_size: counts.total_threads,
            group_id: 0,
            ppu_count: 1,
            id: (thread_no == 0).then_some(0),
        },
    );

    for (node, parent) in mapping.bfs_with_parent() {
        let Some(parent) = parent else { continue };
        let lps = node.lps;
        let parent_lps = parent.lps;

        if spaces.space(lps).is_subpartition() {
            let inherited = ppu_ids[&parent_lps].group_size;
            ppu_ids.insert(lps, PpuIds { group_size: inherited, group_id: 0, ppu_count: 1, id: Some(0) });
            let parent_idx = group_thread_ids[&parent_lps];
            group_thread_ids.insert(lps, parent_idx);
            continue;
        }

        // how many partitions this PPS cuts each parent-PPS unit into
        let partition_count = pcubes.units_product(node.pps, parent.pps.saturating_sub(1)).max(1);

        let at_mapping_root = parent_lps == root_lps;
        let thread_count =
            if at_mapping_root { counts.total_threads } else { ppu_ids[&parent_lps].group_size };
        let parent_idx =
            if at_mapping_root { thread_no } else { group_thread_ids[&parent_lps] };

        let group_size = if spaces.space(lps).is_partitioned() {
            (thread_count / partition_count).max(1)
        } else {
            thread_count
        };
        let group_thread_id = parent_idx % group_size;
        let group_id = parent_idx / group_size;

        ppu_ids.insert(
            lps,
            PpuIds {
                group_size,
                group_id,
                ppu_count: partition_count,
                id: (group_thread_id == 0).then_some(group_id),
            },
        );
        group_thread_ids.insert(lps, group_thread_id);
    }

    ThreadIds { thread_no, ppu_ids }
}

/// Map each LPS to its parent LPS, in mapping-tree breadth-first order; the
/// root maps to `None`.
pub fn lps_parent_index_map(mapping: &MappingNode) -> IndexMap<SpaceId, Option<SpaceId>> {
    mapping.bfs_with_parent().map(|(node, parent)| (node.lps, parent.map(|p| p.lps))).collect()
}

/// One array of the root LPU: its part descriptors alias the global array
/// metadata, memory unallocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootArrayPlan {
    pub variable: String,
    pub dimensions: usize,
}

/// The root LPU is built once from array metadata and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootLpuPlan {
    pub lps: SpaceId,
    pub arrays: Vec<RootArrayPlan>,
}

/// One dimension argument of an LPU-count function: which structure's
/// dimension descriptor to pass, which ancestor LPU it lives in, and the
/// partition arguments the count needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionParameterConfig {
    pub structure: String,
    pub dimension: usize,
    pub ancestor: SpaceId,
    pub partition_arg_indexes: Vec<usize>,
}

/// How the LPU count of one LPS is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LpuCountPlan {
    /// Unpartitioned spaces have a single LPU; no counting.
    Unpartitioned { lps: SpaceId },
    /// Call the space's count function with the PPU count and these
    /// dimension parameters.
    Counted { lps: SpaceId, params: Vec<PartitionParameterConfig> },
}

impl LpuCountPlan {
    pub fn lps(&self) -> SpaceId {
        match self {
            Self::Unpartitioned { lps } | Self::Counted { lps, .. } => *lps,
        }
    }
}

/// Where one LPU field comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LpuFieldSource {
    /// Replicated (or inherited by a sub-partition space): alias the
    /// ancestor LPU's part descriptors unchanged.
    Inherit { ancestor: SpaceId },
    /// Partitioned here: call the structure's get-part routine with the
    /// ancestor part dimensions, LPU counts, next LPU id, and these extra
    /// partition arguments.
    GetPart { ancestor: SpaceId, partition_arg_indexes: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LpuFieldPlan {
    pub variable: String,
    pub source: LpuFieldSource,
}

/// How the next LPU of one LPS is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextLpuPlan {
    pub lps: SpaceId,
    /// Length of the LPU's static id array; zero for unpartitioned spaces.
    pub lpu_id_dims: usize,
    /// Ancestor LPUs to materialize, one reference each, in first-use order.
    pub ancestor_refs: Vec<SpaceId>,
    pub fields: Vec<LpuFieldPlan>,
}

/// Everything thread-state emission needs for one task.
#[derive(Debug, Clone)]
pub struct ThreadStatePlan {
    pub counts: ThreadCounts,
    pub parent_map: IndexMap<SpaceId, Option<SpaceId>>,
    pub root_lpu: RootLpuPlan,
    pub lpu_counts: Vec<LpuCountPlan>,
    pub next_lpu: Vec<NextLpuPlan>,
}

/// The nearest ancestor LPS whose LPU carries the part descriptors this
/// structure needs: its source space, except that a structure inherited by a
/// sub-partition space prefers its owning space.
fn ancestor_lpu_space(lps: SpaceId, structure: &DataStructure, spaces: &TaskSpaces) -> SpaceId {
    if structure.space() != lps {
        return structure.space();
    }
    structure.source_space().unwrap_or(spaces.root())
}

/// Build the full thread-state plan for a task.
pub fn build_thread_state_plan(
    mapping: &MappingNode,
    pcubes: &PcubesModel,
    spaces: &TaskSpaces,
) -> ThreadStatePlan {
    let counts = compute_thread_counts(mapping, pcubes, spaces);
    let parent_map = lps_parent_index_map(mapping);

    let root_space = spaces.space(mapping.lps);
    let root_lpu = RootLpuPlan {
        lps: mapping.lps,
        arrays: root_space
            .local_structures()
            .map(|s| RootArrayPlan { variable: s.name().to_owned(), dimensions: s.dimensions() })
            .collect(),
    };

    let mut lpu_counts = Vec::new();
    let mut next_lpu = Vec::new();
    for (node, parent) in mapping.bfs_with_parent() {
        let lps = node.lps;
        let space = spaces.space(lps);

        lpu_counts.push(if space.is_partitioned() {
            let params = space
                .local_structures()
                .filter(|s| s.is_partitioned() && s.space() == lps)
                .flat_map(|s| {
                    s.dim_specs().iter().enumerate().map(|(dimension, spec)| PartitionParameterConfig {
                        structure: s.name().to_owned(),
                        dimension,
                        ancestor: ancestor_lpu_space(lps, s, spaces),
                        partition_arg_indexes: spec.partition_arg_indexes.to_vec(),
                    })
                })
                .collect();
            LpuCountPlan::Counted { lps, params }
        } else {
            LpuCountPlan::Unpartitioned { lps }
        });

        // the root LPU is fixed for the whole task; only descendants get a
        // next-LPU routine
        if parent.is_none() {
            continue;
        }

        let mut ancestor_refs = IndexSet::new();
        let fields = space
            .local_structures()
            .map(|s| {
                let ancestor = ancestor_lpu_space(lps, s, spaces);
                ancestor_refs.insert(ancestor);
                let source = if s.is_partitioned() && s.space() == lps {
                    LpuFieldSource::GetPart {
                        ancestor,
                        partition_arg_indexes: s
                            .dim_specs()
                            .iter()
                            .flat_map(|spec| spec.partition_arg_indexes.iter().copied())
                            .collect(),
                    }
                } else {
                    LpuFieldSource::Inherit { ancestor }
                };
                LpuFieldPlan { variable: s.name().to_owned(), source }
            })
            .collect();

        next_lpu.push(NextLpuPlan {
            lps,
            lpu_id_dims: space.dimensions(),
            ancestor_refs: ancestor_refs.into_iter().collect(),
            fields,
        });
    }

    ThreadStatePlan { counts, parent_map, root_lpu, lpu_counts, next_lpu }
}
