use tessel_flow::{
    CompositeVariant, Condition, FlowTree, RepeatCycleType, StageId, SyncType, VariableAccess,
};
use tessel_space::{MappingNode, SpaceId, TaskSpaces};

use crate::gpu::{GpuContextType, GpuExecutionContext};

/// Host at PPS 4, GPU levels at PPS 2 (card) and PPS 1 (SM). `gpu_lps` maps
/// to the card level, `sm_lps` below it.
fn hybrid_task(subpartitioned_sm: bool) -> (TaskSpaces, MappingNode, SpaceId, SpaceId) {
    let mut spaces = TaskSpaces::new("Root");
    let root = spaces.root();
    let host = spaces.add_space("H", 1, root, false);
    let gpu = spaces.add_space("G", 1, host, false);
    let sm = spaces.add_space("S", 1, gpu, subpartitioned_sm);

    let mut mapping = MappingNode::new(root, 4);
    mapping
        .add_child(MappingNode::new(host, 3))
        .add_child(MappingNode::new(gpu, 2))
        .add_child(MappingNode::new(sm, 1));
    (spaces, mapping, gpu, sm)
}

fn stamp(tree: &mut FlowTree, stage: StageId, accesses: Vec<VariableAccess>) {
    tree.replace_access_map(stage, accesses.into_iter().collect());
}

#[test]
fn repeat_groups_split_at_unbridgeable_dependencies() {
    // a repeat block over two stages with a write-read dependency at the
    // context LPS becomes one group with two sequential kernels.
    let (spaces, mapping, gpu, _) = hybrid_task(false);
    let mut tree = FlowTree::new(gpu);
    let root = tree.root();
    let repeat = tree.add_composite(
        root,
        gpu,
        CompositeVariant::Repeat { cycle: RepeatCycleType::ConditionBound, condition: Condition::new("i < n") },
    );
    let producer = tree.add_instantiation(repeat, gpu, "produce", vec![]);
    let consumer = tree.add_instantiation(repeat, gpu, "consume", vec![]);
    stamp(&mut tree, producer, vec![VariableAccess::written("x")]);
    stamp(&mut tree, consumer, vec![VariableAccess::read("x")]);
    tree.reindex();

    let context =
        GpuExecutionContext::new(2, vec![repeat], &tree, &spaces, &mapping).unwrap();

    assert_eq!(context.context_lps(), gpu);
    let groups = context.kernel_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].repeat_condition().unwrap().text(), "i < n");
    let kernels = groups[0].kernels();
    assert_eq!(kernels.len(), 2, "the dependency cannot be bridged inside one kernel");
    assert_eq!(kernels[0].stages, vec![producer]);
    assert_eq!(kernels[1].stages, vec![consumer]);
}

#[test]
fn sub_sm_dependencies_stay_in_one_kernel() {
    let (spaces, mapping, gpu, sm) = hybrid_task(false);
    let mut tree = FlowTree::new(gpu);
    let root = tree.root();
    let producer = tree.add_instantiation(root, sm, "produce", vec![]);
    let consumer = tree.add_instantiation(root, sm, "consume", vec![]);
    stamp(&mut tree, producer, vec![VariableAccess::written("x")]);
    stamp(&mut tree, consumer, vec![VariableAccess::read("x")]);
    tree.reindex();

    let context =
        GpuExecutionContext::new(2, vec![producer, consumer], &tree, &spaces, &mapping).unwrap();

    let groups = context.kernel_groups();
    assert_eq!(groups.len(), 1);
    assert!(groups[0].repeat_condition().is_none());
    assert_eq!(groups[0].kernels().len(), 1, "an SM-local dependency is a __syncthreads, not a relaunch");
}

#[test]
fn implanted_syncs_at_the_context_level_split_kernels() {
    let (spaces, mapping, gpu, sm) = hybrid_task(false);
    let mut tree = FlowTree::new(gpu);
    let root = tree.root();
    let first = tree.add_instantiation(root, sm, "first", vec![]);
    let barrier = tree.new_sync_stage(gpu, SyncType::Exit, Default::default());
    tree.add_child_at_end(root, barrier);
    let second = tree.add_instantiation(root, sm, "second", vec![]);
    tree.reindex();

    let context =
        GpuExecutionContext::new(2, vec![first, barrier, second], &tree, &spaces, &mapping).unwrap();

    let kernels = context.kernel_groups()[0].kernels();
    assert_eq!(kernels.len(), 2);
    // sync stages mark the cut; they are not kernel stages themselves
    assert_eq!(kernels[0].stages, vec![first]);
    assert_eq!(kernels[1].stages, vec![second]);
}

#[test]
fn entry_below_the_context_lps_still_batches_at_the_gpu_boundary() {
    let (spaces, mapping, gpu, sm) = hybrid_task(false);
    let mut tree = FlowTree::new(gpu);
    let root = tree.root();
    let deep = tree.add_instantiation(root, sm, "deep", vec![]);
    tree.reindex();

    let context = GpuExecutionContext::new(2, vec![deep], &tree, &spaces, &mapping).unwrap();
    assert_eq!(context.context_lps(), gpu, "the topmost GPU-mapped LPS on the path wins");
}

#[test]
fn subpartitioned_contexts_are_location_sensitive() {
    let (spaces, mapping, gpu, sm) = hybrid_task(true);
    let mut tree = FlowTree::new(gpu);
    let root = tree.root();
    let stage = tree.add_instantiation(root, sm, "pinned", vec![]);
    tree.reindex();

    let context = GpuExecutionContext::new(2, vec![stage], &tree, &spaces, &mapping).unwrap();
    assert_eq!(context.context_type(), GpuContextType::LocationSensitive);

    let (spaces, mapping, gpu, sm) = hybrid_task(false);
    let mut tree = FlowTree::new(gpu);
    let root = tree.root();
    let stage = tree.add_instantiation(root, sm, "loose", vec![]);
    tree.reindex();
    let context = GpuExecutionContext::new(2, vec![stage], &tree, &spaces, &mapping).unwrap();
    assert_eq!(context.context_type(), GpuContextType::LocationIndependent);
}

#[test]
fn variable_analysis_drives_stage_in_and_out() {
    let (spaces, mapping, gpu, _) = hybrid_task(false);
    let mut tree = FlowTree::new(gpu);
    let root = tree.root();
    let stage = tree.add_instantiation(root, gpu, "step", vec![]);
    stamp(
        &mut tree,
        stage,
        vec![
            VariableAccess::read("plate"),
            VariableAccess::written("plate"),
            VariableAccess::read("stencil").with_epoch_dependency(),
        ],
    );
    tree.reindex();

    let context = GpuExecutionContext::new(2, vec![stage], &tree, &spaces, &mapping).unwrap();
    assert_eq!(context.accessed_variables().collect::<Vec<_>>(), vec!["plate", "stencil"]);
    assert_eq!(context.modified_variables().collect::<Vec<_>>(), vec!["plate"]);
    assert_eq!(context.epoch_dependent_variables().collect::<Vec<_>>(), vec!["stencil"]);
    assert_eq!(context.epoch_independent_variables().collect::<Vec<_>>(), vec!["plate"]);
    assert_eq!(context.context_name(&tree), format!("GpuExecutionContext_{}", tree.index(stage)));
}
