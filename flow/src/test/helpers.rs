//! Shared builders for flow tests.

use tessel_space::{DataStructure, SpaceId, TaskSpaces};

/// `Root -> A -> B`, with variable `u` partitioned in both A and B and
/// variable `v` partitioned in A only. `ghost` is partitioned in B with
/// overlapping boundaries.
pub fn two_level_task() -> (TaskSpaces, SpaceId, SpaceId) {
    use tessel_space::{DimPartitionSpec, PartitionFnKind};

    let mut spaces = TaskSpaces::new("Root");
    let root = spaces.root();
    let a = spaces.add_space("A", 1, root, false);
    let b = spaces.add_space("B", 1, a, false);

    let block = || vec![DimPartitionSpec::new(PartitionFnKind::Block).with_args([0])];
    let overlapped =
        || vec![DimPartitionSpec::new(PartitionFnKind::Block).with_args([0]).with_padding(1, 1)];

    spaces.space_mut(a).add_structure(DataStructure::new("u", 1, a).with_dim_specs(block()));
    spaces.space_mut(a).add_structure(DataStructure::new("v", 1, a).with_dim_specs(block()));
    spaces
        .space_mut(b)
        .add_structure(DataStructure::new("u", 1, b).with_source(a).with_dim_specs(block()));
    spaces
        .space_mut(b)
        .add_structure(DataStructure::new("ghost", 1, b).with_dim_specs(overlapped()));

    (spaces, a, b)
}

/// `Root -> A -> B -> C`, where `w` is used in A and C but not in B. A
/// C-phase write of `w` must reach A through a return sync: the exit from B
/// cannot publish a variable B does not use.
pub fn three_level_task() -> (TaskSpaces, SpaceId, SpaceId, SpaceId) {
    use tessel_space::{DimPartitionSpec, PartitionFnKind};

    let mut spaces = TaskSpaces::new("Root");
    let root = spaces.root();
    let a = spaces.add_space("A", 1, root, false);
    let b = spaces.add_space("B", 1, a, false);
    let c = spaces.add_space("C", 1, b, false);

    let block = || vec![DimPartitionSpec::new(PartitionFnKind::Block).with_args([0])];
    spaces.space_mut(a).add_structure(DataStructure::new("w", 1, a).with_dim_specs(block()));
    spaces.space_mut(c).add_structure(DataStructure::new("w", 1, c).with_source(a).with_dim_specs(block()));

    (spaces, a, b, c)
}
