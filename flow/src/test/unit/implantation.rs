use tessel_space::SpaceId;

use crate::access::VariableAccess;
use crate::error::Diagnostics;
use crate::implant::implant_sync_stages;
use crate::stage::{CompositeVariant, FlowTree, StageId};
use crate::sync::SyncType;
use crate::test::helpers::{three_level_task, two_level_task};

fn checked(tree: &mut FlowTree, spaces: &tessel_space::TaskSpaces) {
    let mut diagnostics = Diagnostics::new();
    tree.perform_data_access_checking(spaces, &mut diagnostics);
    assert!(diagnostics.is_clean());
}

fn shapes(tree: &FlowTree, composite: StageId) -> Vec<(Option<SyncType>, SpaceId)> {
    tree.children(composite).iter().map(|&c| (tree.sync_type(c), tree.space(c))).collect()
}

#[test]
fn descent_and_ascent_wrap_the_inner_phase() {
    // [A, B, A] with B writing below A becomes
    // [A, entrySync(B), B, exitSync(B), A].
    let (spaces, a, b) = two_level_task();
    let mut tree = FlowTree::new(a);
    let root = tree.root();
    tree.add_instantiation(root, a, "before", vec![VariableAccess::read("v")]);
    tree.add_instantiation(root, b, "inner", vec![VariableAccess::read_write("u")]);
    tree.add_instantiation(root, a, "after", vec![VariableAccess::read("u")]);
    checked(&mut tree, &spaces);

    implant_sync_stages(&mut tree, &spaces).unwrap();

    let shape = shapes(&tree, root);
    assert_eq!(shape.len(), 5);
    assert_eq!(shape[0], (None, a));
    assert_eq!(shape[1], (Some(SyncType::Entrance), b));
    assert_eq!(shape[2], (None, b));
    assert_eq!(shape[3], (Some(SyncType::Exit), b));
    assert_eq!(shape[4], (None, a));

    // the entry sync's access map was populated from the B phase
    let entry = tree.children(root)[1];
    let logged = tree.access_map(entry).get("u").unwrap();
    assert!(logged.read && logged.written);
}

#[test]
fn entry_syncs_populate_exactly_once_per_descent() {
    let (spaces, a, b) = two_level_task();
    let mut tree = FlowTree::new(a);
    let root = tree.root();
    tree.add_instantiation(root, b, "first_dive", vec![VariableAccess::written("u")]);
    tree.add_instantiation(root, a, "surface", vec![VariableAccess::read("u")]);
    tree.add_instantiation(root, b, "second_dive", vec![VariableAccess::read("u")]);
    checked(&mut tree, &spaces);

    implant_sync_stages(&mut tree, &spaces).unwrap();

    let entries: Vec<StageId> = tree
        .children(root)
        .iter()
        .copied()
        .filter(|&c| tree.sync_type(c) == Some(SyncType::Entrance))
        .collect();
    assert_eq!(entries.len(), 2);
    assert!(tree.access_map(entries[0]).get("u").unwrap().written);
    // the second phase only read
    assert!(!tree.access_map(entries[1]).get("u").unwrap().written);
}

#[test]
fn overlapping_writes_add_a_reappearance_sync() {
    let (spaces, a, b) = two_level_task();
    let mut tree = FlowTree::new(a);
    let root = tree.root();
    tree.add_instantiation(root, b, "smear", vec![VariableAccess::written("ghost")]);
    tree.add_instantiation(root, a, "collect", vec![VariableAccess::read("v")]);
    checked(&mut tree, &spaces);

    implant_sync_stages(&mut tree, &spaces).unwrap();

    let kinds: Vec<Option<SyncType>> = tree.children(root).iter().map(|&c| tree.sync_type(c)).collect();
    let reappearances = kinds.iter().filter(|k| **k == Some(SyncType::Reappearance)).count();
    assert_eq!(reappearances, 1);
    // ordering: reappearance before the exit syncs of the same ascent
    let reappear_at = kinds.iter().position(|k| *k == Some(SyncType::Reappearance)).unwrap();
    let exit_at = kinds.iter().position(|k| *k == Some(SyncType::Exit)).unwrap();
    assert!(reappear_at < exit_at);
}

#[test]
fn reads_alone_do_not_sync() {
    let (spaces, a, b) = two_level_task();
    let mut tree = FlowTree::new(a);
    let root = tree.root();
    tree.add_instantiation(root, b, "peek", vec![VariableAccess::read("u")]);
    tree.add_instantiation(root, a, "after", vec![VariableAccess::read("v")]);
    checked(&mut tree, &spaces);

    implant_sync_stages(&mut tree, &spaces).unwrap();

    let kinds: Vec<Option<SyncType>> = tree.children(root).iter().map(|&c| tree.sync_type(c)).collect();
    assert!(!kinds.contains(&Some(SyncType::Exit)));
    assert!(!kinds.contains(&Some(SyncType::Return)));
    assert!(!kinds.contains(&Some(SyncType::Reappearance)));
    // the entry placeholder is still there
    assert!(kinds.contains(&Some(SyncType::Entrance)));
}

#[test]
fn trailing_descents_close_on_return() {
    // a flow ending inside B must still exit B before the composite returns
    let (spaces, a, b) = two_level_task();
    let mut tree = FlowTree::new(a);
    let root = tree.root();
    tree.add_instantiation(root, b, "tail", vec![VariableAccess::written("u")]);
    checked(&mut tree, &spaces);

    implant_sync_stages(&mut tree, &spaces).unwrap();

    let kinds: Vec<Option<SyncType>> = tree.children(root).iter().map(|&c| tree.sync_type(c)).collect();
    assert!(kinds.contains(&Some(SyncType::Exit)));
}

#[test]
fn deep_updates_reach_the_ancestor_through_a_return_sync() {
    // w is written two levels down, in a space chain whose middle level does
    // not use it; only a return sync on A can refresh it.
    let (spaces, a, _, c) = three_level_task();
    let mut tree = FlowTree::new(a);
    let root = tree.root();
    tree.add_instantiation(root, c, "deep", vec![VariableAccess::written("w")]);
    tree.add_instantiation(root, a, "read_back", vec![VariableAccess::read("w")]);
    checked(&mut tree, &spaces);

    implant_sync_stages(&mut tree, &spaces).unwrap();

    let shape = shapes(&tree, root);
    let returns: Vec<&(Option<SyncType>, SpaceId)> =
        shape.iter().filter(|s| s.0 == Some(SyncType::Return)).collect();
    assert_eq!(returns.len(), 1);
    assert_eq!(returns[0].1, a);
    // exit syncs appear only for C, the space that owns the modified data
    assert!(shape.iter().all(|s| s.0 != Some(SyncType::Exit) || s.1 == c));
}

#[test]
fn nested_composites_keep_their_own_sync_scope() {
    let (spaces, a, b) = two_level_task();
    let mut tree = FlowTree::new(a);
    let root = tree.root();
    tree.add_instantiation(root, a, "lead", vec![VariableAccess::read("v")]);
    let block = tree.add_composite(root, b, CompositeVariant::LpsTransition { ancestor: a });
    tree.add_instantiation(block, b, "work", vec![VariableAccess::written("u")]);
    tree.add_instantiation(root, a, "trail", vec![VariableAccess::read("u")]);
    checked(&mut tree, &spaces);

    implant_sync_stages(&mut tree, &spaces).unwrap();

    // the descent into B and its closing syncs live at the root level,
    // around the transition block
    let shape = shapes(&tree, root);
    let entry_at = shape.iter().position(|s| s.0 == Some(SyncType::Entrance)).unwrap();
    let block_at = shape.iter().position(|s| s.0.is_none() && s.1 == b).unwrap();
    let exit_at = shape.iter().position(|s| s.0 == Some(SyncType::Exit)).unwrap();
    assert!(entry_at < block_at && block_at < exit_at);

    // inside the block, both children stay in B: no syncs were needed
    assert!(tree.children(block).iter().all(|&c| !tree.is_sync(c)));
}

#[test]
fn adjacent_non_sync_stages_have_representable_transitions() {
    // every space change left in the list must be ancestor-representable
    let (spaces, a, b) = two_level_task();
    let mut tree = FlowTree::new(a);
    let root = tree.root();
    tree.add_instantiation(root, a, "s1", vec![VariableAccess::written("v")]);
    tree.add_instantiation(root, b, "s2", vec![VariableAccess::written("u")]);
    tree.add_instantiation(root, b, "s3", vec![VariableAccess::read("u")]);
    tree.add_instantiation(root, a, "s4", vec![VariableAccess::read("v")]);
    tree.add_instantiation(root, b, "s5", vec![VariableAccess::read("u")]);
    checked(&mut tree, &spaces);

    implant_sync_stages(&mut tree, &spaces).unwrap();

    let non_sync: Vec<StageId> =
        tree.children(root).iter().copied().filter(|&c| !tree.is_sync(c)).collect();
    for pair in non_sync.windows(2) {
        let (left, right) = (tree.space(pair[0]), tree.space(pair[1]));
        assert!(
            left == right || spaces.is_ancestor(left, right) || spaces.is_ancestor(right, left),
            "unrepresentable transition survived implantation"
        );
    }
}

#[test]
fn indices_are_restamped_after_implantation() {
    let (spaces, a, b) = two_level_task();
    let mut tree = FlowTree::new(a);
    let root = tree.root();
    tree.add_instantiation(root, a, "one", vec![VariableAccess::read("v")]);
    tree.add_instantiation(root, b, "two", vec![VariableAccess::written("u")]);
    checked(&mut tree, &spaces);

    implant_sync_stages(&mut tree, &spaces).unwrap();

    let children = tree.children(root).to_vec();
    let mut last = tree.index(root);
    for child in children {
        assert!(tree.index(child) > last, "indices must increase in preorder");
        last = tree.index(child);
        assert_eq!(tree.group_no(child), Some(tree.index(root)));
    }
}
