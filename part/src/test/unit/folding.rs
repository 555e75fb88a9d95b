use crate::folding::PartFolding;
use crate::test::helpers::{linear_dim_order, linear_spaces, path};
use crate::tracker::ContainerTree;

#[test]
fn single_chain_folds() {
    // two segments sharing a prefix, diverging at the last level
    let (spaces, lps) = linear_spaces();
    let order = linear_dim_order(&lps);
    let mut tree = ContainerTree::new(spaces.root());
    tree.insert_part(&order, 1, &path(&[0, 1, 2]));
    tree.insert_part(&order, 2, &path(&[0, 1, 3]));

    let fold_one = tree.fold_for_segment(1, &order);
    assert_eq!(fold_one.len(), 1);
    assert_eq!(fold_one[0].describe(), "[0]@0.0{[1]@0.1{[2]@0.2}}");

    let fold_two = tree.fold_for_segment(2, &order);
    assert_eq!(fold_two[0].describe(), "[0]@0.0{[1]@0.1{[3]@0.2}}");
}

#[test]
fn contiguous_equal_siblings_coalesce() {
    // adjacent ids with equal descendants collapse into one range
    let (spaces, lps) = linear_spaces();
    let order = linear_dim_order(&lps);
    let mut tree = ContainerTree::new(spaces.root());
    tree.insert_part(&order, 7, &path(&[0, 1, 2]));
    tree.insert_part(&order, 7, &path(&[0, 1, 3]));

    let folds = tree.fold_for_segment(7, &order);
    assert_eq!(folds.len(), 1);
    assert_eq!(folds[0].describe(), "[0]@0.0{[1]@0.1{[2-3]@0.2}}");
}

#[test]
fn non_contiguous_siblings_stay_apart() {
    let (spaces, lps) = linear_spaces();
    let order = linear_dim_order(&lps);
    let mut tree = ContainerTree::new(spaces.root());
    tree.insert_part(&order, 7, &path(&[0, 1, 2]));
    tree.insert_part(&order, 7, &path(&[0, 1, 4]));

    let folds = tree.fold_for_segment(7, &order);
    assert_eq!(folds[0].describe(), "[0]@0.0{[1]@0.1{[2]@0.2 [4]@0.2}}");
}

#[test]
fn differing_descendants_stay_apart() {
    // contiguous upper ids whose subtrees differ must stay separate
    let (spaces, lps) = linear_spaces();
    let order = linear_dim_order(&lps);
    let mut tree = ContainerTree::new(spaces.root());
    tree.insert_part(&order, 7, &path(&[0, 0, 0]));
    tree.insert_part(&order, 7, &path(&[0, 1, 5]));

    let folds = tree.fold_for_segment(7, &order);
    assert_eq!(folds[0].describe(), "[0]@0.0{[0]@0.1{[0]@0.2} [1]@0.1{[5]@0.2}}");
}

#[test]
fn coalescing_cascades_upward() {
    // Equal sub-shapes at contiguous middle-level ids merge as well.
    let (spaces, lps) = linear_spaces();
    let order = linear_dim_order(&lps);
    let mut tree = ContainerTree::new(spaces.root());
    for mid in [0, 1] {
        for leaf in [0, 1, 2] {
            tree.insert_part(&order, 3, &path(&[0, mid, leaf]));
        }
    }

    let folds = tree.fold_for_segment(3, &order);
    assert_eq!(folds[0].describe(), "[0]@0.0{[0-1]@0.1{[0-2]@0.2}}");
    assert_eq!(folds[0].leaf_span(), 6);
}

#[test]
fn folding_is_idempotent_in_content() {
    // fold, render, fold again: equal structure both times
    let (spaces, lps) = linear_spaces();
    let order = linear_dim_order(&lps);
    let mut tree = ContainerTree::new(spaces.root());
    for leaf in [1, 2, 3, 7] {
        tree.insert_part(&order, 4, &path(&[0, 0, leaf]));
    }

    let first = tree.fold_for_segment(4, &order);
    let second = tree.fold_for_segment(4, &order);
    assert_eq!(first, second);
    let rendered: Vec<String> = first.iter().map(PartFolding::describe).collect();
    let rerendered: Vec<String> = second.iter().map(PartFolding::describe).collect();
    assert_eq!(rendered, rerendered);
}

#[test]
fn folds_skip_segments_a_subtree_does_not_hold() {
    let (spaces, lps) = linear_spaces();
    let order = linear_dim_order(&lps);
    let mut tree = ContainerTree::new(spaces.root());
    tree.insert_part(&order, 1, &path(&[0, 1, 2]));

    assert!(tree.fold_for_segment(9, &order).is_empty());
}

#[test]
fn fold_back_wraps_ancestors_without_the_root() {
    let (spaces, lps) = linear_spaces();
    let order = linear_dim_order(&lps);
    let mut tree = ContainerTree::new(spaces.root());
    tree.insert_part(&order, 1, &path(&[3, 1, 2]));

    let leaf = tree.get_container(&path(&[3, 1, 2]), &order).unwrap();
    let folded = tree.fold_container_for_segment(leaf, 1, &order, true).unwrap();
    assert_eq!(folded.describe(), "[3]@0.0{[1]@0.1{[2]@0.2}}");

    let unwrapped = tree.fold_container_for_segment(leaf, 1, &order, false).unwrap();
    assert_eq!(unwrapped.describe(), "[2]@0.2");
}

#[test]
fn hybrid_fold_uses_the_leaf_side_tags() {
    let (spaces, lps) = linear_spaces();
    let order = linear_dim_order(&lps);
    let mut tree = ContainerTree::new(spaces.root());
    // segment 1 bottoms out at the A level, segment 2 descends through it
    tree.insert_part(&order[..1], 1, &path(&[0]));
    tree.insert_part(&order[..2], 2, &path(&[0, 4]));

    let hybrid = tree.get_container(&path(&[0]), &order[..1]).unwrap();
    // folding the hybrid at the terminal position follows the leaf side:
    // segment 2 tagged the intermediate view only
    assert!(tree.fold_container_for_segment(hybrid, 1, &order[..1], false).is_some());
    assert!(tree.fold_container_for_segment(hybrid, 2, &order[..1], false).is_none());
}
