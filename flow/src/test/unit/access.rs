use crate::access::{AccessMap, VariableAccess};
use crate::error::Diagnostics;
use crate::stage::FlowTree;
use crate::test::helpers::two_level_task;

#[test]
fn merging_flags_is_monotonic() {
    let mut map = AccessMap::new();
    map.record(&VariableAccess::read("u"));
    map.record(&VariableAccess::written("u"));
    let access = map.get("u").unwrap();
    assert!(access.read && access.written);
    assert_eq!(map.len(), 1);
}

#[test]
fn map_order_follows_first_mention() {
    let mut map = AccessMap::new();
    map.record(&VariableAccess::written("b"));
    map.record(&VariableAccess::read("a"));
    map.record(&VariableAccess::written("b"));
    let names: Vec<&str> = map.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a"]);
}

#[test]
fn modified_filters_reads_out() {
    let mut map = AccessMap::new();
    map.record(&VariableAccess::read("a"));
    map.record(&VariableAccess::written("b"));
    let modified: Vec<&str> = map.modified().map(|a| a.name.as_str()).collect();
    assert_eq!(modified, vec!["b"]);
}

#[test]
fn access_checking_builds_stage_maps() {
    let (spaces, a, _) = two_level_task();
    let mut tree = FlowTree::new(spaces.root());
    let root = tree.root();
    let stage =
        tree.add_instantiation(root, a, "refine", vec![VariableAccess::read("u"), VariableAccess::written("v")]);

    let mut diagnostics = Diagnostics::new();
    tree.perform_data_access_checking(&spaces, &mut diagnostics);
    assert!(diagnostics.is_clean());
    assert!(tree.access_map(stage).get("u").unwrap().read);
    assert!(tree.access_map(stage).get("v").unwrap().written);
}

#[test]
fn unknown_variables_are_counted_not_fatal() {
    let (spaces, a, _) = two_level_task();
    let mut tree = FlowTree::new(spaces.root());
    let root = tree.root();
    let stage = tree.add_instantiation(
        root,
        a,
        "refine",
        vec![VariableAccess::read("nonexistent"), VariableAccess::written("v")],
    );

    let mut diagnostics = Diagnostics::new();
    tree.perform_data_access_checking(&spaces, &mut diagnostics);
    assert_eq!(diagnostics.error_count(), 1);
    // analysis continued: the valid access still landed in the map
    assert!(tree.access_map(stage).contains("v"));
    assert!(!tree.access_map(stage).contains("nonexistent"));
}

#[test]
fn epoch_reads_of_single_version_data_are_rejected() {
    let (spaces, a, _) = two_level_task();
    let mut tree = FlowTree::new(spaces.root());
    let root = tree.root();
    tree.add_instantiation(root, a, "lag", vec![VariableAccess::read("u").with_epoch_dependency()]);

    let mut diagnostics = Diagnostics::new();
    tree.perform_data_access_checking(&spaces, &mut diagnostics);
    assert_eq!(diagnostics.error_count(), 1);
}

#[test]
fn space_limited_population_respects_the_limiter_flag() {
    let (spaces, a, b) = two_level_task();
    let mut tree = FlowTree::new(spaces.root());
    let root = tree.root();
    tree.add_instantiation(root, a, "at_a", vec![VariableAccess::written("v")]);
    tree.add_instantiation(root, b, "at_b", vec![VariableAccess::written("u")]);
    let mut diagnostics = Diagnostics::new();
    tree.perform_data_access_checking(&spaces, &mut diagnostics);

    let mut inclusive = AccessMap::new();
    tree.populate_access_map_for_space_limit(root, &mut inclusive, &spaces, a, true);
    assert!(inclusive.contains("v") && inclusive.contains("u"));

    let mut strict = AccessMap::new();
    tree.populate_access_map_for_space_limit(root, &mut strict, &spaces, a, false);
    assert!(!strict.contains("v") && strict.contains("u"));
}
