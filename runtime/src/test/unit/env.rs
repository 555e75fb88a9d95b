use std::io::Cursor;

use test_case::test_case;

use tessel_part::Dimension;

use crate::env::{
    ArrayTransferConfig, ProgramEnvironment, TaskEndInstruction, TaskInitInstruction, TaskItem,
    execute_task_init, read_dimension_header,
};
use crate::error::Error;

#[test]
fn dimension_headers_parse() {
    let mut reader = Cursor::new("2 0 99 -5 5\npayload follows\n");
    let dims = read_dimension_header(&mut reader).unwrap();
    assert_eq!(dims, vec![Dimension::new(0, 99), Dimension::new(-5, 5)]);
}

#[test_case("" ; "empty header")]
#[test_case("x 0 9" ; "non numeric count")]
#[test_case("2 0 99 7" ; "truncated pair")]
fn malformed_headers_are_fatal(header: &str) {
    let mut reader = Cursor::new(header.to_owned());
    let err = read_dimension_header(&mut reader).unwrap_err();
    assert!(matches!(err, Error::BadDimensionHeader { .. } | Error::EnvFile { .. }));
}

#[test_case(TaskInitInstruction::StaleRefresh => 0 ; "stale refresh")]
#[test_case(TaskInitInstruction::CreateFresh => 1 ; "create fresh")]
#[test_case(TaskInitInstruction::ReadFromFile { path: "f".into() } => 2 ; "read from file")]
#[test_case(TaskInitInstruction::DataTransfer {
    config: ArrayTransferConfig { source_item: "b".into(), dimensions: vec![] },
} => 3 ; "data transfer")]
fn type_codes_are_stable(instruction: TaskInitInstruction) -> u8 {
    instruction.type_code()
}

#[test]
fn create_fresh_replaces_old_references() {
    let mut env = ProgramEnvironment::new();
    // a previous execution left a version behind
    let stale_key = env.register_parts_list("m");
    env.mark_others_stale("m", None);
    assert!(env.has_stale_version("m"));

    let mut bindings = vec![(TaskInitInstruction::CreateFresh, TaskItem::new("m", 2, 1))];
    execute_task_init(&mut bindings, &mut env).unwrap();

    let versions = env.versions_of("m");
    assert_eq!(versions.len(), 1, "old references were dropped");
    assert_ne!(versions[0].key, stale_key);
    assert!(versions[0].fresh);
    assert_eq!(bindings[0].1.source_key(), Some(versions[0].key));
}

#[test]
fn stale_refresh_only_marks_freshness() {
    let mut env = ProgramEnvironment::new();
    let key = env.register_parts_list("m");
    env.mark_others_stale("m", None);

    let mut bindings = vec![(TaskInitInstruction::StaleRefresh, TaskItem::new("m", 1, 1))];
    execute_task_init(&mut bindings, &mut env).unwrap();

    let versions = env.versions_of("m");
    assert_eq!(versions.len(), 1, "the existing list was kept");
    assert_eq!(versions[0].key, key);
    assert!(versions[0].fresh);
}

#[test]
fn data_transfer_takes_dimensions_from_the_config() {
    let mut env = ProgramEnvironment::new();
    let config =
        ArrayTransferConfig { source_item: "other.b".into(), dimensions: vec![Dimension::new(0, 31)] };
    let mut bindings = vec![(TaskInitInstruction::DataTransfer { config }, TaskItem::new("m", 1, 1))];
    execute_task_init(&mut bindings, &mut env).unwrap();

    assert_eq!(bindings[0].1.dimensions(), &[Dimension::new(0, 31)]);
}

#[test]
fn change_notify_stales_the_versions_the_task_skipped() {
    let mut env = ProgramEnvironment::new();
    let mut bindings = vec![(TaskInitInstruction::CreateFresh, TaskItem::new("m", 1, 1))];
    execute_task_init(&mut bindings, &mut env).unwrap();
    // another consumer registered its own copy while the task ran
    env.register_parts_list("m");
    let updated = bindings[0].1.source_key();

    TaskEndInstruction::ChangeNotify.execute(&bindings[0].1, &mut env);

    for version in env.versions_of("m") {
        assert_eq!(version.fresh, Some(version.key) == updated, "only the task's own version stays fresh");
    }
    assert!(env.has_stale_version("m"));
}
