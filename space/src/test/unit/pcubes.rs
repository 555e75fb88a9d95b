use test_case::test_case;

use crate::error::Error;
use crate::pcubes::{PcubesModel, PpsDefinition};

fn three_level_model() -> PcubesModel {
    PcubesModel::new(vec![
        PpsDefinition::new(3, 2),
        PpsDefinition::new(2, 4),
        PpsDefinition::core(1, 2),
    ])
    .unwrap()
}

#[test]
fn by_id_addresses_from_the_bottom() {
    let model = three_level_model();
    assert_eq!(model.topmost_id(), 3);
    assert_eq!(model.by_id(3).units, 2);
    assert_eq!(model.by_id(2).units, 4);
    assert_eq!(model.by_id(1).units, 2);
}

#[test]
fn core_space_id_is_found() {
    assert_eq!(three_level_model().core_space_id(), 1);
}

#[test_case(1, 3 => 16 ; "whole machine")]
#[test_case(1, 2 => 8 ; "below the top")]
#[test_case(2, 2 => 4 ; "single level")]
#[test_case(2, 1 => 1 ; "empty range")]
#[test_case(1, 9 => 16 ; "range clamped to the model")]
fn units_product(low: usize, high: usize) -> usize {
    three_level_model().units_product(low, high)
}

#[test]
fn missing_core_space_is_rejected() {
    let err = PcubesModel::new(vec![PpsDefinition::new(2, 2), PpsDefinition::new(1, 4)]).unwrap_err();
    assert!(matches!(err, Error::NoCoreSpace));
}

#[test]
fn duplicate_core_space_is_rejected() {
    let err = PcubesModel::new(vec![PpsDefinition::core(2, 2), PpsDefinition::core(1, 4)]).unwrap_err();
    assert!(matches!(err, Error::MultipleCoreSpaces { count: 2 }));
}

#[test]
fn ids_must_run_contiguously_downward() {
    let err = PcubesModel::new(vec![PpsDefinition::new(3, 2), PpsDefinition::core(1, 4)]).unwrap_err();
    assert!(matches!(err, Error::NonContiguousPpsIds { position: 1, expected: 2, found: 1 }));
}
