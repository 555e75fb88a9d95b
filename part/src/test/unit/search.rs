use test_case::test_case;

use crate::search::{locate_key, locate_point_of_insert};

#[test_case(&[], 5 => None ; "empty")]
#[test_case(&[1, 3, 5, 9], 5 => Some(2) ; "present")]
#[test_case(&[1, 3, 5, 9], 4 => None ; "absent inside")]
#[test_case(&[1, 3, 5, 9], 0 => None ; "below range")]
#[test_case(&[1, 3, 5, 9], 10 => None ; "above range")]
fn locating_keys(values: &[i32], key: i32) -> Option<usize> {
    locate_key(values, &key)
}

#[test_case(&[], 5 => 0 ; "empty")]
#[test_case(&[1, 3, 5, 9], 0 => 0 ; "before all")]
#[test_case(&[1, 3, 5, 9], 4 => 2 ; "between")]
#[test_case(&[1, 3, 5, 9], 5 => 2 ; "at existing")]
#[test_case(&[1, 3, 5, 9], 10 => 4 ; "after all")]
fn insertion_points(values: &[i32], key: i32) -> usize {
    locate_point_of_insert(values, &key)
}

#[test]
fn insertion_through_the_point_keeps_order() {
    let mut values = vec![2, 4, 8];
    for key in [5, 1, 9, 4] {
        if locate_key(&values, &key).is_none() {
            let at = locate_point_of_insert(&values, &key);
            values.insert(at, key);
        }
    }
    assert_eq!(values, vec![1, 2, 4, 5, 8, 9]);
}
