//! Binary-search primitives over sorted key vectors.
//!
//! The container tree keeps every key vector (segment tags, branch descendant
//! ids) sorted and unique; these two helpers are the only way entries are
//! located or placed, so order is preserved by construction.

/// Position of `key` in the non-decreasing slice `values`, if present.
pub fn locate_key<T: Ord>(values: &[T], key: &T) -> Option<usize> {
    values.binary_search(key).ok()
}

/// Lower-bound insertion point for `key` in the non-decreasing slice
/// `values`: the first position whose element is not less than `key`.
pub fn locate_point_of_insert<T: Ord>(values: &[T], key: &T) -> usize {
    values.partition_point(|v| v < key)
}
