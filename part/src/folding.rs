//! Range-compressed views of container subtrees.
//!
//! A fold describes, for one segment, which part coordinates the segment
//! holds. Consecutive sibling subtrees with identical content are coalesced
//! into a single fold carrying an id range, which keeps the description of
//! regular partitions linear in the number of distinct shapes rather than the
//! number of parts.

use std::fmt::Write as _;

/// Inclusive range of container ids covered by one fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub min: usize,
    pub max: usize,
}

impl IdRange {
    pub fn single(id: usize) -> Self {
        Self { min: id, max: id }
    }

    pub fn len(&self) -> usize {
        self.max - self.min + 1
    }
}

/// One node of a folded view: a contiguous id range at a fixed
/// `(dim_no, level)` coordinate plus the folds of the levels below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartFolding {
    id_range: IdRange,
    dim_no: usize,
    level: i32,
    descendants: Vec<PartFolding>,
}

impl PartFolding {
    pub fn new(id: usize, dim_no: usize, level: i32) -> Self {
        Self { id_range: IdRange::single(id), dim_no, level, descendants: Vec::new() }
    }

    pub fn id_range(&self) -> IdRange {
        self.id_range
    }

    pub fn dim_no(&self) -> usize {
        self.dim_no
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn descendants(&self) -> &[PartFolding] {
        &self.descendants
    }

    pub fn add_descendant(&mut self, descendant: PartFolding) {
        self.descendants.push(descendant);
    }

    pub(crate) fn descendants_mut(&mut self) -> &mut Vec<PartFolding> {
        &mut self.descendants
    }

    /// Extend the id range to absorb the next sibling id. Callers guarantee
    /// `id == id_range.max + 1` and content equality.
    pub fn coalesce(&mut self, id: usize) {
        debug_assert_eq!(id, self.id_range.max + 1);
        self.id_range.max = id;
    }

    /// Two folds are content-equal when their descendant lists match exactly;
    /// their own id ranges may differ. This is the coalescing criterion.
    pub fn is_equal_in_content(&self, other: &PartFolding) -> bool {
        self.descendants == other.descendants
    }

    /// Total number of leaf-level coordinates the fold covers.
    pub fn leaf_span(&self) -> usize {
        let below: usize = self.descendants.iter().map(PartFolding::leaf_span).sum();
        self.id_range.len() * below.max(1)
    }

    /// Compact single-line rendering, e.g. `[0-3]@0.1{[2]@0.2}`.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out);
        out
    }

    fn describe_into(&self, out: &mut String) {
        if self.id_range.min == self.id_range.max {
            let _ = write!(out, "[{}]", self.id_range.min);
        } else {
            let _ = write!(out, "[{}-{}]", self.id_range.min, self.id_range.max);
        }
        let _ = write!(out, "@{}.{}", self.dim_no, self.level);
        if !self.descendants.is_empty() {
            out.push('{');
            for (i, descendant) in self.descendants.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                descendant.describe_into(out);
            }
            out.push('}');
        }
    }
}

/// Append `fold` to `siblings`, coalescing it into the previous sibling when
/// the ids are exactly contiguous and the content matches.
pub(crate) fn append_coalescing(siblings: &mut Vec<PartFolding>, fold: PartFolding) {
    match siblings.last_mut() {
        Some(previous)
            if previous.id_range.max + 1 == fold.id_range.min && previous.is_equal_in_content(&fold) =>
        {
            previous.id_range.max = fold.id_range.max;
        }
        _ => siblings.push(fold),
    }
}
