//! The LPS hierarchy.
//!
//! Spaces are arena-allocated in a [`TaskSpaces`] owned by the task under
//! compilation; a [`SpaceId`] is a stable typed index into that arena. Parent
//! links are ids, so upward walks (ancestor checks, transition chains) never
//! fight the borrow checker and the hierarchy stays a plain tree.

use indexmap::IndexMap;

use crate::error::{Result, UnknownSpaceSnafu};
use crate::structure::DataStructure;

/// Stable index of a space inside its [`TaskSpaces`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceId(usize);

impl SpaceId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A logical processing space.
///
/// Dimensionality zero means the space is unpartitioned: every data structure
/// it uses is replicated across its units. A sub-partition space re-divides
/// the LPUs of its parent and inherits the parent's id-assignment context.
#[derive(Debug, Clone)]
pub struct Space {
    name: String,
    dimensions: usize,
    parent: Option<SpaceId>,
    subpartition: bool,
    structures: IndexMap<String, DataStructure>,
}

impl Space {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn parent(&self) -> Option<SpaceId> {
        self.parent
    }

    pub fn is_subpartition(&self) -> bool {
        self.subpartition
    }

    pub fn is_partitioned(&self) -> bool {
        self.dimensions > 0
    }

    /// Register a data structure as locally used in this space.
    ///
    /// Re-registering a name replaces the previous usage record but keeps its
    /// position in the declaration order.
    pub fn add_structure(&mut self, structure: DataStructure) {
        self.structures.insert(structure.name().to_owned(), structure);
    }

    pub fn local_structure(&self, name: &str) -> Option<&DataStructure> {
        self.structures.get(name)
    }

    /// Names of locally used data structures, in declaration order.
    pub fn local_structure_names(&self) -> impl Iterator<Item = &str> {
        self.structures.keys().map(String::as_str)
    }

    pub fn local_structures(&self) -> impl Iterator<Item = &DataStructure> {
        self.structures.values()
    }

    pub fn uses_structure(&self, name: &str) -> bool {
        self.structures.contains_key(name)
    }
}

/// Arena of all spaces of one task, rooted at the unpartitioned root space.
#[derive(Debug, Clone)]
pub struct TaskSpaces {
    spaces: Vec<Space>,
    root: SpaceId,
}

impl TaskSpaces {
    /// Create the hierarchy with its root space. The root is unpartitioned
    /// and has no parent.
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = Space {
            name: root_name.into(),
            dimensions: 0,
            parent: None,
            subpartition: false,
            structures: IndexMap::new(),
        };
        Self { spaces: vec![root], root: SpaceId(0) }
    }

    pub fn root(&self) -> SpaceId {
        self.root
    }

    /// Add a space under `parent` and return its id.
    pub fn add_space(
        &mut self,
        name: impl Into<String>,
        dimensions: usize,
        parent: SpaceId,
        subpartition: bool,
    ) -> SpaceId {
        let id = SpaceId(self.spaces.len());
        self.spaces.push(Space {
            name: name.into(),
            dimensions,
            parent: Some(parent),
            subpartition,
            structures: IndexMap::new(),
        });
        id
    }

    pub fn space(&self, id: SpaceId) -> &Space {
        &self.spaces[id.0]
    }

    pub fn space_mut(&mut self, id: SpaceId) -> &mut Space {
        &mut self.spaces[id.0]
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SpaceId> {
        (0..self.spaces.len()).map(SpaceId)
    }

    pub fn find(&self, name: &str) -> Result<SpaceId> {
        self.spaces
            .iter()
            .position(|s| s.name == name)
            .map(SpaceId)
            .ok_or_else(|| UnknownSpaceSnafu { name }.build())
    }

    /// True when `ancestor` is a strict ancestor of `descendant`.
    pub fn is_ancestor(&self, ancestor: SpaceId, descendant: SpaceId) -> bool {
        let mut current = self.space(descendant).parent;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.space(id).parent;
        }
        false
    }

    /// The chain `[id, parent, .., root]`.
    pub fn path_to_root(&self, id: SpaceId) -> Vec<SpaceId> {
        let mut path = vec![id];
        let mut current = self.space(id).parent;
        while let Some(next) = current {
            path.push(next);
            current = self.space(next).parent;
        }
        path
    }

    /// The list of spaces on the path from `from` up to the lowest common
    /// ancestor and down to `to`, both endpoints included and the common
    /// ancestor appearing once.
    ///
    /// Returns `None` when `from == to`: no transition is needed.
    pub fn connecting_space_sequence(&self, from: SpaceId, to: SpaceId) -> Option<Vec<SpaceId>> {
        if from == to {
            return None;
        }
        let up_from = self.path_to_root(from);
        let up_to = self.path_to_root(to);
        // The first element of up_from that also appears in up_to is the LCA;
        // both chains end at the root so one always exists.
        let (asc_len, desc_len) = up_from
            .iter()
            .enumerate()
            .find_map(|(i, s)| up_to.iter().position(|t| t == s).map(|j| (i, j)))
            .expect("two spaces of one task always share the root");

        let mut sequence = up_from[..=asc_len].to_vec();
        sequence.extend(up_to[..desc_len].iter().rev());
        Some(sequence)
    }
}
