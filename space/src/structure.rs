//! Data structures local to a space and their partition descriptors.
//!
//! A structure used in a partitioned space declares one [`DimPartitionSpec`]
//! per partitioned dimension; a structure with no specs is replicated and
//! shares the part descriptor of its source space unchanged. The spec list is
//! the declarative surface of the structure's `get-part` routine: code
//! generation reads the function kind and the partition-argument indexes and
//! wires the actual call.

use smallvec::SmallVec;

use crate::space::SpaceId;

/// Partition function applied along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionFnKind {
    /// Fixed-size blocks; the block size is a partition argument.
    Block,
    /// A fixed number of equal blocks; the count is a partition argument.
    BlockCount,
    /// Round-robin distribution of single elements.
    Stride,
    /// Round-robin distribution of fixed-size blocks.
    BlockStride,
}

/// Partitioning of a single dimension of a data structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimPartitionSpec {
    pub kind: PartitionFnKind,
    /// Indexes into the task's partition-argument vector consumed by the
    /// partition function, in declaration order.
    pub partition_arg_indexes: SmallVec<[usize; 2]>,
    /// Ghost-region paddings carried by each part on either side.
    pub front_padding: usize,
    pub back_padding: usize,
}

impl DimPartitionSpec {
    pub fn new(kind: PartitionFnKind) -> Self {
        Self { kind, partition_arg_indexes: SmallVec::new(), front_padding: 0, back_padding: 0 }
    }

    pub fn with_args(mut self, indexes: impl IntoIterator<Item = usize>) -> Self {
        self.partition_arg_indexes = indexes.into_iter().collect();
        self
    }

    pub fn with_padding(mut self, front: usize, back: usize) -> Self {
        self.front_padding = front;
        self.back_padding = back;
        self
    }

    /// Parts of this dimension share boundary regions with their neighbors.
    pub fn has_overlap(&self) -> bool {
        self.front_padding + self.back_padding > 0
    }
}

/// Usage record of a data structure within one space's symbol table.
///
/// The same logical variable appears in the tables of every space that uses
/// it. `space` names the space that owns this partition step; for a structure
/// a sub-partition space inherits unchanged, `space` still points at the
/// owning ancestor. `source_space` is the space holding the version this one
/// was derived from, forming a chain back to the root declaration.
#[derive(Debug, Clone)]
pub struct DataStructure {
    name: String,
    dimensions: usize,
    space: SpaceId,
    source_space: Option<SpaceId>,
    dim_specs: Vec<DimPartitionSpec>,
    versions: usize,
}

impl DataStructure {
    pub fn new(name: impl Into<String>, dimensions: usize, space: SpaceId) -> Self {
        Self { name: name.into(), dimensions, space, source_space: None, dim_specs: Vec::new(), versions: 1 }
    }

    pub fn with_source(mut self, source: SpaceId) -> Self {
        self.source_space = Some(source);
        self
    }

    pub fn with_dim_specs(mut self, specs: Vec<DimPartitionSpec>) -> Self {
        self.dim_specs = specs;
        self
    }

    /// Number of epoch versions retained for the structure. Values above one
    /// make the structure epoch dependent.
    pub fn with_versions(mut self, versions: usize) -> Self {
        self.versions = versions.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The space owning this partition step of the structure.
    pub fn space(&self) -> SpaceId {
        self.space
    }

    pub fn source_space(&self) -> Option<SpaceId> {
        self.source_space
    }

    pub fn dim_specs(&self) -> &[DimPartitionSpec] {
        &self.dim_specs
    }

    pub fn is_partitioned(&self) -> bool {
        !self.dim_specs.is_empty()
    }

    pub fn has_overlapping_partitions(&self) -> bool {
        self.dim_specs.iter().any(DimPartitionSpec::has_overlap)
    }

    pub fn versions(&self) -> usize {
        self.versions
    }

    pub fn is_epoch_dependent(&self) -> bool {
        self.versions > 1
    }
}
