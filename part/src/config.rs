//! Compiled partition configurations.
//!
//! A structure's declarative [`DimPartitionSpec`]s are compiled against the
//! task's partition-argument vector into one [`DimPartitionConfig`] per
//! dimension, and the per-dimension configs together form the structure's
//! [`DataPartitionConfig`]. The compiled form answers the two questions the
//! generated navigation code keeps asking: how many parts a dimension splits
//! into for a given PPU count, and which index range part `p` covers.

use snafu::ensure;
use tessel_space::{DataStructure, DimPartitionSpec, PartitionFnKind};

use crate::error::{
    MissingFnArgumentSnafu, MissingPartitionArgSnafu, NonPositivePartitionArgSnafu, Result, TooManyDimSpecsSnafu,
};

/// An inclusive index range of one dimension of a data structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub min: i64,
    pub max: i64,
}

impl Dimension {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// The range `[0, length)`.
    pub fn whole(length: usize) -> Self {
        Self { min: 0, max: length as i64 - 1 }
    }

    pub fn length(&self) -> usize {
        (self.max - self.min + 1).max(0) as usize
    }
}

/// Compiled partitioning of a single dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimPartitionConfig {
    kind: PartitionFnKind,
    /// Resolved block size or block count; strided distribution needs none.
    arg: Option<i64>,
    front_padding: usize,
    back_padding: usize,
}

impl DimPartitionConfig {
    /// Resolve a spec against the task's partition arguments.
    pub fn compile(spec: &DimPartitionSpec, partition_args: &[i64]) -> Result<Self> {
        let arg = match spec.kind {
            PartitionFnKind::Stride => None,
            PartitionFnKind::Block | PartitionFnKind::BlockCount | PartitionFnKind::BlockStride => {
                let index = *spec
                    .partition_arg_indexes
                    .first()
                    .ok_or_else(|| MissingFnArgumentSnafu { kind: spec.kind }.build())?;
                ensure!(
                    index < partition_args.len(),
                    MissingPartitionArgSnafu { index, available: partition_args.len() }
                );
                let value = partition_args[index];
                ensure!(value > 0, NonPositivePartitionArgSnafu { index, value });
                Some(value)
            }
        };
        Ok(Self { kind: spec.kind, arg, front_padding: spec.front_padding, back_padding: spec.back_padding })
    }

    pub fn kind(&self) -> PartitionFnKind {
        self.kind
    }

    pub fn has_overlap(&self) -> bool {
        self.front_padding + self.back_padding > 0
    }

    /// Number of parts the dimension splits into. Strided functions divide
    /// among the PPUs of the executing space, so they take the PPU count.
    pub fn parts_count(&self, dim: Dimension, ppu_count: usize) -> usize {
        let len = dim.length();
        if len == 0 {
            return 0;
        }
        match self.kind {
            PartitionFnKind::Block => len.div_ceil(self.arg.expect("compiled with an argument") as usize),
            PartitionFnKind::BlockCount => len.min(self.arg.expect("compiled with an argument") as usize),
            PartitionFnKind::Stride => ppu_count.min(len).max(1),
            PartitionFnKind::BlockStride => {
                let blocks = len.div_ceil(self.arg.expect("compiled with an argument") as usize);
                ppu_count.min(blocks).max(1)
            }
        }
    }

    /// The core index range of part `part_id` out of `parts_count`, paddings
    /// excluded. Strided parts are not contiguous in the parent; their range
    /// describes the part's storage extent after index transformation.
    pub fn part_dimension(&self, dim: Dimension, part_id: usize, parts_count: usize) -> Dimension {
        debug_assert!(part_id < parts_count);
        let len = dim.length();
        match self.kind {
            PartitionFnKind::Block => {
                let size = self.arg.expect("compiled with an argument");
                let min = dim.min + part_id as i64 * size;
                Dimension::new(min, (min + size - 1).min(dim.max))
            }
            PartitionFnKind::BlockCount => {
                let size = (len / parts_count) as i64;
                let min = dim.min + part_id as i64 * size;
                // the last part absorbs the division remainder
                let max = if part_id + 1 == parts_count { dim.max } else { min + size - 1 };
                Dimension::new(min, max)
            }
            PartitionFnKind::Stride => {
                let share = len / parts_count + usize::from(part_id < len % parts_count);
                Dimension::new(dim.min, dim.min + share as i64 - 1)
            }
            PartitionFnKind::BlockStride => {
                let size = self.arg.expect("compiled with an argument") as usize;
                let blocks = len.div_ceil(size);
                let owned = blocks / parts_count + usize::from(part_id < blocks % parts_count);
                let mut elements = owned * size;
                // the trailing block may be short; charge its owner
                if blocks > 0 && (blocks - 1) % parts_count == part_id {
                    elements -= blocks * size - len;
                }
                Dimension::new(dim.min, dim.min + elements as i64 - 1)
            }
        }
    }

    /// Like [`Self::part_dimension`] but widened by the ghost-region
    /// paddings, clamped to the parent range.
    pub fn padded_part_dimension(&self, dim: Dimension, part_id: usize, parts_count: usize) -> Dimension {
        let core = self.part_dimension(dim, part_id, parts_count);
        Dimension::new(
            (core.min - self.front_padding as i64).max(dim.min),
            (core.max + self.back_padding as i64).min(dim.max),
        )
    }
}

/// Compiled partition configuration of a whole data structure: one optional
/// per-dimension config, `None` for dimensions left unpartitioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPartitionConfig {
    dims: Vec<Option<DimPartitionConfig>>,
}

impl DataPartitionConfig {
    /// Assemble a config directly from per-dimension pieces, as the runtime
    /// part holders do when dimension configs arrive one by one.
    pub fn from_dims(dims: Vec<Option<DimPartitionConfig>>) -> Self {
        Self { dims }
    }

    pub fn compile(structure: &DataStructure, partition_args: &[i64]) -> Result<Self> {
        let specs = structure.dim_specs();
        ensure!(
            specs.len() <= structure.dimensions(),
            TooManyDimSpecsSnafu { declared: specs.len(), dimensions: structure.dimensions() }
        );
        let mut dims = Vec::with_capacity(structure.dimensions());
        for spec in specs {
            dims.push(Some(DimPartitionConfig::compile(spec, partition_args)?));
        }
        dims.resize(structure.dimensions(), None);
        Ok(Self { dims })
    }

    pub fn dim(&self, dim_no: usize) -> Option<&DimPartitionConfig> {
        self.dims.get(dim_no).and_then(Option::as_ref)
    }

    pub fn dimensions(&self) -> usize {
        self.dims.len()
    }

    pub fn is_partitioned(&self) -> bool {
        self.dims.iter().any(Option::is_some)
    }

    pub fn has_overlap(&self) -> bool {
        self.dims.iter().flatten().any(DimPartitionConfig::has_overlap)
    }

    /// Per-dimension part counts; unpartitioned dimensions count one part.
    pub fn parts_counts(&self, dims: &[Dimension], ppu_count: usize) -> Vec<usize> {
        self.dims
            .iter()
            .zip(dims)
            .map(|(config, dim)| config.map_or(1, |c| c.parts_count(*dim, ppu_count)))
            .collect()
    }

    /// Index ranges of one part given the parent's ranges and the counts
    /// computed by [`Self::parts_counts`].
    pub fn part_dimensions(&self, parent: &[Dimension], part_id: &[usize], counts: &[usize]) -> Vec<Dimension> {
        self.dims
            .iter()
            .zip(parent)
            .zip(part_id.iter().zip(counts))
            .map(|((config, dim), (&id, &count))| config.map_or(*dim, |c| c.part_dimension(*dim, id, count)))
            .collect()
    }
}
