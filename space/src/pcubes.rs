//! The PCubeS machine model.
//!
//! A machine description is an ordered list of PPS definitions from the
//! topmost space (whole machine) down to the hardware leaves. Ids run from
//! the PPS count down to 1, so a smaller id is closer to the leaves and
//! `defs[count - id]` addresses a definition by id. Exactly one PPS is the
//! core space, the level thread affinity is managed against.

use snafu::ensure;

use crate::error::{EmptyPpsSnafu, MultipleCoreSpacesSnafu, NoCoreSpaceSnafu, NonContiguousPpsIdsSnafu, Result};

/// One level of the physical machine hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpsDefinition {
    pub id: usize,
    /// How many units of this PPS each unit of the parent PPS holds.
    pub units: usize,
    pub core_space: bool,
}

impl PpsDefinition {
    pub fn new(id: usize, units: usize) -> Self {
        Self { id, units, core_space: false }
    }

    pub fn core(id: usize, units: usize) -> Self {
        Self { id, units, core_space: true }
    }
}

/// Validated, top-to-bottom list of PPS definitions.
#[derive(Debug, Clone)]
pub struct PcubesModel {
    defs: Vec<PpsDefinition>,
}

impl PcubesModel {
    pub fn new(defs: Vec<PpsDefinition>) -> Result<Self> {
        let count = defs.len();
        for (position, def) in defs.iter().enumerate() {
            let expected = count - position;
            ensure!(
                def.id == expected,
                NonContiguousPpsIdsSnafu { position, expected, found: def.id }
            );
            ensure!(def.units > 0, EmptyPpsSnafu { id: def.id });
        }
        let cores = defs.iter().filter(|d| d.core_space).count();
        ensure!(cores > 0, NoCoreSpaceSnafu);
        ensure!(cores == 1, MultipleCoreSpacesSnafu { count: cores });
        Ok(Self { defs })
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PpsDefinition> {
        self.defs.iter()
    }

    /// Id of the topmost PPS (equal to the PPS count).
    pub fn topmost_id(&self) -> usize {
        self.defs.len()
    }

    pub fn by_id(&self, id: usize) -> &PpsDefinition {
        &self.defs[self.defs.len() - id]
    }

    pub fn core_space_id(&self) -> usize {
        self.defs.iter().find(|d| d.core_space).map(|d| d.id).expect("validated at construction")
    }

    /// Product of unit counts over the PPS ids in `low..=high`, clamped to
    /// the ids the model actually has. An empty range yields 1.
    pub fn units_product(&self, low: usize, high: usize) -> usize {
        let high = high.min(self.topmost_id());
        let low = low.max(1);
        (low..=high).map(|id| self.by_id(id).units).product()
    }
}
