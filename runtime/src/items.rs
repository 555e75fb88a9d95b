//! Per-LPS data holders with epoch versioning.
//!
//! As an LPU is scheduled, these holders hand out the right data part for the
//! LPU's id, at the requested epoch version. Scalars keep the same versioning
//! surface through a circular buffer of boxed values.

use std::any::Any;

use indexmap::IndexMap;
use tessel_part::{DataPartitionConfig, DimPartitionConfig, Dimension};
use tessel_space::SpaceId;

/// One part of a data structure held by this PPU.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPart {
    lpu_id: Vec<usize>,
    dimensions: Vec<Dimension>,
    data: Vec<u8>,
}

impl DataPart {
    pub fn new(lpu_id: Vec<usize>, dimensions: Vec<Dimension>, element_size: usize) -> Self {
        let elements: usize = dimensions.iter().map(Dimension::length).product();
        Self { lpu_id, dimensions, data: vec![0; elements * element_size] }
    }

    pub fn lpu_id(&self) -> &[usize] {
        &self.lpu_id
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Epoch-versioned list of the parts of one structure in one LPS.
///
/// Versions form a ring: advancing the epoch makes the oldest buffer the new
/// current one. Content is recycled, not cleared; the next computation step
/// overwrites it.
#[derive(Debug, Default)]
pub struct DataPartsList {
    epochs: Vec<Vec<DataPart>>,
    epoch_head: usize,
}

impl DataPartsList {
    pub fn new(epoch_count: usize, parts: Vec<DataPart>) -> Self {
        let epoch_count = epoch_count.max(1);
        Self { epochs: vec![parts; epoch_count], epoch_head: 0 }
    }

    pub fn epoch_count(&self) -> usize {
        self.epochs.len()
    }

    /// Parts of the current epoch.
    pub fn parts(&self) -> &[DataPart] {
        &self.epochs[self.epoch_head]
    }

    pub fn parts_mut(&mut self) -> &mut [DataPart] {
        &mut self.epochs[self.epoch_head]
    }

    /// Parts of an earlier epoch, `back` steps behind the head.
    pub fn parts_at(&self, back: usize) -> &[DataPart] {
        let count = self.epochs.len();
        &self.epochs[(self.epoch_head + count - back % count) % count]
    }

    pub fn advance_epoch(&mut self) {
        self.epoch_head = (self.epoch_head + 1) % self.epochs.len();
    }
}

/// Configuration and content of one data structure of one LPS.
#[derive(Debug, Default)]
pub struct DataItems {
    name: String,
    dimensionality: usize,
    dim_configs: Vec<Option<DimPartitionConfig>>,
    partition_config: Option<DataPartitionConfig>,
    parts: Option<DataPartsList>,
    epoch_count: usize,
    ready: bool,
}

impl DataItems {
    pub fn new(name: impl Into<String>, dimensionality: usize, epoch_count: usize) -> Self {
        Self {
            name: name.into(),
            dimensionality,
            dim_configs: vec![None; dimensionality],
            partition_config: None,
            parts: None,
            epoch_count: epoch_count.max(1),
            ready: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    pub fn epoch_count(&self) -> usize {
        self.epoch_count
    }

    pub fn add_dim_partition_config(&mut self, dimension: usize, config: DimPartitionConfig) {
        self.dim_configs[dimension] = Some(config);
    }

    /// Assemble the per-dimension configs into the structure's compiled
    /// partition config.
    pub fn generate_partition_config(&mut self) {
        self.partition_config = Some(DataPartitionConfig::from_dims(self.dim_configs.clone()));
    }

    pub fn partition_config(&self) -> Option<&DataPartitionConfig> {
        self.partition_config.as_ref()
    }

    pub fn set_parts_list(&mut self, parts: DataPartsList) {
        self.parts = Some(parts);
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Most up-to-date version of the part for `lpu_id`.
    pub fn data_part(&self, lpu_id: &[usize]) -> Option<&DataPart> {
        self.parts.as_ref()?.parts().iter().find(|p| p.lpu_id() == lpu_id)
    }

    /// An older epoch version of the part for `lpu_id`.
    pub fn data_part_at(&self, lpu_id: &[usize], epochs_back: usize) -> Option<&DataPart> {
        self.parts.as_ref()?.parts_at(epochs_back).iter().find(|p| p.lpu_id() == lpu_id)
    }

    pub fn all_data_parts(&self) -> &[DataPart] {
        self.parts.as_ref().map_or(&[], DataPartsList::parts)
    }

    pub fn advance_epoch(&mut self) {
        if let Some(parts) = &mut self.parts {
            parts.advance_epoch();
        }
    }
}

/// Dimensionless variant of [`DataItems`]: a circular buffer of boxed scalar
/// versions sharing the epoch surface.
#[derive(Default)]
pub struct ScalarDataItems {
    name: String,
    versions: Vec<Box<dyn Any>>,
    epoch_head: usize,
    ready: bool,
}

impl std::fmt::Debug for ScalarDataItems {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarDataItems")
            .field("name", &self.name)
            .field("versions", &self.versions.len())
            .field("epoch_head", &self.epoch_head)
            .finish()
    }
}

impl ScalarDataItems {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), versions: Vec::new(), epoch_head: 0, ready: false }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allocate `epoch_count` versions seeded with `zero`.
    pub fn allocate<T: Clone + 'static>(&mut self, epoch_count: usize, zero: T) {
        self.versions = (0..epoch_count.max(1)).map(|_| Box::new(zero.clone()) as Box<dyn Any>).collect();
        self.epoch_head = 0;
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Latest version of the scalar.
    pub fn value<T: 'static>(&self) -> Option<&T> {
        self.versions.get(self.epoch_head)?.downcast_ref()
    }

    pub fn value_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.versions.get_mut(self.epoch_head)?.downcast_mut()
    }

    /// A version `back` epochs behind the head.
    pub fn value_at<T: 'static>(&self, back: usize) -> Option<&T> {
        let count = self.versions.len();
        self.versions.get((self.epoch_head + count - back % count) % count)?.downcast_ref()
    }

    pub fn advance_epoch(&mut self) {
        if !self.versions.is_empty() {
            self.epoch_head = (self.epoch_head + 1) % self.versions.len();
        }
    }
}

/// All variables of one LPS handled by this PPU.
#[derive(Debug, Default)]
pub struct LpsContent {
    items: IndexMap<String, DataItems>,
    scalars: IndexMap<String, ScalarDataItems>,
}

impl LpsContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_data_items(&mut self, items: DataItems) {
        self.items.insert(items.name().to_owned(), items);
    }

    pub fn add_scalar(&mut self, scalar: ScalarDataItems) {
        self.scalars.insert(scalar.name().to_owned(), scalar);
    }

    pub fn data_items(&self, name: &str) -> Option<&DataItems> {
        self.items.get(name)
    }

    pub fn data_items_mut(&mut self, name: &str) -> Option<&mut DataItems> {
        self.items.get_mut(name)
    }

    pub fn scalar(&self, name: &str) -> Option<&ScalarDataItems> {
        self.scalars.get(name)
    }

    pub fn scalar_mut(&mut self, name: &str) -> Option<&mut ScalarDataItems> {
        self.scalars.get_mut(name)
    }

    /// Advance the epoch of one variable if this LPS holds it.
    pub fn advance_item_epoch(&mut self, name: &str) {
        if let Some(items) = self.items.get_mut(name) {
            items.advance_epoch();
        }
        if let Some(scalar) = self.scalars.get_mut(name) {
            scalar.advance_epoch();
        }
    }
}

/// The data content of a whole task on this PPU, one [`LpsContent`] per LPS.
#[derive(Debug, Default)]
pub struct TaskData {
    contents: IndexMap<SpaceId, LpsContent>,
}

impl TaskData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lps_content(&mut self, lps: SpaceId, content: LpsContent) {
        self.contents.insert(lps, content);
    }

    pub fn lps_content(&self, lps: SpaceId) -> Option<&LpsContent> {
        self.contents.get(&lps)
    }

    pub fn lps_content_mut(&mut self, lps: SpaceId) -> Option<&mut LpsContent> {
        self.contents.get_mut(&lps)
    }

    /// Epoch-boundary crossing: advance every listed variable in every LPS
    /// that holds it.
    pub fn advance_epochs(&mut self, variables: &[String]) {
        for content in self.contents.values_mut() {
            for name in variables {
                content.advance_item_epoch(name);
            }
        }
    }
}
