//! Task-boundary environment instructions.
//!
//! Before a task runs, each environmental data item it touches is prepared by
//! exactly one init instruction; at task end, change notifications propagate
//! what the task did back into the program environment. Instructions run in
//! four phases across the whole ordered set: dimensions first (nothing can be
//! partitioned without lengths), then environment preprocessing, then
//! parts-list setup, then environment postprocessing.

use std::io::BufRead;

use indexmap::IndexMap;
use snafu::ResultExt;
use tessel_part::Dimension;
use tracing::debug;

use crate::error::{BadDimensionHeaderSnafu, EnvFileSnafu, Result};

/// An environmental data item of one task.
#[derive(Debug, Clone)]
pub struct TaskItem {
    name: String,
    dimensions: Vec<Dimension>,
    epoch_count: usize,
    source_key: Option<u64>,
}

impl TaskItem {
    pub fn new(name: impl Into<String>, dimensionality: usize, epoch_count: usize) -> Self {
        Self {
            name: name.into(),
            dimensions: vec![Dimension::whole(0); dimensionality],
            epoch_count: epoch_count.max(1),
            source_key: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn set_dimensions(&mut self, dimensions: Vec<Dimension>) {
        self.dimensions = dimensions;
    }

    pub fn epoch_count(&self) -> usize {
        self.epoch_count
    }

    pub fn source_key(&self) -> Option<u64> {
        self.source_key
    }
}

/// Parse the leading dimension header of an environment file: a dimension
/// count followed by a `min max` pair per dimension, whitespace separated.
pub fn read_dimension_header<R: BufRead>(reader: &mut R) -> Result<Vec<Dimension>> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context(EnvFileSnafu { path: "<dimension header>" })?;
    let mut tokens = line.split_whitespace().map(str::parse::<i64>);

    let count = tokens
        .next()
        .and_then(|t| t.ok())
        .filter(|c| *c >= 0)
        .ok_or_else(|| BadDimensionHeaderSnafu { reason: "missing dimension count" }.build())?;
    let mut dimensions = Vec::with_capacity(count as usize);
    for d in 0..count {
        let (min, max) = match (tokens.next(), tokens.next()) {
            (Some(Ok(min)), Some(Ok(max))) => (min, max),
            _ => {
                return BadDimensionHeaderSnafu { reason: format!("dimension {d} lacks a min/max pair") }
                    .fail();
            }
        };
        dimensions.push(Dimension::new(min, max));
    }
    Ok(dimensions)
}

/// One parts-list version known to the program environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartsListVersion {
    pub key: u64,
    pub fresh: bool,
}

/// Program-wide bookkeeping of environmental items: data-source keys, the
/// parts-list versions alive per item, and their freshness.
#[derive(Debug, Default)]
pub struct ProgramEnvironment {
    next_key: u64,
    versions: IndexMap<String, Vec<PartsListVersion>>,
}

impl ProgramEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    fn assign_key(&mut self) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        key
    }

    /// Let go of every parts-list reference of an item; a newly created or
    /// transferred content invalidates all of them.
    pub fn remove_parts_list_references(&mut self, item: &str) {
        if let Some(versions) = self.versions.get_mut(item) {
            versions.clear();
        }
    }

    /// Register a new parts-list version for an item and return its key.
    pub fn register_parts_list(&mut self, item: &str) -> u64 {
        let key = self.assign_key();
        self.versions.entry(item.to_owned()).or_default().push(PartsListVersion { key, fresh: true });
        key
    }

    /// Flag every known version of an item as fresh again.
    pub fn record_fresh_versions(&mut self, item: &str) {
        for version in self.versions.entry(item.to_owned()).or_default() {
            version.fresh = true;
        }
    }

    /// Mark every version of an item except `updated_key` stale.
    pub fn mark_others_stale(&mut self, item: &str, updated_key: Option<u64>) {
        for version in self.versions.entry(item.to_owned()).or_default() {
            version.fresh = Some(version.key) == updated_key;
        }
    }

    pub fn versions_of(&self, item: &str) -> &[PartsListVersion] {
        self.versions.get(item).map_or(&[], Vec::as_slice)
    }

    pub fn has_stale_version(&self, item: &str) -> bool {
        self.versions_of(item).iter().any(|v| !v.fresh)
    }
}

/// Simplified source description of an `envA.a = envB.b` assignment.
#[derive(Debug, Clone)]
pub struct ArrayTransferConfig {
    pub source_item: String,
    pub dimensions: Vec<Dimension>,
}

/// Instruction preparing one environmental item at task start.
#[derive(Debug)]
pub enum TaskInitInstruction {
    /// Linked item with no explicit instruction: refresh it if any of its
    /// parts lists went stale.
    StaleRefresh,
    /// The task creates the item anew.
    CreateFresh,
    /// Item content comes from an environment file.
    ReadFromFile { path: String },
    /// Item content is assigned from another task's environment.
    DataTransfer { config: ArrayTransferConfig },
}

impl TaskInitInstruction {
    /// Stable type number, used by instruction retrieval in generated code.
    pub fn type_code(&self) -> u8 {
        match self {
            Self::StaleRefresh => 0,
            Self::CreateFresh => 1,
            Self::ReadFromFile { .. } => 2,
            Self::DataTransfer { .. } => 3,
        }
    }

    /// Establish the item's dimension lengths before anything can be
    /// partitioned. Created items got theirs from the task initializer;
    /// refreshed items keep theirs.
    pub fn setup_dimensions(&self, item: &mut TaskItem) -> Result<()> {
        match self {
            Self::StaleRefresh | Self::CreateFresh => Ok(()),
            Self::ReadFromFile { path } => {
                let file = std::fs::File::open(path).context(EnvFileSnafu { path })?;
                let mut reader = std::io::BufReader::new(file);
                item.set_dimensions(read_dimension_header(&mut reader)?);
                Ok(())
            }
            Self::DataTransfer { config } => {
                item.set_dimensions(config.dimensions.clone());
                Ok(())
            }
        }
    }

    /// Update or drop existing versions of the item before new content lands.
    pub fn preprocess_program_env(&self, item: &TaskItem, env: &mut ProgramEnvironment) {
        match self {
            Self::StaleRefresh => {}
            Self::CreateFresh | Self::ReadFromFile { .. } | Self::DataTransfer { .. } => {
                env.remove_parts_list_references(item.name());
            }
        }
    }

    /// Prepare the item's parts list once partition metadata is in place.
    pub fn setup_parts_list(&self, item: &mut TaskItem, env: &mut ProgramEnvironment) {
        match self {
            Self::StaleRefresh | Self::DataTransfer { .. } => {}
            Self::CreateFresh | Self::ReadFromFile { .. } => {
                let key = env.register_parts_list(item.name());
                item.source_key = Some(key);
                debug!(item = item.name(), key, "allocated parts list");
            }
        }
    }

    /// Make sure the environment reflects the new or refreshed parts lists.
    pub fn postprocess_program_env(&self, item: &mut TaskItem, env: &mut ProgramEnvironment) {
        match self {
            Self::StaleRefresh | Self::DataTransfer { .. } => env.record_fresh_versions(item.name()),
            Self::CreateFresh | Self::ReadFromFile { .. } => {
                // a created item starts its own version management
                if item.source_key.is_none() {
                    item.source_key = Some(env.register_parts_list(item.name()));
                }
                env.record_fresh_versions(item.name());
            }
        }
    }
}

/// Instruction applied when the task completes.
#[derive(Debug)]
pub enum TaskEndInstruction {
    /// Versions the task did not update go stale.
    ChangeNotify,
}

impl TaskEndInstruction {
    pub fn execute(&self, item: &TaskItem, env: &mut ProgramEnvironment) {
        match self {
            Self::ChangeNotify => env.mark_others_stale(item.name(), item.source_key()),
        }
    }
}

/// Run an ordered instruction set through its four phases.
pub fn execute_task_init(
    bindings: &mut [(TaskInitInstruction, TaskItem)],
    env: &mut ProgramEnvironment,
) -> Result<()> {
    for (instruction, item) in bindings.iter_mut() {
        instruction.setup_dimensions(item)?;
    }
    for (instruction, item) in bindings.iter() {
        instruction.preprocess_program_env(item, env);
    }
    for (instruction, item) in bindings.iter_mut() {
        instruction.setup_parts_list(item, env);
    }
    for (instruction, item) in bindings.iter_mut() {
        instruction.postprocess_program_env(item, env);
    }
    Ok(())
}
