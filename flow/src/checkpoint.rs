//! Space-entry checkpoints.
//!
//! While implantation re-inserts stages, every descent into a space not on
//! the current ancestor stack records where the flow entered it and which
//! placeholder entry sync was attached. The matching ascent pops the
//! checkpoint and uses the recorded index to bound its access-log scan. The
//! registry is scoped to one implantation run; nothing survives it.

use std::collections::HashMap;

use tessel_space::SpaceId;

use crate::stage::StageId;

/// Where the flow entered a space, and the entry sync waiting to be
/// populated on exit.
#[derive(Debug, Clone, Copy)]
pub struct SpaceEntryCheckpoint {
    pub stage_index: usize,
    pub entry_sync: Option<StageId>,
}

/// Per-implantation-run registry of open checkpoints, used in strict
/// push-on-descent / pop-on-ascent discipline.
#[derive(Debug, Default)]
pub struct CheckpointRegistry {
    open: HashMap<SpaceId, SpaceEntryCheckpoint>,
}

impl CheckpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a checkpoint for `space` at `stage_index` unless one is already
    /// open (a repeat re-entering the space keeps the original). Returns
    /// whether a new checkpoint was created.
    pub fn add_if_absent(&mut self, space: SpaceId, stage_index: usize) -> bool {
        if self.open.contains_key(&space) {
            return false;
        }
        self.open.insert(space, SpaceEntryCheckpoint { stage_index, entry_sync: None });
        true
    }

    pub fn get(&self, space: SpaceId) -> Option<SpaceEntryCheckpoint> {
        self.open.get(&space).copied()
    }

    pub fn set_entry_sync(&mut self, space: SpaceId, entry_sync: Option<StageId>) {
        if let Some(checkpoint) = self.open.get_mut(&space) {
            checkpoint.entry_sync = entry_sync;
        }
    }

    pub fn remove(&mut self, space: SpaceId) -> Option<SpaceEntryCheckpoint> {
        self.open.remove(&space)
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
