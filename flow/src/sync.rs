//! Sync-stage kinds and generation rules.
//!
//! Implantation asks four questions at every space transition, each answered
//! by one generator here: what must be staged in on entry (populated late, at
//! the matching exit), what must be reconciled because overlapping partitions
//! were written (reappearance), what updates must be published on exit, and
//! what the re-entered space must refresh (return).

use tessel_space::{SpaceId, TaskSpaces};
use tracing::debug;

use crate::access::AccessMap;
use crate::stage::{FlowTree, StageId};

/// The role of a sync stage in its transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncType {
    /// Placeholder attached on descent; its access map is filled at exit.
    Entrance,
    /// Publishes one modified variable when the flow leaves its space.
    Exit,
    /// Refreshes the re-entered space's view of data modified below it.
    Return,
    /// Reconciles overlapping boundary regions written inside the space.
    Reappearance,
}

/// Attach a placeholder entry sync for a descent into `space`.
pub fn generate_entry_sync_stage(tree: &mut FlowTree, space: SpaceId) -> StageId {
    tree.new_sync_stage(space, SyncType::Entrance, AccessMap::new())
}

/// Fill an entry sync's access map with the logs collected between its
/// checkpoint and the exit. Happens exactly once per entry sync.
pub fn populate_entry_sync_access_map(tree: &mut FlowTree, entry_sync: StageId, logs: &AccessMap) {
    debug_assert!(tree.access_map(entry_sync).is_empty(), "entry sync populated twice");
    let mut map = AccessMap::new();
    map.merge(logs);
    tree.replace_access_map(entry_sync, map);
}

/// A reappearance sync on `space` when any logged variable with overlapping
/// partition boundaries was modified inside it.
pub fn generate_reappearance_sync_stage(
    tree: &mut FlowTree,
    spaces: &TaskSpaces,
    space: SpaceId,
    logs: &AccessMap,
) -> Option<StageId> {
    let overlapping: AccessMap = logs
        .modified()
        .filter(|access| {
            spaces
                .space(space)
                .local_structure(&access.name)
                .is_some_and(|s| s.has_overlapping_partitions())
        })
        .cloned()
        .collect();
    if overlapping.is_empty() {
        return None;
    }
    debug!(space = spaces.space(space).name(), vars = overlapping.len(), "ghost-region sync needed");
    Some(tree.new_sync_stage(space, SyncType::Reappearance, overlapping))
}

/// Exit syncs for a space being left: one per modified variable the space
/// uses, in log order.
pub fn generate_exit_sync_stages(
    tree: &mut FlowTree,
    spaces: &TaskSpaces,
    space: SpaceId,
    logs: &AccessMap,
) -> Vec<StageId> {
    let exiting: Vec<AccessMap> = logs
        .modified()
        .filter(|access| spaces.space(space).uses_structure(&access.name))
        .map(|access| std::iter::once(access.clone()).collect())
        .collect();
    exiting.into_iter().map(|map| tree.new_sync_stage(space, SyncType::Exit, map)).collect()
}

/// A return sync for the space being re-entered: descendant phases modified
/// variables it uses that the exit from `left_space` did not just publish
/// (the exited space does not use them itself).
pub fn generate_return_sync_stage(
    tree: &mut FlowTree,
    spaces: &TaskSpaces,
    space: SpaceId,
    left_space: SpaceId,
    logs: &AccessMap,
) -> Option<StageId> {
    let refreshed: AccessMap = logs
        .modified()
        .filter(|access| {
            spaces.space(space).uses_structure(&access.name)
                && !spaces.space(left_space).uses_structure(&access.name)
        })
        .cloned()
        .collect();
    if refreshed.is_empty() {
        return None;
    }
    Some(tree.new_sync_stage(space, SyncType::Return, refreshed))
}
