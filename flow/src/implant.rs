//! Sync-stage implantation.
//!
//! The pass rewrites every composite stage so that each LPS transition
//! between adjacent non-sync children is explicit. Each composite swaps its
//! child list out and re-inserts the children one by one; before a child
//! whose space differs from the last non-sync child's, the connecting space
//! chain is walked pair by pair. Descending pairs open a checkpoint and
//! attach a placeholder entry sync; ascending pairs collect the access logs
//! of the stretch spent inside the space, populate the pending entry sync,
//! and append reappearance, exit, and return syncs. A pair that is neither
//! ascending nor descending has no representable transition and aborts the
//! task.
//!
//! Stage indices stamped during re-insertion number only non-sync stages in
//! one shared flat list; checkpoint bounds and access-log ranges refer to it.
//! A final pass restamps the tree's positional indices.

use tessel_space::{SpaceId, TaskSpaces};
use tracing::{debug, trace};

use crate::access::AccessMap;
use crate::checkpoint::CheckpointRegistry;
use crate::error::{DisjointTransitionSnafu, Result};
use crate::stage::{FlowTree, StageId};
use crate::sync;

/// Run implantation over the whole flow and restamp positional indices.
pub fn implant_sync_stages(tree: &mut FlowTree, spaces: &TaskSpaces) -> Result<()> {
    debug!(stages = tree.len(), "implanting sync stages");
    let mut implanter = Implanter { spaces, checkpoints: CheckpointRegistry::new(), flat: Vec::new() };
    implanter.implant_composite(tree, tree.root(), None)?;
    tree.reindex();
    Ok(())
}

struct Implanter<'a> {
    spaces: &'a TaskSpaces,
    checkpoints: CheckpointRegistry,
    /// Non-sync stages in re-insertion order; access-log ranges index this.
    flat: Vec<StageId>,
}

impl Implanter<'_> {
    /// Re-insert one non-composite child into `container`, preceded by
    /// whatever sync stages its transition needs.
    fn implant_leaf(&mut self, tree: &mut FlowTree, stage: StageId, container: StageId) -> Result<()> {
        self.add_sync_stages_before(tree, container, stage)?;
        tree.set_index(stage, self.flat.len());
        self.flat.push(stage);
        tree.add_child_at_end(container, stage);
        Ok(())
    }

    fn implant_composite(&mut self, tree: &mut FlowTree, stage: StageId, container: Option<StageId>) -> Result<()> {
        let old_children = tree.swap_children(stage, Vec::new());

        match container {
            // the composite itself re-inserts into its parent first
            Some(container) => self.implant_leaf(tree, stage, container)?,
            // terminal case: the root starts the flat list
            None => {
                tree.set_index(stage, self.flat.len());
                self.flat.push(stage);
            }
        }

        for child in old_children {
            if tree.is_composite(child) {
                self.implant_composite(tree, child, Some(stage))?;
            } else {
                self.implant_leaf(tree, child, stage)?;
            }
        }

        self.add_sync_stages_on_return(tree, stage)
    }

    /// The transition work before `next_stage` joins `container`'s list.
    fn add_sync_stages_before(&mut self, tree: &mut FlowTree, container: StageId, next_stage: StageId) -> Result<()> {
        let previous_space = tree.last_non_sync_stage_space(container);
        let next_space = tree.space(next_stage);
        let Some(chain) = self.spaces.connecting_space_sequence(previous_space, next_space) else {
            return Ok(());
        };
        trace!(
            from = self.spaces.space(previous_space).name(),
            to = self.spaces.space(next_space).name(),
            "space transition"
        );

        let next_stage_index = self.flat.len();
        for pair in chain.windows(2) {
            let (old_space, new_space) = (pair[0], pair[1]);
            if self.spaces.is_ancestor(new_space, old_space) {
                self.close_space(tree, container, old_space, new_space, next_stage_index - 1)?;
            } else if self.spaces.is_ancestor(old_space, new_space) {
                self.open_space(tree, container, new_space, next_stage_index);
            } else if old_space != new_space {
                return DisjointTransitionSnafu {
                    old_space: self.spaces.space(old_space).name(),
                    new_space: self.spaces.space(new_space).name(),
                }
                .fail();
            }
        }
        Ok(())
    }

    /// After the last child is back in, the flow still has to come home to
    /// the composite's own space; run the ascending logic once more.
    fn add_sync_stages_on_return(&mut self, tree: &mut FlowTree, stage: StageId) -> Result<()> {
        let previous_space = tree.last_non_sync_stage_space(stage);
        let current_space = tree.space(stage);
        let Some(chain) = self.spaces.connecting_space_sequence(previous_space, current_space) else {
            return Ok(());
        };
        let Some(last_stage) = tree.last_non_sync_stage(stage) else {
            return Ok(());
        };
        let last_index = tree.index(last_stage);

        for pair in chain.windows(2) {
            let (old_space, new_space) = (pair[0], pair[1]);
            if self.spaces.is_ancestor(new_space, old_space) {
                self.close_space(tree, stage, old_space, new_space, last_index)?;
            } else if old_space != new_space && !self.spaces.is_ancestor(old_space, new_space) {
                return DisjointTransitionSnafu {
                    old_space: self.spaces.space(old_space).name(),
                    new_space: self.spaces.space(new_space).name(),
                }
                .fail();
            }
        }
        Ok(())
    }

    /// Descent into `new_space`: open a checkpoint at the index the next
    /// stage will take and attach a placeholder entry sync. A space already
    /// open (repeat re-entry) keeps its original checkpoint.
    fn open_space(&mut self, tree: &mut FlowTree, container: StageId, new_space: SpaceId, at_index: usize) {
        if !self.checkpoints.add_if_absent(new_space, at_index) {
            return;
        }
        let entry_sync = sync::generate_entry_sync_stage(tree, new_space);
        self.checkpoints.set_entry_sync(new_space, Some(entry_sync));
        tree.add_child_at_end(container, entry_sync);
    }

    /// Ascent out of `old_space` into `new_space`: populate the pending
    /// entry sync from the logs of `[checkpoint, end_index]`, then append
    /// reappearance, exit, and return syncs as the logs demand.
    fn close_space(
        &mut self,
        tree: &mut FlowTree,
        container: StageId,
        old_space: SpaceId,
        new_space: SpaceId,
        end_index: usize,
    ) -> Result<()> {
        let checkpoint = self
            .checkpoints
            .get(old_space)
            .expect("ascending from a space that was never entered");
        let logs = self.access_logs_in_index_limit(tree, old_space, checkpoint.stage_index, end_index);

        if let Some(entry_sync) = checkpoint.entry_sync {
            sync::populate_entry_sync_access_map(tree, entry_sync, &logs);
        }
        if let Some(reappearance) = sync::generate_reappearance_sync_stage(tree, self.spaces, old_space, &logs) {
            tree.add_child_at_end(container, reappearance);
        }

        self.checkpoints.remove(old_space);
        for exit_sync in sync::generate_exit_sync_stages(tree, self.spaces, old_space, &logs) {
            tree.add_child_at_end(container, exit_sync);
        }

        let return_logs = self.access_logs_for_return(tree, new_space, end_index);
        if let Some(return_sync) =
            sync::generate_return_sync_stage(tree, self.spaces, new_space, old_space, &return_logs)
        {
            tree.add_child_at_end(container, return_sync);
        }
        Ok(())
    }

    /// Accesses made from `space` (itself included) over the flat-list range
    /// `[start, end]`.
    fn access_logs_in_index_limit(&self, tree: &FlowTree, space: SpaceId, start: usize, end: usize) -> AccessMap {
        let mut logs = AccessMap::new();
        if start > end {
            return logs;
        }
        for &stage in &self.flat[start..=end.min(self.flat.len() - 1)] {
            tree.populate_access_map_for_space_limit(stage, &mut logs, self.spaces, space, true);
        }
        logs
    }

    /// Accesses made strictly below `space` from the start of the flow up to
    /// `end`; what the re-entered space may need to refresh.
    fn access_logs_for_return(&self, tree: &FlowTree, space: SpaceId, end: usize) -> AccessMap {
        let mut logs = AccessMap::new();
        for &stage in &self.flat[..=end.min(self.flat.len() - 1)] {
            tree.populate_access_map_for_space_limit(stage, &mut logs, self.spaces, space, false);
        }
        logs
    }
}
