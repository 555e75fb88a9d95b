//! The flow-stage arena.
//!
//! Stages are arena-allocated in a [`FlowTree`]; a [`StageId`] is a stable
//! typed index, parents are ids, and composite stages own their children as
//! ordered id lists. The class hierarchy of the source representation
//! flattens into [`StageKind`]: a leaf compute stage, a composite holder (in
//! one of its five flavors), or a sync stage inserted by implantation.
//!
//! Stages carry three positional indices stamped by [`FlowTree::reindex`]:
//! the stage's own preorder `index`, the `group_no` of its containing
//! composite, and the `repeat_index` of the closest enclosing repeat block.
//! Dependency and access analyses reason in terms of these.

use tessel_space::{SpaceId, TaskSpaces};
use tracing::trace;

use crate::access::{AccessMap, VariableAccess};
use crate::error::{Diagnostics, SourceLocation};
use crate::sync::SyncType;

/// Stable index of a stage inside its [`FlowTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(usize);

impl StageId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Iteration discipline of a repeat control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatCycleType {
    /// Iterate a range expression.
    RangeBound,
    /// Iterate while a condition holds.
    ConditionBound,
    /// Traverse the sub-partitions of the enclosing space.
    SubpartitionTraversal,
}

/// An opaque front-end condition expression, kept verbatim for emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition(pub String);

impl Condition {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

/// The flavor of a composite stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositeVariant {
    Plain,
    /// A sub-flow iterated under a repeat instruction.
    Repeat { cycle: RepeatCycleType, condition: Condition },
    /// A sub-flow executed only when the condition holds.
    Conditional { condition: Condition },
    /// A descent from `ancestor` into the composite's own space.
    LpsTransition { ancestor: SpaceId },
    /// A sub-flow after which every multi-version structure used inside must
    /// advance its epoch.
    EpochBoundary,
}

#[derive(Debug, Clone)]
pub enum StageKind {
    /// Invocation of a compute stage from the task's stages section. The
    /// declared accesses come from the front end and are validated against
    /// the executing space by data-access checking.
    Instantiation { name: String, declared: Vec<VariableAccess> },
    Composite { variant: CompositeVariant, children: Vec<StageId> },
    Sync { sync_type: SyncType },
}

#[derive(Debug)]
struct FlowStage {
    space: SpaceId,
    parent: Option<StageId>,
    index: usize,
    group_no: Option<usize>,
    repeat_index: Option<usize>,
    location: Option<SourceLocation>,
    access_map: AccessMap,
    kind: StageKind,
}

/// The computation flow of one task: an arena of stages under a root
/// composite.
#[derive(Debug)]
pub struct FlowTree {
    stages: Vec<FlowStage>,
    root: StageId,
}

impl FlowTree {
    /// Create a flow with an empty plain composite at `space` as its root.
    pub fn new(space: SpaceId) -> Self {
        let root = FlowStage {
            space,
            parent: None,
            index: 0,
            group_no: None,
            repeat_index: None,
            location: None,
            access_map: AccessMap::new(),
            kind: StageKind::Composite { variant: CompositeVariant::Plain, children: Vec::new() },
        };
        Self { stages: vec![root], root: StageId(0) }
    }

    pub fn root(&self) -> StageId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    fn stage(&self, id: StageId) -> &FlowStage {
        &self.stages[id.0]
    }

    fn stage_mut(&mut self, id: StageId) -> &mut FlowStage {
        &mut self.stages[id.0]
    }

    fn push(&mut self, stage: FlowStage) -> StageId {
        let id = StageId(self.stages.len());
        self.stages.push(stage);
        id
    }

    // Construction ----------------------------------------------------------

    /// Append a leaf compute stage to `parent`.
    pub fn add_instantiation(
        &mut self,
        parent: StageId,
        space: SpaceId,
        name: impl Into<String>,
        declared: Vec<VariableAccess>,
    ) -> StageId {
        let id = self.push(FlowStage {
            space,
            parent: Some(parent),
            index: 0,
            group_no: None,
            repeat_index: None,
            location: None,
            access_map: AccessMap::new(),
            kind: StageKind::Instantiation { name: name.into(), declared },
        });
        self.add_child_at_end(parent, id);
        id
    }

    /// Append an empty composite of the given flavor to `parent`.
    pub fn add_composite(&mut self, parent: StageId, space: SpaceId, variant: CompositeVariant) -> StageId {
        let id = self.push(FlowStage {
            space,
            parent: Some(parent),
            index: 0,
            group_no: None,
            repeat_index: None,
            location: None,
            access_map: AccessMap::new(),
            kind: StageKind::Composite { variant, children: Vec::new() },
        });
        self.add_child_at_end(parent, id);
        id
    }

    /// Create a detached sync stage; implantation splices it into a child
    /// list itself.
    pub fn new_sync_stage(&mut self, space: SpaceId, sync_type: SyncType, accesses: AccessMap) -> StageId {
        self.push(FlowStage {
            space,
            parent: None,
            index: 0,
            group_no: None,
            repeat_index: None,
            location: None,
            access_map: accesses,
            kind: StageKind::Sync { sync_type },
        })
    }

    // Accessors -------------------------------------------------------------

    pub fn space(&self, id: StageId) -> SpaceId {
        self.stage(id).space
    }

    pub fn parent(&self, id: StageId) -> Option<StageId> {
        self.stage(id).parent
    }

    pub fn kind(&self, id: StageId) -> &StageKind {
        &self.stage(id).kind
    }

    pub fn access_map(&self, id: StageId) -> &AccessMap {
        &self.stage(id).access_map
    }

    pub fn replace_access_map(&mut self, id: StageId, map: AccessMap) {
        self.stage_mut(id).access_map = map;
    }

    pub fn index(&self, id: StageId) -> usize {
        self.stage(id).index
    }

    pub fn set_index(&mut self, id: StageId, index: usize) {
        self.stage_mut(id).index = index;
    }

    pub fn group_no(&self, id: StageId) -> Option<usize> {
        self.stage(id).group_no
    }

    pub fn repeat_index(&self, id: StageId) -> Option<usize> {
        self.stage(id).repeat_index
    }

    pub fn location(&self, id: StageId) -> Option<SourceLocation> {
        self.stage(id).location
    }

    pub fn assign_location(&mut self, id: StageId, location: SourceLocation) {
        self.stage_mut(id).location = Some(location);
    }

    pub fn is_sync(&self, id: StageId) -> bool {
        matches!(self.stage(id).kind, StageKind::Sync { .. })
    }

    pub fn is_composite(&self, id: StageId) -> bool {
        matches!(self.stage(id).kind, StageKind::Composite { .. })
    }

    pub fn sync_type(&self, id: StageId) -> Option<SyncType> {
        match &self.stage(id).kind {
            StageKind::Sync { sync_type } => Some(*sync_type),
            _ => None,
        }
    }

    pub fn children(&self, id: StageId) -> &[StageId] {
        match &self.stage(id).kind {
            StageKind::Composite { children, .. } => children,
            _ => &[],
        }
    }

    pub fn composite_variant(&self, id: StageId) -> Option<&CompositeVariant> {
        match &self.stage(id).kind {
            StageKind::Composite { variant, .. } => Some(variant),
            _ => None,
        }
    }

    pub fn is_repeat(&self, id: StageId) -> bool {
        matches!(self.composite_variant(id), Some(CompositeVariant::Repeat { .. }))
    }

    /// Name of a leaf compute stage.
    pub fn stage_name(&self, id: StageId) -> Option<&str> {
        match &self.stage(id).kind {
            StageKind::Instantiation { name, .. } => Some(name),
            _ => None,
        }
    }

    // Composite surgery -----------------------------------------------------

    fn children_mut(&mut self, id: StageId) -> &mut Vec<StageId> {
        match &mut self.stage_mut(id).kind {
            StageKind::Composite { children, .. } => children,
            _ => panic!("stage {id:?} is not a composite"),
        }
    }

    pub fn add_child_at_beginning(&mut self, composite: StageId, child: StageId) {
        self.children_mut(composite).insert(0, child);
        self.stage_mut(child).parent = Some(composite);
    }

    pub fn add_child_at_end(&mut self, composite: StageId, child: StageId) {
        self.children_mut(composite).push(child);
        self.stage_mut(child).parent = Some(composite);
    }

    pub fn insert_child_at(&mut self, composite: StageId, at: usize, child: StageId) {
        self.children_mut(composite).insert(at, child);
        self.stage_mut(child).parent = Some(composite);
    }

    pub fn remove_child_at(&mut self, composite: StageId, at: usize) -> StageId {
        self.children_mut(composite).remove(at)
    }

    /// Swap the child list wholesale, reparenting the new children, and hand
    /// back the old list. Implantation rebuilds lists through this.
    pub fn swap_children(&mut self, composite: StageId, new_children: Vec<StageId>) -> Vec<StageId> {
        let old = std::mem::replace(self.children_mut(composite), new_children);
        let adopted: Vec<StageId> = self.children(composite).to_vec();
        for child in adopted {
            self.stage_mut(child).parent = Some(composite);
        }
        old
    }

    /// Last child that is not a sync stage, if any.
    pub fn last_non_sync_stage(&self, composite: StageId) -> Option<StageId> {
        self.children(composite).iter().rev().copied().find(|&c| !self.is_sync(c))
    }

    /// Space of the last non-sync child, falling back to the composite's own
    /// space while the list is empty.
    pub fn last_non_sync_stage_space(&self, composite: StageId) -> SpaceId {
        self.last_non_sync_stage(composite).map_or(self.space(composite), |c| self.space(c))
    }

    // Analysis --------------------------------------------------------------

    /// Validate the declared accesses of every compute stage against the
    /// space it executes in and build the per-stage access maps. Violations
    /// are counted in `diagnostics`; analysis continues past them.
    pub fn perform_data_access_checking(&mut self, spaces: &TaskSpaces, diagnostics: &mut Diagnostics) {
        self.check_stage_accesses(self.root, spaces, diagnostics);
    }

    fn check_stage_accesses(&mut self, at: StageId, spaces: &TaskSpaces, diagnostics: &mut Diagnostics) {
        match &self.stage(at).kind {
            StageKind::Composite { children, .. } => {
                for child in children.clone() {
                    self.check_stage_accesses(child, spaces, diagnostics);
                }
            }
            StageKind::Instantiation { name, declared } => {
                let name = name.clone();
                let declared = declared.clone();
                let space_id = self.stage(at).space;
                let space = spaces.space(space_id);
                let location = self.stage(at).location;
                let mut map = AccessMap::new();
                for access in &declared {
                    match space.local_structure(&access.name) {
                        Some(structure) => {
                            if access.epoch_dependent && !structure.is_epoch_dependent() {
                                diagnostics.error(
                                    location,
                                    format!(
                                        "stage {name} reads an earlier epoch of single-version variable {}",
                                        access.name
                                    ),
                                );
                            }
                            map.record(access);
                        }
                        None => diagnostics.error(
                            location,
                            format!(
                                "stage {name} accesses {} which space {} does not use",
                                access.name,
                                space.name()
                            ),
                        ),
                    }
                }
                self.stage_mut(at).access_map = map;
            }
            StageKind::Sync { .. } => {}
        }
    }

    /// Accumulate into `map` the accesses of this stage and its descendants
    /// restricted to `lps`: stages executing in a descendant space always
    /// count, stages executing in `lps` itself only when `include_limiter`.
    pub fn populate_access_map_for_space_limit(
        &self,
        at: StageId,
        map: &mut AccessMap,
        spaces: &TaskSpaces,
        lps: SpaceId,
        include_limiter: bool,
    ) {
        match &self.stage(at).kind {
            StageKind::Composite { children, .. } => {
                for &child in children {
                    self.populate_access_map_for_space_limit(child, map, spaces, lps, include_limiter);
                }
            }
            StageKind::Instantiation { .. } | StageKind::Sync { .. } => {
                let space = self.stage(at).space;
                let inside = (include_limiter && space == lps) || spaces.is_ancestor(lps, space);
                if inside {
                    map.merge(&self.stage(at).access_map);
                }
            }
        }
    }

    /// Epoch-dependent variables accessed anywhere inside the subtree - the
    /// set an epoch-boundary crossing advances.
    pub fn epoch_dependent_variables_in(&self, at: StageId) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_epoch_dependent(at, &mut names);
        names
    }

    fn collect_epoch_dependent(&self, at: StageId, names: &mut Vec<String>) {
        for access in self.stage(at).access_map.epoch_dependent() {
            if !names.contains(&access.name) {
                names.push(access.name.clone());
            }
        }
        for &child in self.children(at) {
            self.collect_epoch_dependent(child, names);
        }
    }

    // Numbering -------------------------------------------------------------

    /// Restamp `index`, `group_no`, and `repeat_index` across the whole tree
    /// in preorder. Run after any pass that splices stages in or out.
    pub fn reindex(&mut self) {
        trace!("restamping positional indices");
        let mut counter = 0;
        self.reindex_rec(self.root, None, None, &mut counter);
    }

    fn reindex_rec(&mut self, at: StageId, group: Option<usize>, repeat: Option<usize>, counter: &mut usize) {
        let index = *counter;
        *counter += 1;
        {
            let stage = self.stage_mut(at);
            stage.index = index;
            stage.group_no = group;
            stage.repeat_index = repeat;
        }
        let repeat = if self.is_repeat(at) { Some(index) } else { repeat };
        for child in self.children(at).to_vec() {
            self.reindex_rec(child, Some(index), repeat, counter);
        }
    }
}
