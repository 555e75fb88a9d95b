//! The part-container tree.
//!
//! One tree indexes every part of one data structure across all LPSes of a
//! task. The traversal order of the tree is fixed by the structure's dimension
//! order: one [`LpsDimConfig`] per (LPS, dimension) pair from the root down.
//! Each node records which segments hold parts below it, so per-segment
//! queries can short-circuit whole subtrees.
//!
//! Nodes are arena-allocated: a [`ContainerId`] is a stable index, parents are
//! ids, and branches own their descendants as id slots. A node is a `Leaf`, an
//! `Intermediate` with branches, or a `Hybrid` that is both at the same
//! coordinate - the hybrid case arises when one segment's path bottoms out
//! where another segment's path keeps descending. The tree is built once by
//! [`ContainerTree::insert_part`] and is read-only afterwards.

use smallvec::SmallVec;
use tessel_space::SpaceId;
use tracing::trace;

use crate::folding::{PartFolding, append_coalescing};
use crate::search::{locate_key, locate_point_of_insert};

/// Identifier of a segment of the distributed runtime.
pub type SegmentTag = usize;

/// One step of a container tree's traversal order: dimension `dim_no` of LPS
/// `lps`, sitting at `level` in the part-id path. `level == -1` denotes the
/// synthetic root above all real steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LpsDimConfig {
    pub lps: SpaceId,
    pub dim_no: usize,
    pub level: i32,
}

impl LpsDimConfig {
    pub const ROOT_LEVEL: i32 = -1;

    pub fn new(lps: SpaceId, dim_no: usize, level: i32) -> Self {
        Self { lps, dim_no, level }
    }

    pub fn is_root(&self) -> bool {
        self.level == Self::ROOT_LEVEL
    }
}

/// Stable index of a container inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(usize);

impl ContainerId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Branch of an intermediate container: all descendants created for one LPS,
/// as two parallel vectors sorted by descendant id.
#[derive(Debug)]
struct Branch {
    config: LpsDimConfig,
    descendant_ids: Vec<usize>,
    descendants: Vec<ContainerId>,
}

impl Branch {
    fn new(config: LpsDimConfig, first_id: usize, first: ContainerId) -> Self {
        Self { config, descendant_ids: vec![first_id], descendants: vec![first] }
    }

    fn entry(&self, id: usize) -> Option<ContainerId> {
        locate_key(&self.descendant_ids, &id).map(|at| self.descendants[at])
    }

    fn add_entry(&mut self, id: usize, container: ContainerId) {
        let at = locate_point_of_insert(&self.descendant_ids, &id);
        self.descendant_ids.insert(at, id);
        self.descendants.insert(at, container);
    }
}

#[derive(Debug)]
enum ContainerKind {
    Leaf,
    Intermediate { branches: Vec<Branch> },
    /// Both views at once: the branch set is exposed to the hierarchy, the
    /// leaf-side tag set is reached when a search bottoms out here. Every
    /// leaf-side tag also appears in the node's main tag set.
    Hybrid { branches: Vec<Branch>, leaf_tags: SmallVec<[SegmentTag; 4]> },
}

#[derive(Debug)]
struct ContainerNode {
    /// Coordinate value along `config.dim_no` at `config.level`.
    id: usize,
    config: LpsDimConfig,
    parent: Option<ContainerId>,
    /// Sorted unique segment tags. For branching nodes this is the union of
    /// the tags of all leaves underneath.
    tags: SmallVec<[SegmentTag; 4]>,
    kind: ContainerKind,
}

/// A fully-qualified part coordinate: one array of `data_dimensions` values
/// per LPS level along the root-to-leaf path.
pub type PartIdPath = [Vec<usize>];

/// The container tree of one data structure.
#[derive(Debug)]
pub struct ContainerTree {
    nodes: Vec<ContainerNode>,
    root: ContainerId,
}

impl ContainerTree {
    /// Create an empty tree. `root_lps` is only recorded on the synthetic
    /// root's config; the root sits at level -1 and never appears in folds.
    pub fn new(root_lps: SpaceId) -> Self {
        let root = ContainerNode {
            id: 0,
            config: LpsDimConfig::new(root_lps, 0, LpsDimConfig::ROOT_LEVEL),
            parent: None,
            tags: SmallVec::new(),
            kind: ContainerKind::Intermediate { branches: Vec::new() },
        };
        Self { nodes: vec![root], root: ContainerId(0) }
    }

    pub fn root(&self) -> ContainerId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn node(&self, id: ContainerId) -> &ContainerNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: ContainerId) -> &mut ContainerNode {
        &mut self.nodes[id.0]
    }

    pub fn container_id_value(&self, id: ContainerId) -> usize {
        self.node(id).id
    }

    pub fn config(&self, id: ContainerId) -> LpsDimConfig {
        self.node(id).config
    }

    pub fn parent(&self, id: ContainerId) -> Option<ContainerId> {
        self.node(id).parent
    }

    /// The node's main segment-tag set (the intermediate-side set for
    /// branching nodes).
    pub fn segment_tags(&self, id: ContainerId) -> &[SegmentTag] {
        &self.node(id).tags
    }

    /// The tag set a bottoming-out search sees: the leaf-side set for hybrid
    /// nodes, the main set otherwise.
    pub fn leaf_segment_tags(&self, id: ContainerId) -> &[SegmentTag] {
        match &self.node(id).kind {
            ContainerKind::Hybrid { leaf_tags, .. } => leaf_tags,
            _ => &self.node(id).tags,
        }
    }

    pub fn has_segment_tag(&self, id: ContainerId, tag: SegmentTag) -> bool {
        locate_key(&self.node(id).tags, &tag).is_some()
    }

    pub fn is_leaf(&self, id: ContainerId) -> bool {
        matches!(self.node(id).kind, ContainerKind::Leaf)
    }

    pub fn is_hybrid(&self, id: ContainerId) -> bool {
        matches!(self.node(id).kind, ContainerKind::Hybrid { .. })
    }

    pub fn is_branching(&self, id: ContainerId) -> bool {
        !self.is_leaf(id)
    }

    fn branches(&self, id: ContainerId) -> Option<&[Branch]> {
        match &self.node(id).kind {
            ContainerKind::Leaf => None,
            ContainerKind::Intermediate { branches } | ContainerKind::Hybrid { branches, .. } => Some(branches),
        }
    }

    /// Branch set of a node known to be branching. A leaf here means the
    /// construction-time guarantee (leaves only exist at the last position of
    /// the dimension order) was broken, which is a bug in the tree itself.
    fn branches_mut(&mut self, id: ContainerId) -> &mut Vec<Branch> {
        match &mut self.nodes[id.0].kind {
            ContainerKind::Leaf => {
                panic!("invariant breach: leaf container {id:?} reached at a non-terminal position")
            }
            ContainerKind::Intermediate { branches } | ContainerKind::Hybrid { branches, .. } => branches,
        }
    }

    fn branch_for(&self, id: ContainerId, lps: SpaceId) -> Option<&Branch> {
        self.branches(id)?.iter().find(|b| b.config.lps == lps)
    }

    fn add_main_tag(&mut self, id: ContainerId, tag: SegmentTag) {
        let tags = &mut self.node_mut(id).tags;
        if locate_key(tags, &tag).is_none() {
            let at = locate_point_of_insert(tags, &tag);
            tags.insert(at, tag);
        }
    }

    /// Record a tag on a hybrid or plain node: always on the main set, and on
    /// the leaf side too when the insertion bottoms out here.
    fn add_segment_tag(&mut self, id: ContainerId, tag: SegmentTag, leaf_level: bool) {
        if leaf_level && let ContainerKind::Hybrid { leaf_tags, .. } = &mut self.nodes[id.0].kind {
            if locate_key(leaf_tags, &tag).is_none() {
                let at = locate_point_of_insert(leaf_tags, &tag);
                leaf_tags.insert(at, tag);
            }
        }
        self.add_main_tag(id, tag);
    }

    /// Turn a leaf met at a non-terminal position into a hybrid. The
    /// intermediate half takes over all of the leaf's segment tags plus the
    /// tag of the descending insertion, so that tag-guided searches can still
    /// locate the leaf inside the hybrid; the leaf half keeps its tag set
    /// unchanged.
    fn convert_leaf(&mut self, id: ContainerId, branch_tag: SegmentTag) {
        let node = self.node_mut(id);
        let leaf_tags = node.tags.clone();
        node.kind = ContainerKind::Hybrid { branches: Vec::new(), leaf_tags };
        self.add_main_tag(id, branch_tag);
    }

    /// Turn an intermediate met at the terminal position into a hybrid: the
    /// existing branch set becomes the intermediate half and a fresh leaf
    /// side starts with just the terminating tag.
    fn convert_intermediate(&mut self, id: ContainerId, terminal_tag: SegmentTag) {
        let node = self.node_mut(id);
        let ContainerKind::Intermediate { branches } = std::mem::replace(&mut node.kind, ContainerKind::Leaf)
        else {
            unreachable!("convert_intermediate called on a non-intermediate container")
        };
        node.kind = ContainerKind::Hybrid { branches, leaf_tags: SmallVec::from_slice(&[terminal_tag]) };
        self.add_main_tag(id, terminal_tag);
    }

    /// Index a part into the tree, descending one dimension-order step at a
    /// time and tagging every traversed container with `tag`.
    pub fn insert_part(&mut self, dim_order: &[LpsDimConfig], tag: SegmentTag, part_id: &PartIdPath) {
        trace!(?tag, ?part_id, "inserting part");
        let mut current = self.root;
        for (position, dim_config) in dim_order.iter().enumerate() {
            let last = position + 1 == dim_order.len();
            let container_id = part_id[dim_config.level as usize][dim_config.dim_no];

            let existing = self.branch_for(current, dim_config.lps).and_then(|b| b.entry(container_id));
            let next = match existing {
                None => {
                    let kind = if last {
                        ContainerKind::Leaf
                    } else {
                        ContainerKind::Intermediate { branches: Vec::new() }
                    };
                    let next = ContainerId(self.nodes.len());
                    self.nodes.push(ContainerNode {
                        id: container_id,
                        config: *dim_config,
                        parent: Some(current),
                        tags: SmallVec::from_slice(&[tag]),
                        kind,
                    });
                    let branches = self.branches_mut(current);
                    match branches.iter_mut().find(|b| b.config.lps == dim_config.lps) {
                        Some(branch) => branch.add_entry(container_id, next),
                        None => branches.push(Branch::new(*dim_config, container_id, next)),
                    }
                    next
                }
                Some(next) => {
                    let is_leaf = self.is_leaf(next);
                    if self.is_hybrid(next) {
                        self.add_segment_tag(next, tag, last);
                    } else if !is_leaf && last {
                        self.convert_intermediate(next, tag);
                    } else if is_leaf && !last {
                        self.convert_leaf(next, tag);
                    } else {
                        self.add_main_tag(next, tag);
                    }
                    self.node_mut(next).parent = Some(current);
                    next
                }
            };
            current = next;
        }
    }

    /// Read-only mirror of [`Self::insert_part`]: resolve a part-id path to
    /// its container, or `None` when any step is missing.
    pub fn get_container(&self, path: &PartIdPath, dim_order: &[LpsDimConfig]) -> Option<ContainerId> {
        let mut current = self.root;
        for dim_config in dim_order {
            let container_id = path[dim_config.level as usize][dim_config.dim_no];
            current = self.branch_for(current, dim_config.lps)?.entry(container_id)?;
        }
        Some(current)
    }

    /// Every container of LPS `lps` holding parts of segment `tag`. The
    /// search descends through the levels of other LPSes until it reaches
    /// branches of the target LPS. A matched container that itself still
    /// branches for the same LPS is an inner dimension level of a
    /// multi-dimensional LPS, not a part holder, so the search recurses
    /// through it instead of accepting it.
    pub fn descendant_containers_for_lps(&self, lps: SpaceId, tag: SegmentTag) -> Vec<ContainerId> {
        let mut found = Vec::new();
        self.collect_for_lps(self.root, lps, tag, &mut found);
        found
    }

    fn collect_for_lps(&self, at: ContainerId, lps: SpaceId, tag: SegmentTag, found: &mut Vec<ContainerId>) {
        for branch in self.branches(at).into_iter().flatten() {
            let target_level = branch.config.lps == lps;
            for &descendant in &branch.descendants {
                // tag pruning is safe: an untagged node has no tagged leaves
                if !self.has_segment_tag(descendant, tag) {
                    continue;
                }
                if target_level && self.branch_for(descendant, lps).is_none() {
                    found.push(descendant);
                } else {
                    self.collect_for_lps(descendant, lps, tag, found);
                }
            }
        }
    }

    /// Fold the whole tree for one segment. The synthetic root is not
    /// materialized; the result is the list of top-level folds.
    pub fn fold_for_segment(&self, tag: SegmentTag, dim_order: &[LpsDimConfig]) -> Vec<PartFolding> {
        let mut folds = Vec::new();
        self.fold_branches(self.root, tag, &mut folds, dim_order, 0);
        folds
    }

    /// Fold the subtree under one container for a segment, or `None` when the
    /// container holds nothing of that segment. With `fold_back`, ancestors
    /// up to (but excluding) the root wrap the result so the fold carries its
    /// full coordinate context.
    pub fn fold_container_for_segment(
        &self,
        at: ContainerId,
        tag: SegmentTag,
        dim_order: &[LpsDimConfig],
        fold_back: bool,
    ) -> Option<PartFolding> {
        if !self.has_segment_tag(at, tag) {
            return None;
        }
        let node = self.node(at);
        if self.is_leaf(at) {
            return if fold_back {
                self.fold_back_container(at, None)
            } else {
                Some(PartFolding::new(node.id, node.config.dim_no, node.config.level))
            };
        }

        let position = dim_order
            .iter()
            .position(|c| *c == node.config)
            .expect("branching container's config appears in the dimension order");

        if position + 1 == dim_order.len() {
            // Bottomed out on a branching node: only the leaf side of a
            // hybrid holds a part here.
            if !self.leaf_segment_tags(at).contains(&tag) {
                return None;
            }
            return if fold_back {
                self.fold_back_container(at, None)
            } else {
                Some(PartFolding::new(node.id, node.config.dim_no, node.config.level))
            };
        }

        let mut folding = PartFolding::new(node.id, node.config.dim_no, node.config.level);
        self.fold_branches(at, tag, folding.descendants_mut(), dim_order, position + 1);
        if folding.descendants().is_empty() {
            return None;
        }
        match (fold_back, node.parent) {
            (true, Some(parent)) => self.fold_back_container_from(parent, folding),
            _ => Some(folding),
        }
    }

    fn fold_branches(
        &self,
        at: ContainerId,
        tag: SegmentTag,
        folds: &mut Vec<PartFolding>,
        dim_order: &[LpsDimConfig],
        position: usize,
    ) {
        let next_config = dim_order[position];
        let Some(branch) = self.branch_for(at, next_config.lps) else { return };
        // Branch descendants are id-sorted, so coalescing only ever needs to
        // look at the previously appended sibling.
        for &descendant in branch.descendants.iter() {
            if !self.has_segment_tag(descendant, tag) {
                continue;
            }
            if let Some(fold) = self.fold_container_for_segment(descendant, tag, dim_order, false) {
                append_coalescing(folds, fold);
            }
        }
    }

    /// Wrap `under` in a fold for this container and recurse upward, skipping
    /// the level -1 root.
    fn fold_back_container(&self, at: ContainerId, under: Option<PartFolding>) -> Option<PartFolding> {
        let node = self.node(at);
        if node.config.is_root() {
            return under;
        }
        let mut folding = PartFolding::new(node.id, node.config.dim_no, node.config.level);
        if let Some(under) = under {
            folding.add_descendant(under);
        }
        match node.parent {
            Some(parent) => self.fold_back_container(parent, Some(folding)),
            None => Some(folding),
        }
    }

    fn fold_back_container_from(&self, parent: ContainerId, folding: PartFolding) -> Option<PartFolding> {
        self.fold_back_container(parent, Some(folding))
    }

    /// Debug aid: assert the structural invariants of the tree. Panics on
    /// violation - a broken tree is a bug in the tree, not a user error.
    pub fn validate(&self) {
        for (index, node) in self.nodes.iter().enumerate() {
            let id = ContainerId(index);
            if let Some(branches) = self.branches(id) {
                for branch in branches {
                    assert_eq!(
                        branch.descendant_ids.len(),
                        branch.descendants.len(),
                        "branch id/descendant vectors desynced under container {index}"
                    );
                    assert!(
                        branch.descendant_ids.windows(2).all(|w| w[0] < w[1]),
                        "branch descendant ids not strictly sorted under container {index}"
                    );
                    for (&did, &descendant) in branch.descendant_ids.iter().zip(&branch.descendants) {
                        assert_eq!(did, self.node(descendant).id, "branch key mismatch under container {index}");
                        assert_eq!(
                            self.node(descendant).parent,
                            Some(id),
                            "descendant of container {index} has a foreign parent"
                        );
                    }
                }
            }
            if let ContainerKind::Hybrid { leaf_tags, .. } = &node.kind {
                for tag in leaf_tags {
                    assert!(
                        locate_key(&node.tags, tag).is_some(),
                        "hybrid leaf tag {tag} missing from the intermediate set of container {index}"
                    );
                }
            }
            for &tag in &node.tags {
                assert!(
                    self.some_leaf_carries(id, tag),
                    "tag {tag} on container {index} reaches no leaf"
                );
            }
        }
    }

    fn some_leaf_carries(&self, at: ContainerId, tag: SegmentTag) -> bool {
        if self.leaf_segment_tags(at).contains(&tag) && !matches!(self.node(at).kind, ContainerKind::Intermediate { .. })
        {
            return true;
        }
        self.branches(at)
            .into_iter()
            .flatten()
            .flat_map(|b| b.descendants.iter())
            .any(|&d| self.some_leaf_carries(d, tag))
    }

    /// Reconstruct the fully-qualified part-id path of a container by walking
    /// to the root, grouping coordinates per LPS.
    pub fn part_id_of(&self, at: ContainerId, data_dimensions: usize) -> Vec<Vec<usize>> {
        let mut path: Vec<Vec<usize>> = Vec::new();
        let mut current = Some(at);
        let mut array = vec![0; data_dimensions];
        let mut array_lps = self.node(at).config.lps;

        while let Some(id) = current {
            let node = self.node(id);
            if node.config.is_root() {
                break;
            }
            if node.config.lps != array_lps {
                path.insert(0, std::mem::replace(&mut array, vec![0; data_dimensions]));
                array_lps = node.config.lps;
            }
            array[node.config.dim_no] = node.id;
            current = node.parent;
        }
        path.insert(0, array);
        path
    }
}
