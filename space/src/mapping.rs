//! The LPS-to-PPS mapping tree.
//!
//! Each node binds one LPS to the PPS its LPUs execute on; children follow
//! the LPS hierarchy. Code generation walks the tree breadth first, the way
//! the thread-state and LPU-count routines are laid out.

use std::collections::VecDeque;

use crate::space::SpaceId;

/// A node of the mapping tree.
#[derive(Debug, Clone)]
pub struct MappingNode {
    pub lps: SpaceId,
    /// Id of the PPS the LPS is mapped to.
    pub pps: usize,
    pub children: Vec<MappingNode>,
}

impl MappingNode {
    pub fn new(lps: SpaceId, pps: usize) -> Self {
        Self { lps, pps, children: Vec::new() }
    }

    pub fn add_child(&mut self, child: MappingNode) -> &mut MappingNode {
        self.children.push(child);
        self.children.last_mut().expect("just pushed")
    }

    /// Breadth-first traversal starting at this node.
    pub fn bfs(&self) -> impl Iterator<Item = &MappingNode> {
        let mut queue = VecDeque::from([self]);
        std::iter::from_fn(move || {
            let node = queue.pop_front()?;
            queue.extend(node.children.iter());
            Some(node)
        })
    }

    /// Breadth-first traversal yielding `(node, parent)` pairs; the parent of
    /// this node itself is `None`.
    pub fn bfs_with_parent(&self) -> impl Iterator<Item = (&MappingNode, Option<&MappingNode>)> {
        let mut queue = VecDeque::from([(self, None)]);
        std::iter::from_fn(move || {
            let (node, parent) = queue.pop_front()?;
            queue.extend(node.children.iter().map(|c| (c, Some(node))));
            Some((node, parent))
        })
    }

    pub fn find(&self, lps: SpaceId) -> Option<&MappingNode> {
        self.bfs().find(|n| n.lps == lps)
    }

    /// PPS id the given LPS is mapped to, if it appears in the tree.
    pub fn pps_for(&self, lps: SpaceId) -> Option<usize> {
        self.find(lps).map(|n| n.pps)
    }

    /// Lowest PPS id any LPS of the tree is mapped to.
    pub fn lowest_mapped_pps(&self) -> usize {
        self.bfs().map(|n| n.pps).min().expect("tree has at least the root node")
    }
}
