//! Data-part indexing for segmented execution.
//!
//! Every data structure of a task is cut into parts along the LPS hierarchy,
//! and each segment of the distributed runtime holds some subset of those
//! parts. This crate indexes the parts: a hierarchical container tree keyed by
//! multi-level LPS coordinates and segment tags, range-compressed folded views
//! of that tree, and the compiled per-dimension partition configurations the
//! parts were cut with.
//!
//! # Module Organization
//!
//! - [`search`] - binary-search primitives over the sorted key vectors used
//!   throughout the tree
//! - [`tracker`] - the container tree (`ContainerTree`): insertion, lookup,
//!   per-segment listing, hybrid leaf/intermediate nodes
//! - [`folding`] - `PartFolding`, the range-compressed view of a subtree for
//!   one segment
//! - [`config`] - `DimPartitionConfig` / `DataPartitionConfig`, the compiled
//!   partition math behind each structure's get-part routine

pub mod config;
pub mod error;
pub mod folding;
pub mod search;
pub mod tracker;

#[cfg(test)]
pub mod test;

pub use config::{DataPartitionConfig, DimPartitionConfig, Dimension};
pub use error::{Error, Result};
pub use folding::{IdRange, PartFolding};
pub use search::{locate_key, locate_point_of_insert};
pub use tracker::{ContainerId, ContainerTree, LpsDimConfig, SegmentTag};
