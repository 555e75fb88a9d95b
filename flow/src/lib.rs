//! Computation-flow intermediate representation.
//!
//! The compute section of a task lowers into a tree of flow stages: leaf
//! compute stages, composite holders, repeat and conditional blocks, LPS
//! transitions, and epoch boundaries. Static analysis then rewrites every
//! composite stage so that each LPS transition between adjacent children is
//! explicit as a run of sync stages - the barriers, ghost-region
//! reconciliations, and entry/exit/return points the generated program
//! synchronizes on.
//!
//! # Module Organization
//!
//! - [`access`] - per-variable access records and ordered access maps
//! - [`stage`] - the flow-stage arena (`FlowTree`) and composite surgery
//! - [`checkpoint`] - the per-run space-entry checkpoint registry
//! - [`sync`] - sync-stage kinds and their generation rules
//! - [`implant`] - the sync-stage implantation pass

pub mod access;
pub mod checkpoint;
pub mod error;
pub mod implant;
pub mod stage;
pub mod sync;

#[cfg(test)]
pub mod test;

pub use access::{AccessMap, VariableAccess};
pub use checkpoint::{CheckpointRegistry, SpaceEntryCheckpoint};
pub use error::{Diagnostics, Error, Result, SourceLocation};
pub use implant::implant_sync_stages;
pub use stage::{CompositeVariant, Condition, FlowTree, RepeatCycleType, StageId, StageKind};
pub use sync::SyncType;
