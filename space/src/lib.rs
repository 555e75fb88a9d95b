//! Logical and physical processing space model.
//!
//! A task partitions its data over a hierarchy of logical processing spaces
//! (LPSes). Each LPS is divided into logical processing units (LPUs) that are
//! mapped, through a mapping tree, onto the physical processing spaces (PPSes)
//! of the target machine described by a PCubeS model.
//!
//! # Module Organization
//!
//! - [`space`] - the LPS hierarchy (`TaskSpaces` arena, ancestor walks,
//!   transition chains between spaces)
//! - [`structure`] - data structures local to a space and their per-dimension
//!   partition descriptors
//! - [`pcubes`] - the machine model (`PpsDefinition`, `PcubesModel`)
//! - [`mapping`] - the LPS-to-PPS mapping tree consumed by code generation

pub mod error;
pub mod mapping;
pub mod pcubes;
pub mod space;
pub mod structure;

#[cfg(test)]
pub mod test;

pub use error::{Error, Result};
pub use mapping::MappingNode;
pub use pcubes::{PcubesModel, PpsDefinition};
pub use space::{Space, SpaceId, TaskSpaces};
pub use structure::{DataStructure, DimPartitionSpec, PartitionFnKind};
