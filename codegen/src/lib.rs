//! Code-generation planning for tessel tasks.
//!
//! This crate turns the analyzed task - LPS hierarchy, PCubeS model, mapping
//! tree, implanted computation flow - into the structural plans code emission
//! renders: per-thread navigation state (thread counts, PPU ids, LPU
//! construction), GPU execution contexts with their kernel groupings, and the
//! header/program output streams. Plans are plain data; rendering them into a
//! concrete host language is a separate backend concern.
//!
//! # Module Organization
//!
//! - [`thread_state`] - thread-count constants, PPU-id computation, parent
//!   index map, and LPU construction plans
//! - [`gpu`] - GPU execution contexts and kernel-group configurations
//! - [`emit`] - the header/program writer pair and shared-include copying

pub mod emit;
pub mod error;
pub mod gpu;
pub mod thread_state;

#[cfg(test)]
pub mod test;

pub use emit::TaskEmitter;
pub use error::{Error, Result};
pub use gpu::{GpuContextType, GpuExecutionContext, KernelConfig, KernelGroupConfig};
pub use thread_state::{
    LpuCountPlan, LpuFieldPlan, LpuFieldSource, NextLpuPlan, PartitionParameterConfig, PpuIds,
    RootArrayPlan, RootLpuPlan, ThreadCounts, ThreadIds, ThreadStatePlan, build_thread_state_plan,
    compute_thread_counts, lps_parent_index_map, ppu_ids_for_thread,
};
