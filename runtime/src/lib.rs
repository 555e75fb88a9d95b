//! Runtime support for tessel task execution.
//!
//! The generated program keeps the data content of each PPU in per-LPS,
//! per-variable holders with epoch versioning, and moves data items across
//! task boundaries through an ordered set of environment instructions. This
//! crate hosts both: the part holders the scheduler consults when an LPU is
//! staged, and the program-environment bookkeeping (data-source keys, version
//! managers, fresh/stale marking) the instructions drive.

pub mod env;
pub mod error;
pub mod items;

#[cfg(test)]
pub mod test;

pub use env::{
    ArrayTransferConfig, PartsListVersion, ProgramEnvironment, TaskEndInstruction, TaskInitInstruction,
    TaskItem, execute_task_init, read_dimension_header,
};
pub use error::{Error, Result};
pub use items::{DataItems, DataPart, DataPartsList, LpsContent, ScalarDataItems, TaskData};
