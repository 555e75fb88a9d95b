//! Error types for partition configuration and the container tree.

use snafu::Snafu;
use tessel_space::PartitionFnKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A dimension spec references a partition argument the task does not have.
    #[snafu(display("partition argument {index} is out of range ({available} available)"))]
    MissingPartitionArg { index: usize, available: usize },

    /// A structure declared specs for more dimensions than it has.
    #[snafu(display("{declared} dimension specs declared for a {dimensions}-dimensional structure"))]
    TooManyDimSpecs { declared: usize, dimensions: usize },

    /// A partition argument resolved to a non-positive block size or count.
    #[snafu(display("partition argument {index} must be positive, got {value}"))]
    NonPositivePartitionArg { index: usize, value: i64 },

    /// A partition function that takes an argument was declared without one.
    #[snafu(display("partition function {kind:?} needs a partition argument"))]
    MissingFnArgument { kind: PartitionFnKind },
}
