//! Error types for the space model.

use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// No space with the given name exists in the task hierarchy.
    #[snafu(display("no space named {name} in the task hierarchy"))]
    UnknownSpace { name: String },

    /// The PCubeS description carries no core-space marker.
    #[snafu(display("PCubeS model has no PPS flagged as the core space"))]
    NoCoreSpace,

    /// More than one PPS claims to be the core space.
    #[snafu(display("PCubeS model flags {count} PPSes as the core space"))]
    MultipleCoreSpaces { count: usize },

    /// PPS ids must run contiguously from the PPS count down to 1.
    #[snafu(display("PPS at position {position} has id {found}, expected {expected}"))]
    NonContiguousPpsIds { position: usize, expected: usize, found: usize },

    /// A PPS declares zero units.
    #[snafu(display("PPS {id} declares zero units"))]
    EmptyPps { id: usize },
}
