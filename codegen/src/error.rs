//! Error types for code-generation planning.

use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// An output or include file could not be opened.
    #[snafu(display("unable to open {path}: {source}"))]
    OutputFile { path: String, source: std::io::Error },

    /// Writing to an output stream failed.
    #[snafu(display("write to {stream} stream failed: {source}"))]
    StreamWrite { stream: &'static str, source: std::io::Error },

    /// A GPU context references an LPS the mapping tree does not place.
    #[snafu(display("space {name} is not mapped to any PPS"))]
    UnmappedSpace { name: String },
}
