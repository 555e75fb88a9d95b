//! Error types for runtime data management.

use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// An environment file could not be opened or read.
    #[snafu(display("cannot read environment file {path}: {source}"))]
    EnvFile { path: String, source: std::io::Error },

    /// The leading dimension header of an environment file is malformed.
    #[snafu(display("malformed dimension header: {reason}"))]
    BadDimensionHeader { reason: String },
}
