//! Error and diagnostic types for flow analysis.

use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Two adjacent flow stages sit in spaces that are neither equal nor
    /// ancestor-related; no sync-stage sequence can represent the transition.
    #[snafu(display("disjoint space transition between {old_space} and {new_space}"))]
    DisjointTransition { old_space: String, new_space: String },
}

/// A position in the task's source text, carried for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Accumulator for recoverable semantic errors.
///
/// Structural problems (undeclared symbols, locality violations) are reported
/// and counted but do not stop the traversal; emission is skipped when the
/// count is non-zero at the end of analysis.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, location: Option<SourceLocation>, message: impl std::fmt::Display) {
        match location {
            Some(at) => tracing::warn!(%at, "{message}"),
            None => tracing::warn!("{message}"),
        }
        self.errors += 1;
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}
