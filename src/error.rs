//! Crate-wide error type.

use thiserror::Error;

/// Errors that can abort a compilation or a downstream driver step.
#[derive(Debug, Error)]
pub enum CompileError {
    /// A term of infinite (or otherwise unencodable) sort was reached without being
    /// abstracted away first.
    #[error("unsupported sort {sort}{}", theory.as_ref().map(|t| format!(" ({t})")).unwrap_or_default())]
    UnsupportedSort {
        /// A description of the offending sort.
        sort: String,
        /// Its theory interpretation, if any.
        theory: Option<String>,
    },

    /// The model checker's witness did not follow the expected four-column format.
    #[error("malformed witness: {reason}")]
    MalformedWitness {
        /// What was wrong with it.
        reason: String,
    },

    /// The external `aigtoaig` converter or model checker binary was missing or exited
    /// with a non-zero status.
    #[error("external tool `{tool}` failed: {reason}")]
    ExternalToolFailure {
        /// Name of the tool that failed.
        tool: String,
        /// What went wrong.
        reason: String,
    },

    /// A definition referenced a symbol with neither encoded bits nor a pending
    /// definition. Indicates an internal bug in the abstractor or driver.
    #[error("definition dependency error: symbol `{symbol}` has no bits and no pending definition")]
    DefinitionDependency {
        /// The offending symbol's name.
        symbol: String,
    },

    /// Wraps an I/O failure reading or writing a module, AIGER, or witness file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
