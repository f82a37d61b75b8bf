//! Unified error types for the solclone workspace.
//!
//! Structural absence and unresolvable references never reach this type:
//! they are recovered where they are found. Only configuration problems,
//! graph defects and collaborator failures are surfaced.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum SolutionError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value or input document is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// The dependency lists of a set of templates form a cycle.
    #[error("cyclic dependency detected: {}", keys.join(" -> "))]
    CyclicDependency {
        /// Keys participating in (or leading to) the cycle.
        keys: Vec<String>,
    },

    /// The creation collaborator rejected an item; the run was aborted.
    #[error("failed to create item {key}: {message}")]
    ItemFailed {
        /// Key of the template that failed.
        key: String,
        /// Reason reported by the collaborator.
        message: String,
    },

    /// An external collaborator reported an error.
    #[error("collaborator error: {message}")]
    Collaborator {
        /// Description of the failure.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl SolutionError {
    /// Shorthand for a collaborator failure.
    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, SolutionError>;
