//! Unified error type for the stackplan workspace.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StackplanError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A descriptor or configuration value is invalid.
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

    /// A service reference could not be turned into a value.
    #[error("unresolved reference {reference} in service \"{service}\": {reason}")]
    UnresolvedReference {
        /// Service whose configuration holds the reference.
        service: String,
        /// The reference as written.
        reference: String,
        /// Why resolution failed.
        reason: String,
    },

    /// Service references form a cycle.
    #[error("cyclic dependency detected between services: {}", cycle.join(" -> "))]
    CyclicDependency {
        /// Services taking part in the cycle, in declaration order.
        cycle: Vec<String>,
    },

    /// The descriptor is not valid YAML or does not match the schema.
    #[error("descriptor error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StackplanError>;
