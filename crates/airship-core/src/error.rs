//! Error types for airship-core

use std::time::Duration;

/// Result type for airship-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while declaring items or reconciling replicas
///
/// None of these is fatal to a run. The reconciler maps each one onto the
/// narrowest scope it concerns (replica, item or file) and records it in the
/// [`RunReport`](crate::RunReport).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Replica could not be activated and is excluded for the whole run
    #[error("Replica {replica} failed to activate: {reason}")]
    Activation { replica: String, reason: String },

    /// Replica is not usable for the current item
    #[error("Replica {replica} is not ready: {reason}")]
    Readiness { replica: String, reason: String },

    /// A participating replica contributed no file matching the item
    #[error("Replica {replica} has no files matching item {item}")]
    EnumerationGap { replica: String, item: String },

    /// A file carries the reserved invalid timestamp
    #[error("File {filename} has an invalid timestamp on replica {replica}")]
    InvalidTimestamp { filename: String, replica: String },

    /// A transformer function failed for one file
    #[error("Transform failed for {filename}: {message}")]
    Transform { filename: String, message: String },

    /// Backend I/O failed
    #[error("Replica {replica} failed to {operation}: {message}")]
    Replica {
        replica: String,
        operation: String,
        message: String,
    },

    /// A replica call did not finish within the configured timeout
    #[error("Replica {replica} timed out after {timeout:?} during {operation}")]
    Timeout {
        replica: String,
        operation: String,
        timeout: Duration,
    },

    /// An item names a replica the reconciler does not know
    #[error("Unknown replica: {0}")]
    UnknownReplica(String),

    /// Two replicas share an identity
    #[error("Duplicate replica id: {0}")]
    DuplicateReplica(String),

    /// Item pattern failed to compile
    #[error("Invalid pattern for item {item}: {source}")]
    InvalidPattern {
        item: String,
        #[source]
        source: regex::Error,
    },

    /// Manifest names a transformer that is not registered
    #[error("Unknown transformer {name} for item {item}")]
    UnknownTransformer { name: String, item: String },

    /// Manifest content is structurally valid but semantically wrong
    #[error("Manifest error: {message}")]
    Manifest { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from airship-fs
    #[error(transparent)]
    Fs(#[from] airship_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

impl Error {
    /// Build a [`Error::Transform`] for `filename`.
    pub fn transform(filename: impl Into<String>, message: impl ToString) -> Self {
        Self::Transform {
            filename: filename.into(),
            message: message.to_string(),
        }
    }

    /// Build a [`Error::Replica`] for a failed backend call.
    pub fn replica(
        replica: impl Into<String>,
        operation: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::Replica {
            replica: replica.into(),
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Build a [`Error::Readiness`].
    pub fn readiness(replica: impl Into<String>, reason: impl ToString) -> Self {
        Self::Readiness {
            replica: replica.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`Error::Activation`].
    pub fn activation(replica: impl Into<String>, reason: impl ToString) -> Self {
        Self::Activation {
            replica: replica.into(),
            reason: reason.to_string(),
        }
    }
}
