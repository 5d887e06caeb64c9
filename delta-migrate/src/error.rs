//! Error types for the migration engine.

use std::path::PathBuf;

use delta_schema::SchemaError;
use thiserror::Error;

use crate::change::ChangeKind;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur while diffing schemas or synthesizing DDL.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Tables reference each other in a foreign key cycle.
    #[error("circular foreign key dependency involving table '{table}'")]
    CircularDependency {
        /// A table on the cycle.
        table: String,
    },

    /// A change cannot be rendered as DDL.
    #[error("invalid {kind} change: {message}")]
    InvalidChange {
        /// Kind of the offending change.
        kind: ChangeKind,
        /// What is wrong with it.
        message: String,
    },

    /// An input schema failed validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Configuration could not be parsed.
    #[error("failed to parse migration config")]
    Config {
        #[source]
        source: toml::de::Error,
    },

    /// File system error while reading configuration.
    #[error("failed to read {path}")]
    Io {
        /// Path being read.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MigrationError {
    /// Create a circular dependency error.
    pub fn circular(table: impl Into<String>) -> Self {
        Self::CircularDependency {
            table: table.into(),
        }
    }

    /// Create an invalid change error.
    pub fn invalid_change(kind: ChangeKind, message: impl Into<String>) -> Self {
        Self::InvalidChange {
            kind,
            message: message.into(),
        }
    }

    /// Whether the error points at the input schemas themselves.
    ///
    /// These errors never go away on retry; the schema has to be fixed.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::CircularDependency { .. } | Self::Schema(_))
    }
}
