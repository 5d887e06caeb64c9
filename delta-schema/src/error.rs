//! Error types for schema snapshots and validation.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while loading or validating a schema snapshot.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Duplicate definition.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(delta::schema::duplicate))]
    Duplicate { kind: String, name: String },

    /// Invalid column definition.
    #[error("invalid column `{table}.{column}`: {message}")]
    #[diagnostic(code(delta::schema::invalid_column))]
    InvalidColumn {
        table: String,
        column: String,
        message: String,
    },

    /// Invalid index definition.
    #[error("invalid index `{index}` on `{table}`: {message}")]
    #[diagnostic(code(delta::schema::invalid_index))]
    InvalidIndex {
        table: String,
        index: String,
        message: String,
    },

    /// Invalid constraint definition.
    #[error("invalid constraint `{constraint}` on `{table}`: {message}")]
    #[diagnostic(code(delta::schema::invalid_constraint))]
    InvalidConstraint {
        table: String,
        constraint: String,
        message: String,
    },

    /// A snapshot could not be read or written.
    #[error("failed to (de)serialize schema snapshot")]
    #[diagnostic(code(delta::schema::snapshot))]
    Snapshot {
        #[source]
        source: serde_json::Error,
    },

    /// Validation error with multiple issues.
    #[error("schema validation failed with {count} error(s)")]
    #[diagnostic(code(delta::schema::validation_failed))]
    ValidationFailed {
        count: usize,
        #[related]
        errors: Vec<SchemaError>,
    },
}

impl SchemaError {
    /// Create a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an invalid column error.
    pub fn invalid_column(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidColumn {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an invalid index error.
    pub fn invalid_index(
        table: impl Into<String>,
        index: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidIndex {
            table: table.into(),
            index: index.into(),
            message: message.into(),
        }
    }

    /// Create an invalid constraint error.
    pub fn invalid_constraint(
        table: impl Into<String>,
        constraint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidConstraint {
            table: table.into(),
            constraint: constraint.into(),
            message: message.into(),
        }
    }
}
