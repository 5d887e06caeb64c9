//! Structural validation of schema snapshots.
//!
//! A snapshot handed to the diff engine is expected to be internally
//! consistent:
//! - Primary key columns are never nullable
//! - Column names are unique within a table
//! - Index and constraint column lists refer to existing columns
//! - Foreign keys name their target

use std::collections::HashSet;

use crate::ast::*;
use crate::error::{SchemaError, SchemaResult};

/// Schema validator collecting every issue found in a snapshot.
#[derive(Debug)]
pub struct Validator {
    /// Collected validation errors.
    errors: Vec<SchemaError>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    /// Validate a schema, returning every issue at once.
    pub fn validate(&mut self, schema: &Schema) -> SchemaResult<()> {
        self.errors.clear();

        for (key, table) in &schema.tables {
            if key != &table.name {
                self.errors.push(SchemaError::duplicate(
                    "table key",
                    format!("{} (table is named `{}`)", key, table.name),
                ));
            }
            self.validate_table(table);
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            let errors = std::mem::take(&mut self.errors);
            tracing::debug!(count = errors.len(), "schema validation failed");
            Err(SchemaError::ValidationFailed {
                count: errors.len(),
                errors,
            })
        }
    }

    fn validate_table(&mut self, table: &Table) {
        let mut seen = HashSet::new();
        for column in &table.columns {
            if !seen.insert(column.name.as_str()) {
                self.errors.push(SchemaError::duplicate(
                    "column",
                    format!("{}.{}", table.name, column.name),
                ));
            }
            self.validate_column(table, column);
        }

        for index in table.indexes.values() {
            self.validate_index(table, index);
        }

        for constraint in table.constraints.values() {
            self.validate_constraint(table, constraint);
        }
    }

    fn validate_column(&mut self, table: &Table, column: &Column) {
        if column.data_type.trim().is_empty() {
            self.errors.push(SchemaError::invalid_column(
                table.name(),
                column.name(),
                "column type is empty",
            ));
        }

        if column.primary_key && column.nullable {
            self.errors.push(SchemaError::invalid_column(
                table.name(),
                column.name(),
                "primary key column cannot be nullable",
            ));
        }

        if let Some(fk) = &column.foreign_key {
            if fk.table.is_empty() || fk.column.is_empty() {
                self.errors.push(SchemaError::invalid_column(
                    table.name(),
                    column.name(),
                    "foreign key must name a table and a column",
                ));
            }
        }
    }

    fn validate_index(&mut self, table: &Table, index: &Index) {
        if index.columns.is_empty() {
            self.errors.push(SchemaError::invalid_index(
                table.name(),
                index.name(),
                "index has no columns",
            ));
        }

        for column in &index.columns {
            if !table.has_column(column) {
                self.errors.push(SchemaError::invalid_index(
                    table.name(),
                    index.name(),
                    format!("unknown column `{}`", column),
                ));
            }
        }
    }

    fn validate_constraint(&mut self, table: &Table, constraint: &Constraint) {
        for column in &constraint.columns {
            if !table.has_column(column) {
                self.errors.push(SchemaError::invalid_constraint(
                    table.name(),
                    constraint.name(),
                    format!("unknown column `{}`", column),
                ));
            }
        }

        match constraint.kind {
            ConstraintKind::PrimaryKey | ConstraintKind::Unique => {
                if constraint.columns.is_empty() {
                    self.errors.push(SchemaError::invalid_constraint(
                        table.name(),
                        constraint.name(),
                        format!("{} constraint has no columns", constraint.kind),
                    ));
                }
            }
            ConstraintKind::Check => {
                if constraint.definition.trim().is_empty() {
                    self.errors.push(SchemaError::invalid_constraint(
                        table.name(),
                        constraint.name(),
                        "CHECK constraint has no expression",
                    ));
                }
            }
            ConstraintKind::ForeignKey => {
                if constraint.referenced_table().is_none() {
                    self.errors.push(SchemaError::invalid_constraint(
                        table.name(),
                        constraint.name(),
                        "FOREIGN KEY definition does not name a referenced table",
                    ));
                }
            }
        }
    }
}

/// Validate a schema snapshot.
pub fn validate_schema(schema: &Schema) -> SchemaResult<()> {
    Validator::new().validate(schema)
}
