//! Table definitions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::{Column, Constraint, Index};

/// A table: ordered columns plus sets of indexes and constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: SmolStr,
    /// Columns, in declaration order.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Indexes keyed by name.
    #[serde(default)]
    pub indexes: IndexMap<SmolStr, Index>,
    /// Constraints keyed by name.
    #[serde(default)]
    pub constraints: IndexMap<SmolStr, Constraint>,
}

impl Table {
    /// Create an empty table.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            columns: vec![],
            indexes: IndexMap::new(),
            constraints: IndexMap::new(),
        }
    }

    /// Get the table name as a string.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Append a column.
    pub fn column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    /// Add an index.
    pub fn index(mut self, index: Index) -> Self {
        self.add_index(index);
        self
    }

    /// Add a constraint.
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.add_constraint(constraint);
        self
    }

    /// Append a column.
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Add an index, replacing any index with the same name.
    pub fn add_index(&mut self, index: Index) {
        self.indexes.insert(index.name.clone(), index);
    }

    /// Add a constraint, replacing any constraint with the same name.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.insert(constraint.name.clone(), constraint);
    }

    /// Get a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Get an index by name.
    pub fn get_index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    /// Get a constraint by name.
    pub fn get_constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.get(name)
    }

    /// Primary key columns, in column order.
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Tables referenced through column foreign keys and FOREIGN KEY
    /// constraints, in first-seen order and without duplicates.
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        let column_refs = self.columns.iter().filter_map(Column::referenced_table);
        let constraint_refs = self
            .constraints
            .values()
            .filter_map(Constraint::referenced_table);
        for name in column_refs.chain(constraint_refs) {
            if !tables.contains(&name) {
                tables.push(name);
            }
        }
        tables
    }
}
