//! Top-level schema snapshot.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::Table;
use crate::error::{SchemaError, SchemaResult};

/// A complete schema snapshot: table name → table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// All tables in the schema.
    #[serde(default)]
    pub tables: IndexMap<SmolStr, Table>,
}

impl Schema {
    /// Create a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from a list of tables.
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Self {
        let mut schema = Self::new();
        for table in tables {
            schema.add_table(table);
        }
        schema
    }

    /// Add a table, replacing any table with the same name.
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Add a table (builder style).
    pub fn table(mut self, table: Table) -> Self {
        self.add_table(table);
        self
    }

    /// Get a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Check if a table exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Get all table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|s| s.as_str())
    }

    /// Whether the schema has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Load a snapshot from JSON.
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        let schema: Self =
            serde_json::from_str(json).map_err(|source| SchemaError::Snapshot { source })?;
        tracing::debug!(tables = schema.tables.len(), "loaded schema snapshot");
        Ok(schema)
    }

    /// Serialize the snapshot to pretty-printed JSON.
    pub fn to_json(&self) -> SchemaResult<String> {
        serde_json::to_string_pretty(self).map_err(|source| SchemaError::Snapshot { source })
    }
}

/// Schema statistics for debugging/info.
#[derive(Debug, Clone, Default)]
pub struct SchemaStats {
    /// Number of tables.
    pub table_count: usize,
    /// Total number of columns across all tables.
    pub column_count: usize,
    /// Total number of indexes.
    pub index_count: usize,
    /// Total number of constraints.
    pub constraint_count: usize,
}

impl Schema {
    /// Get statistics about the schema.
    pub fn stats(&self) -> SchemaStats {
        SchemaStats {
            table_count: self.tables.len(),
            column_count: self.tables.values().map(|t| t.columns.len()).sum(),
            index_count: self.tables.values().map(|t| t.indexes.len()).sum(),
            constraint_count: self.tables.values().map(|t| t.constraints.len()).sum(),
        }
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        write!(
            f,
            "Schema({} tables, {} columns, {} indexes, {} constraints)",
            stats.table_count, stats.column_count, stats.index_count, stats.constraint_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Column, Index};
    use pretty_assertions::assert_eq;

    fn users() -> Table {
        Table::new("users")
            .column(Column::new("id", "uuid").primary_key())
            .column(Column::new("email", "varchar(255)").not_null())
            .index(Index::new("idx_users_email", ["email"]).unique())
    }

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::new().table(users());
        assert!(schema.has_table("users"));
        assert!(!schema.is_empty());
        assert_eq!(schema.table_names().collect::<Vec<_>>(), vec!["users"]);
        assert!(schema.get_table("posts").is_none());
    }

    #[test]
    fn test_from_tables_replaces_duplicates() {
        let schema = Schema::from_tables([users(), Table::new("users")]);
        assert_eq!(schema.tables.len(), 1);
        assert!(schema.tables["users"].columns.is_empty());
    }

    #[test]
    fn test_display() {
        let schema = Schema::new().table(users());
        assert_eq!(
            schema.to_string(),
            "Schema(1 tables, 2 columns, 1 indexes, 0 constraints)"
        );
    }

    #[test]
    fn test_json_snapshot() {
        let schema = Schema::new().table(users());
        let json = schema.to_json().unwrap();
        assert!(json.contains("\"idx_users_email\""));
        assert_eq!(Schema::from_json(&json).unwrap(), schema);
    }

    #[test]
    fn test_from_json_hand_written() {
        let schema = Schema::from_json(
            r#"{
                "tables": {
                    "users": {
                        "name": "users",
                        "columns": [
                            {"name": "id", "type": "int4", "nullable": false, "primary_key": true}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();
        let id = schema.tables["users"].get_column("id").unwrap();
        assert_eq!(id.data_type, "int4");
        assert!(id.primary_key);
    }

    #[test]
    fn test_from_json_invalid() {
        let err = Schema::from_json("[1, 2").unwrap_err();
        assert!(matches!(err, SchemaError::Snapshot { .. }));
    }
}
