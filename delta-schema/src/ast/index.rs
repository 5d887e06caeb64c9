//! Index definitions.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Default index access method.
pub const DEFAULT_INDEX_METHOD: &str = "btree";

/// An index on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: SmolStr,
    /// Indexed columns, in index order.
    pub columns: Vec<SmolStr>,
    /// Whether the index enforces uniqueness.
    #[serde(default)]
    pub unique: bool,
    /// Whether this is the primary key index.
    #[serde(default)]
    pub primary: bool,
    /// Access method (`btree`, `hash`, `gin`, ...).
    #[serde(default = "default_method")]
    pub method: String,
    /// Partial index predicate (the `WHERE` clause), if any.
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
}

fn default_method() -> String {
    DEFAULT_INDEX_METHOD.to_string()
}

impl Index {
    /// Create a non-unique btree index.
    pub fn new<I, S>(name: impl Into<SmolStr>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            primary: false,
            method: default_method(),
            predicate: None,
        }
    }

    /// Get the index name as a string.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Mark the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the index as the primary key index (implies unique).
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.unique = true;
        self
    }

    /// Set the access method.
    pub fn using(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Make the index partial.
    pub fn where_clause(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Whether the access method is the default one.
    pub fn is_default_method(&self) -> bool {
        self.method.trim().eq_ignore_ascii_case(DEFAULT_INDEX_METHOD)
    }

    /// Whether dropping this index can remove a uniqueness guarantee.
    pub fn enforces_uniqueness(&self) -> bool {
        self.unique || self.primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_builder() {
        let idx = Index::new("idx_users_email", ["email"])
            .unique()
            .where_clause("deleted_at IS NULL");

        assert_eq!(idx.name(), "idx_users_email");
        assert_eq!(idx.columns, vec![SmolStr::new("email")]);
        assert!(idx.unique);
        assert!(idx.is_default_method());
        assert_eq!(idx.predicate.as_deref(), Some("deleted_at IS NULL"));
    }

    #[test]
    fn test_primary_implies_unique() {
        let idx = Index::new("users_pkey", ["id"]).primary();
        assert!(idx.unique);
        assert!(idx.enforces_uniqueness());
    }

    #[test]
    fn test_method() {
        let idx = Index::new("idx_docs_body", ["body"]).using("gin");
        assert!(!idx.is_default_method());
        assert!(Index::new("i", ["a"]).using("BTREE").is_default_method());
    }

    #[test]
    fn test_deserialize_where_and_default_method() {
        let idx: Index =
            serde_json::from_str(r#"{"name": "i", "columns": ["a", "b"], "where": "a > 0"}"#)
                .unwrap();
        assert_eq!(idx.method, "btree");
        assert_eq!(idx.predicate.as_deref(), Some("a > 0"));
    }
}
