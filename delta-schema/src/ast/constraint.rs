//! Table-level constraint definitions.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::ConstraintKind;

/// A named table constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Constraint name.
    pub name: SmolStr,
    /// Constraint kind.
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    /// Free-text definition, meaningful for CHECK and FOREIGN KEY.
    #[serde(default)]
    pub definition: String,
    /// Constrained columns.
    #[serde(default)]
    pub columns: Vec<SmolStr>,
}

impl Constraint {
    /// Create a constraint.
    pub fn new<I, S>(
        name: impl Into<SmolStr>,
        kind: ConstraintKind,
        definition: impl Into<String>,
        columns: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            name: name.into(),
            kind,
            definition: definition.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// `PRIMARY KEY (columns)`.
    pub fn primary_key<I, S>(name: impl Into<SmolStr>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self::new(name, ConstraintKind::PrimaryKey, "", columns)
    }

    /// `UNIQUE (columns)`.
    pub fn unique<I, S>(name: impl Into<SmolStr>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self::new(name, ConstraintKind::Unique, "", columns)
    }

    /// `CHECK (expression)`.
    pub fn check(name: impl Into<SmolStr>, expression: impl Into<String>) -> Self {
        Self::new(name, ConstraintKind::Check, expression, Vec::<SmolStr>::new())
    }

    /// `FOREIGN KEY (columns) REFERENCES ...` with the given definition.
    pub fn foreign_key<I, S>(name: impl Into<SmolStr>, definition: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self::new(name, ConstraintKind::ForeignKey, definition, columns)
    }

    /// Get the constraint name as a string.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Whether dropping this constraint can remove a uniqueness or
    /// referential guarantee.
    pub fn is_protective(&self) -> bool {
        !matches!(self.kind, ConstraintKind::Check)
    }

    /// Table referenced by a FOREIGN KEY definition, if it can be read.
    pub fn referenced_table(&self) -> Option<&str> {
        if self.kind != ConstraintKind::ForeignKey {
            return None;
        }
        let lower = self.definition.to_ascii_lowercase();
        let start = lower.find("references")? + "references".len();
        let rest = self.definition[start..].trim_start();
        let end = rest
            .find(|c: char| c == '(' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = rest[..end].trim_matches('"');
        if name.is_empty() { None } else { Some(name) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let pk = Constraint::primary_key("users_pkey", ["id"]);
        assert_eq!(pk.kind, ConstraintKind::PrimaryKey);
        assert!(pk.definition.is_empty());

        let check = Constraint::check("positive_total", "total > 0");
        assert_eq!(check.kind, ConstraintKind::Check);
        assert!(check.columns.is_empty());
        assert!(!check.is_protective());
    }

    #[test]
    fn test_referenced_table() {
        let fk = Constraint::foreign_key(
            "orders_customer_id_fkey",
            "FOREIGN KEY (customer_id) REFERENCES customers(id) ON DELETE CASCADE",
            ["customer_id"],
        );
        assert_eq!(fk.referenced_table(), Some("customers"));
        assert!(fk.is_protective());

        let quoted = Constraint::foreign_key("fk", "REFERENCES \"Accounts\" (id)", ["account_id"]);
        assert_eq!(quoted.referenced_table(), Some("Accounts"));
    }

    #[test]
    fn test_referenced_table_missing() {
        let fk = Constraint::foreign_key("fk", "", ["a"]);
        assert_eq!(fk.referenced_table(), None);
        let unique = Constraint::unique("u", ["a"]);
        assert_eq!(unique.referenced_table(), None);
    }
}
