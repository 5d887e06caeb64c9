//! Small enumerations shared by columns and constraints.

use serde::{Deserialize, Serialize};

/// Action taken by a foreign key when the referenced row changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    /// `NO ACTION` (the PostgreSQL default).
    #[default]
    NoAction,
    /// `RESTRICT`.
    Restrict,
    /// `CASCADE`.
    Cascade,
    /// `SET NULL`.
    SetNull,
    /// `SET DEFAULT`.
    SetDefault,
}

impl ReferentialAction {
    /// SQL spelling of the action.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse an action from its SQL spelling (case and whitespace insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_uppercase().as_str() {
            "NO ACTION" => Some(Self::NoAction),
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }

    /// Whether this is the implicit default and can be left out of DDL.
    pub fn is_default(&self) -> bool {
        matches!(self, Self::NoAction)
    }
}

impl std::fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Kind of a table-level constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// `CHECK (...)`.
    #[serde(rename = "CHECK")]
    Check,
    /// `UNIQUE (...)`.
    #[serde(rename = "UNIQUE")]
    Unique,
    /// `PRIMARY KEY (...)`.
    #[serde(rename = "PRIMARY KEY")]
    PrimaryKey,
    /// `FOREIGN KEY (...) REFERENCES ...`.
    #[serde(rename = "FOREIGN KEY")]
    ForeignKey,
}

impl ConstraintKind {
    /// SQL keyword(s) introducing the constraint.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Check => "CHECK",
            Self::Unique => "UNIQUE",
            Self::PrimaryKey => "PRIMARY KEY",
            Self::ForeignKey => "FOREIGN KEY",
        }
    }

    /// Whether the constraint is identified by its column set alone.
    ///
    /// The definition text of these constraints is generated by the database
    /// and carries no extra meaning.
    pub fn is_column_set(&self) -> bool {
        matches!(self, Self::Unique | Self::PrimaryKey)
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referential_action_parse() {
        assert_eq!(ReferentialAction::parse("cascade"), Some(ReferentialAction::Cascade));
        assert_eq!(ReferentialAction::parse("SET  null"), Some(ReferentialAction::SetNull));
        assert_eq!(ReferentialAction::parse("no action"), Some(ReferentialAction::NoAction));
        assert_eq!(ReferentialAction::parse("explode"), None);
    }

    #[test]
    fn test_referential_action_default() {
        assert!(ReferentialAction::default().is_default());
        assert!(!ReferentialAction::Cascade.is_default());
        assert_eq!(ReferentialAction::SetDefault.to_string(), "SET DEFAULT");
    }

    #[test]
    fn test_constraint_kind_sql() {
        assert_eq!(ConstraintKind::PrimaryKey.as_sql(), "PRIMARY KEY");
        assert_eq!(ConstraintKind::ForeignKey.to_string(), "FOREIGN KEY");
        assert!(ConstraintKind::Unique.is_column_set());
        assert!(!ConstraintKind::Check.is_column_set());
    }

    #[test]
    fn test_constraint_kind_serde() {
        let json = serde_json::to_string(&ConstraintKind::PrimaryKey).unwrap();
        assert_eq!(json, "\"PRIMARY KEY\"");
        let kind: ConstraintKind = serde_json::from_str("\"CHECK\"").unwrap();
        assert_eq!(kind, ConstraintKind::Check);
    }
}
