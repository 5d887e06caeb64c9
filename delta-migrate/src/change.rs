//! Change records produced by the diff engine.

use std::fmt;

use delta_schema::{Column, Constraint, Index, Table};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// The eleven kinds of schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    CreateTable,
    DropTable,
    RenameTable,
    AddColumn,
    DropColumn,
    AlterColumn,
    RenameColumn,
    CreateIndex,
    DropIndex,
    AddConstraint,
    DropConstraint,
}

impl ChangeKind {
    /// All kinds, in declaration order.
    pub const ALL: [ChangeKind; 11] = [
        ChangeKind::CreateTable,
        ChangeKind::DropTable,
        ChangeKind::RenameTable,
        ChangeKind::AddColumn,
        ChangeKind::DropColumn,
        ChangeKind::AlterColumn,
        ChangeKind::RenameColumn,
        ChangeKind::CreateIndex,
        ChangeKind::DropIndex,
        ChangeKind::AddConstraint,
        ChangeKind::DropConstraint,
    ];

    /// Upper-case tag, e.g. `CREATE_TABLE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTable => "CREATE_TABLE",
            Self::DropTable => "DROP_TABLE",
            Self::RenameTable => "RENAME_TABLE",
            Self::AddColumn => "ADD_COLUMN",
            Self::DropColumn => "DROP_COLUMN",
            Self::AlterColumn => "ALTER_COLUMN",
            Self::RenameColumn => "RENAME_COLUMN",
            Self::CreateIndex => "CREATE_INDEX",
            Self::DropIndex => "DROP_INDEX",
            Self::AddConstraint => "ADD_CONSTRAINT",
            Self::DropConstraint => "DROP_CONSTRAINT",
        }
    }

    /// Whether the change removes an object.
    pub fn is_drop(&self) -> bool {
        matches!(
            self,
            Self::DropTable | Self::DropColumn | Self::DropIndex | Self::DropConstraint
        )
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What changed, with the definitions needed to render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangePayload {
    CreateTable { table: Table },
    DropTable { table: Table },
    RenameTable { from: SmolStr, to: SmolStr },
    AddColumn { column: Column },
    DropColumn { column: Column },
    AlterColumn { from: Column, to: Column },
    RenameColumn { from: Column, to: Column },
    CreateIndex { index: Index },
    DropIndex { index: Index },
    AddConstraint { constraint: Constraint },
    DropConstraint { constraint: Constraint },
}

impl ChangePayload {
    /// Kind of this payload.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::CreateTable { .. } => ChangeKind::CreateTable,
            Self::DropTable { .. } => ChangeKind::DropTable,
            Self::RenameTable { .. } => ChangeKind::RenameTable,
            Self::AddColumn { .. } => ChangeKind::AddColumn,
            Self::DropColumn { .. } => ChangeKind::DropColumn,
            Self::AlterColumn { .. } => ChangeKind::AlterColumn,
            Self::RenameColumn { .. } => ChangeKind::RenameColumn,
            Self::CreateIndex { .. } => ChangeKind::CreateIndex,
            Self::DropIndex { .. } => ChangeKind::DropIndex,
            Self::AddConstraint { .. } => ChangeKind::AddConstraint,
            Self::DropConstraint { .. } => ChangeKind::DropConstraint,
        }
    }

    /// Name of the object the change creates, drops, or modifies.
    ///
    /// Renames report the new name.
    pub fn object_name(&self) -> &str {
        match self {
            Self::CreateTable { table } | Self::DropTable { table } => table.name(),
            Self::RenameTable { to, .. } => to.as_str(),
            Self::AddColumn { column } | Self::DropColumn { column } => column.name(),
            Self::AlterColumn { to, .. } | Self::RenameColumn { to, .. } => to.name(),
            Self::CreateIndex { index } | Self::DropIndex { index } => index.name(),
            Self::AddConstraint { constraint } | Self::DropConstraint { constraint } => {
                constraint.name()
            }
        }
    }
}

/// A single schema change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// Table the change applies to, as it is named when the change runs.
    pub table: SmolStr,
    /// Change details.
    pub payload: ChangePayload,
    /// Forward DDL for this change alone.
    #[serde(default)]
    pub sql: String,
    /// Whether applying the change can lose data or weaken integrity.
    #[serde(default)]
    pub is_unsafe: bool,
    /// Explanation attached to unsafe changes and signature renames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_note: Option<String>,
}

impl Change {
    /// Create a safe change with no SQL attached yet.
    pub fn new(table: impl Into<SmolStr>, payload: ChangePayload) -> Self {
        Self {
            table: table.into(),
            payload,
            sql: String::new(),
            is_unsafe: false,
            safety_note: None,
        }
    }

    /// Mark the change unsafe with an explanation.
    pub fn flagged(mut self, note: impl Into<String>) -> Self {
        self.is_unsafe = true;
        self.safety_note = Some(note.into());
        self
    }

    /// Attach a note without marking the change unsafe.
    pub fn noted(mut self, note: impl Into<String>) -> Self {
        self.safety_note = Some(note.into());
        self
    }

    /// Kind of the change.
    pub fn kind(&self) -> ChangeKind {
        self.payload.kind()
    }

    /// Column name for column-level changes.
    ///
    /// For renames and alterations this is the column's name before the
    /// change.
    pub fn column(&self) -> Option<&str> {
        match &self.payload {
            ChangePayload::AddColumn { column } | ChangePayload::DropColumn { column } => {
                Some(column.name())
            }
            ChangePayload::AlterColumn { from, .. } | ChangePayload::RenameColumn { from, .. } => {
                Some(from.name())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            ChangePayload::RenameTable { from, to } => {
                write!(f, "{} {} -> {}", self.kind(), from, to)?
            }
            ChangePayload::RenameColumn { from, to } => write!(
                f,
                "{} {}.{} -> {}",
                self.kind(),
                self.table,
                from.name(),
                to.name()
            )?,
            ChangePayload::CreateTable { .. } | ChangePayload::DropTable { .. } => {
                write!(f, "{} {}", self.kind(), self.table)?
            }
            payload => write!(f, "{} {}.{}", self.kind(), self.table, payload.object_name())?,
        }
        if self.is_unsafe {
            f.write_str(" [unsafe]")?;
        }
        Ok(())
    }
}

/// Whether a rename hint applies to tables or columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameScope {
    Table,
    Column,
}

/// Caller-supplied assertion that an object was renamed rather than
/// dropped and recreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameHint {
    /// Name in the old schema.
    #[serde(rename = "old")]
    pub old_name: SmolStr,
    /// Name in the new schema.
    #[serde(rename = "new")]
    pub new_name: SmolStr,
    /// Kind of object renamed.
    pub scope: RenameScope,
    /// For column hints, restrict the hint to one table (new name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<SmolStr>,
}

impl RenameHint {
    /// A table rename.
    pub fn table(old_name: impl Into<SmolStr>, new_name: impl Into<SmolStr>) -> Self {
        Self {
            old_name: old_name.into(),
            new_name: new_name.into(),
            scope: RenameScope::Table,
            table: None,
        }
    }

    /// A column rename, applied in every table.
    pub fn column(old_name: impl Into<SmolStr>, new_name: impl Into<SmolStr>) -> Self {
        Self {
            old_name: old_name.into(),
            new_name: new_name.into(),
            scope: RenameScope::Column,
            table: None,
        }
    }

    /// Restrict a column hint to a single table.
    pub fn in_table(mut self, table: impl Into<SmolStr>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Whether a column hint applies to `table` (matched by old or new name).
    pub fn applies_to(&self, old_table: &str, new_table: &str) -> bool {
        match &self.table {
            None => true,
            Some(t) => t == old_table || t == new_table,
        }
    }
}
