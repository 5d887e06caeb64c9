//! Schema diffing.
//!
//! [`SchemaDiffer::compare`] walks two snapshots table by table and records a
//! [`Change`] for everything that differs:
//!
//! 1. Tables are matched by name, then through rename hints. Unmatched new
//!    tables are created, unmatched old tables dropped.
//! 2. Columns of a matched pair are matched the same way. Types and defaults
//!    are compared in canonical form so catalog spellings do not show up as
//!    changes.
//! 3. Indexes and constraints are matched by name first, then by signature,
//!    so an object that only changed its name is recognized.
//!
//! Each change carries a safety flag. The rules are fixed: drops of tables
//! and columns lose data, narrowing type changes and `SET NOT NULL` without a
//! default can fail, and dropping a uniqueness or referential guarantee
//! weakens integrity.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use delta_schema::{Column, Constraint, Index, Schema, Table};
use serde::Serialize;
use smol_str::SmolStr;

use crate::canonical::{
    Signature, constraint_signature, index_signature, normalize_check, normalize_default,
    normalize_identifier, normalize_type,
};
use crate::change::{Change, ChangeKind, ChangePayload, RenameHint, RenameScope};
use crate::depsort::DependencySorter;
use crate::error::MigrateResult;
use crate::safety::is_unsafe_type_change;
use crate::sql::PostgresSqlGenerator;
use crate::trace::{DiffEvent, DiffTrace, SignatureObject, TracingTrace};

/// Summary labels, in report order.
const SUMMARY_LABELS: [(ChangeKind, &str); 11] = [
    (ChangeKind::CreateTable, "new table(s)"),
    (ChangeKind::DropTable, "dropped table(s)"),
    (ChangeKind::RenameTable, "renamed table(s)"),
    (ChangeKind::AddColumn, "new column(s)"),
    (ChangeKind::DropColumn, "dropped column(s)"),
    (ChangeKind::AlterColumn, "altered column(s)"),
    (ChangeKind::RenameColumn, "renamed column(s)"),
    (ChangeKind::CreateIndex, "new index(es)"),
    (ChangeKind::DropIndex, "dropped index(es)"),
    (ChangeKind::AddConstraint, "new constraint(s)"),
    (ChangeKind::DropConstraint, "dropped constraint(s)"),
];

/// Outcome of comparing two snapshots.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffResult {
    /// Changes in detection order.
    pub changes: Vec<Change>,
    /// Whether any change is unsafe.
    pub has_unsafe_changes: bool,
    /// Human-readable count of changes by kind.
    pub summary: String,
}

impl DiffResult {
    /// Wrap a change list, computing the aggregate fields.
    pub fn new(changes: Vec<Change>) -> Self {
        let has_unsafe_changes = changes.iter().any(|c| c.is_unsafe);
        let summary = summarize(&changes, has_unsafe_changes);
        Self {
            changes,
            has_unsafe_changes,
            summary,
        }
    }

    /// Whether the snapshots are equivalent.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes of one kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes_of(kind).count()
    }

    /// Changes of one kind, in detection order.
    pub fn changes_of(&self, kind: ChangeKind) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |c| c.kind() == kind)
    }

    /// Unsafe changes, in detection order.
    pub fn unsafe_changes(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(|c| c.is_unsafe)
    }
}

fn summarize(changes: &[Change], has_unsafe: bool) -> String {
    if changes.is_empty() {
        return "No changes detected".to_string();
    }
    let mut parts = Vec::new();
    for (kind, label) in SUMMARY_LABELS {
        let count = changes.iter().filter(|c| c.kind() == kind).count();
        if count > 0 {
            parts.push(format!("{} {}", count, label));
        }
    }
    let mut summary = parts.join(", ");
    if has_unsafe {
        summary.push_str(" [WARNING: Contains unsafe changes]");
    }
    summary
}

/// Compares schema snapshots.
pub struct SchemaDiffer {
    trace: Arc<dyn DiffTrace>,
    generator: PostgresSqlGenerator,
    sorter: DependencySorter,
}

impl Default for SchemaDiffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaDiffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaDiffer")
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}

impl SchemaDiffer {
    /// Create a differ that reports through `tracing`.
    pub fn new() -> Self {
        Self {
            trace: Arc::new(TracingTrace),
            generator: PostgresSqlGenerator::default(),
            sorter: DependencySorter::new(),
        }
    }

    /// Report diff events to `trace` instead.
    pub fn with_trace(mut self, trace: Arc<dyn DiffTrace>) -> Self {
        self.trace = trace;
        self
    }

    /// Use `generator` to render the forward SQL attached to each change.
    pub fn with_generator(mut self, generator: PostgresSqlGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Compare `old` against `new`.
    ///
    /// `hints` declare renames that would otherwise look like a drop plus an
    /// add. A hint only applies when its old name is missing from the new
    /// snapshot and its new name is missing from the old one.
    pub fn compare(
        &self,
        old: &Schema,
        new: &Schema,
        hints: &[RenameHint],
    ) -> MigrateResult<DiffResult> {
        let old_tables = self.listing(old);
        let new_tables = self.listing(new);
        let renames = table_renames(old, new, hints);

        let mut diff = Diff {
            trace: self.trace.as_ref(),
            changes: Vec::new(),
        };

        for table in &new_tables {
            if let Some(old_table) = old.get_table(table.name()) {
                diff.trace.event(&DiffEvent::TableMatched {
                    table: table.name(),
                });
                diff.table(old_table, table, hints);
            } else if let Some(old_table) = renames.get(table.name()) {
                diff.trace.event(&DiffEvent::TableRenamed {
                    from: old_table.name(),
                    to: table.name(),
                });
                diff.push(Change::new(
                    old_table.name.clone(),
                    ChangePayload::RenameTable {
                        from: old_table.name.clone(),
                        to: table.name.clone(),
                    },
                ));
                diff.table(old_table, table, hints);
            } else {
                diff.push(Change::new(
                    table.name.clone(),
                    ChangePayload::CreateTable {
                        table: (*table).clone(),
                    },
                ));
            }
        }

        // Dependents go first so referenced tables are dropped last
        let renamed_from: HashSet<&str> = renames.values().map(|t| t.name()).collect();
        for table in old_tables.iter().rev() {
            if new.has_table(table.name()) || renamed_from.contains(table.name()) {
                continue;
            }
            diff.push(
                Change::new(
                    table.name.clone(),
                    ChangePayload::DropTable {
                        table: (*table).clone(),
                    },
                )
                .flagged(format!(
                    "dropping table `{}` permanently deletes all of its rows",
                    table.name
                )),
            );
        }

        // Tables created together must have an order they can be created in
        let created: Vec<&Table> = diff
            .changes
            .iter()
            .filter_map(|c| match &c.payload {
                ChangePayload::CreateTable { table } => Some(table),
                _ => None,
            })
            .collect();
        self.sorter.sort(&created)?;

        let mut changes = diff.changes;
        for change in &mut changes {
            change.sql = self.generator.forward_sql(change)?;
        }

        let result = DiffResult::new(changes);
        tracing::debug!(
            changes = result.changes.len(),
            has_unsafe = result.has_unsafe_changes,
            "schema diff complete"
        );
        Ok(result)
    }

    /// Tables of `schema` in dependency order, or in snapshot order when
    /// their references form a cycle.
    fn listing<'a>(&self, schema: &'a Schema) -> Vec<&'a Table> {
        let tables: Vec<&Table> = schema.tables.values().collect();
        match self.sorter.sort(&tables) {
            Ok(sorted) => sorted,
            Err(err) => {
                tracing::trace!(error = %err, "keeping snapshot order for table listing");
                tables
            }
        }
    }
}

/// Resolve table rename hints to `new name → old table`.
fn table_renames<'a>(
    old: &'a Schema,
    new: &Schema,
    hints: &'a [RenameHint],
) -> HashMap<&'a str, &'a Table> {
    let mut renames: HashMap<&str, &Table> = HashMap::new();
    let mut used: HashSet<&str> = HashSet::new();
    for hint in hints.iter().filter(|h| h.scope == RenameScope::Table) {
        let Some(old_table) = old.get_table(&hint.old_name) else {
            continue;
        };
        if new.has_table(&hint.old_name)
            || !new.has_table(&hint.new_name)
            || old.has_table(&hint.new_name)
            || renames.contains_key(hint.new_name.as_str())
            || !used.insert(hint.old_name.as_str())
        {
            continue;
        }
        renames.insert(hint.new_name.as_str(), old_table);
    }
    renames
}

/// Change accumulator for one `compare` call.
struct Diff<'t> {
    trace: &'t dyn DiffTrace,
    changes: Vec<Change>,
}

impl Diff<'_> {
    fn push(&mut self, change: Change) {
        self.trace.event(&DiffEvent::ChangeEmitted {
            kind: change.kind(),
            table: change.table.as_str(),
            is_unsafe: change.is_unsafe,
        });
        self.changes.push(change);
    }

    fn table(&mut self, old: &Table, new: &Table, hints: &[RenameHint]) {
        self.columns(old, new, hints);
        self.indexes(old, new);
        self.constraints(old, new);
    }

    // Column changes run before the table is renamed, so they address the
    // table by its old name. Drops run after and use the new name.
    fn columns(&mut self, old: &Table, new: &Table, hints: &[RenameHint]) {
        let column_hints: Vec<&RenameHint> = hints
            .iter()
            .filter(|h| h.scope == RenameScope::Column && h.applies_to(old.name(), new.name()))
            .collect();
        let mut claimed: HashSet<&str> = HashSet::new();

        for column in &new.columns {
            if let Some(prev) = old.get_column(column.name()) {
                claimed.insert(prev.name());
                self.alter(&old.name, prev, column.clone());
                continue;
            }

            let hinted = column_hints
                .iter()
                .filter(|h| h.new_name == column.name)
                .filter(|h| !claimed.contains(h.old_name.as_str()) && !new.has_column(&h.old_name))
                .find_map(|h| old.get_column(&h.old_name));

            match hinted {
                Some(prev) => {
                    claimed.insert(prev.name());
                    self.trace.event(&DiffEvent::ColumnRenamed {
                        table: new.name(),
                        from: prev.name(),
                        to: column.name(),
                    });
                    self.push(Change::new(
                        old.name.clone(),
                        ChangePayload::RenameColumn {
                            from: prev.clone(),
                            to: column.clone(),
                        },
                    ));
                    self.alter(&old.name, prev, column.renamed(prev.name.clone()));
                }
                None => self.push(Change::new(
                    old.name.clone(),
                    ChangePayload::AddColumn {
                        column: column.clone(),
                    },
                )),
            }
        }

        for column in &old.columns {
            if claimed.contains(column.name()) {
                continue;
            }
            self.push(
                Change::new(
                    new.name.clone(),
                    ChangePayload::DropColumn {
                        column: column.clone(),
                    },
                )
                .flagged(format!(
                    "dropping column `{}.{}` permanently deletes its data",
                    new.name, column.name
                )),
            );
        }
    }

    fn alter(&mut self, table: &SmolStr, from: &Column, to: Column) {
        if columns_equivalent(from, &to) {
            return;
        }

        let mut notes = Vec::new();
        if is_unsafe_type_change(&from.data_type, &to.data_type) {
            notes.push(format!(
                "changing `{}` from {} to {} may fail or lose data",
                from.name, from.data_type, to.data_type
            ));
        }
        if from.nullable && !to.nullable && to.default.is_none() {
            notes.push(format!(
                "setting `{}` NOT NULL without a default fails if existing rows contain NULL",
                from.name
            ));
        }

        let change = Change::new(
            table.clone(),
            ChangePayload::AlterColumn {
                from: from.clone(),
                to,
            },
        );
        self.push(if notes.is_empty() {
            change
        } else {
            change.flagged(notes.join("; "))
        });
    }

    fn indexes(&mut self, old: &Table, new: &Table) {
        // Signatures include the table, so both sides use the new name
        let sig = |index: &Index| index_signature(new.name(), index);

        let mut old_left: Vec<&Index> = Vec::new();
        let mut new_left: Vec<&Index> = Vec::new();
        for index in new.indexes.values() {
            match old.get_index(index.name()) {
                Some(prev) => {
                    if sig(prev) != sig(index) || !same_column_order(&prev.columns, &index.columns)
                    {
                        self.drop_index(new, prev);
                        self.push(Change::new(
                            new.name.clone(),
                            ChangePayload::CreateIndex {
                                index: index.clone(),
                            },
                        ));
                    }
                }
                None => new_left.push(index),
            }
        }
        for index in old.indexes.values() {
            if new.get_index(index.name()).is_none() {
                old_left.push(index);
            }
        }

        let mut by_signature = SignaturePool::new(old_left.iter().map(|i| (sig(*i), *i)));
        for index in new_left {
            let signature = sig(index);
            match by_signature.take(&signature) {
                Some(prev) => self.trace.event(&DiffEvent::SignatureMatched {
                    table: new.name(),
                    object: SignatureObject::Index,
                    old_name: prev.name(),
                    new_name: index.name(),
                    signature: signature.short(),
                }),
                None => self.push(Change::new(
                    new.name.clone(),
                    ChangePayload::CreateIndex {
                        index: index.clone(),
                    },
                )),
            }
        }
        for prev in by_signature.remaining() {
            self.drop_index(new, prev);
        }
    }

    fn drop_index(&mut self, table: &Table, index: &Index) {
        let change = Change::new(
            table.name.clone(),
            ChangePayload::DropIndex {
                index: index.clone(),
            },
        );
        self.push(if index.enforces_uniqueness() {
            change.flagged(format!(
                "dropping {} index `{}` removes a uniqueness guarantee",
                if index.primary { "primary" } else { "unique" },
                index.name
            ))
        } else {
            change
        });
    }

    fn constraints(&mut self, old: &Table, new: &Table) {
        let mut old_left: Vec<&Constraint> = Vec::new();
        let mut new_left: Vec<&Constraint> = Vec::new();
        for constraint in new.constraints.values() {
            match old.get_constraint(constraint.name()) {
                Some(prev) => {
                    if constraint_signature(prev) != constraint_signature(constraint) {
                        self.drop_constraint(new, prev, None);
                        self.add_constraint(new, constraint);
                    }
                }
                None => new_left.push(constraint),
            }
        }
        for constraint in old.constraints.values() {
            if new.get_constraint(constraint.name()).is_none() {
                old_left.push(constraint);
            }
        }

        let mut by_signature =
            SignaturePool::new(old_left.iter().map(|c| (constraint_signature(*c), *c)));
        for constraint in new_left {
            let signature = constraint_signature(constraint);
            if let Some(prev) = by_signature.take(&signature) {
                self.trace.event(&DiffEvent::SignatureMatched {
                    table: new.name(),
                    object: SignatureObject::Constraint,
                    old_name: prev.name(),
                    new_name: constraint.name(),
                    signature: signature.short(),
                });
                self.drop_constraint(new, prev, Some(constraint));
            }
            self.add_constraint(new, constraint);
        }
        for prev in by_signature.remaining() {
            self.drop_constraint(new, prev, None);
        }
    }

    fn add_constraint(&mut self, table: &Table, constraint: &Constraint) {
        self.push(Change::new(
            table.name.clone(),
            ChangePayload::AddConstraint {
                constraint: constraint.clone(),
            },
        ));
    }

    /// Drop `constraint`. When `replacement` is an identical constraint
    /// under another name the drop is half of a rename and loses nothing.
    fn drop_constraint(
        &mut self,
        table: &Table,
        constraint: &Constraint,
        replacement: Option<&Constraint>,
    ) {
        let change = Change::new(
            table.name.clone(),
            ChangePayload::DropConstraint {
                constraint: constraint.clone(),
            },
        );
        let change = match replacement {
            Some(next) => change.noted(format!(
                "constraint `{}` is renamed to `{}`; the definition is unchanged",
                constraint.name, next.name
            )),
            None if constraint.is_protective() => change.flagged(format!(
                "dropping {} constraint `{}` weakens data integrity",
                constraint.kind, constraint.name
            )),
            None => change,
        };
        self.push(change);
    }
}

/// Unmatched old objects grouped by signature, handed out in input order.
struct SignaturePool<'a, T> {
    entries: Vec<(Signature, &'a T, bool)>,
}

impl<'a, T> SignaturePool<'a, T> {
    fn new(items: impl Iterator<Item = (Signature, &'a T)>) -> Self {
        Self {
            entries: items.map(|(s, t)| (s, t, false)).collect(),
        }
    }

    fn take(&mut self, signature: &Signature) -> Option<&'a T> {
        let entry = self
            .entries
            .iter_mut()
            .find(|(s, _, taken)| !*taken && s == signature)?;
        entry.2 = true;
        Some(entry.1)
    }

    fn remaining(self) -> impl Iterator<Item = &'a T> {
        self.entries
            .into_iter()
            .filter(|(_, _, taken)| !taken)
            .map(|(_, t, _)| t)
    }
}

fn same_column_order(a: &[SmolStr], b: &[SmolStr]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| normalize_identifier(x) == normalize_identifier(y))
}

/// Whether two columns are the same once spellings are canonicalized.
fn columns_equivalent(a: &Column, b: &Column) -> bool {
    normalize_type(&a.data_type) == normalize_type(&b.data_type)
        && a.default.as_deref().map(normalize_default) == b.default.as_deref().map(normalize_default)
        && a.nullable == b.nullable
        && a.primary_key == b.primary_key
        && a.unique == b.unique
        && a.auto_increment == b.auto_increment
        && a.foreign_key == b.foreign_key
        && a.check.as_deref().map(normalize_check) == b.check.as_deref().map(normalize_check)
}
