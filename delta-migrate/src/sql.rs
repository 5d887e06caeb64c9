//! SQL generation for migrations.
//!
//! Every change becomes one or more steps, each a forward statement paired
//! with the statement that undoes it. A migration is the forward statements
//! in execution order and the backward statements in exactly the reverse
//! order.

use delta_schema::{Column, Constraint, ConstraintKind, ForeignKeyRef, Index, Table};
use sha2::{Digest, Sha256};
use smol_str::SmolStr;

use crate::canonical::{check_body, index_method, normalize_check, normalize_default, normalize_type};
use crate::change::{Change, ChangeKind, ChangePayload};
use crate::config::GeneratorConfig;
use crate::depsort::DependencySorter;
use crate::diff::DiffResult;
use crate::error::{MigrateResult, MigrationError};

/// Execution order of change kinds within a migration.
const PHASES: [ChangeKind; 11] = [
    ChangeKind::CreateTable,
    ChangeKind::AddColumn,
    ChangeKind::AlterColumn,
    ChangeKind::RenameColumn,
    ChangeKind::RenameTable,
    ChangeKind::CreateIndex,
    ChangeKind::AddConstraint,
    ChangeKind::DropConstraint,
    ChangeKind::DropIndex,
    ChangeKind::DropColumn,
    ChangeKind::DropTable,
];

/// Default expression that requires [`UUID_V7_FUNCTION`].
const UUID_V7_MARKER: &str = "uuid_generate_v7()";

/// UUIDv7 generator for servers without a native one.
const UUID_V7_FUNCTION: &str = "CREATE OR REPLACE FUNCTION uuid_generate_v7()
RETURNS uuid
AS $$
DECLARE
    unix_ts_ms bytea;
    uuid_bytes bytea;
BEGIN
    unix_ts_ms = substring(int8send(floor(extract(epoch FROM clock_timestamp()) * 1000)::bigint) FROM 3);
    uuid_bytes = uuid_send(gen_random_uuid());
    uuid_bytes = overlay(uuid_bytes PLACING unix_ts_ms FROM 1 FOR 6);
    uuid_bytes = set_byte(uuid_bytes, 6, (b'0111' || get_byte(uuid_bytes, 6)::bit(4))::bit(8)::int);
    RETURN encode(uuid_bytes, 'hex')::uuid;
END
$$
LANGUAGE plpgsql
VOLATILE;";

const DROP_UUID_V7_FUNCTION: &str = "DROP FUNCTION IF EXISTS uuid_generate_v7();";

/// Words that cannot be used as bare identifiers.
const RESERVED: &[&str] = &[
    "all", "alter", "and", "any", "as", "asc", "between", "both", "case", "cast", "check",
    "collate", "column", "constraint", "create", "cross", "current_date", "current_time",
    "current_timestamp", "current_user", "default", "delete", "desc", "distinct", "do", "drop",
    "else", "end", "except", "false", "fetch", "for", "foreign", "from", "grant", "group",
    "having", "in", "index", "inner", "insert", "intersect", "into", "is", "join", "key",
    "leading", "left", "like", "limit", "natural", "not", "null", "offset", "on", "only", "or",
    "order", "outer", "primary", "references", "returning", "right", "select", "session_user",
    "set", "some", "table", "then", "to", "trailing", "true", "union", "unique", "update",
    "user", "using", "values", "when", "where", "window", "with",
];

/// Check if an identifier needs quoting.
///
/// Bare identifiers fold to lower case, so anything that is not a lower-case
/// word, or that collides with a reserved word, must be quoted.
pub fn needs_quoting(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return true;
    };
    if first.is_ascii_digit() || RESERVED.contains(&name) {
        return true;
    }
    !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Quote an identifier, doubling embedded quotes.
pub fn escape_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an identifier if needed.
pub fn quote_identifier(name: &str) -> String {
    if needs_quoting(name) {
        escape_identifier(name)
    } else {
        name.to_string()
    }
}

/// Up and down SQL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSql {
    /// SQL to apply the migration.
    pub up: String,
    /// SQL to roll the migration back.
    pub down: String,
}

impl MigrationSql {
    /// Check if the migration is empty.
    pub fn is_empty(&self) -> bool {
        self.up.trim().is_empty()
    }

    /// SHA-256 of the up SQL, hex encoded.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.up.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A forward statement and its inverse.
#[derive(Debug)]
struct Step {
    up: String,
    down: String,
}

impl Step {
    fn new(up: impl Into<String>, down: impl Into<String>) -> Self {
        Self {
            up: up.into(),
            down: down.into(),
        }
    }
}

/// SQL generator for PostgreSQL.
#[derive(Debug, Clone, Default)]
pub struct PostgresSqlGenerator {
    config: GeneratorConfig,
}

impl PostgresSqlGenerator {
    /// Create a generator with the given settings.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Generator settings.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate up/down SQL for a single change.
    ///
    /// Unsafe changes are commented out on both sides when
    /// `comment_out_unsafe` is set.
    pub fn generate(&self, change: &Change) -> MigrateResult<MigrationSql> {
        let MigrationSql { up, down } = self.raw(change)?;

        if change.is_unsafe && self.config.comment_out_unsafe {
            let note = change.safety_note.as_deref().unwrap_or("unsafe change");
            return Ok(commented(&up, &down, note));
        }
        Ok(MigrationSql { up, down })
    }

    /// Generate SQL for hoisted drops and the create that reuses their name.
    ///
    /// When any change in the unit is unsafe and `comment_out_unsafe` is set,
    /// the whole unit is commented out as one block.
    fn generate_replacement(&self, unit: &[&Change]) -> MigrateResult<Vec<MigrationSql>> {
        let unsafe_notes: Vec<&str> = unit
            .iter()
            .filter(|c| c.is_unsafe)
            .map(|c| c.safety_note.as_deref().unwrap_or("unsafe change"))
            .collect();
        if unsafe_notes.is_empty() || !self.config.comment_out_unsafe {
            return unit.iter().map(|c| self.generate(c)).collect();
        }

        let mut up = Vec::with_capacity(unit.len());
        let mut down = Vec::with_capacity(unit.len());
        for change in unit {
            let raw = self.raw(change)?;
            up.push(raw.up);
            down.push(raw.down);
        }
        down.reverse();
        Ok(vec![commented(
            &up.join("\n"),
            &down.join("\n"),
            &unsafe_notes.join("; "),
        )])
    }

    /// Up/down SQL for a change, never commented out.
    fn raw(&self, change: &Change) -> MigrateResult<MigrationSql> {
        let steps = self.steps(change)?;
        let up = steps.iter().map(|s| s.up.as_str()).collect::<Vec<_>>().join("\n");
        let down = steps
            .iter()
            .rev()
            .map(|s| s.down.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(MigrationSql { up, down })
    }

    /// Forward SQL for a single change, never commented out.
    pub fn forward_sql(&self, change: &Change) -> MigrateResult<String> {
        Ok(self.raw(change)?.up)
    }

    /// Generate SQL for a whole diff.
    ///
    /// Changes run in phase order: tables are created (referenced tables
    /// first) before columns are added and altered, renames happen before
    /// new indexes and constraints are built, and drops come last. A drop
    /// that frees a name reused by a create in the same migration is moved
    /// directly in front of that create.
    pub fn generate_migration(&self, diff: &DiffResult) -> MigrateResult<MigrationSql> {
        let ordered = self.order(&diff.changes)?;
        let needs_helper = self.config.helper_functions && ordered.iter().any(|c| uses_uuid_v7(c));

        let mut up = Vec::new();
        let mut down = Vec::new();

        if needs_helper {
            up.push(UUID_V7_FUNCTION.to_string());
        }

        let mut i = 0;
        while i < ordered.len() {
            let end = replacement_end(&ordered, i);
            for sql in self.generate_replacement(&ordered[i..end])? {
                if !sql.up.is_empty() {
                    up.push(sql.up);
                }
                if !sql.down.is_empty() {
                    down.push(sql.down);
                }
            }
            i = end;
        }

        down.reverse();
        if needs_helper {
            down.push(DROP_UUID_V7_FUNCTION.to_string());
        }

        tracing::debug!(
            changes = ordered.len(),
            helper_functions = needs_helper,
            "generated migration sql"
        );

        Ok(MigrationSql {
            up: up.join("\n\n"),
            down: down.join("\n\n"),
        })
    }

    /// Sort changes into execution order.
    fn order<'a>(&self, changes: &'a [Change]) -> MigrateResult<Vec<&'a Change>> {
        let creates: Vec<(&Table, &Change)> = changes
            .iter()
            .filter_map(|c| match &c.payload {
                ChangePayload::CreateTable { table } => Some((table, c)),
                _ => None,
            })
            .collect();
        let tables: Vec<&Table> = creates.iter().map(|(t, _)| *t).collect();
        let sorted = DependencySorter::new().sort(&tables)?;

        let mut ordered = Vec::with_capacity(changes.len());
        for phase in PHASES {
            if phase == ChangeKind::CreateTable {
                for table in &sorted {
                    if let Some((_, change)) = creates.iter().find(|(t, _)| std::ptr::eq(*t, *table)) {
                        ordered.push(*change);
                    }
                }
            } else {
                ordered.extend(changes.iter().filter(|c| c.kind() == phase));
            }
        }

        Ok(hoist_replaced_drops(ordered))
    }

    fn steps(&self, change: &Change) -> MigrateResult<Vec<Step>> {
        let table = change.table.as_str();
        let steps = match &change.payload {
            ChangePayload::CreateTable { table } => vec![self.create_table(table)?],
            ChangePayload::DropTable { table } => vec![self.drop_table(table)?],
            ChangePayload::RenameTable { from, to } => vec![Step::new(
                format!("ALTER TABLE {} RENAME TO {};", self.ident(from), self.ident(to)),
                format!("ALTER TABLE {} RENAME TO {};", self.ident(to), self.ident(from)),
            )],
            ChangePayload::AddColumn { column } => vec![Step::new(
                format!(
                    "ALTER TABLE {} ADD COLUMN {};",
                    self.ident(table),
                    self.column_definition(column, column.primary_key)
                ),
                self.drop_column_sql(table, column.name()),
            )],
            ChangePayload::DropColumn { column } => vec![Step::new(
                self.drop_column_sql(table, column.name()),
                format!(
                    "-- Column data is not restored\nALTER TABLE {} ADD COLUMN {};",
                    self.ident(table),
                    self.column_definition(column, column.primary_key)
                ),
            )],
            ChangePayload::AlterColumn { from, to } => self.alter_column(table, from, to),
            ChangePayload::RenameColumn { from, to } => vec![Step::new(
                format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {};",
                    self.ident(table),
                    self.ident(from.name()),
                    self.ident(to.name())
                ),
                format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {};",
                    self.ident(table),
                    self.ident(to.name()),
                    self.ident(from.name())
                ),
            )],
            ChangePayload::CreateIndex { index } => vec![Step::new(
                self.create_index(table, index)?,
                self.drop_index(table, index),
            )],
            ChangePayload::DropIndex { index } => vec![Step::new(
                self.drop_index(table, index),
                self.create_index(table, index)?,
            )],
            ChangePayload::AddConstraint { constraint } => vec![Step::new(
                self.add_constraint(table, constraint)?,
                self.drop_constraint(table, constraint.name()),
            )],
            ChangePayload::DropConstraint { constraint } => vec![Step::new(
                self.drop_constraint(table, constraint.name()),
                self.add_constraint(table, constraint)?,
            )],
        };
        Ok(steps)
    }

    fn ident(&self, name: &str) -> String {
        if self.config.quote_all_identifiers {
            escape_identifier(name)
        } else {
            quote_identifier(name)
        }
    }

    fn ident_list(&self, names: &[SmolStr]) -> String {
        names
            .iter()
            .map(|n| self.ident(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Generate CREATE TABLE followed by the table's indexes.
    fn create_table(&self, table: &Table) -> MigrateResult<Step> {
        let has_pk_constraint = table
            .constraints
            .values()
            .any(|c| c.kind == ConstraintKind::PrimaryKey);
        let pk_columns = if has_pk_constraint {
            vec![]
        } else {
            table.primary_key_columns()
        };
        let inline_pk = pk_columns.len() == 1;

        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c, inline_pk && c.primary_key))
            .collect();

        // Composite primary key
        if pk_columns.len() > 1 {
            let names: Vec<SmolStr> = pk_columns.iter().map(|c| c.name.clone()).collect();
            lines.push(format!("PRIMARY KEY ({})", self.ident_list(&names)));
        }

        for constraint in table.constraints.values() {
            lines.push(format!(
                "CONSTRAINT {} {}",
                self.ident(constraint.name()),
                self.constraint_body(constraint)?
            ));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n    {}\n);",
            self.ident(table.name()),
            lines.join(",\n    ")
        )];
        for index in table.indexes.values() {
            statements.push(self.create_index(table.name(), index)?);
        }

        Ok(Step::new(statements.join("\n"), self.drop_table_sql(table.name())))
    }

    fn drop_table(&self, table: &Table) -> MigrateResult<Step> {
        let recreate = self.create_table(table)?;
        Ok(Step::new(
            recreate.down,
            format!("-- Table data is not restored\n{}", recreate.up),
        ))
    }

    fn drop_table_sql(&self, name: &str) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE;", self.ident(name))
    }

    fn drop_column_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN IF EXISTS {};",
            self.ident(table),
            self.ident(column)
        )
    }

    /// Generate a column definition.
    fn column_definition(&self, column: &Column, inline_pk: bool) -> String {
        let mut parts = vec![self.ident(column.name()), self.column_type(column)];
        let serial = column.auto_increment && is_serial(&parts[1]);

        if inline_pk {
            parts.push("PRIMARY KEY".to_string());
        } else if !column.nullable {
            parts.push("NOT NULL".to_string());
        }

        if column.unique && !column.primary_key {
            parts.push("UNIQUE".to_string());
        }

        // Serial columns get their default from the sequence
        if let Some(default) = column.default.as_deref().filter(|_| !serial) {
            parts.push(format!("DEFAULT {}", default));
        }

        if let Some(fk) = &column.foreign_key {
            parts.push(self.references(fk));
        }

        if let Some(check) = &column.check {
            parts.push(format!("CHECK ({})", check_body(check)));
        }

        parts.join(" ")
    }

    /// Column type, with integer auto-increment columns mapped to SERIAL
    /// variants.
    fn column_type(&self, column: &Column) -> String {
        if !column.auto_increment {
            return column.data_type.clone();
        }
        match normalize_type(&column.data_type).as_str() {
            "smallint" => "smallserial".to_string(),
            "integer" => "serial".to_string(),
            "bigint" => "bigserial".to_string(),
            _ => column.data_type.clone(),
        }
    }

    fn references(&self, fk: &ForeignKeyRef) -> String {
        let mut sql = format!(
            "REFERENCES {} ({})",
            self.ident(&fk.table),
            self.ident(&fk.column)
        );
        if !fk.on_delete.is_default() {
            sql.push_str(&format!(" ON DELETE {}", fk.on_delete));
        }
        if !fk.on_update.is_default() {
            sql.push_str(&format!(" ON UPDATE {}", fk.on_update));
        }
        sql
    }

    /// Generate ALTER COLUMN steps, one per changed property.
    ///
    /// `to` carries the column's current name; renames are separate changes.
    fn alter_column(&self, table: &str, from: &Column, to: &Column) -> Vec<Step> {
        let t = self.ident(table);
        let c = self.ident(from.name());
        let alter = |action: &str| format!("ALTER TABLE {} ALTER COLUMN {} {};", t, c, action);
        let mut steps = Vec::new();

        // Type
        if normalize_type(&from.data_type) != normalize_type(&to.data_type) {
            steps.push(Step::new(
                alter(&format!("TYPE {} USING {}::{}", to.data_type, c, to.data_type)),
                alter(&format!("TYPE {} USING {}::{}", from.data_type, c, from.data_type)),
            ));
        }

        // Default
        let default_sql = |default: Option<&str>| match default {
            Some(expr) => alter(&format!("SET DEFAULT {}", expr)),
            None => alter("DROP DEFAULT"),
        };
        if from.default.as_deref().map(normalize_default) != to.default.as_deref().map(normalize_default) {
            steps.push(Step::new(
                default_sql(to.default.as_deref()),
                default_sql(from.default.as_deref()),
            ));
        }

        // Nullability
        if from.nullable != to.nullable {
            if to.nullable {
                steps.push(Step::new(alter("DROP NOT NULL"), alter("SET NOT NULL")));
            } else {
                let mut up = String::new();
                if let Some(default) = &to.default {
                    up.push_str(&format!(
                        "UPDATE {} SET {} = {} WHERE {} IS NULL;\n",
                        t, c, default, c
                    ));
                }
                up.push_str(&alter("SET NOT NULL"));
                steps.push(Step::new(up, alter("DROP NOT NULL")));
            }
        }

        // Unique
        if from.unique != to.unique {
            let name = self.ident(&format!("{}_{}_key", table, from.name()));
            let add = format!("ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({});", t, name, c);
            let drop = format!("ALTER TABLE {} DROP CONSTRAINT IF EXISTS {};", t, name);
            steps.push(toggle(to.unique, add, drop));
        }

        // Primary key
        if from.primary_key != to.primary_key {
            let name = self.ident(&format!("{}_pkey", table));
            let add = format!("ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({});", t, name, c);
            let drop = format!("ALTER TABLE {} DROP CONSTRAINT IF EXISTS {};", t, name);
            steps.push(toggle(to.primary_key, add, drop));
        }

        // Identity
        if from.auto_increment != to.auto_increment {
            steps.push(toggle(
                to.auto_increment,
                alter("ADD GENERATED BY DEFAULT AS IDENTITY"),
                alter("DROP IDENTITY IF EXISTS"),
            ));
        }

        // Foreign key
        if from.foreign_key != to.foreign_key {
            let name = self.ident(&format!("{}_{}_fkey", table, from.name()));
            let add = |fk: &ForeignKeyRef| {
                format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) {};",
                    t,
                    name,
                    c,
                    self.references(fk)
                )
            };
            let drop = format!("ALTER TABLE {} DROP CONSTRAINT IF EXISTS {};", t, name);
            if let Some(fk) = &from.foreign_key {
                steps.push(Step::new(drop.clone(), add(fk)));
            }
            if let Some(fk) = &to.foreign_key {
                steps.push(Step::new(add(fk), drop.clone()));
            }
        }

        // Check
        if from.check.as_deref().map(normalize_check) != to.check.as_deref().map(normalize_check) {
            let name = self.ident(&format!("{}_{}_check", table, from.name()));
            let add = |expr: &str| {
                format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({});",
                    t,
                    name,
                    check_body(expr)
                )
            };
            let drop = format!("ALTER TABLE {} DROP CONSTRAINT IF EXISTS {};", t, name);
            if let Some(expr) = &from.check {
                steps.push(Step::new(drop.clone(), add(expr)));
            }
            if let Some(expr) = &to.check {
                steps.push(Step::new(add(expr), drop.clone()));
            }
        }

        steps
    }

    /// Generate CREATE INDEX, or ADD CONSTRAINT for a primary index.
    fn create_index(&self, table: &str, index: &Index) -> MigrateResult<String> {
        if index.columns.is_empty() {
            return Err(MigrationError::invalid_change(
                ChangeKind::CreateIndex,
                format!("index `{}` on `{}` has no columns", index.name, table),
            ));
        }
        let columns = index
            .columns
            .iter()
            .map(|c| self.index_column(c))
            .collect::<Vec<_>>()
            .join(", ");

        if index.primary {
            return Ok(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({});",
                self.ident(table),
                self.ident(index.name()),
                columns
            ));
        }

        let mut sql = format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {}",
            if index.unique { "UNIQUE " } else { "" },
            self.ident(index.name()),
            self.ident(table)
        );
        if !index.is_default_method() {
            sql.push_str(&format!(" USING {}", index_method(index)));
        }
        sql.push_str(&format!(" ({})", columns));
        if let Some(predicate) = &index.predicate {
            sql.push_str(&format!(" WHERE {}", predicate.trim()));
        }
        sql.push(';');
        Ok(sql)
    }

    fn drop_index(&self, table: &str, index: &Index) -> String {
        if index.primary {
            self.drop_constraint(table, index.name())
        } else {
            format!("DROP INDEX IF EXISTS {};", self.ident(index.name()))
        }
    }

    /// Index keys may be expressions; only plain names are quoted.
    fn index_column(&self, column: &str) -> String {
        let is_name = column
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$');
        if is_name { self.ident(column) } else { column.to_string() }
    }

    fn add_constraint(&self, table: &str, constraint: &Constraint) -> MigrateResult<String> {
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {};",
            self.ident(table),
            self.ident(constraint.name()),
            self.constraint_body(constraint)?
        ))
    }

    fn drop_constraint(&self, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {};",
            self.ident(table),
            self.ident(name)
        )
    }

    /// Constraint clause after `CONSTRAINT name`.
    fn constraint_body(&self, constraint: &Constraint) -> MigrateResult<String> {
        let definition = constraint.definition.trim().trim_end_matches(';').trim_end();
        let invalid = |message: String| {
            MigrationError::invalid_change(ChangeKind::AddConstraint, message)
        };

        match constraint.kind {
            ConstraintKind::PrimaryKey | ConstraintKind::Unique => {
                if !constraint.columns.is_empty() {
                    Ok(format!(
                        "{} ({})",
                        constraint.kind,
                        self.ident_list(&constraint.columns)
                    ))
                } else if !definition.is_empty() {
                    Ok(definition.to_string())
                } else {
                    Err(invalid(format!(
                        "{} constraint `{}` has no columns and no definition",
                        constraint.kind, constraint.name
                    )))
                }
            }
            ConstraintKind::Check => {
                if definition.is_empty() {
                    return Err(invalid(format!(
                        "CHECK constraint `{}` has no expression",
                        constraint.name
                    )));
                }
                Ok(format!("CHECK ({})", check_body(definition)))
            }
            ConstraintKind::ForeignKey => {
                if definition.is_empty() {
                    return Err(invalid(format!(
                        "FOREIGN KEY constraint `{}` has no definition",
                        constraint.name
                    )));
                }
                let starts_with = |keyword: &str| {
                    definition
                        .get(..keyword.len())
                        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
                };
                if starts_with("references") && !constraint.columns.is_empty() {
                    Ok(format!(
                        "FOREIGN KEY ({}) {}",
                        self.ident_list(&constraint.columns),
                        definition
                    ))
                } else {
                    Ok(definition.to_string())
                }
            }
        }
    }
}

fn toggle(enable: bool, add: String, drop: String) -> Step {
    if enable {
        Step::new(add, drop)
    } else {
        Step::new(drop, add)
    }
}

fn is_serial(ty: &str) -> bool {
    matches!(ty, "smallserial" | "serial" | "bigserial" | "serial2" | "serial4" | "serial8")
}

/// Comment out every line of `sql` behind a warning header.
fn comment_out(sql: &str, note: &str) -> String {
    let mut out = format!("-- WARNING: {}\n-- Uncomment to apply:", note);
    for line in sql.lines() {
        out.push_str("\n-- ");
        out.push_str(line);
    }
    out
}

fn commented(up: &str, down: &str, note: &str) -> MigrationSql {
    MigrationSql {
        up: comment_out(up, note),
        down: comment_out(down, &format!("reverts an unsafe change: {}", note)),
    }
}

/// End of the unit starting at `start`: the drops hoisted in front of a
/// create plus that create, or the single change otherwise.
fn replacement_end(ordered: &[&Change], start: usize) -> usize {
    let mut end = start;
    while end < ordered.len()
        && matches!(ordered[end].kind(), ChangeKind::DropIndex | ChangeKind::DropConstraint)
    {
        end += 1;
    }
    match ordered.get(end) {
        Some(create)
            if end > start && ordered[start..end].iter().all(|drop| replaces(drop, create)) =>
        {
            end + 1
        }
        _ => start + 1,
    }
}

/// Whether a drop removes the name a later create in the batch reuses.
fn replaces(drop: &Change, create: &Change) -> bool {
    if drop.table != create.table {
        return false;
    }
    match (&drop.payload, &create.payload) {
        (ChangePayload::DropIndex { index: old }, ChangePayload::CreateIndex { index: new }) => {
            old.name == new.name
        }
        (
            ChangePayload::DropConstraint { constraint: old },
            ChangePayload::AddConstraint { constraint: new },
        ) => {
            old.name == new.name
                || (old.kind == ConstraintKind::PrimaryKey && new.kind == ConstraintKind::PrimaryKey)
        }
        _ => false,
    }
}

fn hoist_replaced_drops(ordered: Vec<&Change>) -> Vec<&Change> {
    let mut hoisted = vec![false; ordered.len()];
    let mut result = Vec::with_capacity(ordered.len());
    for (i, change) in ordered.iter().enumerate() {
        if hoisted[i] {
            continue;
        }
        if matches!(change.kind(), ChangeKind::CreateIndex | ChangeKind::AddConstraint) {
            for (j, candidate) in ordered.iter().enumerate().skip(i + 1) {
                if !hoisted[j] && replaces(candidate, change) {
                    hoisted[j] = true;
                    result.push(*candidate);
                }
            }
        }
        result.push(*change);
    }
    result
}

fn uses_uuid_v7(change: &Change) -> bool {
    let has_marker = |column: &Column| {
        column
            .default
            .as_deref()
            .is_some_and(|d| d.to_ascii_lowercase().contains(UUID_V7_MARKER))
    };
    match &change.payload {
        ChangePayload::CreateTable { table } => table.columns.iter().any(has_marker),
        ChangePayload::AddColumn { column } => has_marker(column),
        ChangePayload::AlterColumn { to, .. } => has_marker(to),
        _ => false,
    }
}
