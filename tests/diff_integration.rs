//! Integration tests for schema diffing.
//!
//! These tests run whole snapshots through the diff engine and check the
//! resulting change lists, safety flags, and summaries.

use std::sync::{Arc, Mutex};

use delta::migrate::{
    ChangeKind, ChangePayload, DiffEvent, DiffTrace, MigrationError, MigrationPlanner, RenameHint,
    SchemaDiffer, is_unsafe_type_change,
};
use delta::schema::{Column, Constraint, ForeignKeyRef, Index, Schema, Table};
use pretty_assertions::assert_eq;

fn users() -> Table {
    Table::new("users")
        .column(Column::new("id", "bigint").primary_key().auto_increment())
        .column(Column::new("email", "varchar(255)").not_null())
}

fn compare(old: &Schema, new: &Schema) -> delta::migrate::DiffResult {
    SchemaDiffer::new().compare(old, new, &[]).expect("diff failed")
}

fn shop() -> Schema {
    Schema::new()
        .table(
            Table::new("orders")
                .column(Column::new("id", "bigint").primary_key())
                .column(
                    Column::new("customer_id", "bigint")
                        .not_null()
                        .references(ForeignKeyRef::new("customers", "id")),
                )
                .column(Column::new("total", "numeric(10,2)").not_null().default_value("0"))
                .index(Index::new("idx_orders_customer", ["customer_id"]))
                .constraint(Constraint::check("orders_total_check", "CHECK (total >= 0)")),
        )
        .table(
            Table::new("customers")
                .column(Column::new("id", "bigint").primary_key())
                .column(Column::new("name", "text").not_null()),
        )
}

// ============================================================================
// Scenarios
// ============================================================================

/// Test creating a table
#[test]
fn test_scenario_create_table() {
    let result = compare(&Schema::new(), &Schema::new().table(users()));

    assert_eq!(result.changes.len(), 1);
    assert_eq!(result.changes[0].kind(), ChangeKind::CreateTable);
    assert!(!result.has_unsafe_changes);
    assert_eq!(result.summary, "1 new table(s)");
    assert!(result.changes[0].sql.starts_with("CREATE TABLE users ("));
}

/// Test dropping a table
#[test]
fn test_scenario_drop_table() {
    let result = compare(&Schema::new().table(users()), &Schema::new());

    assert_eq!(result.changes.len(), 1);
    let change = &result.changes[0];
    assert_eq!(change.kind(), ChangeKind::DropTable);
    assert!(change.is_unsafe);
    assert!(change.safety_note.is_some());
    assert_eq!(change.sql, "DROP TABLE IF EXISTS users CASCADE;");
    assert_eq!(
        result.summary,
        "1 dropped table(s) [WARNING: Contains unsafe changes]"
    );
}

/// Test adding a nullable column
#[test]
fn test_scenario_add_column() {
    let old = Schema::new().table(users());
    let new = Schema::new().table(users().column(Column::new("bio", "text")));
    let result = compare(&old, &new);

    assert_eq!(result.changes.len(), 1);
    assert_eq!(result.changes[0].kind(), ChangeKind::AddColumn);
    assert_eq!(result.changes[0].column(), Some("bio"));
    assert!(!result.has_unsafe_changes);
    assert_eq!(result.changes[0].sql, "ALTER TABLE users ADD COLUMN bio text;");
}

/// Test widening a column while making it NOT NULL without a default
#[test]
fn test_scenario_alter_column_not_null() {
    let old = Schema::new().table(users().column(Column::new("name", "varchar(50)")));
    let new = Schema::new().table(users().column(Column::new("name", "varchar(100)").not_null()));
    let result = compare(&old, &new);

    assert_eq!(result.changes.len(), 1);
    let change = &result.changes[0];
    assert_eq!(change.kind(), ChangeKind::AlterColumn);
    assert!(change.is_unsafe);
    let note = change.safety_note.as_deref().unwrap_or_default();
    assert!(note.contains("NOT NULL"));
    // The widening itself is safe
    assert!(!note.contains("may fail or lose data"));
    assert_eq!(
        change.sql,
        "ALTER TABLE users ALTER COLUMN name TYPE varchar(100) USING name::varchar(100);\n\
         ALTER TABLE users ALTER COLUMN name SET NOT NULL;"
    );
}

/// Test creating a unique index
#[test]
fn test_scenario_create_unique_index() {
    let old = Schema::new().table(users());
    let new = Schema::new().table(users().index(Index::new("idx_users_email", ["email"]).unique()));
    let result = compare(&old, &new);

    assert_eq!(result.changes.len(), 1);
    assert_eq!(result.changes[0].kind(), ChangeKind::CreateIndex);
    assert!(!result.has_unsafe_changes);
    assert_eq!(
        result.changes[0].sql,
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email);"
    );
}

// ============================================================================
// Properties
// ============================================================================

/// Test that comparing a schema with itself yields nothing
#[test]
fn test_identical_schema_has_no_changes() {
    let schema = shop();
    let result = compare(&schema, &schema);

    assert!(result.is_empty());
    assert!(!result.has_unsafe_changes);
    assert_eq!(result.summary, "No changes detected");
}

/// Test that a JSON snapshot in catalog spelling matches a hand-built schema
#[test]
fn test_catalog_snapshot_matches_declared_schema() {
    let introspected = Schema::from_json(
        r#"{
            "tables": {
                "users": {
                    "name": "users",
                    "columns": [
                        { "name": "id", "type": "integer", "nullable": false, "primary_key": true, "auto_increment": true },
                        { "name": "email", "type": "character varying(255)", "nullable": false },
                        { "name": "status", "type": "character varying(20)", "default": "'active'::character varying" },
                        { "name": "created_at", "type": "timestamp with time zone", "default": "CURRENT_TIMESTAMP" },
                        { "name": "tags", "type": "_text", "default": "'{}'::text[]" }
                    ],
                    "indexes": {
                        "users_email_key": { "name": "users_email_key", "columns": ["email"], "unique": true }
                    }
                }
            }
        }"#,
    )
    .expect("valid snapshot");

    let declared = Schema::new().table(
        Table::new("users")
            .column(Column::new("id", "int4").primary_key().auto_increment())
            .column(Column::new("email", "varchar(255)").not_null())
            .column(Column::new("status", "varchar(20)").default_value("'active'"))
            .column(Column::new("created_at", "timestamptz").default_value("now()"))
            .column(Column::new("tags", "text[]").default_value("ARRAY[]::text[]"))
            .index(Index::new("idx_users_email", ["email"]).unique()),
    );

    let result = compare(&introspected, &declared);
    assert!(result.is_empty(), "unexpected changes: {:?}", result.changes);
}

/// Test the type widening table
#[test]
fn test_type_widening_table() {
    for (from, to) in [
        ("smallint", "integer"),
        ("integer", "bigint"),
        ("real", "double precision"),
        ("varchar(50)", "text"),
        ("varchar(50)", "varchar(100)"),
        ("timestamp", "timestamptz"),
    ] {
        assert!(!is_unsafe_type_change(from, to), "{from} -> {to} should be safe");
    }

    for (from, to) in [("text", "varchar(50)"), ("bigint", "integer"), ("text", "integer")] {
        assert!(is_unsafe_type_change(from, to), "{from} -> {to} should be unsafe");
    }

    for ty in ["text", "varchar(10)", "numeric(10,2)", "jsonb", "weird custom type"] {
        assert!(!is_unsafe_type_change(ty, ty));
    }
}

// ============================================================================
// Renames
// ============================================================================

/// Test that a column hint turns drop+add into one rename
#[test]
fn test_column_rename_hint() {
    let old = Schema::new().table(users().column(Column::new("username", "text")));
    let new = Schema::new().table(users().column(Column::new("user_name", "text")));

    let without_hint = compare(&old, &new);
    assert_eq!(without_hint.count(ChangeKind::AddColumn), 1);
    assert_eq!(without_hint.count(ChangeKind::DropColumn), 1);
    assert!(without_hint.has_unsafe_changes);

    let result = SchemaDiffer::new()
        .compare(&old, &new, &[RenameHint::column("username", "user_name")])
        .unwrap();
    assert_eq!(result.changes.len(), 1);
    assert_eq!(result.changes[0].kind(), ChangeKind::RenameColumn);
    assert!(!result.has_unsafe_changes);
    assert_eq!(
        result.changes[0].sql,
        "ALTER TABLE users RENAME COLUMN username TO user_name;"
    );
}

/// Test that a table hint renames and still diffs the table contents
#[test]
fn test_table_rename_hint() {
    let old = Schema::new().table(users().column(Column::new("bio", "text")));
    let new = Schema::new().table(
        Table::new("accounts")
            .column(Column::new("id", "bigint").primary_key().auto_increment())
            .column(Column::new("email", "varchar(255)").not_null())
            .column(Column::new("handle", "text")),
    );

    let result = SchemaDiffer::new()
        .compare(&old, &new, &[RenameHint::table("users", "accounts")])
        .unwrap();

    let kinds: Vec<ChangeKind> = result.changes.iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![ChangeKind::RenameTable, ChangeKind::AddColumn, ChangeKind::DropColumn]
    );
    assert_eq!(result.count(ChangeKind::CreateTable), 0);
    assert_eq!(result.count(ChangeKind::DropTable), 0);
    assert!(matches!(
        &result.changes[0].payload,
        ChangePayload::RenameTable { from, to } if from == "users" && to == "accounts"
    ));
}

/// Test that a renamed but otherwise identical index is not a change
#[test]
fn test_renamed_index_is_deduplicated() {
    let old = Schema::new().table(users().index(Index::new("idx_email", ["email"])));
    let new = Schema::new().table(users().index(Index::new("users_email_idx", ["email"])));

    assert!(compare(&old, &new).is_empty());
}

/// Test that a renamed constraint is dropped and re-added without a warning
#[test]
fn test_renamed_constraint_is_drop_and_add() {
    let old = Schema::new().table(
        users().constraint(Constraint::check("users_email_check", "CHECK (email <> '')")),
    );
    let new = Schema::new().table(
        users().constraint(Constraint::check("users_email_nonempty", "CHECK (EMAIL  <> '')")),
    );
    let result = compare(&old, &new);

    assert_eq!(result.count(ChangeKind::DropConstraint), 1);
    assert_eq!(result.count(ChangeKind::AddConstraint), 1);
    assert!(!result.has_unsafe_changes);
}

// ============================================================================
// Ordering and errors
// ============================================================================

/// Test that new tables are created after the tables they reference
#[test]
fn test_create_tables_in_dependency_order() {
    let result = compare(&Schema::new(), &shop());
    let created: Vec<&str> = result
        .changes_of(ChangeKind::CreateTable)
        .map(|c| c.table.as_str())
        .collect();
    assert_eq!(created, vec!["customers", "orders"]);
}

/// Test that self references are not cycles
#[test]
fn test_self_reference_is_not_a_cycle() {
    let employees = Table::new("employees")
        .column(Column::new("id", "bigint").primary_key())
        .column(Column::new("manager_id", "bigint").references(ForeignKeyRef::new("employees", "id")));
    let result = compare(&Schema::new(), &Schema::new().table(employees));
    assert_eq!(result.count(ChangeKind::CreateTable), 1);
}

/// Test that a foreign key cycle is reported with a table name
#[test]
fn test_foreign_key_cycle_is_an_error() {
    let a = Table::new("a")
        .column(Column::new("id", "int").primary_key())
        .column(Column::new("b_id", "int").references(ForeignKeyRef::new("b", "id")));
    let b = Table::new("b")
        .column(Column::new("id", "int").primary_key())
        .column(Column::new("a_id", "int").references(ForeignKeyRef::new("a", "id")));

    let err = SchemaDiffer::new()
        .compare(&Schema::new(), &Schema::new().table(a).table(b), &[])
        .unwrap_err();
    assert!(err.is_structural());
    match err {
        MigrationError::CircularDependency { table } => assert!(table == "a" || table == "b"),
        other => panic!("unexpected error: {other}"),
    }
}

/// Test that an existing foreign key cycle does not block comparison
#[test]
fn test_existing_cycle_compares_cleanly() {
    let a = Table::new("a")
        .column(Column::new("id", "int").primary_key())
        .column(Column::new("b_id", "int").references(ForeignKeyRef::new("b", "id")));
    let b = Table::new("b")
        .column(Column::new("id", "int").primary_key())
        .column(Column::new("a_id", "int").references(ForeignKeyRef::new("a", "id")));
    let schema = Schema::new().table(a).table(b);

    let result = compare(&schema, &schema);
    assert!(result.is_empty());
    assert_eq!(result.summary, "No changes detected");

    let plan = MigrationPlanner::default().plan(&schema, &schema, &[]).unwrap();
    assert!(plan.is_empty());
}

// ============================================================================
// Tracing
// ============================================================================

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl DiffTrace for Recorder {
    fn event(&self, event: &DiffEvent<'_>) {
        let line = match event {
            DiffEvent::SignatureMatched {
                old_name, new_name, ..
            } => format!("signature {old_name} -> {new_name}"),
            DiffEvent::ColumnRenamed { table, from, to } => format!("column {table}.{from} -> {to}"),
            _ => return,
        };
        self.events.lock().unwrap().push(line);
    }
}

/// Test that the caller's trace sees signature matches and renames
#[test]
fn test_trace_receives_matches() {
    let recorder = Arc::new(Recorder::default());
    let differ = SchemaDiffer::new().with_trace(recorder.clone());

    let old = Schema::new().table(
        users()
            .column(Column::new("username", "text"))
            .index(Index::new("idx_email", ["email"])),
    );
    let new = Schema::new().table(
        users()
            .column(Column::new("user_name", "text"))
            .index(Index::new("users_email_idx", ["email"])),
    );
    differ
        .compare(&old, &new, &[RenameHint::column("username", "user_name")])
        .unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "column users.username -> user_name".to_string(),
            "signature idx_email -> users_email_idx".to_string(),
        ]
    );
}
