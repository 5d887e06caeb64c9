//! Integration tests for migration SQL generation and reversal.

use delta::prelude::*;
use pretty_assertions::assert_eq;

fn plain() -> MigrationPlanner {
    MigrationPlanner::new(
        MigrateConfig::default().generator(GeneratorConfig::new().comment_out_unsafe(false)),
    )
}

fn customers() -> Table {
    Table::new("customers")
        .column(Column::new("id", "bigint").primary_key())
        .column(Column::new("name", "text").not_null())
}

fn orders() -> Table {
    Table::new("orders")
        .column(Column::new("id", "bigint").primary_key())
        .column(
            Column::new("customer_id", "bigint")
                .not_null()
                .references(ForeignKeyRef::new("customers", "id")),
        )
}

/// Test the full up/down SQL for a fresh schema
#[test]
fn test_create_schema_migration() {
    let new = Schema::new().table(orders()).table(customers());
    let plan = MigrationPlanner::default().plan(&Schema::new(), &new, &[]).unwrap();

    assert_eq!(
        plan.sql.up,
        "CREATE TABLE customers (\n    id bigint PRIMARY KEY,\n    name text NOT NULL\n);\n\n\
         CREATE TABLE orders (\n    id bigint PRIMARY KEY,\n    customer_id bigint NOT NULL REFERENCES customers (id)\n);"
    );
    assert_eq!(
        plan.sql.down,
        "DROP TABLE IF EXISTS orders CASCADE;\n\nDROP TABLE IF EXISTS customers CASCADE;"
    );
    assert!(plan.warnings.is_empty());
}

/// Test that destructive statements are commented out by default
#[test]
fn test_unsafe_statements_are_commented_out() {
    let old = Schema::new().table(customers().column(Column::new("legacy_code", "text")));
    let new = Schema::new().table(customers());
    let plan = MigrationPlanner::default().plan(&old, &new, &[]).unwrap();

    assert!(plan.diff.has_unsafe_changes);
    assert_eq!(plan.warnings.len(), 1);
    for line in plan.sql.up.lines() {
        assert!(line.starts_with("-- "), "executable line in up: {line}");
    }
    assert!(plan.sql.up.starts_with("-- WARNING: dropping column `customers.legacy_code`"));
    assert!(plan.sql.up.ends_with("-- ALTER TABLE customers DROP COLUMN IF EXISTS legacy_code;"));

    // The structured change keeps the executable statement
    assert_eq!(
        plan.diff.changes[0].sql,
        "ALTER TABLE customers DROP COLUMN IF EXISTS legacy_code;"
    );
}

/// Test that additive changes run before destructive ones
#[test]
fn test_phase_ordering() {
    let old = Schema::new().table(
        customers()
            .column(Column::new("fax", "text"))
            .index(Index::new("idx_customers_name", ["name"])),
    );
    let new = Schema::new()
        .table(customers().column(Column::new("email", "text")))
        .table(orders());
    let plan = plain().plan(&old, &new, &[]).unwrap();

    let up: Vec<&str> = plan.sql.up.split("\n\n").collect();
    assert_eq!(up.len(), 4);
    assert!(up[0].starts_with("CREATE TABLE orders ("));
    assert_eq!(up[1], "ALTER TABLE customers ADD COLUMN email text;");
    assert_eq!(up[2], "DROP INDEX IF EXISTS idx_customers_name;");
    assert_eq!(up[3], "ALTER TABLE customers DROP COLUMN IF EXISTS fax;");

    let down: Vec<&str> = plan.sql.down.split("\n\n").collect();
    assert_eq!(
        down,
        vec![
            "-- Column data is not restored\nALTER TABLE customers ADD COLUMN fax text;",
            "CREATE INDEX IF NOT EXISTS idx_customers_name ON customers (name);",
            "ALTER TABLE customers DROP COLUMN IF EXISTS email;",
            "DROP TABLE IF EXISTS orders CASCADE;",
        ]
    );
}

/// Test that a renamed table's column changes address the right name
#[test]
fn test_table_rename_migration_is_executable_in_order() {
    let old = Schema::new().table(customers().column(Column::new("fax", "text")));
    let new = Schema::new().table(
        Table::new("clients")
            .column(Column::new("id", "bigint").primary_key())
            .column(Column::new("name", "text").not_null())
            .column(Column::new("email", "text")),
    );
    let plan = plain()
        .plan(&old, &new, &[RenameHint::table("customers", "clients")])
        .unwrap();

    assert_eq!(
        plan.sql.up,
        "ALTER TABLE customers ADD COLUMN email text;\n\n\
         ALTER TABLE customers RENAME TO clients;\n\n\
         ALTER TABLE clients DROP COLUMN IF EXISTS fax;"
    );
    assert_eq!(
        plan.sql.down,
        "-- Column data is not restored\nALTER TABLE clients ADD COLUMN fax text;\n\n\
         ALTER TABLE clients RENAME TO customers;\n\n\
         ALTER TABLE customers DROP COLUMN IF EXISTS email;"
    );
}

/// Test that replacing a unique index under the same name stays one commented unit
#[test]
fn test_unique_index_replacement_is_commented_out_together() {
    let users = |index: Index| {
        Schema::new().table(
            Table::new("users")
                .column(Column::new("id", "bigint").primary_key())
                .column(Column::new("email", "text").not_null())
                .column(Column::new("tenant_id", "bigint").not_null())
                .index(index),
        )
    };
    let old = users(Index::new("idx_users_email", ["email"]).unique());
    let new = users(Index::new("idx_users_email", ["email", "tenant_id"]).unique());
    let plan = MigrationPlanner::default().plan(&old, &new, &[]).unwrap();

    assert!(plan.diff.has_unsafe_changes);
    for line in plan.sql.up.lines().chain(plan.sql.down.lines()) {
        assert!(line.starts_with("-- "), "executable line: {line}");
    }
    assert_eq!(
        plan.sql.up,
        "-- WARNING: dropping unique index `idx_users_email` removes a uniqueness guarantee\n\
         -- Uncomment to apply:\n\
         -- DROP INDEX IF EXISTS idx_users_email;\n\
         -- CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email, tenant_id);"
    );
    assert!(plan.sql.down.ends_with(
        "-- DROP INDEX IF EXISTS idx_users_email;\n\
         -- CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email);"
    ));
}

/// Test that replacing a unique constraint under the same name stays one commented unit
#[test]
fn test_unique_constraint_replacement_is_commented_out_together() {
    let users = |constraint: Constraint| {
        Schema::new().table(
            Table::new("users")
                .column(Column::new("id", "bigint").primary_key())
                .column(Column::new("email", "text").not_null())
                .column(Column::new("tenant_id", "bigint").not_null())
                .constraint(constraint),
        )
    };
    let old = users(Constraint::unique("users_email_key", ["email"]));
    let new = users(Constraint::unique("users_email_key", ["email", "tenant_id"]));
    let plan = MigrationPlanner::default().plan(&old, &new, &[]).unwrap();

    assert!(plan.diff.has_unsafe_changes);
    for line in plan.sql.up.lines().chain(plan.sql.down.lines()) {
        assert!(line.starts_with("-- "), "executable line: {line}");
    }
    assert!(plan.sql.up.ends_with(
        "-- ALTER TABLE users DROP CONSTRAINT IF EXISTS users_email_key;\n\
         -- ALTER TABLE users ADD CONSTRAINT users_email_key UNIQUE (email, tenant_id);"
    ));
    assert!(plan.sql.down.ends_with(
        "-- ALTER TABLE users DROP CONSTRAINT IF EXISTS users_email_key;\n\
         -- ALTER TABLE users ADD CONSTRAINT users_email_key UNIQUE (email);"
    ));

    // Without commenting, both halves run
    let plan = plain().plan(&old, &new, &[]).unwrap();
    assert_eq!(
        plan.sql.up,
        "ALTER TABLE users DROP CONSTRAINT IF EXISTS users_email_key;\n\n\
         ALTER TABLE users ADD CONSTRAINT users_email_key UNIQUE (email, tenant_id);"
    );
}

/// Test backfilling when NOT NULL comes with a default
#[test]
fn test_not_null_with_default_backfills() {
    let old = Schema::new().table(customers().column(Column::new("tier", "text")));
    let new = Schema::new().table(
        customers().column(Column::new("tier", "text").not_null().default_value("'free'")),
    );
    let plan = MigrationPlanner::default().plan(&old, &new, &[]).unwrap();

    assert!(!plan.diff.has_unsafe_changes);
    assert_eq!(
        plan.sql.up,
        "ALTER TABLE customers ALTER COLUMN tier SET DEFAULT 'free';\n\
         UPDATE customers SET tier = 'free' WHERE tier IS NULL;\n\
         ALTER TABLE customers ALTER COLUMN tier SET NOT NULL;"
    );
    assert_eq!(
        plan.sql.down,
        "ALTER TABLE customers ALTER COLUMN tier DROP NOT NULL;\n\
         ALTER TABLE customers ALTER COLUMN tier DROP DEFAULT;"
    );
}

/// Test the UUIDv7 helper function preamble
#[test]
fn test_uuid_v7_helper_function() {
    let new = Schema::new().table(
        Table::new("events")
            .column(Column::new("id", "uuid").primary_key().default_value("uuid_generate_v7()")),
    );
    let plan = MigrationPlanner::default().plan(&Schema::new(), &new, &[]).unwrap();

    assert!(plan.sql.up.starts_with("CREATE OR REPLACE FUNCTION uuid_generate_v7()"));
    assert!(plan.sql.up.contains("LANGUAGE plpgsql"));
    assert!(plan.sql.up.ends_with(
        "CREATE TABLE events (\n    id uuid PRIMARY KEY DEFAULT uuid_generate_v7()\n);"
    ));
    assert_eq!(
        plan.sql.down,
        "DROP TABLE IF EXISTS events CASCADE;\n\nDROP FUNCTION IF EXISTS uuid_generate_v7();"
    );
}

/// Test that reversing the generated up SQL agrees with the generated down SQL
#[test]
fn test_reverser_agrees_with_generated_down() {
    let new = Schema::new().table(orders()).table(customers());
    let plan = MigrationPlanner::default().plan(&Schema::new(), &new, &[]).unwrap();

    assert_eq!(StatementReverser::new().reverse(&plan.sql.up), plan.sql.down);
}

/// Test that the checksum tracks the up SQL
#[test]
fn test_checksum_is_stable() {
    let new = Schema::new().table(customers());
    let first = MigrationPlanner::default().plan(&Schema::new(), &new, &[]).unwrap();
    let second = MigrationPlanner::default().plan(&Schema::new(), &new, &[]).unwrap();

    assert_eq!(first.sql.checksum(), second.sql.checksum());
    assert_eq!(first.sql.checksum().len(), 64);
    assert_ne!(first.sql.checksum(), MigrationSql::default().checksum());
}

/// Test planning with a tracing subscriber installed
#[test]
fn test_plan_with_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("delta_migrate=trace")
        .with_test_writer()
        .try_init();

    let old = Schema::new().table(customers());
    let new = Schema::new().table(customers().column(Column::new("email", "text")));
    let plan = MigrationPlanner::default().plan(&old, &new, &[]).unwrap();

    tracing::info!(summary = %plan.summary(), "planned");
    assert_eq!(plan.diff.summary, "1 new column(s)");
}

/// Test that a JSON snapshot round trip plans nothing
#[test]
fn test_snapshot_round_trip_plans_nothing() {
    let schema = Schema::new().table(customers()).table(orders());
    let json = schema.to_json().unwrap();
    let restored = Schema::from_json(&json).unwrap();

    let plan = MigrationPlanner::default().plan(&schema, &restored, &[]).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.summary(), "No changes to apply");
}
