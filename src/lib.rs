//! # Delta
//!
//! Schema diffing and migration DDL synthesis for PostgreSQL.
//!
//! Delta provides:
//! - A snapshot model for relational schemas (tables, columns, indexes, constraints)
//! - A diff engine that turns two snapshots into typed, safety-classified changes
//! - Up/down SQL generation in an order that executes cleanly
//! - Best-effort reversal of hand-written DDL
//!
//! ## Quick Start
//!
//! ```rust
//! use delta::prelude::*;
//!
//! let old = Schema::new();
//! let new = Schema::new().table(
//!     Table::new("users")
//!         .column(Column::new("id", "bigint").primary_key().auto_increment())
//!         .column(Column::new("email", "varchar(255)").not_null().unique()),
//! );
//!
//! let plan = MigrationPlanner::default().plan(&old, &new, &[]).unwrap();
//!
//! assert_eq!(plan.diff.summary, "1 new table(s)");
//! assert!(plan.sql.up.starts_with("CREATE TABLE users ("));
//! assert_eq!(plan.sql.down, "DROP TABLE IF EXISTS users CASCADE;");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Schema snapshot model and validation.
pub mod schema {
    pub use delta_schema::*;
}

/// Diffing, SQL generation, and statement reversal.
pub mod migrate {
    pub use delta_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        Change, ChangeKind, DiffResult, GeneratorConfig, MigrateConfig, MigrationPlan,
        MigrationPlanner, MigrationSql, PostgresSqlGenerator, RenameHint, SchemaDiffer,
        StatementReverser,
    };
    pub use crate::schema::{Column, Constraint, ForeignKeyRef, Index, Schema, Table};
}

// Re-export key types at the crate root
pub use migrate::{MigrationError, MigrationPlanner};
pub use schema::{Schema, SchemaError};
