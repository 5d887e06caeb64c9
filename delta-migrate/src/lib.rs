//! # delta-migrate
//!
//! Schema diffing and migration DDL synthesis for PostgreSQL.
//!
//! This crate provides functionality for:
//! - Canonicalizing type and default spellings so catalog noise is not a change
//! - Ordering tables by foreign key dependency
//! - Diffing two schema snapshots into a list of typed changes, each
//!   classified as safe or unsafe
//! - Generating up/down SQL for those changes in an executable order
//! - Reversing hand-written DDL when no structured schema is available
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ Old snapshot │────▶│                │     │             │
//! └──────────────┘     │ Schema Differ  │────▶│ SQL Gen     │────▶ up.sql
//! ┌──────────────┐     │                │     │             │────▶ down.sql
//! │ New snapshot │────▶│                │     └─────────────┘
//! └──────────────┘     └────────────────┘
//!                        │            │
//!                        ▼            ▼
//!                 ┌────────────┐ ┌──────────────┐
//!                 │ Canonical  │ │ Dep. Sorter  │
//!                 └────────────┘ └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use delta_migrate::{MigrateConfig, MigrationPlanner, RenameHint};
//! use delta_schema::{Column, Schema, Table};
//!
//! let old = Schema::new().table(
//!     Table::new("users")
//!         .column(Column::new("id", "bigint").primary_key())
//!         .column(Column::new("username", "text")),
//! );
//! let new = Schema::new().table(
//!     Table::new("users")
//!         .column(Column::new("id", "int8").primary_key())
//!         .column(Column::new("user_name", "text")),
//! );
//!
//! let planner = MigrationPlanner::new(MigrateConfig::default());
//! let plan = planner
//!     .plan(&old, &new, &[RenameHint::column("username", "user_name")])
//!     .unwrap();
//!
//! assert_eq!(plan.diff.summary, "1 renamed column(s)");
//! assert_eq!(plan.sql.up, "ALTER TABLE users RENAME COLUMN username TO user_name;");
//! ```
//!
//! ## Unsafe changes
//!
//! Dropping tables or columns, narrowing a column type, adding `NOT NULL`
//! without a default, and dropping a unique, primary, or foreign key object
//! are unsafe. They are still reported and rendered, but the generated SQL
//! is commented out behind a warning unless
//! [`GeneratorConfig::comment_out_unsafe`] is turned off.

pub mod canonical;
pub mod change;
pub mod config;
pub mod depsort;
pub mod diff;
pub mod error;
pub mod planner;
pub mod reverse;
pub mod safety;
pub mod sql;
pub mod trace;

// Re-exports
pub use canonical::{
    Signature, constraint_signature, index_signature, normalize_default, normalize_type,
};
pub use change::{Change, ChangeKind, ChangePayload, RenameHint, RenameScope};
pub use config::{GeneratorConfig, MigrateConfig};
pub use depsort::DependencySorter;
pub use diff::{DiffResult, SchemaDiffer};
pub use error::{MigrateResult, MigrationError};
pub use planner::{MigrationPlan, MigrationPlanner};
pub use reverse::StatementReverser;
pub use safety::is_unsafe_type_change;
pub use sql::{MigrationSql, PostgresSqlGenerator};
pub use trace::{DiffEvent, DiffTrace, NoopTrace, SignatureObject, TracingTrace};
