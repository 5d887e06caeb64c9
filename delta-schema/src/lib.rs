//! # delta-schema
//!
//! Relational schema snapshots for the Delta migration engine.
//!
//! This crate provides:
//! - Value types describing a schema at one point in time (tables, columns,
//!   indexes, constraints)
//! - A builder API for assembling snapshots by hand or from a schema producer
//! - JSON (de)serialization of snapshots
//! - Structural validation of a snapshot before it is diffed
//!
//! ## Example
//!
//! ```rust
//! use delta_schema::{Column, Index, Schema, Table, validate_schema};
//!
//! let mut schema = Schema::new();
//! schema.add_table(
//!     Table::new("users")
//!         .column(Column::new("id", "uuid").primary_key())
//!         .column(Column::new("email", "varchar(255)").not_null())
//!         .index(Index::new("idx_users_email", ["email"]).unique()),
//! );
//!
//! validate_schema(&schema).unwrap();
//! assert_eq!(schema.tables.len(), 1);
//! ```

pub mod ast;
pub mod error;
pub mod validator;

pub use ast::*;
pub use error::{SchemaError, SchemaResult};
pub use validator::{Validator, validate_schema};
