//! Value types for relational schema snapshots.
//!
//! Everything in this module is a plain value: a snapshot is built once by a
//! schema producer (catalog introspection, model declarations, a JSON file)
//! and is only read afterwards.

mod column;
mod constraint;
mod index;
mod schema;
mod table;
mod types;

pub use column::*;
pub use constraint::*;
pub use index::*;
pub use schema::*;
pub use table::*;
pub use types::*;
