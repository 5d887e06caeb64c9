//! Structured diagnostics emitted while diffing.
//!
//! The diff engine never prints. It reports what it matched and why through a
//! [`DiffTrace`] supplied by the caller; [`TracingTrace`] forwards everything
//! to the `tracing` subscriber and [`NoopTrace`] drops it.

use crate::change::ChangeKind;

/// Kind of object matched by signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureObject {
    Index,
    Constraint,
}

impl SignatureObject {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Constraint => "constraint",
        }
    }
}

/// An observation made by the diff engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffEvent<'a> {
    /// A table present in both snapshots is being compared.
    TableMatched { table: &'a str },
    /// A table was matched to its old name through a rename hint.
    TableRenamed { from: &'a str, to: &'a str },
    /// A column was matched to its old name through a rename hint.
    ColumnRenamed {
        table: &'a str,
        from: &'a str,
        to: &'a str,
    },
    /// Two differently named objects have the same signature.
    SignatureMatched {
        table: &'a str,
        object: SignatureObject,
        old_name: &'a str,
        new_name: &'a str,
        signature: &'a str,
    },
    /// A change was recorded.
    ChangeEmitted {
        kind: ChangeKind,
        table: &'a str,
        is_unsafe: bool,
    },
}

/// Receiver of [`DiffEvent`]s.
pub trait DiffTrace: Send + Sync {
    /// Handle one event.
    fn event(&self, event: &DiffEvent<'_>);
}

/// Forwards events to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTrace;

impl DiffTrace for TracingTrace {
    fn event(&self, event: &DiffEvent<'_>) {
        match *event {
            DiffEvent::TableMatched { table } => {
                tracing::trace!(table, "comparing table");
            }
            DiffEvent::TableRenamed { from, to } => {
                tracing::debug!(from, to, "table renamed by hint");
            }
            DiffEvent::ColumnRenamed { table, from, to } => {
                tracing::debug!(table, from, to, "column renamed by hint");
            }
            DiffEvent::SignatureMatched {
                table,
                object,
                old_name,
                new_name,
                signature,
            } => {
                tracing::debug!(
                    table,
                    object = object.as_str(),
                    old_name,
                    new_name,
                    signature,
                    "matched by signature"
                );
            }
            DiffEvent::ChangeEmitted {
                kind,
                table,
                is_unsafe,
            } => {
                tracing::debug!(kind = %kind, table, is_unsafe, "change detected");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTrace;

impl DiffTrace for NoopTrace {
    fn event(&self, _event: &DiffEvent<'_>) {}
}
