//! # Typed Compensation Errors
//!
//! Fallible operations in this crate return `eyre::Result`. The failure kinds a
//! caller is expected to react to are raised as [`UndoError`] values wrapped in
//! the report, so they survive context layers added with `WrapErr`:
//!
//! ```ignore
//! match compensator.compensate(&mut conn, &branch) {
//!     Err(report) => match undo_error(&report) {
//!         Some(UndoError::ConflictDetected { table, .. }) => retry_later(table),
//!         _ => return Err(report),
//!     },
//!     Ok(report) => report,
//! }
//! ```
//!
//! | Kind                      | Raised by                                  |
//! |---------------------------|--------------------------------------------|
//! | `ParseFailure`            | lexer/parser, recognizer construction      |
//! | `UnsupportedDialectOrKind`| recognizer and executor registries         |
//! | `ConflictDetected`        | `CompensationReport::into_result`          |
//! | `BindingError`            | predicate rendering, undo parameter binding|
//! | `InvalidUndoLog`          | snapshot constructors, undo log decoding   |

use thiserror::Error;

/// Failure kinds of recognition and compensation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UndoError {
    /// SQL text could not be parsed for the dialect.
    #[error("cannot parse {dialect} statement: {message}")]
    ParseFailure { dialect: String, message: String },

    /// No recognizer or executor exists for the dialect and statement kind.
    #[error("unsupported {kind} for dialect {dialect}")]
    UnsupportedDialectOrKind { dialect: String, kind: String },

    /// Rows changed by another transaction since the branch captured them.
    #[error("dirty data on {table}: {conflicts} row(s) changed since capture")]
    ConflictDetected { table: String, conflicts: usize },

    /// A placeholder could not be bound to a value.
    #[error("parameter binding failed: {message}")]
    BindingError { message: String },

    /// An undo log entry violates its capture-time invariants.
    #[error("invalid undo log: {message}")]
    InvalidUndoLog { message: String },
}

impl UndoError {
    pub fn parse(dialect: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::ParseFailure {
            dialect: dialect.to_string(),
            message: message.into(),
        }
    }

    pub fn unsupported(dialect: impl std::fmt::Display, kind: impl Into<String>) -> Self {
        Self::UnsupportedDialectOrKind {
            dialect: dialect.to_string(),
            kind: kind.into(),
        }
    }

    pub fn binding(message: impl Into<String>) -> Self {
        Self::BindingError {
            message: message.into(),
        }
    }

    pub fn invalid_log(message: impl Into<String>) -> Self {
        Self::InvalidUndoLog {
            message: message.into(),
        }
    }
}

/// Finds the typed kind carried by a report, if any.
pub fn undo_error(report: &eyre::Report) -> Option<&UndoError> {
    report.downcast_ref::<UndoError>()
}
