//! # Compensation Engine Constants
//!
//! This module centralizes the constants shared by SQL recognition, undo SQL
//! generation and the dirty check. Values that depend on each other live next
//! to each other and the relationships are enforced with compile-time
//! assertions.
//!
//! ## Dependency Graph
//!
//! ```text
//! MAX_IN_LIST_SIZE (1000)
//!       │
//!       ├─> default EngineConfig::max_in_list_size
//!       │     Upper bound on primary keys per dirty-check query. Oracle
//!       │     rejects IN lists longer than 1000 elements (ORA-01795).
//!       │
//!       └─> MIN_IN_LIST_SIZE (must be <=)
//!
//! WHERE_AND_SEPARATOR ("\n\tAND ")
//!       │
//!       └─> Top-level conjunction separator for rendered predicates.
//!           WHERE_OR_SEPARATOR follows the same layout for disjunctions.
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use crate::config::{MAX_IN_LIST_SIZE, WHERE_AND_SEPARATOR};
//! ```

// ============================================================================
// Dirty-Check Batching
// ============================================================================

/// Maximum number of primary keys placed in one `IN (...)` lookup.
pub const MAX_IN_LIST_SIZE: usize = 1000;

/// Smallest accepted `max_in_list_size`.
pub const MIN_IN_LIST_SIZE: usize = 1;

const _: () = assert!(
    MIN_IN_LIST_SIZE <= MAX_IN_LIST_SIZE,
    "MIN_IN_LIST_SIZE must not exceed MAX_IN_LIST_SIZE"
);

const _: () = assert!(MIN_IN_LIST_SIZE > 0, "an IN list needs at least one key");

// ============================================================================
// Predicate Rendering
// ============================================================================

/// Joins top-level conjuncts of a rendered WHERE predicate.
pub const WHERE_AND_SEPARATOR: &str = "\n\tAND ";

/// Joins top-level disjuncts of a rendered WHERE predicate.
pub const WHERE_OR_SEPARATOR: &str = "\n\tOR ";

// ============================================================================
// Undo Log Encoding
// ============================================================================

/// Serializer used when the configuration names none.
pub const DEFAULT_LOG_SERIALIZATION: &str = "json";

/// Whether the dirty check runs before compensation by default.
pub const DEFAULT_DATA_VALIDATION: bool = true;
