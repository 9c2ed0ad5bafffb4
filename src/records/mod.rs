//! # Row Snapshot Model
//!
//! This module holds the data captured around every statement a branch
//! transaction executes, and from which compensation is later derived.
//!
//! ## Structure
//!
//! ```text
//! BranchUndoLog (xid, branch id)
//! └── SqlUndoLog*            one per INSERT / UPDATE / DELETE, execution order
//!     ├── before_image: TableRecords
//!     └── after_image:  TableRecords
//!         ├── table_meta: TableMeta   (column order, primary key)
//!         └── Row*
//!             └── Field*               (name, key type, type tag, value)
//! ```
//!
//! ## Invariants
//!
//! | Type         | Invariant                                              |
//! |--------------|--------------------------------------------------------|
//! | `Row`        | column names unique (case-insensitive, unquoted)       |
//! | `TableRecords` | field key roles follow the table metadata            |
//! | `SqlUndoLog` | image shapes match the statement kind (see type docs)  |
//!
//! Every invariant is checked at construction and again when decoding, so
//! a snapshot that exists is valid. Snapshots are immutable afterwards: fields
//! are private and only read accessors are exposed.
//!
//! ## Module Structure
//!
//! - `field`: `Field` and `KeyType`
//! - `row`: `Row` with key extraction and snapshot comparison
//! - `table_records`: `TableRecords`, the row image of one table
//! - `undo_log`: `SqlUndoLog` and `BranchUndoLog`

mod field;
mod row;
mod table_records;
mod undo_log;


pub use field::{Field, KeyType};
pub use row::{KeyFields, Row};
pub use table_records::TableRecords;
pub use undo_log::{BranchUndoLog, SqlUndoLog};
