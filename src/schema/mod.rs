//! # Table Metadata Catalog
//!
//! Compensation needs two facts about every table it touches: the declared
//! column order and the primary-key columns. Those come from a
//! [`TableMetaProvider`], normally backed by the resource's own metadata
//! cache. [`Catalog`] is the in-memory provider used when the metadata is
//! known up front (tests, embedded use, replay tooling).
//!
//! ## Name Resolution
//!
//! Table names are resolved in this order:
//! 1. The name as written, ignoring identifier quotes and ASCII case
//! 2. For a schema-qualified name (`schema.table`), the bare table name
//! 3. If not found, an error naming the table
//!
//! ## Usage Example
//!
//! ```ignore
//! let catalog = Catalog::new().with_table(
//!     TableMeta::new("t_user")
//!         .with_column(ColumnMeta::new("id", DataType::Int))
//!         .with_primary_key(["id"]),
//! )?;
//!
//! let meta = catalog.table_meta("app.T_USER")?;
//! ```

mod catalog;
mod table;

use std::fmt;
use std::sync::Arc;

use eyre::Result;

pub use catalog::Catalog;
pub use table::{same_identifier, ColumnMeta, TableMeta};

/// Resolves table names to their metadata.
pub trait TableMetaProvider: fmt::Debug + Send + Sync {
    fn table_meta(&self, table_name: &str) -> Result<Arc<TableMeta>>;
}
