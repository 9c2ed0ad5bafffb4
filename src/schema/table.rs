//! # Table Metadata
//!
//! `TableMeta` describes the columns and primary key of a table as far as
//! compensation needs them: the declared column order (compensating INSERTs
//! list columns in this order) and the primary-key columns in declared order
//! (compensating DELETE/UPDATE statements key on them, the dirty check looks
//! rows up by them).
//!
//! ```rust,ignore
//! use branchundo::schema::{ColumnMeta, TableMeta};
//! use branchundo::types::DataType;
//!
//! let meta = TableMeta::new("orders")
//!     .with_column(ColumnMeta::new("id", DataType::BigInt).not_null())
//!     .with_column(ColumnMeta::new("amount", DataType::Decimal))
//!     .with_primary_key(["id"]);
//! ```
//!
//! ## Name Matching
//!
//! Column names are matched case-insensitively after stripping identifier
//! quotes, so a row captured as `ID` matches a column declared as `"id"` or
//! `` `Id` ``. A table may carry no column list at all; compensation then
//! falls back to the order in which fields appear in the captured row.
//!
//! ## Thread Safety
//!
//! Metadata is immutable once built and is `Send + Sync`; providers hand it
//! out behind `Arc`.

use serde::{Deserialize, Serialize};

use crate::sql::dialect::unquote_identifier;
use crate::types::DataType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    name: String,
    data_type: DataType,
    nullable: bool,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    table_name: String,
    columns: Vec<ColumnMeta>,
    primary_keys: Vec<String>,
}

impl TableMeta {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnMeta) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_columns(mut self, columns: impl IntoIterator<Item = ColumnMeta>) -> Self {
        self.columns.extend(columns);
        self
    }

    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Primary-key column names in declared order.
    pub fn primary_key_names(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_keys.is_empty()
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_keys
            .iter()
            .any(|pk| same_identifier(pk, column))
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| same_identifier(c.name(), name))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| same_identifier(c.name(), name))
    }

    /// Index of a primary-key column within the declared key.
    pub fn primary_key_index(&self, name: &str) -> Option<usize> {
        self.primary_keys
            .iter()
            .position(|pk| same_identifier(pk, name))
    }
}

/// Compares two identifiers ignoring quotes and ASCII case.
pub fn same_identifier(a: &str, b: &str) -> bool {
    unquote_identifier(a).eq_ignore_ascii_case(unquote_identifier(b))
}
