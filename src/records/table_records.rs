//! Row image of one table: the rows a statement touched, before or after it ran.

use eyre::Result;
use serde::{Deserialize, Serialize};

use super::row::Row;
use crate::error::UndoError;
use crate::schema::TableMeta;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableRecordsRepr")]
pub struct TableRecords {
    table_name: String,
    table_meta: TableMeta,
    rows: Vec<Row>,
}

#[derive(Deserialize)]
struct TableRecordsRepr {
    table_name: String,
    table_meta: TableMeta,
    rows: Vec<Row>,
}

impl TryFrom<TableRecordsRepr> for TableRecords {
    type Error = UndoError;

    fn try_from(repr: TableRecordsRepr) -> Result<Self, Self::Error> {
        if !crate::schema::same_identifier(&repr.table_name, repr.table_meta.table_name()) {
            return Err(UndoError::invalid_log(format!(
                "image of table '{}' carries metadata of '{}'",
                repr.table_name,
                repr.table_meta.table_name()
            )));
        }
        Ok(TableRecords::from_parts(repr.table_meta, repr.rows))
    }
}

impl TableRecords {
    /// Builds an image, flagging each field's key role from `meta`.
    pub fn new(meta: TableMeta, rows: Vec<Row>) -> Self {
        Self::from_parts(meta, rows)
    }

    pub fn empty(meta: TableMeta) -> Self {
        Self::from_parts(meta, Vec::new())
    }

    fn from_parts(meta: TableMeta, mut rows: Vec<Row>) -> Self {
        for row in &mut rows {
            row.mark_keys(&meta);
        }
        Self {
            table_name: meta.table_name().to_string(),
            table_meta: meta,
            rows,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn table_meta(&self) -> &TableMeta {
        &self.table_meta
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Replaces the metadata, re-deriving key roles.
    ///
    /// Used when metadata is refreshed from a provider at rollback time.
    pub fn with_meta(self, meta: TableMeta) -> Self {
        Self::from_parts(meta, self.rows)
    }

    /// Row-by-row equality of two images of the same table.
    pub fn same_rows(&self, other: &TableRecords) -> bool {
        self.rows.len() == other.rows.len()
            && self
                .rows
                .iter()
                .zip(&other.rows)
                .all(|(a, b)| a.len() == b.len() && a.matches(b))
    }

    /// Checks that every row carries a non-NULL value for each key column.
    pub fn check_keys(&self) -> Result<()> {
        for (index, row) in self.rows.iter().enumerate() {
            row.key_fields(&self.table_meta).map_err(|e| {
                e.wrap_err(format!("row {} of {} image", index, self.table_name))
            })?;
        }
        Ok(())
    }
}
