//! Reverses an UPDATE by writing the before-image values back by key.

use eyre::Result;
use tracing::debug;

use super::sql_builder::{non_key_fields_in_column_order, update_by_primary_key};
use super::statement::BoundStatement;
use super::validation::ExpectedImages;
use super::{pick_fields, push_values, undo_row, UndoExecutor};
use crate::error::UndoError;
use crate::records::{Field, SqlUndoLog, TableRecords};
use crate::sql::DbType;

#[derive(Debug)]
pub struct UpdateUndoExecutor<'e> {
    entry: &'e SqlUndoLog,
    dialect: DbType,
}

impl<'e> UpdateUndoExecutor<'e> {
    pub fn new(entry: &'e SqlUndoLog, dialect: DbType) -> Self {
        Self { entry, dialect }
    }

    /// Non-key columns of the first before row, in metadata order.
    fn set_columns(&self) -> Vec<&str> {
        let meta = self.entry.table_meta();
        match self.entry.before_image().rows().first() {
            Some(row) => non_key_fields_in_column_order(meta, row)
                .into_iter()
                .map(Field::name)
                .collect(),
            None => meta
                .columns()
                .iter()
                .map(|c| c.name())
                .filter(|name| !meta.is_primary_key(name))
                .collect(),
        }
    }
}

impl UndoExecutor for UpdateUndoExecutor<'_> {
    fn entry(&self) -> &SqlUndoLog {
        self.entry
    }

    fn dialect(&self) -> DbType {
        self.dialect
    }

    fn build_undo_sql(&self) -> Result<String> {
        let columns = self.set_columns();
        if columns.is_empty() {
            eyre::bail!(UndoError::invalid_log(format!(
                "UPDATE on '{}' captured no non-key columns to restore",
                self.entry.table_name()
            )));
        }
        let sql = update_by_primary_key(self.dialect, self.entry.table_meta(), columns);
        debug!(dialect = %self.dialect, table = self.entry.table_name(), %sql, "built UPDATE undo");
        Ok(sql)
    }

    fn undo_rows(&self) -> &TableRecords {
        self.entry.after_image()
    }

    fn undo_values(&self, index: usize) -> Result<Vec<&Field>> {
        let meta = self.entry.table_meta();
        let before = undo_row(self.entry.before_image(), index)?;
        let after = undo_row(self.entry.after_image(), index)?;

        let before_keys = before.key_fields(meta)?;
        let after_keys = after.key_fields(meta)?;
        let unchanged = before_keys
            .iter()
            .zip(after_keys.iter())
            .all(|(b, a)| b.value().same_as(a.value()));
        if !unchanged {
            eyre::bail!(UndoError::binding(format!(
                "primary key of row {} of {} differs between before and after images",
                index,
                meta.table_name()
            )));
        }

        pick_fields(before, &self.set_columns(), meta.table_name())
    }

    fn undo_prepare(
        &self,
        statement: &mut BoundStatement,
        undo_values: &[&Field],
        pk_values: &[&Field],
    ) -> Result<()> {
        push_values(statement, undo_values);
        push_values(statement, pk_values);
        Ok(())
    }

    fn expected_images(&self) -> ExpectedImages<'_> {
        ExpectedImages {
            current: Some(self.entry.after_image()),
            restored: Some(self.entry.before_image()),
        }
    }
}
