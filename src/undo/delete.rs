//! Reverses a DELETE by inserting the deleted rows back.

use eyre::Result;
use tracing::debug;

use super::sql_builder::{fields_in_column_order, insert_row};
use super::statement::BoundStatement;
use super::validation::ExpectedImages;
use super::{pick_fields, push_values, undo_row, UndoExecutor};
use crate::error::UndoError;
use crate::records::{Field, SqlUndoLog, TableRecords};
use crate::sql::DbType;

#[derive(Debug)]
pub struct DeleteUndoExecutor<'e> {
    entry: &'e SqlUndoLog,
    dialect: DbType,
}

impl<'e> DeleteUndoExecutor<'e> {
    pub fn new(entry: &'e SqlUndoLog, dialect: DbType) -> Self {
        Self { entry, dialect }
    }

    /// Columns captured in the first deleted row, in metadata order.
    fn insert_columns(&self) -> Vec<&str> {
        match self.entry.before_image().rows().first() {
            Some(row) => fields_in_column_order(self.entry.table_meta(), row)
                .into_iter()
                .map(Field::name)
                .collect(),
            None => self
                .entry
                .table_meta()
                .columns()
                .iter()
                .map(|c| c.name())
                .collect(),
        }
    }
}

impl UndoExecutor for DeleteUndoExecutor<'_> {
    fn entry(&self) -> &SqlUndoLog {
        self.entry
    }

    fn dialect(&self) -> DbType {
        self.dialect
    }

    fn build_undo_sql(&self) -> Result<String> {
        let columns = self.insert_columns();
        if columns.is_empty() {
            eyre::bail!(UndoError::invalid_log(format!(
                "DELETE on '{}' captured no columns",
                self.entry.table_name()
            )));
        }
        let sql = insert_row(self.dialect, self.entry.table_meta(), columns);
        debug!(dialect = %self.dialect, table = self.entry.table_name(), %sql, "built DELETE undo");
        Ok(sql)
    }

    fn undo_rows(&self) -> &TableRecords {
        self.entry.before_image()
    }

    fn undo_values(&self, index: usize) -> Result<Vec<&Field>> {
        let row = undo_row(self.entry.before_image(), index)?;
        pick_fields(row, &self.insert_columns(), self.entry.table_name())
    }

    fn undo_prepare(
        &self,
        statement: &mut BoundStatement,
        undo_values: &[&Field],
        _pk_values: &[&Field],
    ) -> Result<()> {
        push_values(statement, undo_values);
        Ok(())
    }

    fn expected_images(&self) -> ExpectedImages<'_> {
        ExpectedImages {
            current: None,
            restored: Some(self.entry.before_image()),
        }
    }
}
