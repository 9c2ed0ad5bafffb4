//! Reverses an INSERT by deleting the inserted rows by primary key.

use eyre::Result;
use tracing::debug;

use super::sql_builder::delete_by_primary_key;
use super::statement::BoundStatement;
use super::validation::ExpectedImages;
use super::{push_values, UndoExecutor};
use crate::records::{Field, SqlUndoLog, TableRecords};
use crate::sql::DbType;

#[derive(Debug)]
pub struct InsertUndoExecutor<'e> {
    entry: &'e SqlUndoLog,
    dialect: DbType,
}

impl<'e> InsertUndoExecutor<'e> {
    pub fn new(entry: &'e SqlUndoLog, dialect: DbType) -> Self {
        Self { entry, dialect }
    }
}

impl UndoExecutor for InsertUndoExecutor<'_> {
    fn entry(&self) -> &SqlUndoLog {
        self.entry
    }

    fn dialect(&self) -> DbType {
        self.dialect
    }

    fn build_undo_sql(&self) -> Result<String> {
        let sql = delete_by_primary_key(self.dialect, self.entry.table_meta());
        debug!(dialect = %self.dialect, table = self.entry.table_name(), %sql, "built INSERT undo");
        Ok(sql)
    }

    fn undo_rows(&self) -> &TableRecords {
        self.entry.after_image()
    }

    fn undo_values(&self, _index: usize) -> Result<Vec<&Field>> {
        Ok(Vec::new())
    }

    fn undo_prepare(
        &self,
        statement: &mut BoundStatement,
        _undo_values: &[&Field],
        pk_values: &[&Field],
    ) -> Result<()> {
        push_values(statement, pk_values);
        Ok(())
    }

    fn expected_images(&self) -> ExpectedImages<'_> {
        ExpectedImages {
            current: Some(self.entry.after_image()),
            restored: None,
        }
    }
}
