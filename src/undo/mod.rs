//! # Undo Execution
//!
//! Turns one captured undo log entry into the statement that reverses it and
//! applies that statement row by row, after checking that nobody else has
//! touched the rows since they were captured.
//!
//! ## Compensation by Kind
//!
//! | Entry  | Compensating statement | Source image | Bound per row               |
//! |--------|------------------------|--------------|-----------------------------|
//! | INSERT | `DELETE ... WHERE pk`  | after        | key values                  |
//! | UPDATE | `UPDATE ... SET ...`   | after        | before non-key values, keys |
//! | DELETE | `INSERT ... VALUES`    | before       | every column                |
//!
//! ## Flow
//!
//! ```text
//! BranchUndoLog ──► rollback_order() ──► SqlUndoLog
//!                                            │
//!                  UndoExecutorRegistry ──► holder(dialect) ──► Box<dyn UndoExecutor>
//!                                                                      │
//!            dirty check (validation) ◄── current rows ◄── UndoConnection::query
//!                     │
//!           Proceed ──► bind_row(i) ──► UndoConnection::execute
//! ```
//!
//! ## Module Structure
//!
//! - `sql_builder`: Compensating SQL text and column ordering
//! - `statement`: `CompensatingStatement` and `BoundStatement`
//! - `insert`, `update`, `delete`: One executor per entry kind
//! - `holder`: Executor construction per dialect and the holder registry
//! - `validation`: Dirty check of current rows against the captured images
//! - `connection`: The database seam compensation runs through
//! - `compensator`: Drives a whole branch undo log
//! - `codec`: Named undo log serializers

pub mod codec;
pub mod compensator;
pub mod connection;
mod delete;
pub mod holder;
mod insert;
pub mod sql_builder;
pub mod statement;
mod update;
pub mod validation;

use std::fmt;

use eyre::Result;

use crate::error::UndoError;
use crate::records::{Field, Row, SqlUndoLog, TableRecords};
use crate::sql::{DbType, SqlType};

pub use codec::{parser_by_name, JsonUndoLogParser, UndoLogParser};
pub use compensator::{CompensationReport, EntryReport, UndoCompensator};
pub use connection::UndoConnection;
pub use delete::DeleteUndoExecutor;
pub use holder::{executor_for, DialectExecutorHolder, UndoExecutorHolder, UndoExecutorRegistry};
pub use insert::InsertUndoExecutor;
pub use statement::{BoundStatement, CompensatingStatement};
pub use update::UpdateUndoExecutor;
pub use validation::{ExpectedImages, RowState};

/// Builds and binds the compensation of one undo log entry.
pub trait UndoExecutor: fmt::Debug {
    fn entry(&self) -> &SqlUndoLog;

    fn dialect(&self) -> DbType;

    fn sql_type(&self) -> SqlType {
        self.entry().sql_type()
    }

    /// Compensating SQL text with `?` placeholders.
    fn build_undo_sql(&self) -> Result<String>;

    /// The image whose rows are compensated one by one.
    fn undo_rows(&self) -> &TableRecords;

    /// Values the compensation restores for row `index`, excluding the key
    /// values the statement is keyed by.
    fn undo_values(&self, index: usize) -> Result<Vec<&Field>>;

    /// Binds one row's values into `statement` in placeholder order.
    fn undo_prepare(
        &self,
        statement: &mut BoundStatement,
        undo_values: &[&Field],
        pk_values: &[&Field],
    ) -> Result<()>;

    /// Rows the dirty check expects to find, and rows that mean the
    /// compensation already happened.
    fn expected_images(&self) -> ExpectedImages<'_>;

    /// Compensating statement for row `index` of [`UndoExecutor::undo_rows`].
    fn bind_row(&self, sql: &str, index: usize) -> Result<BoundStatement> {
        let row = undo_row(self.undo_rows(), index)?;
        let pk_values = row.key_fields(self.entry().table_meta())?;
        let undo_values = self.undo_values(index)?;

        let mut statement = BoundStatement::new(sql);
        self.undo_prepare(&mut statement, &undo_values, &pk_values)?;
        Ok(statement)
    }

    /// The compensating SQL with one parameter group per undo row.
    fn compensating_statement(&self) -> Result<CompensatingStatement> {
        let mut compensation = CompensatingStatement::new(self.build_undo_sql()?);
        for index in 0..self.undo_rows().len() {
            let bound = self.bind_row(&compensation.sql, index)?;
            compensation.params.push(bound.params);
        }
        Ok(compensation)
    }
}

pub(crate) fn undo_row(image: &TableRecords, index: usize) -> Result<&Row> {
    image.rows().get(index).ok_or_else(|| {
        eyre::Report::new(UndoError::binding(format!(
            "row {} out of range for {} with {} row(s)",
            index,
            image.table_name(),
            image.len()
        )))
    })
}

/// Fields of `row` named by `columns`, in that order.
pub(crate) fn pick_fields<'r>(row: &'r Row, columns: &[&str], table: &str) -> Result<Vec<&'r Field>> {
    columns
        .iter()
        .map(|name| {
            row.get(name).ok_or_else(|| {
                eyre::Report::new(UndoError::binding(format!(
                    "row of {} lacks column '{}' present in the first row",
                    table, name
                )))
            })
        })
        .collect()
}

fn push_values(statement: &mut BoundStatement, fields: &[&Field]) {
    for field in fields {
        statement.push(field.value().clone());
    }
}

#[cfg(test)]
mod tests;
