//! The database seam compensation runs through.

use eyre::Result;

use super::statement::BoundStatement;
use crate::records::Row;
use crate::schema::TableMeta;
use crate::types::Value;

/// A connection positioned inside the local transaction that performs the
/// rollback. Commit and rollback of that transaction belong to the caller.
pub trait UndoConnection {
    /// Runs a `SELECT` and returns its rows with fields typed per `meta`.
    fn query(&mut self, sql: &str, params: &[Value], meta: &TableMeta) -> Result<Vec<Row>>;

    /// Runs one compensating statement and returns the affected row count.
    fn execute(&mut self, statement: &BoundStatement) -> Result<u64>;
}

impl<C: UndoConnection + ?Sized> UndoConnection for &mut C {
    fn query(&mut self, sql: &str, params: &[Value], meta: &TableMeta) -> Result<Vec<Row>> {
        (**self).query(sql, params, meta)
    }

    fn execute(&mut self, statement: &BoundStatement) -> Result<u64> {
        (**self).execute(statement)
    }
}
