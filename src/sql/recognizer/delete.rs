//! Single-table `DELETE` recognizer.

use std::borrow::Cow;

use eyre::{bail, Result};

use super::{limit_text, order_by_text, qualified_name, Predicate, SqlRecognizer, SqlType};
use crate::error::UndoError;
use crate::sql::ast::{DeleteStmt, FromClause};
use crate::sql::dialect::DbType;
use crate::sql::params::{ParameterGroups, ParametersHolder};

/// `DELETE FROM t WHERE ...`, or Oracle-family `DELETE t WHERE ...`.
#[derive(Debug)]
pub struct DeleteRecognizer<'a> {
    sql: &'a str,
    dialect: DbType,
    table_name: Cow<'a, str>,
    alias: Option<&'a str>,
    delete: &'a DeleteStmt<'a>,
    predicate: Predicate<'a>,
}

impl<'a> DeleteRecognizer<'a> {
    pub fn new(sql: &'a str, delete: &'a DeleteStmt<'a>, dialect: DbType) -> Result<Self> {
        if delete.is_multi_table() {
            bail!(UndoError::unsupported(dialect, "multi-table DELETE"));
        }
        if delete.using.is_some() {
            bail!(UndoError::unsupported(dialect, "DELETE ... USING"));
        }
        let table = match delete.from {
            Some(FromClause::Table(table)) => table,
            _ => bail!(UndoError::unsupported(dialect, "DELETE without a single table")),
        };

        Ok(Self {
            sql,
            dialect,
            table_name: qualified_name(table),
            alias: table.alias,
            delete,
            predicate: Predicate::new(delete.where_clause),
        })
    }

    /// `ORDER BY ...` of a MySQL-family DELETE; empty when absent.
    pub fn order_by_condition(&self) -> Result<String> {
        order_by_text(self.delete.order_by, None)
    }

    pub fn order_by_condition_with_params(
        &self,
        params: &dyn ParametersHolder,
        groups: &mut ParameterGroups,
    ) -> Result<String> {
        order_by_text(self.delete.order_by, Some((params, groups)))
    }

    /// `LIMIT ...` of a MySQL-family DELETE; empty when absent.
    pub fn limit_condition(&self) -> Result<String> {
        limit_text(self.delete.limit, None)
    }

    pub fn limit_condition_with_params(
        &self,
        params: &dyn ParametersHolder,
        groups: &mut ParameterGroups,
    ) -> Result<String> {
        limit_text(self.delete.limit, Some((params, groups)))
    }
}

impl SqlRecognizer for DeleteRecognizer<'_> {
    fn sql_type(&self) -> SqlType {
        SqlType::Delete
    }

    fn dialect(&self) -> DbType {
        self.dialect
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn table_alias(&self) -> Option<&str> {
        self.alias
    }

    fn original_sql(&self) -> &str {
        self.sql
    }

    fn where_condition(&self) -> Result<String> {
        self.predicate.render()
    }

    fn where_condition_with_params(
        &self,
        params: &dyn ParametersHolder,
        groups: &mut ParameterGroups,
    ) -> Result<String> {
        self.predicate.render_with_params(params, groups)
    }
}
