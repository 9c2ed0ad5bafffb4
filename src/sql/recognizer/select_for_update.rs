//! `SELECT ... FOR UPDATE` recognizer.

use std::borrow::Cow;

use eyre::{bail, Result};

use super::{qualified_name, Predicate, SqlRecognizer, SqlType};
use crate::error::UndoError;
use crate::sql::ast::{FromClause, SelectStmt};
use crate::sql::dialect::DbType;
use crate::sql::params::{ParameterGroups, ParametersHolder};

/// A locking read over a single table. `FOR UPDATE` and PostgreSQL
/// `FOR NO KEY UPDATE` qualify; shared locks do not.
#[derive(Debug)]
pub struct SelectForUpdateRecognizer<'a> {
    sql: &'a str,
    dialect: DbType,
    table_name: Cow<'a, str>,
    alias: Option<&'a str>,
    predicate: Predicate<'a>,
}

impl<'a> SelectForUpdateRecognizer<'a> {
    pub fn new(sql: &'a str, select: &'a SelectStmt<'a>, dialect: DbType) -> Result<Self> {
        if !select.is_for_update() {
            bail!(UndoError::unsupported(dialect, SqlType::Select.as_str()));
        }
        if select.set_op.is_some() {
            bail!(UndoError::unsupported(dialect, "SELECT FOR UPDATE with set operation"));
        }
        let table = match select.from {
            Some(FromClause::Table(table)) => table,
            Some(_) => bail!(UndoError::unsupported(
                dialect,
                "SELECT FOR UPDATE over several tables"
            )),
            None => bail!(UndoError::unsupported(
                dialect,
                "SELECT FOR UPDATE without a table"
            )),
        };

        Ok(Self {
            sql,
            dialect,
            table_name: qualified_name(table),
            alias: table.alias,
            predicate: Predicate::new(select.where_clause),
        })
    }
}

impl SqlRecognizer for SelectForUpdateRecognizer<'_> {
    fn sql_type(&self) -> SqlType {
        SqlType::SelectForUpdate
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
