//! Single-table `UPDATE` recognizer.

use std::borrow::Cow;

use eyre::{bail, Result};

use super::{limit_text, order_by_text, qualified_name, Predicate, SqlRecognizer, SqlType};
use crate::error::UndoError;
use crate::sql::ast::{FromClause, UpdateStmt};
use crate::sql::dialect::DbType;
use crate::sql::params::{ParameterGroups, ParametersHolder};
use crate::sql::writer::SqlWriter;

#[derive(Debug)]
pub struct UpdateRecognizer<'a> {
    sql: &'a str,
    dialect: DbType,
    table_name: Cow<'a, str>,
    alias: Option<&'a str>,
    update: &'a UpdateStmt<'a>,
    predicate: Predicate<'a>,
}

impl<'a> UpdateRecognizer<'a> {
    pub fn new(sql: &'a str, update: &'a UpdateStmt<'a>, dialect: DbType) -> Result<Self> {
        let table = match update.target {
            FromClause::Table(table) => table,
            _ => bail!(UndoError::unsupported(dialect, "multi-table UPDATE")),
        };
        if update.from.is_some() {
            bail!(UndoError::unsupported(dialect, "UPDATE ... FROM"));
        }

        Ok(Self {
            sql,
            dialect,
            table_name: qualified_name(table),
            alias: table.alias,
            update,
            predicate: Predicate::new(update.where_clause),
        })
    }

    /// Assigned columns as written, qualifier dropped.
    pub fn update_columns(&self) -> Vec<&'a str> {
        self.update
            .assignments
            .iter()
            .map(|a| a.column.column)
            .collect()
    }

    /// Assigned value expressions rendered back to SQL.
    pub fn update_values(&self) -> Result<Vec<String>> {
        self.update
            .assignments
            .iter()
            .map(|a| {
                let mut writer = SqlWriter::new();
                writer.write_expr(a.value)?;
                Ok(writer.finish().0)
            })
            .collect()
    }

    /// `ORDER BY ...` of a MySQL-family UPDATE; empty when absent.
    pub fn order_by_condition(&self) -> Result<String> {
        order_by_text(self.update.order_by, None)
    }

    pub fn order_by_condition_with_params(
        &self,
        params: &dyn ParametersHolder,
        groups: &mut ParameterGroups,
    ) -> Result<String> {
        order_by_text(self.update.order_by, Some((params, groups)))
    }

    /// `LIMIT ...` of a MySQL-family UPDATE; empty when absent.
    pub fn limit_condition(&self) -> Result<String> {
        limit_text(self.update.limit, None)
    }

    pub fn limit_condition_with_params(
        &self,
        params: &dyn ParametersHolder,
        groups: &mut ParameterGroups,
    ) -> Result<String> {
        limit_text(self.update.limit, Some((params, groups)))
    }
}

impl SqlRecognizer for UpdateRecognizer<'_> {
    fn sql_type(&self) -> SqlType {
        SqlType::Update
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
