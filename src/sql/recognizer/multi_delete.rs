//! MySQL-family multi-table `DELETE` recognizer.
//!
//! ```text
//! DELETE t1, t2 FROM t1 JOIN t2 ON ... WHERE ...
//! DELETE a FROM t1 a JOIN t2 b ON ...           (target named by alias)
//! DELETE FROM t1, t2 USING t1 JOIN t2 ON ...
//! ```
//!
//! Targets are resolved against the joined tables, so a target written as an
//! alias reports the real table name.

use std::borrow::Cow;

use eyre::{bail, Result};

use super::{qualified_name, Predicate, SqlRecognizer, SqlType};
use crate::error::UndoError;
use crate::schema::same_identifier;
use crate::sql::ast::{DeleteStmt, FromClause, TableRef};
use crate::sql::dialect::DbType;
use crate::sql::params::{ParameterGroups, ParametersHolder};

#[derive(Debug)]
pub struct MultiDeleteRecognizer<'a> {
    sql: &'a str,
    dialect: DbType,
    /// Resolved targets, in the order they were written.
    targets: Vec<&'a TableRef<'a>>,
    table_name: Cow<'a, str>,
    predicate: Predicate<'a>,
}

impl<'a> MultiDeleteRecognizer<'a> {
    pub fn new(sql: &'a str, delete: &'a DeleteStmt<'a>, dialect: DbType) -> Result<Self> {
        if !dialect.is_mysql_family() {
            bail!(UndoError::unsupported(dialect, "multi-table DELETE"));
        }

        let source: &'a FromClause<'a> = match (delete.using, delete.from) {
            (Some(using), _) => using,
            (None, Some(from)) => from,
            (None, None) => bail!(UndoError::parse(dialect, "multi-table DELETE without tables")),
        };
        let joined = source.tables();

        let written: Vec<&'a TableRef<'a>> = if delete.targets.is_empty() {
            joined.clone()
        } else {
            delete.targets.iter().collect()
        };

        let mut targets = Vec::with_capacity(written.len());
        for target in &written {
            targets.push(resolve(target, &joined).ok_or_else(|| {
                eyre::Report::new(UndoError::parse(
                    dialect,
                    format!("unknown table '{}' in multi-table DELETE", target.name),
                ))
            })?);
        }

        let Some(first) = targets.first() else {
            bail!(UndoError::parse(dialect, "multi-table DELETE without targets"));
        };
        let table_name = qualified_name(first);

        Ok(Self {
            sql,
            dialect,
            targets,
            table_name,
            predicate: Predicate::new(delete.where_clause),
        })
    }

    /// Real names of every deleted-from table.
    pub fn target_tables(&self) -> Vec<Cow<'a, str>> {
        self.targets.iter().map(|t| qualified_name(t)).collect()
    }
}

/// Finds the joined table a DELETE target refers to, by alias first.
fn resolve<'a>(target: &TableRef<'a>, joined: &[&'a TableRef<'a>]) -> Option<&'a TableRef<'a>> {
    let by_alias = joined.iter().find(|t| {
        target.schema.is_none()
            && t.alias.is_some_and(|alias| same_identifier(alias, target.name))
    });
    let by_name = || {
        joined.iter().find(|t| {
            same_identifier(t.name, target.name)
                && match (target.schema, t.schema) {
                    (Some(a), Some(b)) => same_identifier(a, b),
                    _ => true,
                }
        })
    };
    by_alias.or_else(by_name).copied()
}

impl SqlRecognizer for MultiDeleteRecognizer<'_> {
    fn sql_type(&self) -> SqlType {
        SqlType::MultiDelete
    }

    fn dialect(&self) -> DbType {
        self.dialect
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn table_alias(&self) -> Option<&str> {
        self.targets.first().and_then(|t| t.alias)
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
