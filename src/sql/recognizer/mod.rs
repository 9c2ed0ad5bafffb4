//! # SQL Recognizers
//!
//! A recognizer is the structural description of one parsed DML statement:
//! its kind, target table, alias and predicate. The capture side uses it to
//! build the queries that fetch before/after images; the predicate rendering
//! doubles as the key the images were selected by.
//!
//! ## Statement Kinds
//!
//! | Kind                | Recognizer                     | Dialects          |
//! |---------------------|--------------------------------|-------------------|
//! | `SELECT_FOR_UPDATE` | [`SelectForUpdateRecognizer`]  | all               |
//! | `INSERT`            | [`InsertRecognizer`]           | all               |
//! | `UPDATE`            | [`UpdateRecognizer`]           | all               |
//! | `DELETE`            | [`DeleteRecognizer`]           | all               |
//! | `MULTI_DELETE`      | [`MultiDeleteRecognizer`]      | mysql, mariadb    |
//!
//! A plain `SELECT` parses but is not recognized.
//!
//! ## Lifetimes
//!
//! Recognizers borrow the AST from the caller's arena, so the arena must
//! outlive them:
//!
//! ```ignore
//! let arena = Bump::new();
//! let recognizers = registry.recognize(sql, DbType::MySql, &arena)?;
//! for r in &recognizers {
//!     let mut groups = ParameterGroups::new();
//!     let predicate = r.where_condition_with_params(&params, &mut groups)?;
//! }
//! ```

mod delete;
mod insert;
mod multi_delete;
mod registry;
mod select_for_update;
mod update;

use std::borrow::Cow;
use std::fmt;

use eyre::Result;
use serde::{Deserialize, Serialize};

use super::ast::{Expr, LimitClause, OrderByItem, TableRef};
use super::dialect::DbType;
use super::params::{ParameterGroups, ParametersHolder};
use super::writer::{render_predicate, render_predicate_with_params, SqlWriter};

pub use delete::DeleteRecognizer;
pub use insert::{InsertRecognizer, InsertValue};
pub use multi_delete::MultiDeleteRecognizer;
pub use registry::{statement_shape, RecognizerFactory, RecognizerRegistry};
pub use select_for_update::SelectForUpdateRecognizer;
pub use update::UpdateRecognizer;

/// Statement kind of a recognized statement or an undo log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlType {
    /// Plain SELECT; parsed but never recognized.
    Select,
    Insert,
    Update,
    Delete,
    SelectForUpdate,
    MultiDelete,
}

impl SqlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Select => "SELECT",
            SqlType::Insert => "INSERT",
            SqlType::Update => "UPDATE",
            SqlType::Delete => "DELETE",
            SqlType::SelectForUpdate => "SELECT_FOR_UPDATE",
            SqlType::MultiDelete => "MULTI_DELETE",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural description of one recognized statement.
pub trait SqlRecognizer: fmt::Debug {
    fn sql_type(&self) -> SqlType;

    fn dialect(&self) -> DbType;

    /// Target table as written, schema-qualified when the statement is.
    fn table_name(&self) -> &str;

    /// `None` when no alias was written.
    fn table_alias(&self) -> Option<&str>;

    /// The statement text exactly as it was given.
    fn original_sql(&self) -> &str;

    /// Predicate text with `?` placeholders; empty without a WHERE clause.
    fn where_condition(&self) -> Result<String>;

    /// Predicate text, appending the bound values of its placeholders to
    /// `groups` in left-to-right order.
    fn where_condition_with_params(
        &self,
        params: &dyn ParametersHolder,
        groups: &mut ParameterGroups,
    ) -> Result<String>;
}

/// Shared state of the recognizers that carry a WHERE clause.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Predicate<'a> {
    pub where_clause: Option<&'a Expr<'a>>,
}

impl<'a> Predicate<'a> {
    pub fn new(where_clause: Option<&'a Expr<'a>>) -> Self {
        Self { where_clause }
    }

    pub fn render(&self) -> Result<String> {
        render_predicate(self.where_clause)
    }

    pub fn render_with_params(
        &self,
        params: &dyn ParametersHolder,
        groups: &mut ParameterGroups,
    ) -> Result<String> {
        render_predicate_with_params(self.where_clause, params, groups)
    }
}

/// `schema.name` as written, borrowing when unqualified.
pub(crate) fn qualified_name<'a>(table: &TableRef<'a>) -> Cow<'a, str> {
    match table.schema {
        Some(schema) => Cow::Owned(format!("{}.{}", schema, table.name)),
        None => Cow::Borrowed(table.name),
    }
}

/// ORDER BY items of a MySQL-family UPDATE or DELETE, as `ORDER BY ...`.
pub(crate) fn order_by_text(
    items: &[OrderByItem<'_>],
    params: Option<(&dyn ParametersHolder, &mut ParameterGroups)>,
) -> Result<String> {
    if items.is_empty() {
        return Ok(String::new());
    }
    match params {
        None => {
            let mut writer = SqlWriter::new();
            writer.push_str("ORDER BY ");
            writer.write_order_by(items)?;
            Ok(writer.finish().0)
        }
        Some((params, groups)) => {
            let mut writer = SqlWriter::with_params(params);
            writer.push_str("ORDER BY ");
            writer.write_order_by(items)?;
            let (text, collected) = writer.finish();
            groups.extend(collected);
            Ok(text)
        }
    }
}

/// LIMIT clause of a MySQL-family UPDATE or DELETE.
pub(crate) fn limit_text(
    limit: Option<&LimitClause<'_>>,
    params: Option<(&dyn ParametersHolder, &mut ParameterGroups)>,
) -> Result<String> {
    let Some(limit) = limit else {
        return Ok(String::new());
    };
    match params {
        None => {
            let mut writer = SqlWriter::new();
            writer.write_limit(limit)?;
            Ok(writer.finish().0)
        }
        Some((params, groups)) => {
            let mut writer = SqlWriter::with_params(params);
            writer.write_limit(limit)?;
            let (text, collected) = writer.finish();
            groups.extend(collected);
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests;
