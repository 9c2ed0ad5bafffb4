//! # SQL Writer
//!
//! Renders AST fragments back to SQL text. Recognizers use it to produce the
//! predicate, ORDER BY and LIMIT text of a statement, optionally resolving
//! every placeholder against the statement's bound parameters.
//!
//! ## Output Form
//!
//! | Input                          | Rendered                        | Groups        |
//! |--------------------------------|---------------------------------|---------------|
//! | `id=?`                         | `id = ?`                        | `[[v]]`       |
//! | `id in (?,?)`                  | `id IN (?, ?)`                  | `[[v1, v2]]`  |
//! | `id in (?)`, 3 values bound    | `id IN (?, ?, ?)`               | `[[v1,v2,v3]]`|
//! | `a between ? and ?`            | `a BETWEEN ? AND ?`             | `[[lo], [hi]]`|
//! | `a = ? and b = ?`              | `a = ?\n\tAND b = ?`            | `[[a], [b]]`  |
//! | `a = ? or b = ? and c = 1`     | `a = ?\n\tOR b = ? AND c = 1`   | `[[a], [b]]`  |
//! | `(a = 1 or b = 2) and c = 3`   | `(a = 1 OR b = 2)\n\tAND c = 3` | none          |
//!
//! Keywords are written upper case; identifiers, literals and type names are
//! written exactly as they appear in the source. Every placeholder style
//! (`?`, `:name`, `@name`, `$n`) is written as `?`.
//!
//! ## Parentheses
//!
//! The AST keeps no grouping parentheses, so they are re-derived from
//! operator precedence: a child is wrapped when it binds looser than its
//! parent, or equally on the side where the parent does not associate.

use eyre::{bail, Result};

use super::ast::*;
use super::params::{ParameterGroups, ParametersHolder};
use crate::config::{WHERE_AND_SEPARATOR, WHERE_OR_SEPARATOR};
use crate::error::UndoError;

const PREDICATE_PRECEDENCE: u8 = 6;
const NOT_PRECEDENCE: u8 = 5;
const UNARY_PRECEDENCE: u8 = 14;
const CAST_PRECEDENCE: u8 = 18;
const ATOM_PRECEDENCE: u8 = u8::MAX;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

struct Binder<'p> {
    params: &'p dyn ParametersHolder,
    groups: ParameterGroups,
    /// Values of the `IN` list being written, if any.
    list_group: Option<Vec<crate::types::Value>>,
}

pub struct SqlWriter<'p> {
    out: String,
    binder: Option<Binder<'p>>,
}

impl SqlWriter<'static> {
    /// A writer that emits `?` for every placeholder without resolving it.
    pub fn new() -> Self {
        Self {
            out: String::new(),
            binder: None,
        }
    }
}

impl Default for SqlWriter<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> SqlWriter<'p> {
    /// A writer that resolves each placeholder and records its values.
    pub fn with_params(params: &'p dyn ParametersHolder) -> Self {
        Self {
            out: String::new(),
            binder: Some(Binder {
                params,
                groups: ParameterGroups::new(),
                list_group: None,
            }),
        }
    }

    /// Rendered text and the parameter groups collected while writing.
    pub fn finish(self) -> (String, ParameterGroups) {
        let groups = self.binder.map(|b| b.groups).unwrap_or_default();
        (self.out, groups)
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn push_str(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Writes a WHERE predicate with top-level AND/OR fragments on their
    /// own lines.
    pub fn write_predicate(&mut self, expr: &Expr<'_>) -> Result<()> {
        let (op, separator) = match expr {
            Expr::BinaryOp {
                op: BinaryOperator::And,
                ..
            } => (BinaryOperator::And, WHERE_AND_SEPARATOR),
            Expr::BinaryOp {
                op: BinaryOperator::Or,
                ..
            } => (BinaryOperator::Or, WHERE_OR_SEPARATOR),
            _ => return self.write_expr(expr),
        };

        let mut fragments = Vec::new();
        flatten(expr, op, &mut fragments);

        let parent = op.binding_power().0;
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                self.out.push_str(separator);
            }
            self.write_wrapped(fragment, precedence(fragment) < parent)?;
        }
        Ok(())
    }

    pub fn write_expr(&mut self, expr: &Expr<'_>) -> Result<()> {
        match expr {
            Expr::Literal(lit) => {
                self.write_literal(lit);
                Ok(())
            }
            Expr::Column(col) => {
                self.write_column(col);
                Ok(())
            }
            Expr::Parameter(param) => self.write_parameter(param, false),
            Expr::Default => {
                self.out.push_str("DEFAULT");
                Ok(())
            }
            Expr::BinaryOp { left, op, right } => {
                self.write_wrapped(left, needs_parens(left, *op, Side::Left))?;
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                self.write_wrapped(right, needs_parens(right, *op, Side::Right))
            }
            Expr::UnaryOp { op, expr } => {
                let (text, min) = match op {
                    UnaryOperator::Not => ("NOT ", NOT_PRECEDENCE),
                    UnaryOperator::Minus => ("-", UNARY_PRECEDENCE),
                    UnaryOperator::Plus => ("+", UNARY_PRECEDENCE),
                    UnaryOperator::BitwiseNot => ("~", UNARY_PRECEDENCE),
                };
                self.out.push_str(text);
                self.write_wrapped(expr, precedence(expr) < min)
            }
            Expr::Between {
                expr,
                negated,
                low,
                high,
            } => {
                self.write_predicate_operand(expr)?;
                self.out
                    .push_str(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                self.write_bound_operand(low)?;
                self.out.push_str(" AND ");
                self.write_bound_operand(high)
            }
            Expr::Like {
                expr,
                negated,
                pattern,
                escape,
                case_insensitive,
            } => {
                self.write_predicate_operand(expr)?;
                self.out.push_str(if *negated { " NOT " } else { " " });
                self.out
                    .push_str(if *case_insensitive { "ILIKE " } else { "LIKE " });
                self.write_bound_operand(pattern)?;
                if let Some(escape) = escape {
                    self.out.push_str(" ESCAPE ");
                    self.write_bound_operand(escape)?;
                }
                Ok(())
            }
            Expr::InList {
                expr,
                negated,
                list,
            } => {
                self.write_predicate_operand(expr)?;
                self.out
                    .push_str(if *negated { " NOT IN (" } else { " IN (" });
                self.write_in_list(list)?;
                self.out.push(')');
                Ok(())
            }
            Expr::InSubquery {
                expr,
                negated,
                subquery,
            } => {
                self.write_predicate_operand(expr)?;
                self.out
                    .push_str(if *negated { " NOT IN (" } else { " IN (" });
                self.write_select(subquery)?;
                self.out.push(')');
                Ok(())
            }
            Expr::IsNull { expr, negated } => {
                self.write_predicate_operand(expr)?;
                self.out
                    .push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
                Ok(())
            }
            Expr::IsBoolean {
                expr,
                value,
                negated,
            } => {
                self.write_predicate_operand(expr)?;
                self.out.push_str(if *negated { " IS NOT " } else { " IS " });
                self.out.push_str(if *value { "TRUE" } else { "FALSE" });
                Ok(())
            }
            Expr::Function(call) => self.write_function(call),
            Expr::Case {
                operand,
                conditions,
                else_result,
            } => {
                self.out.push_str("CASE");
                if let Some(operand) = operand {
                    self.out.push(' ');
                    self.write_expr(operand)?;
                }
                for when in conditions.iter() {
                    self.out.push_str(" WHEN ");
                    self.write_expr(when.condition)?;
                    self.out.push_str(" THEN ");
                    self.write_expr(when.result)?;
                }
                if let Some(else_result) = else_result {
                    self.out.push_str(" ELSE ");
                    self.write_expr(else_result)?;
                }
                self.out.push_str(" END");
                Ok(())
            }
            Expr::Cast {
                expr,
                data_type,
                style,
            } => match style {
                CastStyle::Function => {
                    self.out.push_str("CAST(");
                    self.write_expr(expr)?;
                    self.out.push_str(" AS ");
                    self.out.push_str(data_type);
                    self.out.push(')');
                    Ok(())
                }
                CastStyle::DoubleColon => {
                    self.write_wrapped(expr, precedence(expr) < CAST_PRECEDENCE)?;
                    self.out.push_str("::");
                    self.out.push_str(data_type);
                    Ok(())
                }
            },
            Expr::TypedString { data_type, value } => {
                self.out.push_str(data_type);
                self.out.push(' ');
                self.out.push_str(value);
                Ok(())
            }
            Expr::Subquery(select) => {
                self.out.push('(');
                self.write_select(select)?;
                self.out.push(')');
                Ok(())
            }
            Expr::Exists { subquery, negated } => {
                self.out
                    .push_str(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                self.write_select(subquery)?;
                self.out.push(')');
                Ok(())
            }
            Expr::Row(items) => {
                self.out.push('(');
                self.write_expr_list(items)?;
                self.out.push(')');
                Ok(())
            }
        }
    }

    fn write_wrapped(&mut self, expr: &Expr<'_>, parens: bool) -> Result<()> {
        if parens {
            self.out.push('(');
            self.write_expr(expr)?;
            self.out.push(')');
            Ok(())
        } else {
            self.write_expr(expr)
        }
    }

    fn write_predicate_operand(&mut self, expr: &Expr<'_>) -> Result<()> {
        self.write_wrapped(expr, precedence(expr) < PREDICATE_PRECEDENCE)
    }

    fn write_bound_operand(&mut self, expr: &Expr<'_>) -> Result<()> {
        self.write_wrapped(expr, precedence(expr) <= PREDICATE_PRECEDENCE)
    }

    fn write_expr_list(&mut self, items: &[&Expr<'_>]) -> Result<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.write_expr(item)?;
        }
        Ok(())
    }

    /// The whole list contributes one group. A directly listed placeholder
    /// bound to several values expands to one `?` per value.
    fn write_in_list(&mut self, items: &[&Expr<'_>]) -> Result<()> {
        let outer = self
            .binder
            .as_mut()
            .map(|b| b.list_group.replace(Vec::new()));

        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            match item {
                Expr::Parameter(param) => self.write_parameter(param, true)?,
                other => self.write_expr(other)?,
            }
        }

        if let (Some(binder), Some(outer)) = (self.binder.as_mut(), outer) {
            let group = std::mem::replace(&mut binder.list_group, outer);
            match (group, binder.list_group.as_mut()) {
                (Some(values), Some(enclosing)) => enclosing.extend(values),
                (Some(values), None) if !values.is_empty() => binder.groups.push(values),
                _ => {}
            }
        }
        Ok(())
    }

    fn write_parameter(&mut self, param: &ParameterRef<'_>, expand: bool) -> Result<()> {
        let Some(binder) = self.binder.as_mut() else {
            self.out.push('?');
            return Ok(());
        };

        let values = match binder.params.parameter(param.position) {
            Some(values) if !values.is_empty() => values,
            _ => bail!(UndoError::binding(format!(
                "no value bound to parameter {}",
                param.position
            ))),
        };
        if values.len() > 1 && !expand {
            bail!(UndoError::binding(format!(
                "parameter {} is bound to {} values outside an IN list",
                param.position,
                values.len()
            )));
        }

        for i in 0..values.len() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push('?');
        }

        match binder.list_group.as_mut() {
            Some(group) => group.extend(values.iter().cloned()),
            None => binder.groups.push(values.to_vec()),
        }
        Ok(())
    }

    fn write_literal(&mut self, lit: &Literal<'_>) {
        match lit {
            Literal::Null => self.out.push_str("NULL"),
            Literal::Boolean(true) => self.out.push_str("TRUE"),
            Literal::Boolean(false) => self.out.push_str("FALSE"),
            Literal::Integer(s)
            | Literal::Float(s)
            | Literal::String(s)
            | Literal::HexNumber(s)
            | Literal::BinaryNumber(s) => self.out.push_str(s),
        }
    }

    pub fn write_column(&mut self, col: &ColumnRef<'_>) {
        if let Some(schema) = col.schema {
            self.out.push_str(schema);
            self.out.push('.');
        }
        if let Some(table) = col.table {
            self.out.push_str(table);
            self.out.push('.');
        }
        self.out.push_str(col.column);
    }

    fn write_function(&mut self, call: &FunctionCall<'_>) -> Result<()> {
        if let Some(schema) = call.schema {
            self.out.push_str(schema);
            self.out.push('.');
        }
        self.out.push_str(call.name);
        self.out.push('(');
        if call.distinct {
            self.out.push_str("DISTINCT ");
        }
        match call.args {
            FunctionArgs::None => {}
            FunctionArgs::Star => self.out.push('*'),
            FunctionArgs::Args(args) => self.write_expr_list(args)?,
        }
        self.out.push(')');
        Ok(())
    }

    pub fn write_table(&mut self, table: &TableRef<'_>) {
        if let Some(schema) = table.schema {
            self.out.push_str(schema);
            self.out.push('.');
        }
        self.out.push_str(table.name);
        if let Some(alias) = table.alias {
            self.out.push(' ');
            self.out.push_str(alias);
        }
    }

    /// Items of an ORDER BY clause, without the keywords.
    pub fn write_order_by(&mut self, items: &[OrderByItem<'_>]) -> Result<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.write_expr(item.expr)?;
            match item.direction {
                Some(OrderDirection::Asc) => self.out.push_str(" ASC"),
                Some(OrderDirection::Desc) => self.out.push_str(" DESC"),
                None => {}
            }
            match item.nulls {
                NullsOrder::First => self.out.push_str(" NULLS FIRST"),
                NullsOrder::Last => self.out.push_str(" NULLS LAST"),
                NullsOrder::Default => {}
            }
        }
        Ok(())
    }

    /// A complete row-limiting clause in the syntax it was written in.
    pub fn write_limit(&mut self, limit: &LimitClause<'_>) -> Result<()> {
        match limit {
            LimitClause::Limit { count, offset } => {
                self.out.push_str("LIMIT ");
                self.write_expr(count)?;
                if let Some(offset) = offset {
                    self.out.push_str(" OFFSET ");
                    self.write_expr(offset)?;
                }
            }
            LimitClause::OffsetCount { offset, count } => {
                self.out.push_str("LIMIT ");
                self.write_expr(offset)?;
                self.out.push_str(", ");
                self.write_expr(count)?;
            }
            LimitClause::Fetch { offset, count } => {
                if let Some(offset) = offset {
                    self.out.push_str("OFFSET ");
                    self.write_expr(offset)?;
                    self.out.push_str(" ROWS ");
                }
                self.out.push_str("FETCH FIRST ");
                self.write_expr(count)?;
                self.out.push_str(" ROWS ONLY");
            }
        }
        Ok(())
    }

    fn write_from(&mut self, from: &FromClause<'_>) -> Result<()> {
        match from {
            FromClause::Table(table) => {
                self.write_table(table);
                Ok(())
            }
            FromClause::Subquery { query, alias } => {
                self.out.push('(');
                self.write_select(query)?;
                self.out.push(')');
                if let Some(alias) = alias {
                    self.out.push(' ');
                    self.out.push_str(alias);
                }
                Ok(())
            }
            FromClause::Join(join) => {
                self.write_from(join.left)?;
                self.out.push_str(match join.join_type {
                    JoinType::Comma => ", ",
                    JoinType::Inner => " JOIN ",
                    JoinType::Left => " LEFT JOIN ",
                    JoinType::Right => " RIGHT JOIN ",
                    JoinType::Full => " FULL JOIN ",
                    JoinType::Cross => " CROSS JOIN ",
                    JoinType::Natural => " NATURAL JOIN ",
                });
                let nested = matches!(join.right, FromClause::Join(_));
                if nested {
                    self.out.push('(');
                }
                self.write_from(join.right)?;
                if nested {
                    self.out.push(')');
                }
                match join.condition {
                    JoinCondition::On(expr) => {
                        self.out.push_str(" ON ");
                        self.write_expr(expr)?;
                    }
                    JoinCondition::Using(columns) => {
                        self.out.push_str(" USING (");
                        self.out.push_str(&columns.join(", "));
                        self.out.push(')');
                    }
                    JoinCondition::None => {}
                }
                Ok(())
            }
        }
    }

    pub fn write_select(&mut self, select: &SelectStmt<'_>) -> Result<()> {
        self.out.push_str("SELECT ");
        if select.distinct == Distinct::Distinct {
            self.out.push_str("DISTINCT ");
        }
        for (i, column) in select.columns.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            match column {
                SelectColumn::AllColumns => self.out.push('*'),
                SelectColumn::TableAllColumns(table) => {
                    self.out.push_str(table);
                    self.out.push_str(".*");
                }
                SelectColumn::Expr { expr, alias } => {
                    self.write_expr(expr)?;
                    if let Some(alias) = alias {
                        self.out.push_str(" AS ");
                        self.out.push_str(alias);
                    }
                }
            }
        }
        if let Some(from) = select.from {
            self.out.push_str(" FROM ");
            self.write_from(from)?;
        }
        if let Some(where_clause) = select.where_clause {
            self.out.push_str(" WHERE ");
            self.write_expr(where_clause)?;
        }
        if !select.group_by.is_empty() {
            self.out.push_str(" GROUP BY ");
            self.write_expr_list(select.group_by)?;
        }
        if let Some(having) = select.having {
            self.out.push_str(" HAVING ");
            self.write_expr(having)?;
        }
        if let Some(set_op) = select.set_op {
            self.out.push_str(match set_op.op {
                SetOperator::Union => " UNION ",
                SetOperator::Intersect => " INTERSECT ",
                SetOperator::Except => " EXCEPT ",
            });
            if set_op.all {
                self.out.push_str("ALL ");
            }
            self.write_select(set_op.right)?;
        }
        if !select.order_by.is_empty() {
            self.out.push_str(" ORDER BY ");
            self.write_order_by(select.order_by)?;
        }
        if let Some(limit) = select.limit {
            self.out.push(' ');
            self.write_limit(limit)?;
        }
        if let Some(for_clause) = select.for_clause {
            self.out.push_str(match for_clause.lock_mode {
                LockMode::Update => " FOR UPDATE",
                LockMode::NoKeyUpdate => " FOR NO KEY UPDATE",
                LockMode::Share => " FOR SHARE",
                LockMode::KeyShare => " FOR KEY SHARE",
                LockMode::InShareMode => " LOCK IN SHARE MODE",
            });
            for (i, col) in for_clause.of.iter().enumerate() {
                self.out.push_str(if i == 0 { " OF " } else { ", " });
                self.write_column(col);
            }
            match for_clause.wait_policy {
                WaitPolicy::Wait => {}
                WaitPolicy::WaitSeconds(n) => self.out.push_str(&format!(" WAIT {}", n)),
                WaitPolicy::Nowait => self.out.push_str(" NOWAIT"),
                WaitPolicy::SkipLocked => self.out.push_str(" SKIP LOCKED"),
            }
        }
        Ok(())
    }
}

/// Collects the operands of a chain of `op`, left to right.
fn flatten<'e, 'a>(expr: &'e Expr<'a>, op: BinaryOperator, out: &mut Vec<&'e Expr<'a>>) {
    match expr {
        Expr::BinaryOp {
            left,
            op: inner,
            right,
        } if *inner == op => {
            flatten(left, op, out);
            flatten(right, op, out);
        }
        other => out.push(other),
    }
}

fn precedence(expr: &Expr<'_>) -> u8 {
    match expr {
        Expr::BinaryOp { op, .. } => op.binding_power().0,
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            ..
        } => NOT_PRECEDENCE,
        Expr::UnaryOp { .. } => UNARY_PRECEDENCE,
        Expr::Between { .. }
        | Expr::Like { .. }
        | Expr::InList { .. }
        | Expr::InSubquery { .. }
        | Expr::IsNull { .. }
        | Expr::IsBoolean { .. } => PREDICATE_PRECEDENCE,
        Expr::Cast {
            style: CastStyle::DoubleColon,
            ..
        } => CAST_PRECEDENCE,
        _ => ATOM_PRECEDENCE,
    }
}

fn needs_parens(child: &Expr<'_>, parent: BinaryOperator, side: Side) -> bool {
    let child_prec = precedence(child);
    let parent_prec = parent.binding_power().0;
    if child_prec != parent_prec {
        return child_prec < parent_prec;
    }

    let right_assoc = parent == BinaryOperator::Power;
    match side {
        Side::Left => right_assoc,
        Side::Right => {
            let same_op = matches!(child, Expr::BinaryOp { op, .. } if *op == parent);
            !right_assoc && !(same_op && parent.is_associative())
        }
    }
}

/// Renders a predicate with `?` placeholders and no parameter lookup.
pub fn render_predicate(expr: Option<&Expr<'_>>) -> Result<String> {
    let mut writer = SqlWriter::new();
    if let Some(expr) = expr {
        writer.write_predicate(expr)?;
    }
    Ok(writer.finish().0)
}

/// Renders a predicate, appending one value group per placeholder (one per
/// `IN` list) to `groups` in left-to-right order.
pub fn render_predicate_with_params(
    expr: Option<&Expr<'_>>,
    params: &dyn ParametersHolder,
    groups: &mut ParameterGroups,
) -> Result<String> {
    let mut writer = SqlWriter::with_params(params);
    if let Some(expr) = expr {
        writer.write_predicate(expr)?;
    }
    let (text, collected) = writer.finish();
    groups.extend(collected);
    Ok(text)
}
