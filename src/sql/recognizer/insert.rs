//! `INSERT ... VALUES` recognizer.
//!
//! Each VALUES item is classified so the capture side knows which inserted
//! values it can read back from the bound parameters and which the database
//! generated:
//!
//! | Item                          | Classified as          |
//! |-------------------------------|------------------------|
//! | `?`, `:id`, `$1`              | `Placeholder(pos)`     |
//! | `42`, `'x'`, `-1.5`, `TRUE`   | `Literal(value)`       |
//! | `NULL`                        | `Null`                 |
//! | `DEFAULT`                     | `Default`              |
//! | `seq.NEXTVAL`, `nextval('s')` | `Sequence(text)`       |
//! | anything else                 | `Expression(text)`     |

use std::borrow::Cow;

use eyre::{bail, Result};

use super::{qualified_name, SqlRecognizer, SqlType};
use crate::error::UndoError;
use crate::sql::ast::*;
use crate::sql::dialect::DbType;
use crate::sql::params::{ParameterGroups, ParametersHolder};
use crate::sql::writer::SqlWriter;
use crate::types::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum InsertValue {
    Placeholder(u32),
    Literal(Value),
    Null,
    Default,
    Sequence(String),
    Expression(String),
}

impl InsertValue {
    pub fn classify(expr: &Expr<'_>, dialect: DbType) -> Result<Self> {
        let value = match expr {
            Expr::Parameter(param) => InsertValue::Placeholder(param.position),
            Expr::Literal(Literal::Null) => InsertValue::Null,
            Expr::Literal(lit) => InsertValue::Literal(literal_value(lit, dialect)?),
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Expr::Literal(lit @ (Literal::Integer(_) | Literal::Float(_))),
            } => InsertValue::Literal(negate(literal_value(lit, dialect)?)?),
            Expr::Default => InsertValue::Default,
            Expr::Column(col)
                if col.table.is_some() && col.column.eq_ignore_ascii_case("NEXTVAL") =>
            {
                InsertValue::Sequence(render(expr)?)
            }
            Expr::Function(call) if call.name.eq_ignore_ascii_case("nextval") => {
                InsertValue::Sequence(render(expr)?)
            }
            _ => InsertValue::Expression(render(expr)?),
        };
        Ok(value)
    }
}

fn render(expr: &Expr<'_>) -> Result<String> {
    let mut writer = SqlWriter::new();
    writer.write_expr(expr)?;
    Ok(writer.finish().0)
}

fn negate(value: Value) -> Result<Value> {
    Ok(match value {
        Value::Int(n) => Value::Int(-n),
        Value::Float(f) => Value::Float(-f),
        Value::Decimal(d) => Value::decimal(&format!("-{}", d))?,
        other => other,
    })
}

/// Converts a literal's source text to a value.
pub fn literal_value(lit: &Literal<'_>, dialect: DbType) -> Result<Value> {
    let value = match *lit {
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Bool(b),
        Literal::Integer(text) => match text.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::decimal(text)?,
        },
        Literal::Float(text) => {
            if text.contains(['e', 'E']) {
                match text.parse::<f64>() {
                    Ok(f) => Value::Float(f),
                    Err(_) => bail!("invalid float literal '{}'", text),
                }
            } else {
                Value::decimal(text)?
            }
        }
        Literal::String(text) => Value::Text(unquote_string(text, dialect)),
        Literal::HexNumber(text) => Value::Blob(decode_hex(text)?),
        Literal::BinaryNumber(text) => {
            let digits = text
                .trim_start_matches("0b")
                .trim_start_matches(['b', 'B'])
                .trim_matches('\'');
            match i64::from_str_radix(digits, 2) {
                Ok(n) => Value::Int(n),
                Err(_) => bail!("invalid binary literal '{}'", text),
            }
        }
    };
    Ok(value)
}

/// Strips the quotes of a string literal and resolves its escapes.
fn unquote_string(text: &str, dialect: DbType) -> String {
    if let Some(rest) = text.strip_prefix('$') {
        // $tag$body$tag$
        if let Some(tag_end) = rest.find('$') {
            let tag = &text[..tag_end + 2];
            let body = &text[tag.len()..];
            return body.strip_suffix(tag).unwrap_or(body).to_string();
        }
    }

    let quote = match text.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return text.to_string(),
    };
    let inner = &text[1..text.len().saturating_sub(1).max(1)];
    let backslash = dialect.is_mysql_family();

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == quote && chars.peek() == Some(&quote) {
            chars.next();
            out.push(quote);
        } else if c == '\\' && backslash {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some('Z') => out.push('\x1a'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let digits = if let Some(rest) = text.strip_prefix("0x") {
        rest
    } else {
        text.trim_start_matches(['x', 'X']).trim_matches('\'')
    };

    let padded: Cow<'_, str> = if digits.len() % 2 == 1 {
        Cow::Owned(format!("0{}", digits))
    } else {
        Cow::Borrowed(digits)
    };

    padded
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| eyre::eyre!("invalid hex literal '{}'", text))
        })
        .collect()
}

/// Positions of every placeholder inside `expr`, in source order.
fn collect_parameters(expr: &Expr<'_>, out: &mut Vec<u32>) {
    match expr {
        Expr::Parameter(param) => out.push(param.position),
        Expr::BinaryOp { left, right, .. } => {
            collect_parameters(left, out);
            collect_parameters(right, out);
        }
        Expr::UnaryOp { expr, .. }
        | Expr::Cast { expr, .. }
        | Expr::IsNull { expr, .. }
        | Expr::IsBoolean { expr, .. } => collect_parameters(expr, out),
        Expr::Function(FunctionCall {
            args: FunctionArgs::Args(args),
            ..
        })
        | Expr::Row(args) => {
            for arg in args.iter() {
                collect_parameters(arg, out);
            }
        }
        Expr::Case {
            operand,
            conditions,
            else_result,
        } => {
            if let Some(operand) = operand {
                collect_parameters(operand, out);
            }
            for when in conditions.iter() {
                collect_parameters(when.condition, out);
                collect_parameters(when.result, out);
            }
            if let Some(else_result) = else_result {
                collect_parameters(else_result, out);
            }
        }
        _ => {}
    }
}

/// Single-table `INSERT ... VALUES` (or `DEFAULT VALUES`).
#[derive(Debug)]
pub struct InsertRecognizer<'a> {
    sql: &'a str,
    dialect: DbType,
    table_name: Cow<'a, str>,
    alias: Option<&'a str>,
    insert: &'a InsertStmt<'a>,
    rows: &'a [&'a [&'a Expr<'a>]],
}

impl<'a> InsertRecognizer<'a> {
    pub fn new(sql: &'a str, insert: &'a InsertStmt<'a>, dialect: DbType) -> Result<Self> {
        let rows: &'a [&'a [&'a Expr<'a>]] = match insert.source {
            InsertSource::Values(rows) => rows,
            InsertSource::DefaultValues => &[&[]],
            InsertSource::Select(_) => {
                bail!(UndoError::unsupported(dialect, "INSERT ... SELECT"))
            }
        };

        if !insert.columns.is_empty() {
            for (index, row) in rows.iter().enumerate() {
                if row.len() != insert.columns.len() {
                    bail!(UndoError::parse(
                        dialect,
                        format!(
                            "VALUES row {} has {} value(s) for {} column(s)",
                            index + 1,
                            row.len(),
                            insert.columns.len()
                        )
                    ));
                }
            }
        }

        Ok(Self {
            sql,
            dialect,
            table_name: qualified_name(&insert.table),
            alias: insert.table.alias,
            insert,
            rows,
        })
    }

    /// Column list as written; empty when the statement has none.
    pub fn insert_columns(&self) -> &'a [&'a str] {
        self.insert.columns
    }

    pub fn is_columns_empty(&self) -> bool {
        self.insert.columns.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Classified VALUES items, one inner vector per row.
    pub fn insert_rows(&self) -> Result<Vec<Vec<InsertValue>>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|expr| InsertValue::classify(expr, self.dialect))
                    .collect()
            })
            .collect()
    }

    /// Placeholder positions used by each row, in source order.
    pub fn insert_param_positions(&self) -> Vec<Vec<u32>> {
        self.rows
            .iter()
            .map(|row| {
                let mut positions = Vec::new();
                for expr in row.iter() {
                    collect_parameters(expr, &mut positions);
                }
                positions
            })
            .collect()
    }

    /// `INSERT IGNORE`
    pub fn is_ignore(&self) -> bool {
        self.insert.ignore
    }

    /// `ON DUPLICATE KEY UPDATE` or `ON CONFLICT ... DO UPDATE`.
    pub fn is_upsert(&self) -> bool {
        !self.insert.on_duplicate.is_empty()
            || matches!(
                self.insert.on_conflict,
                Some(OnConflict {
                    action: OnConflictAction::DoUpdate(_),
                    ..
                })
            )
    }
}

impl SqlRecognizer for InsertRecognizer<'_> {
    fn sql_type(&self) -> SqlType {
        SqlType::Insert
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
        Ok(String::new())
    }

    fn where_condition_with_params(
        &self,
        _params: &dyn ParametersHolder,
        _groups: &mut ParameterGroups,
    ) -> Result<String> {
        Ok(String::new())
    }
}
