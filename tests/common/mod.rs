//! In-memory table store used by the integration tests.
//!
//! Statements are parsed with the crate's own parser, so every compensating
//! statement a test executes has to be valid for its dialect. Only the
//! predicate forms compensation produces are evaluated: `=`, `AND`, `OR` and
//! `IN` over columns, row constructors and parameters.

#![allow(dead_code)]

use std::sync::Arc;

use bumpalo::Bump;
use eyre::{bail, eyre, Result};
use hashbrown::HashMap;
use parking_lot::Mutex;

use branchundo::records::{Field, Row, SqlUndoLog, TableRecords};
use branchundo::schema::{ColumnMeta, TableMeta};
use branchundo::sql::ast::{BinaryOperator, Expr, FromClause, InsertSource, Literal, Statement};
use branchundo::sql::{parse_sql, unquote_identifier, DbType};
use branchundo::types::{DataType, Value};
use branchundo::undo::{BoundStatement, UndoConnection};

struct MemoryTable {
    meta: TableMeta,
    rows: Vec<Row>,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, MemoryTable>,
    executed: Vec<BoundStatement>,
    queries: Vec<(String, Vec<Value>)>,
}

/// Shared table store. Clones see the same tables.
#[derive(Clone)]
pub struct MemoryDatabase {
    dialect: DbType,
    inner: Arc<Mutex<Inner>>,
}

fn table_key(name: &str) -> String {
    let last = name.rsplit('.').next().unwrap_or(name);
    unquote_identifier(last).to_ascii_lowercase()
}

impl MemoryDatabase {
    pub fn new(dialect: DbType) -> Self {
        Self {
            dialect,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn create_table(&self, meta: TableMeta) {
        let key = table_key(meta.table_name());
        self.inner.lock().tables.insert(
            key,
            MemoryTable {
                meta,
                rows: Vec::new(),
            },
        );
    }

    /// Inserts or replaces the row with the same primary key.
    pub fn put_row(&self, table: &str, row: Row) {
        let mut inner = self.inner.lock();
        let table = inner
            .tables
            .get_mut(&table_key(table))
            .unwrap_or_else(|| panic!("no table {}", table));
        let meta = table.meta.clone();
        let key = primary_key_of(&row, &meta);
        table.rows.retain(|r| primary_key_of(r, &meta) != key);
        table.rows.push(row);
    }

    pub fn remove_row(&self, table: &str, key: &[Value]) {
        let mut inner = self.inner.lock();
        let table = inner.tables.get_mut(&table_key(table)).expect("table");
        let meta = table.meta.clone();
        let wanted: Vec<String> = key.iter().map(Value::canonical_key).collect();
        table.rows.retain(|r| primary_key_of(r, &meta) != wanted);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        let inner = self.inner.lock();
        let table = &inner.tables[&table_key(table)];
        let mut rows: Vec<Row> = table.rows.iter().map(plain_row).collect();
        rows.sort_by_key(|r| primary_key_of(r, &table.meta));
        rows
    }

    pub fn find(&self, table: &str, key: &[Value]) -> Option<Row> {
        let inner = self.inner.lock();
        let table = &inner.tables[&table_key(table)];
        let wanted: Vec<String> = key.iter().map(Value::canonical_key).collect();
        table
            .rows
            .iter()
            .find(|r| primary_key_of(r, &table.meta) == wanted)
            .map(plain_row)
    }

    pub fn executed(&self) -> Vec<BoundStatement> {
        self.inner.lock().executed.clone()
    }

    pub fn queries(&self) -> Vec<(String, Vec<Value>)> {
        self.inner.lock().queries.clone()
    }

    pub fn connection(&self) -> MemoryConnection {
        MemoryConnection { db: self.clone() }
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<(u64, Vec<Row>)> {
        let arena = Bump::new();
        let statements = parse_sql(sql, self.dialect, &arena)?;
        let [parsed] = statements.as_slice() else {
            bail!("expected exactly one statement, got {}", statements.len());
        };
        let placeholders = BoundStatement::new(sql).placeholder_count();
        if placeholders != params.len() {
            bail!("{} placeholders but {} values", placeholders, params.len());
        }

        let mut inner = self.inner.lock();
        match parsed.statement {
            Statement::Select(select) => {
                let name = single_table(select.from)?;
                let table = lookup(&mut inner, name)?;
                let mut found = Vec::new();
                for row in &table.rows {
                    if predicate(select.where_clause, row, params)? {
                        found.push(row.clone());
                    }
                }
                Ok((0, found))
            }
            Statement::Delete(delete) => {
                let name = single_table(delete.from)?;
                let table = lookup(&mut inner, name)?;
                let before = table.rows.len();
                let mut kept = Vec::with_capacity(before);
                for row in table.rows.drain(..) {
                    if !predicate(delete.where_clause, &row, params)? {
                        kept.push(row);
                    }
                }
                table.rows = kept;
                Ok(((before - table.rows.len()) as u64, Vec::new()))
            }
            Statement::Update(update) => {
                let name = single_table(Some(update.target))?;
                let table = lookup(&mut inner, name)?;
                let meta = table.meta.clone();
                let mut affected = 0;
                for row in table.rows.iter_mut() {
                    if !predicate(update.where_clause, row, params)? {
                        continue;
                    }
                    let mut fields = row.clone().into_fields();
                    for assignment in update.assignments {
                        let value = value_of(assignment.value, row, params)?;
                        let column = assignment.column.column;
                        match fields.iter().position(|f| f.has_name(column)) {
                            Some(i) => {
                                let replaced =
                                    Field::new(fields[i].name(), fields[i].data_type(), value);
                                fields[i] = replaced;
                            }
                            None => fields.push(Field::new(
                                unquote_identifier(column),
                                column_type(&meta, column),
                                value,
                            )),
                        }
                    }
                    *row = Row::new(fields)?;
                    affected += 1;
                }
                Ok((affected, Vec::new()))
            }
            Statement::Insert(insert) => {
                let table = lookup(&mut inner, insert.table.name)?;
                let InsertSource::Values(rows) = insert.source else {
                    bail!("only INSERT ... VALUES is supported");
                };
                let empty = Row::default();
                for values in rows {
                    let mut fields = Vec::with_capacity(values.len());
                    for (column, expr) in insert.columns.iter().zip(values.iter()) {
                        fields.push(Field::new(
                            unquote_identifier(column),
                            column_type(&table.meta, column),
                            value_of(expr, &empty, params)?,
                        ));
                    }
                    let row = Row::new(fields)?;
                    let key = primary_key_of(&row, &table.meta);
                    if table.rows.iter().any(|r| primary_key_of(r, &table.meta) == key) {
                        bail!("duplicate primary key {:?} in {}", key, table.meta.table_name());
                    }
                    table.rows.push(row);
                }
                Ok((rows.len() as u64, Vec::new()))
            }
        }
    }
}

/// A connection over a [`MemoryDatabase`] that records what it ran.
pub struct MemoryConnection {
    db: MemoryDatabase,
}

impl UndoConnection for MemoryConnection {
    fn query(&mut self, sql: &str, params: &[Value], _meta: &TableMeta) -> Result<Vec<Row>> {
        self.db
            .inner
            .lock()
            .queries
            .push((sql.to_string(), params.to_vec()));
        Ok(self.db.run(sql, params)?.1)
    }

    fn execute(&mut self, statement: &BoundStatement) -> Result<u64> {
        let (affected, _) = self.db.run(&statement.sql, &statement.params)?;
        self.db.inner.lock().executed.push(statement.clone());
        Ok(affected)
    }
}

fn lookup<'i>(inner: &'i mut Inner, name: &str) -> Result<&'i mut MemoryTable> {
    inner
        .tables
        .get_mut(&table_key(name))
        .ok_or_else(|| eyre!("no such table {}", name))
}

fn single_table<'a>(from: Option<&FromClause<'a>>) -> Result<&'a str> {
    match from {
        Some(FromClause::Table(table)) => Ok(table.name),
        _ => bail!("expected a single table"),
    }
}

/// Copy of `row` without key roles, comparable with rows built by hand.
fn plain_row(row: &Row) -> Row {
    let fields = row
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), f.data_type(), f.value().clone()))
        .collect();
    Row::new(fields).expect("unique columns")
}

fn column_type(meta: &TableMeta, column: &str) -> DataType {
    meta.get_column(unquote_identifier(column))
        .map(ColumnMeta::data_type)
        .unwrap_or(DataType::Other)
}

fn primary_key_of(row: &Row, meta: &TableMeta) -> Vec<String> {
    meta.primary_key_names()
        .iter()
        .map(|pk| {
            row.get(pk)
                .map(|f| f.value().canonical_key())
                .unwrap_or_default()
        })
        .collect()
}

fn predicate(expr: Option<&Expr<'_>>, row: &Row, params: &[Value]) -> Result<bool> {
    let Some(expr) = expr else {
        return Ok(true);
    };
    match expr {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => Ok(predicate(Some(*left), row, params)? && predicate(Some(*right), row, params)?),
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Or,
            right,
        } => Ok(predicate(Some(*left), row, params)? || predicate(Some(*right), row, params)?),
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Eq,
            right,
        } => Ok(value_of(left, row, params)?.same_as(&value_of(right, row, params)?)),
        Expr::InList {
            expr,
            negated,
            list,
        } => {
            let target = tuple_of(expr, row, params)?;
            let mut found = false;
            for item in list.iter() {
                let candidate = tuple_of(item, row, params)?;
                if candidate.len() == target.len()
                    && candidate.iter().zip(&target).all(|(a, b)| a.same_as(b))
                {
                    found = true;
                    break;
                }
            }
            Ok(found != *negated)
        }
        other => bail!("unsupported predicate {:?}", other),
    }
}

fn tuple_of(expr: &Expr<'_>, row: &Row, params: &[Value]) -> Result<Vec<Value>> {
    match expr {
        Expr::Row(items) => items.iter().map(|e| value_of(e, row, params)).collect(),
        single => Ok(vec![value_of(single, row, params)?]),
    }
}

fn value_of(expr: &Expr<'_>, row: &Row, params: &[Value]) -> Result<Value> {
    match expr {
        Expr::Parameter(param) => params
            .get(param.position as usize - 1)
            .cloned()
            .ok_or_else(|| eyre!("no value for parameter {}", param.position)),
        Expr::Column(column) => Ok(row
            .get(column.column)
            .map(|f| f.value().clone())
            .unwrap_or(Value::Null)),
        Expr::Literal(Literal::Null) => Ok(Value::Null),
        Expr::Literal(Literal::Integer(text)) => Ok(Value::Int(text.parse()?)),
        other => bail!("unsupported value expression {:?}", other),
    }
}

pub fn users_meta() -> TableMeta {
    TableMeta::new("t_user")
        .with_column(ColumnMeta::new("id", DataType::BigInt).not_null())
        .with_column(ColumnMeta::new("name", DataType::Varchar))
        .with_column(ColumnMeta::new("age", DataType::Int))
        .with_primary_key(["id"])
}

pub fn user(id: i64, name: &str, age: i64) -> Row {
    Row::new(vec![
        Field::new("id", DataType::BigInt, id),
        Field::new("name", DataType::Varchar, name),
        Field::new("age", DataType::Int, age),
    ])
    .expect("unique columns")
}

pub fn users(rows: Vec<Row>) -> TableRecords {
    TableRecords::new(users_meta(), rows)
}

pub fn stock_meta() -> TableMeta {
    TableMeta::new("stock")
        .with_column(ColumnMeta::new("warehouse", DataType::Int))
        .with_column(ColumnMeta::new("sku", DataType::Varchar))
        .with_column(ColumnMeta::new("qty", DataType::Int))
        .with_primary_key(["warehouse", "sku"])
}

pub fn stock(warehouse: i64, sku: &str, qty: i64) -> Row {
    Row::new(vec![
        Field::new("warehouse", DataType::Int, warehouse),
        Field::new("sku", DataType::Varchar, sku),
        Field::new("qty", DataType::Int, qty),
    ])
    .expect("unique columns")
}

pub fn stock_records(rows: Vec<Row>) -> TableRecords {
    TableRecords::new(stock_meta(), rows)
}

/// Database holding the after-state of `entries`, applied in order.
pub fn database_after(dialect: DbType, metas: &[TableMeta], entries: &[SqlUndoLog]) -> MemoryDatabase {
    let db = MemoryDatabase::new(dialect);
    for meta in metas {
        db.create_table(meta.clone());
    }
    for entry in entries {
        let meta = entry.table_meta();
        for row in entry.before_image().rows() {
            let key: Vec<Value> = row
                .key_fields(meta)
                .expect("keys")
                .iter()
                .map(|f| f.value().clone())
                .collect();
            db.remove_row(entry.table_name(), &key);
        }
        for row in entry.after_image().rows() {
            db.put_row(entry.table_name(), row.clone());
        }
    }
    db
}
