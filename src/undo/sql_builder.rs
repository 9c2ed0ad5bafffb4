//! Compensating SQL text shared by every dialect.
//!
//! Dialects differ only in how identifiers are quoted, which
//! [`DbType::escape_identifier`] decides. No statement carries a terminator.
//!
//! | Built for        | Text                                                   |
//! |------------------|--------------------------------------------------------|
//! | INSERT undo      | `DELETE FROM t WHERE pk1 = ? AND pk2 = ?`              |
//! | UPDATE undo      | `UPDATE t SET a = ?, b = ? WHERE pk1 = ?`              |
//! | DELETE undo      | `INSERT INTO t (pk1, a, b) VALUES (?, ?, ?)`           |
//! | dirty check      | `SELECT * FROM t WHERE pk1 IN (?, ?)`                  |
//! | dirty check (2k) | `SELECT * FROM t WHERE (pk1, pk2) IN ((?, ?), (?, ?))` |

use crate::records::{Field, Row};
use crate::schema::TableMeta;
use crate::sql::DbType;

fn push_column_list<'n>(
    out: &mut String,
    dialect: DbType,
    names: impl IntoIterator<Item = &'n str>,
    separator: &str,
    suffix: &str,
) {
    for (i, name) in names.into_iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(&dialect.escape_identifier(name));
        out.push_str(suffix);
    }
}

fn push_key_predicate(out: &mut String, dialect: DbType, meta: &TableMeta) {
    push_column_list(
        out,
        dialect,
        meta.primary_key_names().iter().map(String::as_str),
        " AND ",
        " = ?",
    );
}

/// `DELETE FROM <table> WHERE <pk1> = ? [AND <pk2> = ? ...]`
pub fn delete_by_primary_key(dialect: DbType, meta: &TableMeta) -> String {
    let mut sql = String::with_capacity(64);
    sql.push_str("DELETE FROM ");
    sql.push_str(&dialect.escape_identifier(meta.table_name()));
    sql.push_str(" WHERE ");
    push_key_predicate(&mut sql, dialect, meta);
    sql
}

/// `UPDATE <table> SET <col> = ? [, ...] WHERE <pk1> = ? [AND ...]`
pub fn update_by_primary_key<'n>(
    dialect: DbType,
    meta: &TableMeta,
    set_columns: impl IntoIterator<Item = &'n str>,
) -> String {
    let mut sql = String::with_capacity(96);
    sql.push_str("UPDATE ");
    sql.push_str(&dialect.escape_identifier(meta.table_name()));
    sql.push_str(" SET ");
    push_column_list(&mut sql, dialect, set_columns, ", ", " = ?");
    sql.push_str(" WHERE ");
    push_key_predicate(&mut sql, dialect, meta);
    sql
}

/// `INSERT INTO <table> (<columns>) VALUES (?, ...)`
pub fn insert_row<'n>(
    dialect: DbType,
    meta: &TableMeta,
    columns: impl IntoIterator<Item = &'n str>,
) -> String {
    let mut sql = String::with_capacity(96);
    sql.push_str("INSERT INTO ");
    sql.push_str(&dialect.escape_identifier(meta.table_name()));
    sql.push_str(" (");
    let mut count = 0;
    push_column_list(
        &mut sql,
        dialect,
        columns.into_iter().inspect(|_| count += 1),
        ", ",
        "",
    );
    sql.push_str(") VALUES (");
    sql.push_str(&placeholders(count));
    sql.push(')');
    sql
}

/// `SELECT * FROM <table> WHERE <key> IN (...)` for `key_count` keys.
pub fn select_by_primary_keys(dialect: DbType, meta: &TableMeta, key_count: usize) -> String {
    let pk = meta.primary_key_names();
    let mut sql = String::with_capacity(64 + key_count * 4 * pk.len());
    sql.push_str("SELECT * FROM ");
    sql.push_str(&dialect.escape_identifier(meta.table_name()));
    sql.push_str(" WHERE ");

    if pk.len() == 1 {
        sql.push_str(&dialect.escape_identifier(&pk[0]));
        sql.push_str(" IN (");
        sql.push_str(&placeholders(key_count));
        sql.push(')');
        return sql;
    }

    sql.push('(');
    push_column_list(&mut sql, dialect, pk.iter().map(String::as_str), ", ", "");
    sql.push_str(") IN (");
    let tuple = format!("({})", placeholders(pk.len()));
    for i in 0..key_count {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&tuple);
    }
    sql.push(')');
    sql
}

fn placeholders(count: usize) -> String {
    let mut out = String::with_capacity(count * 3);
    for i in 0..count {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('?');
    }
    out
}

/// Fields of `row` in table-metadata column order. Fields the metadata does
/// not list follow in row order.
pub fn fields_in_column_order<'r>(meta: &TableMeta, row: &'r Row) -> Vec<&'r Field> {
    let mut ordered: Vec<&Field> = meta
        .columns()
        .iter()
        .filter_map(|column| row.get(column.name()))
        .collect();
    ordered.extend(
        row.fields()
            .iter()
            .filter(|f| meta.get_column(f.name()).is_none()),
    );
    ordered
}

/// Non-key fields of `row` in table-metadata column order.
pub fn non_key_fields_in_column_order<'r>(meta: &TableMeta, row: &'r Row) -> Vec<&'r Field> {
    fields_in_column_order(meta, row)
        .into_iter()
        .filter(|f| !meta.is_primary_key(f.name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnMeta;
    use crate::types::{DataType, Value};

    fn account() -> TableMeta {
        TableMeta::new("account")
            .with_column(ColumnMeta::new("tenant", DataType::Int))
            .with_column(ColumnMeta::new("id", DataType::BigInt))
            .with_column(ColumnMeta::new("balance", DataType::Decimal))
            .with_column(ColumnMeta::new("order", DataType::Varchar))
            .with_primary_key(["tenant", "id"])
    }

    #[test]
    fn statements_quote_per_dialect() {
        let meta = account();
        assert_eq!(
            delete_by_primary_key(DbType::MySql, &meta),
            "DELETE FROM account WHERE tenant = ? AND id = ?"
        );
        assert_eq!(
            update_by_primary_key(DbType::PostgreSql, &meta, ["balance", "order"]),
            "UPDATE account SET balance = ?, \"order\" = ? WHERE tenant = ? AND id = ?"
        );
        assert_eq!(
            insert_row(DbType::MariaDb, &meta, ["tenant", "id", "order"]),
            "INSERT INTO account (tenant, id, `order`) VALUES (?, ?, ?)"
        );
        assert_eq!(
            delete_by_primary_key(DbType::Oracle, &meta),
            "DELETE FROM \"account\" WHERE \"tenant\" = ? AND \"id\" = ?"
        );
    }

    #[test]
    fn dirty_check_query_shapes() {
        let single = TableMeta::new("T")
            .with_column(ColumnMeta::new("ID", DataType::Int))
            .with_primary_key(["ID"]);
        assert_eq!(
            select_by_primary_keys(DbType::Oracle, &single, 3),
            "SELECT * FROM T WHERE ID IN (?, ?, ?)"
        );
        assert_eq!(
            select_by_primary_keys(DbType::MySql, &account(), 2),
            "SELECT * FROM account WHERE (tenant, id) IN ((?, ?), (?, ?))"
        );
    }

    #[test]
    fn fields_follow_metadata_order() {
        let meta = account();
        let row = Row::new(vec![
            crate::records::Field::new("balance", DataType::Decimal, Value::decimal("1.50").unwrap()),
            crate::records::Field::new("id", DataType::BigInt, 7),
            crate::records::Field::new("note", DataType::Varchar, "extra"),
            crate::records::Field::new("tenant", DataType::Int, 1),
        ])
        .unwrap();

        let names: Vec<_> = fields_in_column_order(&meta, &row)
            .iter()
            .map(|f| f.name())
            .collect();
        assert_eq!(names, vec!["tenant", "id", "balance", "note"]);

        let names: Vec<_> = non_key_fields_in_column_order(&meta, &row)
            .iter()
            .map(|f| f.name())
            .collect();
        assert_eq!(names, vec!["balance", "note"]);
    }
}
