use super::*;
use crate::error::undo_error;
use crate::records::{Field, Row, SqlUndoLog, TableRecords};
use crate::schema::{ColumnMeta, TableMeta};
use crate::types::{DataType, Value};

fn table_name_meta() -> TableMeta {
    TableMeta::new("TABLE_NAME")
        .with_column(ColumnMeta::new("ID", DataType::Int))
        .with_column(ColumnMeta::new("AGE", DataType::Varchar))
        .with_primary_key(["ID"])
}

fn id_age(id: i64, age: &str) -> Row {
    Row::new(vec![
        Field::new("ID", DataType::Int, id),
        Field::new("AGE", DataType::Varchar, age),
    ])
    .unwrap()
}

fn order_meta() -> TableMeta {
    TableMeta::new("order_item")
        .with_column(ColumnMeta::new("order_id", DataType::BigInt))
        .with_column(ColumnMeta::new("line_no", DataType::Int))
        .with_column(ColumnMeta::new("sku", DataType::Varchar))
        .with_column(ColumnMeta::new("qty", DataType::Int))
        .with_primary_key(["order_id", "line_no"])
}

fn item(order_id: i64, line_no: i64, sku: &str, qty: i64) -> Row {
    Row::new(vec![
        Field::new("qty", DataType::Int, qty),
        Field::new("sku", DataType::Varchar, sku),
        Field::new("line_no", DataType::Int, line_no),
        Field::new("order_id", DataType::BigInt, order_id),
    ])
    .unwrap()
}

#[test]
fn insert_undo_deletes_by_key() {
    let entry = SqlUndoLog::insert(TableRecords::new(
        table_name_meta(),
        vec![id_age(1, "a"), id_age(2, "b")],
    ))
    .unwrap();

    for dialect in [DbType::MySql, DbType::Oracle, DbType::OceanBaseOracle] {
        let executor = InsertUndoExecutor::new(&entry, dialect);
        assert_eq!(
            executor.build_undo_sql().unwrap(),
            "DELETE FROM TABLE_NAME WHERE ID = ?"
        );

        let row = &executor.undo_rows().rows()[0];
        let pk = row.key_fields(entry.table_meta()).unwrap();
        let mut statement = BoundStatement::new("DELETE FROM TABLE_NAME WHERE ID = ?");
        executor.undo_prepare(&mut statement, &[], &pk).unwrap();
        assert_eq!(statement.params, vec![Value::Int(1)]);
    }

    let compensation = InsertUndoExecutor::new(&entry, DbType::MySql)
        .compensating_statement()
        .unwrap();
    assert_eq!(
        compensation.params,
        vec![vec![Value::Int(1)], vec![Value::Int(2)]]
    );
}

#[test]
fn insert_undo_binds_composite_key_in_declared_order() {
    let entry = SqlUndoLog::insert(TableRecords::new(order_meta(), vec![item(10, 2, "X-1", 3)]))
        .unwrap();
    let compensation = InsertUndoExecutor::new(&entry, DbType::PostgreSql)
        .compensating_statement()
        .unwrap();

    assert_eq!(
        compensation.sql,
        "DELETE FROM order_item WHERE order_id = ? AND line_no = ?"
    );
    assert_eq!(compensation.params, vec![vec![Value::Int(10), Value::Int(2)]]);
}

#[test]
fn update_undo_restores_before_values() {
    let entry = SqlUndoLog::update(
        TableRecords::new(order_meta(), vec![item(10, 1, "A", 1), item(10, 2, "B", 5)]),
        TableRecords::new(order_meta(), vec![item(10, 1, "A", 9), item(10, 2, "B", 9)]),
    )
    .unwrap();
    let executor = UpdateUndoExecutor::new(&entry, DbType::MySql);
    let compensation = executor.compensating_statement().unwrap();

    assert_eq!(
        compensation.sql,
        "UPDATE order_item SET sku = ?, qty = ? WHERE order_id = ? AND line_no = ?"
    );
    assert_eq!(
        compensation.params,
        vec![
            vec![Value::from("A"), Value::Int(1), Value::Int(10), Value::Int(1)],
            vec![Value::from("B"), Value::Int(5), Value::Int(10), Value::Int(2)],
        ]
    );
    assert_eq!(executor.undo_rows().rows()[0].get("qty").unwrap().value(), &Value::Int(9));
}

#[test]
fn update_undo_quotes_for_oracle_case_folding() {
    let meta = TableMeta::new("app.Account")
        .with_column(ColumnMeta::new("ID", DataType::Int))
        .with_column(ColumnMeta::new("Balance", DataType::Decimal))
        .with_primary_key(["ID"]);
    let row = |balance: &str| {
        Row::new(vec![
            Field::new("ID", DataType::Int, 1),
            Field::new("Balance", DataType::Decimal, Value::decimal(balance).unwrap()),
        ])
        .unwrap()
    };
    let entry = SqlUndoLog::update(
        TableRecords::new(meta.clone(), vec![row("10.00")]),
        TableRecords::new(meta, vec![row("7.50")]),
    )
    .unwrap();

    assert_eq!(
        UpdateUndoExecutor::new(&entry, DbType::Oracle)
            .build_undo_sql()
            .unwrap(),
        "UPDATE \"app\".\"Account\" SET \"Balance\" = ? WHERE ID = ?"
    );
}

#[test]
fn delete_undo_reinserts_in_column_order() {
    let entry =
        SqlUndoLog::delete(TableRecords::new(order_meta(), vec![item(3, 1, "Z", 2)])).unwrap();
    let executor = DeleteUndoExecutor::new(&entry, DbType::MariaDb);
    let compensation = executor.compensating_statement().unwrap();

    assert_eq!(
        compensation.sql,
        "INSERT INTO order_item (order_id, line_no, sku, qty) VALUES (?, ?, ?, ?)"
    );
    assert_eq!(
        compensation.params,
        vec![vec![Value::Int(3), Value::Int(1), Value::from("Z"), Value::Int(2)]]
    );
    assert_eq!(executor.undo_rows().len(), 1);
}

#[test]
fn delete_undo_keeps_nulls() {
    let meta = table_name_meta();
    let row = Row::new(vec![
        Field::new("ID", DataType::Int, 4),
        Field::new("AGE", DataType::Varchar, Value::Null),
    ])
    .unwrap();
    let entry = SqlUndoLog::delete(TableRecords::new(meta, vec![row])).unwrap();
    let compensation = DeleteUndoExecutor::new(&entry, DbType::PostgreSql)
        .compensating_statement()
        .unwrap();

    assert_eq!(compensation.sql, "INSERT INTO \"TABLE_NAME\" (\"ID\", \"AGE\") VALUES (?, ?)");
    assert_eq!(compensation.params, vec![vec![Value::Int(4), Value::Null]]);
}

#[test]
fn row_missing_a_column_of_the_first_row_fails_to_bind() {
    let meta = table_name_meta();
    let short = Row::new(vec![Field::new("ID", DataType::Int, 2)]).unwrap();
    let entry = SqlUndoLog::delete(TableRecords::new(meta, vec![id_age(1, "a"), short])).unwrap();

    let err = DeleteUndoExecutor::new(&entry, DbType::MySql)
        .compensating_statement()
        .unwrap_err();
    assert!(matches!(undo_error(&err), Some(UndoError::BindingError { .. })));
}

#[test]
fn holder_dispatches_on_entry_kind() {
    let registry = UndoExecutorRegistry::new();
    let holder = registry.holder(DbType::OceanBaseOracle).unwrap();

    let insert = SqlUndoLog::insert(TableRecords::new(table_name_meta(), vec![id_age(1, "a")]))
        .unwrap();
    let delete = SqlUndoLog::delete(TableRecords::new(table_name_meta(), vec![id_age(1, "a")]))
        .unwrap();

    assert_eq!(executor_for(holder.as_ref(), &insert).unwrap().sql_type(), SqlType::Insert);
    assert_eq!(executor_for(holder.as_ref(), &delete).unwrap().sql_type(), SqlType::Delete);
    assert_eq!(executor_for(holder.as_ref(), &delete).unwrap().dialect(), DbType::OceanBaseOracle);
}

#[test]
fn missing_holder_is_unsupported() {
    let mut registry = UndoExecutorRegistry::empty();
    registry.register(std::sync::Arc::new(DialectExecutorHolder::new(DbType::MySql)));

    assert!(registry.contains(DbType::MySql));
    let err = registry.holder(DbType::Oracle).unwrap_err();
    assert!(matches!(
        undo_error(&err),
        Some(UndoError::UnsupportedDialectOrKind { dialect, .. }) if dialect == "oracle"
    ));
}

#[test]
fn expected_images_follow_entry_kind() {
    let before = TableRecords::new(table_name_meta(), vec![id_age(1, "a")]);
    let after = TableRecords::new(table_name_meta(), vec![id_age(1, "b")]);
    let entry = SqlUndoLog::update(before, after).unwrap();
    let executor = UpdateUndoExecutor::new(&entry, DbType::MySql);
    let images = executor.expected_images();

    assert_eq!(images.classify(0, Some(&id_age(1, "b"))), RowState::Proceed);
    assert_eq!(images.classify(0, Some(&id_age(1, "a"))), RowState::AlreadyRestored);
}
