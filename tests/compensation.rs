//! # Branch Compensation Tests
//!
//! Drives `UndoCompensator` against the in-memory store: the store holds the
//! state a branch left behind, the compensator undoes it, and the store must
//! end up exactly as it was before the branch ran.
//!
//! ## Requirements Tested
//!
//! - R1: INSERT, UPDATE and DELETE entries are each reversed
//! - R2: Entries are undone last statement first
//! - R3: Rows changed by another writer are skipped and reported
//! - R4: Rows already back in their original state are not touched again
//! - R5: Disabling validation compensates every row
//! - R6: An undo log read back from disk compensates the same way

mod common;

use branchundo::undo::codec::JsonUndoLogParser;
use branchundo::undo::UndoLogParser;
use std::sync::Arc;

use branchundo::records::{Field, Row, TableRecords};
use branchundo::schema::ColumnMeta;
use branchundo::{
    undo_error, BranchUndoLog, Catalog, DataType, DbType, EngineConfig, SqlUndoLog, TableMeta,
    UndoCompensator, UndoError, UndoExecutorRegistry, Value,
};
use common::{database_after, stock, stock_meta, user, users, users_meta};

fn compensator(dialect: DbType) -> UndoCompensator {
    let config = EngineConfig::for_db_type(dialect);
    UndoCompensator::new(config, &UndoExecutorRegistry::new()).unwrap()
}

mod reversal {
    use super::*;

    #[test]
    fn high_scale_decimal_key_is_compensated() {
        let meta = TableMeta::new("t_rate")
            .with_column(ColumnMeta::new("rate", DataType::Decimal))
            .with_column(ColumnMeta::new("label", DataType::Varchar))
            .with_primary_key(["rate"]);
        let rate = Value::decimal(&format!("0.{}1", "0".repeat(40))).unwrap();
        let row = Row::new(vec![
            Field::new("rate", DataType::Decimal, rate),
            Field::new("label", DataType::Varchar, "tiny"),
        ])
        .unwrap();
        let entry = SqlUndoLog::delete(TableRecords::new(meta.clone(), vec![row.clone()])).unwrap();
        let db = database_after(DbType::Oracle, &[meta], &[entry.clone()]);

        let log = BranchUndoLog::new("xid", 1).with_entry(entry);
        let report = compensator(DbType::Oracle)
            .compensate(&mut db.connection(), &log)
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(db.rows("t_rate"), vec![row]);
    }

    #[test]
    fn question_mark_in_column_name_is_not_a_placeholder() {
        let meta = TableMeta::new("t_note")
            .with_column(ColumnMeta::new("id", DataType::BigInt))
            .with_column(ColumnMeta::new("what?", DataType::Varchar))
            .with_primary_key(["id"]);
        let row = Row::new(vec![
            Field::new("id", DataType::BigInt, 1i64),
            Field::new("what?", DataType::Varchar, "x"),
        ])
        .unwrap();
        let entry = SqlUndoLog::delete(TableRecords::new(meta.clone(), vec![row.clone()])).unwrap();
        let db = database_after(DbType::MySql, &[meta], &[entry.clone()]);

        let log = BranchUndoLog::new("xid", 1).with_entry(entry);
        let report = compensator(DbType::MySql)
            .compensate(&mut db.connection(), &log)
            .unwrap();

        assert_eq!(report.applied(), 1);
        assert_eq!(
            db.executed()[0].sql,
            "INSERT INTO t_note (id, `what?`) VALUES (?, ?)"
        );
        assert_eq!(db.rows("t_note"), vec![row]);
    }

    #[test]
    fn insert_entry_deletes_inserted_rows() {
        let entry = SqlUndoLog::insert(users(vec![user(1, "ann", 30), user(2, "bob", 41)])).unwrap();
        let db = database_after(DbType::MySql, &[users_meta()], &[entry.clone()]);
        db.put_row("t_user", user(3, "untouched", 50));

        let log = BranchUndoLog::new("xid-1", 1).with_entry(entry);
        let report = compensator(DbType::MySql)
            .compensate(&mut db.connection(), &log)
            .unwrap();

        assert_eq!(report.applied(), 2);
        assert!(report.is_clean());
        assert_eq!(db.rows("t_user"), vec![user(3, "untouched", 50)]);
        assert_eq!(db.executed()[0].sql, "DELETE FROM t_user WHERE id = ?");
    }

    #[test]
    fn update_entry_restores_before_values() {
        let entry = SqlUndoLog::update(
            users(vec![user(1, "ann", 30), user(2, "bob", 41)]),
            users(vec![user(1, "ann", 31), user(2, "bobby", 41)]),
        )
        .unwrap();
        let db = database_after(DbType::PostgreSql, &[users_meta()], &[entry.clone()]);

        let log = BranchUndoLog::new("xid-2", 7).with_entry(entry);
        compensator(DbType::PostgreSql)
            .compensate(&mut db.connection(), &log)
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(db.rows("t_user"), vec![user(1, "ann", 30), user(2, "bob", 41)]);
        assert_eq!(
            db.executed()[0].sql,
            "UPDATE t_user SET name = ?, age = ? WHERE id = ?"
        );
    }

    #[test]
    fn delete_entry_reinserts_rows() {
        let entry = SqlUndoLog::delete(users(vec![user(5, "eve", 22)])).unwrap();
        let db = database_after(DbType::Oracle, &[users_meta()], &[entry.clone()]);
        assert!(db.rows("t_user").is_empty());

        let log = BranchUndoLog::new("xid-3", 2).with_entry(entry);
        compensator(DbType::Oracle)
            .compensate(&mut db.connection(), &log)
            .unwrap();

        assert_eq!(db.rows("t_user"), vec![user(5, "eve", 22)]);
        assert_eq!(
            db.executed()[0].sql,
            "INSERT INTO \"t_user\" (\"id\", \"name\", \"age\") VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn composite_keys_are_read_back_as_row_tuples() {
        let entry = SqlUndoLog::update(
            common::stock_records(vec![stock(1, "A", 10), stock(2, "A", 4)]),
            common::stock_records(vec![stock(1, "A", 9), stock(2, "A", 3)]),
        )
        .unwrap();
        let db = database_after(DbType::MariaDb, &[stock_meta()], &[entry.clone()]);

        let log = BranchUndoLog::new("xid-4", 3).with_entry(entry);
        compensator(DbType::MariaDb)
            .compensate(&mut db.connection(), &log)
            .unwrap();

        let (sql, params) = &db.queries()[0];
        assert_eq!(
            sql,
            "SELECT * FROM stock WHERE (warehouse, sku) IN ((?, ?), (?, ?))"
        );
        assert_eq!(
            params,
            &vec![Value::Int(1), Value::from("A"), Value::Int(2), Value::from("A")]
        );
        assert_eq!(db.rows("stock"), vec![stock(1, "A", 10), stock(2, "A", 4)]);
    }

    #[test]
    fn entries_are_undone_in_reverse_order() {
        let insert = SqlUndoLog::insert(users(vec![user(9, "tmp", 1)])).unwrap();
        let update = SqlUndoLog::update(users(vec![user(9, "tmp", 1)]), users(vec![user(9, "tmp", 2)]))
            .unwrap();
        let db = database_after(DbType::MySql, &[users_meta()], &[insert.clone(), update.clone()]);

        let log = BranchUndoLog::new("xid-5", 4)
            .with_entry(insert)
            .with_entry(update);
        let report = compensator(DbType::MySql)
            .compensate(&mut db.connection(), &log)
            .unwrap();

        let kinds: Vec<_> = report.entries.iter().map(|e| e.sql_type.as_str()).collect();
        assert_eq!(kinds, vec!["UPDATE", "INSERT"]);
        assert!(report.is_clean());
        assert!(db.rows("t_user").is_empty());
    }

    #[test]
    fn no_op_entry_runs_nothing() {
        let entry = SqlUndoLog::update(users(vec![user(1, "same", 1)]), users(vec![user(1, "same", 1)]))
            .unwrap();
        let db = database_after(DbType::MySql, &[users_meta()], &[entry.clone()]);

        let log = BranchUndoLog::new("xid-6", 5).with_entry(entry);
        let report = compensator(DbType::MySql)
            .compensate(&mut db.connection(), &log)
            .unwrap();

        assert_eq!(report.applied(), 0);
        assert!(db.queries().is_empty());
        assert!(db.executed().is_empty());
    }
}

mod dirty_check {
    use super::*;

    #[test]
    fn changed_row_is_reported_and_left_alone() {
        let entry = SqlUndoLog::update(
            users(vec![user(1, "ann", 30), user(2, "bob", 41)]),
            users(vec![user(1, "ann", 31), user(2, "bob", 42)]),
        )
        .unwrap();
        let db = database_after(DbType::MySql, &[users_meta()], &[entry.clone()]);
        db.put_row("t_user", user(2, "bob", 99));

        let log = BranchUndoLog::new("xid-7", 6).with_entry(entry);
        let report = compensator(DbType::MySql)
            .compensate(&mut db.connection(), &log)
            .unwrap();

        assert_eq!(report.applied(), 1);
        assert_eq!(report.entries[0].conflicts, vec!["id=2".to_string()]);
        assert_eq!(db.rows("t_user"), vec![user(1, "ann", 30), user(2, "bob", 99)]);
        assert_eq!(db.executed().len(), 1);

        let err = report.into_result().unwrap_err();
        assert_eq!(
            undo_error(&err),
            Some(&UndoError::ConflictDetected {
                table: "t_user".into(),
                conflicts: 1
            })
        );
    }

    #[test]
    fn reinserted_row_conflicts_with_delete_undo() {
        let entry = SqlUndoLog::delete(users(vec![user(4, "dan", 60)])).unwrap();
        let db = database_after(DbType::PostgreSql, &[users_meta()], &[entry.clone()]);
        db.put_row("t_user", user(4, "someone else", 18));

        let log = BranchUndoLog::new("xid-8", 8).with_entry(entry);
        let report = compensator(DbType::PostgreSql)
            .compensate(&mut db.connection(), &log)
            .unwrap();

        assert_eq!(report.conflicts(), 1);
        assert!(db.executed().is_empty());
    }

    #[test]
    fn already_restored_rows_are_skipped() {
        let insert = SqlUndoLog::insert(users(vec![user(1, "a", 1)])).unwrap();
        let delete = SqlUndoLog::delete(users(vec![user(2, "b", 2)])).unwrap();
        let update = SqlUndoLog::update(users(vec![user(3, "c", 3)]), users(vec![user(3, "c", 4)]))
            .unwrap();
        let db = common::MemoryDatabase::new(DbType::MySql);
        db.create_table(users_meta());
        db.put_row("t_user", user(2, "b", 2));
        db.put_row("t_user", user(3, "c", 3));

        let log = BranchUndoLog::new("xid-9", 9)
            .with_entry(insert)
            .with_entry(delete)
            .with_entry(update);
        let report = compensator(DbType::MySql)
            .compensate(&mut db.connection(), &log)
            .unwrap();

        assert_eq!(report.applied(), 0);
        assert!(report.is_clean());
        assert!(report.entries.iter().all(|e| e.already_restored == 1));
        assert!(db.executed().is_empty());
    }

    #[test]
    fn lookups_are_chunked() {
        let rows: Vec<_> = (1..=5).map(|i| user(i, "n", i)).collect();
        let entry = SqlUndoLog::insert(users(rows)).unwrap();
        let db = database_after(DbType::MySql, &[users_meta()], &[entry.clone()]);

        let config = EngineConfig::builder()
            .db_type(DbType::MySql)
            .max_in_list_size(2)
            .build()
            .unwrap();
        let compensator = UndoCompensator::new(config, &UndoExecutorRegistry::new()).unwrap();
        let log = BranchUndoLog::new("xid-10", 10).with_entry(entry);
        compensator.compensate(&mut db.connection(), &log).unwrap();

        let sizes: Vec<_> = db.queries().iter().map(|(_, p)| p.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(db.rows("t_user").is_empty());
    }

    #[test]
    fn disabled_validation_overwrites_changed_rows() {
        let entry = SqlUndoLog::update(users(vec![user(1, "ann", 30)]), users(vec![user(1, "ann", 31)]))
            .unwrap();
        let db = database_after(DbType::MySql, &[users_meta()], &[entry.clone()]);
        db.put_row("t_user", user(1, "changed", 77));

        let config = EngineConfig::builder()
            .db_type(DbType::MySql)
            .data_validation(false)
            .build()
            .unwrap();
        let compensator = UndoCompensator::new(config, &UndoExecutorRegistry::new()).unwrap();
        let log = BranchUndoLog::new("xid-11", 11).with_entry(entry);
        let report = compensator.compensate(&mut db.connection(), &log).unwrap();

        assert_eq!(report.applied(), 1);
        assert!(db.queries().is_empty());
        assert_eq!(db.rows("t_user"), vec![user(1, "ann", 30)]);
    }
}

mod engine {
    use super::*;

    #[test]
    fn missing_holder_fails_at_construction() {
        let err = UndoCompensator::new(
            EngineConfig::for_db_type(DbType::Oracle),
            &UndoExecutorRegistry::empty(),
        )
        .unwrap_err();
        assert!(matches!(
            undo_error(&err),
            Some(UndoError::UnsupportedDialectOrKind { .. })
        ));
    }

    #[test]
    fn unknown_serialization_fails_at_construction() {
        let config = EngineConfig::builder()
            .db_type(DbType::MySql)
            .log_serialization("protostuff")
            .build()
            .unwrap();
        assert!(UndoCompensator::new(config, &UndoExecutorRegistry::new()).is_err());
    }

    #[test]
    fn persisted_log_compensates_after_reload() {
        let entry = SqlUndoLog::delete(users(vec![user(8, "zed", 80)])).unwrap();
        let log = BranchUndoLog::new("10.0.0.1:8091:2001", 2001).with_entry(entry.clone());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("undo_log.json");
        std::fs::write(&path, JsonUndoLogParser.encode(&log).unwrap()).unwrap();

        let db = database_after(DbType::MySql, &[users_meta()], &[entry]);
        let bytes = std::fs::read(&path).unwrap();
        let report = compensator(DbType::MySql)
            .compensate_bytes(&mut db.connection(), &bytes)
            .unwrap();

        assert_eq!(report.xid, "10.0.0.1:8091:2001");
        assert_eq!(db.rows("t_user"), vec![user(8, "zed", 80)]);
    }

    #[test]
    fn tampered_log_is_rejected_on_decode() {
        let entry = SqlUndoLog::delete(users(vec![user(8, "zed", 80)])).unwrap();
        let log = BranchUndoLog::new("xid", 1).with_entry(entry);
        let json = String::from_utf8(JsonUndoLogParser.encode(&log).unwrap()).unwrap();
        let tampered = json.replacen("\"DELETE\"", "\"INSERT\"", 1);

        let err = JsonUndoLogParser.decode(tampered.as_bytes()).unwrap_err();
        assert!(matches!(undo_error(&err), Some(UndoError::InvalidUndoLog { .. })));
    }

    #[test]
    fn metadata_provider_overrides_captured_column_order() {
        let captured = TableMeta::new("t_user")
            .with_column(ColumnMeta::new("age", DataType::Int))
            .with_column(ColumnMeta::new("name", DataType::Varchar))
            .with_column(ColumnMeta::new("id", DataType::BigInt))
            .with_primary_key(["id"]);
        let entry =
            SqlUndoLog::delete(TableRecords::new(captured, vec![user(8, "zed", 80)])).unwrap();
        let db = database_after(DbType::MySql, &[users_meta()], &[entry.clone()]);

        let catalog = Catalog::new().with_table(users_meta()).unwrap();
        let log = BranchUndoLog::new("xid", 1).with_entry(entry);
        compensator(DbType::MySql)
            .with_meta_provider(Arc::new(catalog))
            .compensate(&mut db.connection(), &log)
            .unwrap();

        assert_eq!(
            db.executed()[0].sql,
            "INSERT INTO t_user (id, name, age) VALUES (?, ?, ?)"
        );
        assert_eq!(db.rows("t_user"), vec![user(8, "zed", 80)]);
    }

    #[test]
    fn unknown_table_in_provider_aborts_compensation() {
        let entry = SqlUndoLog::delete(users(vec![user(8, "zed", 80)])).unwrap();
        let db = database_after(DbType::MySql, &[users_meta()], &[entry.clone()]);

        let log = BranchUndoLog::new("xid", 1).with_entry(entry);
        let result = compensator(DbType::MySql)
            .with_meta_provider(Arc::new(Catalog::new()))
            .compensate(&mut db.connection(), &log);

        assert!(result.is_err());
        assert!(db.executed().is_empty());
    }
}
