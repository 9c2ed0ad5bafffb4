use std::collections::BTreeMap;

use bumpalo::Bump;

use super::*;
use crate::error::{undo_error, UndoError};
use crate::sql::ast::Statement;
use crate::sql::parser::Parser;
use crate::types::Value;

fn recognize_one<'a>(sql: &'a str, dialect: DbType, arena: &'a Bump) -> Box<dyn SqlRecognizer + 'a> {
    let mut recognizers = RecognizerRegistry::new()
        .recognize(sql, dialect, arena)
        .unwrap();
    assert_eq!(recognizers.len(), 1);
    recognizers.remove(0)
}

fn recognize_err(sql: &str, dialect: DbType) -> UndoError {
    let arena = Bump::new();
    let report = RecognizerRegistry::new()
        .recognize(sql, dialect, &arena)
        .unwrap_err();
    undo_error(&report).cloned().unwrap()
}

fn parse_delete<'a>(sql: &'a str, dialect: DbType, arena: &'a Bump) -> &'a crate::sql::ast::DeleteStmt<'a> {
    let mut parser = Parser::new(sql, dialect, arena);
    match parser.parse_statement().unwrap() {
        Statement::Delete(delete) => delete,
        other => panic!("expected DELETE, got {}", other.kind_name()),
    }
}

#[test]
fn select_for_update_groups_in_list_and_like() {
    let arena = Bump::new();
    let sql = "SELECT id, name FROM t WHERE id IN (?, ?) AND name LIKE ? FOR UPDATE";
    let recognizer = recognize_one(sql, DbType::MySql, &arena);

    assert_eq!(recognizer.sql_type(), SqlType::SelectForUpdate);
    assert_eq!(recognizer.table_name(), "t");
    assert_eq!(recognizer.table_alias(), None);
    assert_eq!(recognizer.original_sql(), sql);

    let params = vec![Value::Int(1), Value::Int(2), Value::from("%test%")];
    let mut groups = ParameterGroups::new();
    let predicate = recognizer
        .where_condition_with_params(&params, &mut groups)
        .unwrap();

    assert_eq!(predicate, "id IN (?, ?)\n\tAND name LIKE ?");
    assert_eq!(
        groups,
        vec![
            vec![Value::Int(1), Value::Int(2)],
            vec![Value::from("%test%")]
        ]
    );
}

#[test]
fn select_for_update_in_every_dialect() {
    let cases = [
        (DbType::MySql, "select * from t_user u where u.id = ? for update"),
        (DbType::MariaDb, "select * from t_user u where u.id = ? for update nowait"),
        (DbType::PostgreSql, "select * from t_user u where u.id = $1 for no key update"),
        (DbType::Oracle, "select * from t_user u where u.id = :id for update of u.id"),
        (DbType::OceanBaseOracle, "select * from t_user u where u.id = ? for update wait 3"),
    ];

    for (dialect, sql) in cases {
        let arena = Bump::new();
        let recognizer = recognize_one(sql, dialect, &arena);
        assert_eq!(recognizer.sql_type(), SqlType::SelectForUpdate, "{}", dialect);
        assert_eq!(recognizer.table_name(), "t_user");
        assert_eq!(recognizer.table_alias(), Some("u"));
        assert_eq!(recognizer.where_condition().unwrap(), "u.id = ?");
    }
}

#[test]
fn plain_select_is_not_recognized() {
    let err = recognize_err("SELECT * FROM t WHERE id = 1", DbType::MySql);
    assert_eq!(
        err,
        UndoError::UnsupportedDialectOrKind {
            dialect: "mysql".into(),
            kind: "SELECT".into()
        }
    );

    let err = recognize_err("SELECT * FROM t FOR SHARE", DbType::PostgreSql);
    assert!(matches!(err, UndoError::UnsupportedDialectOrKind { .. }));
}

#[test]
fn select_for_update_over_join_is_unsupported() {
    let err = recognize_err(
        "SELECT * FROM a JOIN b ON a.id = b.id WHERE a.id = ? FOR UPDATE",
        DbType::MySql,
    );
    assert!(matches!(err, UndoError::UnsupportedDialectOrKind { .. }));
}

#[test]
fn insert_accessors() {
    let arena = Bump::new();
    let sql = "INSERT INTO app.t_user (id, name, age, created) VALUES (?, 'a''b', -3, now()), (?, NULL, DEFAULT, ?)";
    let recognizers = RecognizerRegistry::new()
        .recognize(sql, DbType::MySql, &arena)
        .unwrap();
    assert_eq!(recognizers[0].sql_type(), SqlType::Insert);
    assert_eq!(recognizers[0].table_name(), "app.t_user");
    assert_eq!(recognizers[0].where_condition().unwrap(), "");

    let Statement::Insert(stmt) = Parser::new(sql, DbType::MySql, &arena)
        .parse_statement()
        .unwrap()
    else {
        panic!("expected INSERT");
    };
    let insert = InsertRecognizer::new(sql, stmt, DbType::MySql).unwrap();

    assert_eq!(insert.insert_columns(), &["id", "name", "age", "created"]);
    assert!(!insert.is_columns_empty());
    assert_eq!(insert.row_count(), 2);
    assert_eq!(insert.insert_param_positions(), vec![vec![1], vec![2, 3]]);

    let rows = insert.insert_rows().unwrap();
    assert_eq!(
        rows[0],
        vec![
            InsertValue::Placeholder(1),
            InsertValue::Literal(Value::from("a'b")),
            InsertValue::Literal(Value::Int(-3)),
            InsertValue::Expression("now()".into()),
        ]
    );
    assert_eq!(
        rows[1],
        vec![
            InsertValue::Placeholder(2),
            InsertValue::Null,
            InsertValue::Default,
            InsertValue::Placeholder(3),
        ]
    );
}

#[test]
fn insert_sequences_are_classified() {
    let arena = Bump::new();
    let sql = "INSERT INTO T (ID, NAME) VALUES (SEQ_T.NEXTVAL, ?)";
    let Statement::Insert(stmt) = Parser::new(sql, DbType::Oracle, &arena)
        .parse_statement()
        .unwrap()
    else {
        panic!("expected INSERT");
    };
    let insert = InsertRecognizer::new(sql, stmt, DbType::Oracle).unwrap();
    let rows = insert.insert_rows().unwrap();
    assert_eq!(rows[0][0], InsertValue::Sequence("SEQ_T.NEXTVAL".into()));

    let sql = "INSERT INTO t (id) VALUES (nextval('t_seq'))";
    let Statement::Insert(stmt) = Parser::new(sql, DbType::PostgreSql, &arena)
        .parse_statement()
        .unwrap()
    else {
        panic!("expected INSERT");
    };
    let insert = InsertRecognizer::new(sql, stmt, DbType::PostgreSql).unwrap();
    assert_eq!(
        insert.insert_rows().unwrap()[0][0],
        InsertValue::Sequence("nextval('t_seq')".into())
    );
}

#[test]
fn insert_select_is_unsupported() {
    let err = recognize_err("INSERT INTO t (id) SELECT id FROM u", DbType::MySql);
    assert!(matches!(err, UndoError::UnsupportedDialectOrKind { .. }));
}

#[test]
fn insert_row_width_must_match_columns() {
    let err = recognize_err("INSERT INTO t (a, b) VALUES (1)", DbType::MySql);
    assert!(matches!(err, UndoError::ParseFailure { .. }));
}

#[test]
fn update_accessors() {
    let arena = Bump::new();
    let sql = "UPDATE t_user u SET u.name = ?, age = age + 1 WHERE u.id = ? ORDER BY u.id DESC LIMIT ?";
    let Statement::Update(stmt) = Parser::new(sql, DbType::MySql, &arena)
        .parse_statement()
        .unwrap()
    else {
        panic!("expected UPDATE");
    };
    let update = UpdateRecognizer::new(sql, stmt, DbType::MySql).unwrap();

    assert_eq!(update.table_name(), "t_user");
    assert_eq!(update.table_alias(), Some("u"));
    assert_eq!(update.update_columns(), vec!["name", "age"]);
    assert_eq!(update.update_values().unwrap(), vec!["?", "age + 1"]);
    assert_eq!(update.where_condition().unwrap(), "u.id = ?");
    assert_eq!(update.order_by_condition().unwrap(), "ORDER BY u.id DESC");
    assert_eq!(update.limit_condition().unwrap(), "LIMIT ?");

    let params = vec![Value::from("n"), Value::Int(7), Value::Int(10)];
    let mut groups = ParameterGroups::new();
    update.where_condition_with_params(&params, &mut groups).unwrap();
    update.limit_condition_with_params(&params, &mut groups).unwrap();
    assert_eq!(groups, vec![vec![Value::Int(7)], vec![Value::Int(10)]]);
}

#[test]
fn multi_table_update_is_unsupported() {
    let err = recognize_err(
        "UPDATE a JOIN b ON a.id = b.id SET a.x = 1 WHERE b.y = 2",
        DbType::MySql,
    );
    assert_eq!(
        err,
        UndoError::UnsupportedDialectOrKind {
            dialect: "mysql".into(),
            kind: "multi-table UPDATE".into()
        }
    );
}

#[test]
fn delete_in_every_dialect() {
    let cases = [
        (DbType::MySql, "DELETE FROM `order` WHERE id = ?", "`order`"),
        (DbType::MariaDb, "DELETE LOW_PRIORITY FROM t WHERE id = ?", "t"),
        (DbType::PostgreSql, "DELETE FROM public.t WHERE id = $1", "public.t"),
        (DbType::Oracle, "DELETE T WHERE ID = :id", "T"),
        (DbType::OceanBaseOracle, "DELETE FROM T WHERE ID = ?", "T"),
    ];
    for (dialect, sql, table) in cases {
        let arena = Bump::new();
        let recognizer = recognize_one(sql, dialect, &arena);
        assert_eq!(recognizer.sql_type(), SqlType::Delete);
        assert_eq!(recognizer.table_name(), table, "{}", dialect);
    }
}

#[test]
fn delete_without_where_has_empty_predicate() {
    let arena = Bump::new();
    let recognizer = recognize_one("DELETE FROM t", DbType::MySql, &arena);
    let mut groups = ParameterGroups::new();
    let no_params: Vec<Value> = Vec::new();
    assert_eq!(
        recognizer
            .where_condition_with_params(&no_params, &mut groups)
            .unwrap(),
        ""
    );
    assert!(groups.is_empty());
}

#[test]
fn postgres_delete_using_is_unsupported() {
    let err = recognize_err("DELETE FROM t USING u WHERE t.id = u.id", DbType::PostgreSql);
    assert!(matches!(err, UndoError::UnsupportedDialectOrKind { .. }));
}

#[test]
fn multi_delete_resolves_aliases() {
    let arena = Bump::new();
    let sql = "DELETE a, b FROM t1 a JOIN t2 b ON a.id = b.t1_id WHERE a.id = ?";
    let delete = parse_delete(sql, DbType::MySql, &arena);
    let recognizer = MultiDeleteRecognizer::new(sql, delete, DbType::MySql).unwrap();

    assert_eq!(recognizer.sql_type(), SqlType::MultiDelete);
    assert_eq!(recognizer.table_name(), "t1");
    assert_eq!(recognizer.table_alias(), Some("a"));
    assert_eq!(recognizer.target_tables(), vec!["t1", "t2"]);
    assert_eq!(recognizer.where_condition().unwrap(), "a.id = ?");
}

#[test]
fn multi_delete_using_form() {
    let arena = Bump::new();
    let recognizer = recognize_one(
        "DELETE FROM t1, t2 USING t1 INNER JOIN t2 ON t1.id = t2.id WHERE t1.k = ?",
        DbType::MariaDb,
        &arena,
    );
    assert_eq!(recognizer.sql_type(), SqlType::MultiDelete);
    assert_eq!(recognizer.table_name(), "t1");
}

#[test]
fn multi_delete_unknown_target_fails() {
    let err = recognize_err("DELETE x FROM t1 JOIN t2 ON t1.id = t2.id", DbType::MySql);
    assert!(matches!(err, UndoError::ParseFailure { .. }));
}

#[test]
fn several_statements_yield_several_recognizers() {
    let arena = Bump::new();
    let recognizers = RecognizerRegistry::new()
        .recognize(
            "UPDATE t SET a = ? WHERE id = ?; DELETE FROM t WHERE id = ?",
            DbType::MySql,
            &arena,
        )
        .unwrap();

    assert_eq!(recognizers.len(), 2);
    assert_eq!(recognizers[0].sql_type(), SqlType::Update);
    assert_eq!(recognizers[0].original_sql(), "UPDATE t SET a = ? WHERE id = ?");
    assert_eq!(recognizers[1].sql_type(), SqlType::Delete);

    let params = vec![Value::from("x"), Value::Int(1), Value::Int(2)];
    let mut groups = ParameterGroups::new();
    recognizers[1]
        .where_condition_with_params(&params, &mut groups)
        .unwrap();
    assert_eq!(groups, vec![vec![Value::Int(2)]]);
}

#[test]
fn registry_without_shape_reports_unsupported() {
    let mut registry = RecognizerRegistry::empty();
    assert!(!registry.supports(DbType::Oracle, SqlType::Delete));

    let arena = Bump::new();
    let report = registry
        .recognize("DELETE FROM T WHERE ID = 1", DbType::Oracle, &arena)
        .unwrap_err();
    assert_eq!(
        undo_error(&report),
        Some(&UndoError::unsupported("oracle", "DELETE"))
    );

    let full = RecognizerRegistry::new();
    assert!(full.supports(DbType::MySql, SqlType::MultiDelete));
    assert!(!full.supports(DbType::PostgreSql, SqlType::MultiDelete));

    fn oracle_delete<'a>(
        parsed: &crate::sql::parser::ParsedStatement<'a>,
        dialect: DbType,
    ) -> eyre::Result<Box<dyn SqlRecognizer + 'a>> {
        RecognizerRegistry::new().recognizer(parsed, dialect)
    }
    registry.register(DbType::Oracle, SqlType::Delete, oracle_delete);
    assert!(registry
        .recognize("DELETE FROM T WHERE ID = 1", DbType::Oracle, &arena)
        .is_ok());
}

#[test]
fn sql_type_serializes_in_screaming_case() {
    let json = serde_json::to_string(&SqlType::SelectForUpdate).unwrap();
    assert_eq!(json, "\"SELECT_FOR_UPDATE\"");
    assert_eq!(SqlType::MultiDelete.to_string(), "MULTI_DELETE");
}

#[test]
fn unknown_placeholder_binding_fails() {
    let arena = Bump::new();
    let recognizer = recognize_one("DELETE FROM t WHERE a = ? AND b IN (?)", DbType::MySql, &arena);
    let mut params = BTreeMap::new();
    params.insert(1u32, vec![Value::Int(1)]);
    let mut groups = ParameterGroups::new();
    let report = recognizer
        .where_condition_with_params(&params, &mut groups)
        .unwrap_err();
    assert!(matches!(
        undo_error(&report),
        Some(UndoError::BindingError { .. })
    ));
}

/// Recognition either succeeds or fails with a typed error; rendering the
/// predicate of a recognized statement never panics.
fn recognize_without_panic(sql: &str, dialect: DbType) {
    let arena = Bump::new();
    match RecognizerRegistry::new().recognize(sql, dialect, &arena) {
        Ok(recognizers) => {
            for recognizer in &recognizers {
                let _ = recognizer.where_condition();
                let params = vec![Value::Int(1); 8];
                let mut groups = ParameterGroups::new();
                if let Err(report) = recognizer.where_condition_with_params(&params, &mut groups) {
                    assert!(undo_error(&report).is_some(), "{}: {:#}", sql, report);
                }
            }
        }
        Err(report) => assert!(
            matches!(
                undo_error(&report),
                Some(UndoError::ParseFailure { .. } | UndoError::UnsupportedDialectOrKind { .. })
            ),
            "{}: {:#}",
            sql,
            report
        ),
    };
}

#[test]
fn non_ascii_input_never_panics() {
    let inputs = [
        "SELECT id FROM t WHERE a = $$é$$ FOR UPDATE",
        "UPDATE t SET a = $ü$ö$ü$ WHERE id = $1",
        "DELETE FROM é WHERE ü = ?",
        "DELETE FROM t WHERE a = 'é' AND b = \"ü\"",
        "DELETE FROM `日本` WHERE `列` IN (?, ?)",
        "INSERT INTO t (名前) VALUES (?)",
        "DELETE FROM t WHERE a = 'é",
        "DELETE FROM t WHERE a = $$é",
        "UPDATE é SET",
        "DELETE FROM t WHERE a = ? é ö",
        "DELETE FROM t WHERE a ≠ ?",
        "é",
        "'\\é'",
        "/* é",
        "-- é",
        "@é :é $é",
        "DELETE FROM t WHERE a = X'é'",
        "DELETE FROM t WHERE a = 1eé",
    ];
    for dialect in DbType::ALL {
        for sql in inputs {
            recognize_without_panic(sql, dialect);
        }
    }
}

#[test]
fn unquoted_non_ascii_identifiers_are_recognized() {
    let arena = Bump::new();
    let recognizer = recognize_one("DELETE FROM tabla WHERE año = ? AND ü IN (?, ?)", DbType::PostgreSql, &arena);
    assert_eq!(recognizer.where_condition().unwrap(), "año = ?\n\tAND ü IN (?, ?)");
}

mod arbitrary_text {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn arbitrary_strings_never_panic(sql in any::<String>(), dialect in 0usize..DbType::ALL.len()) {
            recognize_without_panic(&sql, DbType::ALL[dialect]);
        }

        #[test]
        fn dml_prefixed_noise_never_panics(
            prefix in prop::sample::select(vec!["DELETE FROM t WHERE ", "UPDATE t SET a = ", "SELECT a FROM t WHERE "]),
            tail in "[a-z0-9 ,()=?$'\"`:@éü日\\\\]{0,24}",
            dialect in 0usize..DbType::ALL.len(),
        ) {
            recognize_without_panic(&format!("{}{}", prefix, tail), DbType::ALL[dialect]);
        }
    }
}
