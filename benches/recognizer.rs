//! Recognition and Compensation Benchmarks
//!
//! Measures the per-statement cost paid on the branch's hot path
//! (recognizing DML and rendering its predicate) and the cost of building
//! compensating statements at rollback.
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench --bench recognizer
//! ```

use bumpalo::Bump;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use branchundo::records::{Field, Row, SqlUndoLog, TableRecords};
use branchundo::schema::{ColumnMeta, TableMeta};
use branchundo::undo::executor_for;
use branchundo::{
    DataType, DbType, ParameterGroups, RecognizerRegistry, UndoExecutor, UndoExecutorRegistry, Value,
};

const STATEMENTS: &[(&str, &str)] = &[
    ("point_update", "UPDATE t_user SET name = ?, age = ? WHERE id = ?"),
    (
        "range_delete",
        "DELETE FROM t_user WHERE age BETWEEN ? AND ? AND name LIKE ? ORDER BY id LIMIT 100",
    ),
    (
        "select_for_update",
        "SELECT id, name FROM t_user u WHERE u.id IN (?, ?, ?, ?) AND u.age > ? FOR UPDATE",
    ),
    (
        "multi_row_insert",
        "INSERT INTO t_user (id, name, age) VALUES (?, ?, ?), (?, ?, ?), (?, ?, ?)",
    ),
];

fn bench_recognize(c: &mut Criterion) {
    let registry = RecognizerRegistry::new();
    let params: Vec<Value> = (0..16).map(|i| Value::Int(i as i64)).collect();

    let mut group = c.benchmark_group("recognize");
    for (name, sql) in STATEMENTS {
        group.throughput(Throughput::Bytes(sql.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), sql, |b, sql| {
            let mut arena = Bump::new();
            b.iter(|| {
                arena.reset();
                let recognizers = registry.recognize(black_box(sql), DbType::MySql, &arena).unwrap();
                let mut groups = ParameterGroups::new();
                let text = recognizers[0]
                    .where_condition_with_params(&params, &mut groups)
                    .unwrap();
                black_box((text, groups))
            });
        });
    }
    group.finish();
}

fn accounts(rows: usize) -> (TableRecords, TableRecords) {
    let meta = TableMeta::new("account")
        .with_column(ColumnMeta::new("id", DataType::BigInt))
        .with_column(ColumnMeta::new("owner", DataType::Varchar))
        .with_column(ColumnMeta::new("balance", DataType::Decimal))
        .with_primary_key(["id"]);
    let row = |id: usize, balance: &str| {
        Row::new(vec![
            Field::new("id", DataType::BigInt, id as i64),
            Field::new("owner", DataType::Varchar, format!("owner-{}", id)),
            Field::new("balance", DataType::Decimal, Value::decimal(balance).unwrap()),
        ])
        .unwrap()
    };
    let before = (0..rows).map(|i| row(i, "100.00")).collect();
    let after = (0..rows).map(|i| row(i, "75.25")).collect();
    (
        TableRecords::new(meta.clone(), before),
        TableRecords::new(meta, after),
    )
}

fn bench_compensating_statement(c: &mut Criterion) {
    let registry = UndoExecutorRegistry::new();
    let mut group = c.benchmark_group("compensating_statement");

    for rows in [1usize, 100, 1000] {
        let (before, after) = accounts(rows);
        let entry = SqlUndoLog::update(before, after).unwrap();
        group.throughput(Throughput::Elements(rows as u64));

        for dialect in [DbType::MySql, DbType::Oracle] {
            let holder = registry.holder(dialect).unwrap();
            group.bench_with_input(
                BenchmarkId::new(dialect.name(), rows),
                &entry,
                |b, entry| {
                    b.iter(|| {
                        let executor = executor_for(holder.as_ref(), entry).unwrap();
                        black_box(executor.compensating_statement().unwrap())
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_recognize, bench_compensating_statement);
criterion_main!(benches);
