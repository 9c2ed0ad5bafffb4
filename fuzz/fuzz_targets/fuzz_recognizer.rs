//! Fuzz testing for SQL recognition.
//!
//! Feeds arbitrary text to the recognizer registry under every dialect. Any
//! input may be rejected, but only with a typed error: the lexer, parser and
//! predicate writer must never panic.

#![no_main]

use arbitrary::Arbitrary;
use bumpalo::Bump;
use libfuzzer_sys::fuzz_target;

use branchundo::sql::{DbType, ParameterGroups, RecognizerRegistry};
use branchundo::types::Value;
use branchundo::undo_error;

#[derive(Debug, Arbitrary)]
struct RecognizerInput<'a> {
    dialect: u8,
    sql: &'a str,
    params: Vec<Option<i64>>,
}

fuzz_target!(|input: RecognizerInput<'_>| {
    let dialect = DbType::ALL[input.dialect as usize % DbType::ALL.len()];
    let params: Vec<Value> = input.params.iter().map(|p| Value::from(*p)).collect();

    let arena = Bump::new();
    let registry = RecognizerRegistry::new();
    match registry.recognize(input.sql, dialect, &arena) {
        Ok(recognizers) => {
            for recognizer in &recognizers {
                let _ = recognizer.where_condition();
                let mut groups = ParameterGroups::new();
                if let Err(report) = recognizer.where_condition_with_params(&params, &mut groups) {
                    assert!(undo_error(&report).is_some(), "untyped error: {:#}", report);
                }
            }
        }
        Err(report) => {
            assert!(undo_error(&report).is_some(), "untyped error: {:#}", report);
        }
    }
});
