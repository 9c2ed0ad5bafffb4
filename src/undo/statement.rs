//! Compensating statements and their bound parameters.

use serde::{Deserialize, Serialize};

use crate::sql::ParameterGroups;
use crate::types::Value;

/// SQL text plus one parameter group per compensated row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensatingStatement {
    pub sql: String,
    pub params: ParameterGroups,
}

impl CompensatingStatement {
    pub fn new(sql: String) -> Self {
        Self {
            sql,
            params: ParameterGroups::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.params.len()
    }

    /// One executable statement per row, in row order.
    pub fn bound_rows(&self) -> impl Iterator<Item = BoundStatement> + '_ {
        self.params.iter().map(|group| BoundStatement {
            sql: self.sql.clone(),
            params: group.clone(),
        })
    }
}

/// A compensating statement with the values of exactly one row.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl BoundStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn push(&mut self, value: Value) {
        self.params.push(value);
    }

    /// Number of `?` placeholders outside quoted identifiers and literals.
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }
}

/// Counts `?` outside `'...'`, `"..."` and `` `...` `` spans. A doubled
/// delimiter inside a span is an escaped delimiter.
fn count_placeholders(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut count = 0;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => {
                if bytes.get(i + 1) == Some(&q) {
                    i += 1;
                } else {
                    quote = None;
                }
            }
            Some(_) => {}
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'?' => count += 1,
                _ => {}
            },
        }
        i += 1;
    }
    count
}
