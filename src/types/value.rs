//! # Captured Column Values
//!
//! `Value` is the fully-owned value stored in row snapshots and bound to
//! compensating statements. Snapshots outlive the statement that produced
//! them (they are serialized into the undo log and decoded at rollback time),
//! so values own their data on the heap.
//!
//! ## Numeric Representations
//!
//! Drivers report the same column value through different representations
//! depending on the access path: an `INT` primary key may come back as an
//! integer from one query and as a decimal from another. The dirty check
//! therefore compares values with [`Value::same_as`], which widens across
//! `Int`, `Float`, `Decimal` and `Bool`:
//!
//! | Left          | Right             | Equal? |
//! |---------------|-------------------|--------|
//! | `Int(1)`      | `Decimal("1.00")` | yes    |
//! | `Int(1)`      | `Float(1.0)`      | yes    |
//! | `Bool(true)`  | `Int(1)`          | yes    |
//! | `Text("1")`   | `Int(1)`          | no     |
//! | `Null`        | `Null`            | yes    |
//!
//! Decimals are kept as their canonical text so no precision is lost in the
//! undo log.
//!
//! ## Hashing
//!
//! `f64` has no total equality, so `Value` is not `Hash`. Lookups keyed by
//! primary-key values use [`Value::canonical_key`], which maps every value
//! equal under `same_as` to the same string.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::DataType;

/// Owned column value of a captured row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact numeric in canonical decimal text, e.g. `"12.50"`.
    Decimal(String),
    Text(String),
    Blob(Vec<u8>),
    /// Days since 1970-01-01.
    Date(i32),
    /// Microseconds since midnight.
    Time(i64),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Natural type tag of the value when the column type is unknown.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Bool(_) => DataType::Bool,
            Value::Int(_) => DataType::BigInt,
            Value::Float(_) => DataType::Double,
            Value::Decimal(_) => DataType::Decimal,
            Value::Text(_) => DataType::Varchar,
            Value::Blob(_) => DataType::Blob,
            Value::Date(_) => DataType::Date,
            Value::Time(_) => DataType::Time,
            Value::Timestamp(_) => DataType::Timestamp,
        }
    }

    /// Builds a decimal value, rejecting text that is not a plain decimal.
    pub fn decimal(text: &str) -> eyre::Result<Self> {
        if parse_decimal(text).is_none() {
            eyre::bail!("invalid decimal literal '{}'", text);
        }
        Ok(Value::Decimal(text.trim().to_string()))
    }

    /// Equality used when comparing captured rows with current rows.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Float(f), other) | (other, Value::Float(f)) => {
                other.as_f64().is_some_and(|o| o == *f)
            }
            (a, b) => match (a.exact_numeric(), b.exact_numeric()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Hash key consistent with [`Value::same_as`].
    pub fn canonical_key(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Text(s) => format!("t:{}", s),
            Value::Blob(b) => {
                let mut key = String::with_capacity(2 + b.len() * 2);
                key.push_str("b:");
                for byte in b {
                    key.push_str(&format!("{:02x}", byte));
                }
                key
            }
            Value::Date(d) => format!("d:{}", d),
            Value::Time(t) => format!("tm:{}", t),
            Value::Timestamp(ts) => format!("ts:{}", ts),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e18 {
                    format!("n:{}", *f as i64)
                } else {
                    format!("n:{}", f)
                }
            }
            other => match other.exact_numeric() {
                Some(text) => format!("n:{}", text),
                None => format!("?:{}", other),
            },
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Decimal(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Exact numeric value as normalized decimal text.
    fn exact_numeric(&self) -> Option<String> {
        match self {
            Value::Int(i) => Some(i.to_string()),
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Value::Decimal(text) => parse_decimal(text),
            _ => None,
        }
    }
}

/// Normalizes decimal text: no sign on zero, no leading zeros in the
/// integer part, no trailing zeros in the fraction. Any precision and scale
/// is accepted.
fn parse_decimal(text: &str) -> Option<String> {
    let text = text.trim();
    let (negative, body) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let int_part = int_part.trim_start_matches('0');
    let frac_part = frac_part.trim_end_matches('0');
    let mut out = String::with_capacity(int_part.len() + frac_part.len() + 3);
    if negative && !(int_part.is_empty() && frac_part.is_empty()) {
        out.push('-');
    }
    out.push_str(if int_part.is_empty() { "0" } else { int_part });
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    Some(out)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Value::Date(d) => write!(f, "date({})", d),
            Value::Time(t) => write!(f, "time({})", t),
            Value::Timestamp(ts) => write!(f, "timestamp({})", ts),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
