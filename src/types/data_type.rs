//! # Column Type Tags
//!
//! `DataType` is the semantic type tag carried by every captured field. The
//! tag travels with the undo log so that a compensating statement binds each
//! value with the same type the database reported when the row was captured.
//!
//! ## Type Categories
//!
//! | Category      | Types                                   |
//! |---------------|-----------------------------------------|
//! | **Boolean**   | Bool, Bit                               |
//! | **Integer**   | TinyInt, SmallInt, Int, BigInt          |
//! | **Float**     | Real, Double                            |
//! | **Numeric**   | Decimal                                 |
//! | **Date/Time** | Date, Time, Timestamp, TimestampTz      |
//! | **Text**      | Char, Varchar, Text, Clob, Json         |
//! | **Binary**    | Binary, Varbinary, Blob                 |
//! | **Other**     | Null, Other                             |
//!
//! ## Discriminant Values
//!
//! Discriminants are grouped by category, mirroring the storage-oriented
//! layout of the type system they were derived from:
//! - 0-9: Boolean and integer types
//! - 10-19: Floating point and numeric
//! - 20-29: Date/time
//! - 30-39: Text
//! - 40-49: Binary
//! - 60-61: Null and opaque vendor types
//!
//! ## Vendor Type Names
//!
//! `DataType::from_sql_name` folds the type names reported by the supported
//! dialects (`VARCHAR2`, `NUMBER`, `int4`, `timestamptz`, ...) onto one tag:
//!
//! ```ignore
//! assert_eq!(DataType::from_sql_name("VARCHAR2(32)"), DataType::Varchar);
//! assert_eq!(DataType::from_sql_name("number"), DataType::Decimal);
//! ```

use serde::{Deserialize, Serialize};

/// Semantic type of a captured column value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool = 0,
    Bit = 1,
    TinyInt = 2,
    SmallInt = 3,
    Int = 4,
    BigInt = 5,

    Real = 10,
    Double = 11,
    Decimal = 12,

    Date = 20,
    Time = 21,
    Timestamp = 22,
    TimestampTz = 23,

    Char = 30,
    Varchar = 31,
    Text = 32,
    Clob = 33,
    Json = 34,

    Binary = 40,
    Varbinary = 41,
    Blob = 42,

    Null = 60,
    Other = 61,
}

/// Comparison class used by the dirty check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeAffinity {
    Integer,
    Real,
    Numeric,
    Text,
    Blob,
}

impl DataType {
    /// Maps a vendor type name, with or without length modifiers, to a tag.
    ///
    /// Unknown names map to `Other`; values of that type are still compared
    /// and bound, just without numeric widening.
    pub fn from_sql_name(name: &str) -> Self {
        let base = name
            .split(|c: char| c == '(' || c.is_ascii_whitespace())
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();

        match base.as_str() {
            "BOOL" | "BOOLEAN" => DataType::Bool,
            "BIT" => DataType::Bit,
            "TINYINT" => DataType::TinyInt,
            "SMALLINT" | "INT2" => DataType::SmallInt,
            "INT" | "INTEGER" | "INT4" | "MEDIUMINT" | "SERIAL" => DataType::Int,
            "BIGINT" | "INT8" | "BIGSERIAL" => DataType::BigInt,
            "REAL" | "FLOAT4" | "BINARY_FLOAT" => DataType::Real,
            "DOUBLE" | "FLOAT" | "FLOAT8" | "BINARY_DOUBLE" => DataType::Double,
            "DECIMAL" | "NUMERIC" | "NUMBER" | "DEC" => DataType::Decimal,
            "DATE" => DataType::Date,
            "TIME" => DataType::Time,
            "TIMESTAMP" | "DATETIME" => {
                if name.to_ascii_uppercase().contains("TIME ZONE") {
                    DataType::TimestampTz
                } else {
                    DataType::Timestamp
                }
            }
            "TIMESTAMPTZ" => DataType::TimestampTz,
            "CHAR" | "NCHAR" | "CHARACTER" | "BPCHAR" => DataType::Char,
            "VARCHAR" | "VARCHAR2" | "NVARCHAR" | "NVARCHAR2" => DataType::Varchar,
            "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "LONG" => DataType::Text,
            "CLOB" | "NCLOB" => DataType::Clob,
            "JSON" | "JSONB" => DataType::Json,
            "BINARY" => DataType::Binary,
            "VARBINARY" | "RAW" | "BYTEA" => DataType::Varbinary,
            "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => DataType::Blob,
            "NULL" => DataType::Null,
            _ => DataType::Other,
        }
    }

    pub fn affinity(&self) -> TypeAffinity {
        match self {
            DataType::Bool
            | DataType::Bit
            | DataType::TinyInt
            | DataType::SmallInt
            | DataType::Int
            | DataType::BigInt => TypeAffinity::Integer,
            DataType::Real | DataType::Double => TypeAffinity::Real,
            DataType::Decimal
            | DataType::Date
            | DataType::Time
            | DataType::Timestamp
            | DataType::TimestampTz => TypeAffinity::Numeric,
            DataType::Char
            | DataType::Varchar
            | DataType::Text
            | DataType::Clob
            | DataType::Json
            | DataType::Null
            | DataType::Other => TypeAffinity::Text,
            DataType::Binary | DataType::Varbinary | DataType::Blob => TypeAffinity::Blob,
        }
    }

    /// Returns true if this is a numeric type (integer, float or decimal).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.affinity(),
            TypeAffinity::Integer | TypeAffinity::Real
        ) || *self == DataType::Decimal
    }

    /// Large-object types whose values are compared by content.
    pub fn is_lob(&self) -> bool {
        matches!(self, DataType::Clob | DataType::Blob | DataType::Text)
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self,
            DataType::Char | DataType::Varchar | DataType::Text | DataType::Clob | DataType::Json
        )
    }
}

impl TryFrom<u8> for DataType {
    type Error = eyre::Report;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataType::Bool),
            1 => Ok(DataType::Bit),
            2 => Ok(DataType::TinyInt),
            3 => Ok(DataType::SmallInt),
            4 => Ok(DataType::Int),
            5 => Ok(DataType::BigInt),
            10 => Ok(DataType::Real),
            11 => Ok(DataType::Double),
            12 => Ok(DataType::Decimal),
            20 => Ok(DataType::Date),
            21 => Ok(DataType::Time),
            22 => Ok(DataType::Timestamp),
            23 => Ok(DataType::TimestampTz),
            30 => Ok(DataType::Char),
            31 => Ok(DataType::Varchar),
            32 => Ok(DataType::Text),
            33 => Ok(DataType::Clob),
            34 => Ok(DataType::Json),
            40 => Ok(DataType::Binary),
            41 => Ok(DataType::Varbinary),
            42 => Ok(DataType::Blob),
            60 => Ok(DataType::Null),
            61 => Ok(DataType::Other),
            _ => eyre::bail!("invalid DataType discriminant: {}", value),
        }
    }
}
