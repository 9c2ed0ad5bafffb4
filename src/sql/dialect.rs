//! # SQL Dialects
//!
//! The closed set of database dialects the engine understands, and the
//! identifier rules that differ between them.
//!
//! ## Dialect Differences
//!
//! | Dialect            | Quote | Unquoted folding | Lexer extras                 |
//! |--------------------|-------|------------------|------------------------------|
//! | `mysql`            | `` ` ``| none            | backticks, `#` comments, `\` escapes |
//! | `mariadb`          | `` ` ``| none            | same as MySQL                |
//! | `postgresql`       | `"`   | lower case       | `$n` parameters, `$$` strings|
//! | `oracle`           | `"`   | upper case       | `:name` parameters           |
//! | `oceanbase_oracle` | `"`   | upper case       | same as Oracle               |
//!
//! ## Identifier Quoting
//!
//! Compensating statements are generated from table metadata, so identifiers
//! must be quoted exactly when the database would otherwise read them
//! differently:
//!
//! - the name is a reserved word of the dialect,
//! - the name contains characters outside `[A-Za-z0-9_]` or starts with a digit,
//! - the name's case differs from the dialect's unquoted folding.
//!
//! Names that already carry quotes pass through unchanged. Schema-qualified
//! names are quoted part by part.
//!
//! ```ignore
//! assert_eq!(DbType::MySql.escape_identifier("order"), "`order`");
//! assert_eq!(DbType::Oracle.escape_identifier("ID"), "ID");
//! assert_eq!(DbType::Oracle.escape_identifier("id"), "\"id\"");
//! assert_eq!(DbType::PostgreSql.escape_identifier("Id"), "\"Id\"");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use phf::phf_set;
use serde::{Deserialize, Serialize};

use crate::error::UndoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "mariadb")]
    MariaDb,
    #[serde(rename = "postgresql")]
    PostgreSql,
    #[serde(rename = "oracle")]
    Oracle,
    #[serde(rename = "oceanbase_oracle")]
    OceanBaseOracle,
}

static MYSQL_RESERVED: phf::Set<&'static str> = phf_set! {
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK",
    "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "DATABASE", "DEFAULT", "DELETE",
    "DESC", "DISTINCT", "DROP", "ELSE", "EXISTS", "FALSE", "FOR", "FOREIGN", "FROM",
    "FULLTEXT", "GROUP", "HAVING", "IN", "INDEX", "INNER", "INSERT", "INTERVAL",
    "INTO", "IS", "JOIN", "KEY", "KEYS", "LEFT", "LIKE", "LIMIT", "LOCK", "NOT",
    "NULL", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "RANGE", "READ", "REFERENCES",
    "RIGHT", "ROW", "ROWS", "SELECT", "SET", "SHOW", "TABLE", "THEN", "TO", "TRUE",
    "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "WHEN", "WHERE", "WITH",
};

static POSTGRES_RESERVED: phf::Set<&'static str> = phf_set! {
    "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC",
    "BOTH", "CASE", "CAST", "CHECK", "COLLATE", "COLUMN", "CONSTRAINT", "CREATE",
    "CURRENT_DATE", "CURRENT_ROLE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
    "CURRENT_USER", "DEFAULT", "DEFERRABLE", "DESC", "DISTINCT", "DO", "ELSE", "END",
    "EXCEPT", "FALSE", "FETCH", "FOR", "FOREIGN", "FROM", "GRANT", "GROUP", "HAVING",
    "IN", "INITIALLY", "INTERSECT", "INTO", "LATERAL", "LEADING", "LIMIT",
    "LOCALTIME", "LOCALTIMESTAMP", "NOT", "NULL", "OFFSET", "ON", "ONLY", "OR",
    "ORDER", "PLACING", "PRIMARY", "REFERENCES", "RETURNING", "SELECT",
    "SESSION_USER", "SOME", "SYMMETRIC", "TABLE", "THEN", "TO", "TRAILING", "TRUE",
    "UNION", "UNIQUE", "USER", "USING", "VARIADIC", "WHEN", "WHERE", "WINDOW", "WITH",
};

static ORACLE_RESERVED: phf::Set<&'static str> = phf_set! {
    "ACCESS", "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "AUDIT", "BETWEEN",
    "BY", "CHAR", "CHECK", "CLUSTER", "COLUMN", "COMMENT", "COMPRESS", "CONNECT",
    "CREATE", "CURRENT", "DATE", "DECIMAL", "DEFAULT", "DELETE", "DESC", "DISTINCT",
    "DROP", "ELSE", "EXCLUSIVE", "EXISTS", "FILE", "FLOAT", "FOR", "FROM", "GRANT",
    "GROUP", "HAVING", "IDENTIFIED", "IMMEDIATE", "IN", "INCREMENT", "INDEX",
    "INITIAL", "INSERT", "INTEGER", "INTERSECT", "INTO", "IS", "LEVEL", "LIKE",
    "LOCK", "LONG", "MAXEXTENTS", "MINUS", "MODE", "MODIFY", "NOAUDIT", "NOCOMPRESS",
    "NOT", "NOWAIT", "NULL", "NUMBER", "OF", "OFFLINE", "ON", "ONLINE", "OPTION",
    "OR", "ORDER", "PCTFREE", "PRIOR", "PUBLIC", "RAW", "RENAME", "RESOURCE",
    "REVOKE", "ROW", "ROWID", "ROWNUM", "ROWS", "SELECT", "SESSION", "SET", "SHARE",
    "SIZE", "SMALLINT", "START", "SUCCESSFUL", "SYNONYM", "SYSDATE", "TABLE", "THEN",
    "TO", "TRIGGER", "UID", "UNION", "UNIQUE", "UPDATE", "USER", "VALIDATE",
    "VALUES", "VARCHAR", "VARCHAR2", "VIEW", "WHENEVER", "WHERE", "WITH",
};

impl DbType {
    pub const ALL: [DbType; 5] = [
        DbType::MySql,
        DbType::MariaDb,
        DbType::PostgreSql,
        DbType::Oracle,
        DbType::OceanBaseOracle,
    ];

    /// Configuration name of the dialect.
    pub fn name(&self) -> &'static str {
        match self {
            DbType::MySql => "mysql",
            DbType::MariaDb => "mariadb",
            DbType::PostgreSql => "postgresql",
            DbType::Oracle => "oracle",
            DbType::OceanBaseOracle => "oceanbase_oracle",
        }
    }

    pub fn is_mysql_family(&self) -> bool {
        matches!(self, DbType::MySql | DbType::MariaDb)
    }

    pub fn is_oracle_family(&self) -> bool {
        matches!(self, DbType::Oracle | DbType::OceanBaseOracle)
    }

    pub fn quote_char(&self) -> char {
        if self.is_mysql_family() {
            '`'
        } else {
            '"'
        }
    }

    pub fn is_reserved(&self, word: &str) -> bool {
        let upper = word.to_ascii_uppercase();
        match self {
            DbType::MySql | DbType::MariaDb => MYSQL_RESERVED.contains(upper.as_str()),
            DbType::PostgreSql => POSTGRES_RESERVED.contains(upper.as_str()),
            DbType::Oracle | DbType::OceanBaseOracle => ORACLE_RESERVED.contains(upper.as_str()),
        }
    }

    /// Quotes an identifier when the dialect would otherwise misread it.
    pub fn escape_identifier<'n>(&self, name: &'n str) -> Cow<'n, str> {
        if is_quoted(name) {
            return Cow::Borrowed(name);
        }

        if name.contains('.') {
            let parts: Vec<Cow<'_, str>> =
                name.split('.').map(|part| self.escape_identifier(part)).collect();
            if parts.iter().all(|p| matches!(p, Cow::Borrowed(_))) {
                return Cow::Borrowed(name);
            }
            return Cow::Owned(parts.join("."));
        }

        if !self.needs_quoting(name) {
            return Cow::Borrowed(name);
        }

        let quote = self.quote_char();
        let doubled = format!("{}{}", quote, quote);
        let inner = name.replace(quote, &doubled);
        Cow::Owned(format!("{}{}{}", quote, inner, quote))
    }

    fn needs_quoting(&self, name: &str) -> bool {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes[0].is_ascii_digit() {
            return true;
        }
        if !bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_') {
            return true;
        }
        if self.is_reserved(name) {
            return true;
        }
        match self {
            DbType::Oracle | DbType::OceanBaseOracle => bytes.iter().any(u8::is_ascii_lowercase),
            DbType::PostgreSql => bytes.iter().any(u8::is_ascii_uppercase),
            DbType::MySql | DbType::MariaDb => false,
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DbType {
    type Err = UndoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "mysql" => Ok(DbType::MySql),
            "mariadb" => Ok(DbType::MariaDb),
            "postgresql" | "postgres" | "pg" => Ok(DbType::PostgreSql),
            "oracle" => Ok(DbType::Oracle),
            "oceanbase_oracle" | "oceanbaseoracle" => Ok(DbType::OceanBaseOracle),
            _ => Err(UndoError::unsupported(s, "dialect")),
        }
    }
}

fn is_quoted(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2
        && matches!(
            (bytes[0], bytes[bytes.len() - 1]),
            (b'"', b'"') | (b'`', b'`')
        )
}

/// Strips one level of identifier quotes, if present.
pub fn unquote_identifier(name: &str) -> &str {
    if is_quoted(name) {
        &name[1..name.len() - 1]
    } else {
        name
    }
}
