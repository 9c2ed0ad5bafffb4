//! # SQL Recognition
//!
//! Dialect-aware parsing of the DML a branch transaction issues, and the
//! recognizers that describe each statement for undo capture. Tokens and AST
//! nodes borrow from the input string; AST nodes live in a bump arena owned by
//! the caller.
//!
//! ## Module Structure
//!
//! - `token`: Token and keyword definitions
//! - `dialect`: Supported databases, identifier quoting and reserved words
//! - `lexer`: Zero-copy tokenizer with per-dialect lexical rules
//! - `parser`: Recursive descent parser for SELECT/INSERT/UPDATE/DELETE
//! - `writer`: Renders predicates and clauses back to SQL
//! - `params`: Bound parameter values by placeholder position
//! - `recognizer`: Per-kind recognizers and the dispatch registry
//!
//! ## Pipeline
//!
//! ```text
//! sql ──► Lexer(dialect) ──► Parser ──► ParsedStatement* ──► RecognizerRegistry
//!                                                                  │
//!                                       Box<dyn SqlRecognizer> ◄───┘
//!                                                │
//!                     where_condition_with_params(params) ──► "id IN (?, ?)", [[1, 2]]
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use branchundo::sql::{DbType, RecognizerRegistry};
//!
//! let arena = Bump::new();
//! let registry = RecognizerRegistry::new();
//! let recognizers = registry.recognize("DELETE FROM t WHERE id = ?", DbType::MySql, &arena)?;
//! assert_eq!(recognizers[0].where_condition()?, "id = ?");
//! ```

pub mod ast;
pub mod dialect;
pub mod lexer;
pub mod params;
pub mod parser;
pub mod recognizer;
pub mod token;
pub mod writer;

pub use dialect::{unquote_identifier, DbType};
pub use lexer::Lexer;
pub use params::{ParameterGroups, ParametersHolder};
pub use parser::{ParsedStatement, Parser};
pub use recognizer::{
    DeleteRecognizer, InsertRecognizer, InsertValue, MultiDeleteRecognizer, RecognizerFactory,
    RecognizerRegistry, SelectForUpdateRecognizer, SqlRecognizer, SqlType, UpdateRecognizer,
};
pub use token::{Keyword, Parameter, Span, Token};
pub use writer::{render_predicate, render_predicate_with_params, SqlWriter};

use bumpalo::Bump;
use eyre::Result;

/// Parses every `;`-separated statement of `sql`.
pub fn parse_sql<'a>(sql: &'a str, dialect: DbType, arena: &'a Bump) -> Result<Vec<ParsedStatement<'a>>> {
    Parser::new(sql, dialect, arena).parse_statements()
}
