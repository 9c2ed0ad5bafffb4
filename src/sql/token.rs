//! # SQL Tokens
//!
//! Token types produced by the [`Lexer`](super::lexer::Lexer). String-bearing
//! tokens borrow from the input.
//!
//! Quoted identifiers keep their delimiters (`"Order"`, `` `order` ``) so the
//! text can be echoed back verbatim into rendered predicates; use
//! [`unquote_identifier`](super::dialect::unquote_identifier) to compare
//! names.

/// Byte range of a token within the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parameter<'a> {
    /// `$1` (PostgreSQL)
    Positional(u32),
    /// `:name` or `@name`
    Named(&'a str),
    /// `?`
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    Keyword(Keyword),
    Ident(&'a str),
    QuotedIdent(&'a str),
    String(&'a str),
    Integer(&'a str),
    Float(&'a str),
    HexNumber(&'a str),
    BinaryNumber(&'a str),
    Parameter(Parameter<'a>),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Ampersand,
    Pipe,
    DoublePipe,
    Tilde,
    Eq,
    /// `<>`
    NotEq,
    /// `!=`
    BangEq,
    /// `<=>` (MySQL null-safe equality)
    Spaceship,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LeftShift,
    RightShift,

    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    Colon,
    DoubleColon,

    Error(&'static str),
    Eof,
}

macro_rules! keywords {
    ($($variant:ident => $text:literal),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($variant),*
        }

        impl Keyword {
            /// Canonical upper-case spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Keyword::$variant => $text),*
                }
            }
        }
    };
}

keywords! {
    Select => "SELECT",
    Insert => "INSERT",
    Update => "UPDATE",
    Delete => "DELETE",
    From => "FROM",
    Where => "WHERE",
    Into => "INTO",
    Values => "VALUES",
    Value => "VALUE",
    Set => "SET",
    As => "AS",
    And => "AND",
    Or => "OR",
    Not => "NOT",
    In => "IN",
    Between => "BETWEEN",
    Like => "LIKE",
    Ilike => "ILIKE",
    Escape => "ESCAPE",
    Is => "IS",
    Null => "NULL",
    True => "TRUE",
    False => "FALSE",
    For => "FOR",
    Of => "OF",
    Nowait => "NOWAIT",
    Wait => "WAIT",
    Skip => "SKIP",
    Locked => "LOCKED",
    Share => "SHARE",
    Key => "KEY",
    No => "NO",
    Lock => "LOCK",
    Mode => "MODE",
    Order => "ORDER",
    By => "BY",
    Asc => "ASC",
    Desc => "DESC",
    Nulls => "NULLS",
    First => "FIRST",
    Last => "LAST",
    Limit => "LIMIT",
    Offset => "OFFSET",
    Fetch => "FETCH",
    Next => "NEXT",
    Rows => "ROWS",
    Row => "ROW",
    Only => "ONLY",
    Join => "JOIN",
    Inner => "INNER",
    Left => "LEFT",
    Right => "RIGHT",
    Full => "FULL",
    Outer => "OUTER",
    Cross => "CROSS",
    Natural => "NATURAL",
    On => "ON",
    Using => "USING",
    Default => "DEFAULT",
    Returning => "RETURNING",
    Duplicate => "DUPLICATE",
    Ignore => "IGNORE",
    LowPriority => "LOW_PRIORITY",
    HighPriority => "HIGH_PRIORITY",
    Delayed => "DELAYED",
    Quick => "QUICK",
    Exists => "EXISTS",
    Case => "CASE",
    When => "WHEN",
    Then => "THEN",
    Else => "ELSE",
    End => "END",
    Cast => "CAST",
    Distinct => "DISTINCT",
    All => "ALL",
    Group => "GROUP",
    Having => "HAVING",
    Union => "UNION",
    Intersect => "INTERSECT",
    Except => "EXCEPT",
    Conflict => "CONFLICT",
    Do => "DO",
    Nothing => "NOTHING",
    Constraint => "CONSTRAINT",
}
