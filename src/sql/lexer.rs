//! # SQL Lexer - Dialect-Aware Zero-Copy Tokenizer
//!
//! Tokenizes DML text for one [`DbType`] with zero string allocation. All
//! string-bearing tokens borrow from the input.
//!
//! ## Source Fidelity
//!
//! Recognized predicates are echoed back as text, so literal and quoted
//! tokens keep their exact source spelling:
//!
//! | Token            | Carries                        | Example input | Payload       |
//! |------------------|--------------------------------|---------------|---------------|
//! | `String`         | full literal, quotes included  | `'it''s'`     | `'it''s'`     |
//! | `QuotedIdent`    | full name, delimiters included | `` `order` `` | `` `order` `` |
//! | `HexNumber`      | full literal                   | `X'0F'`       | `X'0F'`       |
//! | `Integer`/`Float`| digits as written              | `1.50`        | `1.50`        |
//!
//! ## Dialect Rules
//!
//! | Construct             | MySQL / MariaDB | PostgreSQL | Oracle family |
//! |-----------------------|-----------------|------------|---------------|
//! | `` `ident` ``         | yes             | error      | error         |
//! | `$1` parameter        | error           | yes        | error         |
//! | `$$body$$` string     | error           | yes        | error         |
//! | `# comment`           | yes             | error      | error         |
//! | `\'` string escape    | yes             | no         | no            |
//! | `:name` / `@name`     | yes             | yes        | yes           |
//!
//! ## Keyword Lookup
//!
//! Keywords are matched with a compile-time perfect hash (phf). Words outside
//! the DML keyword set come back as identifiers, so names such as `name`,
//! `status` or `type` never need quoting.
//!
//! ## Error Handling
//!
//! Invalid input produces `Token::Error` with a static message. The parser
//! turns the first error into a `ParseFailure`.

use phf::phf_map;

use super::dialect::DbType;
use super::token::{Keyword, Parameter, Span, Token};

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "SELECT" => Keyword::Select,
    "INSERT" => Keyword::Insert,
    "UPDATE" => Keyword::Update,
    "DELETE" => Keyword::Delete,
    "FROM" => Keyword::From,
    "WHERE" => Keyword::Where,
    "INTO" => Keyword::Into,
    "VALUES" => Keyword::Values,
    "VALUE" => Keyword::Value,
    "SET" => Keyword::Set,
    "AS" => Keyword::As,
    "AND" => Keyword::And,
    "OR" => Keyword::Or,
    "NOT" => Keyword::Not,
    "IN" => Keyword::In,
    "BETWEEN" => Keyword::Between,
    "LIKE" => Keyword::Like,
    "ILIKE" => Keyword::Ilike,
    "ESCAPE" => Keyword::Escape,
    "IS" => Keyword::Is,
    "NULL" => Keyword::Null,
    "TRUE" => Keyword::True,
    "FALSE" => Keyword::False,
    "FOR" => Keyword::For,
    "OF" => Keyword::Of,
    "NOWAIT" => Keyword::Nowait,
    "WAIT" => Keyword::Wait,
    "SKIP" => Keyword::Skip,
    "LOCKED" => Keyword::Locked,
    "SHARE" => Keyword::Share,
    "KEY" => Keyword::Key,
    "NO" => Keyword::No,
    "LOCK" => Keyword::Lock,
    "MODE" => Keyword::Mode,
    "ORDER" => Keyword::Order,
    "BY" => Keyword::By,
    "ASC" => Keyword::Asc,
    "DESC" => Keyword::Desc,
    "NULLS" => Keyword::Nulls,
    "FIRST" => Keyword::First,
    "LAST" => Keyword::Last,
    "LIMIT" => Keyword::Limit,
    "OFFSET" => Keyword::Offset,
    "FETCH" => Keyword::Fetch,
    "NEXT" => Keyword::Next,
    "ROWS" => Keyword::Rows,
    "ROW" => Keyword::Row,
    "ONLY" => Keyword::Only,
    "JOIN" => Keyword::Join,
    "INNER" => Keyword::Inner,
    "LEFT" => Keyword::Left,
    "RIGHT" => Keyword::Right,
    "FULL" => Keyword::Full,
    "OUTER" => Keyword::Outer,
    "CROSS" => Keyword::Cross,
    "NATURAL" => Keyword::Natural,
    "ON" => Keyword::On,
    "USING" => Keyword::Using,
    "DEFAULT" => Keyword::Default,
    "RETURNING" => Keyword::Returning,
    "DUPLICATE" => Keyword::Duplicate,
    "IGNORE" => Keyword::Ignore,
    "LOW_PRIORITY" => Keyword::LowPriority,
    "HIGH_PRIORITY" => Keyword::HighPriority,
    "DELAYED" => Keyword::Delayed,
    "QUICK" => Keyword::Quick,
    "EXISTS" => Keyword::Exists,
    "CASE" => Keyword::Case,
    "WHEN" => Keyword::When,
    "THEN" => Keyword::Then,
    "ELSE" => Keyword::Else,
    "END" => Keyword::End,
    "CAST" => Keyword::Cast,
    "DISTINCT" => Keyword::Distinct,
    "ALL" => Keyword::All,
    "GROUP" => Keyword::Group,
    "HAVING" => Keyword::Having,
    "UNION" => Keyword::Union,
    "INTERSECT" => Keyword::Intersect,
    "EXCEPT" => Keyword::Except,
    "CONFLICT" => Keyword::Conflict,
    "DO" => Keyword::Do,
    "NOTHING" => Keyword::Nothing,
    "CONSTRAINT" => Keyword::Constraint,
};

/// Identifiers may start with a letter, `_` or any non-ASCII character.
fn is_identifier_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || !byte.is_ascii()
}

fn is_identifier_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || !byte.is_ascii()
}

fn is_utf8_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

pub fn lookup_keyword(word: &str) -> Option<Keyword> {
    KEYWORDS.get(word.to_ascii_uppercase().as_str()).copied()
}

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    dialect: DbType,
    pos: usize,
    line: u32,
    column: u32,
    token_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, dialect: DbType) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            dialect,
            pos: 0,
            line: 1,
            column: 1,
            token_start: 0,
        }
    }

    pub fn dialect(&self) -> DbType {
        self.dialect
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Span of the most recently returned token.
    pub fn span(&self) -> Span {
        Span::new(self.token_start, self.pos - self.token_start)
    }

    pub fn next_token(&mut self) -> Token<'a> {
        if let Some(error) = self.skip_trivia() {
            return error;
        }
        self.token_start = self.pos;

        if self.is_eof() {
            return Token::Eof;
        }

        let ch = self.current();

        if is_identifier_start(ch) {
            return self.scan_identifier_or_keyword();
        }

        if ch.is_ascii_digit() {
            return self.scan_number();
        }

        match ch {
            b'\'' => self.scan_string(),
            b'"' => self.scan_delimited_identifier(b'"'),
            b'`' => {
                if self.dialect.is_mysql_family() {
                    self.scan_delimited_identifier(b'`')
                } else {
                    self.advance();
                    Token::Error("backtick identifiers are not supported by this dialect")
                }
            }
            b'$' => self.scan_dollar_or_param(),
            b':' => self.scan_colon_or_param(),
            b'@' => self.scan_at_param(),
            b'?' => {
                self.advance();
                Token::Parameter(Parameter::Anonymous)
            }
            b'-' => {
                self.advance();
                Token::Minus
            }
            b'/' => {
                self.advance();
                Token::Slash
            }
            b'+' => {
                self.advance();
                Token::Plus
            }
            b'*' => {
                self.advance();
                Token::Star
            }
            b'%' => {
                self.advance();
                Token::Percent
            }
            b'^' => {
                self.advance();
                Token::Caret
            }
            b'&' => {
                self.advance();
                Token::Ampersand
            }
            b'|' => self.scan_pipe(),
            b'~' => {
                self.advance();
                Token::Tilde
            }
            b'=' => {
                self.advance();
                Token::Eq
            }
            b'<' => self.scan_less_than(),
            b'>' => self.scan_greater_than(),
            b'!' => self.scan_exclamation(),
            b'(' => {
                self.advance();
                Token::LParen
            }
            b')' => {
                self.advance();
                Token::RParen
            }
            b',' => {
                self.advance();
                Token::Comma
            }
            b';' => {
                self.advance();
                Token::Semicolon
            }
            b'.' => self.scan_dot(),
            _ => {
                self.advance();
                Token::Error("unexpected character")
            }
        }
    }

    pub fn peek(&mut self) -> Token<'a> {
        self.peek_nth(0)
    }

    pub fn peek_nth(&mut self, n: usize) -> Token<'a> {
        let saved_pos = self.pos;
        let saved_line = self.line;
        let saved_column = self.column;
        let saved_token_start = self.token_start;

        let mut token = Token::Eof;
        for _ in 0..=n {
            token = self.next_token();
            if matches!(token, Token::Eof | Token::Error(_)) {
                break;
            }
        }

        self.pos = saved_pos;
        self.line = saved_line;
        self.column = saved_column;
        self.token_start = saved_token_start;

        token
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn current(&self) -> u8 {
        self.bytes[self.pos]
    }

    fn peek_char(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            if self.current() == b'\n' {
                self.line += 1;
                self.column = 1;
            } else if !is_utf8_continuation(self.current()) {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    fn skip_line(&mut self) {
        while !self.is_eof() && self.current() != b'\n' {
            self.advance();
        }
    }

    /// Skips whitespace and comments. Returns an error token for an
    /// unterminated block comment.
    fn skip_trivia(&mut self) -> Option<Token<'a>> {
        loop {
            if self.is_eof() {
                return None;
            }
            match self.current() {
                b' ' | b'\t' | b'\r' | b'\n' => self.advance(),
                b'-' if self.peek_char() == Some(b'-') => self.skip_line(),
                b'#' if self.dialect.is_mysql_family() => self.skip_line(),
                b'/' if self.peek_char() == Some(b'*') => {
                    self.token_start = self.pos;
                    self.advance();
                    self.advance();
                    if !self.skip_block_comment() {
                        return Some(Token::Error("unterminated block comment"));
                    }
                }
                _ => return None,
            }
        }
    }

    fn skip_block_comment(&mut self) -> bool {
        let mut depth = 1;

        while !self.is_eof() && depth > 0 {
            if self.current() == b'/' && self.peek_char() == Some(b'*') {
                self.advance();
                self.advance();
                depth += 1;
            } else if self.current() == b'*' && self.peek_char() == Some(b'/') {
                self.advance();
                self.advance();
                depth -= 1;
            } else {
                self.advance();
            }
        }

        depth == 0
    }

    fn scan_identifier_or_keyword(&mut self) -> Token<'a> {
        let start = self.pos;

        if (self.current() == b'x' || self.current() == b'X') && self.peek_char() == Some(b'\'') {
            return self.scan_hex_string_literal();
        }

        while !self.is_eof()
            && (is_identifier_continue(self.current())
                || self.current() == b'$'
                || self.current() == b'#')
        {
            if self.current() == b'#' && self.dialect.is_mysql_family() {
                break;
            }
            if self.current() == b'$' && self.dialect == DbType::PostgreSql {
                break;
            }
            self.advance();
        }

        let ident = &self.input[start..self.pos];

        match lookup_keyword(ident) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Ident(ident),
        }
    }

    fn scan_hex_string_literal(&mut self) -> Token<'a> {
        let start = self.pos;
        self.advance();
        self.advance();

        while !self.is_eof() && self.current() != b'\'' {
            if !self.current().is_ascii_hexdigit() {
                return Token::Error("invalid hex character in hex string literal");
            }
            self.advance();
        }

        if self.is_eof() {
            return Token::Error("unterminated hex string literal");
        }

        self.advance();
        Token::HexNumber(&self.input[start..self.pos])
    }

    fn scan_number(&mut self) -> Token<'a> {
        let start = self.pos;

        if self.current() == b'0' {
            match self.peek_char() {
                Some(b'x') | Some(b'X') => return self.scan_radix_number(start, 16),
                Some(b'b') | Some(b'B') => return self.scan_radix_number(start, 2),
                _ => {}
            }
        }

        while !self.is_eof() && self.current().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;

        if !self.is_eof() && self.current() == b'.' {
            is_float = true;
            self.advance();
            while !self.is_eof() && self.current().is_ascii_digit() {
                self.advance();
            }
        }

        if !self.is_eof() && (self.current() == b'e' || self.current() == b'E') {
            is_float = true;
            self.advance();
            if !self.is_eof() && (self.current() == b'+' || self.current() == b'-') {
                self.advance();
            }
            while !self.is_eof() && self.current().is_ascii_digit() {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.pos];
        if is_float {
            Token::Float(num_str)
        } else {
            Token::Integer(num_str)
        }
    }

    fn scan_radix_number(&mut self, start: usize, radix: u32) -> Token<'a> {
        self.advance();
        self.advance();
        let digits_start = self.pos;

        while !self.is_eof() && (self.current() as char).is_digit(radix) {
            self.advance();
        }

        if self.pos == digits_start {
            return Token::Error(if radix == 16 {
                "invalid hex number"
            } else {
                "invalid binary number"
            });
        }

        let text = &self.input[start..self.pos];
        if radix == 16 {
            Token::HexNumber(text)
        } else {
            Token::BinaryNumber(text)
        }
    }

    fn scan_string(&mut self) -> Token<'a> {
        let start = self.pos;
        self.advance();
        let backslash_escapes = self.dialect.is_mysql_family();

        loop {
            if self.is_eof() {
                return Token::Error("unterminated string");
            }

            match self.current() {
                b'\\' if backslash_escapes => {
                    self.advance();
                    self.advance();
                }
                b'\'' => {
                    if self.peek_char() == Some(b'\'') {
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        return Token::String(&self.input[start..self.pos]);
                    }
                }
                _ => self.advance(),
            }
        }
    }

    fn scan_delimited_identifier(&mut self, delimiter: u8) -> Token<'a> {
        let start = self.pos;
        self.advance();

        loop {
            if self.is_eof() {
                return Token::Error("unterminated quoted identifier");
            }

            if self.current() == delimiter {
                if self.peek_char() == Some(delimiter) {
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    if self.pos - start == 2 {
                        return Token::Error("empty quoted identifier");
                    }
                    return Token::QuotedIdent(&self.input[start..self.pos]);
                }
            } else {
                self.advance();
            }
        }
    }

    fn scan_dollar_or_param(&mut self) -> Token<'a> {
        let start = self.pos;
        self.advance();

        if self.dialect != DbType::PostgreSql {
            return Token::Error("'$' parameters are only supported by postgresql");
        }

        if self.is_eof() {
            return Token::Error("unexpected end after $");
        }

        if self.current().is_ascii_digit() {
            let digits_start = self.pos;
            while !self.is_eof() && self.current().is_ascii_digit() {
                self.advance();
            }
            return match self.input[digits_start..self.pos].parse::<u32>() {
                Ok(n) if n > 0 => Token::Parameter(Parameter::Positional(n)),
                _ => Token::Error("invalid positional parameter"),
            };
        }

        if self.current() == b'$' {
            return self.scan_dollar_string(start, "$$");
        }

        if self.current().is_ascii_alphabetic() || self.current() == b'_' {
            while !self.is_eof()
                && (self.current().is_ascii_alphanumeric() || self.current() == b'_')
            {
                self.advance();
            }
            if !self.is_eof() && self.current() == b'$' {
                let tag = &self.input[start..=self.pos];
                return self.scan_dollar_string(start, tag);
            }
            return Token::Error("invalid dollar-quoted string tag");
        }

        Token::Error("invalid token after $")
    }

    fn scan_dollar_string(&mut self, start: usize, end_tag: &str) -> Token<'a> {
        self.advance();

        loop {
            if self.is_eof() {
                return Token::Error("unterminated dollar-quoted string");
            }

            if self.bytes[self.pos..].starts_with(end_tag.as_bytes()) {
                for _ in 0..end_tag.len() {
                    self.advance();
                }
                return Token::String(&self.input[start..self.pos]);
            }
            self.advance();
        }
    }

    fn scan_colon_or_param(&mut self) -> Token<'a> {
        self.advance();

        if self.is_eof() {
            return Token::Colon;
        }

        match self.current() {
            b':' => {
                self.advance();
                Token::DoubleColon
            }
            c if c.is_ascii_alphanumeric() || c == b'_' => {
                let start = self.pos;
                while !self.is_eof()
                    && (self.current().is_ascii_alphanumeric() || self.current() == b'_')
                {
                    self.advance();
                }
                Token::Parameter(Parameter::Named(&self.input[start..self.pos]))
            }
            _ => Token::Colon,
        }
    }

    fn scan_at_param(&mut self) -> Token<'a> {
        self.advance();

        if !self.is_eof() && (self.current().is_ascii_alphabetic() || self.current() == b'_') {
            let start = self.pos;
            while !self.is_eof()
                && (self.current().is_ascii_alphanumeric() || self.current() == b'_')
            {
                self.advance();
            }
            Token::Parameter(Parameter::Named(&self.input[start..self.pos]))
        } else {
            Token::Error("invalid @ parameter")
        }
    }

    fn scan_pipe(&mut self) -> Token<'a> {
        self.advance();

        if !self.is_eof() && self.current() == b'|' {
            self.advance();
            Token::DoublePipe
        } else {
            Token::Pipe
        }
    }

    fn scan_less_than(&mut self) -> Token<'a> {
        self.advance();

        if self.is_eof() {
            return Token::Lt;
        }

        match self.current() {
            b'=' => {
                self.advance();
                if !self.is_eof() && self.current() == b'>' {
                    self.advance();
                    Token::Spaceship
                } else {
                    Token::LtEq
                }
            }
            b'>' => {
                self.advance();
                Token::NotEq
            }
            b'<' => {
                self.advance();
                Token::LeftShift
            }
            _ => Token::Lt,
        }
    }

    fn scan_greater_than(&mut self) -> Token<'a> {
        self.advance();

        if self.is_eof() {
            return Token::Gt;
        }

        match self.current() {
            b'=' => {
                self.advance();
                Token::GtEq
            }
            b'>' => {
                self.advance();
                Token::RightShift
            }
            _ => Token::Gt,
        }
    }

    fn scan_exclamation(&mut self) -> Token<'a> {
        self.advance();

        if !self.is_eof() && self.current() == b'=' {
            self.advance();
            Token::BangEq
        } else {
            Token::Error("expected '=' after '!'")
        }
    }

    fn scan_dot(&mut self) -> Token<'a> {
        self.advance();

        if !self.is_eof() && self.current().is_ascii_digit() {
            let start = self.pos - 1;
            while !self.is_eof() && self.current().is_ascii_digit() {
                self.advance();
            }
            if !self.is_eof() && (self.current() == b'e' || self.current() == b'E') {
                self.advance();
                if !self.is_eof() && (self.current() == b'+' || self.current() == b'-') {
                    self.advance();
                }
                while !self.is_eof() && self.current().is_ascii_digit() {
                    self.advance();
                }
            }
            Token::Float(&self.input[start..self.pos])
        } else {
            Token::Dot
        }
    }
}
