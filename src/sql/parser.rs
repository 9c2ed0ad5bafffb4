//! # SQL Parser - Arena-Allocated DML Parser
//!
//! Recursive descent parser producing an arena-allocated AST for the
//! data-manipulation statements a branch transaction can issue. Expressions
//! are parsed with a Pratt parser.
//!
//! ```text
//! Input SQL → Lexer(dialect) → Parser → Vec<ParsedStatement> (arena-allocated)
//! ```
//!
//! ## Supported Statements
//!
//! | Statement                                   | Dialects                 |
//! |---------------------------------------------|--------------------------|
//! | `SELECT ... FOR UPDATE [OF ...] [NOWAIT]`   | all                      |
//! | `SELECT ... LOCK IN SHARE MODE`             | MySQL, MariaDB           |
//! | `INSERT [IGNORE] [INTO] ... VALUES/VALUE`   | INTO optional in MySQL   |
//! | `INSERT ... ON DUPLICATE KEY UPDATE`        | MySQL, MariaDB           |
//! | `INSERT ... ON CONFLICT`, `RETURNING`       | PostgreSQL               |
//! | `UPDATE ... ORDER BY ... LIMIT`             | MySQL, MariaDB           |
//! | `DELETE t1, t2 FROM ...`, `DELETE ... USING`| MySQL, MariaDB           |
//! | `DELETE t WHERE ...` (no FROM)              | Oracle, OceanBase Oracle |
//!
//! ## Parameter Positions
//!
//! Every placeholder gets the 1-based position it reads from the parameter
//! holder. `?`, `:name` and `@name` are numbered in order of appearance across
//! the whole input; PostgreSQL `$n` reads position `n`.
//!
//! ## Error Handling
//!
//! Parsing fails fast on the first error. Public entry points return an
//! `eyre::Report` carrying [`UndoError::ParseFailure`] with the dialect name,
//! the offending token and its line and column.
//!
//! ## Usage Example
//!
//! ```ignore
//! let arena = Bump::new();
//! let mut parser = Parser::new("DELETE FROM t WHERE id = ?", DbType::MySql, &arena);
//! let statements = parser.parse_statements()?;
//! assert_eq!(statements[0].sql, "DELETE FROM t WHERE id = ?");
//! ```

use bumpalo::Bump;
use eyre::{bail, Result};

use super::ast::*;
use super::dialect::DbType;
use super::lexer::Lexer;
use super::token::{Keyword, Parameter, Span, Token};
use crate::error::UndoError;


/// One statement of the input with the text it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedStatement<'a> {
    pub statement: Statement<'a>,
    /// The whole input for single-statement text, the statement's own slice
    /// otherwise.
    pub sql: &'a str,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    arena: &'a Bump,
    current: Token<'a>,
    current_span: Span,
    previous_end: usize,
    next_parameter: u32,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, dialect: DbType, arena: &'a Bump) -> Self {
        let mut lexer = Lexer::new(input, dialect);
        let current = lexer.next_token();
        let current_span = lexer.span();
        Self {
            lexer,
            arena,
            current,
            current_span,
            previous_end: 0,
            next_parameter: 0,
        }
    }

    pub fn dialect(&self) -> DbType {
        self.lexer.dialect()
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.current, Token::Eof)
    }

    pub fn peek(&self) -> &Token<'a> {
        &self.current
    }

    pub fn advance(&mut self) -> Token<'a> {
        self.previous_end = self.current_span.end();
        let prev = std::mem::replace(&mut self.current, self.lexer.next_token());
        self.current_span = self.lexer.span();
        prev
    }

    pub fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current, Token::Keyword(k) if *k == keyword)
    }

    pub fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            bail!(
                "expected {}, found {} at line {} column {}",
                keyword.as_str(),
                self.describe_current(),
                self.lexer.line(),
                self.lexer.column()
            )
        }
    }

    pub fn check_token(&self, expected: &Token<'_>) -> bool {
        std::mem::discriminant(&self.current) == std::mem::discriminant(expected)
    }

    pub fn consume_token(&mut self, expected: &Token<'_>) -> bool {
        if self.check_token(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_token(&mut self, expected: &Token<'_>) -> Result<()> {
        if self.check_token(expected) {
            self.advance();
            Ok(())
        } else {
            bail!(
                "expected {:?}, found {} at line {} column {}",
                expected,
                self.describe_current(),
                self.lexer.line(),
                self.lexer.column()
            )
        }
    }

    fn describe_current(&self) -> String {
        match self.current {
            Token::Error(message) => format!("invalid input ({})", message),
            Token::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.current_text()),
        }
    }

    fn current_text(&self) -> &'a str {
        self.lexer
            .input()
            .get(self.current_span.start..self.current_span.end())
            .unwrap_or("<non-ascii>")
    }

    fn unexpected<T>(&self, context: &str) -> Result<T> {
        bail!(
            "unexpected {} {} at line {} column {}",
            self.describe_current(),
            context,
            self.lexer.line(),
            self.lexer.column()
        )
    }

    fn failure(&self, err: eyre::Report) -> eyre::Report {
        eyre::Report::new(UndoError::parse(self.dialect(), format!("{:#}", err)))
    }

    /// Parses every `;`-separated statement of the input.
    pub fn parse_statements(&mut self) -> Result<Vec<ParsedStatement<'a>>> {
        self.parse_statements_inner().map_err(|e| self.failure(e))
    }

    /// Parses a single statement at the current position.
    pub fn parse_statement(&mut self) -> Result<Statement<'a>> {
        self.parse_statement_inner().map_err(|e| self.failure(e))
    }

    fn parse_statements_inner(&mut self) -> Result<Vec<ParsedStatement<'a>>> {
        let input = self.lexer.input();
        let mut parsed = Vec::new();

        loop {
            while self.consume_token(&Token::Semicolon) {}
            if self.is_at_end() {
                break;
            }

            let start = self.current_span.start;
            let statement = self.parse_statement_inner()?;
            let end = self.previous_end;

            if !self.is_at_end() && !self.check_token(&Token::Semicolon) {
                return self.unexpected("after end of statement");
            }

            parsed.push(ParsedStatement {
                statement,
                sql: &input[start..end],
            });
        }

        match parsed.len() {
            0 => bail!("empty statement"),
            1 => parsed[0].sql = input,
            _ => {}
        }

        Ok(parsed)
    }

    fn parse_statement_inner(&mut self) -> Result<Statement<'a>> {
        match self.peek() {
            Token::Keyword(Keyword::Select) => {
                let select = self.parse_select()?;
                Ok(Statement::Select(self.arena.alloc(select)))
            }
            Token::LParen => {
                self.advance();
                let select = self.parse_select()?;
                self.expect_token(&Token::RParen)?;
                Ok(Statement::Select(self.arena.alloc(select)))
            }
            Token::Keyword(Keyword::Insert) => {
                let insert = self.parse_insert()?;
                Ok(Statement::Insert(self.arena.alloc(insert)))
            }
            Token::Keyword(Keyword::Update) => {
                let update = self.parse_update()?;
                Ok(Statement::Update(self.arena.alloc(update)))
            }
            Token::Keyword(Keyword::Delete) => {
                let delete = self.parse_delete()?;
                Ok(Statement::Delete(self.arena.alloc(delete)))
            }
            _ => self.unexpected("at start of statement"),
        }
    }

    fn parse_select(&mut self) -> Result<SelectStmt<'a>> {
        self.expect_keyword(Keyword::Select)?;

        let distinct = if self.consume_keyword(Keyword::Distinct) {
            Distinct::Distinct
        } else {
            self.consume_keyword(Keyword::All);
            Distinct::All
        };

        let columns = self.parse_select_columns()?;

        let from = if self.consume_keyword(Keyword::From) {
            Some(self.parse_from_clause()?)
        } else {
            None
        };

        let where_clause = self.parse_where()?;

        let group_by = if self.consume_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            self.parse_expr_list()?
        } else {
            &[]
        };

        let having: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Having) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        let set_op = self.parse_set_operation()?;

        let order_by = self.parse_order_by()?;
        let mut limit = self.parse_limit()?;
        let for_clause = self.parse_for_clause()?;
        if limit.is_none() {
            limit = self.parse_limit()?;
        }

        Ok(SelectStmt {
            distinct,
            columns,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            set_op,
            for_clause,
        })
    }

    fn parse_where(&mut self) -> Result<Option<&'a Expr<'a>>> {
        if self.consume_keyword(Keyword::Where) {
            Ok(Some(self.arena.alloc(self.parse_expr(0)?)))
        } else {
            Ok(None)
        }
    }

    fn parse_for_clause(&mut self) -> Result<Option<&'a ForClause<'a>>> {
        if self.dialect().is_mysql_family() && self.consume_keyword(Keyword::Lock) {
            self.expect_keyword(Keyword::In)?;
            self.expect_keyword(Keyword::Share)?;
            self.expect_keyword(Keyword::Mode)?;
            return Ok(Some(self.arena.alloc(ForClause {
                lock_mode: LockMode::InShareMode,
                of: &[],
                wait_policy: WaitPolicy::Wait,
            })));
        }

        if !self.consume_keyword(Keyword::For) {
            return Ok(None);
        }

        let lock_mode = if self.consume_keyword(Keyword::Update) {
            LockMode::Update
        } else if self.consume_keyword(Keyword::Share) {
            LockMode::Share
        } else if self.consume_keyword(Keyword::No) {
            self.expect_keyword(Keyword::Key)?;
            self.expect_keyword(Keyword::Update)?;
            LockMode::NoKeyUpdate
        } else if self.consume_keyword(Keyword::Key) {
            self.expect_keyword(Keyword::Share)?;
            LockMode::KeyShare
        } else {
            return self.unexpected("after FOR");
        };

        let of = if self.consume_keyword(Keyword::Of) {
            let mut refs = Vec::new();
            loop {
                refs.push(self.parse_column_ref()?);
                if !self.consume_token(&Token::Comma) {
                    break;
                }
            }
            self.arena.alloc_slice_copy(&refs) as &[ColumnRef<'a>]
        } else {
            &[]
        };

        let wait_policy = if self.consume_keyword(Keyword::Nowait) {
            WaitPolicy::Nowait
        } else if self.consume_keyword(Keyword::Skip) {
            self.expect_keyword(Keyword::Locked)?;
            WaitPolicy::SkipLocked
        } else if self.consume_keyword(Keyword::Wait) {
            match self.advance() {
                Token::Integer(n) => match n.parse::<u32>() {
                    Ok(seconds) => WaitPolicy::WaitSeconds(seconds),
                    Err(_) => bail!("invalid WAIT interval '{}'", n),
                },
                _ => bail!("expected seconds after WAIT"),
            }
        } else {
            WaitPolicy::Wait
        };

        Ok(Some(self.arena.alloc(ForClause {
            lock_mode,
            of,
            wait_policy,
        })))
    }

    fn parse_select_columns(&mut self) -> Result<&'a [SelectColumn<'a>]> {
        let mut columns = Vec::new();
        loop {
            if self.consume_token(&Token::Star) {
                columns.push(SelectColumn::AllColumns);
            } else if matches!(self.current, Token::Ident(_) | Token::QuotedIdent(_))
                && self.lexer.peek() == Token::Dot
                && self.lexer.peek_nth(1) == Token::Star
            {
                let table = self.expect_ident()?;
                self.advance();
                self.advance();
                columns.push(SelectColumn::TableAllColumns(table));
            } else {
                let expr = self.parse_expr(0)?;
                let alias = self.parse_optional_alias()?;
                columns.push(SelectColumn::Expr {
                    expr: self.arena.alloc(expr),
                    alias,
                });
            }

            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&columns))
    }

    fn parse_optional_alias(&mut self) -> Result<Option<&'a str>> {
        if self.consume_keyword(Keyword::As) {
            Ok(Some(self.expect_ident()?))
        } else if matches!(self.current, Token::Ident(_) | Token::QuotedIdent(_)) {
            Ok(Some(self.expect_ident()?))
        } else {
            Ok(None)
        }
    }

    fn parse_from_clause(&mut self) -> Result<&'a FromClause<'a>> {
        let mut left = self.parse_table_factor()?;

        loop {
            let join_type = if self.consume_token(&Token::Comma) {
                JoinType::Comma
            } else if let Some(join_type) = self.parse_join_type() {
                join_type
            } else {
                break;
            };

            let right = self.parse_table_factor()?;
            let condition = match join_type {
                JoinType::Comma | JoinType::Cross | JoinType::Natural => JoinCondition::None,
                _ => self.parse_join_condition()?,
            };

            let join = self.arena.alloc(JoinClause {
                left,
                join_type,
                right,
                condition,
            });
            left = self.arena.alloc(FromClause::Join(join));
        }

        Ok(left)
    }

    fn parse_table_factor(&mut self) -> Result<&'a FromClause<'a>> {
        if self.consume_token(&Token::LParen) {
            if self.check_keyword(Keyword::Select) {
                let query = self.parse_select()?;
                self.expect_token(&Token::RParen)?;
                let alias = self.parse_optional_alias()?;
                return Ok(self.arena.alloc(FromClause::Subquery {
                    query: self.arena.alloc(query),
                    alias,
                }));
            }
            let from = self.parse_from_clause()?;
            self.expect_token(&Token::RParen)?;
            return Ok(from);
        }

        let table = self.parse_table_name()?;
        Ok(self.arena.alloc(FromClause::Table(table)))
    }

    fn parse_join_type(&mut self) -> Option<JoinType> {
        if self.consume_keyword(Keyword::Inner) {
            self.consume_keyword(Keyword::Join);
            Some(JoinType::Inner)
        } else if self.consume_keyword(Keyword::Left) {
            self.consume_keyword(Keyword::Outer);
            self.consume_keyword(Keyword::Join);
            Some(JoinType::Left)
        } else if self.consume_keyword(Keyword::Right) {
            self.consume_keyword(Keyword::Outer);
            self.consume_keyword(Keyword::Join);
            Some(JoinType::Right)
        } else if self.consume_keyword(Keyword::Full) {
            self.consume_keyword(Keyword::Outer);
            self.consume_keyword(Keyword::Join);
            Some(JoinType::Full)
        } else if self.consume_keyword(Keyword::Cross) {
            self.consume_keyword(Keyword::Join);
            Some(JoinType::Cross)
        } else if self.consume_keyword(Keyword::Natural) {
            let has_direction = self.consume_keyword(Keyword::Left)
                || self.consume_keyword(Keyword::Right)
                || self.consume_keyword(Keyword::Full);
            if has_direction {
                self.consume_keyword(Keyword::Outer);
            }
            self.consume_keyword(Keyword::Join);
            Some(JoinType::Natural)
        } else if self.consume_keyword(Keyword::Join) {
            Some(JoinType::Inner)
        } else {
            None
        }
    }

    fn parse_join_condition(&mut self) -> Result<JoinCondition<'a>> {
        if self.consume_keyword(Keyword::On) {
            let expr = self.parse_expr(0)?;
            Ok(JoinCondition::On(self.arena.alloc(expr)))
        } else if self.consume_keyword(Keyword::Using) {
            self.expect_token(&Token::LParen)?;
            let columns = self.parse_ident_list()?;
            self.expect_token(&Token::RParen)?;
            Ok(JoinCondition::Using(columns))
        } else {
            Ok(JoinCondition::None)
        }
    }

    fn parse_order_by(&mut self) -> Result<&'a [OrderByItem<'a>]> {
        if !self.consume_keyword(Keyword::Order) {
            return Ok(&[]);
        }
        self.expect_keyword(Keyword::By)?;

        let mut items = Vec::new();
        loop {
            let expr = self.parse_expr(0)?;
            let direction = if self.consume_keyword(Keyword::Desc) {
                Some(OrderDirection::Desc)
            } else if self.consume_keyword(Keyword::Asc) {
                Some(OrderDirection::Asc)
            } else {
                None
            };
            let nulls = if self.consume_keyword(Keyword::Nulls) {
                if self.consume_keyword(Keyword::First) {
                    NullsOrder::First
                } else {
                    self.expect_keyword(Keyword::Last)?;
                    NullsOrder::Last
                }
            } else {
                NullsOrder::Default
            };
            items.push(OrderByItem {
                expr: self.arena.alloc(expr),
                direction,
                nulls,
            });
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&items))
    }

    fn parse_limit(&mut self) -> Result<Option<&'a LimitClause<'a>>> {
        if self.consume_keyword(Keyword::Limit) {
            let first: &Expr<'a> = self.arena.alloc(self.parse_expr(0)?);
            let clause = if self.dialect().is_mysql_family() && self.consume_token(&Token::Comma) {
                let count = self.arena.alloc(self.parse_expr(0)?);
                LimitClause::OffsetCount {
                    offset: first,
                    count,
                }
            } else if self.consume_keyword(Keyword::Offset) {
                let offset = self.arena.alloc(self.parse_expr(0)?);
                LimitClause::Limit {
                    count: first,
                    offset: Some(offset),
                }
            } else {
                LimitClause::Limit {
                    count: first,
                    offset: None,
                }
            };
            return Ok(Some(self.arena.alloc(clause)));
        }

        let offset: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Offset) {
            let expr = self.arena.alloc(self.parse_expr(0)?);
            if !self.consume_keyword(Keyword::Rows) {
                self.consume_keyword(Keyword::Row);
            }
            Some(expr)
        } else {
            None
        };

        if self.consume_keyword(Keyword::Fetch) {
            if !self.consume_keyword(Keyword::First) {
                self.expect_keyword(Keyword::Next)?;
            }
            let count = self.arena.alloc(self.parse_expr(0)?);
            if !self.consume_keyword(Keyword::Rows) {
                self.expect_keyword(Keyword::Row)?;
            }
            self.expect_keyword(Keyword::Only)?;
            return Ok(Some(self.arena.alloc(LimitClause::Fetch { offset, count })));
        }

        match offset {
            Some(_) => bail!("OFFSET without LIMIT or FETCH is not supported"),
            None => Ok(None),
        }
    }

    fn parse_set_operation(&mut self) -> Result<Option<&'a SetOperation<'a>>> {
        let op = if self.consume_keyword(Keyword::Union) {
            SetOperator::Union
        } else if self.consume_keyword(Keyword::Intersect) {
            SetOperator::Intersect
        } else if self.consume_keyword(Keyword::Except) {
            SetOperator::Except
        } else {
            return Ok(None);
        };

        let all = self.consume_keyword(Keyword::All);
        self.consume_keyword(Keyword::Distinct);

        let right = self.parse_select()?;
        Ok(Some(self.arena.alloc(SetOperation {
            op,
            all,
            right: self.arena.alloc(right),
        })))
    }

    fn binary_operator(&self) -> Option<BinaryOperator> {
        let op = match self.current {
            Token::Plus => BinaryOperator::Plus,
            Token::Minus => BinaryOperator::Minus,
            Token::Star => BinaryOperator::Multiply,
            Token::Slash => BinaryOperator::Divide,
            Token::Percent => BinaryOperator::Modulo,
            Token::Caret => BinaryOperator::Power,
            Token::DoublePipe => BinaryOperator::Concat,
            Token::Eq => BinaryOperator::Eq,
            Token::NotEq => BinaryOperator::NotEq,
            Token::BangEq => BinaryOperator::BangEq,
            Token::Spaceship => BinaryOperator::NullSafeEq,
            Token::Lt => BinaryOperator::Lt,
            Token::LtEq => BinaryOperator::LtEq,
            Token::Gt => BinaryOperator::Gt,
            Token::GtEq => BinaryOperator::GtEq,
            Token::Keyword(Keyword::And) => BinaryOperator::And,
            Token::Keyword(Keyword::Or) => BinaryOperator::Or,
            Token::Ampersand => BinaryOperator::BitwiseAnd,
            Token::Pipe => BinaryOperator::BitwiseOr,
            Token::LeftShift => BinaryOperator::LeftShift,
            Token::RightShift => BinaryOperator::RightShift,
            _ => return None,
        };
        Some(op)
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr<'a>> {
        let mut lhs = self.parse_prefix()?;

        loop {
            if let Some(op) = self.binary_operator() {
                let (l_bp, r_bp) = op.binding_power();
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                let rhs = self.parse_expr(r_bp)?;
                lhs = Expr::BinaryOp {
                    left: self.arena.alloc(lhs),
                    op,
                    right: self.arena.alloc(rhs),
                };
                continue;
            }

            if self.check_keyword(Keyword::Is) {
                if 6 < min_bp {
                    break;
                }
                self.advance();
                let negated = self.consume_keyword(Keyword::Not);
                lhs = if self.consume_keyword(Keyword::Null) {
                    Expr::IsNull {
                        expr: self.arena.alloc(lhs),
                        negated,
                    }
                } else if self.consume_keyword(Keyword::True) {
                    Expr::IsBoolean {
                        expr: self.arena.alloc(lhs),
                        value: true,
                        negated,
                    }
                } else if self.consume_keyword(Keyword::False) {
                    Expr::IsBoolean {
                        expr: self.arena.alloc(lhs),
                        value: false,
                        negated,
                    }
                } else {
                    return self.unexpected("after IS");
                };
                continue;
            }

            let negated = self.check_keyword(Keyword::Not)
                && matches!(
                    self.lexer.peek(),
                    Token::Keyword(Keyword::Between | Keyword::In | Keyword::Like | Keyword::Ilike)
                );
            let predicate_start = negated
                || matches!(
                    self.current,
                    Token::Keyword(Keyword::Between | Keyword::In | Keyword::Like | Keyword::Ilike)
                );

            if predicate_start {
                if 6 < min_bp {
                    break;
                }
                if negated {
                    self.advance();
                }
                lhs = self.parse_predicate(lhs, negated)?;
                continue;
            }

            if self.check_token(&Token::DoubleColon) {
                if 18 < min_bp {
                    break;
                }
                self.advance();
                let data_type = self.parse_type_name(false)?;
                lhs = Expr::Cast {
                    expr: self.arena.alloc(lhs),
                    data_type,
                    style: CastStyle::DoubleColon,
                };
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    fn parse_predicate(&mut self, lhs: Expr<'a>, negated: bool) -> Result<Expr<'a>> {
        match self.advance() {
            Token::Keyword(Keyword::Between) => {
                let low = self.parse_expr(7)?;
                self.expect_keyword(Keyword::And)?;
                let high = self.parse_expr(7)?;
                Ok(Expr::Between {
                    expr: self.arena.alloc(lhs),
                    negated,
                    low: self.arena.alloc(low),
                    high: self.arena.alloc(high),
                })
            }
            Token::Keyword(Keyword::In) => {
                self.expect_token(&Token::LParen)?;
                if self.check_keyword(Keyword::Select) {
                    let subquery = self.parse_select()?;
                    self.expect_token(&Token::RParen)?;
                    Ok(Expr::InSubquery {
                        expr: self.arena.alloc(lhs),
                        negated,
                        subquery: self.arena.alloc(subquery),
                    })
                } else {
                    let list = self.parse_expr_list()?;
                    self.expect_token(&Token::RParen)?;
                    Ok(Expr::InList {
                        expr: self.arena.alloc(lhs),
                        negated,
                        list,
                    })
                }
            }
            Token::Keyword(kw @ (Keyword::Like | Keyword::Ilike)) => {
                let pattern = self.parse_expr(7)?;
                let escape: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Escape) {
                    Some(self.arena.alloc(self.parse_expr(7)?))
                } else {
                    None
                };
                Ok(Expr::Like {
                    expr: self.arena.alloc(lhs),
                    negated,
                    pattern: self.arena.alloc(pattern),
                    escape,
                    case_insensitive: kw == Keyword::Ilike,
                })
            }
            _ => bail!("expected BETWEEN, IN or LIKE"),
        }
    }

    fn next_parameter_position(&mut self, param: Parameter<'a>) -> ParameterRef<'a> {
        match param {
            Parameter::Positional(n) => ParameterRef {
                position: n,
                style: ParameterStyle::Positional,
            },
            Parameter::Named(name) => {
                self.next_parameter += 1;
                ParameterRef {
                    position: self.next_parameter,
                    style: ParameterStyle::Named(name),
                }
            }
            Parameter::Anonymous => {
                self.next_parameter += 1;
                ParameterRef {
                    position: self.next_parameter,
                    style: ParameterStyle::Anonymous,
                }
            }
        }
    }

    fn parse_prefix(&mut self) -> Result<Expr<'a>> {
        match self.current {
            Token::Keyword(Keyword::Not) => {
                self.advance();
                if self.consume_keyword(Keyword::Exists) {
                    self.expect_token(&Token::LParen)?;
                    let subquery = self.parse_select()?;
                    self.expect_token(&Token::RParen)?;
                    Ok(Expr::Exists {
                        subquery: self.arena.alloc(subquery),
                        negated: true,
                    })
                } else {
                    let expr = self.parse_expr(5)?;
                    Ok(Expr::UnaryOp {
                        op: UnaryOperator::Not,
                        expr: self.arena.alloc(expr),
                    })
                }
            }
            Token::Minus => {
                self.advance();
                let expr = self.parse_expr(14)?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Minus,
                    expr: self.arena.alloc(expr),
                })
            }
            Token::Plus => {
                self.advance();
                let expr = self.parse_expr(14)?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Plus,
                    expr: self.arena.alloc(expr),
                })
            }
            Token::Tilde => {
                self.advance();
                let expr = self.parse_expr(14)?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::BitwiseNot,
                    expr: self.arena.alloc(expr),
                })
            }
            Token::Integer(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Integer(s)))
            }
            Token::Float(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(s)))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            Token::HexNumber(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::HexNumber(s)))
            }
            Token::BinaryNumber(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::BinaryNumber(s)))
            }
            Token::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            Token::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            Token::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            Token::Keyword(Keyword::Default) => {
                self.advance();
                Ok(Expr::Default)
            }
            Token::Parameter(p) => {
                self.advance();
                Ok(Expr::Parameter(self.next_parameter_position(p)))
            }
            Token::LParen => {
                self.advance();
                if self.check_keyword(Keyword::Select) {
                    let subquery = self.parse_select()?;
                    self.expect_token(&Token::RParen)?;
                    return Ok(Expr::Subquery(self.arena.alloc(subquery)));
                }
                let expr = self.parse_expr(0)?;
                if self.consume_token(&Token::Comma) {
                    let mut exprs: Vec<&Expr<'a>> = vec![self.arena.alloc(expr)];
                    loop {
                        exprs.push(self.arena.alloc(self.parse_expr(0)?));
                        if !self.consume_token(&Token::Comma) {
                            break;
                        }
                    }
                    self.expect_token(&Token::RParen)?;
                    Ok(Expr::Row(self.arena.alloc_slice_copy(&exprs)))
                } else {
                    self.expect_token(&Token::RParen)?;
                    Ok(expr)
                }
            }
            Token::Keyword(Keyword::Case) => self.parse_case(),
            Token::Keyword(Keyword::Cast) => self.parse_cast(),
            Token::Keyword(Keyword::Exists) => {
                self.advance();
                self.expect_token(&Token::LParen)?;
                let subquery = self.parse_select()?;
                self.expect_token(&Token::RParen)?;
                Ok(Expr::Exists {
                    subquery: self.arena.alloc(subquery),
                    negated: false,
                })
            }
            Token::Ident(_) | Token::QuotedIdent(_) => self.parse_name_expr(),
            Token::Keyword(kw) if !is_structural(kw) => self.parse_name_expr(),
            _ => self.unexpected("in expression"),
        }
    }

    /// Column reference, function call or typed string starting at a name.
    fn parse_name_expr(&mut self) -> Result<Expr<'a>> {
        let is_plain = matches!(self.current, Token::Ident(_));
        let first = self.expect_ident()?;

        if is_plain {
            if let Token::String(value) = self.current {
                if is_typed_string_prefix(first) {
                    self.advance();
                    return Ok(Expr::TypedString {
                        data_type: first,
                        value,
                    });
                }
            }
        }

        if self.check_token(&Token::LParen) {
            return self.parse_function_call(None, first);
        }

        if !self.consume_token(&Token::Dot) {
            return Ok(Expr::Column(ColumnRef::bare(first)));
        }

        let second = self.expect_ident()?;
        if self.check_token(&Token::LParen) {
            return self.parse_function_call(Some(first), second);
        }
        if self.consume_token(&Token::Dot) {
            let third = self.expect_ident()?;
            return Ok(Expr::Column(ColumnRef {
                schema: Some(first),
                table: Some(second),
                column: third,
            }));
        }
        Ok(Expr::Column(ColumnRef {
            schema: None,
            table: Some(first),
            column: second,
        }))
    }

    fn parse_case(&mut self) -> Result<Expr<'a>> {
        self.expect_keyword(Keyword::Case)?;

        let operand: Option<&Expr<'a>> = if !self.check_keyword(Keyword::When) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        let mut conditions = Vec::new();
        while self.consume_keyword(Keyword::When) {
            let condition = self.parse_expr(0)?;
            self.expect_keyword(Keyword::Then)?;
            let result = self.parse_expr(0)?;
            conditions.push(WhenClause {
                condition: self.arena.alloc(condition),
                result: self.arena.alloc(result),
            });
        }
        if conditions.is_empty() {
            bail!("CASE requires at least one WHEN");
        }

        let else_result: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Else) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        self.expect_keyword(Keyword::End)?;

        Ok(Expr::Case {
            operand,
            conditions: self.arena.alloc_slice_copy(&conditions),
            else_result,
        })
    }

    fn parse_cast(&mut self) -> Result<Expr<'a>> {
        self.expect_keyword(Keyword::Cast)?;
        self.expect_token(&Token::LParen)?;
        let expr = self.parse_expr(0)?;
        self.expect_keyword(Keyword::As)?;
        let data_type = self.parse_type_name(true)?;
        self.expect_token(&Token::RParen)?;
        Ok(Expr::Cast {
            expr: self.arena.alloc(expr),
            data_type,
            style: CastStyle::Function,
        })
    }

    /// Type names are kept as source text, e.g. `DECIMAL(10, 2)`.
    fn parse_type_name(&mut self, multi_word: bool) -> Result<&'a str> {
        let start = self.current_span.start;
        self.expect_ident()?;
        if multi_word {
            while matches!(self.current, Token::Ident(_)) {
                self.advance();
            }
        }
        if self.consume_token(&Token::LParen) {
            loop {
                match self.advance() {
                    Token::Integer(_) | Token::Comma | Token::Ident(_) => {}
                    Token::RParen => break,
                    _ => bail!("invalid type modifier"),
                }
            }
        }
        Ok(&self.lexer.input()[start..self.previous_end])
    }

    fn parse_function_call(&mut self, schema: Option<&'a str>, name: &'a str) -> Result<Expr<'a>> {
        self.expect_token(&Token::LParen)?;

        let distinct = self.consume_keyword(Keyword::Distinct);

        let args = if self.consume_token(&Token::Star) {
            FunctionArgs::Star
        } else if self.check_token(&Token::RParen) {
            FunctionArgs::None
        } else {
            FunctionArgs::Args(self.parse_expr_list()?)
        };

        self.expect_token(&Token::RParen)?;

        Ok(Expr::Function(FunctionCall {
            schema,
            name,
            args,
            distinct,
        }))
    }

    fn parse_expr_list(&mut self) -> Result<&'a [&'a Expr<'a>]> {
        let mut exprs: Vec<&Expr<'a>> = Vec::new();
        loop {
            exprs.push(self.arena.alloc(self.parse_expr(0)?));
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&exprs))
    }

    fn parse_ident_list(&mut self) -> Result<&'a [&'a str]> {
        let mut idents = Vec::new();
        loop {
            idents.push(self.expect_ident()?);
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&idents))
    }

    /// Column list entry; a qualifier such as `t.col` is dropped.
    fn parse_column_name(&mut self) -> Result<&'a str> {
        let mut name = self.expect_ident()?;
        while self.consume_token(&Token::Dot) {
            name = self.expect_ident()?;
        }
        Ok(name)
    }

    fn parse_column_ref(&mut self) -> Result<ColumnRef<'a>> {
        let first = self.expect_ident()?;
        if !self.consume_token(&Token::Dot) {
            return Ok(ColumnRef::bare(first));
        }
        let second = self.expect_ident()?;
        if self.consume_token(&Token::Dot) {
            let third = self.expect_ident()?;
            return Ok(ColumnRef {
                schema: Some(first),
                table: Some(second),
                column: third,
            });
        }
        Ok(ColumnRef {
            schema: None,
            table: Some(first),
            column: second,
        })
    }

    /// Identifier at the current token. Keywords are accepted and keep
    /// their source spelling.
    fn expect_ident(&mut self) -> Result<&'a str> {
        let text = self.current_text();
        match self.current {
            Token::Ident(s) | Token::QuotedIdent(s) => {
                self.advance();
                Ok(s)
            }
            Token::Keyword(_) => {
                self.advance();
                Ok(text)
            }
            _ => self.unexpected("where an identifier was expected"),
        }
    }

    fn parse_insert(&mut self) -> Result<InsertStmt<'a>> {
        self.expect_keyword(Keyword::Insert)?;

        let mysql = self.dialect().is_mysql_family();
        let mut ignore = false;
        if mysql {
            if !self.consume_keyword(Keyword::LowPriority)
                && !self.consume_keyword(Keyword::Delayed)
            {
                self.consume_keyword(Keyword::HighPriority);
            }
            ignore = self.consume_keyword(Keyword::Ignore);
            self.consume_keyword(Keyword::Into);
        } else {
            self.expect_keyword(Keyword::Into)?;
        }

        let table = self.parse_table_name()?;

        let columns = if self.consume_token(&Token::LParen) {
            let mut cols = Vec::new();
            loop {
                cols.push(self.parse_column_name()?);
                if !self.consume_token(&Token::Comma) {
                    break;
                }
            }
            self.expect_token(&Token::RParen)?;
            self.arena.alloc_slice_copy(&cols) as &[&str]
        } else {
            &[]
        };

        let values_keyword = self.consume_keyword(Keyword::Values)
            || (mysql && self.consume_keyword(Keyword::Value));

        let source = if values_keyword {
            let mut rows = Vec::new();
            loop {
                self.expect_token(&Token::LParen)?;
                let exprs = if self.check_token(&Token::RParen) {
                    &[] as &[&Expr<'a>]
                } else {
                    self.parse_expr_list()?
                };
                self.expect_token(&Token::RParen)?;
                rows.push(exprs);
                if !self.consume_token(&Token::Comma) {
                    break;
                }
            }
            InsertSource::Values(self.arena.alloc_slice_copy(&rows))
        } else if self.consume_keyword(Keyword::Default) {
            self.expect_keyword(Keyword::Values)?;
            InsertSource::DefaultValues
        } else if self.check_keyword(Keyword::Select) {
            let select = self.parse_select()?;
            InsertSource::Select(self.arena.alloc(select))
        } else {
            return self.unexpected("where VALUES or SELECT was expected");
        };

        let mut on_duplicate: &[Assignment<'a>] = &[];
        let mut on_conflict = None;
        if self.consume_keyword(Keyword::On) {
            if mysql {
                self.expect_keyword(Keyword::Duplicate)?;
                self.expect_keyword(Keyword::Key)?;
                self.expect_keyword(Keyword::Update)?;
                on_duplicate = self.parse_assignments()?;
            } else if self.dialect() == DbType::PostgreSql {
                self.expect_keyword(Keyword::Conflict)?;
                on_conflict = Some(self.parse_on_conflict()?);
            } else {
                return self.unexpected("after INSERT source");
            }
        }

        let returning = self.parse_returning()?;

        Ok(InsertStmt {
            ignore,
            table,
            columns,
            source,
            on_duplicate,
            on_conflict,
            returning,
        })
    }

    fn parse_on_conflict(&mut self) -> Result<&'a OnConflict<'a>> {
        let target = if self.consume_token(&Token::LParen) {
            let cols = self.parse_ident_list()?;
            self.expect_token(&Token::RParen)?;
            OnConflictTarget::Columns(cols)
        } else if self.consume_keyword(Keyword::On) {
            self.expect_keyword(Keyword::Constraint)?;
            let name = self.expect_ident()?;
            OnConflictTarget::Constraint(name)
        } else {
            OnConflictTarget::None
        };

        self.expect_keyword(Keyword::Do)?;

        let action = if self.consume_keyword(Keyword::Nothing) {
            OnConflictAction::DoNothing
        } else {
            self.expect_keyword(Keyword::Update)?;
            self.expect_keyword(Keyword::Set)?;
            let assignments = self.parse_assignments()?;
            self.parse_where()?;
            OnConflictAction::DoUpdate(assignments)
        };

        Ok(self.arena.alloc(OnConflict { target, action }))
    }

    fn parse_returning(&mut self) -> Result<Option<&'a [SelectColumn<'a>]>> {
        if self.dialect() == DbType::PostgreSql && self.consume_keyword(Keyword::Returning) {
            Ok(Some(self.parse_select_columns()?))
        } else {
            Ok(None)
        }
    }

    fn parse_update(&mut self) -> Result<UpdateStmt<'a>> {
        self.expect_keyword(Keyword::Update)?;
        if self.dialect().is_mysql_family() {
            self.consume_keyword(Keyword::LowPriority);
            self.consume_keyword(Keyword::Ignore);
        }

        let target = self.parse_from_clause()?;
        if matches!(target, FromClause::Join(_)) && !self.dialect().is_mysql_family() {
            bail!("multi-table UPDATE is only supported by mysql and mariadb");
        }

        self.expect_keyword(Keyword::Set)?;
        let assignments = self.parse_assignments()?;

        let from = if self.dialect() == DbType::PostgreSql && self.consume_keyword(Keyword::From) {
            Some(self.parse_from_clause()?)
        } else {
            None
        };

        let where_clause = self.parse_where()?;
        let (order_by, limit) = self.parse_mysql_row_limits("UPDATE")?;
        let returning = self.parse_returning()?;

        Ok(UpdateStmt {
            target,
            assignments,
            from,
            where_clause,
            order_by,
            limit,
            returning,
        })
    }

    /// `ORDER BY ... LIMIT ...` trailing an UPDATE or DELETE.
    fn parse_mysql_row_limits(
        &mut self,
        statement: &str,
    ) -> Result<(&'a [OrderByItem<'a>], Option<&'a LimitClause<'a>>)> {
        let starts = self.check_keyword(Keyword::Order) || self.check_keyword(Keyword::Limit);
        if starts && !self.dialect().is_mysql_family() {
            bail!(
                "ORDER BY and LIMIT on {} are only supported by mysql and mariadb",
                statement
            );
        }
        if !starts {
            return Ok((&[], None));
        }
        let order_by = self.parse_order_by()?;
        let limit = self.parse_limit()?;
        Ok((order_by, limit))
    }

    fn parse_assignments(&mut self) -> Result<&'a [Assignment<'a>]> {
        let mut assignments = Vec::new();
        loop {
            let column = self.parse_column_ref()?;
            self.expect_token(&Token::Eq)?;
            let value = self.parse_expr(0)?;
            assignments.push(Assignment {
                column,
                value: self.arena.alloc(value),
            });
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&assignments))
    }

    fn parse_delete(&mut self) -> Result<DeleteStmt<'a>> {
        self.expect_keyword(Keyword::Delete)?;

        let dialect = self.dialect();
        if dialect.is_mysql_family() {
            self.consume_keyword(Keyword::LowPriority);
            self.consume_keyword(Keyword::Quick);
            self.consume_keyword(Keyword::Ignore);
        }

        let mut targets: &[TableRef<'a>] = &[];
        let from: Option<&FromClause<'a>>;
        let mut using: Option<&FromClause<'a>> = None;

        if self.consume_keyword(Keyword::From) {
            let tables = self.parse_delete_targets()?;
            if self.consume_keyword(Keyword::Using) {
                let joined = self.parse_from_clause()?;
                if dialect.is_mysql_family() {
                    targets = tables;
                    from = None;
                } else if dialect == DbType::PostgreSql && tables.len() == 1 {
                    from = Some(self.arena.alloc(FromClause::Table(tables[0])));
                } else {
                    bail!("DELETE ... USING is not supported by {}", dialect);
                }
                using = Some(joined);
            } else if tables.len() == 1 {
                from = Some(self.arena.alloc(FromClause::Table(tables[0])));
            } else {
                bail!("multi-table DELETE FROM requires USING");
            }
        } else {
            let tables = self.parse_delete_targets()?;
            if self.consume_keyword(Keyword::From) {
                if !dialect.is_mysql_family() {
                    bail!("multi-table DELETE is only supported by mysql and mariadb");
                }
                targets = tables;
                from = Some(self.parse_from_clause()?);
            } else if dialect.is_oracle_family() && tables.len() == 1 {
                from = Some(self.arena.alloc(FromClause::Table(tables[0])));
            } else {
                return self.unexpected("where FROM was expected");
            }
        }

        let where_clause = self.parse_where()?;
        let (order_by, limit) = self.parse_mysql_row_limits("DELETE")?;
        let returning = self.parse_returning()?;

        Ok(DeleteStmt {
            targets,
            from,
            using,
            where_clause,
            order_by,
            limit,
            returning,
        })
    }

    /// Comma-separated table list of a DELETE; MySQL `t.*` targets allowed.
    fn parse_delete_targets(&mut self) -> Result<&'a [TableRef<'a>]> {
        let mut tables = Vec::new();
        loop {
            let first = self.expect_ident()?;
            let (schema, name) = if self.consume_token(&Token::Dot) {
                if self.consume_token(&Token::Star) {
                    (None, first)
                } else {
                    let second = self.expect_ident()?;
                    if self.consume_token(&Token::Dot) {
                        self.expect_token(&Token::Star)?;
                    }
                    (Some(first), second)
                }
            } else {
                (None, first)
            };
            let alias = self.parse_optional_alias()?;
            tables.push(TableRef {
                schema,
                name,
                alias,
            });
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&tables))
    }

    fn parse_table_name(&mut self) -> Result<TableRef<'a>> {
        let name = self.expect_ident()?;
        let (schema, name) = if self.consume_token(&Token::Dot) {
            (Some(name), self.expect_ident()?)
        } else {
            (None, name)
        };
        let alias = self.parse_optional_alias()?;
        Ok(TableRef {
            schema,
            name,
            alias,
        })
    }
}

/// Keywords that can never start an operand.
fn is_structural(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Select
            | Keyword::Insert
            | Keyword::Update
            | Keyword::Delete
            | Keyword::From
            | Keyword::Where
            | Keyword::Into
            | Keyword::Set
            | Keyword::As
            | Keyword::And
            | Keyword::Or
            | Keyword::In
            | Keyword::Between
            | Keyword::Like
            | Keyword::Ilike
            | Keyword::Is
            | Keyword::When
            | Keyword::Then
            | Keyword::Else
            | Keyword::End
            | Keyword::Order
            | Keyword::By
            | Keyword::Group
            | Keyword::Having
            | Keyword::Limit
            | Keyword::Offset
            | Keyword::Fetch
            | Keyword::Union
            | Keyword::Intersect
            | Keyword::Except
            | Keyword::Join
            | Keyword::On
            | Keyword::Using
            | Keyword::For
            | Keyword::Returning
    )
}

fn is_typed_string_prefix(name: &str) -> bool {
    ["DATE", "TIME", "TIMESTAMP"]
        .iter()
        .any(|t| name.eq_ignore_ascii_case(t))
}
