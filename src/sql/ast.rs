//! # SQL Abstract Syntax Tree
//!
//! AST types produced by the [`Parser`](super::parser::Parser). All nodes are
//! arena-allocated with bumpalo and borrow their text from the input SQL.
//!
//! ## Statement Types
//!
//! Only data-manipulation statements are modelled, since only those are
//! recognized for compensation:
//!
//! - `SELECT` (the `FOR UPDATE` form is the one that matters)
//! - `INSERT ... VALUES`, `INSERT ... SELECT`
//! - `UPDATE`, including MySQL `ORDER BY` / `LIMIT`
//! - `DELETE`, including the MySQL multi-table forms
//!
//! ## Memory Layout
//!
//! ```text
//! Statement<'a>
//!     └── DeleteStmt<'a>
//!             ├── targets: &'a [TableRef<'a>]      (DELETE t1, t2 FROM ...)
//!             ├── from: Option<&'a FromClause<'a>>
//!             ├── using: Option<&'a FromClause<'a>>
//!             ├── where_clause: Option<&'a Expr<'a>>
//!             └── ...
//! ```
//!
//! ## Identifiers
//!
//! Identifier slices are the source text. Quoted names keep their delimiters,
//! so `"Order"` and `Order` stay distinguishable; compare names with
//! [`same_identifier`](crate::schema::same_identifier).
//!
//! ## Operator Precedence
//!
//! | Precedence | Operators |
//! |------------|-----------|
//! | 1 | OR |
//! | 2 | AND |
//! | 3 | NOT (prefix) |
//! | 4 | =, <>, !=, <=>, <, >, <=, >=, IS, LIKE, IN, BETWEEN |
//! | 5 | \|\|, &, \|, <<, >> |
//! | 6 | +, - (binary) |
//! | 7 | *, /, % |
//! | 8 | ^ |
//! | 9 | - (unary), ~ |
//! | 10 | :: (cast) |

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statement<'a> {
    Select(&'a SelectStmt<'a>),
    Insert(&'a InsertStmt<'a>),
    Update(&'a UpdateStmt<'a>),
    Delete(&'a DeleteStmt<'a>),
}

impl Statement<'_> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectStmt<'a> {
    pub distinct: Distinct,
    pub columns: &'a [SelectColumn<'a>],
    pub from: Option<&'a FromClause<'a>>,
    pub where_clause: Option<&'a Expr<'a>>,
    pub group_by: &'a [&'a Expr<'a>],
    pub having: Option<&'a Expr<'a>>,
    pub order_by: &'a [OrderByItem<'a>],
    pub limit: Option<&'a LimitClause<'a>>,
    pub set_op: Option<&'a SetOperation<'a>>,
    pub for_clause: Option<&'a ForClause<'a>>,
}

impl SelectStmt<'_> {
    /// True for `FOR UPDATE` and `FOR NO KEY UPDATE`; shared locks do not count.
    pub fn is_for_update(&self) -> bool {
        matches!(
            self.for_clause,
            Some(ForClause {
                lock_mode: LockMode::Update | LockMode::NoKeyUpdate,
                ..
            })
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForClause<'a> {
    pub lock_mode: LockMode,
    pub of: &'a [ColumnRef<'a>],
    pub wait_policy: WaitPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
    /// MySQL `LOCK IN SHARE MODE`
    InShareMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    Wait,
    /// Oracle `WAIT n`
    WaitSeconds(u32),
    Nowait,
    SkipLocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distinct {
    All,
    Distinct,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectColumn<'a> {
    AllColumns,
    TableAllColumns(&'a str),
    Expr {
        expr: &'a Expr<'a>,
        alias: Option<&'a str>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetOperation<'a> {
    pub op: SetOperator,
    pub all: bool,
    pub right: &'a SelectStmt<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FromClause<'a> {
    Table(TableRef<'a>),
    Join(&'a JoinClause<'a>),
    Subquery {
        query: &'a SelectStmt<'a>,
        alias: Option<&'a str>,
    },
}

impl<'a> FromClause<'a> {
    /// Base tables in source order, descending into joins.
    pub fn tables(&self) -> Vec<&TableRef<'a>> {
        let mut out = Vec::new();
        self.collect_tables(&mut out);
        out
    }

    fn collect_tables<'s>(&'s self, out: &mut Vec<&'s TableRef<'a>>) {
        match self {
            FromClause::Table(table) => out.push(table),
            FromClause::Join(join) => {
                join.left.collect_tables(out);
                join.right.collect_tables(out);
            }
            FromClause::Subquery { .. } => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableRef<'a> {
    pub schema: Option<&'a str>,
    pub name: &'a str,
    pub alias: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinClause<'a> {
    pub left: &'a FromClause<'a>,
    pub join_type: JoinType,
    pub right: &'a FromClause<'a>,
    pub condition: JoinCondition<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// `a, b`
    Comma,
    Inner,
    Left,
    Right,
    Full,
    Cross,
    Natural,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinCondition<'a> {
    On(&'a Expr<'a>),
    Using(&'a [&'a str]),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderByItem<'a> {
    pub expr: &'a Expr<'a>,
    /// `None` when no direction was written.
    pub direction: Option<OrderDirection>,
    pub nulls: NullsOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
    Default,
}

/// Row limiting, kept in the syntax it was written in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitClause<'a> {
    /// `LIMIT count [OFFSET offset]`
    Limit {
        count: &'a Expr<'a>,
        offset: Option<&'a Expr<'a>>,
    },
    /// MySQL `LIMIT offset, count`
    OffsetCount {
        offset: &'a Expr<'a>,
        count: &'a Expr<'a>,
    },
    /// `[OFFSET n ROWS] FETCH FIRST count ROWS ONLY`
    Fetch {
        offset: Option<&'a Expr<'a>>,
        count: &'a Expr<'a>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertStmt<'a> {
    pub ignore: bool,
    pub table: TableRef<'a>,
    /// Empty when no column list was written.
    pub columns: &'a [&'a str],
    pub source: InsertSource<'a>,
    /// MySQL `ON DUPLICATE KEY UPDATE`
    pub on_duplicate: &'a [Assignment<'a>],
    pub on_conflict: Option<&'a OnConflict<'a>>,
    pub returning: Option<&'a [SelectColumn<'a>]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InsertSource<'a> {
    Values(&'a [&'a [&'a Expr<'a>]]),
    Select(&'a SelectStmt<'a>),
    DefaultValues,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnConflict<'a> {
    pub target: OnConflictTarget<'a>,
    pub action: OnConflictAction<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OnConflictTarget<'a> {
    Columns(&'a [&'a str]),
    Constraint(&'a str),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OnConflictAction<'a> {
    DoNothing,
    DoUpdate(&'a [Assignment<'a>]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment<'a> {
    pub column: ColumnRef<'a>,
    pub value: &'a Expr<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateStmt<'a> {
    /// A single table, or a join for MySQL multi-table updates.
    pub target: &'a FromClause<'a>,
    pub assignments: &'a [Assignment<'a>],
    /// PostgreSQL `UPDATE ... FROM`
    pub from: Option<&'a FromClause<'a>>,
    pub where_clause: Option<&'a Expr<'a>>,
    pub order_by: &'a [OrderByItem<'a>],
    pub limit: Option<&'a LimitClause<'a>>,
    pub returning: Option<&'a [SelectColumn<'a>]>,
}

/// Every DELETE shape the parser accepts:
///
/// | Source                                   | targets    | from        | using    |
/// |------------------------------------------|------------|-------------|----------|
/// | `DELETE FROM t WHERE ...`                | `[]`       | `t`         | -        |
/// | `DELETE t WHERE ...` (Oracle family)     | `[]`       | `t`         | -        |
/// | `DELETE t1, t2 FROM t1 JOIN t2 ...`      | `[t1, t2]` | join        | -        |
/// | `DELETE FROM t1, t2 USING t1 JOIN t2 ...`| `[t1, t2]` | -           | join     |
/// | `DELETE FROM t USING u WHERE ...` (PG)   | `[]`       | `t`         | `u`      |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeleteStmt<'a> {
    pub targets: &'a [TableRef<'a>],
    pub from: Option<&'a FromClause<'a>>,
    pub using: Option<&'a FromClause<'a>>,
    pub where_clause: Option<&'a Expr<'a>>,
    pub order_by: &'a [OrderByItem<'a>],
    pub limit: Option<&'a LimitClause<'a>>,
    pub returning: Option<&'a [SelectColumn<'a>]>,
}

impl DeleteStmt<'_> {
    pub fn is_multi_table(&self) -> bool {
        !self.targets.is_empty()
            || matches!(self.from, Some(FromClause::Join(_)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'a> {
    Literal(Literal<'a>),
    Column(ColumnRef<'a>),
    Parameter(ParameterRef<'a>),
    /// `DEFAULT` in a VALUES row or SET clause
    Default,
    BinaryOp {
        left: &'a Expr<'a>,
        op: BinaryOperator,
        right: &'a Expr<'a>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: &'a Expr<'a>,
    },
    Between {
        expr: &'a Expr<'a>,
        negated: bool,
        low: &'a Expr<'a>,
        high: &'a Expr<'a>,
    },
    Like {
        expr: &'a Expr<'a>,
        negated: bool,
        pattern: &'a Expr<'a>,
        escape: Option<&'a Expr<'a>>,
        case_insensitive: bool,
    },
    InList {
        expr: &'a Expr<'a>,
        negated: bool,
        list: &'a [&'a Expr<'a>],
    },
    InSubquery {
        expr: &'a Expr<'a>,
        negated: bool,
        subquery: &'a SelectStmt<'a>,
    },
    IsNull {
        expr: &'a Expr<'a>,
        negated: bool,
    },
    IsBoolean {
        expr: &'a Expr<'a>,
        value: bool,
        negated: bool,
    },
    Function(FunctionCall<'a>),
    Case {
        operand: Option<&'a Expr<'a>>,
        conditions: &'a [WhenClause<'a>],
        else_result: Option<&'a Expr<'a>>,
    },
    Cast {
        expr: &'a Expr<'a>,
        data_type: &'a str,
        style: CastStyle,
    },
    /// `DATE '2024-01-01'`
    TypedString {
        data_type: &'a str,
        value: &'a str,
    },
    Subquery(&'a SelectStmt<'a>),
    Exists {
        subquery: &'a SelectStmt<'a>,
        negated: bool,
    },
    Row(&'a [&'a Expr<'a>]),
}

impl<'a> Expr<'a> {
    /// True when the expression contains no column or subquery reference.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Literal(_) | Expr::Parameter(_) | Expr::Default | Expr::TypedString { .. } => {
                true
            }
            Expr::Column(_) | Expr::Subquery(_) | Expr::Exists { .. } | Expr::InSubquery { .. } => {
                false
            }
            Expr::BinaryOp { left, right, .. } => left.is_constant() && right.is_constant(),
            Expr::UnaryOp { expr, .. }
            | Expr::IsNull { expr, .. }
            | Expr::IsBoolean { expr, .. }
            | Expr::Cast { expr, .. } => expr.is_constant(),
            Expr::Between {
                expr, low, high, ..
            } => expr.is_constant() && low.is_constant() && high.is_constant(),
            Expr::Like {
                expr,
                pattern,
                escape,
                ..
            } => {
                expr.is_constant()
                    && pattern.is_constant()
                    && escape.map_or(true, |e| e.is_constant())
            }
            Expr::InList { expr, list, .. } => {
                expr.is_constant() && list.iter().all(|e| e.is_constant())
            }
            Expr::Function(call) => match call.args {
                FunctionArgs::Args(args) => args.iter().all(|e| e.is_constant()),
                FunctionArgs::None => true,
                FunctionArgs::Star => false,
            },
            Expr::Case {
                operand,
                conditions,
                else_result,
            } => {
                operand.map_or(true, |e| e.is_constant())
                    && conditions
                        .iter()
                        .all(|w| w.condition.is_constant() && w.result.is_constant())
                    && else_result.map_or(true, |e| e.is_constant())
            }
            Expr::Row(items) => items.iter().all(|e| e.is_constant()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastStyle {
    /// `CAST(x AS t)`
    Function,
    /// `x::t`
    DoubleColon,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Null,
    Boolean(bool),
    Integer(&'a str),
    Float(&'a str),
    /// Source text including quotes.
    String(&'a str),
    HexNumber(&'a str),
    BinaryNumber(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnRef<'a> {
    pub schema: Option<&'a str>,
    pub table: Option<&'a str>,
    pub column: &'a str,
}

impl<'a> ColumnRef<'a> {
    pub fn bare(column: &'a str) -> Self {
        Self {
            schema: None,
            table: None,
            column,
        }
    }
}

/// A bind placeholder and the parameter position it reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRef<'a> {
    /// 1-based position in the parameter holder.
    pub position: u32,
    pub style: ParameterStyle<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterStyle<'a> {
    Anonymous,
    Named(&'a str),
    Positional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Power,
    Concat,
    Eq,
    /// `<>`
    NotEq,
    /// `!=`
    BangEq,
    NullSafeEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    BitwiseAnd,
    BitwiseOr,
    LeftShift,
    RightShift,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "^",
            BinaryOperator::Concat => "||",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::BangEq => "!=",
            BinaryOperator::NullSafeEq => "<=>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::LeftShift => "<<",
            BinaryOperator::RightShift => ">>",
        }
    }

    /// Left and right binding power used by the Pratt parser.
    pub fn binding_power(&self) -> (u8, u8) {
        match self {
            BinaryOperator::Or => (2, 3),
            BinaryOperator::And => (4, 5),
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::BangEq
            | BinaryOperator::NullSafeEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq => (6, 7),
            BinaryOperator::Concat
            | BinaryOperator::BitwiseAnd
            | BinaryOperator::BitwiseOr
            | BinaryOperator::LeftShift
            | BinaryOperator::RightShift => (8, 9),
            BinaryOperator::Plus | BinaryOperator::Minus => (10, 11),
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => (12, 13),
            BinaryOperator::Power => (15, 14),
        }
    }

    pub fn is_associative(&self) -> bool {
        matches!(
            self,
            BinaryOperator::And
                | BinaryOperator::Or
                | BinaryOperator::Plus
                | BinaryOperator::Multiply
                | BinaryOperator::Concat
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
    BitwiseNot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionCall<'a> {
    pub schema: Option<&'a str>,
    pub name: &'a str,
    pub args: FunctionArgs<'a>,
    pub distinct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FunctionArgs<'a> {
    None,
    Star,
    Args(&'a [&'a Expr<'a>]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhenClause<'a> {
    pub condition: &'a Expr<'a>,
    pub result: &'a Expr<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    fn table(name: &str) -> TableRef<'_> {
        TableRef {
            schema: None,
            name,
            alias: None,
        }
    }

    #[test]
    fn from_clause_lists_joined_tables_in_order() {
        let arena = Bump::new();
        let left = arena.alloc(FromClause::Table(table("a")));
        let right = arena.alloc(FromClause::Table(table("b")));
        let join = arena.alloc(JoinClause {
            left,
            join_type: JoinType::Inner,
            right,
            condition: JoinCondition::None,
        });
        let from = FromClause::Join(join);

        let names: Vec<_> = from.tables().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn constant_detection() {
        let arena = Bump::new();
        let one = arena.alloc(Expr::Literal(Literal::Integer("1")));
        let col = arena.alloc(Expr::Column(ColumnRef::bare("id")));

        let constant = Expr::BinaryOp {
            left: one,
            op: BinaryOperator::Eq,
            right: one,
        };
        let not_constant = Expr::BinaryOp {
            left: col,
            op: BinaryOperator::Eq,
            right: one,
        };

        assert!(constant.is_constant());
        assert!(!not_constant.is_constant());
    }

    #[test]
    fn shared_locks_are_not_for_update() {
        let for_share = ForClause {
            lock_mode: LockMode::InShareMode,
            of: &[],
            wait_policy: WaitPolicy::Wait,
        };
        let select = SelectStmt {
            distinct: Distinct::All,
            columns: &[],
            from: None,
            where_clause: None,
            group_by: &[],
            having: None,
            order_by: &[],
            limit: None,
            set_op: None,
            for_clause: Some(&for_share),
        };
        assert!(!select.is_for_update());
    }

    #[test]
    fn power_is_right_associative() {
        let (l, r) = BinaryOperator::Power.binding_power();
        assert!(l > r);
        let (l, r) = BinaryOperator::Minus.binding_power();
        assert!(l < r);
    }
}
