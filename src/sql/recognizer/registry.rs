//! Recognizer dispatch by dialect and statement shape.

use bumpalo::Bump;
use eyre::Result;
use hashbrown::HashMap;
use tracing::debug;

use super::{
    DeleteRecognizer, InsertRecognizer, MultiDeleteRecognizer, SelectForUpdateRecognizer,
    SqlRecognizer, SqlType, UpdateRecognizer,
};
use crate::error::UndoError;
use crate::sql::ast::Statement;
use crate::sql::dialect::DbType;
use crate::sql::parser::{ParsedStatement, Parser};

/// Builds a recognizer for one parsed statement of a known shape.
pub type RecognizerFactory =
    for<'a> fn(&ParsedStatement<'a>, DbType) -> Result<Box<dyn SqlRecognizer + 'a>>;

/// Immutable after construction; share it behind an `Arc` or a static.
pub struct RecognizerRegistry {
    factories: HashMap<(DbType, SqlType), RecognizerFactory>,
}

impl std::fmt::Debug for RecognizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.factories.keys().collect();
        keys.sort_by_key(|(dialect, kind)| (dialect.name(), kind.as_str()));
        f.debug_struct("RecognizerRegistry")
            .field("shapes", &keys)
            .finish()
    }
}

fn select_for_update<'a>(
    parsed: &ParsedStatement<'a>,
    dialect: DbType,
) -> Result<Box<dyn SqlRecognizer + 'a>> {
    match parsed.statement {
        Statement::Select(select) => Ok(Box::new(SelectForUpdateRecognizer::new(
            parsed.sql, select, dialect,
        )?)),
        other => eyre::bail!("expected SELECT, got {}", other.kind_name()),
    }
}

fn insert<'a>(parsed: &ParsedStatement<'a>, dialect: DbType) -> Result<Box<dyn SqlRecognizer + 'a>> {
    match parsed.statement {
        Statement::Insert(stmt) => Ok(Box::new(InsertRecognizer::new(parsed.sql, stmt, dialect)?)),
        other => eyre::bail!("expected INSERT, got {}", other.kind_name()),
    }
}

fn update<'a>(parsed: &ParsedStatement<'a>, dialect: DbType) -> Result<Box<dyn SqlRecognizer + 'a>> {
    match parsed.statement {
        Statement::Update(stmt) => Ok(Box::new(UpdateRecognizer::new(parsed.sql, stmt, dialect)?)),
        other => eyre::bail!("expected UPDATE, got {}", other.kind_name()),
    }
}

fn delete<'a>(parsed: &ParsedStatement<'a>, dialect: DbType) -> Result<Box<dyn SqlRecognizer + 'a>> {
    match parsed.statement {
        Statement::Delete(stmt) => Ok(Box::new(DeleteRecognizer::new(parsed.sql, stmt, dialect)?)),
        other => eyre::bail!("expected DELETE, got {}", other.kind_name()),
    }
}

fn multi_delete<'a>(
    parsed: &ParsedStatement<'a>,
    dialect: DbType,
) -> Result<Box<dyn SqlRecognizer + 'a>> {
    match parsed.statement {
        Statement::Delete(stmt) => Ok(Box::new(MultiDeleteRecognizer::new(
            parsed.sql, stmt, dialect,
        )?)),
        other => eyre::bail!("expected DELETE, got {}", other.kind_name()),
    }
}

/// Statement shape used as the dispatch key.
pub fn statement_shape(statement: &Statement<'_>) -> SqlType {
    match statement {
        Statement::Select(select) if select.is_for_update() => SqlType::SelectForUpdate,
        Statement::Select(_) => SqlType::Select,
        Statement::Insert(_) => SqlType::Insert,
        Statement::Update(_) => SqlType::Update,
        Statement::Delete(delete) if delete.is_multi_table() => SqlType::MultiDelete,
        Statement::Delete(_) => SqlType::Delete,
    }
}

impl RecognizerRegistry {
    /// A registry with no shapes.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Every built-in shape for every dialect.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for dialect in DbType::ALL {
            registry.register(dialect, SqlType::SelectForUpdate, select_for_update);
            registry.register(dialect, SqlType::Insert, insert);
            registry.register(dialect, SqlType::Update, update);
            registry.register(dialect, SqlType::Delete, delete);
            if dialect.is_mysql_family() {
                registry.register(dialect, SqlType::MultiDelete, multi_delete);
            }
        }
        registry
    }

    pub fn register(&mut self, dialect: DbType, shape: SqlType, factory: RecognizerFactory) {
        self.factories.insert((dialect, shape), factory);
    }

    pub fn supports(&self, dialect: DbType, shape: SqlType) -> bool {
        self.factories.contains_key(&(dialect, shape))
    }

    /// Recognizer for one already-parsed statement.
    pub fn recognizer<'a>(
        &self,
        parsed: &ParsedStatement<'a>,
        dialect: DbType,
    ) -> Result<Box<dyn SqlRecognizer + 'a>> {
        let shape = statement_shape(&parsed.statement);
        let factory = self
            .factories
            .get(&(dialect, shape))
            .ok_or_else(|| eyre::Report::new(UndoError::unsupported(dialect, shape.as_str())))?;
        factory(parsed, dialect)
    }

    /// Parses `sql` and recognizes every statement in it, in order.
    pub fn recognize<'a>(
        &self,
        sql: &'a str,
        dialect: DbType,
        arena: &'a Bump,
    ) -> Result<Vec<Box<dyn SqlRecognizer + 'a>>> {
        let mut parser = Parser::new(sql, dialect, arena);
        let statements = parser.parse_statements()?;

        let recognizers = statements
            .iter()
            .map(|parsed| self.recognizer(parsed, dialect))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            dialect = %dialect,
            statements = recognizers.len(),
            "recognized SQL"
        );
        Ok(recognizers)
    }
}

impl Default for RecognizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
