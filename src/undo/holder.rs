//! Executor construction per dialect, and the registry that resolves a
//! dialect to its holder.

use std::fmt;
use std::sync::Arc;

use eyre::Result;
use hashbrown::HashMap;
use tracing::debug;

use super::{DeleteUndoExecutor, InsertUndoExecutor, UndoExecutor, UpdateUndoExecutor};
use crate::error::UndoError;
use crate::records::SqlUndoLog;
use crate::sql::{DbType, SqlType};

/// Creates the executor for each compensated statement kind of one dialect.
pub trait UndoExecutorHolder: fmt::Debug + Send + Sync {
    fn dialect(&self) -> DbType;

    fn insert_executor<'e>(&self, entry: &'e SqlUndoLog) -> Box<dyn UndoExecutor + 'e>;

    fn update_executor<'e>(&self, entry: &'e SqlUndoLog) -> Box<dyn UndoExecutor + 'e>;

    fn delete_executor<'e>(&self, entry: &'e SqlUndoLog) -> Box<dyn UndoExecutor + 'e>;
}

/// The built-in executors, which differ between dialects only in quoting.
#[derive(Debug, Clone, Copy)]
pub struct DialectExecutorHolder {
    dialect: DbType,
}

impl DialectExecutorHolder {
    pub fn new(dialect: DbType) -> Self {
        Self { dialect }
    }
}

impl UndoExecutorHolder for DialectExecutorHolder {
    fn dialect(&self) -> DbType {
        self.dialect
    }

    fn insert_executor<'e>(&self, entry: &'e SqlUndoLog) -> Box<dyn UndoExecutor + 'e> {
        Box::new(InsertUndoExecutor::new(entry, self.dialect))
    }

    fn update_executor<'e>(&self, entry: &'e SqlUndoLog) -> Box<dyn UndoExecutor + 'e> {
        Box::new(UpdateUndoExecutor::new(entry, self.dialect))
    }

    fn delete_executor<'e>(&self, entry: &'e SqlUndoLog) -> Box<dyn UndoExecutor + 'e> {
        Box::new(DeleteUndoExecutor::new(entry, self.dialect))
    }
}

/// Dispatches on the entry's statement kind.
pub fn executor_for<'e>(
    holder: &dyn UndoExecutorHolder,
    entry: &'e SqlUndoLog,
) -> Result<Box<dyn UndoExecutor + 'e>> {
    match entry.sql_type() {
        SqlType::Insert => Ok(holder.insert_executor(entry)),
        SqlType::Update => Ok(holder.update_executor(entry)),
        SqlType::Delete => Ok(holder.delete_executor(entry)),
        other => eyre::bail!(UndoError::unsupported(holder.dialect(), other.as_str())),
    }
}

/// Dialect to holder map. Immutable once the engine is built.
#[derive(Clone)]
pub struct UndoExecutorRegistry {
    holders: HashMap<DbType, Arc<dyn UndoExecutorHolder>>,
}

impl fmt::Debug for UndoExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dialects: Vec<_> = self.holders.keys().map(DbType::name).collect();
        dialects.sort_unstable();
        f.debug_struct("UndoExecutorRegistry")
            .field("dialects", &dialects)
            .finish()
    }
}

impl UndoExecutorRegistry {
    pub fn empty() -> Self {
        Self {
            holders: HashMap::new(),
        }
    }

    /// A [`DialectExecutorHolder`] for every supported dialect.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for dialect in DbType::ALL {
            registry.register(Arc::new(DialectExecutorHolder::new(dialect)));
        }
        registry
    }

    /// Registers `holder` for its dialect, replacing any previous one.
    pub fn register(&mut self, holder: Arc<dyn UndoExecutorHolder>) {
        let dialect = holder.dialect();
        if self.holders.insert(dialect, holder).is_some() {
            debug!(dialect = %dialect, "replaced undo executor holder");
        }
    }

    pub fn contains(&self, dialect: DbType) -> bool {
        self.holders.contains_key(&dialect)
    }

    pub fn holder(&self, dialect: DbType) -> Result<Arc<dyn UndoExecutorHolder>> {
        self.holders
            .get(&dialect)
            .cloned()
            .ok_or_else(|| eyre::Report::new(UndoError::unsupported(dialect, "undo executor holder")))
    }
}

impl Default for UndoExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
