//! Drives the compensation of a whole branch undo log.

use std::sync::Arc;

use eyre::{Result, WrapErr};
use serde::Serialize;
use tracing::{info, warn};

use super::codec::{parser_by_name, UndoLogParser};
use super::connection::UndoConnection;
use super::holder::{executor_for, UndoExecutorHolder, UndoExecutorRegistry};
use super::validation::{check_rows, describe_key, RowState};
use super::UndoExecutor;
use crate::config::EngineConfig;
use crate::error::UndoError;
use crate::records::{BranchUndoLog, SqlUndoLog};
use crate::schema::TableMetaProvider;
use crate::sql::SqlType;

/// Outcome of compensating one undo log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub table: String,
    pub sql_type: SqlType,
    /// Rows a compensating statement was executed for.
    pub applied: usize,
    /// Rows found already in their pre-statement state.
    pub already_restored: usize,
    /// Keys of rows left untouched because they changed since capture.
    pub conflicts: Vec<String>,
}

impl EntryReport {
    fn new(entry: &SqlUndoLog) -> Self {
        Self {
            table: entry.table_name().to_string(),
            sql_type: entry.sql_type(),
            applied: 0,
            already_restored: 0,
            conflicts: Vec::new(),
        }
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Per-entry outcomes, in the order the entries were compensated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompensationReport {
    pub xid: String,
    pub branch_id: u64,
    pub entries: Vec<EntryReport>,
}

impl CompensationReport {
    pub fn applied(&self) -> usize {
        self.entries.iter().map(|e| e.applied).sum()
    }

    pub fn conflicts(&self) -> usize {
        self.entries.iter().map(|e| e.conflicts.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.conflicts() == 0
    }

    /// Fails with `ConflictDetected` for the first entry that had conflicts.
    pub fn into_result(self) -> Result<Self> {
        if let Some(entry) = self.entries.iter().find(|e| e.has_conflicts()) {
            eyre::bail!(UndoError::ConflictDetected {
                table: entry.table.clone(),
                conflicts: entry.conflicts.len(),
            });
        }
        Ok(self)
    }
}

/// Compensates branch undo logs of one dialect.
#[derive(Debug)]
pub struct UndoCompensator {
    config: EngineConfig,
    holder: Arc<dyn UndoExecutorHolder>,
    parser: Box<dyn UndoLogParser>,
    meta_provider: Option<Arc<dyn TableMetaProvider>>,
}

impl UndoCompensator {
    /// Fails when `registry` has no holder for the configured dialect or the
    /// configured serialization is unknown.
    pub fn new(config: EngineConfig, registry: &UndoExecutorRegistry) -> Result<Self> {
        let holder = registry.holder(config.db_type())?;
        let parser = parser_by_name(config.log_serialization())?;
        Ok(Self {
            config,
            holder,
            parser,
            meta_provider: None,
        })
    }

    /// Re-reads table metadata from `provider` before each entry is
    /// compensated, instead of trusting the metadata captured in the log.
    pub fn with_meta_provider(mut self, provider: Arc<dyn TableMetaProvider>) -> Self {
        self.meta_provider = Some(provider);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn parser(&self) -> &dyn UndoLogParser {
        self.parser.as_ref()
    }

    /// Undoes every entry of `log`, last statement first.
    ///
    /// Conflicting rows are reported, not raised; call
    /// [`CompensationReport::into_result`] to treat them as failure. Any other
    /// error aborts at the entry that raised it, leaving the caller's local
    /// transaction to be rolled back.
    pub fn compensate(
        &self,
        conn: &mut dyn UndoConnection,
        log: &BranchUndoLog,
    ) -> Result<CompensationReport> {
        let mut report = CompensationReport {
            xid: log.xid().to_string(),
            branch_id: log.branch_id(),
            entries: Vec::with_capacity(log.sql_undo_logs().len()),
        };

        for entry in log.rollback_order() {
            let entry_report = self.compensate_entry(conn, entry).wrap_err_with(|| {
                format!(
                    "failed to compensate {} on {} for branch {}",
                    entry.sql_type(),
                    entry.table_name(),
                    log.branch_id()
                )
            })?;
            report.entries.push(entry_report);
        }

        info!(
            xid = %report.xid,
            branch_id = report.branch_id,
            applied = report.applied(),
            conflicts = report.conflicts(),
            "branch compensation finished"
        );
        Ok(report)
    }

    /// Decodes `bytes` with the configured serialization and compensates it.
    pub fn compensate_bytes(
        &self,
        conn: &mut dyn UndoConnection,
        bytes: &[u8],
    ) -> Result<CompensationReport> {
        let log = self.parser.decode(bytes)?;
        self.compensate(conn, &log)
    }

    pub fn compensate_entry(
        &self,
        conn: &mut dyn UndoConnection,
        entry: &SqlUndoLog,
    ) -> Result<EntryReport> {
        let refreshed;
        let entry = match &self.meta_provider {
            Some(provider) => {
                let meta = provider.table_meta(entry.table_name())?;
                refreshed = entry.clone().with_meta(meta.as_ref().clone())?;
                &refreshed
            }
            None => entry,
        };

        let mut report = EntryReport::new(entry);
        if entry.is_no_op() {
            info!(table = entry.table_name(), sql_type = %entry.sql_type(), "entry changed nothing, skipped");
            return Ok(report);
        }

        let executor = executor_for(self.holder.as_ref(), entry)?;
        let states = check_rows(executor.as_ref(), conn, &self.config)?;
        let sql = executor.build_undo_sql()?;
        let meta = entry.table_meta();

        for (index, state) in states.into_iter().enumerate() {
            match state {
                RowState::Proceed => {
                    apply_row(executor.as_ref(), conn, &sql, index)?;
                    report.applied += 1;
                }
                RowState::AlreadyRestored => report.already_restored += 1,
                RowState::Conflict => {
                    let key = describe_key(&executor.undo_rows().rows()[index], meta);
                    warn!(table = entry.table_name(), key = %key, "row changed since capture, not compensated");
                    report.conflicts.push(key);
                }
            }
        }

        info!(
            table = entry.table_name(),
            sql_type = %entry.sql_type(),
            applied = report.applied,
            already_restored = report.already_restored,
            conflicts = report.conflicts.len(),
            "entry compensated"
        );
        Ok(report)
    }
}

fn apply_row(
    executor: &dyn UndoExecutor,
    conn: &mut dyn UndoConnection,
    sql: &str,
    index: usize,
) -> Result<()> {
    let bound = executor.bind_row(sql, index)?;
    if bound.placeholder_count() != bound.params.len() {
        eyre::bail!(UndoError::binding(format!(
            "statement has {} placeholder(s) but {} value(s) were bound: {}",
            bound.placeholder_count(),
            bound.params.len(),
            bound.sql
        )));
    }
    conn.execute(&bound)?;
    Ok(())
}
