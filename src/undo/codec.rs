//! Named encodings of [`BranchUndoLog`].
//!
//! The encoding is chosen by name in [`crate::config::EngineConfig`]; an
//! unknown name fails when the compensator is built. Decoding re-runs every
//! snapshot invariant, so a decoded log is as valid as a freshly captured one.

use std::fmt;

use eyre::Result;

use crate::config::DEFAULT_LOG_SERIALIZATION;
use crate::error::UndoError;
use crate::records::BranchUndoLog;

pub trait UndoLogParser: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(&self, log: &BranchUndoLog) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<BranchUndoLog>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonUndoLogParser;

impl UndoLogParser for JsonUndoLogParser {
    fn name(&self) -> &'static str {
        DEFAULT_LOG_SERIALIZATION
    }

    fn encode(&self, log: &BranchUndoLog) -> Result<Vec<u8>> {
        serde_json::to_vec(log).map_err(|e| {
            eyre::Report::new(UndoError::invalid_log(format!(
                "cannot encode undo log {}: {}",
                log.xid(),
                e
            )))
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<BranchUndoLog> {
        serde_json::from_slice(bytes).map_err(|e| {
            eyre::Report::new(UndoError::invalid_log(format!(
                "cannot decode undo log: {}",
                e
            )))
        })
    }
}

/// Looks up an encoding by its configuration name, case-insensitively.
pub fn parser_by_name(name: &str) -> Result<Box<dyn UndoLogParser>> {
    if name.trim().eq_ignore_ascii_case(DEFAULT_LOG_SERIALIZATION) {
        return Ok(Box::new(JsonUndoLogParser));
    }
    eyre::bail!(UndoError::unsupported(name, "undo log serialization"))
}
