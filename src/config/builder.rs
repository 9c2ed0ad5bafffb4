//! # Engine Configuration Builder
//!
//! `EngineConfigBuilder` configures the compensation engine for one database
//! dialect before it is handed to [`crate::undo::UndoCompensator`].
//!
//! ## Configuration Options
//!
//! | Option            | Default | Description                                   |
//! |-------------------|---------|-----------------------------------------------|
//! | db_type           | none    | Dialect of the resource (required)            |
//! | data_validation   | true    | Run the dirty check before compensating       |
//! | max_in_list_size  | 1000    | Primary keys per dirty-check lookup query     |
//! | log_serialization | "json"  | Name of the undo log encoding                 |
//!
//! ## Usage
//!
//! ```ignore
//! let config = EngineConfig::builder()
//!     .db_type(DbType::MySql)
//!     .max_in_list_size(500)
//!     .build()?;
//! ```
//!
//! `build()` validates the combination and fails with an error naming the
//! offending option, so misconfiguration surfaces at startup rather than
//! during a rollback.

use eyre::{bail, Result};

use crate::config::{
    DEFAULT_DATA_VALIDATION, DEFAULT_LOG_SERIALIZATION, MAX_IN_LIST_SIZE, MIN_IN_LIST_SIZE,
};
use crate::sql::DbType;

/// Validated runtime configuration of the compensation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    db_type: DbType,
    data_validation: bool,
    max_in_list_size: usize,
    log_serialization: String,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Configuration with every default for the given dialect.
    pub fn for_db_type(db_type: DbType) -> Self {
        Self {
            db_type,
            data_validation: DEFAULT_DATA_VALIDATION,
            max_in_list_size: MAX_IN_LIST_SIZE,
            log_serialization: DEFAULT_LOG_SERIALIZATION.to_string(),
        }
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    pub fn data_validation(&self) -> bool {
        self.data_validation
    }

    pub fn max_in_list_size(&self) -> usize {
        self.max_in_list_size
    }

    pub fn log_serialization(&self) -> &str {
        &self.log_serialization
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    db_type: Option<DbType>,
    data_validation: Option<bool>,
    max_in_list_size: Option<usize>,
    log_serialization: Option<String>,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            db_type: None,
            data_validation: None,
            max_in_list_size: None,
            log_serialization: None,
        }
    }

    /// Sets the dialect of the resource being compensated.
    pub fn db_type(mut self, db_type: DbType) -> Self {
        self.db_type = Some(db_type);
        self
    }

    /// Parses the dialect from its configuration name (`mysql`, `oracle`, ...).
    pub fn db_type_name(mut self, name: &str) -> Result<Self> {
        self.db_type = Some(name.parse()?);
        Ok(self)
    }

    /// Enables or disables the dirty check.
    ///
    /// With validation disabled every captured row is compensated even when
    /// another transaction has changed it since.
    pub fn data_validation(mut self, enabled: bool) -> Self {
        self.data_validation = Some(enabled);
        self
    }

    pub fn max_in_list_size(mut self, size: usize) -> Self {
        self.max_in_list_size = Some(size);
        self
    }

    pub fn log_serialization(mut self, name: impl Into<String>) -> Self {
        self.log_serialization = Some(name.into());
        self
    }

    pub fn build(self) -> Result<EngineConfig> {
        let Some(db_type) = self.db_type else {
            bail!("engine configuration requires a db_type");
        };

        let max_in_list_size = self.max_in_list_size.unwrap_or(MAX_IN_LIST_SIZE);
        if max_in_list_size < MIN_IN_LIST_SIZE {
            bail!(
                "max_in_list_size must be at least {}, got {}",
                MIN_IN_LIST_SIZE,
                max_in_list_size
            );
        }

        let log_serialization = self
            .log_serialization
            .unwrap_or_else(|| DEFAULT_LOG_SERIALIZATION.to_string());
        if log_serialization.trim().is_empty() {
            bail!("log_serialization must name an encoding");
        }

        Ok(EngineConfig {
            db_type,
            data_validation: self.data_validation.unwrap_or(DEFAULT_DATA_VALIDATION),
            max_in_list_size,
            log_serialization,
        })
    }
}
