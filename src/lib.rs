//! # branchundo - Rollback Compensation for Transaction Branches
//!
//! A branch of a distributed transaction commits its local work right away
//! and records, for every statement, the rows as they were before and after.
//! When the global transaction later rolls back, this crate turns those
//! records into the statements that put the rows back.
//!
//! - **Recognition**: parse the DML a branch issues and describe its target
//!   table and predicate, per SQL dialect
//! - **Compensation**: build the inverse statement of each captured entry and
//!   bind it row by row
//! - **Dirty check**: refuse to overwrite rows another transaction has
//!   changed since capture
//!
//! ## Quick Start
//!
//! ```ignore
//! use branchundo::{EngineConfig, DbType, UndoCompensator, UndoExecutorRegistry};
//!
//! let config = EngineConfig::builder().db_type(DbType::MySql).build()?;
//! let compensator = UndoCompensator::new(config, &UndoExecutorRegistry::new())?;
//!
//! let report = compensator.compensate(&mut conn, &branch_undo_log)?;
//! report.into_result()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │   UndoCompensator (reverse entry order)     │
//! ├──────────────────────┬──────────────────────┤
//! │ UndoExecutorRegistry │  Dirty check         │
//! │  holder per dialect  │  (validation)        │
//! ├──────────────────────┴──────────────────────┤
//! │  Insert / Update / Delete undo executors    │
//! ├─────────────────────────────────────────────┤
//! │  Snapshot model: BranchUndoLog, SqlUndoLog, │
//! │  TableRecords, Row, Field                   │
//! ├─────────────────────────────────────────────┤
//! │  SQL: lexer, parser, recognizers, registry  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Dialects
//!
//! | Dialect            | Quote | Unquoted folding | Multi-table DELETE |
//! |--------------------|-------|------------------|--------------------|
//! | `mysql`            | `` ` `` | none           | yes                |
//! | `mariadb`          | `` ` `` | none           | yes                |
//! | `postgresql`       | `"`   | lower            | no                 |
//! | `oracle`           | `"`   | upper            | no                 |
//! | `oceanbase_oracle` | `"`   | upper            | no                 |
//!
//! ## Module Overview
//!
//! - [`config`]: Constants and `EngineConfig`
//! - [`error`]: Typed failure kinds
//! - [`types`]: Captured values and their type tags
//! - [`schema`]: Table metadata and the metadata provider seam
//! - [`records`]: Before/after snapshot model
//! - [`sql`]: Parsing and recognition
//! - [`undo`]: Executors, dirty check and the compensation driver

pub mod config;
pub mod error;
pub mod records;
pub mod schema;
pub mod sql;
pub mod types;
pub mod undo;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{undo_error, UndoError};
pub use records::{BranchUndoLog, Field, KeyType, Row, SqlUndoLog, TableRecords};
pub use schema::{Catalog, ColumnMeta, TableMeta, TableMetaProvider};
pub use sql::{DbType, ParameterGroups, ParametersHolder, RecognizerRegistry, SqlRecognizer, SqlType};
pub use types::{DataType, Value};
pub use undo::{
    CompensationReport, UndoCompensator, UndoConnection, UndoExecutor, UndoExecutorHolder,
    UndoExecutorRegistry,
};
