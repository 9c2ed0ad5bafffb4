//! # Engine Configuration
//!
//! Centralizes the constants used across the crate and the runtime
//! configuration handed to [`crate::undo::UndoCompensator`].
//!
//! ## Module Organization
//!
//! - [`constants`]: Numeric and textual constants with dependency notes
//! - [`builder`]: `EngineConfig` and its fluent `EngineConfigBuilder`

pub mod builder;
pub mod constants;

pub use builder::{EngineConfig, EngineConfigBuilder};
pub use constants::*;
