//! # Value and Type System
//!
//! Types shared by snapshots, recognizers and compensating statements.
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | `DataType` | Semantic column type tag carried by each field |
//! | `TypeAffinity` | Comparison class of a tag |
//! | `Value` | Owned column value, serialized into the undo log |

mod data_type;
mod value;

pub use data_type::{DataType, TypeAffinity};
pub use value::Value;
