//! Undo log entries: the before/after images of one statement, and the
//! ordered entries of one branch transaction.

use eyre::Result;
use serde::{Deserialize, Serialize};

use super::table_records::TableRecords;
use crate::error::UndoError;
use crate::schema::{same_identifier, TableMeta};
use crate::sql::SqlType;

/// Before and after images of one INSERT, UPDATE or DELETE.
///
/// Construction validates the capture-time invariants, so an entry that
/// exists is always one an executor can compensate:
///
/// | Kind   | Before image   | After image    | Extra                        |
/// |--------|----------------|----------------|------------------------------|
/// | INSERT | no rows        | inserted rows  | keys populated in after      |
/// | DELETE | deleted rows   | no rows        | keys populated in before     |
/// | UPDATE | n rows         | n rows         | same keys at the same index  |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SqlUndoLogRepr")]
pub struct SqlUndoLog {
    sql_type: SqlType,
    table_name: String,
    before_image: TableRecords,
    after_image: TableRecords,
}

#[derive(Deserialize)]
struct SqlUndoLogRepr {
    sql_type: SqlType,
    table_name: String,
    before_image: TableRecords,
    after_image: TableRecords,
}

impl TryFrom<SqlUndoLogRepr> for SqlUndoLog {
    type Error = UndoError;

    fn try_from(repr: SqlUndoLogRepr) -> Result<Self, Self::Error> {
        if !same_identifier(&repr.table_name, repr.before_image.table_name()) {
            return Err(UndoError::invalid_log(format!(
                "entry names table '{}' but its images belong to '{}'",
                repr.table_name,
                repr.before_image.table_name()
            )));
        }
        validate(repr.sql_type, &repr.before_image, &repr.after_image)?;
        Ok(SqlUndoLog {
            sql_type: repr.sql_type,
            table_name: repr.table_name,
            before_image: repr.before_image,
            after_image: repr.after_image,
        })
    }
}

fn validate(
    sql_type: SqlType,
    before: &TableRecords,
    after: &TableRecords,
) -> Result<(), UndoError> {
    if !same_identifier(before.table_name(), after.table_name()) {
        return Err(UndoError::invalid_log(format!(
            "before image of '{}' paired with after image of '{}'",
            before.table_name(),
            after.table_name()
        )));
    }

    let meta = before.table_meta();
    if !meta.has_primary_key() {
        return Err(UndoError::invalid_log(format!(
            "table '{}' has no primary key",
            meta.table_name()
        )));
    }

    let keys_of = |image: &TableRecords| {
        image
            .check_keys()
            .map_err(|e| UndoError::invalid_log(format!("{:#}", e)))
    };

    match sql_type {
        SqlType::Insert => {
            if !before.is_empty() {
                return Err(UndoError::invalid_log(format!(
                    "INSERT on '{}' has {} before row(s), expected none",
                    meta.table_name(),
                    before.len()
                )));
            }
            keys_of(after)
        }
        SqlType::Delete => {
            if !after.is_empty() {
                return Err(UndoError::invalid_log(format!(
                    "DELETE on '{}' has {} after row(s), expected none",
                    meta.table_name(),
                    after.len()
                )));
            }
            keys_of(before)
        }
        SqlType::Update => {
            if before.len() != after.len() {
                return Err(UndoError::invalid_log(format!(
                    "UPDATE on '{}' has {} before row(s) but {} after row(s)",
                    meta.table_name(),
                    before.len(),
                    after.len()
                )));
            }
            keys_of(before)?;
            keys_of(after)?;
            for (index, (b, a)) in before.rows().iter().zip(after.rows()).enumerate() {
                let before_keys = b
                    .key_fields(meta)
                    .map_err(|e| UndoError::invalid_log(e.to_string()))?;
                let after_keys = a
                    .key_fields(meta)
                    .map_err(|e| UndoError::invalid_log(e.to_string()))?;
                let unchanged = before_keys
                    .iter()
                    .zip(after_keys.iter())
                    .all(|(x, y)| x.value().same_as(y.value()));
                if !unchanged {
                    return Err(UndoError::invalid_log(format!(
                        "UPDATE on '{}' changed the primary key of row {}",
                        meta.table_name(),
                        index
                    )));
                }
            }
            Ok(())
        }
        other => Err(UndoError::invalid_log(format!(
            "{} statements are not compensated",
            other
        ))),
    }
}

impl SqlUndoLog {
    pub fn new(sql_type: SqlType, before_image: TableRecords, after_image: TableRecords) -> Result<Self> {
        validate(sql_type, &before_image, &after_image)?;
        Ok(Self {
            sql_type,
            table_name: before_image.table_name().to_string(),
            before_image,
            after_image,
        })
    }

    pub fn insert(after_image: TableRecords) -> Result<Self> {
        let before = TableRecords::empty(after_image.table_meta().clone());
        Self::new(SqlType::Insert, before, after_image)
    }

    pub fn update(before_image: TableRecords, after_image: TableRecords) -> Result<Self> {
        Self::new(SqlType::Update, before_image, after_image)
    }

    pub fn delete(before_image: TableRecords) -> Result<Self> {
        let after = TableRecords::empty(before_image.table_meta().clone());
        Self::new(SqlType::Delete, before_image, after)
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn table_meta(&self) -> &TableMeta {
        self.before_image.table_meta()
    }

    pub fn before_image(&self) -> &TableRecords {
        &self.before_image
    }

    pub fn after_image(&self) -> &TableRecords {
        &self.after_image
    }

    /// True when the statement left the rows exactly as it found them.
    pub fn is_no_op(&self) -> bool {
        self.before_image.same_rows(&self.after_image)
    }

    /// Re-validates the entry against fresh metadata.
    pub fn with_meta(self, meta: TableMeta) -> Result<Self> {
        Self::new(
            self.sql_type,
            self.before_image.with_meta(meta.clone()),
            self.after_image.with_meta(meta),
        )
    }
}

/// Undo entries of one branch transaction, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchUndoLog {
    xid: String,
    branch_id: u64,
    sql_undo_logs: Vec<SqlUndoLog>,
}

impl BranchUndoLog {
    pub fn new(xid: impl Into<String>, branch_id: u64) -> Self {
        Self {
            xid: xid.into(),
            branch_id,
            sql_undo_logs: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: SqlUndoLog) -> Self {
        self.sql_undo_logs.push(entry);
        self
    }

    pub fn push(&mut self, entry: SqlUndoLog) {
        self.sql_undo_logs.push(entry);
    }

    pub fn xid(&self) -> &str {
        &self.xid
    }

    pub fn branch_id(&self) -> u64 {
        self.branch_id
    }

    pub fn sql_undo_logs(&self) -> &[SqlUndoLog] {
        &self.sql_undo_logs
    }

    /// Entries in the order they must be compensated: last statement first.
    pub fn rollback_order(&self) -> impl Iterator<Item = &SqlUndoLog> {
        self.sql_undo_logs.iter().rev()
    }

    pub fn is_empty(&self) -> bool {
        self.sql_undo_logs.is_empty()
    }
}
