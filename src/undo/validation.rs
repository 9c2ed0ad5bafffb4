//! Dirty check: compares the rows currently in the database with the images
//! captured for an entry before any compensation is applied.
//!
//! Current rows are read back by primary key in chunks of at most
//! `max_in_list_size` keys. Each undo row is then classified:
//!
//! | Entry  | Proceed when current row     | Already restored when current row |
//! |--------|------------------------------|-----------------------------------|
//! | INSERT | equals the after row         | is absent                         |
//! | UPDATE | equals the after row         | equals the before row             |
//! | DELETE | is absent                    | equals the before row             |
//!
//! Anything else is a conflict: another transaction wrote the row after the
//! branch did, and overwriting it would lose that write.

use std::fmt::Write;

use eyre::{Result, WrapErr};
use hashbrown::HashMap;
use tracing::debug;

use super::connection::UndoConnection;
use super::sql_builder::select_by_primary_keys;
use super::UndoExecutor;
use crate::config::EngineConfig;
use crate::records::{Row, TableRecords};
use crate::schema::TableMeta;

/// Outcome of the dirty check for one undo row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Proceed,
    AlreadyRestored,
    Conflict,
}

/// Images the current rows are compared against. `None` stands for "row
/// absent".
#[derive(Debug, Clone, Copy)]
pub struct ExpectedImages<'a> {
    pub current: Option<&'a TableRecords>,
    pub restored: Option<&'a TableRecords>,
}

impl ExpectedImages<'_> {
    /// Classifies undo row `index` given the row found in the database.
    pub fn classify(&self, index: usize, found: Option<&Row>) -> RowState {
        if image_holds(self.current, index, found) {
            RowState::Proceed
        } else if image_holds(self.restored, index, found) {
            RowState::AlreadyRestored
        } else {
            RowState::Conflict
        }
    }
}

fn image_holds(image: Option<&TableRecords>, index: usize, found: Option<&Row>) -> bool {
    match (image.and_then(|img| img.rows().get(index)), found) {
        (Some(expected), Some(found)) => expected.matches(found),
        (None, None) => image.is_none(),
        _ => false,
    }
}

/// Lookup key of a row: canonical values of its key fields in declared order.
pub(crate) fn row_key(row: &Row, meta: &TableMeta) -> Result<String> {
    let keys = row.key_fields(meta)?;
    // each component is length-prefixed
    let mut key = String::new();
    for field in &keys {
        let part = field.value().canonical_key();
        let _ = write!(key, "{}:{}", part.len(), part);
    }
    Ok(key)
}

/// `col=value, ...` rendering of a row's key, for reports.
pub(crate) fn describe_key(row: &Row, meta: &TableMeta) -> String {
    match row.key_fields(meta) {
        Ok(keys) => keys
            .iter()
            .map(|f| format!("{}={}", f.name(), f.value()))
            .collect::<Vec<_>>()
            .join(", "),
        Err(_) => String::from("<no key>"),
    }
}

/// Classifies every undo row of `executor`, one state per row in order.
pub fn check_rows(
    executor: &dyn UndoExecutor,
    conn: &mut dyn UndoConnection,
    config: &EngineConfig,
) -> Result<Vec<RowState>> {
    let rows = executor.undo_rows().rows();
    if !config.data_validation() {
        return Ok(vec![RowState::Proceed; rows.len()]);
    }

    let meta = executor.entry().table_meta();
    let current = fetch_current(executor, conn, config.max_in_list_size())?;
    let images = executor.expected_images();

    let mut states = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let found = current.get(&row_key(row, meta)?);
        states.push(images.classify(index, found));
    }
    Ok(states)
}

/// Current rows keyed by [`row_key`].
fn fetch_current(
    executor: &dyn UndoExecutor,
    conn: &mut dyn UndoConnection,
    chunk_size: usize,
) -> Result<HashMap<String, Row>> {
    let meta = executor.entry().table_meta();
    let dialect = executor.dialect();
    let rows = executor.undo_rows().rows();

    let mut current = HashMap::with_capacity(rows.len());
    for chunk in rows.chunks(chunk_size.max(1)) {
        let sql = select_by_primary_keys(dialect, meta, chunk.len());
        let mut params = Vec::with_capacity(chunk.len() * meta.primary_key_names().len());
        for row in chunk {
            params.extend(row.key_fields(meta)?.iter().map(|f| f.value().clone()));
        }

        debug!(table = meta.table_name(), keys = chunk.len(), %sql, "dirty check query");
        let found = conn
            .query(&sql, &params, meta)
            .wrap_err_with(|| format!("failed to read current rows of {}", meta.table_name()))?;
        for row in found {
            current.insert(row_key(&row, meta)?, row);
        }
    }
    Ok(current)
}
