//! Ordered set of captured fields, unique by column name.

use eyre::Result;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::field::{Field, KeyType};
use crate::error::UndoError;
use crate::schema::TableMeta;

/// Primary-key fields of one row, in declared key order.
pub type KeyFields<'r> = SmallVec<[&'r Field; 2]>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RowRepr")]
pub struct Row {
    fields: Vec<Field>,
}

#[derive(Deserialize)]
struct RowRepr {
    fields: Vec<Field>,
}

impl TryFrom<RowRepr> for Row {
    type Error = UndoError;

    fn try_from(repr: RowRepr) -> Result<Self, Self::Error> {
        check_unique_names(&repr.fields)?;
        Ok(Row {
            fields: repr.fields,
        })
    }
}

fn check_unique_names(fields: &[Field]) -> Result<(), UndoError> {
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].iter().any(|f| f.has_name(field.name())) {
            return Err(UndoError::invalid_log(format!(
                "duplicate column '{}' in row",
                field.name()
            )));
        }
    }
    Ok(())
}

impl Row {
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        check_unique_names(&fields)?;
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.has_name(name))
    }

    /// Fields flagged as primary key, in row order.
    pub fn primary_keys(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_primary_key())
    }

    pub fn non_primary_keys(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_primary_key())
    }

    /// Primary-key fields in the order `meta` declares the key.
    ///
    /// Fails when a key column is missing from the row or holds NULL.
    pub fn key_fields<'r>(&'r self, meta: &TableMeta) -> Result<KeyFields<'r>> {
        let mut keys = KeyFields::new();
        for pk in meta.primary_key_names() {
            match self.get(pk) {
                Some(field) if !field.value().is_null() => keys.push(field),
                Some(_) => eyre::bail!(UndoError::invalid_log(format!(
                    "primary key column '{}' of {} is NULL",
                    pk,
                    meta.table_name()
                ))),
                None => eyre::bail!(UndoError::invalid_log(format!(
                    "row of {} lacks primary key column '{}'",
                    meta.table_name(),
                    pk
                ))),
            }
        }
        Ok(keys)
    }

    /// True when every field of `self` is present in `other` with an equal
    /// value. Extra columns in `other` are ignored.
    pub fn matches(&self, other: &Row) -> bool {
        self.fields
            .iter()
            .all(|f| other.get(f.name()).is_some_and(|o| f.value().same_as(o.value())))
    }

    /// Marks fields named in the table's primary key.
    pub(crate) fn mark_keys(&mut self, meta: &TableMeta) {
        for field in &mut self.fields {
            let key_type = if meta.is_primary_key(field.name()) {
                KeyType::PrimaryKey
            } else {
                KeyType::Null
            };
            field.set_key_type(key_type);
        }
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }
}
