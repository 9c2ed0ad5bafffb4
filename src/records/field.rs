//! Single captured column value with its name, type tag and key role.

use serde::{Deserialize, Serialize};

use crate::schema::same_identifier;
use crate::types::{DataType, Value};

/// Role of a column within its table's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    #[default]
    Null,
    PrimaryKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    #[serde(default)]
    key_type: KeyType,
    data_type: DataType,
    value: Value,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            key_type: KeyType::Null,
            data_type,
            value: value.into(),
        }
    }

    pub fn primary_key(
        name: impl Into<String>,
        data_type: DataType,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(name, data_type, value).with_key_type(KeyType::PrimaryKey)
    }

    pub fn with_key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    pub(crate) fn set_key_type(&mut self, key_type: KeyType) {
        self.key_type = key_type;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.key_type == KeyType::PrimaryKey
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn has_name(&self, name: &str) -> bool {
        same_identifier(&self.name, name)
    }

    /// Same column and an equal value, ignoring type tag and key role.
    pub fn same_as(&self, other: &Field) -> bool {
        self.has_name(&other.name) && self.value.same_as(&other.value)
    }
}
