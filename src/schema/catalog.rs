//! # Catalog Module
//!
//! In-memory [`TableMetaProvider`] holding the metadata of known tables.

use std::sync::Arc;

use eyre::{ensure, Result};
use hashbrown::HashMap;

use super::table::TableMeta;
use super::TableMetaProvider;
use crate::sql::dialect::unquote_identifier;

#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, Arc<TableMeta>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, meta: TableMeta) -> Result<()> {
        let key = catalog_key(meta.table_name());
        ensure!(
            !self.tables.contains_key(&key),
            "table '{}' already registered",
            meta.table_name()
        );
        self.tables.insert(key, Arc::new(meta));
        Ok(())
    }

    pub fn with_table(mut self, meta: TableMeta) -> Result<Self> {
        self.register(meta)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl TableMetaProvider for Catalog {
    fn table_meta(&self, table_name: &str) -> Result<Arc<TableMeta>> {
        if let Some(meta) = self.tables.get(&catalog_key(table_name)) {
            return Ok(Arc::clone(meta));
        }

        // schema-qualified names fall back to the bare table name
        if let Some((_, bare)) = table_name.rsplit_once('.') {
            if let Some(meta) = self.tables.get(&catalog_key(bare)) {
                return Ok(Arc::clone(meta));
            }
        }

        eyre::bail!("table '{}' not found in catalog", table_name)
    }
}

fn catalog_key(name: &str) -> String {
    name.split('.')
        .map(|part| unquote_identifier(part).to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(".")
}
