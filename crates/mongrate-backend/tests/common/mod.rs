//! In-memory source and target fakes for mapper tests.
//!
//! The mapper only sees the database traits, so these stand in for live
//! MySQL/MongoDB pairs: deterministic, synchronous under the hood, and
//! inspectable after the run.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bson::{Bson, Document};
use mongrate_backend::{
    BackendError, Row, SourceDatabase, TargetCollection, TargetDatabase, Value,
};
use mongrate_core::DatabaseCatalog;

/// Fixed tables served from memory.
#[derive(Default)]
pub struct MemorySource {
    tables: BTreeMap<String, Vec<Row>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, rows: Vec<Row>) -> Self {
        self.tables.insert(name.to_owned(), rows);
        self
    }
}

#[async_trait]
impl SourceDatabase for MemorySource {
    async fn read_catalog(&self) -> Result<DatabaseCatalog, BackendError> {
        let mut catalog = DatabaseCatalog::new("memory");
        for (name, rows) in &self.tables {
            catalog = catalog.with_table(mongrate_core::TableCatalog::new(
                name,
                "id",
                rows.len() as u64,
            ));
        }
        Ok(catalog)
    }

    async fn scan_table(
        &self,
        table: &str,
        sample: Option<u32>,
    ) -> Result<Vec<Row>, BackendError> {
        let rows = self.tables.get(table).cloned().unwrap_or_default();
        // deterministic "sample": the first n rows
        Ok(match sample {
            Some(count) => rows.into_iter().take(count as usize).collect(),
            None => rows,
        })
    }

    async fn rows_by_column(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Vec<Row>, BackendError> {
        Ok(self
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.get(column) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn row_by_column(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Option<Row>, BackendError> {
        Ok(self
            .rows_by_column(table, column, value)
            .await?
            .into_iter()
            .next())
    }
}

type Store = Arc<Mutex<BTreeMap<String, Vec<Document>>>>;

/// Collections held in a shared map, `_id`s assigned from a counter.
#[derive(Default)]
pub struct MemoryTarget {
    store: Store,
    next_id: Arc<AtomicI64>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents currently in a collection.
    pub fn documents(&self, name: &str) -> Vec<Document> {
        self.store
            .lock()
            .expect("store lock")
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

impl TargetDatabase for MemoryTarget {
    fn collection(&self, name: &str) -> Box<dyn TargetCollection> {
        Box::new(MemoryCollection {
            name: name.to_owned(),
            store: Arc::clone(&self.store),
            next_id: Arc::clone(&self.next_id),
        })
    }
}

pub struct MemoryCollection {
    name: String,
    store: Store,
    next_id: Arc<AtomicI64>,
}

#[async_trait]
impl TargetCollection for MemoryCollection {
    async fn insert_one(&self, mut doc: Document) -> Result<Bson, BackendError> {
        let id = match doc.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Bson::Int64(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
                doc.insert("_id", id.clone());
                id
            }
        };
        self.store
            .lock()
            .expect("store lock")
            .entry(self.name.clone())
            .or_default()
            .push(doc);
        Ok(id)
    }

    async fn find_all(&self) -> Result<Vec<Document>, BackendError> {
        Ok(self
            .store
            .lock()
            .expect("store lock")
            .get(&self.name)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        field: &str,
        value: &Bson,
    ) -> Result<Option<Document>, BackendError> {
        Ok(self
            .find_all()
            .await?
            .into_iter()
            .find(|doc| doc.get(field) == Some(value)))
    }

    async fn replace_one(&self, id: &Bson, doc: Document) -> Result<(), BackendError> {
        let mut store = self.store.lock().expect("store lock");
        if let Some(documents) = store.get_mut(&self.name) {
            for slot in documents.iter_mut() {
                if slot.get("_id") == Some(id) {
                    *slot = doc;
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Build a row from column/value pairs.
pub fn row(columns: &[(&str, Value)]) -> Row {
    columns
        .iter()
        .map(|(name, value)| ((*name).to_owned(), value.clone()))
        .collect()
}
