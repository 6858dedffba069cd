//! Catalog snapshot of the relational source.
//!
//! The catalog reader (in the backend crate) introspects the source database
//! and produces a [`DatabaseCatalog`]; the synthesis engine consumes it to
//! build the initial transformation graph. Keeping the snapshot as plain data
//! keeps the engine free of I/O.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bytes per row assumed when the catalog reports no data length, or the
/// table is empty.
pub const FALLBACK_ROW_SIZE: f64 = 32.0;

/// Errors raised while turning a catalog snapshot into a graph.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A foreign key points at a table the catalog does not contain
    #[error("foreign key '{table}.{column}' references unknown table '{referenced}'")]
    UnknownReferencedTable {
        table: String,
        column: String,
        referenced: String,
    },

    /// The same table name appears twice in the snapshot
    #[error("duplicate table '{0}' in catalog")]
    DuplicateTable(String),
}

/// A snapshot of one relational schema: base tables only, views excluded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseCatalog {
    /// Schema (database) name; the target database takes the same name
    pub database: String,

    /// Base tables in catalog order
    pub tables: Vec<TableCatalog>,
}

impl DatabaseCatalog {
    /// Create an empty snapshot for the named schema.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tables: Vec::new(),
        }
    }

    /// Add a table to the snapshot.
    pub fn with_table(mut self, table: TableCatalog) -> Self {
        self.tables.push(table);
        self
    }
}

/// One base table: identity, size statistics, and its foreign-key columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCatalog {
    /// Table name
    pub name: String,

    /// Primary-key column name
    pub primary_key: String,

    /// DATA_LENGTH as reported by the catalog, when available
    pub data_length: Option<u64>,

    /// Row count at introspection time
    pub row_count: u64,

    /// Foreign-key columns declared on this table
    pub foreign_keys: Vec<ForeignKeyCatalog>,
}

impl TableCatalog {
    /// Create a table entry with no size information and no foreign keys.
    pub fn new(
        name: impl Into<String>,
        primary_key: impl Into<String>,
        row_count: u64,
    ) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            data_length: None,
            row_count,
            foreign_keys: Vec::new(),
        }
    }

    /// Set the reported data length.
    pub fn with_data_length(mut self, data_length: u64) -> Self {
        self.data_length = Some(data_length);
        self
    }

    /// Add a foreign-key column.
    pub fn with_foreign_key(mut self, fk: ForeignKeyCatalog) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Estimated bytes per row: data_length / row_count, falling back to
    /// [`FALLBACK_ROW_SIZE`] when the length is unavailable or the table is
    /// empty.
    pub fn row_size(&self) -> f64 {
        match self.data_length {
            Some(len) if self.row_count > 0 => len as f64 / self.row_count as f64,
            _ => FALLBACK_ROW_SIZE,
        }
    }
}

/// One foreign-key column and its value statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyCatalog {
    /// FK column name on the owning table
    pub column: String,

    /// Referenced table name
    pub referenced_table: String,

    /// Count of distinct non-NULL values in the column
    pub distinct_count: u64,

    /// Count of rows with NULL in the column
    pub null_count: u64,
}

impl ForeignKeyCatalog {
    /// Create a foreign-key entry.
    pub fn new(
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        distinct_count: u64,
        null_count: u64,
    ) -> Self {
        Self {
            column: column.into(),
            referenced_table: referenced_table.into(),
            distinct_count,
            null_count,
        }
    }
}
