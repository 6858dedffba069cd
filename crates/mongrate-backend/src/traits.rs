//! Source and target database traits.
//!
//! The data mapper runs against these interfaces only, so the concrete
//! drivers stay swappable and the mapper tests run on in-memory fakes. All
//! operations are async; they are the engine's only suspension points.

use async_trait::async_trait;
use bson::{Bson, Document};

use crate::error::BackendError;
use crate::value::{Row, Value};
use mongrate_core::DatabaseCatalog;

/// A relational source: catalog introspection plus row queries.
#[async_trait]
pub trait SourceDatabase: Send + Sync {
    /// Introspect the catalog: base tables (views excluded), primary keys,
    /// size statistics, and foreign-key columns with distinct/NULL counts.
    ///
    /// Any failure here is fatal to the migration; the synthesis engine
    /// receives nothing to work with.
    async fn read_catalog(&self) -> Result<DatabaseCatalog, BackendError>;

    /// `SELECT * FROM <table>`, or a random sample of `n` rows when
    /// `sample` is set (preview mode).
    async fn scan_table(
        &self,
        table: &str,
        sample: Option<u32>,
    ) -> Result<Vec<Row>, BackendError>;

    /// All rows with `column = value`.
    async fn rows_by_column(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Vec<Row>, BackendError>;

    /// The first row with `column = value`, if any.
    async fn row_by_column(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Option<Row>, BackendError>;
}

/// A document target: named collections.
pub trait TargetDatabase: Send + Sync {
    /// Handle on a collection, created lazily by name.
    fn collection(&self, name: &str) -> Box<dyn TargetCollection>;
}

/// One target collection.
///
/// `insert_one` returns the engine-assigned `_id`, which reference patching
/// later relies on; implementations must preserve it on scans.
#[async_trait]
pub trait TargetCollection: Send + Sync {
    /// Insert a document and return its `_id`.
    async fn insert_one(&self, doc: Document) -> Result<Bson, BackendError>;

    /// Full scan in the target's natural order.
    async fn find_all(&self) -> Result<Vec<Document>, BackendError>;

    /// First document with `field = value`, if any.
    async fn find_one(
        &self,
        field: &str,
        value: &Bson,
    ) -> Result<Option<Document>, BackendError>;

    /// Replace the document whose `_id` equals `id`.
    async fn replace_one(&self, id: &Bson, doc: Document) -> Result<(), BackendError>;
}
