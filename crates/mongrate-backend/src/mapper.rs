//! Schema plan execution.
//!
//! Phase 1 streams each root table out of the source, materializes embedded
//! children row by row, and inserts the assembled documents. Phase 2 walks
//! the target again and patches in the deferred references. Partial target
//! data is never rolled back; callers wanting atomicity stage to a scratch
//! database.

use std::collections::BTreeMap;

use bson::{Bson, Document};
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::BackendError;
use crate::traits::{SourceDatabase, TargetCollection, TargetDatabase};
use crate::value::{Row, Value};
use mongrate_core::schema::{ChildCardinality, ChildPlan, RefKind, RefPlan, SchemaPlan};

/// Counters reported after a migration run.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Documents inserted per root collection
    pub inserted: BTreeMap<String, u64>,

    /// Documents rewritten during reference patching
    pub patched: u64,
}

/// Executes a schema plan against a source/target pair.
///
/// Both connections are single-owner; the mapper processes one row at a
/// time and suspends only at the database boundaries.
pub struct DataMapper<'a> {
    source: &'a dyn SourceDatabase,
    target: &'a dyn TargetDatabase,
}

impl<'a> DataMapper<'a> {
    pub fn new(source: &'a dyn SourceDatabase, target: &'a dyn TargetDatabase) -> Self {
        Self { source, target }
    }

    /// Run both phases of the plan.
    pub async fn migrate(&self, schema: &SchemaPlan) -> Result<MigrationReport, BackendError> {
        let mut report = MigrationReport::default();

        for collection in &schema.collections {
            let handle = self.target.collection(&collection.table);
            let rows = self.source.scan_table(&collection.table, None).await?;
            debug!(collection = %collection.table, rows = rows.len(), "loading collection");

            let mut count = 0u64;
            for mut row in rows {
                self.populate_children(&mut row, &collection.children, &collection.key)
                    .await?;
                handle.insert_one(codec::row_to_document(&row)).await?;
                count += 1;
            }
            report.inserted.insert(collection.table.clone(), count);
        }

        for reference in &schema.refs {
            report.patched += self.patch_reference(reference).await?;
        }

        info!(
            collections = report.inserted.len(),
            patched = report.patched,
            "migration complete"
        );
        Ok(report)
    }

    /// Materialize a few rows per root collection without touching the
    /// target: a single document keyed by root collection name.
    pub async fn preview(&self, schema: &SchemaPlan, rows: u32) -> Result<Row, BackendError> {
        let mut preview = Row::new();
        for collection in &schema.collections {
            let sampled = self
                .source
                .scan_table(&collection.table, Some(rows))
                .await?;
            let mut materialized = Vec::with_capacity(sampled.len());
            for mut row in sampled {
                self.populate_children(&mut row, &collection.children, &collection.key)
                    .await?;
                materialized.push(Value::Document(row));
            }
            preview.insert(collection.table.clone(), Value::Array(materialized));
        }
        Ok(preview)
    }

    /// Attach every child of `children` to `row`, recursing depth-first.
    fn populate_children<'b>(
        &'b self,
        row: &'b mut Row,
        children: &'b [ChildPlan],
        parent_key: &'b str,
    ) -> BoxFuture<'b, Result<(), BackendError>> {
        Box::pin(async move {
            for child in children {
                let value = match child.cardinality {
                    ChildCardinality::OneToMany => {
                        self.load_one_to_many(row, child, parent_key).await?
                    }
                    ChildCardinality::ManyToOne => self.load_many_to_one(row, child).await?,
                };
                row.insert(child.label.clone(), value);
            }
            Ok(())
        })
    }

    /// All child rows whose FK equals the parent's key, FK column stripped.
    async fn load_one_to_many(
        &self,
        row: &mut Row,
        child: &ChildPlan,
        parent_key: &str,
    ) -> Result<Value, BackendError> {
        let parent_id = row.get(parent_key).cloned().unwrap_or(Value::Null);
        let mut rows = self
            .source
            .rows_by_column(&child.table, &child.fk_column, &parent_id)
            .await?;
        for nested in &mut rows {
            nested.shift_remove(&child.fk_column);
            self.populate_children(nested, &child.children, &child.key)
                .await?;
        }
        Ok(Value::Array(rows.into_iter().map(Value::Document).collect()))
    }

    /// The single row the parent's FK points at; the FK is popped off the
    /// parent. A missing child becomes NULL: the cost model already priced
    /// that loss in.
    async fn load_many_to_one(
        &self,
        row: &mut Row,
        child: &ChildPlan,
    ) -> Result<Value, BackendError> {
        let fk_value = row.shift_remove(&child.fk_column).unwrap_or(Value::Null);
        if fk_value.is_null() {
            return Ok(Value::Null);
        }
        match self
            .source
            .row_by_column(&child.table, &child.key, &fk_value)
            .await?
        {
            Some(mut nested) => {
                self.populate_children(&mut nested, &child.children, &child.key)
                    .await?;
                Ok(Value::Document(nested))
            }
            None => {
                warn!(
                    table = %child.table,
                    fk = %child.fk_column,
                    "child row missing, embedding NULL"
                );
                Ok(Value::Null)
            }
        }
    }

    /// Phase 2 for one reference: rewrite every document of the hosting
    /// root collection, setting the reference field at each document the
    /// parent path resolves to.
    async fn patch_reference(&self, reference: &RefPlan) -> Result<u64, BackendError> {
        let root = reference
            .parent_path
            .first()
            .map(String::as_str)
            .unwrap_or(&reference.child_collection);
        let host = self.target.collection(root);
        let child = self.target.collection(&reference.child_collection);
        let label = reference.field_label();
        let nested_path = &reference.parent_path[1.min(reference.parent_path.len())..];

        // one-to-many pre-builds the FK -> ids index in one child scan
        let index = match reference.kind {
            RefKind::OneToMany => Some(self.build_child_index(reference, child.as_ref()).await?),
            RefKind::ManyToOne => None,
        };

        let mut patched = 0u64;
        for mut document in host.find_all().await? {
            let id = document
                .get("_id")
                .cloned()
                .ok_or_else(|| BackendError::missing_document_id(root))?;

            match reference.kind {
                RefKind::OneToMany => {
                    let index = index.as_ref().expect("index built for one-to-many");
                    walk_parents(&mut document, nested_path, &mut |target| {
                        let key = target.get(&reference.parent_key).cloned().unwrap_or(Bson::Null);
                        let ids = index.get(&lookup_key(&key)).cloned().unwrap_or_default();
                        target.insert(label.clone(), Bson::Array(ids));
                        Ok(())
                    })?;
                }
                RefKind::ManyToOne => {
                    self.resolve_many_to_one(reference, child.as_ref(), &mut document, &label)
                        .await?;
                }
            }

            host.replace_one(&id, document).await?;
            patched += 1;
        }
        Ok(patched)
    }

    async fn build_child_index(
        &self,
        reference: &RefPlan,
        child: &dyn TargetCollection,
    ) -> Result<BTreeMap<String, Vec<Bson>>, BackendError> {
        let mut index: BTreeMap<String, Vec<Bson>> = BTreeMap::new();
        for document in child.find_all().await? {
            let fk = document.get(&reference.fk_column).cloned().unwrap_or(Bson::Null);
            if is_null_like(&fk) {
                continue;
            }
            let id = document
                .get("_id")
                .cloned()
                .ok_or_else(|| BackendError::missing_document_id(&reference.child_collection))?;
            index.entry(lookup_key(&fk)).or_default().push(id);
        }
        Ok(index)
    }

    /// Many-to-one patching: gather the FK values the path resolves to,
    /// look each child up once, then write the ids back.
    async fn resolve_many_to_one(
        &self,
        reference: &RefPlan,
        child: &dyn TargetCollection,
        document: &mut Document,
        label: &str,
    ) -> Result<(), BackendError> {
        let nested_path = &reference.parent_path[1.min(reference.parent_path.len())..];

        let mut foreign_keys: Vec<Bson> = Vec::new();
        walk_parents(document, nested_path, &mut |target| {
            if let Some(fk) = target.get(&reference.fk_column) {
                if !is_null_like(fk) {
                    foreign_keys.push(fk.clone());
                }
            }
            Ok(())
        })?;

        let mut resolved: BTreeMap<String, Bson> = BTreeMap::new();
        for fk in foreign_keys {
            let key = lookup_key(&fk);
            if resolved.contains_key(&key) {
                continue;
            }
            let found = child.find_one(&reference.child_key, &fk).await?;
            let child_doc = found.ok_or_else(|| {
                BackendError::child_not_found(
                    &reference.child_collection,
                    &reference.child_key,
                    fk.to_string(),
                )
            })?;
            let id = child_doc
                .get("_id")
                .cloned()
                .ok_or_else(|| BackendError::missing_document_id(&reference.child_collection))?;
            resolved.insert(key, id);
        }

        walk_parents(document, nested_path, &mut |target| {
            let fk = target.get(&reference.fk_column).cloned().unwrap_or(Bson::Null);
            if is_null_like(&fk) {
                return Ok(());
            }
            if let Some(id) = resolved.get(&lookup_key(&fk)) {
                target.insert(label.to_owned(), id.clone());
            }
            Ok(())
        })
    }
}

/// Apply `apply` to every document the path resolves to, descending through
/// arrays of embedded documents. A missing segment resolves to nothing.
fn walk_parents(
    document: &mut Document,
    path: &[String],
    apply: &mut dyn FnMut(&mut Document) -> Result<(), BackendError>,
) -> Result<(), BackendError> {
    if path.is_empty() {
        return apply(document);
    }
    if let Some(inner) = document.get_mut(&path[0]) {
        walk_value(inner, &path[1..], apply)?;
    }
    Ok(())
}

fn walk_value(
    value: &mut Bson,
    path: &[String],
    apply: &mut dyn FnMut(&mut Document) -> Result<(), BackendError>,
) -> Result<(), BackendError> {
    match value {
        Bson::Array(items) => {
            for item in items {
                walk_value(item, path, apply)?;
            }
            Ok(())
        }
        Bson::Document(inner) => walk_parents(inner, path, apply),
        _ => Ok(()),
    }
}

/// NULL or absent; anything else is a real FK value.
fn is_null_like(value: &Bson) -> bool {
    matches!(value, Bson::Null)
}

/// Canonical lookup key for FK matching across BSON integer widths.
fn lookup_key(value: &Bson) -> String {
    match value {
        Bson::Int32(i) => format!("i{}", i64::from(*i)),
        Bson::Int64(i) => format!("i{i}"),
        Bson::Double(d) => format!("f{d}"),
        Bson::String(s) => format!("s{s}"),
        Bson::ObjectId(id) => format!("o{id}"),
        Bson::Decimal128(d) => format!("d{d}"),
        Bson::DateTime(dt) => format!("t{}", dt.timestamp_millis()),
        Bson::Boolean(b) => format!("b{b}"),
        other => format!("x{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_key_bridges_integer_widths() {
        assert_eq!(lookup_key(&Bson::Int32(7)), lookup_key(&Bson::Int64(7)));
        assert_ne!(lookup_key(&Bson::Int64(7)), lookup_key(&Bson::String("7".into())));
    }

    #[test]
    fn test_walk_parents_descends_arrays() {
        let mut document = bson::doc! {
            "orders": [
                { "items": [ { "sku": 1 }, { "sku": 2 } ] },
                { "items": { "sku": 3 } },
            ]
        };
        let path = vec!["orders".to_string(), "items".to_string()];
        let mut seen = Vec::new();
        walk_parents(&mut document, &path, &mut |doc| {
            seen.push(doc.get_i32("sku").unwrap());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_walk_parents_tolerates_missing_segments() {
        let mut document = bson::doc! { "name": "x" };
        let path = vec!["orders".to_string()];
        walk_parents(&mut document, &path, &mut |_| {
            panic!("path should resolve to nothing")
        })
        .unwrap();
    }
}
