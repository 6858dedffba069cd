//! Mongrate Core - document schema synthesis for relational sources
//!
//! This crate implements the schema synthesis engine:
//! - Catalog snapshot model of the relational source
//! - Transformation graph with reverse / reference / duplicate mutations
//! - Cycle and violation detection over candidate shapes
//! - Depth-first search toward valid forests under a mutation budget
//! - Size propagation and the loss/storage/reference cost model
//! - Schema plans: collections, embedded children, deferred references
//!
//! The engine is synchronous and performs no I/O; the backend crate feeds it
//! a [`DatabaseCatalog`] and executes the [`SchemaPlan`] it picks.

pub mod catalog;
pub mod cost;
pub mod graph;
pub mod propagate;
pub mod schema;
pub mod search;
pub mod synthesize;
pub mod validate;

// Re-exports for convenience
pub use catalog::{
    CatalogError, DatabaseCatalog, ForeignKeyCatalog, TableCatalog, FALLBACK_ROW_SIZE,
};
pub use cost::{
    CostBreakdown, DATA_LOSS_WEIGHT, DATA_STORAGE_WEIGHT, REFERENCE_WEIGHT,
};
pub use graph::{Edge, EdgeId, Graph, Node, NodeId};
pub use schema::{
    build_schema, ChildCardinality, ChildPlan, Collection, RefKind, RefPlan, SchemaPlan,
};
pub use synthesize::{synthesize, RankedSchema};
pub use validate::Violation;
