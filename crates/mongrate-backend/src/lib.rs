//! Mongrate Backend - database adapters and the data mapper
//!
//! This crate owns everything that touches a live database:
//! - [`SourceDatabase`] / [`TargetDatabase`] traits the mapper runs against
//! - MySQL catalog introspection and row queries ([`MySqlSource`])
//! - MongoDB collections ([`MongoTarget`])
//! - The two-phase [`DataMapper`]: embedded load, then reference patching
//! - Codec transforms applied at persistence time
//! - Preview materialization and rendering
//!
//! The synthesis engine itself lives in `mongrate-core` and never performs
//! I/O; this crate feeds it a catalog snapshot and executes the plan the
//! host selects.

mod codec;
mod error;
mod mapper;
mod mongo;
mod mysql;
mod preview;
mod traits;
mod value;

pub use codec::{row_to_document, value_to_bson};
pub use error::BackendError;
pub use mapper::{DataMapper, MigrationReport};
pub use mongo::{MongoCollection, MongoTarget};
pub use mysql::MySqlSource;
pub use preview::render_preview;
pub use traits::{SourceDatabase, TargetCollection, TargetDatabase};
pub use value::{Row, Value};

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;
