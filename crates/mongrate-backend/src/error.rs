//! Backend error types.

use thiserror::Error;

/// Errors that can occur while reading the source, writing the target, or
/// executing a schema plan.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Relational source error (catalog queries included; always fatal)
    #[error("source database error: {0}")]
    Source(#[from] mysql_async::Error),

    /// Document target error
    #[error("target database error: {0}")]
    Target(#[from] mongodb::error::Error),

    /// Catalog snapshot could not be turned into a graph
    #[error("catalog error: {0}")]
    Catalog(#[from] mongrate_core::CatalogError),

    /// A table without a primary key cannot be mapped
    #[error("table '{table}' has no primary key")]
    MissingPrimaryKey { table: String },

    /// A target document lacks the `_id` needed for reference patching
    #[error("document in collection '{collection}' has no _id")]
    MissingDocumentId { collection: String },

    /// Reference patching found no child document for a foreign-key value
    #[error(
        "no document in collection '{collection}' with {key} = {value}; \
         reference patch aborted"
    )]
    ChildNotFound {
        collection: String,
        key: String,
        value: String,
    },

    /// Preview serialization error
    #[error("preview serialization failed: {0}")]
    Preview(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a MissingPrimaryKey error.
    pub fn missing_primary_key(table: impl Into<String>) -> Self {
        Self::MissingPrimaryKey {
            table: table.into(),
        }
    }

    /// Create a MissingDocumentId error.
    pub fn missing_document_id(collection: impl Into<String>) -> Self {
        Self::MissingDocumentId {
            collection: collection.into(),
        }
    }

    /// Create a ChildNotFound error.
    pub fn child_not_found(
        collection: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::ChildNotFound {
            collection: collection.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackendError::missing_primary_key("audit_log");
        assert!(err.to_string().contains("audit_log"));
        assert!(err.to_string().contains("no primary key"));

        let err = BackendError::child_not_found("country", "id", "42");
        assert!(err.to_string().contains("country"));
        assert!(err.to_string().contains("42"));
    }
}
