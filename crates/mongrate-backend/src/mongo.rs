//! MongoDB target adapter.

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::TryStreamExt;
use mongodb::{Client, Database};

use crate::error::BackendError;
use crate::traits::{TargetCollection, TargetDatabase};

/// Handle on one target database.
pub struct MongoTarget {
    database: Database,
}

impl MongoTarget {
    /// Connect to `mongodb://host:port` and select a database.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, BackendError> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self {
            database: client.database(database),
        })
    }

    /// Wrap an existing database handle.
    pub fn from_database(database: Database) -> Self {
        Self { database }
    }

    /// The target database name.
    pub fn name(&self) -> &str {
        self.database.name()
    }
}

impl TargetDatabase for MongoTarget {
    fn collection(&self, name: &str) -> Box<dyn TargetCollection> {
        Box::new(MongoCollection {
            inner: self.database.collection(name),
        })
    }
}

/// One target collection backed by the driver.
pub struct MongoCollection {
    inner: mongodb::Collection<Document>,
}

#[async_trait]
impl TargetCollection for MongoCollection {
    async fn insert_one(&self, doc: Document) -> Result<Bson, BackendError> {
        let result = self.inner.insert_one(doc).await?;
        Ok(result.inserted_id)
    }

    async fn find_all(&self) -> Result<Vec<Document>, BackendError> {
        let mut cursor = self.inner.find(Document::new()).await?;
        let mut documents = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            documents.push(document);
        }
        Ok(documents)
    }

    async fn find_one(
        &self,
        field: &str,
        value: &Bson,
    ) -> Result<Option<Document>, BackendError> {
        let mut filter = Document::new();
        filter.insert(field, value.clone());
        Ok(self.inner.find_one(filter).await?)
    }

    async fn replace_one(&self, id: &Bson, doc: Document) -> Result<(), BackendError> {
        let mut filter = Document::new();
        filter.insert("_id", id.clone());
        self.inner.replace_one(filter, doc).await?;
        Ok(())
    }
}
