use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use billbook_core::storage::set_field;
use billbook_core::{Collection, Document, DocumentStore, FieldFilter};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Process-local document store. Each collection keeps insertion order.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, collection: Collection) -> usize {
        let collections = self.collections.read().await;
        collections.get(&collection).map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, collection: Collection, data: Value) -> anyhow::Result<Document> {
        if !data.is_object() {
            return Err(anyhow!(
                "documents in {} must be JSON objects",
                collection.name()
            ));
        }

        let document = Document {
            id: Uuid::new_v4().to_string(),
            data,
        };

        let mut collections = self.collections.write().await;
        collections
            .entry(collection)
            .or_default()
            .push(document.clone());
        debug!(collection = collection.name(), id = %document.id, "document inserted");

        Ok(document)
    }

    async fn get(&self, collection: Collection, id: &str) -> anyhow::Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|documents| documents.iter().find(|document| document.id == id))
            .cloned())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        changes: Vec<(String, Value)>,
    ) -> anyhow::Result<Document> {
        let mut collections = self.collections.write().await;
        let document = collections
            .get_mut(&collection)
            .and_then(|documents| documents.iter_mut().find(|document| document.id == id))
            .ok_or_else(|| anyhow!("no document {} in {}", id, collection.name()))?;

        for (path, value) in changes {
            set_field(&mut document.data, &path, value);
        }
        debug!(collection = collection.name(), id, "document updated");

        Ok(document.clone())
    }

    async fn delete(&self, collection: Collection, id: &str) -> anyhow::Result<bool> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(&collection) else {
            return Ok(false);
        };

        let before = documents.len();
        documents.retain(|document| document.id != id);
        Ok(documents.len() != before)
    }

    async fn query(
        &self,
        collection: Collection,
        filters: &[FieldFilter],
    ) -> anyhow::Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| filters.iter().all(|filter| filter.matches(&document.data)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
