//! Entity store contract
//!
//! The persistence backend is a shared, remote, multi-writer record store
//! addressed by collection name. It is eventually consistent and offers no
//! transactions spanning multiple records, so callers must order their writes
//! accordingly.
//!
//! Records cross this boundary as loosely-shaped `serde_json::Value`s; typed
//! deserialization into the schemas in [`crate::types`] happens on the caller
//! side and is where required-field validation lives.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Conjunction of field-equality terms.
///
/// This is the only query shape the remote store's filter endpoint supports,
/// which keeps both implementations trivially equivalent.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    terms: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.terms.push((field.to_string(), value.into()));
        self
    }

    pub fn terms(&self) -> &[(String, Value)] {
        &self.terms
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.terms
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }
}

/// Generic record persistence, addressed by collection name.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Create a record. The store assigns the `id` field and returns the
    /// stored record.
    async fn create(&self, collection: &str, record: Value) -> StoreResult<Value>;

    /// Fetch a record by id, or `None` if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    /// Apply a partial update (top-level field merge) and return the updated
    /// record. Fails with [`StoreError::NotFound`] for missing records.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> StoreResult<Value>;

    /// List records matching all filter terms, in stable creation order.
    async fn filter(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>>;

    /// Permanently remove a record.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
}

/// In-memory entity store.
///
/// Used by the billing test suite; behaves like the remote store (id
/// assignment, top-level patch merge, creation-order filtering) minus the
/// network.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record with a caller-chosen id. Test convenience.
    pub async fn seed(&self, collection: &str, record: Value) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(record);
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create(&self, collection: &str, mut record: Value) -> StoreResult<Value> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        match record.as_object_mut() {
            Some(map) => {
                map.insert("id".to_string(), Value::String(id));
            }
            None => {
                return Err(StoreError::Malformed(
                    "record must be a JSON object".to_string(),
                ))
            }
        }
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| record_id(r) == Some(id)))
            .cloned())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> StoreResult<Value> {
        let mut collections = self.collections.write().await;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
        let record = records
            .iter_mut()
            .find(|r| record_id(r) == Some(id))
            .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;

        let (Some(target), Some(fields)) = (record.as_object_mut(), patch.as_object()) else {
            return Err(StoreError::Malformed(
                "record and patch must be JSON objects".to_string(),
            ));
        };
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
        Ok(record.clone())
    }

    async fn filter(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        if records.len() == before {
            return Err(StoreError::NotFound(format!("{collection}/{id}")));
        }
        Ok(())
    }
}
