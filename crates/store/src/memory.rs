//! In-memory attribute store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use keepsake_core::attribute::{AttributeDefinition, AttributeValue};
use keepsake_core::error::StoreError;
use keepsake_core::store::AttributeStore;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    definitions: Vec<AttributeDefinition>,
    values: Vec<AttributeValue>,
    next_definition_id: i64,
    next_sequence_id: i64,
}

/// An in-memory store backed by plain Vecs.
/// Useful for testing and sessions where persistence isn't needed.
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttributeStore for MemoryStore {
    async fn insert_definition(
        &self,
        definition: &AttributeDefinition,
    ) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_definition_id += 1;
        let id = inner.next_definition_id;
        let mut stored = definition.clone();
        stored.id = id;
        inner.definitions.push(stored);
        Ok(id)
    }

    async fn get_definition(&self, id: i64) -> Result<Option<AttributeDefinition>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.definitions.iter().find(|d| d.id == id).cloned())
    }

    async fn list_definitions(&self) -> Result<Vec<AttributeDefinition>, StoreError> {
        let inner = self.inner.read().await;
        let mut all = inner.definitions.clone();
        all.sort_by_key(|d| d.id);
        Ok(all)
    }

    async fn update_definition(
        &self,
        definition: &AttributeDefinition,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.definitions.iter_mut().find(|d| d.id == definition.id) {
            Some(existing) => {
                *existing = definition.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_definition(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let len_before = inner.definitions.len();
        inner.definitions.retain(|d| d.id != id);
        let removed = inner.definitions.len() < len_before;
        if removed {
            // Values never outlive their definition
            inner.values.retain(|v| v.definition_id != id);
        }
        Ok(removed)
    }

    async fn insert_value(&self, definition_id: i64, content: &str) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.definitions.iter().any(|d| d.id == definition_id) {
            return Err(StoreError::NotFound(format!(
                "attribute definition {definition_id}"
            )));
        }
        inner.next_sequence_id += 1;
        let sequence_id = inner.next_sequence_id;
        let now = Utc::now();
        inner.values.push(AttributeValue {
            sequence_id,
            definition_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        });
        Ok(sequence_id)
    }

    async fn latest_value(
        &self,
        definition_id: i64,
    ) -> Result<Option<AttributeValue>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .values
            .iter()
            .filter(|v| v.definition_id == definition_id)
            .max_by_key(|v| v.sequence_id)
            .cloned())
    }

    async fn values_for_definition(
        &self,
        definition_id: i64,
    ) -> Result<Vec<AttributeValue>, StoreError> {
        let inner = self.inner.read().await;
        let mut values: Vec<AttributeValue> = inner
            .values
            .iter()
            .filter(|v| v.definition_id == definition_id)
            .cloned()
            .collect();
        values.sort_by_key(|v| std::cmp::Reverse(v.sequence_id));
        Ok(values)
    }

    async fn list_values(&self) -> Result<Vec<AttributeValue>, StoreError> {
        let inner = self.inner.read().await;
        let mut values = inner.values.clone();
        values.sort_by_key(|v| std::cmp::Reverse(v.sequence_id));
        Ok(values)
    }

    async fn update_value(&self, sequence_id: i64, content: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.values.iter_mut().find(|v| v.sequence_id == sequence_id) {
            Some(value) => {
                value.content = content.to_string();
                value.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_value(&self, sequence_id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let len_before = inner.values.len();
        inner.values.retain(|v| v.sequence_id != sequence_id);
        Ok(inner.values.len() < len_before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(name: &str) -> AttributeDefinition {
        AttributeDefinition::new(name, "Extract.", "Relevant?").unwrap()
    }

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let store = MemoryStore::new();
        let first = store.insert_definition(&definition("A")).await.unwrap();
        let second = store.insert_definition(&definition("B")).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);

        let all = store.list_definitions().await.unwrap();
        assert_eq!(all[0].name, "A");
        assert_eq!(all[1].name, "B");
    }

    #[tokio::test]
    async fn latest_value_picks_highest_sequence() {
        let store = MemoryStore::new();
        let id = store.insert_definition(&definition("A")).await.unwrap();

        store.insert_value(id, "first").await.unwrap();
        store.insert_value(id, "second").await.unwrap();

        let latest = store.latest_value(id).await.unwrap().unwrap();
        assert_eq!(latest.content, "second");

        let all = store.values_for_definition(id).await.unwrap();
        assert_eq!(all[0].content, "second");
        assert_eq!(all[1].content, "first");
    }

    #[tokio::test]
    async fn rejects_values_for_unknown_definition() {
        let store = MemoryStore::new();
        let err = store.insert_value(42, "orphan").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_definition_removes_its_values() {
        let store = MemoryStore::new();
        let keep = store.insert_definition(&definition("Keep")).await.unwrap();
        let drop = store.insert_definition(&definition("Drop")).await.unwrap();
        store.insert_value(keep, "kept").await.unwrap();
        store.insert_value(drop, "gone").await.unwrap();

        assert!(store.delete_definition(drop).await.unwrap());
        let remaining = store.list_values().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].content, "kept");
    }

    #[tokio::test]
    async fn update_value_refreshes_timestamp() {
        let store = MemoryStore::new();
        let id = store.insert_definition(&definition("A")).await.unwrap();
        let sequence_id = store.insert_value(id, "before").await.unwrap();

        assert!(store.update_value(sequence_id, "after").await.unwrap());
        let value = store.latest_value(id).await.unwrap().unwrap();
        assert_eq!(value.content, "after");
        assert!(value.updated_at >= value.created_at);

        assert!(!store.update_value(sequence_id + 1, "missing").await.unwrap());
    }
}
