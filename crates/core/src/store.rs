//! The attribute store abstraction.

use async_trait::async_trait;

use crate::attribute::{AttributeDefinition, AttributeValue};
use crate::error::StoreError;

/// Persistence backend for attribute definitions and values.
///
/// The turn pipeline needs only three operations: `list_definitions`,
/// `latest_value` and `insert_value`. The remainder are administrative,
/// for seeding and maintenance surfaces.
///
/// Implementations must uphold the ordering contracts: `list_definitions`
/// returns ascending by id, the value listings return newest first, and
/// `latest_value` returns the row with the highest `sequence_id`.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Persists a definition and returns its assigned id.
    async fn insert_definition(
        &self,
        definition: &AttributeDefinition,
    ) -> Result<i64, StoreError>;

    /// Fetches a definition by id.
    async fn get_definition(&self, id: i64) -> Result<Option<AttributeDefinition>, StoreError>;

    /// All definitions, ascending by id.
    async fn list_definitions(&self) -> Result<Vec<AttributeDefinition>, StoreError>;

    /// Rewrites an existing definition. Returns false when the id is
    /// unknown.
    async fn update_definition(&self, definition: &AttributeDefinition)
        -> Result<bool, StoreError>;

    /// Deletes a definition and all of its values. Returns false when the
    /// id is unknown.
    async fn delete_definition(&self, id: i64) -> Result<bool, StoreError>;

    /// Appends a value for a definition and returns its sequence id.
    ///
    /// Fails with [`StoreError::NotFound`] when the definition does not
    /// exist.
    async fn insert_value(&self, definition_id: i64, content: &str) -> Result<i64, StoreError>;

    /// The newest value for a definition, if any.
    async fn latest_value(&self, definition_id: i64)
        -> Result<Option<AttributeValue>, StoreError>;

    /// All values for one definition, newest first.
    async fn values_for_definition(
        &self,
        definition_id: i64,
    ) -> Result<Vec<AttributeValue>, StoreError>;

    /// All values across definitions, newest first.
    async fn list_values(&self) -> Result<Vec<AttributeValue>, StoreError>;

    /// Rewrites a value's content, refreshing its `updated_at`. Returns
    /// false when the sequence id is unknown.
    async fn update_value(&self, sequence_id: i64, content: &str) -> Result<bool, StoreError>;

    /// Deletes a single value. Returns false when the sequence id is
    /// unknown.
    async fn delete_value(&self, sequence_id: i64) -> Result<bool, StoreError>;
}
