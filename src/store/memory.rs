//! In-memory record store.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

use super::document::{apply_field_op, apply_set};
use super::{FieldOp, RecordStore, StoreError};

/// A `RecordStore` backed by a process-local map.
///
/// Useful for embedding the vault in tests or in applications that bring
/// their own persistence layer on top.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    documents: RwLock<HashMap<(String, String), Value>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(collection: &str, owner_id: &str) -> (String, String) {
    (collection.to_string(), owner_id.to_string())
}

impl RecordStore for MemoryRecordStore {
    async fn get_document(
        &self,
        collection: &str,
        owner_id: &str,
    ) -> Result<Option<Value>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&key(collection, owner_id)).cloned())
    }

    async fn set_document(
        &self,
        collection: &str,
        owner_id: &str,
        document: Value,
        merge: bool,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let key = key(collection, owner_id);
        let existing = documents.remove(&key);
        documents.insert(key, apply_set(existing, document, merge));
        Ok(())
    }

    async fn update_field(
        &self,
        collection: &str,
        owner_id: &str,
        field_path: &str,
        op: FieldOp,
        value: Value,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let document = documents.get_mut(&key(collection, owner_id)).ok_or_else(|| {
            StoreError::DocumentNotFound {
                collection: collection.to_string(),
                owner_id: owner_id.to_string(),
            }
        })?;
        apply_field_op(document, field_path, op, value)
    }
}
