//! Typed gateway between the session controller and the record store.
//!
//! `VaultRecordManager` knows the collection name and the document shape
//! but performs no cryptography.  Store failures are passed through as
//! `VaultError::Storage` without modification.

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, VaultError};
use crate::store::{FieldOp, RecordStore};

use super::record::{SecretEntry, VaultRecord};

/// Default collection holding vault documents.
pub const DEFAULT_COLLECTION: &str = "passwordVault";

/// Field holding the entry array inside the vault document.
const ENTRIES_FIELD: &str = "entries";

pub struct VaultRecordManager<S> {
    store: S,
    collection: String,
}

impl<S: RecordStore> VaultRecordManager<S> {
    pub fn new(store: S, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Fetch the owner's vault document, or `None` if none exists.
    pub async fn load(&self, owner_id: &str) -> Result<Option<VaultRecord>> {
        debug!(owner = %owner_id, collection = %self.collection, "loading vault record");
        let Some(document) = self.store.get_document(&self.collection, owner_id).await? else {
            return Ok(None);
        };

        let record = serde_json::from_value(document)
            .map_err(|e| VaultError::InvalidRecord(e.to_string()))?;
        Ok(Some(record))
    }

    /// Replace the owner's vault document.
    pub async fn save(&self, owner_id: &str, record: &VaultRecord) -> Result<()> {
        debug!(owner = %owner_id, entries = record.entries.len(), "saving vault record");
        let document = to_document(record)?;
        self.store
            .set_document(&self.collection, owner_id, document, false)
            .await?;
        Ok(())
    }

    /// Append an entry to the owner's entry list.
    pub async fn append_entry(&self, owner_id: &str, entry: &SecretEntry) -> Result<()> {
        debug!(owner = %owner_id, "appending vault entry");
        let value = to_document(entry)?;
        self.store
            .update_field(
                &self.collection,
                owner_id,
                ENTRIES_FIELD,
                FieldOp::ArrayUnion,
                value,
            )
            .await?;
        Ok(())
    }

    /// Remove an entry (matched by full equality) from the owner's list.
    pub async fn remove_entry(&self, owner_id: &str, entry: &SecretEntry) -> Result<()> {
        debug!(owner = %owner_id, "removing vault entry");
        let value = to_document(entry)?;
        self.store
            .update_field(
                &self.collection,
                owner_id,
                ENTRIES_FIELD,
                FieldOp::ArrayRemove,
                value,
            )
            .await?;
        Ok(())
    }
}

fn to_document<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| VaultError::SerializationError(e.to_string()))
}
