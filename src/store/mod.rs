//! The record store collaborator.
//!
//! The vault keeps its single document in an external document store.
//! This module defines the narrow async contract the vault needs from it
//! (`RecordStore`), plus two adapters:
//! - `MemoryRecordStore`, an in-process map
//! - `FileRecordStore`, one JSON file per document

mod document;
pub mod file;
pub mod memory;

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;

/// Array mutation applied by `RecordStore::update_field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Append the value unless an equal element is already present.
    ArrayUnion,
    /// Remove every element equal to the value.
    ArrayRemove,
}

/// Errors surfaced by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("document {collection}/{owner_id} not found")]
    DocumentNotFound { collection: String, owner_id: String },

    #[error("invalid field path '{0}'")]
    InvalidFieldPath(String),

    #[error("invalid document key '{0}'")]
    InvalidKey(String),

    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(String),
}

/// Async document store keyed by `(collection, owner_id)`.
///
/// Documents are JSON objects.  Implementations must be shareable across
/// tasks; every returned future is `Send`.
pub trait RecordStore: Send + Sync {
    /// Fetch a document, or `None` if it does not exist.
    fn get_document(
        &self,
        collection: &str,
        owner_id: &str,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Write a document.  With `merge`, top-level fields are merged into
    /// an existing document instead of replacing it.
    fn set_document(
        &self,
        collection: &str,
        owner_id: &str,
        document: Value,
        merge: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Apply an array mutation to the field at `field_path` (dot-separated).
    fn update_field(
        &self,
        collection: &str,
        owner_id: &str,
        field_path: &str,
        op: FieldOp,
        value: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<T: RecordStore> RecordStore for Arc<T> {
    fn get_document(
        &self,
        collection: &str,
        owner_id: &str,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send {
        (**self).get_document(collection, owner_id)
    }

    fn set_document(
        &self,
        collection: &str,
        owner_id: &str,
        document: Value,
        merge: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).set_document(collection, owner_id, document, merge)
    }

    fn update_field(
        &self,
        collection: &str,
        owner_id: &str,
        field_path: &str,
        op: FieldOp,
        value: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).update_field(collection, owner_id, field_path, op, value)
    }
}
