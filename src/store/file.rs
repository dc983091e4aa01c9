//! File-backed record store.
//!
//! Each document lives at `<root>/<collection>/<owner_id>.json`.  Writes
//! go to a temp file in the same directory followed by a rename, so a
//! reader never observes a half-written document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;

use super::document::{apply_field_op, apply_set};
use super::{FieldOp, RecordStore, StoreError};

/// A `RecordStore` that keeps one JSON file per document.
#[derive(Debug)]
pub struct FileRecordStore {
    root: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileRecordStore {
    /// Create a store rooted at `root`.  Directories are created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Build the path of a document after validating both key parts.
    fn document_path(&self, collection: &str, owner_id: &str) -> Result<PathBuf, StoreError> {
        validate_key_part(collection)?;
        validate_key_part(owner_id)?;
        Ok(self
            .root
            .join(collection)
            .join(format!("{owner_id}.json")))
    }

    async fn read(&self, path: &Path) -> Result<Option<Value>, StoreError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(StoreError::PermissionDenied(path.display().to_string()))
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let document = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))?;
        Ok(Some(document))
    }

    async fn write(&self, path: &Path, document: &Value) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let parent = path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(parent).await?;

        // Temp names are unique per write.
        let tmp_path = parent.join(format!(
            ".{}.{:016x}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy(),
            rand::random::<u64>()
        ));

        if let Err(e) = replace_file(&tmp_path, path, &bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Write `bytes` to `tmp_path`, then rename it over `path`.
async fn replace_file(tmp_path: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::write(tmp_path, bytes).await?;

    // On Unix, restrict permissions to owner-only read/write.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
    }

    fs::rename(tmp_path, path).await
}

/// Allowed: ASCII letters, digits, underscores, hyphens, periods.
/// Must be non-empty, not a dot path, and at most 128 characters.
fn validate_key_part(part: &str) -> Result<(), StoreError> {
    let valid = !part.is_empty()
        && part.len() <= 128
        && part != "."
        && part != ".."
        && part
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(part.to_string()))
    }
}

impl RecordStore for FileRecordStore {
    async fn get_document(
        &self,
        collection: &str,
        owner_id: &str,
    ) -> Result<Option<Value>, StoreError> {
        let path = self.document_path(collection, owner_id)?;
        self.read(&path).await
    }

    async fn set_document(
        &self,
        collection: &str,
        owner_id: &str,
        document: Value,
        merge: bool,
    ) -> Result<(), StoreError> {
        let path = self.document_path(collection, owner_id)?;
        let _guard = self.write_lock.lock().await;

        let existing = if merge { self.read(&path).await? } else { None };
        let merged = apply_set(existing, document, merge);
        self.write(&path, &merged).await
    }

    async fn update_field(
        &self,
        collection: &str,
        owner_id: &str,
        field_path: &str,
        op: FieldOp,
        value: Value,
    ) -> Result<(), StoreError> {
        let path = self.document_path(collection, owner_id)?;
        let _guard = self.write_lock.lock().await;

        let mut document =
            self.read(&path)
                .await?
                .ok_or_else(|| StoreError::DocumentNotFound {
                    collection: collection.to_string(),
                    owner_id: owner_id.to_string(),
                })?;
        apply_field_op(&mut document, field_path, op, value)?;
        self.write(&path, &document).await
    }
}
