//! `VaultRecord` and `SecretEntry`, the persisted vault document.
//!
//! Byte fields (salt, sentinel, ciphertexts) use custom serde helpers so
//! they serialize as base64 strings in the JSON document rather than raw
//! byte arrays.  Field names are camelCase.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::kdf::DEFAULT_ITERATIONS;

/// Protocol version written into new records:
/// PBKDF2-HMAC-SHA256 key derivation + AES-256-GCM envelopes.
pub const CURRENT_ALGORITHM_VERSION: u32 = 1;

/// Known plaintext encrypted into the sentinel.
pub const SENTINEL_PLAINTEXT: &[u8] = b"vault_test";

/// The single vault document stored per owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    /// Protocol version; see `CURRENT_ALGORITHM_VERSION`.
    #[serde(default = "default_algorithm_version")]
    pub algorithm_version: u32,

    /// The PBKDF2 salt (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// PBKDF2 iteration count used when the vault was set up.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Envelope of `SENTINEL_PLAINTEXT`; `None` after a reset.
    #[serde(
        default,
        serialize_with = "base64_encode_opt",
        deserialize_with = "base64_decode_opt"
    )]
    pub sentinel: Option<Vec<u8>>,

    /// Entries in insertion order.
    #[serde(default)]
    pub entries: Vec<SecretEntry>,
}

impl VaultRecord {
    /// A record that has been reset: fresh salt, no sentinel, no entries.
    pub fn blank(salt: Vec<u8>, kdf_iterations: u32) -> Self {
        Self {
            algorithm_version: CURRENT_ALGORITHM_VERSION,
            salt,
            kdf_iterations,
            sentinel: None,
            entries: Vec::new(),
        }
    }

    /// Returns `true` if a master password has been set for this record.
    pub fn is_initialized(&self) -> bool {
        self.sentinel.is_some()
    }
}

fn default_algorithm_version() -> u32 {
    CURRENT_ALGORITHM_VERSION
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

/// A single encrypted secret stored in the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretEntry {
    /// Display label (e.g. "Email").  Not encrypted.
    pub label: String,

    /// Optional login name shown next to the label.  Not encrypted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// The encrypted value bytes (nonce + ciphertext + tag).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,

    /// When this entry was first created.
    pub created_at: DateTime<Utc>,

    /// When this entry was last edited, if ever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SecretEntry {
    /// Case-insensitive substring match on label or username.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.label.to_lowercase().contains(&needle)
            || self
                .username
                .as_deref()
                .is_some_and(|u| u.to_lowercase().contains(&needle))
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded byte fields
// ---------------------------------------------------------------------------

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

fn base64_encode_opt<S>(data: &Option<Vec<u8>>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match data {
        Some(bytes) => serializer.serialize_some(&BASE64.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

fn base64_decode_opt<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| BASE64.decode(&s).map_err(serde::de::Error::custom))
        .transpose()
}
