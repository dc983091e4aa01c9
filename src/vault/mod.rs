//! Vault module — the encrypted secret vault.
//!
//! This module provides:
//! - `VaultRecord` and `SecretEntry`, the persisted document (`record`)
//! - `VaultRecordManager`, the typed gateway to the record store (`manager`)
//! - `SessionController`, the setup / lock / unlock state machine (`session`)

pub mod manager;
pub mod record;
pub mod session;

// Re-export the most commonly used items.
pub use manager::{VaultRecordManager, DEFAULT_COLLECTION};
pub use record::{SecretEntry, VaultRecord, CURRENT_ALGORITHM_VERSION, SENTINEL_PLAINTEXT};
pub use session::{PasswordPolicy, SessionController, VaultStatus};
