//! The vault session state machine.
//!
//! ```text
//! Uninitialized --load--> Setup | Locked
//! Setup  --initialize--> Unlocked
//! Locked --unlock------> Unlocked
//! Unlocked --lock------> Locked
//! any    --reset-------> Setup
//! ```
//!
//! The derived key exists only inside `SessionState::Unlocked`.  Leaving
//! that state drops the `VaultKey`, which zeroes it.

use chrono::Utc;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::config::Settings;
use crate::crypto::{decrypt, derive_key_with_params, encrypt, generate_salt, Pbkdf2Params, VaultKey};
use crate::errors::{Result, VaultError};
use crate::store::RecordStore;

use super::manager::VaultRecordManager;
use super::record::{SecretEntry, VaultRecord, CURRENT_ALGORITHM_VERSION, SENTINEL_PLAINTEXT};

/// Public view of the session state.  Never exposes the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultStatus {
    /// `load` has not completed yet.
    Uninitialized,
    /// No vault exists for the owner; `initialize` is expected.
    Setup,
    /// A vault exists and no key is held.
    Locked,
    /// The derived key is held in memory.
    Unlocked,
}

enum SessionState {
    Uninitialized,
    Setup,
    Locked,
    Unlocked(VaultKey),
}

impl SessionState {
    fn status(&self) -> VaultStatus {
        match self {
            Self::Uninitialized => VaultStatus::Uninitialized,
            Self::Setup => VaultStatus::Setup,
            Self::Locked => VaultStatus::Locked,
            Self::Unlocked(_) => VaultStatus::Unlocked,
        }
    }
}

/// Master password rules applied at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum length in characters.
    pub min_length: usize,
}

impl PasswordPolicy {
    pub fn validate(&self, password: &str, confirm: &str) -> Result<()> {
        if password.chars().count() < self.min_length {
            return Err(VaultError::PasswordTooShort {
                min: self.min_length,
            });
        }
        if password != confirm {
            return Err(VaultError::PasswordMismatch);
        }
        Ok(())
    }
}

/// Drives one owner's vault through setup, unlock, lock and reset, and
/// performs entry operations while unlocked.
///
/// Every operation holds the session lock for its full duration, so
/// operations on one controller never interleave.  Separate controllers
/// for the same owner (e.g. two devices) are not coordinated: entry list
/// mutations can race at the record store.  The vault is not safe for
/// concurrent multi-session editing.
///
/// The key state only changes after the record store call that backs the
/// transition has succeeded, so dropping an in-flight future leaves the
/// previous state in place.
pub struct SessionController<S> {
    manager: VaultRecordManager<S>,
    owner_id: String,
    policy: PasswordPolicy,
    kdf: Pbkdf2Params,
    state: Mutex<SessionState>,
}

impl<S: RecordStore> SessionController<S> {
    pub fn new(store: S, owner_id: impl Into<String>, settings: &Settings) -> Self {
        Self {
            manager: VaultRecordManager::new(store, settings.collection.clone()),
            owner_id: owner_id.into(),
            policy: PasswordPolicy {
                min_length: settings.min_password_length,
            },
            kdf: settings.pbkdf2_params(),
            state: Mutex::new(SessionState::Uninitialized),
        }
    }

    /// Current state of the session.
    pub async fn status(&self) -> VaultStatus {
        self.state.lock().await.status()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Determine whether the owner needs setup or an unlock.
    ///
    /// A record without a sentinel (left behind by `reset`) counts as no
    /// vault.  Calling `load` while unlocked keeps the key.
    pub async fn load(&self) -> Result<VaultStatus> {
        let mut state = self.state.lock().await;
        if let SessionState::Unlocked(_) = *state {
            return Ok(VaultStatus::Unlocked);
        }

        let next = match self.manager.load(&self.owner_id).await? {
            Some(record) if record.is_initialized() => {
                check_record(&record)?;
                SessionState::Locked
            }
            _ => SessionState::Setup,
        };

        *state = next;
        info!(owner = %self.owner_id, status = ?state.status(), "vault session loaded");
        Ok(state.status())
    }

    /// Create the vault with a new master password and unlock it.
    ///
    /// Password policy violations are reported before the record store is
    /// contacted.
    pub async fn initialize(&self, password: &str, confirm: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        match *state {
            SessionState::Setup => {}
            SessionState::Uninitialized => return Err(VaultError::NotLoaded),
            SessionState::Locked | SessionState::Unlocked(_) => {
                return Err(VaultError::AlreadyInitialized)
            }
        }

        self.policy.validate(password, confirm)?;

        // Another session may have set the vault up since `load`.
        if let Some(existing) = self.manager.load(&self.owner_id).await? {
            if existing.is_initialized() {
                *state = SessionState::Locked;
                return Err(VaultError::AlreadyInitialized);
            }
        }

        let salt = generate_salt().to_vec();
        let key = derive_in_background(password, salt.clone(), self.kdf).await?;
        let sentinel = encrypt(key.as_bytes(), SENTINEL_PLAINTEXT)?;

        let record = VaultRecord {
            algorithm_version: CURRENT_ALGORITHM_VERSION,
            salt,
            kdf_iterations: self.kdf.iterations,
            sentinel: Some(sentinel),
            entries: Vec::new(),
        };
        self.manager.save(&self.owner_id, &record).await?;

        *state = SessionState::Unlocked(key);
        info!(owner = %self.owner_id, "vault initialized");
        Ok(())
    }

    /// Verify `password` against the stored sentinel and hold the key.
    ///
    /// Every verification failure is reported as `IncorrectPassword`.
    pub async fn unlock(&self, password: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        match *state {
            SessionState::Locked => {}
            SessionState::Unlocked(_) => return Err(VaultError::AlreadyUnlocked),
            SessionState::Setup => return Err(VaultError::NotInitialized),
            SessionState::Uninitialized => return Err(VaultError::NotLoaded),
        }

        if password.is_empty() {
            return Err(VaultError::MissingField("password"));
        }

        let record = self.manager.load(&self.owner_id).await?;
        let Some(VaultRecord {
            algorithm_version,
            salt,
            kdf_iterations,
            sentinel: Some(sentinel),
            ..
        }) = record
        else {
            warn!(owner = %self.owner_id, "vault disappeared while locked");
            *state = SessionState::Setup;
            return Err(VaultError::NotInitialized);
        };
        if algorithm_version != CURRENT_ALGORITHM_VERSION {
            return Err(VaultError::UnsupportedAlgorithm(algorithm_version));
        }

        // The stored count is untrusted input.
        let params = Pbkdf2Params {
            iterations: kdf_iterations,
        };
        if !params.is_in_range() {
            warn!(owner = %self.owner_id, kdf_iterations, "vault record has out-of-range KDF cost");
            return Err(VaultError::InvalidRecord(format!(
                "kdfIterations {kdf_iterations} is outside the accepted range"
            )));
        }
        let candidate = derive_in_background(password, salt, params).await?;

        if !sentinel_matches(&candidate, &sentinel) {
            drop(candidate);
            warn!(owner = %self.owner_id, "vault unlock rejected");
            return Err(VaultError::IncorrectPassword);
        }

        *state = SessionState::Unlocked(candidate);
        info!(owner = %self.owner_id, "vault unlocked");
        Ok(())
    }

    /// Discard the in-memory key.  A no-op unless unlocked.
    pub async fn lock(&self) {
        let mut state = self.state.lock().await;
        if let SessionState::Unlocked(_) = *state {
            *state = SessionState::Locked;
            info!(owner = %self.owner_id, "vault locked");
        }
    }

    /// Destroy the vault: new salt, no sentinel, no entries.
    ///
    /// Irreversible.  The caller is responsible for obtaining explicit
    /// user confirmation before calling this.
    pub async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        let record = VaultRecord::blank(generate_salt().to_vec(), self.kdf.iterations);
        self.manager.save(&self.owner_id, &record).await?;

        *state = SessionState::Setup;
        warn!(owner = %self.owner_id, "vault reset, all entries destroyed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entry operations (unlocked only)
    // ------------------------------------------------------------------

    /// Encrypt `secret` and append it under `label`.
    pub async fn add_entry(&self, label: &str, secret: &str) -> Result<SecretEntry> {
        self.add_entry_with_username(label, None, secret).await
    }

    /// Like `add_entry`, also recording a login name next to the label.
    pub async fn add_entry_with_username(
        &self,
        label: &str,
        username: Option<&str>,
        secret: &str,
    ) -> Result<SecretEntry> {
        let state = self.state.lock().await;
        let key = unlocked_key(&state)?;
        validate_entry(label, secret)?;

        let entry = SecretEntry {
            label: label.to_string(),
            username: username.filter(|u| !u.is_empty()).map(str::to_string),
            ciphertext: encrypt(key.as_bytes(), secret.as_bytes())?,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.manager.append_entry(&self.owner_id, &entry).await?;

        debug!(owner = %self.owner_id, "vault entry added");
        Ok(entry)
    }

    /// Decrypt an entry's secret.
    ///
    /// The returned string is wiped when dropped; how long it is kept is
    /// up to the caller.
    pub async fn reveal_entry(&self, entry: &SecretEntry) -> Result<Zeroizing<String>> {
        let state = self.state.lock().await;
        let key = unlocked_key(&state)?;

        let plaintext = decrypt(key.as_bytes(), &entry.ciphertext)?;

        // On error, zeroize the bytes inside the error before discarding.
        String::from_utf8(plaintext).map(Zeroizing::new).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            VaultError::SerializationError("secret value is not valid UTF-8".to_string())
        })
    }

    /// Remove an entry.  No decryption is involved.
    pub async fn delete_entry(&self, entry: &SecretEntry) -> Result<()> {
        let state = self.state.lock().await;
        unlocked_key(&state)?;

        self.manager.remove_entry(&self.owner_id, entry).await?;
        debug!(owner = %self.owner_id, "vault entry deleted");
        Ok(())
    }

    /// Replace an entry's label and secret, keeping its creation time and
    /// username.
    ///
    /// The new entry is appended before the old one is removed, so a
    /// failure in between leaves both rather than neither.
    pub async fn update_entry(
        &self,
        entry: &SecretEntry,
        label: &str,
        secret: &str,
    ) -> Result<SecretEntry> {
        self.update_entry_with_username(entry, label, entry.username.as_deref(), secret)
            .await
    }

    /// Replace an entry's label, username and secret.
    ///
    /// An empty or `None` username clears it. `created_at` is kept.
    pub async fn update_entry_with_username(
        &self,
        entry: &SecretEntry,
        label: &str,
        username: Option<&str>,
        secret: &str,
    ) -> Result<SecretEntry> {
        let state = self.state.lock().await;
        let key = unlocked_key(&state)?;
        validate_entry(label, secret)?;

        let updated = SecretEntry {
            label: label.to_string(),
            username: username.filter(|u| !u.is_empty()).map(str::to_string),
            ciphertext: encrypt(key.as_bytes(), secret.as_bytes())?,
            created_at: entry.created_at,
            updated_at: Some(Utc::now()),
        };
        self.manager.append_entry(&self.owner_id, &updated).await?;
        self.manager.remove_entry(&self.owner_id, entry).await?;

        debug!(owner = %self.owner_id, "vault entry updated");
        Ok(updated)
    }

    /// All entries in insertion order.
    pub async fn entries(&self) -> Result<Vec<SecretEntry>> {
        let mut state = self.state.lock().await;
        unlocked_key(&state)?;

        match self.manager.load(&self.owner_id).await? {
            Some(record) if record.is_initialized() => Ok(record.entries),
            _ => {
                warn!(owner = %self.owner_id, "vault disappeared while unlocked");
                *state = SessionState::Setup;
                Err(VaultError::NotInitialized)
            }
        }
    }

    /// Entries whose label or username contains `query`, ignoring case.
    pub async fn search(&self, query: &str) -> Result<Vec<SecretEntry>> {
        let entries = self.entries().await?;
        Ok(entries.into_iter().filter(|e| e.matches(query)).collect())
    }
}

fn unlocked_key(state: &SessionState) -> Result<&VaultKey> {
    match state {
        SessionState::Unlocked(key) => Ok(key),
        _ => Err(VaultError::VaultLocked),
    }
}

fn validate_entry(label: &str, secret: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(VaultError::MissingField("label"));
    }
    if secret.is_empty() {
        return Err(VaultError::MissingField("secret"));
    }
    Ok(())
}

fn check_record(record: &VaultRecord) -> Result<()> {
    if record.algorithm_version != CURRENT_ALGORITHM_VERSION {
        return Err(VaultError::UnsupportedAlgorithm(record.algorithm_version));
    }
    let params = Pbkdf2Params {
        iterations: record.kdf_iterations,
    };
    if !params.is_in_range() {
        return Err(VaultError::InvalidRecord(format!(
            "kdfIterations {} is outside the accepted range",
            record.kdf_iterations
        )));
    }
    Ok(())
}

/// Decrypt the sentinel and compare it to the known constant in
/// constant time.  Decrypt failure and mismatch are indistinguishable.
fn sentinel_matches(key: &VaultKey, sentinel: &[u8]) -> bool {
    match decrypt(key.as_bytes(), sentinel) {
        Ok(plaintext) => {
            let plaintext = Zeroizing::new(plaintext);
            plaintext.as_slice().ct_eq(SENTINEL_PLAINTEXT).into()
        }
        Err(_) => false,
    }
}

/// Run PBKDF2 on the blocking pool.
///
/// Once spawned, the derivation runs to completion even if the awaiting
/// future is dropped.
async fn derive_in_background(
    password: &str,
    salt: Vec<u8>,
    params: Pbkdf2Params,
) -> Result<VaultKey> {
    let password = Zeroizing::new(password.to_owned());
    tokio::task::spawn_blocking(move || {
        derive_key_with_params(password.as_bytes(), &salt, &params).map(VaultKey::new)
    })
    .await
    .map_err(|e| VaultError::Worker(e.to_string()))?
}
