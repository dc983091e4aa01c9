use thiserror::Error;

use crate::store::StoreError;

/// All errors that can occur in the vault.
///
/// No variant ever carries the password, the derived key or a decrypted
/// secret.  Use [`VaultError::kind`] to branch on the error class.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Validation errors ---
    #[error("Master password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Password mismatch — passwords do not match")]
    PasswordMismatch,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    // --- Authentication errors ---
    #[error("Incorrect master password")]
    IncorrectPassword,

    // --- State errors ---
    #[error("Vault is locked")]
    VaultLocked,

    #[error("Vault is already unlocked")]
    AlreadyUnlocked,

    #[error("No vault exists yet — set one up first")]
    NotInitialized,

    #[error("A vault already exists for this owner")]
    AlreadyInitialized,

    #[error("Vault session has not been loaded")]
    NotLoaded,

    // --- Storage errors ---
    #[error("Record store error: {0}")]
    Storage(#[from] StoreError),

    // --- Crypto / integrity errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong password or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid vault record: {0}")]
    InvalidRecord(String),

    #[error("Unsupported vault algorithm version {0}")]
    UnsupportedAlgorithm(u32),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Background crypto task failed: {0}")]
    Worker(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error classes, used by callers to pick a recovery strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input; re-prompt.
    Validation,
    /// Wrong master password; the caller may retry unlock.
    Authentication,
    /// Operation not valid in the current session state (programmer error).
    State,
    /// Record store I/O failure; the caller decides whether to retry.
    Storage,
    /// Tampered or malformed data, or a crypto primitive failure.
    Integrity,
    /// Local configuration could not be read.
    Config,
}

impl VaultError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PasswordTooShort { .. } | Self::PasswordMismatch | Self::MissingField(_) => {
                ErrorKind::Validation
            }
            Self::IncorrectPassword => ErrorKind::Authentication,
            Self::VaultLocked
            | Self::AlreadyUnlocked
            | Self::NotInitialized
            | Self::AlreadyInitialized
            | Self::NotLoaded => ErrorKind::State,
            Self::Storage(_) => ErrorKind::Storage,
            Self::EncryptionFailed(_)
            | Self::DecryptionFailed
            | Self::KeyDerivationFailed(_)
            | Self::InvalidRecord(_)
            | Self::UnsupportedAlgorithm(_)
            | Self::SerializationError(_)
            | Self::Worker(_) => ErrorKind::Integrity,
            Self::ConfigError(_) | Self::Io(_) => ErrorKind::Config,
        }
    }
}

/// Convenience type alias for vault results.
pub type Result<T> = std::result::Result<T, VaultError>;
