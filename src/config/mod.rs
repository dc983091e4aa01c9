//! Vault configuration loaded from `.legacyvault.toml`.

pub mod settings;

pub use settings::Settings;
