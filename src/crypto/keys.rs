//! The in-memory vault key.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::kdf::KEY_LEN;

/// A wrapper around the 32-byte derived key that zeroes its memory
/// when dropped.
///
/// The session controller is the only long-lived owner of a `VaultKey`;
/// dropping it is how a vault gets locked.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    bytes: [u8; KEY_LEN],
}

impl VaultKey {
    /// Wrap raw key bytes.  The by-value copy passed in is wiped.
    pub fn new(mut bytes: [u8; KEY_LEN]) -> Self {
        let key = Self { bytes };
        bytes.zeroize();
        key
    }

    /// Access the raw key bytes (e.g. to pass to encryption).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey(<redacted>)")
    }
}
