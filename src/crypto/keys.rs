//! The in-memory master key.
//!
//! A `SymmetricKey` only ever exists in volatile memory.  It is never
//! serialized, its `Debug` output is redacted, and its bytes are wiped
//! when the last owner drops it.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// A 256-bit AES-GCM key derived from the master passphrase.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LEN],
}

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (to build a cipher).
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let key = SymmetricKey::new([0x42; KEY_LEN]);
        let shown = format!("{key:?}");
        assert_eq!(shown, "SymmetricKey(<redacted>)");
        assert!(!shown.contains("42"));
    }

    #[test]
    fn zeroize_wipes_bytes() {
        let mut key = SymmetricKey::new([0xAB; KEY_LEN]);
        key.zeroize();
        assert_eq!(key.as_bytes(), &[0u8; KEY_LEN]);
    }
}
