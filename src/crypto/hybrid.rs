//! Hybrid key derivation: `SHA-256(qkd_key ‖ shared_secret)`.
//!
//! Operand order is part of the key definition; swapping the inputs yields an
//! unrelated key.

use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Hybrid key size in bytes
pub const HYBRID_KEY_BYTES: usize = 32;

/// 32-byte room key combining the QKD and PQC secrets.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct HybridKey([u8; HYBRID_KEY_BYTES]);

impl HybridKey {
    pub fn from_bytes(bytes: [u8; HYBRID_KEY_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HYBRID_KEY_BYTES] {
        &self.0
    }

    /// Lowercase hex encoding, as handed to the transport layer.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short non-secret identifier for logs: first 4 bytes of SHA-256(key), hex.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);
        hex::encode(&digest[..4])
    }
}

impl fmt::Debug for HybridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HybridKey").field(&self.fingerprint()).finish()
    }
}

/// Derive the hybrid key from a QKD key and a PQC shared secret.
///
/// Accepts buffers of any length; never fails.
pub fn derive_hybrid_key(qkd_key: &[u8], shared_secret: &[u8]) -> HybridKey {
    let mut hasher = Sha256::new();
    hasher.update(qkd_key);
    hasher.update(shared_secret);
    HybridKey(hasher.finalize().into())
}
