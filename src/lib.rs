//! # QuantumShield
//!
//! **Per-room hybrid keys from a simulated QKD exchange and a post-quantum KEM.**
//!
//! QuantumShield derives one symmetric key per logical "room" by hashing together
//! two independently produced secrets:
//!
//! - a **BB84-style QKD simulation** (bit/basis arithmetic, sifting, SHA-256), and
//! - a **post-quantum KEM shared secret** (ML-KEM-512, or a simulated fallback
//!   when the real KEM is not compiled in).
//!
//! The resulting key authenticates and encrypts short text messages with an AEAD
//! (AES-256-GCM by default). Envelopes travel as `base64(nonce ‖ ciphertext ‖ tag)`.
//!
//! ## Quick Start
//!
//! ```rust
//! use quantum_shield::{RoomKeyStore, ShieldConfig};
//!
//! let store = RoomKeyStore::from_config(&ShieldConfig::default()).unwrap();
//! store.provision("alice-bob", 512).unwrap();
//!
//! let envelope = store.encrypt("alice-bob", "hello").unwrap();
//! assert_eq!(store.decrypt("alice-bob", &envelope).unwrap(), "hello");
//! ```
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`crypto`] | QKD simulation, PQC key exchange, hybrid derivation, AEAD envelopes |
//! | [`rooms`] | Room → hybrid key store and the request-level error taxonomy |
//! | [`service`] | Async facade that offloads provisioning to blocking workers |
//! | [`config`] | Process configuration (defaults, JSON, environment) |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `mlkem` | Yes | Real ML-KEM-512 key exchange; without it the PQC step is simulated |
//! | `native` | Yes | Tokio-backed async [`service`] module |

// ── Public modules ──────────────────────────────────────────────────────────

/// Cryptographic building blocks: QKD simulation, PQC exchange, hybrid key
/// derivation and AEAD envelopes.
pub mod crypto;

/// Room key store: provisioning, lookup and per-room encrypt/decrypt.
pub mod rooms;

/// Process configuration.
pub mod config;

/// Async request facade over the room key store.
#[cfg(feature = "native")]
pub mod service;

// ── Re-exports for convenience ──────────────────────────────────────────────

pub use config::{ConfigError, PqcMode, ShieldConfig};

pub use crypto::{
    decrypt_message, derive_hybrid_key, encrypt_message, generate_qkd_key, normalize_key,
    probe_capability, CipherSuite, EncryptionError, HybridKey, KeyExchange, KeyPair,
    PqcCapability, PqcError, QkdKey, SharedSecret,
};

pub use rooms::{RoomError, RoomKeyStore};

#[cfg(feature = "native")]
pub use service::RoomService;

// ── Library metadata ────────────────────────────────────────────────────────

/// QuantumShield version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version string.
pub fn version() -> &'static str {
    VERSION
}

// ── Tests ───────────────────────────────────────────────────────────────────
