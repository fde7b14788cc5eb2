pub mod qkd;
pub mod pqc;
pub mod hybrid;
pub mod encryption;

pub use qkd::{
    generate_qkd_key,
    simulate_bb84,
    simulate_bb84_seeded,
    Basis,
    Bb84Exchange,
    QkdKey,
    QkdOutcome,
};
pub use pqc::{
    probe_capability,
    KeyExchange,
    KeyPair,
    PqcCapability,
    PqcError,
    SharedSecret,
    SimulatedKeyExchange,
};
#[cfg(feature = "mlkem")]
pub use pqc::MlKemKeyExchange;
pub use hybrid::{derive_hybrid_key, HybridKey};
pub use encryption::{
    decrypt_message,
    decrypt_message_with,
    encrypt_message,
    encrypt_message_with,
    normalize_key,
    CipherSuite,
    EncryptionError,
};
