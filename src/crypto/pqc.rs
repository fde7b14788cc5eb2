/// Post-Quantum key exchange — ML-KEM-512 (NIST FIPS 203) with a simulated fallback
///
/// The real backend is compiled in with the `mlkem` feature. Which backend a
/// process uses is decided once, by `probe_capability()`, and then injected into
/// the room key store as an `Arc<dyn KeyExchange>`.
///
/// Key sizes (ML-KEM-512):
/// - Encapsulation key (public):  800 bytes
/// - Decapsulation key (secret):  1632 bytes
/// - Ciphertext:                  768 bytes
/// - Shared secret:               32 bytes
///
/// Simulated backend: 32-byte public key, 64-byte secret key, 32-byte shared
/// secret, all random placeholders with no cryptographic relation.
use std::sync::Arc;

#[cfg(feature = "mlkem")]
use ml_kem::kem::{Decapsulate, Encapsulate};
#[cfg(feature = "mlkem")]
use ml_kem::{Encoded, EncodedSizeUser, KemCore, MlKem512, MlKem512Params};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::PqcMode;

/// ML-KEM-512 encapsulation key (public) size in bytes
pub const MLKEM512_EK_BYTES: usize = 800;
/// ML-KEM-512 decapsulation key (secret) size in bytes
pub const MLKEM512_DK_BYTES: usize = 1632;
/// ML-KEM-512 ciphertext size in bytes
pub const MLKEM512_CT_BYTES: usize = 768;

/// Simulated public key size in bytes
pub const SIMULATED_PK_BYTES: usize = 32;
/// Simulated secret key size in bytes
pub const SIMULATED_SK_BYTES: usize = 64;

/// Shared secret size for both backends
pub const SHARED_SECRET_BYTES: usize = 32;

#[derive(Error, Debug)]
pub enum PqcError {
    #[error("ML-KEM key generation failed")]
    KeyGenFailed,
    #[error("ML-KEM encapsulation failed")]
    EncapsulateFailed,
    #[error("ML-KEM decapsulation failed")]
    DecapsulateFailed,
    #[error("Invalid key length")]
    InvalidKeyLength,
    #[error("Public and secret key do not belong to the same keypair")]
    SecretMismatch,
    #[error("Real ML-KEM backend is not available in this build")]
    Unavailable,
}

pub type Result<T> = std::result::Result<T, PqcError>;

/// Public/secret key buffers. Lengths depend on the backend.
pub struct KeyPair {
    pub public_key: Vec<u8>,
    pub secret_key: Vec<u8>,
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.secret_key.zeroize();
    }
}

/// Shared secret produced by a key exchange.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SharedSecret {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Which key-exchange backend the process runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PqcCapability {
    /// ML-KEM-512
    Real,
    /// Random placeholders preserving the interface shape
    Simulated,
}

impl PqcCapability {
    pub fn label(self) -> &'static str {
        match self {
            PqcCapability::Real => "ML-KEM-512",
            PqcCapability::Simulated => "simulated",
        }
    }

    /// Map a configured mode onto the probed capability.
    ///
    /// `Real` is an error when the probe did not find a working ML-KEM backend.
    pub fn resolve(mode: PqcMode) -> Result<Self> {
        match mode {
            PqcMode::Auto => Ok(probe_capability()),
            PqcMode::Simulated => Ok(PqcCapability::Simulated),
            PqcMode::Real => match probe_capability() {
                PqcCapability::Real => Ok(PqcCapability::Real),
                PqcCapability::Simulated => Err(PqcError::Unavailable),
            },
        }
    }

    /// Instantiate the backend for this capability.
    pub fn key_exchange(self) -> Arc<dyn KeyExchange> {
        match self {
            #[cfg(feature = "mlkem")]
            PqcCapability::Real => Arc::new(MlKemKeyExchange),
            // Without `mlkem` compiled in, `resolve` never yields `Real`.
            _ => Arc::new(SimulatedKeyExchange),
        }
    }
}

/// Key-exchange strategy used by the room key store.
pub trait KeyExchange: Send + Sync {
    fn capability(&self) -> PqcCapability;

    fn generate_keypair(&self) -> Result<KeyPair>;

    /// Produce the shared secret for a keypair.
    ///
    /// This is a same-process round trip, not a two-party protocol.
    fn derive_shared_secret(&self, public_key: &[u8], secret_key: &[u8]) -> Result<SharedSecret>;
}

/// Real backend: ML-KEM-512 via the RustCrypto `ml-kem` crate.
#[cfg(feature = "mlkem")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MlKemKeyExchange;

#[cfg(feature = "mlkem")]
impl KeyExchange for MlKemKeyExchange {
    fn capability(&self) -> PqcCapability {
        PqcCapability::Real
    }

    fn generate_keypair(&self) -> Result<KeyPair> {
        let (dk, ek) = MlKem512::generate(&mut OsRng);
        let public_key = ek.as_bytes().to_vec();
        let secret_key = dk.as_bytes().to_vec();

        if public_key.len() != MLKEM512_EK_BYTES || secret_key.len() != MLKEM512_DK_BYTES {
            return Err(PqcError::KeyGenFailed);
        }

        Ok(KeyPair {
            public_key,
            secret_key,
        })
    }

    /// Encapsulate against `public_key`, then decapsulate with `secret_key` and
    /// return the recovered secret.
    fn derive_shared_secret(&self, public_key: &[u8], secret_key: &[u8]) -> Result<SharedSecret> {
        if public_key.len() != MLKEM512_EK_BYTES || secret_key.len() != MLKEM512_DK_BYTES {
            return Err(PqcError::InvalidKeyLength);
        }

        // Reconstruct ML-KEM-512 EncapsulationKey from raw bytes
        let ek_encoded =
            Encoded::<ml_kem::kem::EncapsulationKey<MlKem512Params>>::try_from(public_key)
                .map_err(|_| PqcError::InvalidKeyLength)?;
        let ek = ml_kem::kem::EncapsulationKey::<MlKem512Params>::from_bytes(&ek_encoded);

        let (ct, sent_ss) = ek
            .encapsulate(&mut OsRng)
            .map_err(|_| PqcError::EncapsulateFailed)?;
        if ct.len() != MLKEM512_CT_BYTES {
            return Err(PqcError::EncapsulateFailed);
        }

        // Reconstruct ML-KEM-512 DecapsulationKey from raw bytes
        let dk_encoded =
            Encoded::<ml_kem::kem::DecapsulationKey<MlKem512Params>>::try_from(secret_key)
                .map_err(|_| PqcError::InvalidKeyLength)?;
        let dk = ml_kem::kem::DecapsulationKey::<MlKem512Params>::from_bytes(&dk_encoded);

        let recovered = dk
            .decapsulate(&ct)
            .map_err(|_| PqcError::DecapsulateFailed)?;

        // Implicit rejection: a foreign secret key decapsulates to an unrelated value
        if recovered[..] != sent_ss[..] {
            return Err(PqcError::SecretMismatch);
        }

        Ok(SharedSecret(recovered.to_vec()))
    }
}

/// Fallback backend. Keys and secrets are fresh `OsRng` bytes; inputs are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedKeyExchange;

impl KeyExchange for SimulatedKeyExchange {
    fn capability(&self) -> PqcCapability {
        PqcCapability::Simulated
    }

    fn generate_keypair(&self) -> Result<KeyPair> {
        Ok(KeyPair {
            public_key: random_bytes(SIMULATED_PK_BYTES),
            secret_key: random_bytes(SIMULATED_SK_BYTES),
        })
    }

    fn derive_shared_secret(&self, _public_key: &[u8], _secret_key: &[u8]) -> Result<SharedSecret> {
        Ok(SharedSecret(random_bytes(SHARED_SECRET_BYTES)))
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Probe result, computed on first use and fixed for the process lifetime.
static PROBED: Lazy<PqcCapability> = Lazy::new(|| {
    let capability = if real_backend_works() {
        PqcCapability::Real
    } else {
        PqcCapability::Simulated
    };

    match capability {
        PqcCapability::Real => log::info!("PQC capability: {}", capability.label()),
        PqcCapability::Simulated => {
            log::warn!("ML-KEM unavailable, using simulated PQC key exchange")
        }
    }
    capability
});

/// Which backend this process can use. Probed once, never re-probed.
pub fn probe_capability() -> PqcCapability {
    *PROBED
}

/// Self-test: one keypair plus one encapsulate/decapsulate round trip.
#[cfg(feature = "mlkem")]
fn real_backend_works() -> bool {
    let kex = MlKemKeyExchange;
    let result = kex
        .generate_keypair()
        .and_then(|kp| kex.derive_shared_secret(&kp.public_key, &kp.secret_key));

    match result {
        Ok(ss) => ss.len() == SHARED_SECRET_BYTES,
        Err(e) => {
            log::error!("ML-KEM self-test failed: {}", e);
            false
        }
    }
}

#[cfg(not(feature = "mlkem"))]
fn real_backend_works() -> bool {
    false
}
