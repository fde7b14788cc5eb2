use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::config::{ShieldConfig, DEFAULT_MAX_QUBITS, DEFAULT_QUBITS};
use crate::crypto::encryption::{self, CipherSuite, EncryptionError};
use crate::crypto::hybrid::{derive_hybrid_key, HybridKey};
use crate::crypto::pqc::{KeyExchange, PqcCapability, PqcError};
use crate::crypto::qkd;

#[derive(Error, Debug)]
pub enum RoomError {
    #[error("Key not ready for room {0:?}")]
    KeyNotReady(String),
    #[error("Missing {0}")]
    MissingInput(&'static str),
    #[error("Requested {requested} qubits, limit is {limit}")]
    QubitLimit { requested: usize, limit: usize },
    #[error("PQC key exchange failed: {0}")]
    KeyExchangeFailure(#[from] PqcError),
    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),
    #[error("Encryption failed")]
    EncryptionFailure,
    #[error("Worker task failed: {0}")]
    WorkerFailed(String),
}

impl RoomError {
    /// HTTP status a transport layer would answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            RoomError::KeyNotReady(_) => 404,
            RoomError::MissingInput(_)
            | RoomError::QubitLimit { .. }
            | RoomError::DecryptionFailure(_) => 400,
            RoomError::KeyExchangeFailure(_)
            | RoomError::EncryptionFailure
            | RoomError::WorkerFailed(_) => 500,
        }
    }
}

impl From<EncryptionError> for RoomError {
    fn from(e: EncryptionError) -> Self {
        match e {
            EncryptionError::EncryptionFailed => RoomError::EncryptionFailure,
            EncryptionError::DecryptionFailed(reason) => RoomError::DecryptionFailure(reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, RoomError>;

/// In-memory room → hybrid key map.
///
/// Each entry is replaced with a single `insert` under the write lock, so a
/// reader sees either the previous key or the new one. Concurrent provisioning
/// of the same room is last-writer-wins.
pub struct RoomKeyStore {
    keys: RwLock<HashMap<String, HybridKey>>,
    exchange: Arc<dyn KeyExchange>,
    cipher_suite: CipherSuite,
    default_qubits: usize,
    max_qubits: usize,
}

impl RoomKeyStore {
    /// Empty store using `exchange` for the PQC half of every room key.
    pub fn new(exchange: Arc<dyn KeyExchange>) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            exchange,
            cipher_suite: CipherSuite::default(),
            default_qubits: DEFAULT_QUBITS,
            max_qubits: DEFAULT_MAX_QUBITS,
        }
    }

    /// Resolve the PQC capability for `config.pqc_mode` and build a store.
    ///
    /// Fails with `QubitLimit` when `default_qubits` exceeds `max_qubits`.
    pub fn from_config(config: &ShieldConfig) -> Result<Self> {
        if config.default_qubits > config.max_qubits {
            return Err(RoomError::QubitLimit {
                requested: config.default_qubits,
                limit: config.max_qubits,
            });
        }
        let capability = PqcCapability::resolve(config.pqc_mode)?;
        log::info!(
            "Room key store: PQC {}, cipher {}, default {} qubits",
            capability.label(),
            config.cipher_suite.name(),
            config.default_qubits
        );

        Ok(Self::new(capability.key_exchange())
            .with_cipher_suite(config.cipher_suite)
            .with_qubits(config.default_qubits, config.max_qubits))
    }

    pub fn with_cipher_suite(mut self, suite: CipherSuite) -> Self {
        self.cipher_suite = suite;
        self
    }

    pub fn with_qubits(mut self, default_qubits: usize, max_qubits: usize) -> Self {
        self.default_qubits = default_qubits;
        self.max_qubits = max_qubits;
        self
    }

    pub fn capability(&self) -> PqcCapability {
        self.exchange.capability()
    }

    pub fn cipher_suite(&self) -> CipherSuite {
        self.cipher_suite
    }

    pub fn default_qubits(&self) -> usize {
        self.default_qubits
    }

    /// Derive a fresh hybrid key for `room` and bind it, replacing any previous key.
    ///
    /// On a key-exchange failure nothing is stored and the room keeps its
    /// previous key, if any.
    pub fn provision(&self, room: &str, raw_qubits: usize) -> Result<HybridKey> {
        if raw_qubits > self.max_qubits {
            return Err(RoomError::QubitLimit {
                requested: raw_qubits,
                limit: self.max_qubits,
            });
        }

        let qkd = qkd::simulate_bb84(raw_qubits);

        let keypair = self.exchange.generate_keypair().map_err(|e| {
            log::error!("PQC keypair generation failed for room {}: {}", room, e);
            RoomError::KeyExchangeFailure(e)
        })?;
        let shared = self
            .exchange
            .derive_shared_secret(&keypair.public_key, &keypair.secret_key)
            .map_err(|e| {
                log::error!("PQC shared secret failed for room {}: {}", room, e);
                RoomError::KeyExchangeFailure(e)
            })?;

        let key = derive_hybrid_key(qkd.key.as_bytes(), shared.as_bytes());

        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(room.to_string(), key.clone());

        log::info!(
            "Provisioned room {} ({} qubits -> {} sifted bits, PQC {}, key {})",
            room,
            qkd.raw_len,
            qkd.sifted_bits,
            self.exchange.capability().label(),
            key.fingerprint()
        );

        Ok(key)
    }

    /// [`provision`](Self::provision) with the configured default qubit count.
    pub fn provision_default(&self, room: &str) -> Result<HybridKey> {
        self.provision(room, self.default_qubits)
    }

    /// Current key for `room`, or `KeyNotReady` if it was never provisioned.
    pub fn lookup(&self, room: &str) -> Result<HybridKey> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(room)
            .cloned()
            .ok_or_else(|| RoomError::KeyNotReady(room.to_string()))
    }

    /// Current key for `room` as lowercase hex.
    pub fn key_hex(&self, room: &str) -> Result<String> {
        Ok(self.lookup(room)?.to_hex())
    }

    pub fn contains(&self, room: &str) -> bool {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(room)
    }

    pub fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encrypt `plaintext` under the room's key.
    pub fn encrypt(&self, room: &str, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Err(RoomError::MissingInput("message"));
        }
        let key = self.lookup(room)?;

        let envelope =
            encryption::encrypt_message_with(self.cipher_suite, plaintext, key.as_bytes())?;
        log::debug!(
            "Encrypted {} bytes for room {} ({} byte envelope)",
            plaintext.len(),
            room,
            envelope.len()
        );
        Ok(envelope)
    }

    /// Decrypt an envelope under the room's key.
    pub fn decrypt(&self, room: &str, envelope: &str) -> Result<String> {
        if envelope.is_empty() {
            return Err(RoomError::MissingInput("ciphertext"));
        }
        let key = self.lookup(room)?;

        encryption::decrypt_message_with(self.cipher_suite, envelope, key.as_bytes())
            .map_err(|e| {
                log::warn!("Decryption failed for room {}: {}", room, e);
                RoomError::from(e)
            })
    }
}
