//! Async request facade over [`RoomKeyStore`].
//!
//! Provisioning runs the QKD simulation and the KEM, both CPU-bound and possibly
//! blocking, so it is moved onto tokio's blocking pool. Encrypt and decrypt are
//! short AEAD calls and run inline on the calling task.

use std::sync::Arc;

use tokio::task;

use crate::config::ShieldConfig;
use crate::crypto::hybrid::HybridKey;
use crate::rooms::{Result, RoomError, RoomKeyStore};

/// Cheap to clone; all clones share one store.
#[derive(Clone)]
pub struct RoomService {
    store: Arc<RoomKeyStore>,
    default_room: Arc<str>,
}

impl RoomService {
    pub fn new(store: Arc<RoomKeyStore>, default_room: &str) -> Self {
        Self {
            store,
            default_room: Arc::from(default_room),
        }
    }

    pub fn from_config(config: &ShieldConfig) -> Result<Self> {
        let store = RoomKeyStore::from_config(config)?;
        Ok(Self::new(Arc::new(store), &config.default_room))
    }

    pub fn store(&self) -> &Arc<RoomKeyStore> {
        &self.store
    }

    /// `room`, or the configured default room when the caller gave none.
    pub fn room_or_default<'a>(&'a self, room: Option<&'a str>) -> &'a str {
        room.unwrap_or(&*self.default_room)
    }

    /// Provision a room on the blocking pool. `None` qubits uses the store default.
    pub async fn provision(
        &self,
        room: Option<&str>,
        raw_qubits: Option<usize>,
    ) -> Result<HybridKey> {
        let store = Arc::clone(&self.store);
        let room = self.room_or_default(room).to_string();

        task::spawn_blocking(move || match raw_qubits {
            Some(qubits) => store.provision(&room, qubits),
            None => store.provision_default(&room),
        })
        .await
        .map_err(|e| {
            log::error!("Provisioning worker failed: {}", e);
            RoomError::WorkerFailed(e.to_string())
        })?
    }

    pub async fn key_hex(&self, room: Option<&str>) -> Result<String> {
        self.store.key_hex(self.room_or_default(room))
    }

    pub async fn encrypt(&self, room: Option<&str>, plaintext: &str) -> Result<String> {
        self.store.encrypt(self.room_or_default(room), plaintext)
    }

    pub async fn decrypt(&self, room: Option<&str>, envelope: &str) -> Result<String> {
        self.store.decrypt(self.room_or_default(room), envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PqcMode;
    use crate::crypto::pqc::{self, KeyExchange, KeyPair, PqcCapability, SharedSecret};

    /// Exchange whose keypair generation panics on the worker thread.
    struct PanickingKeyExchange;

    impl KeyExchange for PanickingKeyExchange {
        fn capability(&self) -> PqcCapability {
            PqcCapability::Simulated
        }

        fn generate_keypair(&self) -> pqc::Result<KeyPair> {
            panic!("keypair generation crashed");
        }

        fn derive_shared_secret(&self, _pk: &[u8], _sk: &[u8]) -> pqc::Result<SharedSecret> {
            Ok(SharedSecret::from(vec![0u8; 32]))
        }
    }

    fn service() -> RoomService {
        let config = ShieldConfig {
            pqc_mode: PqcMode::Simulated,
            default_qubits: 128,
            ..ShieldConfig::default()
        };
        RoomService::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_provision_default_room() {
        let service = service();
        let key = service.provision(None, None).await.unwrap();

        assert!(service.store().contains("default"));
        assert_eq!(service.key_hex(None).await.unwrap(), key.to_hex());
    }

    #[tokio::test]
    async fn test_encrypt_decrypt() {
        let service = service();
        service.provision(Some("alice-bob"), Some(512)).await.unwrap();

        let envelope = service.encrypt(Some("alice-bob"), "hello").await.unwrap();
        let plaintext = service.decrypt(Some("alice-bob"), &envelope).await.unwrap();
        assert_eq!(plaintext, "hello");
    }

    #[tokio::test]
    async fn test_key_not_ready() {
        let service = service();
        let result = service.encrypt(Some("unknown-room"), "hello").await;
        assert!(matches!(result, Err(RoomError::KeyNotReady(_))));
    }

    #[tokio::test]
    async fn test_worker_panic_maps_to_worker_failed() {
        let store = RoomKeyStore::new(Arc::new(PanickingKeyExchange));
        let service = RoomService::new(Arc::new(store), "default");

        let result = service.provision(Some("room"), Some(64)).await;
        match result {
            Err(err @ RoomError::WorkerFailed(_)) => assert_eq!(err.http_status(), 500),
            other => panic!("unexpected result: {:?}", other.map(|k| k.fingerprint())),
        }
        assert!(!service.store().contains("room"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rooms() {
        let service = service();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    let room = format!("room-{}", i);
                    service.provision(Some(&room), Some(256)).await?;
                    let envelope = service.encrypt(Some(&room), "ping").await?;
                    service.decrypt(Some(&room), &envelope).await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "ping");
        }
        assert_eq!(service.store().len(), 16);
    }
}
