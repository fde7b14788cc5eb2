use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

/// AEAD key size in bytes
pub const KEY_BYTES: usize = 32;
/// Nonce size in bytes (both suites)
pub const NONCE_BYTES: usize = 12;
/// Authentication tag size in bytes (both suites)
pub const TAG_BYTES: usize = 16;

#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

pub type Result<T> = std::result::Result<T, EncryptionError>;

/// AEAD algorithm behind the envelope. Both share the
/// `nonce[12] ‖ ciphertext ‖ tag[16]` layout, so the suite is not encoded in
/// the envelope and must be agreed out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CipherSuite {
    /// AES-256-GCM, compatible with existing payloads
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl CipherSuite {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "aes-256-gcm" | "aes256gcm" | "aes" => Some(CipherSuite::Aes256Gcm),
            "chacha20-poly1305" | "chacha20poly1305" | "chacha" => {
                Some(CipherSuite::ChaCha20Poly1305)
            }
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CipherSuite::Aes256Gcm => "aes-256-gcm",
            CipherSuite::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }

    fn seal(
        self,
        key: &[u8; KEY_BYTES],
        nonce: &[u8; NONCE_BYTES],
        plaintext: &[u8],
    ) -> std::result::Result<Vec<u8>, aes_gcm::aead::Error> {
        let nonce = GenericArray::from_slice(nonce);
        match self {
            CipherSuite::Aes256Gcm => {
                aes_gcm::Aes256Gcm::new(GenericArray::from_slice(key)).encrypt(nonce, plaintext)
            }
            CipherSuite::ChaCha20Poly1305 => {
                chacha20poly1305::ChaCha20Poly1305::new(GenericArray::from_slice(key))
                    .encrypt(nonce, plaintext)
            }
        }
    }

    fn open(
        self,
        key: &[u8; KEY_BYTES],
        nonce: &[u8],
        ciphertext: &[u8],
    ) -> std::result::Result<Vec<u8>, aes_gcm::aead::Error> {
        let nonce = GenericArray::from_slice(nonce);
        match self {
            CipherSuite::Aes256Gcm => {
                aes_gcm::Aes256Gcm::new(GenericArray::from_slice(key)).decrypt(nonce, ciphertext)
            }
            CipherSuite::ChaCha20Poly1305 => {
                chacha20poly1305::ChaCha20Poly1305::new(GenericArray::from_slice(key))
                    .decrypt(nonce, ciphertext)
            }
        }
    }
}

/// Bring any key to 32 bytes: unchanged if already 32 bytes, else SHA-256(key).
pub fn normalize_key(key: &[u8]) -> [u8; KEY_BYTES] {
    match <[u8; KEY_BYTES]>::try_from(key) {
        Ok(exact) => exact,
        Err(_) => Sha256::digest(key).into(),
    }
}

/// Encrypt a text message with AES-256-GCM
///
/// # Returns
/// `base64(nonce[12] ‖ ciphertext ‖ tag[16])`
pub fn encrypt_message(plaintext: &str, key: &[u8]) -> Result<String> {
    encrypt_message_with(CipherSuite::Aes256Gcm, plaintext, key)
}

/// Decrypt an AES-256-GCM envelope produced by [`encrypt_message`]
pub fn decrypt_message(envelope: &str, key: &[u8]) -> Result<String> {
    decrypt_message_with(CipherSuite::Aes256Gcm, envelope, key)
}

/// Encrypt a text message under `suite`
///
/// # Arguments
/// * `suite` - AEAD algorithm
/// * `plaintext` - Message to encrypt
/// * `key` - Key of any length, normalized to 32 bytes
///
/// # Returns
/// Base64 envelope. The nonce is fresh `OsRng` output on every call; the
/// associated data is always empty.
pub fn encrypt_message_with(suite: CipherSuite, plaintext: &str, key: &[u8]) -> Result<String> {
    let key = Zeroizing::new(normalize_key(key));

    let mut nonce = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = suite
        .seal(&key, &nonce, plaintext.as_bytes())
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    let mut payload = Vec::with_capacity(NONCE_BYTES + ciphertext.len());
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&ciphertext);

    Ok(STANDARD.encode(payload))
}

/// Decrypt a base64 envelope under `suite`
///
/// Fails without returning any plaintext when the envelope is not base64, is
/// too short to hold a nonce and tag, does not authenticate under `key`, or
/// decrypts to bytes that are not UTF-8.
pub fn decrypt_message_with(suite: CipherSuite, envelope: &str, key: &[u8]) -> Result<String> {
    let data = STANDARD
        .decode(envelope)
        .map_err(|e| EncryptionError::DecryptionFailed(format!("invalid base64: {}", e)))?;

    if data.len() < NONCE_BYTES + TAG_BYTES {
        return Err(EncryptionError::DecryptionFailed(format!(
            "envelope too short ({} bytes)",
            data.len()
        )));
    }

    let (nonce, ciphertext) = data.split_at(NONCE_BYTES);
    let key = Zeroizing::new(normalize_key(key));

    let plaintext = suite
        .open(&key, nonce, ciphertext)
        .map_err(|_| EncryptionError::DecryptionFailed("authentication failed".to_string()))?;

    String::from_utf8(plaintext).map_err(|e| {
        e.into_bytes().zeroize();
        EncryptionError::DecryptionFailed("plaintext is not valid UTF-8".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        key
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = random_key();
        let envelope = encrypt_message("hello", &key).unwrap();
        assert_eq!(decrypt_message(&envelope, &key).unwrap(), "hello");
    }

    #[test]
    fn test_decrypt_with_wrong_key() {
        let key1 = random_key();
        let key2 = random_key();

        let envelope = encrypt_message("hello", &key1).unwrap();
        let result = decrypt_message(&envelope, &key2);
        assert!(matches!(result, Err(EncryptionError::DecryptionFailed(_))));
    }

    #[test]
    fn test_envelope_layout() {
        let key = random_key();
        let plaintext = "Secret message";
        let envelope = encrypt_message(plaintext, &key).unwrap();

        let raw = STANDARD.decode(&envelope).unwrap();
        assert_eq!(raw.len(), NONCE_BYTES + plaintext.len() + TAG_BYTES);
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let key = random_key();
        let a = STANDARD.decode(encrypt_message("same", &key).unwrap()).unwrap();
        let b = STANDARD.decode(encrypt_message("same", &key).unwrap()).unwrap();
        assert_ne!(a[..NONCE_BYTES], b[..NONCE_BYTES]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_single_bit_flip_rejected() {
        let key = random_key();
        let envelope = encrypt_message("tamper me", &key).unwrap();
        let raw = STANDARD.decode(&envelope).unwrap();

        for i in 0..raw.len() * 8 {
            let mut tampered = raw.clone();
            tampered[i / 8] ^= 1 << (i % 8);
            let result = decrypt_message(&STANDARD.encode(&tampered), &key);
            assert!(
                matches!(result, Err(EncryptionError::DecryptionFailed(_))),
                "bit {} flip was accepted",
                i
            );
        }
    }

    #[test]
    fn test_truncated_envelope() {
        let key = random_key();
        let raw = STANDARD.decode(encrypt_message("hi", &key).unwrap()).unwrap();

        let short = STANDARD.encode(&raw[..NONCE_BYTES + TAG_BYTES - 1]);
        assert!(decrypt_message(&short, &key).is_err());

        let dropped_byte = STANDARD.encode(&raw[..raw.len() - 1]);
        assert!(decrypt_message(&dropped_byte, &key).is_err());
    }

    #[test]
    fn test_invalid_base64() {
        let key = random_key();
        let result = decrypt_message("not base64 !!!", &key);
        match result {
            Err(EncryptionError::DecryptionFailed(reason)) => assert!(reason.contains("base64")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_normalize_key() {
        let exact = [7u8; 32];
        assert_eq!(normalize_key(&exact), exact);

        let short = b"short key";
        let expected: [u8; 32] = Sha256::digest(short).into();
        assert_eq!(normalize_key(short), expected);

        let long = [9u8; 64];
        let expected: [u8; 32] = Sha256::digest(long).into();
        assert_eq!(normalize_key(&long), expected);
    }

    #[test]
    fn test_any_key_length_roundtrip() {
        for key in [&b""[..], &b"k"[..], &[3u8; 16][..], &[4u8; 64][..]] {
            let envelope = encrypt_message("any length", key).unwrap();
            assert_eq!(decrypt_message(&envelope, key).unwrap(), "any length");
        }
    }

    #[test]
    fn test_interoperates_with_raw_aes_gcm() {
        let key = [0x11u8; 32];
        let nonce = [0x22u8; NONCE_BYTES];
        let ct = aes_gcm::Aes256Gcm::new(GenericArray::from_slice(&key))
            .encrypt(GenericArray::from_slice(&nonce), &b"legacy payload"[..])
            .unwrap();

        let mut payload = nonce.to_vec();
        payload.extend_from_slice(&ct);
        let envelope = STANDARD.encode(payload);

        assert_eq!(decrypt_message(&envelope, &key).unwrap(), "legacy payload");
    }

    #[test]
    fn test_non_utf8_plaintext_rejected() {
        let key = [0x33u8; 32];
        let nonce = [0x44u8; NONCE_BYTES];
        let ct = CipherSuite::Aes256Gcm.seal(&key, &nonce, &[0xFF, 0xFE]).unwrap();

        let mut payload = nonce.to_vec();
        payload.extend_from_slice(&ct);

        let result = decrypt_message(&STANDARD.encode(payload), &key);
        assert!(matches!(result, Err(EncryptionError::DecryptionFailed(_))));
    }

    #[test]
    fn test_chacha_suite() {
        let key = random_key();
        let envelope = encrypt_message_with(CipherSuite::ChaCha20Poly1305, "hello", &key).unwrap();
        assert_eq!(
            decrypt_message_with(CipherSuite::ChaCha20Poly1305, &envelope, &key).unwrap(),
            "hello"
        );

        // Suites are not interchangeable
        assert!(decrypt_message(&envelope, &key).is_err());
    }

    #[test]
    fn test_suite_names() {
        for suite in [CipherSuite::Aes256Gcm, CipherSuite::ChaCha20Poly1305] {
            assert_eq!(CipherSuite::from_name(suite.name()), Some(suite));
        }
        assert_eq!(CipherSuite::from_name("rot13"), None);
        assert_eq!(CipherSuite::default(), CipherSuite::Aes256Gcm);
    }
}
