#![no_main]
use libfuzzer_sys::fuzz_target;
use quantum_shield::crypto::encryption::{self, CipherSuite};

fuzz_target!(|data: &[u8]| {
    if data.len() < 33 {
        return;
    }

    // Key of arbitrary length (first byte picks it), plaintext from the rest
    let key_len = (data[0] as usize) % 64;
    let rest = &data[1..];
    let (key, body) = rest.split_at(key_len.min(rest.len()));

    if let Ok(plaintext) = std::str::from_utf8(body) {
        for suite in [CipherSuite::Aes256Gcm, CipherSuite::ChaCha20Poly1305] {
            let envelope = encryption::encrypt_message_with(suite, plaintext, key)
                .expect("Encryption must succeed for any key and plaintext");
            let decrypted = encryption::decrypt_message_with(suite, &envelope, key)
                .expect("Decryption of valid envelope must succeed");
            assert_eq!(decrypted, plaintext, "Round-trip mismatch");
        }
    }

    // Arbitrary envelopes must be rejected, never panic
    let text = String::from_utf8_lossy(data);
    let _ = encryption::decrypt_message(&text, key);
});
