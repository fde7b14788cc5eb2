#![no_main]
use libfuzzer_sys::fuzz_target;
use quantum_shield::crypto::{derive_hybrid_key, simulate_bb84_seeded};

fuzz_target!(|data: &[u8]| {
    if data.len() < 34 {
        return;
    }

    let mut seed = [0u8; 32];
    seed.copy_from_slice(&data[..32]);
    let raw_len = u16::from_le_bytes([data[32], data[33]]) as usize;

    // Seeded simulation must be reproducible
    let a = simulate_bb84_seeded(raw_len, seed);
    let b = simulate_bb84_seeded(raw_len, seed);
    assert_eq!(a.key, b.key, "Seeded QKD run not reproducible");
    assert!(a.sifted_bits <= raw_len);

    // Hybrid derivation accepts any secret length
    let secret = &data[34..];
    let k1 = derive_hybrid_key(a.key.as_bytes(), secret);
    let k2 = derive_hybrid_key(a.key.as_bytes(), secret);
    assert_eq!(k1, k2, "Hybrid derivation not deterministic");
});
