//! BB84 quantum key distribution — simulated.
//!
//! Pure bit/basis arithmetic: no physical channel, no eavesdropper detection,
//! no QBER estimate and no authenticated basis reconciliation. The output is one
//! of two entropy sources feeding the hybrid room key.
//!
//! Randomness here comes from a seeded `ChaCha20Rng` so that a run is
//! reproducible from its seed. This RNG drives the simulation only and is never
//! used for nonces or key generation elsewhere in the crate.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the QKD key digest (SHA-256 output).
pub const QKD_KEY_BYTES: usize = 32;

/// Measurement basis for a single qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Basis {
    /// `+` basis
    Rectilinear,
    /// `x` basis
    Diagonal,
}

impl Basis {
    pub fn symbol(self) -> char {
        match self {
            Basis::Rectilinear => '+',
            Basis::Diagonal => 'x',
        }
    }

    fn random<R: Rng>(rng: &mut R) -> Self {
        if rng.gen::<bool>() {
            Basis::Rectilinear
        } else {
            Basis::Diagonal
        }
    }
}

/// Full record of one simulated exchange. All four sequences share one length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bb84Exchange {
    /// Sender (Alice) bits, each 0 or 1
    pub alice_bits: Vec<u8>,
    /// Sender preparation bases
    pub alice_bases: Vec<Basis>,
    /// Receiver (Bob) measurement bases
    pub bob_bases: Vec<Basis>,
    /// Receiver measurement results, each 0 or 1
    pub bob_results: Vec<u8>,
}

impl Bb84Exchange {
    /// Run the prepare/measure phase for `raw_len` qubits.
    ///
    /// Bob reads Alice's bit when the bases agree; in the wrong basis his
    /// result is an independent coin flip.
    pub fn run<R: Rng>(raw_len: usize, rng: &mut R) -> Self {
        let mut alice_bits = Vec::with_capacity(raw_len);
        let mut alice_bases = Vec::with_capacity(raw_len);
        for _ in 0..raw_len {
            alice_bits.push(rng.gen_range(0..=1u8));
            alice_bases.push(Basis::random(rng));
        }

        let bob_bases: Vec<Basis> = (0..raw_len).map(|_| Basis::random(rng)).collect();

        let mut bob_results = Vec::with_capacity(raw_len);
        for i in 0..raw_len {
            if alice_bases[i] == bob_bases[i] {
                bob_results.push(alice_bits[i]);
            } else {
                bob_results.push(rng.gen_range(0..=1u8));
            }
        }

        Self {
            alice_bits,
            alice_bases,
            bob_bases,
            bob_results,
        }
    }

    /// Number of simulated qubits.
    pub fn len(&self) -> usize {
        self.alice_bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alice_bits.is_empty()
    }

    /// Alice's bits at the positions where both bases agree, in order.
    ///
    /// Bob's results are not consulted: the simulation is single-sided.
    pub fn sifted_bits(&self) -> Vec<u8> {
        self.alice_bits
            .iter()
            .zip(self.alice_bases.iter().zip(&self.bob_bases))
            .filter(|(_, (a, b))| a == b)
            .map(|(&bit, _)| bit)
            .collect()
    }
}

/// 32-byte digest of a sifted bit string.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct QkdKey([u8; QKD_KEY_BYTES]);

impl QkdKey {
    /// Hash the sifted bits, rendered as an ASCII `0`/`1` string, with SHA-256.
    ///
    /// An empty slice yields SHA-256 of the empty string.
    pub fn from_sifted_bits(bits: &[u8]) -> Self {
        let bitstring: String = bits
            .iter()
            .map(|&bit| if bit == 0 { '0' } else { '1' })
            .collect();
        Self(Sha256::digest(bitstring.as_bytes()).into())
    }

    pub fn as_bytes(&self) -> &[u8; QKD_KEY_BYTES] {
        &self.0
    }
}

impl fmt::Debug for QkdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QkdKey").finish_non_exhaustive()
    }
}

/// Result of one simulation run.
#[derive(Debug, Clone)]
pub struct QkdOutcome {
    pub key: QkdKey,
    /// Qubits simulated
    pub raw_len: usize,
    /// Bits kept after sifting
    pub sifted_bits: usize,
}

/// Run a reproducible simulation: the same seed always yields the same exchange
/// record and the same key.
pub fn simulate_bb84_seeded(raw_len: usize, seed: [u8; 32]) -> QkdOutcome {
    let mut rng = ChaCha20Rng::from_seed(seed);
    simulate_with(raw_len, &mut rng)
}

/// Run a simulation seeded from fresh entropy.
pub fn simulate_bb84(raw_len: usize) -> QkdOutcome {
    let mut rng = ChaCha20Rng::from_entropy();
    simulate_with(raw_len, &mut rng)
}

/// Generate a QKD key from `raw_len` simulated qubits.
pub fn generate_qkd_key(raw_len: usize) -> QkdKey {
    simulate_bb84(raw_len).key
}

fn simulate_with<R: Rng>(raw_len: usize, rng: &mut R) -> QkdOutcome {
    let exchange = Bb84Exchange::run(raw_len, rng);
    let sifted = exchange.sifted_bits();
    let key = QkdKey::from_sifted_bits(&sifted);

    log::debug!(
        "BB84 simulation: {} raw qubits -> {} sifted bits",
        raw_len,
        sifted.len()
    );

    QkdOutcome {
        key,
        raw_len,
        sifted_bits: sifted.len(),
    }
}
