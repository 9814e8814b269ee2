//! simplified poseidon permutation over the bn254 scalar field
//!
//! ## parameters
//!
//! - state width: 3 (capacity 1, rate 2) for 2:1 compression
//! - rounds: 4 full + 57 partial + 4 full
//! - s-box: x^5
//! - round constants: SHAKE128 over `anon-pool.poseidon.rc.v1`, 64 bytes per
//!   constant reduced mod p (nothing-up-my-sleeve, reproducible)
//! - mds: cauchy matrix `M[i][j] = 1 / (x[i] + y[j])`, x = (0, 1, 2), y = (3, 4, 5)
//!
//! `hash2(a, b)` absorbs `(0, a, b)`, permutes, and squeezes `state[0]`.
//! inputs at or above p are reduced first; outputs are always canonical.

use std::sync::OnceLock;

use num_bigint::BigUint;
use num_traits::Zero;
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake128,
};

use crate::hash::{Field, HashFunction};

/// bn254 scalar field modulus, big-endian
pub const MODULUS: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29, 0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58, 0x5d,
    0x28, 0x33, 0xe8, 0x48, 0x79, 0xb9, 0x70, 0x91, 0x43, 0xe1, 0xf5, 0x93, 0xf0, 0x00, 0x00, 0x01,
];

pub const WIDTH: usize = 3;
pub const FULL_ROUNDS: usize = 8;
pub const PARTIAL_ROUNDS: usize = 57;
pub const ALPHA: u32 = 5;

const RC_DOMAIN: &[u8] = b"anon-pool.poseidon.rc.v1";

static PARAMS: OnceLock<PoseidonParams> = OnceLock::new();

/// permutation constants, derived once per process
pub struct PoseidonParams {
    pub modulus: BigUint,
    /// `(FULL_ROUNDS + PARTIAL_ROUNDS) * WIDTH` constants, row-major by round
    pub round_constants: Vec<BigUint>,
    pub mds: [[BigUint; WIDTH]; WIDTH],
}

impl PoseidonParams {
    pub fn get() -> &'static PoseidonParams {
        PARAMS.get_or_init(Self::generate)
    }

    fn generate() -> Self {
        let modulus = BigUint::from_bytes_be(&MODULUS);
        let round_constants = Self::round_constants(&modulus);
        let mds = Self::cauchy_mds(&modulus);
        Self {
            modulus,
            round_constants,
            mds,
        }
    }

    fn round_constants(modulus: &BigUint) -> Vec<BigUint> {
        let count = (FULL_ROUNDS + PARTIAL_ROUNDS) * WIDTH;

        let mut hasher = Shake128::default();
        hasher.update(RC_DOMAIN);
        let mut reader = hasher.finalize_xof();

        // 512 bits per constant keeps the reduction bias negligible
        let mut buf = [0u8; 64];
        (0..count)
            .map(|_| {
                reader.read(&mut buf);
                BigUint::from_bytes_be(&buf) % modulus
            })
            .collect()
    }

    fn cauchy_mds(modulus: &BigUint) -> [[BigUint; WIDTH]; WIDTH] {
        let xs = [0u32, 1, 2];
        let ys = [3u32, 4, 5];
        let exp = modulus.clone() - 2u32;
        core::array::from_fn(|i| {
            core::array::from_fn(|j| {
                let denom = BigUint::from(xs[i] + ys[j]);
                // fermat inverse, p prime
                denom.modpow(&exp, modulus)
            })
        })
    }

    fn is_full_round(round: usize) -> bool {
        let half = FULL_ROUNDS / 2;
        round < half || round >= half + PARTIAL_ROUNDS
    }

    /// apply the permutation in place
    pub fn permute(&self, state: &mut [BigUint; WIDTH]) {
        let p = &self.modulus;
        let alpha = BigUint::from(ALPHA);

        for round in 0..FULL_ROUNDS + PARTIAL_ROUNDS {
            for (i, s) in state.iter_mut().enumerate() {
                *s = (&*s + &self.round_constants[round * WIDTH + i]) % p;
            }

            if Self::is_full_round(round) {
                for s in state.iter_mut() {
                    *s = s.modpow(&alpha, p);
                }
            } else {
                state[0] = state[0].modpow(&alpha, p);
            }

            let mixed: [BigUint; WIDTH] = core::array::from_fn(|i| {
                let mut acc = BigUint::zero();
                for (m, s) in self.mds[i].iter().zip(state.iter()) {
                    acc += m * s;
                }
                acc % p
            });
            *state = mixed;
        }
    }

    pub fn to_element(&self, field: &Field) -> BigUint {
        BigUint::from_bytes_be(&field.0) % &self.modulus
    }

    pub fn from_element(element: &BigUint) -> Field {
        let bytes = element.to_bytes_be();
        let mut out = [0u8; 32];
        // canonical elements are < 2^254, so this never truncates
        let start = 32usize.saturating_sub(bytes.len());
        out[start..].copy_from_slice(&bytes[bytes.len().saturating_sub(32)..]);
        Field(out)
    }
}

/// poseidon two-to-one hash
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Poseidon;

impl HashFunction for Poseidon {
    fn hash2(&self, left: &Field, right: &Field) -> Field {
        let params = PoseidonParams::get();
        let mut state = [
            BigUint::zero(),
            params.to_element(left),
            params.to_element(right),
        ];
        params.permute(&mut state);
        PoseidonParams::from_element(&state[0])
    }
}
