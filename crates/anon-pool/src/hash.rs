//! two-input hash used for commitments, nullifier hashes and tree nodes
//!
//! every 256-bit value in the pool is a [`Field`]: 32 bytes, big-endian.
//! the construction is selected once per pool through [`HashScheme`];
//! commitments, nullifier hashes and merkle nodes all go through the same one.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::encoding::{decode_fixed, encode_prefixed, impl_hex_serde};
use crate::error::HexError;
use crate::poseidon::Poseidon;

/// domain separator for the blake3 construction
pub const BLAKE3_DOMAIN: &[u8] = b"anon-pool.hash.v1";

/// placeholder leaf filling every empty slot of the tree
pub const ZERO_LEAF: Field = Field([0u8; 32]);

/// 256-bit word (big-endian)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Field(pub [u8; 32]);

impl Field {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn from_u64(v: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&v.to_be_bytes());
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_prefixed(&self.0))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({})", self)
    }
}

impl FromStr for Field {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<32>(s).map(Self)
    }
}

impl AsRef<[u8]> for Field {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl_hex_serde!(Field);

/// deterministic two-to-one hash
pub trait HashFunction {
    fn hash2(&self, left: &Field, right: &Field) -> Field;

    /// single-input form, `hash2(input, 0)`
    fn hash1(&self, input: &Field) -> Field {
        self.hash2(input, &Field::ZERO)
    }
}

/// blake3 over `domain || left || right`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blake3;

impl HashFunction for Blake3 {
    fn hash2(&self, left: &Field, right: &Field) -> Field {
        let mut hasher = blake3::Hasher::new();
        hasher.update(BLAKE3_DOMAIN);
        hasher.update(&left.0);
        hasher.update(&right.0);
        Field(*hasher.finalize().as_bytes())
    }
}

/// construction selected at pool construction time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashScheme {
    /// simplified poseidon over the bn254 scalar field
    #[default]
    Poseidon,
    Blake3,
}

impl HashFunction for HashScheme {
    fn hash2(&self, left: &Field, right: &Field) -> Field {
        match self {
            HashScheme::Poseidon => Poseidon.hash2(left, right),
            HashScheme::Blake3 => Blake3.hash2(left, right),
        }
    }
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashScheme::Poseidon => write!(f, "poseidon"),
            HashScheme::Blake3 => write!(f, "blake3"),
        }
    }
}

impl FromStr for HashScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "poseidon" => Ok(HashScheme::Poseidon),
            "blake3" => Ok(HashScheme::Blake3),
            other => Err(format!("unknown hash scheme `{}` (poseidon, blake3)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_text_roundtrip() {
        let f = Field::from_u64(0x0102);
        let text = f.to_string();
        assert_eq!(text.len(), 66);
        assert!(text.ends_with("0102"));
        assert_eq!(text.parse::<Field>().unwrap(), f);
        assert!("0x01".parse::<Field>().is_err());
    }

    #[test]
    fn test_hash1_is_hash2_with_zero() {
        let x = Field::from_u64(7);
        for scheme in [HashScheme::Poseidon, HashScheme::Blake3] {
            assert_eq!(scheme.hash1(&x), scheme.hash2(&x, &Field::ZERO));
        }
    }

    #[test]
    fn test_schemes_differ() {
        let a = Field::from_u64(1);
        let b = Field::from_u64(2);
        assert_ne!(
            HashScheme::Poseidon.hash2(&a, &b),
            HashScheme::Blake3.hash2(&a, &b)
        );
        // not symmetric
        assert_ne!(Blake3.hash2(&a, &b), Blake3.hash2(&b, &a));
    }

    #[test]
    fn test_scheme_parse() {
        assert_eq!("Poseidon".parse::<HashScheme>().unwrap(), HashScheme::Poseidon);
        assert_eq!("blake3".parse::<HashScheme>().unwrap(), HashScheme::Blake3);
        assert!("sha256".parse::<HashScheme>().is_err());
        assert_eq!(serde_json::to_string(&HashScheme::Blake3).unwrap(), "\"blake3\"");
    }
}
