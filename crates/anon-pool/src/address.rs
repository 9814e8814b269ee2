//! account addresses
//!
//! 20-byte account identifiers, written as `0x`-prefixed hex

use core::fmt;
use core::str::FromStr;

use crate::encoding::{decode_fixed, encode_prefixed, impl_hex_serde};
use crate::error::HexError;

/// account address (recipient, payer, token contract, pool)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// the null address; never a valid recipient
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 20] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// deterministic address from a label (simulation accounts, default pool address)
    pub fn derive(label: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"anon-pool.address.v1");
        hasher.update(label);
        let hash = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.as_bytes()[12..]);
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_prefixed(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<20>(s).map(Self)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl_hex_serde!(Address);
