//! value types for the pool
//!
//! an [`Asset`] says what moves, an [`Amount`] says how much (in base units)

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// asset descriptor: native currency or a fungible token contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    Native,
    Token(Address),
}

impl Asset {
    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }

    /// token contract address, if any
    pub fn token(&self) -> Option<Address> {
        match self {
            Asset::Native => None,
            Asset::Token(address) => Some(*address),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Token(address) => write!(f, "token:{}", address),
        }
    }
}

/// amount in base units (wei-style, u128)
///
/// json: a plain number up to `u64::MAX`, a decimal string above that
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(amount: u128) -> Self {
        Self(amount)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_mul(self, factor: u128) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match u64::try_from(self.0) {
            Ok(small) => serializer.serialize_u64(small),
            Err(_) => serializer.collect_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> serde::de::Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a decimal string")
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount(v as u128))
    }

    fn visit_u128<E: serde::de::Error>(self, v: u128) -> Result<Amount, E> {
        Ok(Amount(v))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Amount, E> {
        u128::try_from(v)
            .map(Amount)
            .map_err(|_| E::custom(format!("negative amount {}", v)))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse::<u128>()
            .map(Amount)
            .map_err(|_| E::custom(format!("invalid amount `{}`", v)))
    }
}

impl From<u128> for Amount {
    fn from(v: u128) -> Self {
        Self(v)
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Self(v as u128)
    }
}

impl From<Amount> for u128 {
    fn from(v: Amount) -> Self {
        v.0
    }
}
