//! registered tokens
//!
//! token deposits and withdrawals are only accepted for contracts known to
//! the pool. metadata mirrors what the token contract reports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::RegistryError;

/// erc20 decimals cap
pub const MAX_DECIMALS: u8 = 18;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub fn new(
        address: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
    ) -> Self {
        Self {
            address,
            name: name.into(),
            symbol: symbol.into(),
            decimals,
        }
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.address.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        if self.name.trim().is_empty() || self.symbol.trim().is_empty() {
            return Err(RegistryError::EmptyMetadata);
        }
        if self.decimals > MAX_DECIMALS {
            return Err(RegistryError::InvalidDecimals(self.decimals));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct TokenRegistry {
    tokens: BTreeMap<Address, TokenInfo>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, info: TokenInfo) -> Result<(), RegistryError> {
        info.validate()?;
        if self.tokens.contains_key(&info.address) {
            return Err(RegistryError::AlreadyRegistered(info.address));
        }
        self.tokens.insert(info.address, info);
        Ok(())
    }

    pub fn get(&self, token: &Address) -> Option<&TokenInfo> {
        self.tokens.get(token)
    }

    pub fn is_registered(&self, token: &Address) -> bool {
        self.tokens.contains_key(token)
    }

    /// ordered by address
    pub fn iter(&self) -> impl Iterator<Item = &TokenInfo> {
        self.tokens.values()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
