//! pool configuration
//!
//! construction-time constants of a pool (tree depth, denomination, fee,
//! hash construction). loaded from json; missing keys take the defaults.
//!
//! ```json
//! {
//!   "tree_depth": 10,
//!   "root_history_size": 30,
//!   "deposit_amount": 1000000000000000,
//!   "fee": 100000000000000,
//!   "hash": "poseidon",
//!   "tokens": [
//!     { "address": "0x…", "name": "USD Coin", "symbol": "USDC", "decimals": 6 }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::commitment::MAX_TREE_DEPTH;
use crate::error::ConfigError;
use crate::hash::HashScheme;
use crate::registry::TokenInfo;
use crate::value::Amount;

pub const DEFAULT_TREE_DEPTH: u8 = 10;
pub const DEFAULT_ROOT_HISTORY_SIZE: usize = 30;
/// 0.001 native units at 18 decimals
pub const DEFAULT_DEPOSIT_AMOUNT: Amount = Amount(1_000_000_000_000_000);
/// 0.0001 native units at 18 decimals
pub const DEFAULT_FEE: Amount = Amount(100_000_000_000_000);

/// label the default pool address is derived from
const DEFAULT_POOL_LABEL: &[u8] = b"anon-pool.vault";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// account holding the pool's funds on the backend
    pub pool_address: Address,
    pub tree_depth: u8,
    /// how many recent roots a withdrawal may reference
    pub root_history_size: usize,
    /// fixed native denomination
    pub deposit_amount: Amount,
    /// withheld from native withdrawals
    pub fee: Amount,
    pub hash: HashScheme,
    /// registered at construction
    pub tokens: Vec<TokenInfo>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_address: Address::derive(DEFAULT_POOL_LABEL),
            tree_depth: DEFAULT_TREE_DEPTH,
            root_history_size: DEFAULT_ROOT_HISTORY_SIZE,
            deposit_amount: DEFAULT_DEPOSIT_AMOUNT,
            fee: DEFAULT_FEE,
            hash: HashScheme::default(),
            tokens: Vec::new(),
        }
    }
}

impl PoolConfig {
    /// read and validate a json config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tree_depth == 0 || self.tree_depth > MAX_TREE_DEPTH {
            return Err(ConfigError::InvalidTreeDepth(self.tree_depth));
        }
        if self.root_history_size == 0 {
            return Err(ConfigError::InvalidRootHistorySize);
        }
        if self.deposit_amount.is_zero() {
            return Err(ConfigError::InvalidDepositAmount);
        }
        if self.fee > self.deposit_amount {
            return Err(ConfigError::FeeExceedsDeposit {
                fee: self.fee,
                deposit: self.deposit_amount,
            });
        }
        if self.pool_address.is_zero() {
            return Err(ConfigError::ZeroPoolAddress);
        }
        for token in &self.tokens {
            token.validate()?;
        }
        Ok(())
    }

    /// number of leaves the tree can hold
    pub fn capacity(&self) -> u64 {
        1u64 << self.tree_depth.min(MAX_TREE_DEPTH)
    }

    /// what a native withdrawal pays the recipient
    pub fn payout_amount(&self) -> Amount {
        self.deposit_amount.saturating_sub(self.fee)
    }
}
