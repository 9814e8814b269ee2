//! error types for anon-pool

use std::path::PathBuf;

use thiserror::Error;

use crate::address::Address;
use crate::value::Amount;

pub type Result<T> = std::result::Result<T, PoolError>;

/// why a pool operation was rejected
///
/// every variant leaves the pool exactly as it was before the call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("merkle tree is full ({capacity} leaves)")]
    CapacityExceeded { capacity: u64 },

    #[error("amount mismatch: expected {expected}, got {actual}")]
    AmountMismatch { expected: Amount, actual: Amount },

    #[error("transfer failed: {0}")]
    TransferFailed(#[source] TransferError),

    #[error("insufficient allowance: need {required}, approved {available}")]
    InsufficientAllowance { required: Amount, available: Amount },

    #[error("unknown merkle root")]
    UnknownRoot,

    #[error("nullifier hash already spent")]
    AlreadySpent,

    #[error("invalid recipient")]
    InvalidRecipient,

    #[error("commitment must be non-zero")]
    InvalidCommitment,

    #[error("commitment already present in tree")]
    DuplicateCommitment,

    #[error("token {0} is not registered")]
    UnregisteredToken(Address),

    #[error("token registry: {0}")]
    Registry(#[from] RegistryError),
}

impl From<TransferError> for PoolError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::InsufficientAllowance { required, available } => {
                PoolError::InsufficientAllowance { required, available }
            }
            other => PoolError::TransferFailed(other),
        }
    }
}

/// failure reported by an asset backend (the external chain)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("recipient {to} rejected the transfer")]
    Rejected { to: Address },

    #[error("{owner} holds {available}, needs {required}")]
    InsufficientBalance {
        owner: Address,
        required: Amount,
        available: Amount,
    },

    #[error("allowance {available} below {required}")]
    InsufficientAllowance { required: Amount, available: Amount },

    #[error("balance overflow")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("token address must be non-zero")]
    ZeroAddress,

    #[error("token {0} already registered")]
    AlreadyRegistered(Address),

    #[error("token name and symbol must be non-empty")]
    EmptyMetadata,

    #[error("invalid decimals {0} (max 18)")]
    InvalidDecimals(u8),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("tree depth {0} out of range (1..=32)")]
    InvalidTreeDepth(u8),

    #[error("root history size must be at least 1")]
    InvalidRootHistorySize,

    #[error("deposit amount must be non-zero")]
    InvalidDepositAmount,

    #[error("fee {fee} exceeds deposit amount {deposit}")]
    FeeExceedsDeposit { fee: Amount, deposit: Amount },

    #[error("pool address must be non-zero")]
    ZeroPoolAddress,

    #[error("token registry: {0}")]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HexError {
    #[error("invalid hex: {0}")]
    Invalid(#[from] hex::FromHexError),

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoteParseError {
    #[error("note must start with `{0}`")]
    MissingPrefix(&'static str),

    #[error("malformed note body: {0}")]
    Body(#[from] HexError),
}
