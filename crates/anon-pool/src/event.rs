//! pool events
//!
//! observable log records, emitted in order and only for operations that
//! committed. a rejected call leaves no trace here.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::commitment::{LeafIndex, Root};
use crate::note::{Commitment, NullifierHash};
use crate::registry::TokenInfo;
use crate::value::{Amount, Asset};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    /// funds locked behind a commitment
    Deposit {
        commitment: Commitment,
        leaf_index: LeafIndex,
        amount: Amount,
        asset: Asset,
    },
    LeafInserted {
        leaf_index: LeafIndex,
        commitment: Commitment,
        root: Root,
    },
    /// native payout; `fee` went to `fee_beneficiary` if one was set
    Withdrawal {
        to: Address,
        nullifier_hash: NullifierHash,
        amount: Amount,
        fee: Amount,
        fee_beneficiary: Option<Address>,
    },
    TokenWithdrawal {
        to: Address,
        nullifier_hash: NullifierHash,
        token: Address,
        amount: Amount,
    },
    TokenRegistered { token: TokenInfo },
}

impl PoolEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PoolEvent::Deposit { .. } => "Deposit",
            PoolEvent::LeafInserted { .. } => "LeafInserted",
            PoolEvent::Withdrawal { .. } => "Withdrawal",
            PoolEvent::TokenWithdrawal { .. } => "TokenWithdrawal",
            PoolEvent::TokenRegistered { .. } => "TokenRegistered",
        }
    }
}
