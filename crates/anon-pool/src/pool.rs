//! pool ledger
//!
//! the single owned aggregate: commitment tree, spent set, token registry,
//! counters and the vault on top of an [`AssetBackend`].
//!
//! # deposit
//!
//! ```text
//! validate commitment ─▶ vault.receive ─▶ tree.insert_leaf ─▶ deposits += 1
//!                                              │ full
//!                                              ▼
//!                                        refund payer
//! ```
//!
//! # withdraw
//!
//! ```text
//! recipient ─▶ (token registered) ─▶ root known ─▶ not spent
//!     ─▶ mark spent, withdrawals += 1        (effects)
//!     ─▶ vault.pay                           (interaction)
//!          │ failed
//!          ▼
//!     unmark, withdrawals -= 1
//! ```
//!
//! every operation either commits entirely (and appends its events) or
//! returns an error with the pool unchanged.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::commitment::{LeafIndex, LeafInserted, MerkleAccumulator, Root};
use crate::config::PoolConfig;
use crate::error::{ConfigError, PoolError, Result};
use crate::event::PoolEvent;
use crate::hash::HashScheme;
use crate::note::{self, Commitment, Nullifier, NullifierHash, Secret};
use crate::nullifier::NullifierRegistry;
use crate::registry::{TokenInfo, TokenRegistry};
use crate::value::{Amount, Asset};
use crate::vault::{AssetBackend, AssetVault, Payout};

/// aggregate counters, as reported by `getStats`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub deposits_count: u64,
    pub withdrawals_count: u64,
    /// native currency held by the vault
    pub pool_balance: Amount,
    pub anonymity_set: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub commitment: Commitment,
    pub leaf_index: LeafIndex,
    pub root: Root,
    pub asset: Asset,
    pub amount: Amount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    pub nullifier_hash: NullifierHash,
    pub recipient: Address,
    pub asset: Asset,
    /// paid to the recipient
    pub amount: Amount,
    /// paid to the fee beneficiary (zero when none was paid)
    pub fee: Amount,
    pub fee_beneficiary: Option<Address>,
}

pub struct Pool<B> {
    config: PoolConfig,
    tree: MerkleAccumulator,
    nullifiers: NullifierRegistry,
    tokens: TokenRegistry,
    vault: AssetVault<B>,
    deposits_count: u64,
    withdrawals_count: u64,
    events: Vec<PoolEvent>,
}

impl<B: AssetBackend> Pool<B> {
    /// fresh pool settling on `backend`
    pub fn new(config: PoolConfig, backend: B) -> core::result::Result<Self, ConfigError> {
        config.validate()?;

        let tree =
            MerkleAccumulator::new(config.tree_depth, config.root_history_size, config.hash)?;
        let mut tokens = TokenRegistry::new();
        for token in &config.tokens {
            tokens.register(token.clone())?;
        }

        info!(
            "pool {} ready: depth {} ({} leaves), denomination {}, fee {}, hash {}",
            config.pool_address,
            config.tree_depth,
            tree.capacity(),
            config.deposit_amount,
            config.fee,
            config.hash
        );

        Ok(Self {
            vault: AssetVault::new(config.pool_address, backend),
            config,
            tree,
            nullifiers: NullifierRegistry::new(),
            tokens,
            deposits_count: 0,
            withdrawals_count: 0,
            events: Vec::new(),
        })
    }

    /// lock `value` of native currency (must equal the denomination) behind `commitment`
    pub fn deposit(
        &mut self,
        payer: &Address,
        commitment: Commitment,
        value: Amount,
    ) -> Result<DepositReceipt> {
        let amount = self.config.deposit_amount;
        self.deposit_asset(payer, commitment, Asset::Native, amount, value)
            .inspect_err(|e| warn!("deposit from {} rejected: {}", payer, e))
    }

    /// lock `amount` of a registered token, pulled through the pool's allowance
    pub fn deposit_token(
        &mut self,
        payer: &Address,
        commitment: Commitment,
        token: &Address,
        amount: Amount,
    ) -> Result<DepositReceipt> {
        self.require_token(token)
            .and_then(|()| {
                self.deposit_asset(payer, commitment, Asset::Token(*token), amount, Amount::ZERO)
            })
            .inspect_err(|e| warn!("token deposit from {} rejected: {}", payer, e))
    }

    fn deposit_asset(
        &mut self,
        payer: &Address,
        commitment: Commitment,
        asset: Asset,
        amount: Amount,
        attached: Amount,
    ) -> Result<DepositReceipt> {
        self.check_commitment(&commitment)?;
        self.vault.receive(payer, &asset, amount, attached)?;

        let inserted = match self.tree.insert_leaf(commitment) {
            Ok(inserted) => inserted,
            Err(e) => {
                self.refund(payer, asset, amount)?;
                return Err(e);
            }
        };
        self.deposits_count += 1;

        info!(
            "deposit {} {} -> leaf {} (root {})",
            amount, asset, inserted.leaf_index, inserted.root
        );

        self.events.push(leaf_event(&inserted));
        self.events.push(PoolEvent::Deposit {
            commitment,
            leaf_index: inserted.leaf_index,
            amount,
            asset,
        });

        Ok(DepositReceipt {
            commitment,
            leaf_index: inserted.leaf_index,
            root: inserted.root,
            asset,
            amount,
        })
    }

    /// hand back funds received for a deposit that could not be inserted
    fn refund(&mut self, payer: &Address, asset: Asset, amount: Amount) -> Result<()> {
        self.vault
            .pay(&[Payout::new(*payer, asset, amount)])
            .inspect(|_| debug!("refunded {} {} to {}", amount, asset, payer))
            .inspect_err(|e| warn!("refund of {} {} to {} failed: {}", amount, asset, payer, e))
    }

    /// append a commitment without moving funds (token flow where the
    /// transfer to the pool happened separately). not counted as a deposit.
    pub fn insert_leaf(&mut self, commitment: Commitment) -> Result<LeafInserted> {
        let inserted = self
            .tree
            .insert_leaf(commitment)
            .inspect_err(|e| warn!("insert leaf rejected: {}", e))?;
        self.events.push(leaf_event(&inserted));
        Ok(inserted)
    }

    /// native withdrawal: recipient gets `deposit_amount - fee`, the fee goes
    /// to `fee_beneficiary` or stays in the pool when there is none
    pub fn withdraw(
        &mut self,
        nullifier_hash: NullifierHash,
        recipient: &Address,
        root: &Root,
        fee_beneficiary: Option<Address>,
    ) -> Result<WithdrawalReceipt> {
        self.withdraw_native(nullifier_hash, recipient, root, fee_beneficiary)
            .inspect_err(|e| warn!("withdrawal to {} rejected: {}", recipient, e))
    }

    fn withdraw_native(
        &mut self,
        nullifier_hash: NullifierHash,
        recipient: &Address,
        root: &Root,
        fee_beneficiary: Option<Address>,
    ) -> Result<WithdrawalReceipt> {
        self.check_recipient(recipient)?;
        self.check_spendable(&nullifier_hash, root)?;

        let amount = self.config.payout_amount();
        let beneficiary = fee_beneficiary.filter(|a| !a.is_zero());
        let fee = match beneficiary {
            Some(_) => self.config.fee,
            None => Amount::ZERO,
        };

        let mut payouts = vec![Payout::new(*recipient, Asset::Native, amount)];
        if let Some(to) = beneficiary {
            payouts.push(Payout::new(to, Asset::Native, fee));
        }
        self.settle(nullifier_hash, &payouts)?;

        info!("withdrawal {} to {} (fee {})", amount, recipient, fee);
        self.events.push(PoolEvent::Withdrawal {
            to: *recipient,
            nullifier_hash,
            amount,
            fee,
            fee_beneficiary: beneficiary,
        });

        Ok(WithdrawalReceipt {
            nullifier_hash,
            recipient: *recipient,
            asset: Asset::Native,
            amount,
            fee,
            fee_beneficiary: beneficiary,
        })
    }

    /// token withdrawal: pays the caller-supplied amount in full, no fee
    pub fn withdraw_tokens(
        &mut self,
        nullifier_hash: NullifierHash,
        recipient: &Address,
        root: &Root,
        token: &Address,
        amount: Amount,
    ) -> Result<WithdrawalReceipt> {
        self.withdraw_token(nullifier_hash, recipient, root, token, amount)
            .inspect_err(|e| warn!("token withdrawal to {} rejected: {}", recipient, e))
    }

    fn withdraw_token(
        &mut self,
        nullifier_hash: NullifierHash,
        recipient: &Address,
        root: &Root,
        token: &Address,
        amount: Amount,
    ) -> Result<WithdrawalReceipt> {
        self.check_recipient(recipient)?;
        self.require_token(token)?;
        self.check_spendable(&nullifier_hash, root)?;

        let asset = Asset::Token(*token);
        self.settle(nullifier_hash, &[Payout::new(*recipient, asset, amount)])?;

        info!("token withdrawal {} {} to {}", amount, asset, recipient);
        self.events.push(PoolEvent::TokenWithdrawal {
            to: *recipient,
            nullifier_hash,
            token: *token,
            amount,
        });

        Ok(WithdrawalReceipt {
            nullifier_hash,
            recipient: *recipient,
            asset,
            amount,
            fee: Amount::ZERO,
            fee_beneficiary: None,
        })
    }

    /// stage the spend, pay, and commit or revert the stage
    fn settle(&mut self, nullifier_hash: NullifierHash, payouts: &[Payout]) -> Result<()> {
        self.nullifiers.mark_spent(nullifier_hash)?;
        self.withdrawals_count += 1;

        if let Err(e) = self.vault.pay(payouts) {
            self.nullifiers.unmark(&nullifier_hash);
            self.withdrawals_count -= 1;
            debug!("payout for {} failed, spend reverted", nullifier_hash);
            return Err(e);
        }
        Ok(())
    }

    fn check_commitment(&self, commitment: &Commitment) -> Result<()> {
        if self.tree.is_full() {
            return Err(PoolError::CapacityExceeded {
                capacity: self.tree.capacity(),
            });
        }
        if commitment.0.is_zero() {
            return Err(PoolError::InvalidCommitment);
        }
        if self.tree.contains(commitment) {
            return Err(PoolError::DuplicateCommitment);
        }
        Ok(())
    }

    /// the pool paying itself would count a withdrawal without moving value
    fn check_recipient(&self, recipient: &Address) -> Result<()> {
        if recipient.is_zero() || *recipient == self.address() {
            return Err(PoolError::InvalidRecipient);
        }
        Ok(())
    }

    fn check_spendable(&self, nullifier_hash: &NullifierHash, root: &Root) -> Result<()> {
        if !self.tree.is_known_root(root) {
            return Err(PoolError::UnknownRoot);
        }
        if self.nullifiers.is_spent(nullifier_hash) {
            return Err(PoolError::AlreadySpent);
        }
        Ok(())
    }

    fn require_token(&self, token: &Address) -> Result<()> {
        if !self.tokens.is_registered(token) {
            return Err(PoolError::UnregisteredToken(*token));
        }
        Ok(())
    }

    /// add a token to the registry
    pub fn register_token(&mut self, info: TokenInfo) -> Result<()> {
        self.tokens
            .register(info.clone())
            .inspect_err(|e| warn!("token registration rejected: {}", e))?;
        info!("registered token {} ({})", info.symbol, info.address);
        self.events.push(PoolEvent::TokenRegistered { token: info });
        Ok(())
    }

    /// `H(secret, nullifier)` under this pool's hash
    pub fn generate_commitment(&self, secret: &Secret, nullifier: &Nullifier) -> Commitment {
        note::generate_commitment(&self.hasher(), secret, nullifier)
    }

    /// `H(nullifier, 0)` under this pool's hash
    pub fn generate_nullifier_hash(&self, nullifier: &Nullifier) -> NullifierHash {
        note::generate_nullifier_hash(&self.hasher(), nullifier)
    }

    /// the `nullifierHashes[h]` lookup
    pub fn is_spent(&self, nullifier_hash: &NullifierHash) -> bool {
        self.nullifiers.is_spent(nullifier_hash)
    }

    pub fn is_known_root(&self, root: &Root) -> bool {
        self.tree.is_known_root(root)
    }

    pub fn get_stats(&self) -> PoolStats {
        PoolStats {
            deposits_count: self.deposits_count,
            withdrawals_count: self.withdrawals_count,
            pool_balance: self.vault.balance(&Asset::Native),
            anonymity_set: self.deposits_count,
        }
    }

    pub fn get_latest_root(&self) -> Root {
        self.tree.current_root()
    }

    /// vault holding of any asset
    pub fn balance(&self, asset: &Asset) -> Amount {
        self.vault.balance(asset)
    }

    pub fn hasher(&self) -> HashScheme {
        self.tree.hasher()
    }

    pub fn address(&self) -> Address {
        self.vault.address()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn tree(&self) -> &MerkleAccumulator {
        &self.tree
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    pub fn nullifiers(&self) -> &NullifierRegistry {
        &self.nullifiers
    }

    /// committed events, oldest first
    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    /// hand the buffered events to an observer
    pub fn drain_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn backend(&self) -> &B {
        self.vault.backend()
    }

    /// the chain itself: other accounts act on it directly
    pub fn backend_mut(&mut self) -> &mut B {
        self.vault.backend_mut()
    }

    pub fn into_backend(self) -> B {
        self.vault.into_backend()
    }
}

fn leaf_event(inserted: &LeafInserted) -> PoolEvent {
    PoolEvent::LeafInserted {
        leaf_index: inserted.leaf_index,
        commitment: inserted.commitment,
        root: inserted.root,
    }
}

impl<B> core::fmt::Debug for Pool<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pool")
            .field("address", &self.config.pool_address)
            .field("leaves", &self.tree.len())
            .field("root", &self.tree.current_root())
            .field("deposits_count", &self.deposits_count)
            .field("withdrawals_count", &self.withdrawals_count)
            .finish_non_exhaustive()
    }
}
