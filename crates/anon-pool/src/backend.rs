//! in-memory chain
//!
//! native balances, token balances, token allowances and a set of accounts
//! that refuse native transfers. used by tests and the cli simulator.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::address::Address;
use crate::error::TransferError;
use crate::value::{Amount, Asset};
use crate::vault::{AssetBackend, Payout};

#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    balances: HashMap<(Asset, Address), Amount>,
    /// (token, owner, spender) -> remaining allowance
    allowances: HashMap<(Address, Address, Address), Amount>,
    rejects_native: HashSet<Address>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// credit native currency out of thin air (genesis / faucet)
    pub fn mint_native(&mut self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        self.mint(Asset::Native, to, amount)
    }

    pub fn mint_token(
        &mut self,
        token: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.mint(Asset::Token(*token), to, amount)
    }

    fn mint(&mut self, asset: Asset, to: &Address, amount: Amount) -> Result<(), TransferError> {
        let balance = self.balance_of(to, &asset);
        let updated = balance.checked_add(amount).ok_or(TransferError::Overflow)?;
        self.balances.insert((asset, *to), updated);
        Ok(())
    }

    /// erc20-style approve: overwrite the allowance
    pub fn approve(&mut self, token: &Address, owner: &Address, spender: &Address, amount: Amount) {
        self.allowances.insert((*token, *owner, *spender), amount);
    }

    pub fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*token, *owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    /// plain transfer signed by `from`
    pub fn transfer(
        &mut self,
        asset: &Asset,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.apply(from, &[Payout::new(*to, *asset, amount)])
    }

    /// mark `account` as unable to receive native currency (or clear it)
    pub fn set_rejects_native(&mut self, account: &Address, rejects: bool) {
        if rejects {
            self.rejects_native.insert(*account);
        } else {
            self.rejects_native.remove(account);
        }
    }

    /// all non-zero balances, for inspection
    pub fn balances(&self) -> impl Iterator<Item = (&Asset, &Address, &Amount)> {
        self.balances
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|((asset, owner), amount)| (asset, owner, amount))
    }

    /// stage every payout against a scratch view, then write back in one go
    fn apply(&mut self, from: &Address, payouts: &[Payout]) -> Result<(), TransferError> {
        let mut staged: HashMap<(Asset, Address), Amount> = HashMap::new();

        for payout in payouts {
            if payout.asset.is_native() && self.rejects_native.contains(&payout.to) {
                return Err(TransferError::Rejected { to: payout.to });
            }

            let debit_key = (payout.asset, *from);
            let available = staged
                .get(&debit_key)
                .copied()
                .unwrap_or_else(|| self.balance_of(from, &payout.asset));
            let remaining =
                available
                    .checked_sub(payout.amount)
                    .ok_or(TransferError::InsufficientBalance {
                        owner: *from,
                        required: payout.amount,
                        available,
                    })?;
            staged.insert(debit_key, remaining);

            let credit_key = (payout.asset, payout.to);
            let current = staged
                .get(&credit_key)
                .copied()
                .unwrap_or_else(|| self.balance_of(&payout.to, &payout.asset));
            let credited = current
                .checked_add(payout.amount)
                .ok_or(TransferError::Overflow)?;
            staged.insert(credit_key, credited);
        }

        self.balances.extend(staged);
        Ok(())
    }
}

impl AssetBackend for MemoryBackend {
    fn balance_of(&self, owner: &Address, asset: &Asset) -> Amount {
        self.balances
            .get(&(*asset, *owner))
            .copied()
            .unwrap_or_default()
    }

    fn pull(
        &mut self,
        asset: &Asset,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        match asset {
            Asset::Native => self.apply(from, &[Payout::new(*to, *asset, amount)]),
            Asset::Token(token) => {
                let allowance = self.allowance(token, from, to);
                let remaining =
                    allowance
                        .checked_sub(amount)
                        .ok_or(TransferError::InsufficientAllowance {
                            required: amount,
                            available: allowance,
                        })?;
                self.apply(from, &[Payout::new(*to, *asset, amount)])?;
                self.allowances.insert((*token, *from, *to), remaining);
                debug!("transferFrom {} {} -> {} ({})", amount, from, to, asset);
                Ok(())
            }
        }
    }

    fn push(&mut self, from: &Address, payouts: &[Payout]) -> Result<(), TransferError> {
        self.apply(from, payouts)
    }
}
