//! scripted simulation against an in-memory chain
//!
//! a script is a json array of steps. accounts and tokens are either
//! `0x`-hex addresses or plain labels (`"alice"`), which map to a
//! deterministic address. notes are named; the first deposit under a name
//! draws a fresh note from the seeded rng.
//!
//! ```json
//! [
//!   { "op": "fund", "account": "alice", "amount": 5000000000000000 },
//!   { "op": "deposit", "from": "alice", "note": "n1" },
//!   { "op": "withdraw", "note": "n1", "to": "bob", "relayer": "relayer" },
//!   { "op": "stats" }
//! ]
//! ```

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use anon_pool::{
    Address, Amount, Asset, AssetBackend, DepositNote, DepositReceipt, LeafInserted, MemoryBackend,
    Pool, PoolConfig, PoolEvent, PoolStats, Root, TokenInfo, WithdrawalReceipt,
};

/// account or token reference: hex address or label
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AccountRef(pub String);

impl AccountRef {
    pub fn resolve(&self) -> Address {
        self.0
            .parse()
            .unwrap_or_else(|_| Address::derive(self.0.as_bytes()))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// credit native currency
    Fund { account: AccountRef, amount: Amount },
    /// credit a token balance
    Mint {
        token: AccountRef,
        account: AccountRef,
        amount: Amount,
    },
    /// let the pool pull `amount` of `token` from `owner`
    Approve {
        token: AccountRef,
        owner: AccountRef,
        amount: Amount,
    },
    /// plain token transfer into the pool (pairs with `insert_leaf`)
    TransferToPool {
        token: AccountRef,
        from: AccountRef,
        amount: Amount,
    },
    RegisterToken {
        token: AccountRef,
        name: String,
        symbol: String,
        decimals: u8,
    },
    /// native deposit; `value` defaults to the denomination
    Deposit {
        from: AccountRef,
        note: String,
        #[serde(default)]
        value: Option<Amount>,
    },
    DepositToken {
        from: AccountRef,
        note: String,
        token: AccountRef,
        amount: Amount,
    },
    InsertLeaf { note: String },
    /// native withdrawal; `root` defaults to the latest
    Withdraw {
        note: String,
        to: AccountRef,
        #[serde(default)]
        root: Option<Root>,
        #[serde(default)]
        relayer: Option<AccountRef>,
    },
    WithdrawTokens {
        note: String,
        to: AccountRef,
        token: AccountRef,
        amount: Amount,
        #[serde(default)]
        root: Option<Root>,
    },
    Stats,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Fund { .. } => "fund",
            Step::Mint { .. } => "mint",
            Step::Approve { .. } => "approve",
            Step::TransferToPool { .. } => "transfer_to_pool",
            Step::RegisterToken { .. } => "register_token",
            Step::Deposit { .. } => "deposit",
            Step::DepositToken { .. } => "deposit_token",
            Step::InsertLeaf { .. } => "insert_leaf",
            Step::Withdraw { .. } => "withdraw",
            Step::WithdrawTokens { .. } => "withdraw_tokens",
            Step::Stats => "stats",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Balance {
        account: Address,
        asset: Asset,
        balance: Amount,
    },
    Allowance {
        owner: Address,
        spender: Address,
        token: Address,
        allowance: Amount,
    },
    TokenRegistered(TokenInfo),
    Deposited {
        note: String,
        receipt: DepositReceipt,
    },
    LeafInserted(LeafInserted),
    Withdrawn(WithdrawalReceipt),
    Stats(PoolStats),
}

/// one line of output per step
#[derive(Debug, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub stats: PoolStats,
    pub latest_root: Root,
    pub leaves: u64,
    pub events: &'a [PoolEvent],
}

pub struct Simulator {
    pool: Pool<MemoryBackend>,
    notes: HashMap<String, DepositNote>,
    rng: ChaCha20Rng,
}

impl Simulator {
    pub fn new(config: PoolConfig, seed: u64) -> Result<Self> {
        Ok(Self {
            pool: Pool::new(config, MemoryBackend::new())?,
            notes: HashMap::new(),
            rng: ChaCha20Rng::seed_from_u64(seed),
        })
    }

    /// run every step; failures are reported and the script carries on
    pub fn run(&mut self, steps: &[Step]) -> Vec<StepReport> {
        steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                debug!("step {}: {}", i, step.name());
                match self.apply(step) {
                    Ok(outcome) => StepReport {
                        step: i,
                        op: step.name(),
                        ok: Some(outcome),
                        error: None,
                    },
                    Err(e) => StepReport {
                        step: i,
                        op: step.name(),
                        ok: None,
                        error: Some(format!("{:#}", e)),
                    },
                }
            })
            .collect()
    }

    pub fn summary(&self) -> Summary<'_> {
        Summary {
            stats: self.pool.get_stats(),
            latest_root: self.pool.get_latest_root(),
            leaves: self.pool.tree().len(),
            events: self.pool.events(),
        }
    }

    pub fn apply(&mut self, step: &Step) -> Result<Outcome> {
        let vault = self.pool.address();

        match step {
            Step::Fund { account, amount } => {
                let account = account.resolve();
                self.pool.backend_mut().mint_native(&account, *amount)?;
                Ok(self.balance(account, Asset::Native))
            }
            Step::Mint {
                token,
                account,
                amount,
            } => {
                let (token, account) = (token.resolve(), account.resolve());
                self.pool.backend_mut().mint_token(&token, &account, *amount)?;
                Ok(self.balance(account, Asset::Token(token)))
            }
            Step::Approve {
                token,
                owner,
                amount,
            } => {
                let (token, owner) = (token.resolve(), owner.resolve());
                self.pool.backend_mut().approve(&token, &owner, &vault, *amount);
                Ok(Outcome::Allowance {
                    owner,
                    spender: vault,
                    token,
                    allowance: self.pool.backend().allowance(&token, &owner, &vault),
                })
            }
            Step::TransferToPool {
                token,
                from,
                amount,
            } => {
                let asset = Asset::Token(token.resolve());
                self.pool
                    .backend_mut()
                    .transfer(&asset, &from.resolve(), &vault, *amount)?;
                Ok(self.balance(vault, asset))
            }
            Step::RegisterToken {
                token,
                name,
                symbol,
                decimals,
            } => {
                let info =
                    TokenInfo::new(token.resolve(), name.as_str(), symbol.as_str(), *decimals);
                self.pool.register_token(info.clone())?;
                Ok(Outcome::TokenRegistered(info))
            }
            Step::Deposit { from, note, value } => {
                let value = value.unwrap_or(self.pool.config().deposit_amount);
                let commitment = self.note_or_new(note).commitment(&self.pool.hasher());
                let receipt = self.pool.deposit(&from.resolve(), commitment, value)?;
                Ok(Outcome::Deposited {
                    note: note.clone(),
                    receipt,
                })
            }
            Step::DepositToken {
                from,
                note,
                token,
                amount,
            } => {
                let commitment = self.note_or_new(note).commitment(&self.pool.hasher());
                let receipt =
                    self.pool
                        .deposit_token(&from.resolve(), commitment, &token.resolve(), *amount)?;
                Ok(Outcome::Deposited {
                    note: note.clone(),
                    receipt,
                })
            }
            Step::InsertLeaf { note } => {
                let commitment = self.note_or_new(note).commitment(&self.pool.hasher());
                Ok(Outcome::LeafInserted(self.pool.insert_leaf(commitment)?))
            }
            Step::Withdraw {
                note,
                to,
                root,
                relayer,
            } => {
                let nullifier_hash = self.known_note(note)?.nullifier_hash(&self.pool.hasher());
                let root = root.unwrap_or_else(|| self.pool.get_latest_root());
                let receipt = self.pool.withdraw(
                    nullifier_hash,
                    &to.resolve(),
                    &root,
                    relayer.as_ref().map(AccountRef::resolve),
                )?;
                Ok(Outcome::Withdrawn(receipt))
            }
            Step::WithdrawTokens {
                note,
                to,
                token,
                amount,
                root,
            } => {
                let nullifier_hash = self.known_note(note)?.nullifier_hash(&self.pool.hasher());
                let root = root.unwrap_or_else(|| self.pool.get_latest_root());
                let receipt = self.pool.withdraw_tokens(
                    nullifier_hash,
                    &to.resolve(),
                    &root,
                    &token.resolve(),
                    *amount,
                )?;
                Ok(Outcome::Withdrawn(receipt))
            }
            Step::Stats => Ok(Outcome::Stats(self.pool.get_stats())),
        }
    }

    fn balance(&self, account: Address, asset: Asset) -> Outcome {
        Outcome::Balance {
            account,
            asset,
            balance: self.pool.backend().balance_of(&account, &asset),
        }
    }

    /// named note, an inline `anonpool-…` note, or a fresh one stored under the name
    fn note_or_new(&mut self, name: &str) -> DepositNote {
        if let Ok(note) = name.parse::<DepositNote>() {
            return note;
        }
        let rng = &mut self.rng;
        self.notes
            .entry(name.to_string())
            .or_insert_with(|| DepositNote::random(rng))
            .clone()
    }

    fn known_note(&self, name: &str) -> Result<DepositNote> {
        if let Ok(note) = name.parse::<DepositNote>() {
            return Ok(note);
        }
        self.notes
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("unknown note `{}`", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anon_pool::HashScheme;

    fn simulator() -> Simulator {
        let config = PoolConfig {
            tree_depth: 4,
            hash: HashScheme::Blake3,
            ..PoolConfig::default()
        };
        Simulator::new(config, 7).unwrap()
    }

    fn steps(json: &str) -> Vec<Step> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_native_script() {
        let mut sim = simulator();
        let reports = sim.run(&steps(
            r#"[
                { "op": "fund", "account": "alice", "amount": 5000000000000000 },
                { "op": "deposit", "from": "alice", "note": "n1" },
                { "op": "deposit", "from": "alice", "note": "n2", "value": 1 },
                { "op": "withdraw", "note": "n1", "to": "bob", "relayer": "relayer" },
                { "op": "withdraw", "note": "n1", "to": "carol" },
                { "op": "withdraw", "note": "missing", "to": "carol" },
                { "op": "stats" }
            ]"#,
        ));

        let errors: Vec<_> = reports.iter().map(|r| r.error.is_some()).collect();
        assert_eq!(errors, [false, false, true, false, true, true, false]);
        assert!(reports[4]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("already spent")));

        let summary = sim.summary();
        assert_eq!(summary.stats.deposits_count, 1);
        assert_eq!(summary.stats.withdrawals_count, 1);
        assert_eq!(summary.stats.pool_balance, Amount::ZERO);
        assert_eq!(summary.leaves, 1);
    }

    #[test]
    fn test_token_script() {
        let mut sim = simulator();
        let reports = sim.run(&steps(
            r#"[
                { "op": "register_token", "token": "usdc", "name": "USD Coin", "symbol": "USDC", "decimals": 6 },
                { "op": "mint", "token": "usdc", "account": "alice", "amount": 1000 },
                { "op": "approve", "token": "usdc", "owner": "alice", "amount": 300 },
                { "op": "deposit_token", "from": "alice", "note": "t1", "token": "usdc", "amount": 300 },
                { "op": "transfer_to_pool", "token": "usdc", "from": "alice", "amount": 200 },
                { "op": "insert_leaf", "note": "t2" },
                { "op": "withdraw_tokens", "note": "t2", "to": "bob", "token": "usdc", "amount": 500 }
            ]"#,
        ));
        assert!(reports.iter().all(|r| r.error.is_none()), "{:?}", reports);

        let bob = AccountRef("bob".into()).resolve();
        let usdc = AccountRef("usdc".into()).resolve();
        assert_eq!(
            sim.pool.backend().balance_of(&bob, &Asset::Token(usdc)),
            Amount(500)
        );
    }

    #[test]
    fn test_account_ref_accepts_hex() {
        let addr = Address::derive(b"x");
        assert_eq!(AccountRef(addr.to_string()).resolve(), addr);
        assert_eq!(AccountRef("x".into()).resolve(), addr);
    }

    #[test]
    fn test_reports_serialize() {
        let mut sim = simulator();
        let reports = sim.run(&steps(r#"[{ "op": "stats" }]"#));
        let line = serde_json::to_string(&reports[0]).unwrap();
        assert!(line.starts_with(r#"{"step":0,"op":"stats","ok":{"stats":"#));
    }
}
