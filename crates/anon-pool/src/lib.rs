//! anon-pool
//!
//! fixed-denomination shielded value pool: lock native currency or a
//! registered token behind a commitment, withdraw later to any address by
//! revealing the matching nullifier hash.
//!
//! # architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          POOL                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  client (off-chain)                                         │
//! │  ├─ deposit note: secret, nullifier                         │
//! │  ├─ commitment     = H(secret, nullifier)                   │
//! │  └─ nullifier hash = H(nullifier, 0)                        │
//! │                                                              │
//! │  ledger                                                     │
//! │  ├─ merkle accumulator (append-only, root history ring)    │
//! │  ├─ nullifier registry (spent set)                          │
//! │  ├─ token registry                                          │
//! │  └─ asset vault ──▶ AssetBackend (the chain)                │
//! │                                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! withdrawal checks that the root is one the tree produced recently and
//! that the nullifier hash is unused. there is no membership proof.
//!
//! ```
//! use anon_pool::{Address, Amount, DepositNote, MemoryBackend, Pool, PoolConfig};
//! use rand::SeedableRng;
//!
//! let alice = Address::derive(b"alice");
//! let bob = Address::derive(b"bob");
//!
//! let config = PoolConfig::default();
//! let denomination = config.deposit_amount;
//! let mut chain = MemoryBackend::new();
//! chain.mint_native(&alice, denomination).unwrap();
//!
//! let mut pool = Pool::new(config, chain).unwrap();
//! let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(1);
//! let note = DepositNote::random(&mut rng);
//!
//! let receipt = pool
//!     .deposit(&alice, note.commitment(&pool.hasher()), denomination)
//!     .unwrap();
//! pool.withdraw(note.nullifier_hash(&pool.hasher()), &bob, &receipt.root, None)
//!     .unwrap();
//! assert_eq!(pool.get_stats().withdrawals_count, 1);
//! ```

pub mod address;
pub mod backend;
pub mod commitment;
pub mod config;
pub mod encoding;
pub mod error;
pub mod event;
pub mod hash;
pub mod note;
pub mod nullifier;
pub mod pool;
pub mod poseidon;
pub mod registry;
pub mod shared;
pub mod value;
pub mod vault;

pub use address::Address;
pub use backend::MemoryBackend;
pub use commitment::{LeafIndex, LeafInserted, MerkleAccumulator, Root, RootHistory};
pub use config::PoolConfig;
pub use error::{ConfigError, PoolError, RegistryError, Result, TransferError};
pub use event::PoolEvent;
pub use hash::{Blake3, Field, HashFunction, HashScheme, ZERO_LEAF};
pub use note::{
    generate_commitment, generate_nullifier_hash, Commitment, DepositNote, Nullifier,
    NullifierHash, Secret,
};
pub use nullifier::NullifierRegistry;
pub use pool::{DepositReceipt, Pool, PoolStats, WithdrawalReceipt};
pub use poseidon::Poseidon;
pub use registry::{TokenInfo, TokenRegistry};
pub use shared::SharedPool;
pub use value::{Amount, Asset};
pub use vault::{AssetBackend, AssetVault, Payout};
