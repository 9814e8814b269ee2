//! end-to-end ledger scenarios over the in-memory chain

use anon_pool::{
    Address, Amount, Asset, AssetBackend, Commitment, DepositNote, Field, HashScheme,
    MemoryBackend, Nullifier, NullifierHash, Pool, PoolConfig, PoolError, PoolEvent, Root,
    Secret, TokenInfo,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

const DEPOSIT: Amount = Amount(1_000_000_000_000_000);
const FEE: Amount = Amount(100_000_000_000_000);

fn account(label: &str) -> Address {
    Address::derive(label.as_bytes())
}

fn pool_with(depth: u8, hash: HashScheme, funded: &[(Address, Amount)]) -> Pool<MemoryBackend> {
    let config = PoolConfig {
        tree_depth: depth,
        hash,
        ..PoolConfig::default()
    };
    let mut chain = MemoryBackend::new();
    for (who, amount) in funded {
        chain.mint_native(who, *amount).unwrap();
    }
    Pool::new(config, chain).unwrap()
}

#[test]
fn scenario_two_deposits_one_withdrawal() {
    let alice = account("alice");
    let bob = account("bob");
    let relayer = account("relayer");
    let mut pool = pool_with(
        4,
        HashScheme::Poseidon,
        &[(alice, Amount(10 * DEPOSIT.0))],
    );

    let first = DepositNote::new(
        Secret::from_bytes([0x01; 32]),
        Nullifier::from_bytes([0x02; 32]),
    );
    let c0 = pool.generate_commitment(&first.secret, &first.nullifier);
    let r0 = pool.deposit(&alice, c0, DEPOSIT).unwrap();
    assert_eq!(r0.leaf_index.0, 0);

    let second = DepositNote::new(
        Secret::from_bytes([0x03; 32]),
        Nullifier::from_bytes([0x04; 32]),
    );
    let c1 = pool.generate_commitment(&second.secret, &second.nullifier);
    let r1 = pool.deposit(&alice, c1, DEPOSIT).unwrap();
    assert_eq!(r1.leaf_index.0, 1);
    assert_ne!(r0.root, r1.root);
    assert_eq!(pool.get_latest_root(), r1.root);

    let h = pool.generate_nullifier_hash(&first.nullifier);
    pool.withdraw(h, &bob, &r1.root, Some(relayer)).unwrap();
    assert!(pool.is_spent(&h));

    assert_eq!(
        pool.withdraw(h, &bob, &r1.root, Some(relayer)),
        Err(PoolError::AlreadySpent)
    );

    let chain = pool.backend();
    assert_eq!(chain.balance_of(&bob, &Asset::Native), Amount(DEPOSIT.0 - FEE.0));
    assert_eq!(chain.balance_of(&relayer, &Asset::Native), FEE);

    let stats = pool.get_stats();
    assert_eq!(stats.deposits_count, 2);
    assert_eq!(stats.withdrawals_count, 1);
    assert_eq!(stats.anonymity_set, 2);
    assert_eq!(stats.pool_balance, DEPOSIT);
}

#[test]
fn capacity_boundary_leaves_balance_unchanged() {
    let alice = account("alice");
    let mut pool = pool_with(3, HashScheme::Blake3, &[(alice, Amount(20 * DEPOSIT.0))]);
    let mut rng = ChaCha20Rng::seed_from_u64(3);

    for i in 0..8u64 {
        let note = DepositNote::random(&mut rng);
        let receipt = pool
            .deposit(&alice, note.commitment(&pool.hasher()), DEPOSIT)
            .unwrap();
        assert_eq!(receipt.leaf_index.0, i);
    }

    let balance = pool.get_stats().pool_balance;
    let payer_balance = pool.backend().balance_of(&alice, &Asset::Native);
    let note = DepositNote::random(&mut rng);
    assert_eq!(
        pool.deposit(&alice, note.commitment(&pool.hasher()), DEPOSIT),
        Err(PoolError::CapacityExceeded { capacity: 8 })
    );
    assert_eq!(pool.get_stats().pool_balance, balance);
    assert_eq!(pool.backend().balance_of(&alice, &Asset::Native), payer_balance);
    assert_eq!(pool.get_stats().deposits_count, 8);
}

#[test]
fn conservation_of_native_balance() {
    let alice = account("alice");
    let relayer = account("relayer");
    let mut pool = pool_with(4, HashScheme::Blake3, &[(alice, Amount(20 * DEPOSIT.0))]);
    let mut rng = ChaCha20Rng::seed_from_u64(11);

    let notes: Vec<_> = (0..6).map(|_| DepositNote::random(&mut rng)).collect();
    for note in &notes {
        pool.deposit(&alice, note.commitment(&pool.hasher()), DEPOSIT)
            .unwrap();
    }

    let root = pool.get_latest_root();
    let mut fees_paid = 0u128;
    for (i, note) in notes.iter().take(4).enumerate() {
        let to = Address::derive(&[i as u8]);
        // alternate between relayed and direct withdrawals
        let beneficiary = (i % 2 == 0).then_some(relayer);
        let receipt = pool
            .withdraw(note.nullifier_hash(&pool.hasher()), &to, &root, beneficiary)
            .unwrap();
        fees_paid += receipt.fee.0;
    }

    let k = 6u128;
    let w = 4u128;
    let expected = k * DEPOSIT.0 - w * (DEPOSIT.0 - FEE.0) - fees_paid;
    assert_eq!(pool.get_stats().pool_balance, Amount(expected));
    assert_eq!(fees_paid, 2 * FEE.0);
}

#[test]
fn stale_and_forged_roots_rejected() {
    let alice = account("alice");
    let bob = account("bob");
    let config = PoolConfig {
        tree_depth: 4,
        root_history_size: 2,
        hash: HashScheme::Blake3,
        ..PoolConfig::default()
    };
    let mut chain = MemoryBackend::new();
    chain.mint_native(&alice, Amount(10 * DEPOSIT.0)).unwrap();
    let mut pool = Pool::new(config, chain).unwrap();

    let empty = pool.get_latest_root();
    let r0 = pool
        .deposit(&alice, Commitment(Field::from_u64(1)), DEPOSIT)
        .unwrap()
        .root;
    let r1 = pool
        .deposit(&alice, Commitment(Field::from_u64(2)), DEPOSIT)
        .unwrap()
        .root;

    let h = NullifierHash(Field::from_u64(5));
    assert_eq!(
        pool.withdraw(h, &bob, &empty, None),
        Err(PoolError::UnknownRoot)
    );
    assert_eq!(
        pool.withdraw(h, &bob, &Root(Field::from_u64(123)), None),
        Err(PoolError::UnknownRoot)
    );
    assert!(!pool.is_spent(&h));

    // both retained roots still work
    pool.withdraw(h, &bob, &r0, None).unwrap();
    pool.withdraw(NullifierHash(Field::from_u64(6)), &bob, &r1, None)
        .unwrap();
}

#[test]
fn double_spend_rejected_for_any_recipient_or_root() {
    let alice = account("alice");
    let mut pool = pool_with(4, HashScheme::Blake3, &[(alice, Amount(10 * DEPOSIT.0))]);
    let r0 = pool
        .deposit(&alice, Commitment(Field::from_u64(1)), DEPOSIT)
        .unwrap()
        .root;
    let r1 = pool
        .deposit(&alice, Commitment(Field::from_u64(2)), DEPOSIT)
        .unwrap()
        .root;

    let h = NullifierHash(Field::from_u64(99));
    pool.withdraw(h, &account("bob"), &r1, None).unwrap();

    for root in [r0, r1] {
        for to in ["carol", "dave"] {
            assert_eq!(
                pool.withdraw(h, &account(to), &root, None),
                Err(PoolError::AlreadySpent)
            );
        }
    }
    assert_eq!(pool.get_stats().withdrawals_count, 1);
}

#[test]
fn token_pool_round_trip() {
    let alice = account("alice");
    let bob = account("bob");
    let usdc = TokenInfo::new(account("usdc"), "USD Coin", "USDC", 6);
    let token = usdc.address;

    let config = PoolConfig {
        tree_depth: 4,
        hash: HashScheme::Blake3,
        tokens: vec![usdc],
        ..PoolConfig::default()
    };
    let mut chain = MemoryBackend::new();
    chain.mint_token(&token, &alice, Amount(1_000)).unwrap();
    let mut pool = Pool::new(config, chain).unwrap();
    let vault = pool.address();

    // no allowance yet
    assert_eq!(
        pool.deposit_token(&alice, Commitment(Field::from_u64(1)), &token, Amount(400)),
        Err(PoolError::InsufficientAllowance {
            required: Amount(400),
            available: Amount::ZERO,
        })
    );
    assert!(pool.events().is_empty());

    pool.backend_mut().approve(&token, &alice, &vault, Amount(400));
    let receipt = pool
        .deposit_token(&alice, Commitment(Field::from_u64(1)), &token, Amount(400))
        .unwrap();

    let h = NullifierHash(Field::from_u64(1));
    assert_eq!(
        pool.withdraw_tokens(h, &bob, &receipt.root, &token, Amount(500)),
        Err(PoolError::TransferFailed(
            anon_pool::TransferError::InsufficientBalance {
                owner: vault,
                required: Amount(500),
                available: Amount(400),
            }
        ))
    );
    assert!(!pool.is_spent(&h));

    pool.withdraw_tokens(h, &bob, &receipt.root, &token, Amount(400))
        .unwrap();
    assert_eq!(
        pool.backend().balance_of(&bob, &Asset::Token(token)),
        Amount(400)
    );
    // native balance untouched by token flow
    assert_eq!(pool.get_stats().pool_balance, Amount::ZERO);

    let events = pool.drain_events();
    assert!(matches!(
        events.last(),
        Some(PoolEvent::TokenWithdrawal { amount: Amount(400), .. })
    ));
}

#[test]
fn unregistered_token_withdrawal_rejected_before_root() {
    let mut pool = pool_with(4, HashScheme::Blake3, &[]);
    let stranger = account("stranger-token");
    assert_eq!(
        pool.withdraw_tokens(
            NullifierHash(Field::from_u64(1)),
            &account("bob"),
            &Root(Field::from_u64(1)),
            &stranger,
            Amount(1),
        ),
        Err(PoolError::UnregisteredToken(stranger))
    );
}

#[test]
fn commitment_derivation_is_deterministic() {
    let secret = Secret::from_bytes([0x01; 32]);
    let nullifier = Nullifier::from_bytes([0x02; 32]);
    let a = pool_with(4, HashScheme::Poseidon, &[]);
    let b = pool_with(8, HashScheme::Poseidon, &[]);

    assert_eq!(
        a.generate_commitment(&secret, &nullifier),
        b.generate_commitment(&secret, &nullifier)
    );
    assert_eq!(
        a.generate_commitment(&secret, &nullifier),
        anon_pool::generate_commitment(&HashScheme::Poseidon, &secret, &nullifier)
    );
}
