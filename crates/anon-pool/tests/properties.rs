//! randomized properties of the accumulator and the spent set

use anon_pool::{
    Address, Amount, Commitment, Field, HashFunction, HashScheme, MemoryBackend,
    MerkleAccumulator, NullifierHash, Pool, PoolConfig, PoolError, Root, ZERO_LEAF,
};
use proptest::prelude::*;

/// independent full recomputation of the root
fn reference_root(hasher: &HashScheme, depth: u8, leaves: &[Commitment]) -> Root {
    let mut level: Vec<Field> = (0..1usize << depth)
        .map(|i| leaves.get(i).map(|c| c.0).unwrap_or(ZERO_LEAF))
        .collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| hasher.hash2(&pair[0], &pair[1]))
            .collect();
    }
    Root(level[0])
}

fn distinct_leaves(max: usize) -> impl Strategy<Value = Vec<Commitment>> {
    prop::collection::hash_set(prop::array::uniform32(1u8..=255), 0..=max)
        .prop_map(|set| set.into_iter().map(|b| Commitment(Field(b))).collect::<Vec<_>>())
}

proptest! {
    #[test]
    fn prop_incremental_root_matches_reference(leaves in distinct_leaves(16)) {
        let mut tree = MerkleAccumulator::new(4, 32, HashScheme::Blake3).unwrap();
        let mut inserted = Vec::new();
        for leaf in leaves {
            let root = tree.insert_leaf(leaf).unwrap().root;
            inserted.push(leaf);
            prop_assert_eq!(root, reference_root(&HashScheme::Blake3, 4, &inserted));
            prop_assert!(tree.is_known_root(&root));
        }
        prop_assert_eq!(tree.current_root(), reference_root(&HashScheme::Blake3, 4, &inserted));
    }

    #[test]
    fn prop_commitment_deterministic(
        secret in prop::array::uniform32(any::<u8>()),
        nullifier in prop::array::uniform32(any::<u8>()),
    ) {
        let s = anon_pool::Secret::from_bytes(secret);
        let n = anon_pool::Nullifier::from_bytes(nullifier);
        let c1 = anon_pool::generate_commitment(&HashScheme::Blake3, &s, &n);
        let c2 = anon_pool::generate_commitment(&HashScheme::Blake3, &s, &n);
        prop_assert_eq!(c1, c2);
    }

    #[test]
    fn prop_at_most_one_withdrawal_per_nullifier_hash(
        picks in prop::collection::vec((0u8..4, 0u8..4), 1..24),
    ) {
        let alice = Address::derive(b"alice");
        let config = PoolConfig {
            tree_depth: 3,
            deposit_amount: Amount(10),
            fee: Amount(1),
            hash: HashScheme::Blake3,
            ..PoolConfig::default()
        };
        let mut chain = MemoryBackend::new();
        chain.mint_native(&alice, Amount(1_000)).unwrap();
        let mut pool = Pool::new(config, chain).unwrap();
        for n in 1..=8 {
            pool.deposit(&alice, Commitment(Field::from_u64(n)), Amount(10)).unwrap();
        }
        let root = pool.get_latest_root();

        let mut successes = [0u32; 4];
        for (nf, to) in picks {
            let h = NullifierHash(Field::from_u64(nf as u64 + 1));
            let recipient = Address::derive(&[to]);
            match pool.withdraw(h, &recipient, &root, None) {
                Ok(_) => successes[nf as usize] += 1,
                Err(e) => prop_assert_eq!(e, PoolError::AlreadySpent),
            }
        }
        prop_assert!(successes.iter().all(|&n| n <= 1));
        let total: u32 = successes.iter().sum();
        prop_assert_eq!(pool.get_stats().withdrawals_count, total as u64);
    }
}
