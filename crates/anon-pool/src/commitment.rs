//! commitment tree
//!
//! fixed-depth append-only merkle tree of deposit commitments. insertion is
//! incremental (filled subtrees), O(depth) hashes per leaf, and every new
//! root is pushed into a bounded ring so withdrawals can reference a
//! slightly stale root.

use std::collections::{HashSet, VecDeque};

use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, PoolError};
use crate::hash::{Field, HashFunction, HashScheme, ZERO_LEAF};
use crate::note::Commitment;

/// deepest supported tree (2^32 leaves)
pub const MAX_TREE_DEPTH: u8 = 32;

/// merkle root of the commitment tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Root(pub Field);

impl Root {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0 .0
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Field(bytes))
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl core::str::FromStr for Root {
    type Err = crate::error::HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// position of a leaf (insertion order)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeafIndex(pub u64);

impl LeafIndex {
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    /// bit `level` of the index: false = left child, true = right child
    fn is_right_at(&self, level: usize) -> bool {
        (self.0 >> level) & 1 == 1
    }
}

impl fmt::Display for LeafIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// outcome of one insertion, for observers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafInserted {
    pub leaf_index: LeafIndex,
    pub commitment: Commitment,
    pub root: Root,
}

/// bounded fifo of recent roots; the oldest falls out first
#[derive(Clone, Debug)]
pub struct RootHistory {
    roots: VecDeque<Root>,
    capacity: usize,
}

impl RootHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            roots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, root: Root) {
        if self.roots.len() == self.capacity {
            self.roots.pop_front();
        }
        self.roots.push_back(root);
    }

    pub fn contains(&self, root: &Root) -> bool {
        self.roots.contains(root)
    }

    pub fn latest(&self) -> Option<&Root> {
        self.roots.back()
    }

    /// oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Root> {
        self.roots.iter()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// append-only commitment tree with root history
#[derive(Clone, Debug)]
pub struct MerkleAccumulator {
    depth: usize,
    hasher: HashScheme,
    /// all commitments in insertion order
    leaves: Vec<Commitment>,
    /// for duplicate detection
    known: HashSet<Commitment>,
    /// latest left-hand node on each level
    filled_subtrees: Vec<Field>,
    /// zeros[i] = root of an empty subtree of height i
    zeros: Vec<Field>,
    current_root: Root,
    history: RootHistory,
}

impl MerkleAccumulator {
    /// empty tree of `depth` levels keeping the last `history_size` roots
    pub fn new(depth: u8, history_size: usize, hasher: HashScheme) -> Result<Self, ConfigError> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(ConfigError::InvalidTreeDepth(depth));
        }
        if history_size == 0 {
            return Err(ConfigError::InvalidRootHistorySize);
        }

        let depth = depth as usize;
        let zeros = zero_values(&hasher, depth);
        let current_root = Root(zeros[depth]);
        let mut history = RootHistory::new(history_size);
        history.push(current_root);

        Ok(Self {
            depth,
            hasher,
            leaves: Vec::new(),
            known: HashSet::new(),
            filled_subtrees: zeros[..depth].to_vec(),
            zeros,
            current_root,
            history,
        })
    }

    /// append a commitment, returning its index and the new root
    pub fn insert_leaf(&mut self, commitment: Commitment) -> Result<LeafInserted, PoolError> {
        if self.is_full() {
            return Err(PoolError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        if commitment.0 == ZERO_LEAF {
            return Err(PoolError::InvalidCommitment);
        }
        if self.known.contains(&commitment) {
            return Err(PoolError::DuplicateCommitment);
        }

        let leaf_index = LeafIndex(self.leaves.len() as u64);
        let mut node = commitment.0;
        for level in 0..self.depth {
            node = if leaf_index.is_right_at(level) {
                self.hasher.hash2(&self.filled_subtrees[level], &node)
            } else {
                self.filled_subtrees[level] = node;
                self.hasher.hash2(&node, &self.zeros[level])
            };
        }

        let root = Root(node);
        self.leaves.push(commitment);
        self.known.insert(commitment);
        self.current_root = root;
        self.history.push(root);

        debug!(index = leaf_index.0, %commitment, %root, "leaf inserted");

        Ok(LeafInserted {
            leaf_index,
            commitment,
            root,
        })
    }

    /// true iff `root` is still retained in the history ring
    pub fn is_known_root(&self, root: &Root) -> bool {
        self.history.contains(root)
    }

    pub fn current_root(&self) -> Root {
        self.current_root
    }

    /// root of the tree with no leaves
    pub fn empty_root(&self) -> Root {
        Root(self.zeros[self.depth])
    }

    pub fn contains(&self, commitment: &Commitment) -> bool {
        self.known.contains(commitment)
    }

    pub fn leaf(&self, index: LeafIndex) -> Option<&Commitment> {
        self.leaves.get(index.0 as usize)
    }

    pub fn leaves(&self) -> &[Commitment] {
        &self.leaves
    }

    pub fn root_history(&self) -> &RootHistory {
        &self.history
    }

    /// zero subtree root at `level` (0 = leaf)
    pub fn zero_value(&self, level: usize) -> Option<&Field> {
        self.zeros.get(level)
    }

    pub fn depth(&self) -> u8 {
        self.depth as u8
    }

    pub fn hasher(&self) -> HashScheme {
        self.hasher
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn len(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }
}

/// `zeros[0] = ZERO_LEAF`, `zeros[i] = H(zeros[i-1], zeros[i-1])`
pub fn zero_values<H: HashFunction + ?Sized>(hasher: &H, depth: usize) -> Vec<Field> {
    let mut zeros = Vec::with_capacity(depth + 1);
    zeros.push(ZERO_LEAF);
    for level in 1..=depth {
        let prev = zeros[level - 1];
        zeros.push(hasher.hash2(&prev, &prev));
    }
    zeros
}
