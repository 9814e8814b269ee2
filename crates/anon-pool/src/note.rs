//! deposit notes
//!
//! a depositor keeps `(secret, nullifier)` off-chain. the pool only ever sees
//! `commitment = H(secret, nullifier)` at deposit and
//! `nullifier_hash = H(nullifier, 0)` at withdrawal.

use core::fmt;
use core::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::encoding::decode_fixed;
use crate::error::NoteParseError;
use crate::hash::{Field, HashFunction};

/// text prefix of an encoded note
pub const NOTE_PREFIX: &str = "anonpool-";

macro_rules! field_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Field);

        impl $name {
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(Field(bytes))
            }

            pub fn to_bytes(&self) -> [u8; 32] {
                self.0 .0
            }

            pub fn as_field(&self) -> &Field {
                &self.0
            }
        }

        impl From<Field> for $name {
            fn from(f: Field) -> Self {
                Self(f)
            }
        }

        impl FromStr for $name {
            type Err = crate::error::HexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

field_newtype!(
    /// depositor secret, never leaves the client
    Secret
);
field_newtype!(
    /// nullifier preimage, never leaves the client
    Nullifier
);
field_newtype!(
    /// `H(secret, nullifier)`, stored as a tree leaf
    Commitment
);
field_newtype!(
    /// `H(nullifier, 0)`, revealed once at withdrawal
    NullifierHash
);

// secrets stay out of logs
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Nullifier(..)")
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.0)
    }
}

impl fmt::Debug for NullifierHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NullifierHash({})", self.0)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for NullifierHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 31 random bytes under a zero high byte: always below the bn254
/// modulus, so no two notes alias after field reduction
fn random_canonical<R: RngCore>(rng: &mut R) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes[1..]);
    bytes
}

impl Secret {
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        Self::from_bytes(random_canonical(rng))
    }
}

impl Nullifier {
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        Self::from_bytes(random_canonical(rng))
    }

    /// the public tag of this nullifier
    pub fn hash<H: HashFunction + ?Sized>(&self, hasher: &H) -> NullifierHash {
        generate_nullifier_hash(hasher, self)
    }
}

/// `generateCommitment`: `H(secret, nullifier)`
pub fn generate_commitment<H: HashFunction + ?Sized>(
    hasher: &H,
    secret: &Secret,
    nullifier: &Nullifier,
) -> Commitment {
    Commitment(hasher.hash2(&secret.0, &nullifier.0))
}

/// `generateNullifierHash`: `H(nullifier, 0)`
pub fn generate_nullifier_hash<H: HashFunction + ?Sized>(
    hasher: &H,
    nullifier: &Nullifier,
) -> NullifierHash {
    NullifierHash(hasher.hash1(&nullifier.0))
}

/// the secret material behind one deposit
#[derive(Clone, PartialEq, Eq)]
pub struct DepositNote {
    pub secret: Secret,
    pub nullifier: Nullifier,
}

impl DepositNote {
    pub fn new(secret: Secret, nullifier: Nullifier) -> Self {
        Self { secret, nullifier }
    }

    /// fresh note from a cryptographically secure rng
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        Self {
            secret: Secret::random(rng),
            nullifier: Nullifier::random(rng),
        }
    }

    pub fn commitment<H: HashFunction + ?Sized>(&self, hasher: &H) -> Commitment {
        generate_commitment(hasher, &self.secret, &self.nullifier)
    }

    pub fn nullifier_hash<H: HashFunction + ?Sized>(&self, hasher: &H) -> NullifierHash {
        self.nullifier.hash(hasher)
    }
}

impl fmt::Debug for DepositNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DepositNote(..)")
    }
}

/// `anonpool-<secret hex><nullifier hex>`
impl fmt::Display for DepositNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            NOTE_PREFIX,
            hex::encode(self.secret.to_bytes()),
            hex::encode(self.nullifier.to_bytes())
        )
    }
}

impl FromStr for DepositNote {
    type Err = NoteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .trim()
            .strip_prefix(NOTE_PREFIX)
            .ok_or(NoteParseError::MissingPrefix(NOTE_PREFIX))?;
        let bytes = decode_fixed::<64>(body)?;

        let mut secret = [0u8; 32];
        let mut nullifier = [0u8; 32];
        secret.copy_from_slice(&bytes[..32]);
        nullifier.copy_from_slice(&bytes[32..]);
        Ok(Self::new(
            Secret::from_bytes(secret),
            Nullifier::from_bytes(nullifier),
        ))
    }
}

impl Serialize for DepositNote {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DepositNote {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
