//! Core ledger types: heights, hashes, manifests, finalized blocks.
//!
//! A finalized [`Block`] is what the consensus engine hands to the index:
//! the block manifest, the operations it confirmed, and the state updates
//! those operations produced. The index never validates any of it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::operation::Operation;
use crate::state::StateUpdate;

/// A 32-byte hash value.
///
/// Used for block hashes, operation fact hashes, and address key prefixes.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash (32 zero bytes).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a Hash256 from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a Hash256 from a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Height of a finalized block.
///
/// Heights are non-negative for real blocks; [`Height::NIL`] is the
/// "no block yet" sentinel used for an empty index and for missing
/// previous-height links.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct Height(pub i64);

impl Height {
    /// Sentinel for "no block yet".
    pub const NIL: Self = Self(-1);

    /// Height of the first block.
    pub const GENESIS: Self = Self(0);

    /// True when this is the nil sentinel.
    pub fn is_nil(&self) -> bool {
        self.0 < 0
    }

    /// The height one below this one, saturating at [`Height::NIL`].
    pub fn prev(&self) -> Self {
        if self.0 <= 0 { Self::NIL } else { Self(self.0 - 1) }
    }

    /// The height one above this one. `NIL.next()` is genesis.
    pub fn next(&self) -> Self {
        if self.is_nil() { Self::GENESIS } else { Self(self.0 + 1) }
    }
}

impl Default for Height {
    fn default() -> Self {
        Self::NIL
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Height {
    fn from(h: i64) -> Self {
        Self(h)
    }
}

/// Summary of a finalized block, as recorded by the consensus engine.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Manifest {
    /// Height of the block.
    pub height: Height,
    /// Hash of the block.
    pub hash: Hash256,
    /// Hash of the previous block.
    pub previous_hash: Hash256,
    /// Merkle-style digest over the confirmed operations.
    pub operations_hash: Hash256,
    /// Merkle-style digest over the produced state updates.
    pub states_hash: Hash256,
    /// Unix timestamp (seconds) at which the block was confirmed.
    pub confirmed_at: i64,
}

impl Manifest {
    /// SHA-256 digest of the canonical encoding.
    ///
    /// Used by tests and tools to derive deterministic block hashes; the
    /// consensus engine assigns `hash` itself in production.
    pub fn digest(&self) -> Hash256 {
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())
            .unwrap_or_default();
        let out = Sha256::digest(&encoded);
        Hash256(out.into())
    }
}

/// A finalized block as consumed by the index.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Block {
    /// The block manifest.
    pub manifest: Manifest,
    /// Operations confirmed in this block, in block order.
    pub operations: Vec<Operation>,
    /// State updates produced by this block.
    pub states: Vec<StateUpdate>,
}

impl Block {
    /// Height of this block.
    pub fn height(&self) -> Height {
        self.manifest.height
    }

    /// Hash of this block.
    pub fn hash(&self) -> Hash256 {
        self.manifest.hash
    }
}
