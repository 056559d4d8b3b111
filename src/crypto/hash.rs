// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cryptographic hash function.
//!
//! This module abstracts the specific hash function used to derive block
//! identifiers. Currently, SHA-256 is used.

use std::fmt::{self, Debug, Display};

use sha2::{Digest, Sha256};

/// Raw 256-bit digest.
pub type Hash = [u8; 32];

/// Hashes the given data using SHA-256.
#[must_use]
pub fn hash(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hashes all the given data slices together using SHA-256.
#[must_use]
pub fn hash_all(data: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for item in data {
        hasher.update(item);
    }
    hasher.finalize().into()
}

/// Identifier of a block.
///
/// Always compared by value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockHash(Hash);

impl BlockHash {
    /// Wraps a raw digest.
    pub const fn new(digest: Hash) -> Self {
        Self(digest)
    }

    /// Returns the raw digest bytes.
    pub const fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Returns the full lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the first 8 hex characters, for log output.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl From<Hash> for BlockHash {
    fn from(digest: Hash) -> Self {
        Self(digest)
    }
}

impl Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.short())
    }
}
