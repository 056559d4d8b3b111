// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Immutable ledger entries.
//!
//! Blocks are created once and then shared behind an [`Arc`] by the ledger
//! and every process that learns about them.
//!
//! [`Arc`]: std::sync::Arc

use crate::crypto::{BlockHash, hash, hash_all};
use crate::types::{Address, SimTime};

/// Marker digested to obtain the genesis hash.
pub const GENESIS_MARKER: &[u8] = b"genesis";

/// A single block in the block tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    hash: BlockHash,
    parent: Option<BlockHash>,
    depth: u64,
    miner: Option<Address>,
    timestamp: SimTime,
}

impl Block {
    /// Creates the genesis block.
    ///
    /// Every simulation shares the same genesis hash.
    pub fn genesis() -> Self {
        Self {
            hash: BlockHash::new(hash(GENESIS_MARKER)),
            parent: None,
            depth: 0,
            miner: None,
            timestamp: SimTime::ZERO,
        }
    }

    /// Creates a new block extending `parent`, mined by `miner` at `timestamp`.
    ///
    /// The hash covers the parent hash, the timestamp and the miner address.
    pub fn child(parent: &Block, miner: Address, timestamp: SimTime) -> Self {
        let time_ns = timestamp.nanos().unwrap_or(u64::MAX).to_le_bytes();
        let address = miner.to_string();
        let digest = hash_all(&[
            parent.hash.as_bytes().as_slice(),
            time_ns.as_slice(),
            address.as_bytes(),
        ]);
        Self {
            hash: BlockHash::new(digest),
            parent: Some(parent.hash),
            depth: parent.depth + 1,
            miner: Some(miner),
            timestamp,
        }
    }

    pub fn hash(&self) -> BlockHash {
        self.hash
    }

    /// Hash of the predecessor, `None` only for genesis.
    pub fn parent(&self) -> Option<BlockHash> {
        self.parent
    }

    /// Distance from genesis.
    pub fn depth(&self) -> u64 {
        self.depth
    }

    /// Address of the process that mined this block, `None` only for genesis.
    pub fn miner(&self) -> Option<Address> {
        self.miner
    }

    pub fn timestamp(&self) -> SimTime {
        self.timestamp
    }

    pub fn is_genesis(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis() {
        let genesis = Block::genesis();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.depth(), 0);
        assert_eq!(genesis.parent(), None);
        assert_eq!(genesis.miner(), None);
        assert_eq!(genesis.hash(), BlockHash::new(hash(b"genesis")));
        assert_eq!(genesis, Block::genesis());
    }

    #[test]
    fn child_links_to_parent() {
        let genesis = Block::genesis();
        let miner = Address::new(2);
        let child = Block::child(&genesis, miner, SimTime::new(42));
        assert_eq!(child.parent(), Some(genesis.hash()));
        assert_eq!(child.depth(), 1);
        assert_eq!(child.miner(), Some(miner));
        assert_eq!(child.timestamp(), SimTime::new(42));

        let grandchild = Block::child(&child, miner, SimTime::new(43));
        assert_eq!(grandchild.depth(), 2);
        assert_eq!(grandchild.parent(), Some(child.hash()));
    }

    #[test]
    fn hash_is_deterministic() {
        let genesis = Block::genesis();
        let a = Block::child(&genesis, Address::new(1), SimTime::new(7));
        let b = Block::child(&genesis, Address::new(1), SimTime::new(7));
        assert_eq!(a.hash(), b.hash());

        // every input changes the digest
        let other_time = Block::child(&genesis, Address::new(1), SimTime::new(8));
        let other_miner = Block::child(&genesis, Address::new(2), SimTime::new(7));
        let other_parent = Block::child(&a, Address::new(1), SimTime::new(7));
        assert_ne!(a.hash(), other_time.hash());
        assert_ne!(a.hash(), other_miner.hash());
        assert_ne!(a.hash(), other_parent.hash());
    }
}
