// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Append-only block store shared by all processes.
//!
//! The ledger is the canonical retention point for every block mined during
//! a run. It never removes blocks. Only the current token holder appends,
//! which serializes all writes.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use crate::Block;
use crate::crypto::BlockHash;
use crate::error::SimulationError;

/// Ledger holding all discovered blocks.
// TODO: add a retention policy for very long runs, both this and every
// process known set grow without bound.
pub struct Ledger {
    /// All blocks, indexed by hash.
    blocks: HashMap<BlockHash, Arc<Block>>,
    /// Block hashes in the order they were appended, starting with genesis.
    order: Vec<BlockHash>,
    /// Block most recently appended by a token holder.
    last_appended: Arc<Block>,
}

impl Ledger {
    /// Creates a new ledger containing only the given genesis block.
    pub fn new(genesis: Arc<Block>) -> Self {
        let hash = genesis.hash();
        Self {
            blocks: HashMap::from([(hash, genesis.clone())]),
            order: vec![hash],
            last_appended: genesis,
        }
    }

    /// Appends a block and makes it the last appended block.
    ///
    /// Appending a block whose hash is already present only moves the
    /// last-appended pointer. Returns `true` iff the block was new.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::OrphanBlock`] if the parent is not stored.
    pub fn append(&mut self, block: Arc<Block>) -> Result<bool, SimulationError> {
        if let Some(parent) = block.parent() {
            if !self.blocks.contains_key(&parent) {
                return Err(SimulationError::OrphanBlock {
                    block: block.hash(),
                    parent,
                });
            }
        }
        let hash = block.hash();
        let inserted = if let Some(existing) = self.blocks.get(&hash) {
            trace!("block {hash:?} already in ledger");
            self.last_appended = existing.clone();
            false
        } else {
            self.blocks.insert(hash, block.clone());
            self.order.push(hash);
            self.last_appended = block;
            true
        };
        Ok(inserted)
    }

    /// Looks up a block by hash.
    pub fn get(&self, hash: &BlockHash) -> Option<&Arc<Block>> {
        self.blocks.get(hash)
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.blocks.contains_key(hash)
    }

    /// Number of stored blocks, including genesis.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Always `false`, the ledger contains at least genesis.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Block most recently appended, genesis before the first append.
    pub fn last_appended(&self) -> &Arc<Block> {
        &self.last_appended
    }

    pub fn genesis(&self) -> &Arc<Block> {
        &self.blocks[&self.order[0]]
    }

    /// Iterates over all blocks in append order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Block>> {
        self.order.iter().map(|hash| &self.blocks[hash])
    }

    /// Returns the deepest block.
    ///
    /// Among blocks of equal depth the one appended first wins.
    pub fn tip(&self) -> &Arc<Block> {
        let mut tip = self.genesis();
        for block in self.iter() {
            if block.depth() > tip.depth() {
                tip = block;
            }
        }
        tip
    }

    /// Returns the chain from genesis to [`Ledger::tip`].
    pub fn longest_chain(&self) -> Vec<Arc<Block>> {
        let mut chain = vec![self.tip().clone()];
        while let Some(parent) = chain.last().and_then(|b| b.parent()) {
            match self.blocks.get(&parent) {
                Some(block) => chain.push(block.clone()),
                None => break,
            }
        }
        chain.reverse();
        chain
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(Arc::new(Block::genesis()))
    }
}
