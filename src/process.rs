// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Mining processes.
//!
//! A process waits for the oracle to generate a token. The process named as
//! token holder mines a block on top of its own previous contribution. All
//! other processes notice the freshly appended block in the ledger and fetch
//! it over one of their [`Connection`]s. Connections only hand a block over
//! once its parent is known, so every process learns blocks in causal order.

pub mod connection;

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use rand::RngCore;

pub use self::connection::{Connection, ConnectionState, ConnectionView};
use crate::automaton::{self, Automaton, Transition};
use crate::crypto::BlockHash;
use crate::error::SimulationError;
use crate::ledger::Ledger;
use crate::sampling::sample_exponential;
use crate::types::{Address, SimTime};
use crate::{Block, ProcessConfig};

/// States of the process automaton.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcessState {
    Working,
    ClaimingToken,
    HoldingToken,
}

/// Snapshot of the oracle and ledger as seen by a process.
#[derive(Clone, Debug)]
pub struct ProcessView {
    pub now: SimTime,
    /// Address named by the oracle, if any token was handed out yet.
    pub token_holder: Option<Address>,
    pub token_generated: bool,
    /// Mean transit time of the current token holder in seconds.
    pub holder_mean_transit_time: Option<f64>,
    /// Block most recently appended to the ledger.
    pub appended: Arc<Block>,
}

/// Number of transitions fired during one evaluation of a process.
#[derive(Debug, Default)]
pub struct ProcessStep {
    /// Transitions fired by the process and its connections.
    pub fired: usize,
    /// Block mined by this process, to be appended to the ledger.
    pub mined: Option<Arc<Block>>,
}

/// A mining process together with its connections.
pub struct Process {
    address: Address,
    /// Mean network transit time in seconds.
    mean_transit_time: f64,
    state: ProcessState,
    /// Block this process appended most recently, genesis initially.
    last_block: Arc<Block>,
    /// All blocks this process has mined or received.
    known: HashMap<BlockHash, Arc<Block>>,
    /// Blocks announced to this process that have not arrived yet.
    pending: HashMap<BlockHash, Arc<Block>>,
    connections: Vec<Connection>,
    /// Backlog length above which a warning is logged.
    backlog_warning: usize,
    backlog_warned: bool,
    blocks_mined: u64,
}

impl Process {
    /// Creates a new process that knows only `genesis`.
    pub fn new(
        address: Address,
        config: &ProcessConfig,
        genesis: Arc<Block>,
        num_connections: usize,
        backlog_warning: usize,
    ) -> Self {
        Self {
            address,
            mean_transit_time: config.mean_transit_time,
            state: ProcessState::Working,
            last_block: genesis.clone(),
            known: HashMap::from([(genesis.hash(), genesis)]),
            pending: HashMap::new(),
            connections: (0..num_connections)
                .map(|index| Connection::new(address, index))
                .collect(),
            backlog_warning,
            backlog_warned: false,
            blocks_mined: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn mean_transit_time(&self) -> f64 {
        self.mean_transit_time
    }

    /// Block this process appended most recently, genesis if none.
    pub fn last_block(&self) -> &Arc<Block> {
        &self.last_block
    }

    pub fn knows(&self, hash: &BlockHash) -> bool {
        self.known.contains_key(hash)
    }

    pub fn is_pending(&self, hash: &BlockHash) -> bool {
        self.pending.contains_key(hash)
    }

    /// Number of known blocks, including genesis.
    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn known_blocks(&self) -> impl Iterator<Item = &Arc<Block>> {
        self.known.values()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined
    }

    /// Returns the deepest known block.
    ///
    /// Ties are broken by the smaller hash, so the result is deterministic.
    pub fn tip(&self) -> &Arc<Block> {
        self.known
            .values()
            .max_by(|a, b| a.depth().cmp(&b.depth()).then(b.hash().cmp(&a.hash())))
            .unwrap_or(&self.last_block)
    }

    /// Returns `true` iff this process knows exactly the blocks in `ledger`.
    pub fn is_synchronized(&self, ledger: &Ledger) -> bool {
        self.known.len() == ledger.len() && self.known.keys().all(|h| ledger.contains(h))
    }

    /// Largest backlog across all connections right now.
    pub fn max_backlog(&self) -> usize {
        self.connections
            .iter()
            .map(Connection::backlog_len)
            .max()
            .unwrap_or(0)
    }

    /// Largest backlog any connection ever had.
    pub fn peak_backlog(&self) -> usize {
        self.connections
            .iter()
            .map(Connection::peak_backlog)
            .max()
            .unwrap_or(0)
    }

    /// Earliest instant at which a connection timer fires.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.connections
            .iter()
            .filter_map(Connection::next_event_time)
            .min()
    }

    /// Evaluates the process automaton and then each connection once.
    ///
    /// # Errors
    ///
    /// Returns an error if a delivery violates causal order.
    pub fn step(
        &mut self,
        view: &ProcessView,
        rng: &mut dyn RngCore,
    ) -> Result<ProcessStep, SimulationError> {
        let mut step = ProcessStep::default();
        if let Some(fired) = automaton::fire(self, view, rng)? {
            step.fired += 1;
            step.mined = fired.effect;
        }
        step.fired += self.step_connections(view.now, rng)?;
        Ok(step)
    }

    /// Evaluates every connection once, accepting delivered blocks.
    fn step_connections(
        &mut self,
        now: SimTime,
        rng: &mut dyn RngCore,
    ) -> Result<usize, SimulationError> {
        let mut fired = 0;
        for index in 0..self.connections.len() {
            let view = self.connection_view(index, now);
            let connection = &mut self.connections[index];
            let Some(transition) = automaton::fire(connection, &view, rng)? else {
                continue;
            };
            fired += 1;
            if let Some(block) = transition.effect {
                self.accept(index, transition.from, block)?;
                self.check_backlog();
            }
        }
        Ok(fired)
    }

    fn connection_view(&self, index: usize, now: SimTime) -> ConnectionView {
        let current = self.connections[index].current_block();
        ConnectionView {
            now,
            current_pending: current.is_some_and(|b| self.pending.contains_key(&b.hash())),
            parent_known: current
                .and_then(|b| b.parent())
                .is_none_or(|parent| self.known.contains_key(&parent)),
        }
    }

    /// Moves a block delivered by connection `connection` from pending to
    /// known. `state` is the connection state the delivery fired from.
    fn accept(
        &mut self,
        connection: usize,
        state: ConnectionState,
        block: Arc<Block>,
    ) -> Result<(), SimulationError> {
        let hash = block.hash();
        if let Some(parent) = block.parent() {
            if !self.known.contains_key(&parent) {
                return Err(SimulationError::UnknownParent {
                    address: self.address,
                    connection,
                    state,
                    block: hash,
                });
            }
        }
        if self.pending.remove(&hash).is_none() {
            return Err(SimulationError::NotPending {
                address: self.address,
                connection,
                state,
                block: hash,
            });
        }
        debug!("process {} received block {hash:?}", self.address);
        self.known.insert(hash, block);
        Ok(())
    }

    /// Records `block` as pending and routes it to a connection.
    ///
    /// A free connection is preferred. Otherwise the block joins the shortest
    /// backlog, ties going to the lowest index.
    fn announce(&mut self, block: Arc<Block>, transit_time: SimTime) -> Result<(), SimulationError> {
        let hash = block.hash();
        if self.known.contains_key(&hash) {
            return Err(SimulationError::AlreadyKnown {
                address: self.address,
                state: self.state,
                block: hash,
            });
        }
        let target = match self.connections.iter().position(Connection::is_free) {
            Some(index) => index,
            None => self
                .connections
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| c.backlog_len())
                .map_or(0, |(index, _)| index),
        };
        let Some(connection) = self.connections.get_mut(target) else {
            return Err(SimulationError::NoConnection {
                address: self.address,
                state: self.state,
                block: hash,
            });
        };
        connection.assign(block.clone(), transit_time);
        self.pending.insert(hash, block);
        self.check_backlog();
        Ok(())
    }

    /// Warns once when the longest backlog grows beyond the threshold and
    /// re-arms once every backlog is back at or below it.
    fn check_backlog(&mut self) {
        let backlog = self.max_backlog();
        if backlog <= self.backlog_warning {
            self.backlog_warned = false;
        } else if !self.backlog_warned {
            warn!(
                "process {} backlog at {backlog} blocks, above {}",
                self.address, self.backlog_warning
            );
            self.backlog_warned = true;
        }
    }

    // guards and actions

    fn token_generated(&self, view: &ProcessView) -> bool {
        view.token_generated
    }

    fn token_granted(&self, view: &ProcessView) -> bool {
        view.token_holder == Some(self.address) && !view.token_generated
    }

    fn must_fetch(&self, view: &ProcessView) -> bool {
        let hash = view.appended.hash();
        hash != self.last_block.hash()
            && !self.pending.contains_key(&hash)
            && !self.known.contains_key(&hash)
    }

    fn mine(
        &mut self,
        view: &ProcessView,
        _rng: &mut dyn RngCore,
    ) -> Result<Option<Arc<Block>>, SimulationError> {
        let block = Arc::new(Block::child(&self.last_block, self.address, view.now));
        debug!(
            "process {} mined block {:?} at depth {}",
            self.address,
            block.hash(),
            block.depth()
        );
        self.known.insert(block.hash(), block.clone());
        self.last_block = block.clone();
        self.blocks_mined += 1;
        Ok(Some(block))
    }

    fn fetch(
        &mut self,
        view: &ProcessView,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Arc<Block>>, SimulationError> {
        let remote = view
            .holder_mean_transit_time
            .unwrap_or(self.mean_transit_time);
        let mean = (self.mean_transit_time + remote) / 2.0;
        let transit_time = sample_exponential(rng, mean);
        self.announce(view.appended.clone(), transit_time)?;
        Ok(None)
    }
}

impl Automaton for Process {
    type State = ProcessState;
    type View = ProcessView;
    /// Freshly mined block.
    type Effect = Arc<Block>;
    type Id = Address;

    const KIND: &'static str = "process";
    const TRANSITIONS: &'static [Transition<Self>] = &[
        Transition {
            name: "claim-token",
            from: ProcessState::Working,
            to: ProcessState::ClaimingToken,
            guard: Process::token_generated,
            action: None,
        },
        Transition {
            name: "take-token",
            from: ProcessState::ClaimingToken,
            to: ProcessState::HoldingToken,
            guard: Process::token_granted,
            action: Some(Process::mine),
        },
        Transition {
            name: "fetch-block",
            from: ProcessState::ClaimingToken,
            to: ProcessState::Working,
            guard: Process::must_fetch,
            action: Some(Process::fetch),
        },
        Transition {
            name: "release-token",
            from: ProcessState::HoldingToken,
            to: ProcessState::Working,
            guard: |_, _| true,
            action: None,
        },
    ];

    fn id(&self) -> Address {
        self.address
    }

    fn time(view: &ProcessView) -> SimTime {
        view.now
    }

    fn state(&self) -> ProcessState {
        self.state
    }

    fn enter(&mut self, state: ProcessState) {
        self.state = state;
    }
}
