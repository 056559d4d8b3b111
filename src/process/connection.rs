// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A single network link slot of a mining process.
//!
//! A connection carries at most one block at a time. Further blocks routed
//! to a busy connection wait in a FIFO backlog together with their already
//! sampled transit times.

use std::collections::VecDeque;
use std::fmt::{self, Display};
use std::sync::Arc;

use rand::RngCore;

use crate::Block;
use crate::automaton::{Automaton, Transition};
use crate::error::SimulationError;
use crate::types::{Address, SimTime, Timer};

/// States of the connection automaton.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    Transit,
    Arrived,
}

/// Snapshot of the owning process as seen by one connection.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionView {
    pub now: SimTime,
    /// Whether the block in flight is recorded as pending on the owner.
    pub current_pending: bool,
    /// Whether the parent of the block in flight is known to the owner.
    pub parent_known: bool,
}

/// Identifies a connection by its owner and position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    pub owner: Address,
    pub index: usize,
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.index)
    }
}

/// Block in flight together with its sampled transit time.
#[derive(Clone, Debug)]
struct InFlight {
    block: Arc<Block>,
    transit_time: SimTime,
}

/// Network link slot with an overflow backlog.
pub struct Connection {
    owner: Address,
    index: usize,
    state: ConnectionState,
    current: Option<InFlight>,
    backlog: VecDeque<InFlight>,
    /// Running while in [`ConnectionState::Transit`].
    transit: Timer,
    /// Largest backlog observed so far.
    peak_backlog: usize,
}

impl Connection {
    /// Creates a new idle connection of process `owner`.
    pub fn new(owner: Address, index: usize) -> Self {
        Self {
            owner,
            index,
            state: ConnectionState::Idle,
            current: None,
            backlog: VecDeque::new(),
            transit: Timer::default(),
            peak_backlog: 0,
        }
    }

    /// Position of this connection within its owner.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns `true` iff no block is assigned to this connection.
    pub fn is_free(&self) -> bool {
        self.current.is_none()
    }

    /// Hands a block to this connection.
    ///
    /// The block is carried right away if the connection is free, otherwise
    /// it is appended to the backlog.
    pub fn assign(&mut self, block: Arc<Block>, transit_time: SimTime) {
        let in_flight = InFlight {
            block,
            transit_time,
        };
        if self.current.is_none() {
            self.current = Some(in_flight);
        } else {
            self.backlog.push_back(in_flight);
            self.peak_backlog = self.peak_backlog.max(self.backlog.len());
        }
    }

    /// Block currently assigned, if any.
    pub fn current_block(&self) -> Option<&Arc<Block>> {
        self.current.as_ref().map(|f| &f.block)
    }

    /// Sampled transit time of the current block.
    pub fn current_transit_time(&self) -> Option<SimTime> {
        self.current.as_ref().map(|f| f.transit_time)
    }

    /// Number of blocks waiting behind the current one.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Largest backlog length observed over the lifetime of this connection.
    pub fn peak_backlog(&self) -> usize {
        self.peak_backlog
    }

    /// Iterates over all blocks assigned to this connection in delivery order.
    pub fn queued_blocks(&self) -> impl Iterator<Item = &Arc<Block>> {
        self.current
            .iter()
            .chain(self.backlog.iter())
            .map(|f| &f.block)
    }

    /// Instant at which the transit timer fires, if a block is in transit.
    pub fn next_event_time(&self) -> Option<SimTime> {
        (self.state == ConnectionState::Transit).then(|| self.transit.fires_at())
    }

    fn can_start(&self, view: &ConnectionView) -> bool {
        self.current.is_some() && view.current_pending
    }

    fn start(
        &mut self,
        view: &ConnectionView,
        _rng: &mut dyn RngCore,
    ) -> Result<Option<Arc<Block>>, SimulationError> {
        let duration = self.current_transit_time().unwrap_or(SimTime::ZERO);
        self.transit = Timer::start(view.now, duration);
        Ok(None)
    }

    fn transit_elapsed(&self, view: &ConnectionView) -> bool {
        self.transit.expired(view.now)
    }

    fn can_deliver(&self, view: &ConnectionView) -> bool {
        self.current.is_some() && view.parent_known
    }

    fn deliver(
        &mut self,
        _view: &ConnectionView,
        _rng: &mut dyn RngCore,
    ) -> Result<Option<Arc<Block>>, SimulationError> {
        let delivered = self.current.take().map(|f| f.block);
        self.current = self.backlog.pop_front();
        Ok(delivered)
    }
}

impl Automaton for Connection {
    type State = ConnectionState;
    type View = ConnectionView;
    /// Block handed to the owning process.
    type Effect = Arc<Block>;
    type Id = ConnectionId;

    const KIND: &'static str = "connection";
    const TRANSITIONS: &'static [Transition<Self>] = &[
        Transition {
            name: "start-transit",
            from: ConnectionState::Idle,
            to: ConnectionState::Transit,
            guard: Connection::can_start,
            action: Some(Connection::start),
        },
        Transition {
            name: "arrive",
            from: ConnectionState::Transit,
            to: ConnectionState::Arrived,
            guard: Connection::transit_elapsed,
            action: None,
        },
        Transition {
            name: "deliver",
            from: ConnectionState::Arrived,
            to: ConnectionState::Idle,
            guard: Connection::can_deliver,
            action: Some(Connection::deliver),
        },
    ];

    fn id(&self) -> ConnectionId {
        ConnectionId {
            owner: self.owner,
            index: self.index,
        }
    }

    fn time(view: &ConnectionView) -> SimTime {
        view.now
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn enter(&mut self, state: ConnectionState) {
        self.state = state;
    }
}
