// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Merit-weighted leader election.
//!
//! The [`ElectionOracle`] abstracts away the proof-of-work puzzle. After an
//! exponentially distributed wait it generates a token, and once that has
//! been observed it names a token holder by weighted random choice over the
//! merit table.
//!
//! Who may append next is tracked explicitly in a [`TokenGrant`]. The
//! driver consumes the grant when the holder's block reaches the ledger, so
//! a second append for the same selection is caught as an error.

use log::debug;
use rand::RngCore;

use crate::automaton::{Automaton, Transition};
use crate::config::SimulationConfig;
use crate::error::{ConfigError, SimulationError};
use crate::process::ProcessState;
use crate::sampling::{MeritWeightedSampler, sample_exponential};
use crate::types::{Address, SimTime, Timer};

/// States of the oracle automaton.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OracleState {
    Waiting,
    TokenGenerated,
}

/// Right to append the next block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenGrant {
    /// No token was handed out yet.
    #[default]
    None,
    /// The holder was selected but has not appended yet.
    Unspent(Address),
    /// The holder appended its block.
    Spent(Address),
}

/// Election oracle handing out one token per round.
pub struct ElectionOracle {
    state: OracleState,
    token_holder: Option<Address>,
    token_generated: bool,
    grant: TokenGrant,
    sampler: MeritWeightedSampler,
    /// Mean time between tokens in seconds.
    mean_block_time: f64,
    /// Wait until the next token is generated.
    wait: Timer,
    rounds: u64,
    /// Number of times each process was selected, by index.
    selections: Vec<u64>,
}

impl ElectionOracle {
    /// Creates a new oracle and samples the first wait duration.
    ///
    /// # Errors
    ///
    /// Returns an error if the merit table can not be built.
    pub fn new(config: &SimulationConfig, rng: &mut dyn RngCore) -> Result<Self, ConfigError> {
        let sampler = MeritWeightedSampler::new(&config.processes)?;
        let wait = Timer::start(
            SimTime::ZERO,
            sample_exponential(rng, config.mean_block_time),
        );
        Ok(Self {
            state: OracleState::Waiting,
            token_holder: None,
            token_generated: false,
            grant: TokenGrant::None,
            sampler,
            mean_block_time: config.mean_block_time,
            wait,
            rounds: 0,
            selections: vec![0; config.processes.len()],
        })
    }

    /// Address of the most recently selected process.
    pub fn token_holder(&self) -> Option<Address> {
        self.token_holder
    }

    /// Whether a token was generated but no holder selected yet.
    pub fn token_generated(&self) -> bool {
        self.token_generated
    }

    pub fn grant(&self) -> TokenGrant {
        self.grant
    }

    /// Configured mean transit time of `address` in seconds.
    pub fn mean_transit_time(&self, address: Address) -> Option<f64> {
        self.sampler.entry(address).map(|e| e.mean_transit_time)
    }

    /// Number of completed selections.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// How often each process was selected, indexed like the processes.
    pub fn selection_counts(&self) -> &[u64] {
        &self.selections
    }

    /// Instant at which the next token is generated.
    pub fn next_event_time(&self) -> Option<SimTime> {
        (self.state == OracleState::Waiting && !self.token_generated)
            .then(|| self.wait.fires_at())
    }

    /// Marks the current grant as used by `miner`, which is in `state`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::TokenNotHeld`] if `miner` is not the
    /// selected holder and [`SimulationError::TokenSpent`] if it already
    /// appended for this selection.
    pub fn consume_token(
        &mut self,
        miner: Address,
        state: ProcessState,
    ) -> Result<(), SimulationError> {
        match self.grant {
            TokenGrant::Unspent(holder) if holder == miner => {
                self.grant = TokenGrant::Spent(holder);
                Ok(())
            }
            TokenGrant::Spent(holder) if holder == miner => {
                Err(SimulationError::TokenSpent { miner, state })
            }
            _ => Err(SimulationError::TokenNotHeld { miner, state }),
        }
    }

    fn wait_elapsed(&self, now: &SimTime) -> bool {
        self.wait.expired(*now) && !self.token_generated
    }

    fn generate(
        &mut self,
        _now: &SimTime,
        _rng: &mut dyn RngCore,
    ) -> Result<Option<Address>, SimulationError> {
        self.token_generated = true;
        Ok(None)
    }

    fn select(
        &mut self,
        now: &SimTime,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Address>, SimulationError> {
        let holder = self.sampler.sample(rng);
        self.token_holder = Some(holder);
        self.token_generated = false;
        self.grant = TokenGrant::Unspent(holder);
        self.wait = Timer::start(*now, sample_exponential(rng, self.mean_block_time));
        self.rounds += 1;
        self.selections[holder.index()] += 1;
        debug!(
            "round {} at {now}: token to process {holder}, next wait {}",
            self.rounds,
            self.wait.duration()
        );
        Ok(Some(holder))
    }
}

impl Automaton for ElectionOracle {
    type State = OracleState;
    type View = SimTime;
    /// Selected token holder.
    type Effect = Address;
    /// Number of completed rounds.
    type Id = u64;

    const KIND: &'static str = "oracle";
    const TRANSITIONS: &'static [Transition<Self>] = &[
        Transition {
            name: "generate-token",
            from: OracleState::Waiting,
            to: OracleState::TokenGenerated,
            guard: ElectionOracle::wait_elapsed,
            action: Some(ElectionOracle::generate),
        },
        Transition {
            name: "select-holder",
            from: OracleState::TokenGenerated,
            to: OracleState::Waiting,
            guard: |_, _| true,
            action: Some(ElectionOracle::select),
        },
    ];

    fn id(&self) -> u64 {
        self.rounds
    }

    fn time(now: &SimTime) -> SimTime {
        *now
    }

    fn state(&self) -> OracleState {
        self.state
    }

    fn enter(&mut self, state: OracleState) {
        self.state = state;
    }
}
