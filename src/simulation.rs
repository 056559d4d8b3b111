// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Discrete-event simulation driver.
//!
//! The [`Simulation`] owns the oracle, the ledger and all processes. At every
//! simulated instant it evaluates all automata to a fixed point: in each pass
//! the oracle fires first, then every process in address order, each one
//! followed by its connections. Blocks mined during a pass are appended to
//! the ledger right away, so later processes in the same pass already see
//! them. Time then jumps to the earliest instant at which some timer guard
//! becomes true.

use std::sync::Arc;

use log::{debug, trace};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::Block;
use crate::automaton::{self, Automaton};
use crate::config::SimulationConfig;
use crate::error::{ConfigError, SimulationError};
use crate::ledger::Ledger;
use crate::oracle::ElectionOracle;
use crate::process::{Process, ProcessState, ProcessView};
use crate::types::{Address, SimTime};

/// Upper bound on evaluation passes within a single instant.
const MAX_PASSES: usize = 1024;

/// Indicators describing the state of the network at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Indicators {
    pub time: SimTime,
    /// 1 iff every process knows exactly the blocks in the ledger.
    pub consensus: u8,
    /// Fraction of processes that know exactly the blocks in the ledger.
    pub consistency_rate: f64,
    /// Largest number of ledger blocks missing from any single process.
    pub worst_delay: usize,
}

/// A fully wired simulation of a mining network.
pub struct Simulation {
    config: SimulationConfig,
    seed: u64,
    now: SimTime,
    ledger: Ledger,
    oracle: ElectionOracle,
    processes: Vec<Process>,
    rng: StdRng,
}

impl Simulation {
    /// Builds the network described by `config`, starting at time zero with
    /// only the genesis block.
    ///
    /// Without a configured seed a random one is drawn, see [`Simulation::seed`].
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not pass validation.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        let genesis = Arc::new(Block::genesis());
        let ledger = Ledger::new(genesis.clone());
        let oracle = ElectionOracle::new(&config, &mut rng)?;
        let processes = config
            .processes
            .iter()
            .enumerate()
            .map(|(index, process)| {
                Process::new(
                    Address::from_index(index),
                    process,
                    genesis.clone(),
                    config.connections_per_process,
                    config.backlog_warning,
                )
            })
            .collect();
        debug!(
            "simulating {} processes with seed {seed}",
            config.processes.len()
        );

        Ok(Self {
            config,
            seed,
            now: SimTime::ZERO,
            ledger,
            oracle,
            processes,
            rng,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Seed the random number generator was initialized with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn oracle(&self) -> &ElectionOracle {
        &self.oracle
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Returns the process with the given address.
    pub fn process(&self, address: Address) -> Option<&Process> {
        self.processes.get(address.index())
    }

    /// Number of tokens handed out so far.
    pub fn rounds(&self) -> u64 {
        self.oracle.rounds()
    }

    /// Earliest future instant at which a timer guard becomes true.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.processes
            .iter()
            .filter_map(Process::next_event_time)
            .chain(self.oracle.next_event_time())
            .min()
    }

    /// Jumps to the next event and settles there.
    ///
    /// Returns the new time, or `None` if no event is scheduled.
    ///
    /// # Errors
    ///
    /// Returns an error if an invariant is violated while settling.
    pub fn step(&mut self) -> Result<Option<SimTime>, SimulationError> {
        let Some(next) = self.next_event_time() else {
            return Ok(None);
        };
        self.now = next;
        self.settle()?;
        Ok(Some(next))
    }

    /// Processes every event up to and including `target`, then settles at
    /// `target` itself.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::TimeReversal`] if `target` lies in the
    /// past, or any invariant violation hit on the way.
    pub fn advance_to(&mut self, target: SimTime) -> Result<(), SimulationError> {
        if target < self.now {
            return Err(SimulationError::TimeReversal {
                now: self.now,
                target,
            });
        }
        while let Some(next) = self.next_event_time() {
            if next > target {
                break;
            }
            self.now = next;
            self.settle()?;
        }
        self.now = target;
        self.settle()?;
        Ok(())
    }

    /// Runs until `rounds` more tokens have been handed out.
    ///
    /// # Errors
    ///
    /// Returns an error if an invariant is violated on the way.
    pub fn run_rounds(&mut self, rounds: u64) -> Result<(), SimulationError> {
        let target = self.oracle.rounds() + rounds;
        while self.oracle.rounds() < target {
            if self.step()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Evaluates all automata until no transition fires anymore.
    fn settle(&mut self) -> Result<(), SimulationError> {
        for pass in 0..MAX_PASSES {
            let mut fired = 0;
            if let Some(transition) = automaton::fire(&mut self.oracle, &self.now, &mut self.rng)? {
                fired += 1;
                if let Some(holder) = transition.effect {
                    trace!("token holder is now {holder}");
                }
            }
            for index in 0..self.processes.len() {
                let view = self.process_view();
                let step = self.processes[index].step(&view, &mut self.rng)?;
                fired += step.fired;
                if let Some(block) = step.mined {
                    let miner = self.processes[index].address();
                    let state = self.processes[index].state();
                    self.append(miner, state, block)?;
                }
            }
            if fired == 0 {
                trace!("fixed point at {} after {pass} passes", self.now);
                return Ok(());
            }
        }
        Err(SimulationError::NoFixedPoint {
            time: self.now,
            passes: MAX_PASSES,
        })
    }

    fn process_view(&self) -> ProcessView {
        let token_holder = self.oracle.token_holder();
        ProcessView {
            now: self.now,
            token_holder,
            token_generated: self.oracle.token_generated(),
            holder_mean_transit_time: token_holder
                .and_then(|holder| self.oracle.mean_transit_time(holder)),
            appended: self.ledger.last_appended().clone(),
        }
    }

    fn append(
        &mut self,
        miner: Address,
        state: ProcessState,
        block: Arc<Block>,
    ) -> Result<(), SimulationError> {
        self.oracle.consume_token(miner, state)?;
        debug!(
            "ledger append {:?} by {miner} at depth {}",
            block.hash(),
            block.depth()
        );
        self.ledger.append(block)?;
        Ok(())
    }

    /// Returns 1 iff every process knows exactly the ledger's blocks, else 0.
    pub fn consensus(&self) -> u8 {
        u8::from(self.synchronized() == self.processes.len())
    }

    /// Fraction of processes that know exactly the ledger's blocks.
    pub fn consistency_rate(&self) -> f64 {
        self.synchronized() as f64 / self.processes.len() as f64
    }

    /// Largest number of ledger blocks unknown to a single process.
    pub fn worst_delay(&self) -> usize {
        self.processes
            .iter()
            .map(|p| self.ledger.len().saturating_sub(p.known_len()))
            .max()
            .unwrap_or(0)
    }

    /// Evaluates all three indicators at the current time.
    pub fn indicators(&self) -> Indicators {
        Indicators {
            time: self.now,
            consensus: self.consensus(),
            consistency_rate: self.consistency_rate(),
            worst_delay: self.worst_delay(),
        }
    }

    fn synchronized(&self) -> usize {
        self.processes
            .iter()
            .filter(|p| p.is_synchronized(&self.ledger))
            .count()
    }

    /// Longest backlog currently waiting on any connection.
    pub fn max_backlog(&self) -> usize {
        self.processes
            .iter()
            .map(Process::max_backlog)
            .max()
            .unwrap_or(0)
    }

    /// Longest backlog any connection had so far.
    pub fn peak_backlog(&self) -> usize {
        self.processes
            .iter()
            .map(Process::peak_backlog)
            .max()
            .unwrap_or(0)
    }

    /// Total number of blocks announced but not yet delivered.
    pub fn total_pending(&self) -> usize {
        self.processes.iter().map(Process::pending_len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_invariants, seeded_simulation, timed_config};

    #[test]
    fn starts_in_consensus() {
        let sim = seeded_simulation(&[1, 2, 3], 0);
        assert_eq!(sim.now(), SimTime::ZERO);
        assert_eq!(sim.ledger().len(), 1);
        assert_eq!(sim.seed(), 0);
        assert_eq!(
            sim.indicators(),
            Indicators {
                time: SimTime::ZERO,
                consensus: 1,
                consistency_rate: 1.0,
                worst_delay: 0,
            }
        );
        for process in sim.processes() {
            assert!(process.knows(&sim.ledger().genesis().hash()));
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SimulationConfig::with_merits(&[1, 1]).with_connections_per_process(0);
        assert!(matches!(
            Simulation::new(config),
            Err(ConfigError::NoConnections)
        ));
        assert!(matches!(
            Simulation::new(SimulationConfig::with_merits(&[])),
            Err(ConfigError::NoProcesses)
        ));
        assert!(matches!(
            Simulation::new(SimulationConfig::with_merits(&[1, 0])),
            Err(ConfigError::ZeroMerit(_))
        ));
    }

    #[test]
    fn one_round_appends_one_block() {
        let mut sim = seeded_simulation(&[1, 1, 1], 5);
        sim.run_rounds(1).unwrap();
        assert_eq!(sim.rounds(), 1);
        assert_eq!(sim.ledger().len(), 2);

        let block = sim.ledger().last_appended().clone();
        let holder = sim.oracle().token_holder().unwrap();
        assert_eq!(block.miner(), Some(holder));
        assert_eq!(block.timestamp(), sim.now());
        assert!(sim.process(holder).unwrap().knows(&block.hash()));

        // everybody else is now waiting for it
        for process in sim.processes() {
            if process.address() != holder {
                assert!(process.is_pending(&block.hash()));
            }
            assert_eq!(process.state(), ProcessState::Working);
        }
        assert_eq!(sim.total_pending(), 2);
        assert_eq!(sim.worst_delay(), 1);
        assert_eq!(sim.consensus(), 0);
        assert!((sim.consistency_rate() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn advance_to_settles_at_target() {
        let mut sim = seeded_simulation(&[1, 1], 9);
        let target = SimTime::from_secs(5.0);
        sim.advance_to(target).unwrap();
        assert_eq!(sim.now(), target);
        assert!(sim.next_event_time().unwrap() > target);
        assert_eq!(
            sim.advance_to(SimTime::from_secs(1.0)),
            Err(SimulationError::TimeReversal {
                now: target,
                target: SimTime::from_secs(1.0)
            })
        );
    }

    #[test]
    fn blocks_propagate_after_quiet_period() {
        // tokens are rare compared to transit times
        let config = timed_config(4, 1e6, 0.001).with_seed(11);
        let mut sim = Simulation::new(config).unwrap();
        sim.run_rounds(3).unwrap();
        assert_eq!(sim.ledger().len(), 4);
        // transits are sub-second, the next token is far away
        let quiet = sim.now() + SimTime::from_secs(1.0);
        assert!(
            sim.oracle()
                .next_event_time()
                .is_some_and(|next| next > quiet)
        );
        sim.advance_to(quiet).unwrap();
        assert_eq!(sim.consensus(), 1);
        assert_eq!(sim.total_pending(), 0);
    }

    #[test]
    fn second_append_reports_miner_state() {
        let mut sim = seeded_simulation(&[1, 1, 1], 5);
        sim.run_rounds(1).unwrap();
        let holder = sim.oracle().token_holder().unwrap();
        let block = sim.ledger().last_appended().clone();
        let state = sim.process(holder).unwrap().state();
        assert_eq!(state, ProcessState::HoldingToken);
        assert_eq!(
            sim.append(holder, state, block.clone()),
            Err(SimulationError::TokenSpent {
                miner: holder,
                state: ProcessState::HoldingToken
            })
        );
        let other = sim
            .processes()
            .iter()
            .map(Process::address)
            .find(|&a| a != holder)
            .unwrap();
        assert_eq!(
            sim.append(other, ProcessState::Working, block),
            Err(SimulationError::TokenNotHeld {
                miner: other,
                state: ProcessState::Working
            })
        );
        assert_eq!(sim.ledger().len(), 2);
    }

    #[test]
    fn invariants_hold_while_running() {
        let config = timed_config(6, 1.0, 0.8).with_connections_per_process(2);
        let mut sim = Simulation::new(config.with_seed(23)).unwrap();
        for _ in 0..500 {
            sim.step().unwrap();
            assert_invariants(&sim);
        }
        assert!(sim.rounds() > 0);
    }
}
