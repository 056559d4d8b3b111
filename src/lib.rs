// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Powsim: Discrete-Event Simulator for Proof-of-Work Block Propagation
//!
//! A fixed set of mining processes competes for a merit-weighted token handed
//! out by an election oracle. The token holder appends a block to the shared
//! [`Ledger`], and every other process fetches that block over a small set of
//! delayed [`Connection`]s. Three indicators (consensus, consistency rate and
//! worst process delay) describe how quickly the network converges.
//!
//! Every entity is a guarded-transition [`Automaton`]. The [`Simulation`]
//! driver evaluates all of them to a fixed point at each simulated instant
//! and then jumps to the next instant at which some timer guard fires.
//!
//! [`Automaton`]: automaton::Automaton
//! [`Connection`]: process::Connection

#![deny(rustdoc::broken_intra_doc_links)]

pub mod automaton;
pub mod block;
pub mod config;
pub mod crypto;
pub mod error;
pub mod harness;
pub mod ledger;
pub mod logging;
pub mod oracle;
pub mod process;
pub mod sampling;
pub mod simulation;
#[cfg(test)]
pub mod test_utils;
pub mod types;

pub use self::block::Block;
pub use self::config::{HarnessConfig, ProcessConfig, SamplingPlan, SimulationConfig};
pub use self::crypto::BlockHash;
pub use self::error::{ConfigError, Error, SimulationError};
pub use self::harness::Report;
pub use self::ledger::Ledger;
pub use self::oracle::ElectionOracle;
pub use self::process::Process;
pub use self::simulation::{Indicators, Simulation};
pub use self::types::{Address, SimTime};

/// Merit type, the relative weight of a process in leader election.
pub type Merit = u64;
