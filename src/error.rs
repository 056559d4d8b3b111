// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types.
//!
//! [`ConfigError`] is returned while building a simulation and rejects
//! parameter sets under which some guard could never become true.
//! [`SimulationError`] signals a broken invariant during a run. It is fatal:
//! indicators computed after it would be meaningless.

use thiserror::Error;

use crate::crypto::BlockHash;
use crate::process::{ConnectionState, ProcessState};
use crate::types::{Address, SimTime};

/// Errors rejecting a configuration before any simulation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one process is required")]
    NoProcesses,
    #[error("process {0} has zero merit")]
    ZeroMerit(Address),
    #[error("total merit overflows")]
    MeritOverflow,
    #[error("every process needs at least one connection")]
    NoConnections,
    #[error("mean block time must be positive and finite, got {0}")]
    InvalidMeanBlockTime(f64),
    #[error("process {address} has invalid mean transit time {value}")]
    InvalidTransitTime { address: Address, value: f64 },
    #[error("sampling horizon must be non-negative and finite, got {0}")]
    InvalidHorizon(f64),
    #[error("sampling plan needs at least one instant")]
    NoInstants,
    #[error("at least one run is required")]
    NoRuns,
    #[error("can not read config file")]
    Io(#[from] std::io::Error),
    #[error("can not parse config file")]
    Parse(#[from] toml::de::Error),
}

/// Invariant violations that abort a simulation run.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error(
        "process {address} connection {connection} in {state:?} delivered block {block:?} before its parent"
    )]
    UnknownParent {
        address: Address,
        connection: usize,
        state: ConnectionState,
        block: BlockHash,
    },
    #[error(
        "process {address} connection {connection} in {state:?} delivered block {block:?} it was not waiting for"
    )]
    NotPending {
        address: Address,
        connection: usize,
        state: ConnectionState,
        block: BlockHash,
    },
    #[error("process {address} in {state:?} announced block {block:?} it already knows")]
    AlreadyKnown {
        address: Address,
        state: ProcessState,
        block: BlockHash,
    },
    #[error("process {address} in {state:?} has no connection to fetch block {block:?}")]
    NoConnection {
        address: Address,
        state: ProcessState,
        block: BlockHash,
    },
    #[error("process {miner} in {state:?} appended a block without holding the token")]
    TokenNotHeld { miner: Address, state: ProcessState },
    #[error("process {miner} in {state:?} appended twice with the same token")]
    TokenSpent { miner: Address, state: ProcessState },
    #[error("ledger has no parent {parent:?} for block {block:?}")]
    OrphanBlock { block: BlockHash, parent: BlockHash },
    #[error("can not move time backwards from {now} to {target}")]
    TimeReversal { now: SimTime, target: SimTime },
    #[error("no fixed point after {passes} passes at {time}")]
    NoFixedPoint { time: SimTime, passes: usize },
}

/// Any error returned by the simulation driver or harness.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}
