// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulation parameters.
//!
//! All parameter types can be loaded from TOML files. A harness file looks
//! like this:
//!
//! ```toml
//! runs = 100
//!
//! [plan]
//! t_max = 60.0
//! instants = 20
//!
//! [simulation]
//! mean_block_time = 1.0
//! connections_per_process = 5
//! seed = 42
//! processes = [
//!     { merit = 9, mean_transit_time = 0.1 },
//!     { merit = 1 },
//! ]
//! ```

use std::fs;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Merit;
use crate::error::ConfigError;
use crate::types::{Address, SimTime};

const fn default_mean_block_time() -> f64 {
    1.0
}

const fn default_mean_transit_time() -> f64 {
    0.1
}

const fn default_connections_per_process() -> usize {
    5
}

const fn default_backlog_warning() -> usize {
    64
}

const fn default_runs() -> usize {
    1
}

/// Per-process parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Relative weight in leader election.
    pub merit: Merit,
    /// Mean network transit time in seconds.
    #[serde(default = "default_mean_transit_time")]
    pub mean_transit_time: f64,
}

impl ProcessConfig {
    /// Creates a process config with the default mean transit time.
    pub const fn new(merit: Merit) -> Self {
        Self {
            merit,
            mean_transit_time: default_mean_transit_time(),
        }
    }

    /// Turns this instance into a new instance with a different mean transit time.
    #[must_use]
    pub const fn with_mean_transit_time(mut self, mean_transit_time: f64) -> Self {
        self.mean_transit_time = mean_transit_time;
        self
    }
}

/// Parameters consumed by the simulation engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Mean time between two token generations, in seconds.
    #[serde(default = "default_mean_block_time")]
    pub mean_block_time: f64,
    /// Number of parallel link slots per process.
    #[serde(default = "default_connections_per_process")]
    pub connections_per_process: usize,
    /// Seed for the random number generator, a fresh one is drawn if missing.
    #[serde(default)]
    pub seed: Option<u64>,
    /// A warning is logged once a connection backlog grows beyond this.
    #[serde(default = "default_backlog_warning")]
    pub backlog_warning: usize,
    pub processes: Vec<ProcessConfig>,
}

impl SimulationConfig {
    /// Creates a config with one process per given merit and all defaults.
    pub fn with_merits(merits: &[Merit]) -> Self {
        Self {
            mean_block_time: default_mean_block_time(),
            connections_per_process: default_connections_per_process(),
            seed: None,
            backlog_warning: default_backlog_warning(),
            processes: merits.iter().map(|&m| ProcessConfig::new(m)).collect(),
        }
    }

    /// Creates a config with `num_processes` processes of equal merit.
    pub fn uniform(num_processes: usize) -> Self {
        Self::with_merits(&vec![1; num_processes])
    }

    /// Creates a config with `num_processes` processes of random merit in `1..10`.
    pub fn random(num_processes: usize, rng: &mut impl Rng) -> Self {
        let merits: Vec<Merit> = (0..num_processes)
            .map(|_| rng.random_range(1..10))
            .collect();
        Self::with_merits(&merits)
    }

    /// Turns this instance into a new instance with a fixed seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Turns this instance into a new instance with a different mean block time.
    #[must_use]
    pub fn with_mean_block_time(mut self, mean_block_time: f64) -> Self {
        self.mean_block_time = mean_block_time;
        self
    }

    /// Turns this instance into a new instance where all processes share
    /// the given mean transit time.
    #[must_use]
    pub fn with_mean_transit_time(mut self, mean_transit_time: f64) -> Self {
        for process in &mut self.processes {
            process.mean_transit_time = mean_transit_time;
        }
        self
    }

    /// Turns this instance into a new instance with a different fan-out.
    #[must_use]
    pub fn with_connections_per_process(mut self, connections: usize) -> Self {
        self.connections_per_process = connections;
        self
    }

    /// Turns this instance into a new instance with a different backlog warning.
    #[must_use]
    pub fn with_backlog_warning(mut self, backlog_warning: usize) -> Self {
        self.backlog_warning = backlog_warning;
        self
    }

    /// Number of configured processes.
    pub fn num_processes(&self) -> usize {
        self.processes.len()
    }

    /// Total merit across all processes.
    pub fn total_merit(&self) -> Option<Merit> {
        self.processes
            .iter()
            .try_fold(0u64, |total, p| total.checked_add(p.merit))
    }

    /// Checks that every guard of the resulting network can eventually fire.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processes.is_empty() {
            return Err(ConfigError::NoProcesses);
        }
        if !(self.mean_block_time.is_finite() && self.mean_block_time > 0.0) {
            return Err(ConfigError::InvalidMeanBlockTime(self.mean_block_time));
        }
        // a single process never needs to fetch anything
        if self.connections_per_process == 0 && self.processes.len() > 1 {
            return Err(ConfigError::NoConnections);
        }
        for (index, process) in self.processes.iter().enumerate() {
            let address = Address::from_index(index);
            if process.merit == 0 {
                return Err(ConfigError::ZeroMerit(address));
            }
            let value = process.mean_transit_time;
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidTransitTime { address, value });
            }
        }
        if self.total_merit().is_none() {
            return Err(ConfigError::MeritOverflow);
        }
        Ok(())
    }

    /// Parses a config from a TOML string and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

/// Evenly spaced instants at which indicators are sampled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplingPlan {
    /// Simulated horizon in seconds.
    pub t_max: f64,
    /// Number of sampling instants in `[0, t_max]`.
    pub instants: usize,
}

impl SamplingPlan {
    pub const fn new(t_max: f64, instants: usize) -> Self {
        Self { t_max, instants }
    }

    /// Checks that the plan yields at least one valid instant.
    ///
    /// # Errors
    ///
    /// Returns an error for a negative or non-finite horizon or zero instants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.t_max.is_finite() && self.t_max >= 0.0) {
            return Err(ConfigError::InvalidHorizon(self.t_max));
        }
        if self.instants == 0 {
            return Err(ConfigError::NoInstants);
        }
        Ok(())
    }

    /// Returns the sampling instants in increasing order.
    ///
    /// A single instant is placed at `t_max`, otherwise the first is at zero
    /// and the last at `t_max`.
    pub fn instants(&self) -> Vec<SimTime> {
        match self.instants {
            0 => Vec::new(),
            1 => vec![SimTime::from_secs(self.t_max)],
            n => (0..n)
                .map(|i| SimTime::from_secs(self.t_max * i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

/// Parameters for repeated Monte-Carlo runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Number of independent runs.
    #[serde(default = "default_runs")]
    pub runs: usize,
    pub plan: SamplingPlan,
    pub simulation: SimulationConfig,
}

impl HarnessConfig {
    pub fn new(simulation: SimulationConfig, plan: SamplingPlan, runs: usize) -> Self {
        Self {
            simulation,
            plan,
            runs,
        }
    }

    /// Validates all parts of the config.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        self.plan.validate()?;
        if self.runs == 0 {
            return Err(ConfigError::NoRuns);
        }
        Ok(())
    }

    /// Loads and validates a harness config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can not be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// Parses and validates a harness config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
