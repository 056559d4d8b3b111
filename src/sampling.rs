// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Random sampling used by the timing model and leader election.

use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;

use crate::error::ConfigError;
use crate::types::{Address, SimTime};
use crate::{Merit, ProcessConfig};

/// Samples an exponentially distributed duration with the given mean in seconds.
pub fn sample_exponential(rng: &mut dyn RngCore, mean_secs: f64) -> SimTime {
    // inverse transform, `1 - u` lies in (0, 1]
    let u = rng.random::<f64>();
    let secs = -mean_secs * (1.0 - u).ln();
    SimTime::from_secs(secs.max(0.0))
}

/// Entry of the merit table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeritEntry {
    pub address: Address,
    pub merit: Merit,
    /// Merit divided by the total merit of all processes.
    pub weight: f64,
    /// Configured mean transit time of the process in seconds.
    pub mean_transit_time: f64,
}

/// A sampler that picks processes directly proportional to their merit.
///
/// The table is fixed at construction.
#[derive(Clone, Debug)]
pub struct MeritWeightedSampler {
    entries: Vec<MeritEntry>,
    merit_index: WeightedIndex<f64>,
}

impl MeritWeightedSampler {
    /// Builds the normalized merit table for the given processes.
    ///
    /// Process `i` gets address `i + 1`.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no processes, any merit is zero
    /// or the total merit overflows.
    pub fn new(processes: &[ProcessConfig]) -> Result<Self, ConfigError> {
        if processes.is_empty() {
            return Err(ConfigError::NoProcesses);
        }
        let mut total: Merit = 0;
        for (index, process) in processes.iter().enumerate() {
            if process.merit == 0 {
                return Err(ConfigError::ZeroMerit(Address::from_index(index)));
            }
            total = total
                .checked_add(process.merit)
                .ok_or(ConfigError::MeritOverflow)?;
        }
        let entries: Vec<_> = processes
            .iter()
            .enumerate()
            .map(|(index, process)| MeritEntry {
                address: Address::from_index(index),
                merit: process.merit,
                weight: process.merit as f64 / total as f64,
                mean_transit_time: process.mean_transit_time,
            })
            .collect();
        let merit_index = WeightedIndex::new(entries.iter().map(|e| e.weight))
            .map_err(|_| ConfigError::NoProcesses)?;
        Ok(Self {
            entries,
            merit_index,
        })
    }

    /// Samples one address, weighted by merit.
    pub fn sample(&self, rng: &mut dyn RngCore) -> Address {
        let index = self.merit_index.sample(rng);
        self.entries[index].address
    }

    /// Returns the table entry for `address`.
    pub fn entry(&self, address: Address) -> Option<&MeritEntry> {
        self.entries.get(address.index())
    }

    pub fn entries(&self) -> &[MeritEntry] {
        &self.entries
    }
}
