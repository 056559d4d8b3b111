// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Utility functions for tests.

use crate::{Merit, ProcessConfig, Simulation, SimulationConfig};

/// Creates a simulation with one process per merit and a fixed seed.
pub fn seeded_simulation(merits: &[Merit], seed: u64) -> Simulation {
    let config = SimulationConfig::with_merits(merits).with_seed(seed);
    Simulation::new(config).unwrap()
}

/// Creates a config of `n` equal-merit processes with the given timings.
pub fn timed_config(n: usize, mean_block_time: f64, mean_transit_time: f64) -> SimulationConfig {
    SimulationConfig {
        mean_block_time,
        processes: vec![ProcessConfig::new(1).with_mean_transit_time(mean_transit_time); n],
        ..SimulationConfig::uniform(n)
    }
}

/// Checks the invariants that must hold at every instant of a run.
///
/// # Panics
///
/// Panics if any process knows a block missing from the ledger, knows a
/// block without its parent, or lost genesis.
pub fn assert_invariants(simulation: &Simulation) {
    let ledger = simulation.ledger();
    let genesis = ledger.genesis().hash();
    for process in simulation.processes() {
        assert!(process.knows(&genesis));
        assert!(process.known_len() <= ledger.len());
        for block in process.known_blocks() {
            assert!(ledger.contains(&block.hash()));
            if let Some(parent) = block.parent() {
                assert!(
                    process.knows(&parent),
                    "process {} knows {:?} but not its parent",
                    process.address(),
                    block.hash()
                );
            }
        }
    }
    let indicators = simulation.indicators();
    assert!((0.0..=1.0).contains(&indicators.consistency_rate));
    assert_eq!(
        indicators.consensus == 1,
        indicators.consistency_rate == 1.0
    );
}
