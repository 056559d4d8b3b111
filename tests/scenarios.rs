// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

use powsim::crypto::hash;
use powsim::{
    Address, BlockHash, HarnessConfig, Indicators, ProcessConfig, SimTime, Simulation,
    SimulationConfig, harness,
};

fn timed(n: usize, mean_block_time: f64, mean_transit_time: f64, seed: u64) -> Simulation {
    let config = SimulationConfig {
        mean_block_time,
        processes: vec![ProcessConfig::new(1).with_mean_transit_time(mean_transit_time); n],
        ..SimulationConfig::uniform(n)
    }
    .with_seed(seed);
    Simulation::new(config).unwrap()
}

/// Advances `simulation` through `instants` evenly spaced points up to
/// `t_max` seconds and returns the indicators at each of them.
fn sample(simulation: &mut Simulation, t_max: f64, instants: usize) -> Vec<Indicators> {
    (0..instants)
        .map(|i| {
            let t = SimTime::from_secs(t_max * i as f64 / (instants - 1) as f64);
            simulation.advance_to(t).unwrap();
            simulation.indicators()
        })
        .collect()
}

fn assert_causal(simulation: &Simulation) {
    for process in simulation.processes() {
        for block in process.known_blocks() {
            if let Some(parent) = block.parent() {
                assert!(process.knows(&parent));
            }
        }
    }
}

#[test]
fn consistency_matches_consensus() {
    for seed in 0..5 {
        let mut simulation = timed(8, 1.0, 0.5, seed);
        for _ in 0..200 {
            simulation.step().unwrap();
            let Indicators {
                consensus,
                consistency_rate,
                ..
            } = simulation.indicators();
            assert!((0.0..=1.0).contains(&consistency_rate));
            assert_eq!(consensus == 1, consistency_rate == 1.0);
            for process in simulation.processes() {
                assert!(process.known_len() <= simulation.ledger().len());
            }
        }
    }
}

#[test]
fn delivery_is_causal() {
    // few slow connections build up backlogs
    let config = SimulationConfig::with_merits(&[1, 2, 3, 4, 5])
        .with_mean_transit_time(2.0)
        .with_connections_per_process(1)
        .with_seed(3);
    let mut simulation = Simulation::new(config).unwrap();
    for _ in 0..1000 {
        simulation.step().unwrap();
        assert_causal(&simulation);
    }
    assert!(simulation.peak_backlog() > 0);
}

#[test]
fn deterministic_given_seed() {
    let run = || {
        let mut simulation = Simulation::new(SimulationConfig::with_merits(&[4, 1, 2]).with_seed(99))
            .unwrap();
        let indicators = sample(&mut simulation, 30.0, 31);
        let hashes: Vec<BlockHash> = simulation.ledger().iter().map(|b| b.hash()).collect();
        (indicators, hashes)
    };
    let (indicators_a, hashes_a) = run();
    let (indicators_b, hashes_b) = run();
    assert!(hashes_a.len() > 1);
    assert_eq!(hashes_a, hashes_b);
    assert_eq!(indicators_a, indicators_b);
}

#[test]
fn genesis_is_shared() {
    let simulation = Simulation::new(SimulationConfig::uniform(4).with_seed(0)).unwrap();
    let genesis = simulation.ledger().genesis();
    assert_eq!(genesis.depth(), 0);
    assert_eq!(genesis.parent(), None);
    assert_eq!(genesis.miner(), None);
    assert_eq!(genesis.hash(), BlockHash::new(hash(b"genesis")));
    for process in simulation.processes() {
        assert!(process.knows(&genesis.hash()));
        assert_eq!(process.known_len(), 1);
    }
}

#[test]
fn single_process_builds_one_chain() {
    let config = SimulationConfig::with_merits(&[7])
        .with_connections_per_process(0)
        .with_seed(5);
    let mut simulation = Simulation::new(config).unwrap();
    let rounds = 50;
    for _ in 0..rounds {
        simulation.run_rounds(1).unwrap();
        assert_eq!(simulation.consensus(), 1);
        assert_eq!(simulation.worst_delay(), 0);
    }

    let ledger = simulation.ledger();
    assert_eq!(ledger.len(), rounds + 1);
    let depths: Vec<u64> = ledger.iter().map(|b| b.depth()).collect();
    assert_eq!(depths, (0..=rounds as u64).collect::<Vec<_>>());
    assert!(ledger.iter().skip(1).all(|b| b.miner() == Some(Address::new(1))));
    assert_eq!(ledger.longest_chain().len(), rounds + 1);
    assert_eq!(simulation.total_pending(), 0);
}

#[test]
fn slow_transit_lags_behind() {
    let mut simulation = timed(2, 1.0, 200.0, 8);
    let samples = sample(&mut simulation, 40.0, 5);
    assert_eq!(samples[0].worst_delay, 0);
    assert!(samples[4].worst_delay > 0);
    assert!(samples[4].worst_delay >= samples[1].worst_delay);
    assert!(samples[4].consistency_rate < 1.0);
    assert_eq!(samples[4].consensus, 0);
    assert!(simulation.total_pending() > 0);
    assert_causal(&simulation);
}

#[test]
fn fast_transit_stays_consistent() {
    let mut simulation = timed(2, 10.0, 0.001, 8);
    let samples = sample(&mut simulation, 500.0, 51);
    let mean = samples.iter().map(|s| s.consistency_rate).sum::<f64>() / samples.len() as f64;
    assert!(mean > 0.9, "mean consistency {mean}");
}

#[test]
fn selection_follows_merit() {
    let config = SimulationConfig::with_merits(&[9, 1]).with_seed(21);
    let mut simulation = Simulation::new(config).unwrap();
    let rounds = 5000;
    simulation.run_rounds(rounds).unwrap();

    let counts = simulation.oracle().selection_counts();
    assert_eq!(counts.iter().sum::<u64>(), rounds);
    let freq = counts[0] as f64 / rounds as f64;
    assert!((freq - 0.9).abs() < 0.02, "frequency {freq}");

    let mined_by_first = simulation
        .ledger()
        .iter()
        .filter(|b| b.miner() == Some(Address::new(1)))
        .count();
    assert_eq!(mined_by_first as u64, counts[0]);
}

#[test]
fn harness_from_toml() {
    let config = HarnessConfig::from_toml_str(
        r#"
        runs = 4

        [plan]
        t_max = 20.0
        instants = 5

        [simulation]
        mean_block_time = 2.0
        connections_per_process = 3
        seed = 1
        processes = [
            { merit = 3, mean_transit_time = 0.2 },
            { merit = 1 },
            { merit = 1 },
        ]
        "#,
    )
    .unwrap();
    let report = harness::run(&config).unwrap();
    assert_eq!(report.runs, 4);
    assert_eq!(report.processes, 3);
    assert_eq!(report.instants.len(), 5);
    assert!((0.0..=1.0).contains(&report.mean_consistency_rate));
    assert!(report.mean_worst_delay >= 0.0);
}
