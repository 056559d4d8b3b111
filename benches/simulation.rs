// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

use divan::counter::ItemsCount;
use powsim::crypto::hash;
use powsim::sampling::MeritWeightedSampler;
use powsim::{
    Address, Block, HarnessConfig, SamplingPlan, SimTime, Simulation, SimulationConfig, harness,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn main() {
    // run registered benchmarks.
    divan::main();
}

#[divan::bench]
fn block_hash(bencher: divan::Bencher) {
    let genesis = Block::genesis();
    bencher
        .counter(ItemsCount::new(1_usize))
        .bench(|| Block::child(&genesis, Address::new(1), SimTime::new(42)));
}

#[divan::bench]
fn genesis_digest() -> [u8; 32] {
    hash(divan::black_box(b"genesis"))
}

#[divan::bench(consts = [10, 100, 1000])]
fn sample_holder<const N: usize>(bencher: divan::Bencher) {
    let mut rng = StdRng::seed_from_u64(0);
    let config = SimulationConfig::random(N, &mut rng);
    let sampler = MeritWeightedSampler::new(&config.processes).unwrap();
    bencher
        .counter(ItemsCount::new(1_usize))
        .bench_local(|| sampler.sample(&mut rng));
}

#[divan::bench(consts = [10, 50, 200])]
fn rounds<const N: usize>(bencher: divan::Bencher) {
    const ROUNDS: u64 = 100;
    bencher
        .counter(ItemsCount::new(ROUNDS))
        .with_inputs(|| Simulation::new(SimulationConfig::uniform(N).with_seed(1)).unwrap())
        .bench_local_values(|mut simulation: Simulation| {
            simulation.run_rounds(ROUNDS).unwrap();
            simulation
        });
}

#[divan::bench(args = [1, 8])]
fn harness_runs(bencher: divan::Bencher, runs: usize) {
    let config = HarnessConfig::new(
        SimulationConfig::uniform(20).with_seed(7),
        SamplingPlan::new(30.0, 10),
        runs,
    );
    bencher
        .counter(ItemsCount::new(runs))
        .bench(|| harness::run(&config).unwrap());
}
