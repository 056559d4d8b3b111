// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Monte-Carlo harness.
//!
//! Runs many independent simulations in parallel, samples the indicators at
//! every instant of a [`SamplingPlan`] and averages them across runs.
//!
//! [`SamplingPlan`]: crate::SamplingPlan

use std::io::Write;
use std::time::Instant;

use log::{info, warn};
use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{HarnessConfig, SimulationConfig};
use crate::error::Error;
use crate::simulation::{Indicators, Simulation};
use crate::types::SimTime;

/// Indicators at one sampling instant, averaged over all runs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct InstantSummary {
    /// Sampling instant in seconds.
    pub time: f64,
    /// Fraction of runs in consensus, i.e. the consensus probability.
    pub consensus: f64,
    pub consistency_rate: f64,
    pub worst_delay: f64,
}

/// Aggregated outcome of a harness invocation.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub processes: usize,
    pub runs: usize,
    /// Run `i` was seeded with `base_seed + i`.
    pub base_seed: u64,
    /// Wall-clock time spent simulating, in seconds.
    pub elapsed: f64,
    pub mean_consensus: f64,
    pub mean_consistency_rate: f64,
    pub mean_worst_delay: f64,
    /// Largest connection backlog observed in any run.
    pub peak_backlog: usize,
    /// Mean number of blocks in the ledger at the end of a run.
    pub mean_blocks: f64,
    pub instants: Vec<InstantSummary>,
}

/// Samples collected during one run.
struct RunOutcome {
    samples: Vec<Indicators>,
    peak_backlog: usize,
    blocks: usize,
}

/// Runs all simulations described by `config` and aggregates the results.
///
/// # Errors
///
/// Returns an error if the config is invalid or any run violates an
/// invariant.
pub fn run(config: &HarnessConfig) -> Result<Report, Error> {
    config.validate()?;
    let base_seed = config
        .simulation
        .seed
        .unwrap_or_else(|| rand::rng().random());
    let instants = config.plan.instants();
    info!(
        "running {} simulations of {} processes up to {:.1} s",
        config.runs,
        config.simulation.num_processes(),
        config.plan.t_max
    );

    let start = Instant::now();
    let outcomes = (0..config.runs)
        .into_par_iter()
        .map(|run| {
            let seed = base_seed.wrapping_add(run as u64);
            run_once(&config.simulation, seed, &instants)
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let elapsed = start.elapsed().as_secs_f64();
    info!("finished {} runs in {elapsed:.2} s", config.runs);

    let report = aggregate(config, base_seed, elapsed, &instants, &outcomes);
    if report.peak_backlog > config.simulation.backlog_warning {
        warn!(
            "connection backlogs reached {} blocks, propagation can not keep up",
            report.peak_backlog
        );
    }
    Ok(report)
}

fn run_once(
    config: &SimulationConfig,
    seed: u64,
    instants: &[SimTime],
) -> Result<RunOutcome, Error> {
    let mut simulation = Simulation::new(config.clone().with_seed(seed))?;
    let mut samples = Vec::with_capacity(instants.len());
    for &instant in instants {
        simulation.advance_to(instant)?;
        samples.push(simulation.indicators());
    }
    Ok(RunOutcome {
        samples,
        peak_backlog: simulation.peak_backlog(),
        blocks: simulation.ledger().len(),
    })
}

fn aggregate(
    config: &HarnessConfig,
    base_seed: u64,
    elapsed: f64,
    instants: &[SimTime],
    outcomes: &[RunOutcome],
) -> Report {
    let runs = outcomes.len() as f64;
    let summaries: Vec<_> = instants
        .iter()
        .enumerate()
        .map(|(i, instant)| {
            let mut summary = InstantSummary {
                time: instant.as_secs(),
                consensus: 0.0,
                consistency_rate: 0.0,
                worst_delay: 0.0,
            };
            for outcome in outcomes {
                let sample = &outcome.samples[i];
                summary.consensus += f64::from(sample.consensus);
                summary.consistency_rate += sample.consistency_rate;
                summary.worst_delay += sample.worst_delay as f64;
            }
            summary.consensus /= runs;
            summary.consistency_rate /= runs;
            summary.worst_delay /= runs;
            summary
        })
        .collect();

    let mean = |f: fn(&InstantSummary) -> f64| {
        summaries.iter().map(f).sum::<f64>() / summaries.len() as f64
    };
    Report {
        processes: config.simulation.num_processes(),
        runs: outcomes.len(),
        base_seed,
        elapsed,
        mean_consensus: mean(|s| s.consensus),
        mean_consistency_rate: mean(|s| s.consistency_rate),
        mean_worst_delay: mean(|s| s.worst_delay),
        peak_backlog: outcomes.iter().map(|o| o.peak_backlog).max().unwrap_or(0),
        mean_blocks: outcomes.iter().map(|o| o.blocks as f64).sum::<f64>() / runs,
        instants: summaries,
    }
}

impl Report {
    /// Writes one CSV row per sampling instant.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        for summary in &self.instants {
            writer.serialize(summary)?;
        }
        writer.flush()?;
        Ok(())
    }
}
