// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Command-line front end for the Monte-Carlo harness.
//!
//! Either loads a complete [`HarnessConfig`] from a TOML file or builds one
//! from the command-line arguments, runs it and prints the mean indicators.

use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::Context;
use log::info;
use powsim::{HarnessConfig, SamplingPlan, SimulationConfig, harness, logging};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Simulates block propagation in a proof-of-work network.
#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Harness config file (TOML), overrides all other parameters.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of mining processes.
    #[arg(long, default_value_t = 10)]
    processes: usize,
    /// Gives all processes the same merit instead of a random one in 1..=9.
    #[arg(long)]
    uniform: bool,
    /// Number of independent runs.
    #[arg(long, default_value_t = 100)]
    runs: usize,
    /// Simulated horizon in seconds.
    #[arg(long, default_value_t = 60.0)]
    t_max: f64,
    /// Number of sampling instants in `[0, t_max]`.
    #[arg(long, default_value_t = 20)]
    instants: usize,
    /// Mean time between blocks in seconds.
    #[arg(long)]
    mean_block_time: Option<f64>,
    /// Mean network transit time of every process in seconds.
    #[arg(long)]
    mean_transit_time: Option<f64>,
    /// Number of connections per process.
    #[arg(long)]
    connections: Option<usize>,
    /// Base seed, run `i` uses `seed + i`.
    #[arg(long)]
    seed: Option<u64>,
    /// Writes per-instant means to this CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Prints the full report as JSON.
    #[arg(long)]
    json: bool,
    /// Log filter used when `RUST_LOG` is not set, e.g. `powsim=debug`.
    #[arg(long, default_value = "info")]
    log_filter: String,
}

impl Args {
    fn harness_config(&self) -> Result<HarnessConfig> {
        if let Some(path) = &self.config {
            return HarnessConfig::load(path)
                .with_context(|| format!("can not load config from {}", path.display()));
        }
        let mut simulation = if self.uniform {
            SimulationConfig::uniform(self.processes)
        } else {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            SimulationConfig::random(self.processes, &mut rng)
        };
        if let Some(mean_block_time) = self.mean_block_time {
            simulation = simulation.with_mean_block_time(mean_block_time);
        }
        if let Some(mean_transit_time) = self.mean_transit_time {
            simulation = simulation.with_mean_transit_time(mean_transit_time);
        }
        if let Some(connections) = self.connections {
            simulation = simulation.with_connections_per_process(connections);
        }
        if let Some(seed) = self.seed {
            simulation = simulation.with_seed(seed);
        }
        let config = HarnessConfig::new(
            simulation,
            SamplingPlan::new(self.t_max, self.instants),
            self.runs,
        );
        config.validate().context("invalid parameters")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // enable fancy `color_eyre` error messages
    color_eyre::install()?;
    let args = Args::parse();
    logging::enable_logforth_with(&args.log_filter);

    let config = args.harness_config()?;
    let report = harness::run(&config).context("simulation failed")?;

    if let Some(path) = &args.csv {
        let file = File::create(path)
            .with_context(|| format!("can not create {}", path.display()))?;
        report.write_csv(file)?;
        info!("wrote per-instant means to {}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("time taken: {:.3} s", report.elapsed);
    println!("number of processors: {}", report.processes);
    println!("mean consensus probability: {:.4}", report.mean_consensus);
    println!("mean consistency: {:.4}", report.mean_consistency_rate);
    println!("worst process delay: {:.4}", report.mean_worst_delay);
    Ok(())
}
