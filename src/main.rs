// SPDX-License-Identifier: PMPL-1.0-or-later

//! crash-probe: deliberately crash this process in a chosen, categorized way
//!
//! A fixture for exercising crash reporters. Pick a probe by name (or at
//! random), and the process dies through that probe's fault mechanism.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use crash_probe::config::DriverConfig;
use crash_probe::driver::{self, FireOptions, LaunchOutcome};
use crash_probe::report::{self, ListFormat};
use crash_probe::types::ProbeCategory;
use crash_probe::Registry;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "crash-probe")]
#[command(version)]
#[command(about = "Deliberately crash this process in a chosen, categorized way")]
#[command(long_about = None)]
struct Cli {
    /// Driver config file (JSON or YAML)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Suppress driver status lines (the breadcrumb is always printed)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered probes
    List {
        /// Only show one category
        #[arg(long, value_enum)]
        category: Option<ProbeCategory>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: ListFormat,
    },

    /// Show details for one probe
    Describe {
        #[arg(value_name = "PROBE")]
        name: String,
    },

    /// Fire a probe by name
    Run {
        #[arg(value_name = "PROBE")]
        name: String,

        /// Call the probe directly instead of through a random call chain
        #[arg(long)]
        no_chain: bool,

        /// Seconds before the SIGKILL fallback (0 disables)
        #[arg(long)]
        fallback_secs: Option<u64>,

        /// Milliseconds to wait after the breadcrumb
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Fire a randomly chosen probe
    Random {
        /// Restrict the pick to one category
        #[arg(long, value_enum)]
        category: Option<ProbeCategory>,

        #[arg(long)]
        no_chain: bool,

        #[arg(long)]
        fallback_secs: Option<u64>,
    },

    /// Crash once per run id, driven by config and CRASH_PROBE_* variables
    Launch,
}

fn status(quiet: bool, message: String) {
    if !quiet {
        eprintln!("{} {}", "crash-probe:".bold(), message);
    }
}

fn fire_options(
    config: &DriverConfig,
    no_chain: bool,
    fallback_secs: Option<u64>,
    delay_ms: Option<u64>,
) -> FireOptions {
    let mut options = FireOptions::from_config(config);
    if no_chain {
        options.call_chain = false;
    }
    if let Some(secs) = fallback_secs {
        options.fallback = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if let Some(ms) = delay_ms {
        options.delay = Duration::from_millis(ms);
    }
    options
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let registry = Registry::builtin();

    match cli.command {
        Commands::List { category, format } => {
            println!("{}", report::render(&registry, format, category)?);
        }

        Commands::Describe { name } => {
            let probe = registry.lookup(&name)?;
            println!("{}", report::describe(probe));
        }

        Commands::Run {
            name,
            no_chain,
            fallback_secs,
            delay_ms,
        } => {
            let probe = registry.lookup(&name)?;
            let config = DriverConfig::resolve(cli.config.as_deref())?;
            let options = fire_options(&config, no_chain, fallback_secs, delay_ms);
            let mut rng = StdRng::from_entropy();

            status(
                cli.quiet,
                format!("running {} (expect {})", probe.name, probe.expected),
            );
            driver::fire(probe, &options, &mut rng)
        }

        Commands::Random {
            category,
            no_chain,
            fallback_secs,
        } => {
            let config = DriverConfig::resolve(cli.config.as_deref())?;
            let options = fire_options(&config, no_chain, fallback_secs, None);
            let mut rng = StdRng::from_entropy();
            let probe = registry.pick(&mut rng, category)?;

            status(
                cli.quiet,
                format!("picked {} (expect {})", probe.name, probe.expected),
            );
            driver::fire(probe, &options, &mut rng)
        }

        Commands::Launch => {
            let config = DriverConfig::resolve(cli.config.as_deref())?;
            let mut rng = StdRng::from_entropy();

            match driver::prepare_launch(&registry, &config, &mut rng)? {
                LaunchOutcome::Disabled => {
                    status(
                        cli.quiet,
                        "launch mode disabled (set CRASH_PROBE_ON_LAUNCH=1)".to_string(),
                    );
                }
                LaunchOutcome::AlreadyCrashed { marker, path } => {
                    status(
                        cli.quiet,
                        format!(
                            "run {} already crashed with {} at {} ({})",
                            marker.run_id,
                            marker.probe,
                            marker.armed_at,
                            path.display()
                        )
                        .green()
                        .to_string(),
                    );
                }
                LaunchOutcome::Armed { probe, delay } => {
                    status(
                        cli.quiet,
                        format!(
                            "run {} armed: {} in {}ms",
                            config.run_id,
                            probe.name,
                            delay.as_millis()
                        ),
                    );
                    let options = FireOptions {
                        delay,
                        ..FireOptions::from_config(&config)
                    };
                    driver::fire(probe, &options, &mut rng)
                }
            }
        }
    }

    Ok(())
}
