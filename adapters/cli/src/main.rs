#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a headless horde defense match.

mod config;
mod host;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;

use crate::{config::ConfigFile, host::SimulatedHost};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless horde defense match runner", long_about = None)]
struct Args {
    /// Path to a TOML match configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated seconds to run before giving up
    #[arg(long, default_value_t = 300)]
    seconds: u64,

    /// Overrides the configured random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Number of scripted defenders
    #[arg(long, default_value_t = 2)]
    defenders: u32,
}

/// Entry point for the horde defense command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let mut session = file.session_config()?;
    if let Some(seed) = args.seed {
        session.seed = seed;
    }

    let host = SimulatedHost::new(session, file.host_config(args.defenders))
        .context("invalid match configuration")?;
    let report = host.run(Duration::from_secs(args.seconds));

    match report.winner {
        Some(team) => println!(
            "team {} won after {:.1} s",
            team.get(),
            report.elapsed.as_secs_f32()
        ),
        None => println!(
            "no winner after {:.1} s",
            report.elapsed.as_secs_f32()
        ),
    }
    println!(
        "objectives destroyed: {}, horde spawned: {}, horde killed: {}, commands: {}",
        report.objectives_destroyed, report.horde_spawned, report.horde_killed, report.commands
    );
    Ok(())
}
