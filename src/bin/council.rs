//! Starts an entire council from a config file and runs it to completion.
//!
//! Run this binary as follows
//!     RUST_LOG=info cargo run --bin council -- path/to/config.json
//! where the config file is a JSON array of member descriptors (see
//! `council_paxos::config`).

use std::env;
use std::process::exit;

use anyhow::{bail, Context};
use log::error;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("{:#}", e);
        exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = match args.as_slice() {
        [_, path] => path,
        _ => bail!("usage: council <config-file>"),
    };

    let members = council_paxos::config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path))?;

    council_paxos::orchestrator::run_council(members).context("running the council election")?;

    Ok(())
}
