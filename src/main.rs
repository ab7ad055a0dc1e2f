//! # Main — CLI Entry Point
//!
//! Parses arguments, initializes structured logging, and hands off to the
//! rendering loop in `cli.rs`. The binary is the reference consumer of the
//! attempt sequence: it pulls snapshots one at a time and prints only what
//! each snapshot newly reveals, so a terminal session reads like the
//! animation a front end would show.
//!
//! ## Options
//!
//! - `N` (positional): odd composite to factor, capped at 10^6 for
//!   interactive responsiveness.
//! - `--json`: one serialized snapshot per line instead of prose.
//! - `--seed`: deterministic draws for a replayable demo.
//! - `--delay-ms` / `SHORWALK_DELAY_MS`: pause between snapshots. Pacing is
//!   presentation only; the sequencer itself never sleeps.

mod cli;

use anyhow::Result;
use clap::Parser;
use rug::Integer;

#[derive(Parser)]
#[command(
    name = "shorwalk",
    about = "Walk through Shor's classical factoring loop one step at a time"
)]
struct Cli {
    /// Odd integer greater than 1 to factor (at most 1000000)
    n: Integer,

    /// Emit one JSON object per snapshot instead of human-readable lines
    #[arg(long)]
    json: bool,

    /// Seed the base/measurement draws for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Milliseconds to pause between snapshots (animation pacing)
    #[arg(long, default_value_t = 0, env = "SHORWALK_DELAY_MS")]
    delay_ms: u64,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Structured logging: LOG_FORMAT=json for machine capture, human-readable otherwise
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_target(false).init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    cli::run(&cli)
}
