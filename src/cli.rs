//! # CLI Execution — Reference Snapshot Renderer
//!
//! Extracted from `main.rs` to keep the entry point slim. Pulls attempt
//! snapshots off the sequence and prints one line per snapshot describing
//! what that sub-step newly revealed. Rendering lives entirely on this side
//! of the record contract: the sequencer neither knows nor cares that a
//! terminal is watching.
//!
//! Output goes to stdout; logs go to stderr, so `--json` output pipes clean.

use anyhow::{bail, Result};
use rug::integer::IsPrime;
use rug::Integer;
use std::time::Duration;
use tracing::warn;

use shorwalk::draw::SeededRandom;
use shorwalk::record::{AttemptRecord, Status};
use shorwalk::session::{run_factorization_attempts, AttemptSequence, MAX_ATTEMPTS};

use super::Cli;

/// Interactive bound on n. The sequencer generalizes past this, but the
/// educational walkthrough is meant to stay snappy.
const MAX_N: u32 = 1_000_000;

pub fn run(cli: &Cli) -> Result<()> {
    let n = &cli.n;
    if *n > MAX_N {
        bail!("n must be at most {} for an interactive walkthrough", MAX_N);
    }

    // Advisory only: a prime n exhausts all ten attempts by construction.
    if *n > 1 && n.is_odd() && n.is_probably_prime(15) != IsPrime::No {
        warn!(n = %n, "n is probably prime; no attempt can succeed");
    }

    let sequence: Box<dyn Iterator<Item = AttemptRecord>> = match cli.seed {
        Some(seed) => Box::new(AttemptSequence::new(n.clone(), SeededRandom::new(seed))?),
        None => Box::new(run_factorization_attempts(n)?),
    };

    let mut outcome: Option<(Integer, Integer)> = None;
    for snapshot in sequence {
        if cli.json {
            println!("{}", serde_json::to_string(&snapshot)?);
        } else {
            println!("{}", describe(&snapshot));
        }
        if snapshot.status == Status::Success {
            outcome = snapshot.factors.clone();
        }
        if cli.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(cli.delay_ms));
        }
    }

    match outcome {
        Some((p, q)) => {
            if !cli.json {
                println!("{} = {} × {}", n, p, q);
            }
            Ok(())
        }
        None => bail!(
            "no nontrivial factors of {} found within {} attempts",
            n,
            MAX_ATTEMPTS
        ),
    }
}

/// One line per snapshot, describing the newest populated field.
fn describe(rec: &AttemptRecord) -> String {
    let tag = format!("attempt {:>2}", rec.id);
    match rec.status {
        Status::Success => {
            if let Some(f) = &rec.factorization {
                let (p, q) = rec.factors.as_ref().expect("success carries factors");
                format!(
                    "{tag}: a^(r/2) = {}, gcd({} ∓ 1, {}) = {{{}, {}}} — success: {} = {} × {}",
                    f.term, f.term, rec.n, f.gcd_minus, f.gcd_plus, rec.n, p, q
                )
            } else {
                // Shared-factor shortcut at the GCD stage
                let g = rec.gcd_check.as_ref().expect("gcd precedes the shortcut");
                let (p, q) = rec.factors.as_ref().expect("success carries factors");
                format!(
                    "{tag}: gcd({}, {}) = {} already splits n — {} = {} × {}",
                    rec.base, rec.n, g, rec.n, p, q
                )
            }
        }
        Status::Failed => format!(
            "{tag}: failed — {}",
            rec.error.unwrap_or("unknown failure")
        ),
        Status::Running => {
            if let Some(v) = rec.verification {
                format!(
                    "{tag}: period is {}, a^(r/2) ≡ -1 is {}",
                    if v.period_is_odd { "odd" } else { "even" },
                    if v.residue_is_trivial { "true" } else { "false" },
                )
            } else if let Some(period) = &rec.period {
                let table = rec
                    .convergents
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|c| format!("{}/{}", c.numerator, c.denominator))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{tag}: convergents {} → period candidate r = {}", table, period)
            } else if let Some(m) = &rec.measurement {
                format!(
                    "{tag}: measured c = {} from a {}-qubit register (q = {})",
                    m.value, m.qubit_count, m.register_size
                )
            } else if let Some(g) = &rec.gcd_check {
                format!("{tag}: gcd({}, {}) = {} — co-prime, proceeding", rec.base, rec.n, g)
            } else {
                format!("{tag}: trying base a = {}", rec.base)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_reports_the_newest_field() {
        let mut rec = AttemptRecord::new(1, Integer::from(15), Integer::from(4));
        assert!(describe(&rec).contains("trying base a = 4"));

        rec.set_gcd_check(Integer::from(1));
        assert!(describe(&rec).contains("gcd(4, 15) = 1"));

        rec.finalize_failed(shorwalk::FailureKind::OddPeriod);
        assert!(describe(&rec).contains("period is odd"));
    }

    #[test]
    fn describe_shared_factor_shortcut() {
        let mut rec = AttemptRecord::new(2, Integer::from(15), Integer::from(5));
        rec.set_gcd_check(Integer::from(5));
        rec.finalize_success(Integer::from(5), Integer::from(3));
        let line = describe(&rec);
        assert!(line.contains("already splits n"), "got: {}", line);
        assert!(line.contains("15 = 5 × 3"), "got: {}", line);
    }
}
