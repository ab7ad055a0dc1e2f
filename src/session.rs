//! # Session — The Attempt Sequencer
//!
//! Drives one factoring session for a fixed odd n > 1: pick a base, test it
//! via GCD, synthesize a plausible quantum measurement, recover a period
//! candidate through continued fractions, verify it, and derive factors —
//! emitting a progress snapshot after every sub-step until success or the
//! attempt ceiling.
//!
//! The "quantum" stage is faked: the true period of the base is computed
//! classically (the oracle), then a measurement consistent with it is
//! synthesized, so a consumer sees a realistic noisy outcome without any
//! state-vector simulation. The oracle's period never reaches the record.
//!
//! ## Control flow
//!
//! [`AttemptSequence`] is a pull-based iterator: an explicit state machine
//! that advances exactly one sub-step per `next()` call and yields a cloned
//! snapshot, so a consumer can pace animation or stop pulling at any point.
//! All loop state lives on the struct — there is no background work to leak
//! when the sequence is dropped mid-session.
//!
//! Per-attempt failures (odd period, trivial residue, …) are data on the
//! final snapshot of that attempt, never `Err`: they are expected
//! probabilistic outcomes, and every one is emitted before the next attempt
//! starts. Only a malformed n is a hard error, raised before any record
//! exists.

use rug::Integer;
use tracing::{debug, info};

use crate::arith::{continued_fraction_convergents, gcd, mod_pow, qubit_count};
use crate::draw::{DrawSource, ThreadRandom};
use crate::record::{AttemptRecord, Factorization, FailureKind, Measurement, Verification};

/// Attempt ceiling: a session gives up after this many terminal failures.
pub const MAX_ATTEMPTS: u32 = 10;

/// Session-start failures. Per-attempt failures are recorded in the attempt
/// records instead (see the module header).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// n was even or not greater than 1.
    InvalidInput { n: Integer },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidInput { n } => {
                write!(f, "invalid input: n must be an odd integer greater than 1 (got {})", n)
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Start a factoring session with the thread-local RNG. Fails before
/// yielding anything if n <= 1 or n is even.
pub fn run_factorization_attempts(
    n: &Integer,
) -> Result<AttemptSequence<ThreadRandom>, SessionError> {
    AttemptSequence::new(n.clone(), ThreadRandom::default())
}

/// Which sub-step the next pull will execute.
enum Stage {
    PickBase,
    GcdCheck,
    Measure,
    RecoverPeriod,
    Verify,
    ExtractFactors,
    Done,
}

/// Lazy, forward-only sequence of attempt snapshots for one session.
pub struct AttemptSequence<D: DrawSource> {
    n: Integer,
    draws: D,
    stage: Stage,
    attempt: Option<AttemptRecord>,
    /// `base^(period/2) mod n`, carried from verification to extraction so
    /// both stages use the identical value.
    term: Option<Integer>,
}

impl<D: DrawSource> AttemptSequence<D> {
    /// Validates n and sets up a session using the given draw source.
    pub fn new(n: Integer, draws: D) -> Result<Self, SessionError> {
        if n <= 1 || n.is_even() {
            return Err(SessionError::InvalidInput { n });
        }
        Ok(AttemptSequence {
            n,
            draws,
            stage: Stage::PickBase,
            attempt: None,
            term: None,
        })
    }

    fn current(&mut self) -> &mut AttemptRecord {
        self.attempt
            .as_mut()
            .expect("an attempt is in progress past the pick-base stage")
    }

    /// Finalizes the running attempt as failed and decides whether the
    /// session continues: next attempt if ids remain, otherwise done.
    fn fail_attempt(&mut self, kind: FailureKind) -> AttemptRecord {
        let rec = self.current();
        rec.finalize_failed(kind);
        let snapshot = rec.clone();
        debug!(
            attempt = snapshot.id,
            error = snapshot.error.unwrap_or_default(),
            "attempt failed"
        );
        if snapshot.id >= MAX_ATTEMPTS {
            info!(
                n = %self.n,
                attempts = snapshot.id,
                "attempt budget exhausted without a factorization"
            );
            self.stage = Stage::Done;
        } else {
            self.stage = Stage::PickBase;
        }
        snapshot
    }

    /// Finalizes the running attempt as successful and ends the session.
    fn succeed(&mut self, p: Integer, q: Integer) -> AttemptRecord {
        let rec = self.current();
        rec.finalize_success(p, q);
        let snapshot = rec.clone();
        if let Some((p, q)) = &snapshot.factors {
            info!(n = %self.n, p = %p, q = %q, attempt = snapshot.id, "factorization found");
        }
        self.stage = Stage::Done;
        snapshot
    }

    /// Multiplicative order of `base` modulo n by direct iteration. This is
    /// the oracle standing in for quantum period finding; callers must only
    /// use it to synthesize a measurement, never to fill the record. Requires
    /// gcd(base, n) = 1, which the co-primality stage guarantees.
    fn true_period(&self, base: &Integer) -> Integer {
        let mut val = Integer::from(base % &self.n);
        let mut r = Integer::from(1);
        while val != 1 {
            val = val * base % &self.n;
            r += 1;
        }
        r
    }

    fn pick_base(&mut self) -> AttemptRecord {
        let id = self.attempt.as_ref().map_or(1, |a| a.id + 1);
        let lo = Integer::from(2);
        let hi = Integer::from(&self.n - 1);
        let base = self.draws.uniform(&lo, &hi);
        debug!(attempt = id, base = %base, n = %self.n, "picked candidate base");
        let rec = AttemptRecord::new(id, self.n.clone(), base);
        self.attempt = Some(rec.clone());
        self.term = None;
        self.stage = Stage::GcdCheck;
        rec
    }

    fn gcd_check(&mut self) -> AttemptRecord {
        let n = self.n.clone();
        let rec = self.current();
        let g = gcd(&rec.base, &n);
        rec.set_gcd_check(g.clone());
        debug!(attempt = rec.id, gcd = %g, "co-primality check");
        if g > 1 {
            // The draw itself shared a factor with n: immediate success, and
            // the whole session ends here.
            let cofactor = Integer::from(&n / &g);
            return self.succeed(g, cofactor);
        }
        let snapshot = self.current().clone();
        self.stage = Stage::Measure;
        snapshot
    }

    fn measure(&mut self) -> AttemptRecord {
        let base = self.current().base.clone();
        let r = self.true_period(&base);
        if r == 1 {
            // base ≡ 1 mod n leaves an empty draw range for the measurement
            // multiple; unreachable for bases in [2, n-1], but fail the
            // attempt explicitly rather than let the draw panic.
            return self.fail_attempt(FailureKind::DegeneratePeriod);
        }
        let t = qubit_count(&self.n);
        let q = Integer::from(1) << t;
        let lo = Integer::from(1);
        let hi = Integer::from(&r - 1);
        let s = self.draws.uniform(&lo, &hi);
        // c = floor(s·q / r): the peak a real order-finding circuit would
        // most likely collapse to.
        let c = Integer::from(&s * &q) / &r;
        debug!(attempt = self.current().id, c = %c, q = %q, t, "synthesized measurement");
        let rec = self.current();
        rec.set_measurement(Measurement {
            value: c,
            register_size: q,
            qubit_count: t,
        });
        let snapshot = rec.clone();
        self.stage = Stage::RecoverPeriod;
        snapshot
    }

    fn recover_period(&mut self) -> AttemptRecord {
        let (c, q) = {
            let m = self
                .current()
                .measurement
                .as_ref()
                .expect("measurement precedes period recovery");
            (m.value.clone(), m.register_size.clone())
        };
        let convergents = continued_fraction_convergents(&c, &q);
        // The latest qualifying convergent wins: the most refined
        // approximation whose denominator still fits below n.
        let candidate = convergents
            .iter()
            .filter(|conv| conv.denominator > 0 && conv.denominator < self.n)
            .last()
            .map(|conv| conv.denominator.clone());
        match candidate {
            None => self.fail_attempt(FailureKind::NoPeriodCandidate),
            Some(period) => {
                debug!(attempt = self.current().id, period = %period, "period candidate accepted");
                let rec = self.current();
                rec.set_period(convergents, period);
                let snapshot = rec.clone();
                self.stage = Stage::Verify;
                snapshot
            }
        }
    }

    fn verify(&mut self) -> AttemptRecord {
        let n = self.n.clone();
        let (base, period) = {
            let rec = self.current();
            let period = rec.period.clone().expect("period precedes verification");
            (rec.base.clone(), period)
        };
        let period_is_odd = period.is_odd();
        let mut residue_is_trivial = false;
        if !period_is_odd {
            let half = Integer::from(&period / 2u32);
            let term = mod_pow(&base, &half, &n);
            residue_is_trivial = Integer::from(&term + 1u32) % &n == 0;
            self.term = Some(term);
        }
        debug!(
            attempt = self.current().id,
            period_is_odd, residue_is_trivial, "verified period candidate"
        );
        let rec = self.current();
        rec.set_verification(Verification {
            period_is_odd,
            residue_is_trivial,
        });
        let snapshot = rec.clone();
        self.stage = Stage::ExtractFactors;
        snapshot
    }

    fn extract_factors(&mut self) -> AttemptRecord {
        let verification = self
            .current()
            .verification
            .expect("verification precedes extraction");
        if verification.period_is_odd {
            return self.fail_attempt(FailureKind::OddPeriod);
        }
        if verification.residue_is_trivial {
            return self.fail_attempt(FailureKind::TrivialVerification);
        }
        let n = self.n.clone();
        let term = self
            .term
            .take()
            .expect("verification cached the half-period residue");
        let p1 = gcd(&Integer::from(&term - 1u32), &n);
        let p2 = gcd(&Integer::from(&term + 1u32), &n);
        debug!(attempt = self.current().id, term = %term, p1 = %p1, p2 = %p2, "derived divisors");
        let rec = self.current();
        rec.set_factorization(Factorization {
            term,
            gcd_minus: p1.clone(),
            gcd_plus: p2.clone(),
        });
        if p1 > 1 && p1 < n {
            let cofactor = Integer::from(&n / &p1);
            self.succeed(p1, cofactor)
        } else if p2 > 1 && p2 < n {
            let cofactor = Integer::from(&n / &p2);
            self.succeed(p2, cofactor)
        } else {
            self.fail_attempt(FailureKind::TrivialFactors)
        }
    }
}

impl<D: DrawSource> Iterator for AttemptSequence<D> {
    type Item = AttemptRecord;

    fn next(&mut self) -> Option<AttemptRecord> {
        match self.stage {
            Stage::PickBase => Some(self.pick_base()),
            Stage::GcdCheck => Some(self.gcd_check()),
            Stage::Measure => Some(self.measure()),
            Stage::RecoverPeriod => Some(self.recover_period()),
            Stage::Verify => Some(self.verify()),
            Stage::ExtractFactors => Some(self.extract_factors()),
            Stage::Done => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::ScriptedDraws;
    use crate::record::Status;

    fn session(n: i64, draws: Vec<i64>) -> AttemptSequence<ScriptedDraws> {
        AttemptSequence::new(Integer::from(n), ScriptedDraws::new(draws))
            .expect("valid session input")
    }

    #[test]
    fn even_n_is_invalid_input() {
        let err = AttemptSequence::new(Integer::from(10), ScriptedDraws::new([2i32]))
            .err()
            .expect("even n must be rejected");
        assert_eq!(err, SessionError::InvalidInput { n: Integer::from(10) });
        assert!(err.to_string().contains("odd integer greater than 1"));
    }

    #[test]
    fn n_of_one_is_invalid_input() {
        assert!(run_factorization_attempts(&Integer::from(1)).is_err());
    }

    #[test]
    fn negative_n_is_invalid_input() {
        assert!(run_factorization_attempts(&Integer::from(-15)).is_err());
    }

    #[test]
    fn shared_factor_base_short_circuits_the_session() {
        // base 5 shares a factor with 15: success on the second snapshot,
        // no measurement ever synthesized
        let mut seq = session(15, vec![5]);
        let first = seq.next().expect("base snapshot");
        assert_eq!(first.status, Status::Running);
        assert_eq!(first.base, 5);
        assert!(first.gcd_check.is_none());

        let second = seq.next().expect("gcd snapshot");
        assert_eq!(second.status, Status::Success);
        assert_eq!(second.gcd_check, Some(Integer::from(5)));
        assert_eq!(
            second.factors,
            Some((Integer::from(5), Integer::from(3)))
        );
        assert!(second.measurement.is_none());

        assert!(seq.next().is_none(), "session ends after success");
    }

    #[test]
    fn full_walkthrough_base_4_n_15() {
        // gcd(4, 15) = 1; true period 2; s = 1 → c = 128 of q = 256;
        // convergents 0/1, 1/2 → period 2; term = 4; gcd(3,15) = 3
        let snapshots: Vec<AttemptRecord> = session(15, vec![4, 1]).collect();
        assert_eq!(snapshots.len(), 6);
        assert!(snapshots.iter().all(|s| s.id == 1));

        assert_eq!(snapshots[1].gcd_check, Some(Integer::from(1)));

        let m = snapshots[2].measurement.as_ref().expect("measurement");
        assert_eq!(m.value, 128);
        assert_eq!(m.register_size, 256);
        assert_eq!(m.qubit_count, 8);

        let conv = snapshots[3].convergents.as_ref().expect("convergents");
        assert_eq!(conv.len(), 2);
        assert_eq!(conv[1].numerator, 1);
        assert_eq!(conv[1].denominator, 2);
        assert_eq!(snapshots[3].period_candidate, Some(Integer::from(2)));
        assert_eq!(snapshots[3].period, Some(Integer::from(2)));

        let v = snapshots[4].verification.expect("verification");
        assert!(!v.period_is_odd);
        assert!(!v.residue_is_trivial);

        let f = snapshots[5].factorization.as_ref().expect("factorization");
        assert_eq!(f.term, 4);
        assert_eq!(f.gcd_minus, 3);
        assert_eq!(f.gcd_plus, 5);
        assert_eq!(snapshots[5].status, Status::Success);
        assert_eq!(
            snapshots[5].factors,
            Some((Integer::from(3), Integer::from(5)))
        );
    }

    #[test]
    fn odd_period_fails_the_attempt_after_verification() {
        // base 4 mod 21 has period 3; s = 1 → c = floor(512/3) = 170;
        // last qualifying convergent denominator is 3 → odd period
        let mut seq = session(21, vec![4, 1]);
        let snapshots: Vec<AttemptRecord> = seq.by_ref().take(6).collect();

        let m = snapshots[2].measurement.as_ref().expect("measurement");
        assert_eq!(m.value, 170);
        assert_eq!(m.register_size, 512);
        assert_eq!(m.qubit_count, 9);

        assert_eq!(snapshots[3].period, Some(Integer::from(3)));

        let v = snapshots[4].verification.expect("verification");
        assert!(v.period_is_odd);
        assert!(!v.residue_is_trivial);
        assert_eq!(snapshots[4].status, Status::Running);

        assert_eq!(snapshots[5].status, Status::Failed);
        assert_eq!(snapshots[5].failure, Some(FailureKind::OddPeriod));
        assert_eq!(snapshots[5].error, Some("period is odd"));
        assert!(
            snapshots[5].factorization.is_none(),
            "no extraction after an odd period"
        );
    }

    #[test]
    fn n_21_succeeds_with_base_2() {
        // period of 2 mod 21 is 6; s = 1 → c = 85; period 6 → term = 8;
        // gcd(7, 21) = 7
        let snapshots: Vec<AttemptRecord> = session(21, vec![2, 1]).collect();
        let last = snapshots.last().expect("non-empty session");
        assert_eq!(last.status, Status::Success);
        assert_eq!(last.period, Some(Integer::from(6)));
        let f = last.factorization.as_ref().expect("factorization");
        assert_eq!(f.term, 8);
        assert_eq!(last.factors, Some((Integer::from(7), Integer::from(3))));
    }

    #[test]
    fn trivial_residue_fails_and_session_retries() {
        // base 14 mod 15 has period 2 and 14 ≡ -1, so verification is
        // trivial; two such attempts in a row, then a shared-factor success
        let snapshots: Vec<AttemptRecord> =
            session(15, vec![14, 1, 14, 1, 3]).collect();

        // attempts 1 and 2: six snapshots each, ending in trivial result
        assert_eq!(snapshots[5].status, Status::Failed);
        assert_eq!(snapshots[5].failure, Some(FailureKind::TrivialVerification));
        assert_eq!(snapshots[5].error, Some("trivial result"));
        assert_eq!(snapshots[11].status, Status::Failed);
        assert_eq!(snapshots[11].id, 2);

        // attempt 3: base 3 shares a factor
        assert_eq!(snapshots[13].status, Status::Success);
        assert_eq!(snapshots[13].id, 3);
        assert_eq!(
            snapshots[13].factors,
            Some((Integer::from(3), Integer::from(5)))
        );
        assert_eq!(snapshots.len(), 14);
    }

    #[test]
    fn attempt_ceiling_ends_the_session() {
        // Ten trivial-residue attempts back to back: sequence ends with the
        // tenth failure and no success
        let mut draws = Vec::new();
        for _ in 0..MAX_ATTEMPTS {
            draws.extend_from_slice(&[14, 1]);
        }
        let snapshots: Vec<AttemptRecord> = session(15, draws).collect();
        assert_eq!(snapshots.len(), 6 * MAX_ATTEMPTS as usize);
        let last = snapshots.last().expect("snapshots");
        assert_eq!(last.id, MAX_ATTEMPTS);
        assert_eq!(last.status, Status::Failed);
        assert!(snapshots.iter().all(|s| s.status != Status::Success));
    }

    #[test]
    fn ids_are_one_based_and_monotone() {
        let snapshots: Vec<AttemptRecord> =
            session(15, vec![14, 1, 14, 1, 4, 1]).collect();
        let mut expected = 1;
        for snap in &snapshots {
            assert!(
                snap.id == expected || snap.id == expected + 1,
                "id jumped from {} to {}",
                expected,
                snap.id
            );
            expected = snap.id;
        }
        assert_eq!(snapshots.first().map(|s| s.id), Some(1));
    }

    #[test]
    fn at_most_one_running_attempt_at_a_time() {
        // Once an id is seen with a terminal status, that id never reappears
        let snapshots: Vec<AttemptRecord> =
            session(15, vec![14, 1, 14, 1, 4, 1]).collect();
        let mut finished = Vec::new();
        for snap in &snapshots {
            assert!(
                !finished.contains(&snap.id),
                "attempt {} mutated after finalization",
                snap.id
            );
            if snap.is_terminal() {
                finished.push(snap.id);
            }
        }
    }

    #[test]
    fn random_sessions_factor_15_and_21() {
        // With real randomness, 10 attempts virtually always crack numbers
        // this small; insist on at least one success over twenty sessions
        // and check every success exactly
        for n in [15i64, 21] {
            let n = Integer::from(n);
            let mut successes = 0;
            for _ in 0..20 {
                let seq = run_factorization_attempts(&n).expect("odd composite n");
                for snap in seq {
                    if snap.status == Status::Success {
                        let (p, q) = snap.factors.clone().expect("success carries factors");
                        assert_eq!(Integer::from(&p * &q), n, "factors must multiply to n");
                        assert!(p > 1 && p < n, "nontrivial first factor");
                        successes += 1;
                    }
                }
            }
            assert!(successes > 0, "no session factored {} in 20 tries", n);
        }
    }
}
