//! # Record — Attempt Progress Snapshots
//!
//! The data contract between the attempt sequencer and whatever consumes it
//! (the CLI renderer, a test harness, a front end). One [`AttemptRecord`]
//! exists per base tried; the sequencer mutates it through its sub-steps and
//! yields a clone after each one, so every snapshot a consumer holds is
//! frozen forever.
//!
//! ## Field population order
//!
//! | Field | Populated by |
//! |-------|--------------|
//! | `id`, `n`, `base` | attempt creation |
//! | `gcd_check` | co-primality check |
//! | `measurement` | simulated quantum stage |
//! | `convergents`, `period_candidate`, `period` | period recovery |
//! | `verification` | period verification |
//! | `factorization` | factor extraction |
//! | `factors` / `failure` + `error` | terminal transition |
//!
//! A later field is never present without every earlier one, except where an
//! earlier check terminates the attempt first (a shared factor found at the
//! GCD stage ends the attempt with no measurement at all). The ordered
//! mutators below enforce this; absent optional fields mean "not yet
//! reached". Serialization skips them so a JSON consumer sees the same
//! contract.

use rug::Integer;
use serde::Serialize;

use crate::arith::Convergent;

/// Attempt state. Starts `Running`, moves to exactly one terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Running,
    Failed,
    Success,
}

/// Machine-matchable failure kinds. The human-readable `error` string on the
/// record is derived from these and is stable; localization happens in
/// whatever front end consumes the record, never here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No convergent denominator qualified as a period candidate.
    NoPeriodCandidate,
    /// The candidate period was odd.
    OddPeriod,
    /// `base^(period/2) ≡ -1 mod n`.
    TrivialVerification,
    /// Both derived divisors were 1 or n.
    TrivialFactors,
    /// The oracle reported period 1, leaving nothing to measure.
    DegeneratePeriod,
}

impl FailureKind {
    pub fn message(self) -> &'static str {
        match self {
            FailureKind::NoPeriodCandidate => "no suitable period candidate",
            FailureKind::OddPeriod => "period is odd",
            FailureKind::TrivialVerification => "trivial result",
            FailureKind::TrivialFactors => "trivial factors",
            FailureKind::DegeneratePeriod => "degenerate period",
        }
    }
}

/// The synthesized measurement: value c drawn from a t-qubit register of
/// size q = 2^t.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Measurement {
    pub value: Integer,
    pub register_size: Integer,
    pub qubit_count: u32,
}

/// Outcome of the period checks. `residue_is_trivial` is only meaningful
/// when the period is even; for an odd period it stays `false` unevaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub period_is_odd: bool,
    pub residue_is_trivial: bool,
}

/// The extraction arithmetic: `term = base^(period/2) mod n` and the two
/// divisor candidates `gcd(term ∓ 1, n)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Factorization {
    pub term: Integer,
    pub gcd_minus: Integer,
    pub gcd_plus: Integer,
}

/// One attempt's progress snapshot. See the module header for the population
/// order contract.
#[derive(Clone, Debug, Serialize)]
pub struct AttemptRecord {
    /// 1-based, monotonically increasing within a session.
    pub id: u32,
    /// The odd integer being factored; identical across the session.
    pub n: Integer,
    /// Candidate base a, drawn from [2, n-1].
    pub base: Integer,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcd_check: Option<Integer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement: Option<Measurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergents: Option<Vec<Convergent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_candidate: Option<Integer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Integer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factorization: Option<Factorization>,
    /// Present exactly when `status == Success`; the pair multiplies to n.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factors: Option<(Integer, Integer)>,
    /// Present exactly when `status == Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Stable human-readable form of `failure`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl AttemptRecord {
    pub fn new(id: u32, n: Integer, base: Integer) -> Self {
        AttemptRecord {
            id,
            n,
            base,
            status: Status::Running,
            gcd_check: None,
            measurement: None,
            convergents: None,
            period_candidate: None,
            period: None,
            verification: None,
            factorization: None,
            factors: None,
            failure: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != Status::Running
    }

    pub fn set_gcd_check(&mut self, g: Integer) {
        debug_assert_eq!(self.status, Status::Running);
        debug_assert!(self.gcd_check.is_none());
        self.gcd_check = Some(g);
    }

    pub fn set_measurement(&mut self, measurement: Measurement) {
        debug_assert_eq!(self.status, Status::Running);
        debug_assert!(self.gcd_check.is_some(), "measurement before gcd check");
        debug_assert!(self.measurement.is_none());
        self.measurement = Some(measurement);
    }

    /// Records the convergent table and the accepted period in one step:
    /// `period_candidate` and `period` are equal once a candidate is chosen.
    pub fn set_period(&mut self, convergents: Vec<Convergent>, candidate: Integer) {
        debug_assert_eq!(self.status, Status::Running);
        debug_assert!(self.measurement.is_some(), "period before measurement");
        debug_assert!(self.period.is_none());
        self.convergents = Some(convergents);
        self.period_candidate = Some(candidate.clone());
        self.period = Some(candidate);
    }

    pub fn set_verification(&mut self, verification: Verification) {
        debug_assert_eq!(self.status, Status::Running);
        debug_assert!(self.period.is_some(), "verification before period");
        debug_assert!(self.verification.is_none());
        self.verification = Some(verification);
    }

    pub fn set_factorization(&mut self, factorization: Factorization) {
        debug_assert_eq!(self.status, Status::Running);
        debug_assert!(
            self.verification.is_some(),
            "factorization before verification"
        );
        debug_assert!(self.factorization.is_none());
        self.factorization = Some(factorization);
    }

    pub fn finalize_success(&mut self, p: Integer, q: Integer) {
        debug_assert_eq!(self.status, Status::Running);
        debug_assert_eq!(Integer::from(&p * &q), self.n, "factors must multiply to n");
        self.status = Status::Success;
        self.factors = Some((p, q));
    }

    pub fn finalize_failed(&mut self, kind: FailureKind) {
        debug_assert_eq!(self.status, Status::Running);
        self.status = Status::Failed;
        self.failure = Some(kind);
        self.error = Some(kind.message());
    }
}
