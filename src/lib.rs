//! Classical control logic around Shor's factoring algorithm, presented as a
//! lazy sequence of per-step progress snapshots for an educational consumer.
//!
//! This is not a quantum simulator: the period-finding stage computes the
//! true period classically and synthesizes a plausible noisy measurement
//! from it, so a front end can animate a realistic outcome without state
//! vectors. Everything else — base selection, GCD screening, continued
//! fractions, verification, factor extraction — is the real (simplified)
//! number theory, in exact `rug` arithmetic.
//!
//! Entry point: [`run_factorization_attempts`], or
//! [`session::AttemptSequence::new`] with a custom [`draw::DrawSource`]
//! for deterministic runs.

pub mod arith;
pub mod draw;
pub mod record;
pub mod session;

pub use record::{AttemptRecord, FailureKind, Status};
pub use session::{run_factorization_attempts, AttemptSequence, SessionError, MAX_ATTEMPTS};
