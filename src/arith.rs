//! # Arith — Exact Number-Theoretic Kernel
//!
//! The three pure routines underneath the attempt sequencer:
//!
//! 1. **GCD** (`gcd`) via the Euclidean algorithm on non-negative integers.
//! 2. **Modular exponentiation** (`mod_pow`) via binary square-and-multiply.
//! 3. **Continued-fraction expansion** (`continued_fraction_convergents`),
//!    producing the convergent table used for period recovery.
//!
//! All arithmetic is `rug::Integer` (GMP): intermediate squarings stay exact
//! at any operand size, so the same kernel serves interactive-sized n and
//! anything a test wants to throw at it.
//!
//! ## Algorithm: Convergent Recurrences
//!
//! For the expansion of c/q with partial quotients a_0, a_1, …:
//!
//! ```text
//! p_k = a_k · p_{k-1} + p_{k-2}      p_{-1} = 1, p_{-2} = 0
//! q_k = a_k · q_{k-1} + q_{k-2}      q_{-1} = 0, q_{-2} = 1
//! ```
//!
//! Expansion halts when the Euclidean remainder reaches zero, when a computed
//! denominator would exceed the original denominator q (that convergent is
//! discarded — past the register size it is no longer a useful period
//! approximation), or at [`MAX_CONVERGENT_ITERATIONS`].
//!
//! ## References
//!
//! - Hardy & Wright, *An Introduction to the Theory of Numbers*, ch. X
//!   (continued fractions).
//! - Shor, "Polynomial-Time Algorithms for Prime Factorization and Discrete
//!   Logarithms on a Quantum Computer", SIAM J. Comput. 26(5), 1997, §5.

use rug::Integer;
use serde::Serialize;

/// Safety cap on continued-fraction expansion length. Exact arithmetic on
/// register-sized inputs never gets close for realistic n (worst case is the
/// Fibonacci-like all-ones expansion), but the cap bounds pathological input.
pub const MAX_CONVERGENT_ITERATIONS: usize = 30;

/// One row of the convergent table: partial quotient a_k and the convergent
/// p_k / q_k it produces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Convergent {
    pub partial_quotient: Integer,
    pub numerator: Integer,
    pub denominator: Integer,
}

/// Greatest common divisor by the Euclidean algorithm. `gcd(x, 0) = x`.
/// Total on non-negative inputs; negative inputs are folded to |x|.
pub fn gcd(a: &Integer, b: &Integer) -> Integer {
    let mut a = Integer::from(a.abs_ref());
    let mut b = Integer::from(b.abs_ref());
    while b != 0 {
        let r = a % &b;
        a = std::mem::replace(&mut b, r);
    }
    a
}

/// `base^exponent mod modulus` by binary square-and-multiply, `0 <= r < modulus`.
///
/// Requires `modulus >= 1` and `exponent >= 0`. `mod_pow(_, 0, m)` is
/// `1 mod m`, so `mod_pow(a, e, 1) == 0` for every a, e.
pub fn mod_pow(base: &Integer, exponent: &Integer, modulus: &Integer) -> Integer {
    assert!(*modulus >= 1, "mod_pow requires modulus >= 1");
    assert!(*exponent >= 0, "mod_pow requires exponent >= 0");
    if *modulus == 1 {
        return Integer::new();
    }
    let mut result = Integer::from(1);
    let mut square = Integer::from(base % modulus);
    if square < 0 {
        square += modulus;
    }
    let mut exp = exponent.clone();
    while exp > 0 {
        if exp.is_odd() {
            result = result * &square % modulus;
        }
        square = square.square() % modulus;
        exp >>= 1;
    }
    result
}

/// Continued-fraction expansion of c/q, returning convergents in expansion
/// order. Requires `q >= 1` and `0 <= c`.
///
/// See the module header for the recurrences and the three halting rules.
pub fn continued_fraction_convergents(c: &Integer, q: &Integer) -> Vec<Convergent> {
    assert!(*q >= 1, "continued fraction requires a positive denominator");
    assert!(*c >= 0, "continued fraction requires a non-negative numerator");

    let mut convergents = Vec::new();
    let mut num = c.clone();
    let mut den = q.clone();

    // (p_{k-1}, p_{k-2}) and (q_{k-1}, q_{k-2}) seeds.
    let mut p_prev = Integer::from(1);
    let mut p_prev2 = Integer::new();
    let mut q_prev = Integer::new();
    let mut q_prev2 = Integer::from(1);

    while den != 0 && convergents.len() < MAX_CONVERGENT_ITERATIONS {
        let (a_k, rem) = num.div_rem(den.clone());
        let p_k = Integer::from(&a_k * &p_prev) + &p_prev2;
        let q_k = Integer::from(&a_k * &q_prev) + &q_prev2;
        if q_k > *q {
            // Denominator past the register size: discard and halt.
            break;
        }
        convergents.push(Convergent {
            partial_quotient: a_k,
            numerator: p_k.clone(),
            denominator: q_k.clone(),
        });
        num = den;
        den = rem;
        p_prev2 = std::mem::replace(&mut p_prev, p_k);
        q_prev2 = std::mem::replace(&mut q_prev, q_k);
    }

    convergents
}

/// Qubit count for the simulated measurement register: `t = ceil(2·log2 n)`,
/// computed exactly as the bit length of n² − 1. Requires `n >= 2`.
pub fn qubit_count(n: &Integer) -> u32 {
    debug_assert!(*n >= 2);
    let square_minus_one = Integer::from(n * n) - 1u32;
    square_minus_one.significant_bits()
}
