//! # Draw — Injectable Randomness for the Sequencer
//!
//! The sequencer makes exactly two kinds of random decisions per attempt:
//! picking a candidate base and picking the multiple that shapes the
//! synthesized measurement. Both go through the [`DrawSource`] trait so a
//! test can script the exact draws and pin the whole snapshot walk, and a
//! demo can replay a run from a seed.
//!
//! Sampling is exact at any operand width: a draw over `[lo, hi]` rejects
//! uniformly random bit strings until one falls below the range width, so no
//! modulo bias sneaks in however large the range gets.

use rand::rngs::{StdRng, ThreadRng};
use rand::{RngCore, SeedableRng};
use rug::integer::Order;
use rug::Integer;
use std::collections::VecDeque;

/// Source of uniform integer draws for the attempt sequencer.
pub trait DrawSource {
    /// Uniform draw from the closed range `[lo, hi]`. Requires `lo <= hi`.
    fn uniform(&mut self, lo: &Integer, hi: &Integer) -> Integer;
}

/// Rejection-sample a uniform integer in `[0, bound)` from raw random bits.
fn sample_below<R: RngCore>(rng: &mut R, bound: &Integer) -> Integer {
    debug_assert!(*bound > 0);
    let bits = bound.significant_bits();
    let len = ((bits + 7) / 8) as usize;
    let excess = len as u32 * 8 - bits;
    let mut buf = vec![0u8; len];
    loop {
        rng.fill_bytes(&mut buf);
        // Trim the candidate to exactly `bits` bits; acceptance rate > 1/2.
        buf[0] >>= excess;
        let candidate = Integer::from_digits(&buf, Order::Msf);
        if candidate < *bound {
            return candidate;
        }
    }
}

fn uniform_in<R: RngCore>(rng: &mut R, lo: &Integer, hi: &Integer) -> Integer {
    debug_assert!(lo <= hi, "uniform draw requires lo <= hi");
    let width = Integer::from(hi - lo) + 1u32;
    Integer::from(lo + &sample_below(rng, &width))
}

/// Production draw source backed by the thread-local RNG.
#[derive(Default)]
pub struct ThreadRandom {
    rng: ThreadRng,
}

impl DrawSource for ThreadRandom {
    fn uniform(&mut self, lo: &Integer, hi: &Integer) -> Integer {
        uniform_in(&mut self.rng, lo, hi)
    }
}

/// Seeded draw source for reproducible runs (`--seed`).
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        SeededRandom {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DrawSource for SeededRandom {
    fn uniform(&mut self, lo: &Integer, hi: &Integer) -> Integer {
        uniform_in(&mut self.rng, lo, hi)
    }
}

/// Test double that replays a fixed list of draws in order.
///
/// Panics if the sequencer asks for more draws than were scripted, or if a
/// scripted value falls outside the requested range — both mean the script
/// and the scenario have drifted apart.
pub struct ScriptedDraws {
    draws: VecDeque<Integer>,
}

impl ScriptedDraws {
    pub fn new<I>(draws: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Integer>,
    {
        ScriptedDraws {
            draws: draws.into_iter().map(Into::into).collect(),
        }
    }
}

impl DrawSource for ScriptedDraws {
    fn uniform(&mut self, lo: &Integer, hi: &Integer) -> Integer {
        let value = self
            .draws
            .pop_front()
            .expect("scripted draw source exhausted");
        assert!(
            value >= *lo && value <= *hi,
            "scripted draw {} outside requested range [{}, {}]",
            value,
            lo,
            hi
        );
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_draws_replay_in_order() {
        let mut draws = ScriptedDraws::new([4i32, 1]);
        assert_eq!(draws.uniform(&Integer::from(2), &Integer::from(14)), 4);
        assert_eq!(draws.uniform(&Integer::from(1), &Integer::from(1)), 1);
    }

    #[test]
    #[should_panic(expected = "scripted draw source exhausted")]
    fn scripted_draws_panic_when_exhausted() {
        let mut draws = ScriptedDraws::new::<[i32; 0]>([]);
        draws.uniform(&Integer::from(0), &Integer::from(9));
    }

    #[test]
    #[should_panic(expected = "outside requested range")]
    fn scripted_draws_panic_out_of_range() {
        let mut draws = ScriptedDraws::new([99i32]);
        draws.uniform(&Integer::from(2), &Integer::from(14));
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let lo = Integer::from(2);
        let hi = Integer::from(1_000_000);
        let mut a = SeededRandom::new(7);
        let mut b = SeededRandom::new(7);
        for _ in 0..32 {
            assert_eq!(a.uniform(&lo, &hi), b.uniform(&lo, &hi));
        }
    }

    #[test]
    fn uniform_stays_in_closed_range() {
        let mut rng = SeededRandom::new(42);
        let lo = Integer::from(2);
        let hi = Integer::from(14);
        for _ in 0..500 {
            let v = rng.uniform(&lo, &hi);
            assert!(v >= lo && v <= hi, "draw {} escaped [2, 14]", v);
        }
    }

    #[test]
    fn uniform_covers_degenerate_range() {
        let mut rng = SeededRandom::new(0);
        let one = Integer::from(1);
        assert_eq!(rng.uniform(&one, &one), 1);
    }

    #[test]
    fn uniform_handles_wide_ranges_exactly() {
        // A 200-bit range exercises the multi-limb rejection path
        let mut rng = SeededRandom::new(3);
        let lo = Integer::from(1u32) << 199u32;
        let hi = Integer::from(1u32) << 200u32;
        for _ in 0..16 {
            let v = rng.uniform(&lo, &hi);
            assert!(v >= lo && v <= hi);
        }
    }
}
