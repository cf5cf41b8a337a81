//! Race Random Number Generation
//!
//! Race durations and tie-breaks draw from a [`RandomSource`]. The default
//! source is a seedable Xorshift128+ generator, so any race can be replayed
//! from its seed.

use serde::{Serialize, Deserialize};

/// Source of uniform randomness for the race engine.
///
/// Implementors only provide raw 64-bit output; the float and coin helpers
/// are derived from it.
pub trait RandomSource {
    /// Generate the next 64-bit random value.
    fn next_u64(&mut self) -> u64;

    /// Generate a uniform float in [0, 1).
    ///
    /// Uses the upper 53 bits so every representable step is equally likely.
    #[inline]
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Generate a uniform float in [min, max).
    ///
    /// Returns `min` when the range is empty or inverted.
    #[inline]
    fn next_f64_range(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        let value = min + (max - min) * self.next_f64();
        // Rounding can land exactly on max for wide ranges
        if value >= max { min } else { value }
    }

    /// Fair coin flip.
    ///
    /// Reads the top bit, which is the best distributed bit of Xorshift128+.
    #[inline]
    fn coin_flip(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }
}

/// Deterministic PRNG using the Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use chicken_race::core::rng::{DeterministicRng, RandomSource};
///
/// let mut rng = DeterministicRng::new(12345);
/// let value = rng.next_u64();
/// assert_eq!(value, 6233086606872742541); // Always the same!
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Create an RNG seeded from the thread-local OS-backed generator.
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: [u64; 2]) {
        self.state = state;
    }
}

impl RandomSource for DeterministicRng {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

// =============================================================================
// TESTS
// =============================================================================
