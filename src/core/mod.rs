//! Core primitives.
//!
//! Randomness for the race engine lives here so it can be swapped for a
//! seeded or scripted source.

pub mod rng;

// Re-export core types
pub use rng::{DeterministicRng, RandomSource};
