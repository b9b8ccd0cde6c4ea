//! RNG module - seeded randomness for refills and rocket orientation
//!
//! All random choices in a session go through one [`BlastRng`], so a seed
//! reproduces a whole game (useful for AI training and regression tests).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{Axis, ItemKind};

#[derive(Debug, Clone)]
pub struct BlastRng {
    inner: StdRng,
}

impl BlastRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform choice among the five cube colours.
    pub fn cube(&mut self) -> ItemKind {
        ItemKind::CUBES[self.inner.gen_range(0..ItemKind::CUBES.len())]
    }

    /// Fair coin between horizontal and vertical.
    pub fn axis(&mut self) -> Axis {
        if self.inner.gen_bool(0.5) {
            Axis::Horizontal
        } else {
            Axis::Vertical
        }
    }
}
