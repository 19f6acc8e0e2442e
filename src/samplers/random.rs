//! Uniform random sampling over the full design space (spec.md §4.4).

use super::Sampler;
use crate::results::Results;
use crate::space::{Point, Space};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// `next` returns `space.build_point(rand() mod space.size)` (spec.md
/// §4.4) via [`Space::random_point`].
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        RandomSampler {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn reset(&mut self, _space: &Space) {}

    fn next(&mut self, space: &Space, _results: &Results<Point>) -> Point {
        space.random_point(&mut self.rng)
    }

    fn notify(&mut self, _success: bool) {}
}
