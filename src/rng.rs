// Shared uniform sampler for all worker threads
//
// Every stochastic draw in the engine goes through one process-wide
// generator behind a mutex. Contention is acceptable: a draw is O(1)
// against the surrounding physics work, and a single stream is what makes
// fixed-seed runs reproducible per process rather than per thread.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Thread-safe uniform sampler on the open interval (0, 1).
///
/// Zero is rejected and redrawn because the physics formulas divide by and
/// take logarithms of the sampled value; the generator itself never yields
/// exactly 1. Seed once, before spawning any worker, via [`SharedRng::seed_from`].
#[derive(Clone, Debug)]
pub struct SharedRng {
    inner: Arc<Mutex<StdRng>>,
}

impl SharedRng {
    /// Create a sampler with an explicit seed. Runs with the same seed and
    /// configuration draw identical sequences.
    pub fn seed_from(seed: u64) -> Self {
        SharedRng {
            inner: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Draw a uniform value in (0, 1). Safe to call from any thread.
    pub fn sample(&self) -> f64 {
        let mut rng = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        loop {
            let value: f64 = rng.gen();
            if value > 0.0 {
                return value;
            }
        }
    }
}
