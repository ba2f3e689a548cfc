//! xorshift64* random number generator
//!
//! Every stochastic draw in a trial (contact counts, infections, progression
//! splits, region seeding) comes from one `RngManager`, so a trial is fully
//! determined by its seed.
//!
//! # Determinism
//!
//! Same seed → same sequence → same result table. The whole generator state
//! is a single `u64`, which is what trial snapshots store.

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use network_sim_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next();
/// let index = rng.range(0, 14); // pick one of 14 regions
/// assert!((0..14).contains(&index));
/// # let _ = value;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngManager {
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is mapped to 1 (xorshift never leaves the zero state).
    /// Passing a value previously returned by [`RngManager::get_state`]
    /// resumes the exact same stream.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Uniform index in `[min, max)`, used for region sampling
    ///
    /// # Panics
    /// Panics if min >= max
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");

        let value = self.next();
        let range_size = (max - min) as u64;
        min + (value % range_size) as i64
    }

    /// Current generator state, for snapshots
    pub fn get_state(&self) -> u64 {
        self.state
    }
}

/// Lets `rand_distr` samplers draw from the simulation stream.
impl RngCore for RngManager {
    fn next_u32(&mut self) -> u32 {
        (self.next() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(8) {
            let bytes = self.next().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}
