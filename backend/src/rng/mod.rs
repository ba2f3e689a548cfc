//! Deterministic random number generation
//!
//! Uses xorshift64* for the raw stream and `rand_distr` for the discrete
//! distributions the engine needs.
//! CRITICAL: All randomness in the simulator MUST go through this module.

mod distributions;
mod xorshift;

pub use distributions::{to_count, SamplingError};
pub use xorshift::RngManager;
