//! Discrete distributions drawn from the simulation stream
//!
//! The scalar samplers (Poisson, binomial, hypergeometric) are `rand_distr`'s,
//! fed by [`RngManager`]. The vector allocations are built from sequential
//! conditional draws so that they always sum exactly to the requested total:
//!
//! - multinomial: `k_i ~ Binomial(n_left, p_i / p_left)`
//! - multivariate hypergeometric: `k_i ~ Hypergeometric(N_left, K_i, n_left)`
//!
//! Categories are visited in slice order and the last one receives the
//! remainder, so the number of draws consumed depends only on the inputs.

use super::RngManager;
use rand_distr::{Binomial, Distribution, Hypergeometric, Poisson};
use thiserror::Error;

/// Errors raised while sampling
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    #[error("Invalid {distribution} parameters: {reason}")]
    InvalidParameters {
        distribution: &'static str,
        reason: String,
    },

    #[error("Cannot sample {requested} distinct items out of {available}")]
    SampleTooLarge { requested: usize, available: usize },
}

/// Round a headcount to the integer the stochastic samplers operate on
pub fn to_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

impl RngManager {
    /// Poisson draw with mean `lambda`; a non-positive mean yields 0
    ///
    /// # Example
    /// ```
    /// use network_sim_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(42);
    /// assert_eq!(rng.poisson(0.0).unwrap(), 0);
    /// let draw = rng.poisson(3.5).unwrap();
    /// # let _ = draw;
    /// ```
    pub fn poisson(&mut self, lambda: f64) -> Result<u64, SamplingError> {
        if lambda <= 0.0 {
            return Ok(0);
        }
        let dist = Poisson::new(lambda).map_err(|e| SamplingError::InvalidParameters {
            distribution: "poisson",
            reason: format!("lambda={lambda}: {e}"),
        })?;
        let draw: f64 = dist.sample(self);
        Ok(draw as u64)
    }

    /// Binomial draw: successes out of `trials` with success probability `p`
    ///
    /// `p` is clamped into [0, 1] to absorb float noise from products of
    /// probabilities.
    pub fn binomial(&mut self, trials: u64, p: f64) -> Result<u64, SamplingError> {
        if trials == 0 || p <= 0.0 {
            return Ok(0);
        }
        if p >= 1.0 {
            return Ok(trials);
        }
        let dist = Binomial::new(trials, p).map_err(|e| SamplingError::InvalidParameters {
            distribution: "binomial",
            reason: format!("n={trials}, p={p}: {e}"),
        })?;
        Ok(dist.sample(self))
    }

    /// Hypergeometric draw: marked items in a sample of `draws` taken without
    /// replacement from `population`, of which `marked` are marked
    pub fn hypergeometric(
        &mut self,
        population: u64,
        marked: u64,
        draws: u64,
    ) -> Result<u64, SamplingError> {
        if draws == 0 || marked == 0 {
            return Ok(0);
        }
        if marked == population {
            return Ok(draws);
        }
        let dist = Hypergeometric::new(population, marked, draws).map_err(|e| {
            SamplingError::InvalidParameters {
                distribution: "hypergeometric",
                reason: format!("N={population}, K={marked}, n={draws}: {e}"),
            }
        })?;
        Ok(dist.sample(self))
    }

    /// Split `trials` over categories with the given probabilities
    ///
    /// The result always sums to `trials`. Probabilities are expected to sum
    /// to one; the last category absorbs whatever the earlier ones leave.
    pub fn multinomial(&mut self, trials: u64, probabilities: &[f64]) -> Result<Vec<u64>, SamplingError> {
        let mut counts = vec![0u64; probabilities.len()];
        let Some(last) = probabilities.len().checked_sub(1) else {
            return Ok(counts);
        };

        let mut remaining = trials;
        let mut mass_left = 1.0;
        for (i, &p) in probabilities.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            if i == last {
                counts[i] = remaining;
                break;
            }
            let conditional = if mass_left > 0.0 { (p / mass_left).clamp(0.0, 1.0) } else { 1.0 };
            let k = self.binomial(remaining, conditional)?;
            counts[i] = k;
            remaining -= k;
            mass_left -= p;
        }
        Ok(counts)
    }

    /// Draw `draws` items without replacement from urns of the given sizes
    ///
    /// # Panics
    /// Panics if `draws` exceeds the total number of items.
    pub fn multivariate_hypergeometric(
        &mut self,
        urns: &[u64],
        draws: u64,
    ) -> Result<Vec<u64>, SamplingError> {
        let mut population: u64 = urns.iter().sum();
        assert!(
            draws <= population,
            "cannot draw {} items from {} without replacement",
            draws,
            population
        );

        let mut counts = vec![0u64; urns.len()];
        let mut remaining = draws;
        for (i, &size) in urns.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            let k = if i + 1 == urns.len() {
                remaining
            } else {
                self.hypergeometric(population, size, remaining)?
            };
            counts[i] = k;
            remaining -= k;
            population -= size;
        }
        Ok(counts)
    }

    /// `count` distinct indices out of `0..len`, uniformly (partial Fisher-Yates)
    pub fn sample_distinct(&mut self, len: usize, count: usize) -> Result<Vec<usize>, SamplingError> {
        if count > len {
            return Err(SamplingError::SampleTooLarge {
                requested: count,
                available: len,
            });
        }
        let mut indices: Vec<usize> = (0..len).collect();
        for i in 0..count {
            let j = self.range(i as i64, len as i64) as usize;
            indices.swap(i, j);
        }
        indices.truncate(count);
        Ok(indices)
    }
}
