//! Splitting a region's contacts over its age groups

use crate::models::RegionState;
use crate::rng::{to_count, RngManager, SamplingError};

/// Allocate `total` contacts to ages in proportion to their susceptibles
///
/// The total is capped at the region's susceptibles. Stochastic runs draw a
/// multivariate hypergeometric allocation, which sums exactly to the (capped,
/// whole) total and never gives an age more than its susceptibles.
pub fn distribute_over_ages(
    region: &RegionState,
    total: f64,
    stochastic: bool,
    rng: &mut RngManager,
) -> Result<Vec<f64>, SamplingError> {
    let num_ages = region.num_ages();
    let susceptible_total = region.susceptible_total();
    if susceptible_total <= 0.0 {
        return Ok(vec![0.0; num_ages]);
    }

    if stochastic {
        let urns: Vec<u64> = (0..num_ages).map(|age| to_count(region.susceptible(age))).collect();
        let available: u64 = urns.iter().sum();
        let draws = to_count(total).min(available);
        let allocation = rng.multivariate_hypergeometric(&urns, draws)?;
        Ok(allocation.into_iter().map(|k| k as f64).collect())
    } else {
        let capped = total.min(susceptible_total);
        Ok((0..num_ages)
            .map(|age| (region.susceptible(age) / susceptible_total) * capped)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // two compartments: S, E
    fn region(susceptibles: &[f64]) -> RegionState {
        RegionState::from_values(2, susceptibles.iter().flat_map(|s| [*s, 0.0]).collect())
    }

    #[test]
    fn test_total_capped_at_susceptibles() {
        let state = region(&[20.0]);
        let mut rng = RngManager::new(123);
        assert_eq!(distribute_over_ages(&state, 100.0, false, &mut rng).unwrap(), vec![20.0]);
        assert_eq!(distribute_over_ages(&state, 100.0, true, &mut rng).unwrap(), vec![20.0]);
    }

    #[test]
    fn test_single_age_gets_everything() {
        let state = region(&[20.0]);
        let mut rng = RngManager::new(123);
        assert_eq!(distribute_over_ages(&state, 10.0, false, &mut rng).unwrap(), vec![10.0]);
        assert_eq!(distribute_over_ages(&state, 10.0, true, &mut rng).unwrap(), vec![10.0]);
    }

    #[test]
    fn test_proportional_to_susceptibles() {
        let state = region(&[20.0, 30.0, 40.0]);
        let mut rng = RngManager::new(123);

        let split = distribute_over_ages(&state, 60.0, false, &mut rng).unwrap();
        assert_eq!(
            split,
            vec![(20.0 / 90.0) * 60.0, (30.0 / 90.0) * 60.0, (40.0 / 90.0) * 60.0]
        );

        let drawn = distribute_over_ages(&state, 60.0, true, &mut rng).unwrap();
        assert_eq!(drawn.iter().sum::<f64>(), 60.0);
        assert!(drawn.iter().zip([20.0, 30.0, 40.0]).all(|(k, s)| *k <= s));
    }

    #[test]
    fn test_no_susceptibles() {
        let state = region(&[0.0, 0.0]);
        let mut rng = RngManager::new(1);
        assert_eq!(distribute_over_ages(&state, 5.0, true, &mut rng).unwrap(), vec![0.0, 0.0]);
    }
}
