//! Simulation State
//!
//! Headcounts per region, age group and compartment, stored densely against a
//! shared [`StateLayout`].
//!
//! # Critical Invariants
//!
//! 1. **Non-negativity**: every cell is ≥ 0
//! 2. **Conservation**: a step never changes the per-(region, age) total
//! 3. **Layout Agreement**: every region state has `ages × compartments` cells

use crate::models::labels::{AgeRange, LabelError, StateLayout, EXPOSED_IDX, SUSCEPTIBLE_IDX};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Age × compartment headcounts of one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionState {
    num_compartments: usize,
    values: Vec<f64>,
}

impl RegionState {
    pub fn zeros(num_ages: usize, num_compartments: usize) -> Self {
        Self {
            num_compartments,
            values: vec![0.0; num_ages * num_compartments],
        }
    }

    /// Wrap raw cell values laid out age-major
    ///
    /// # Panics
    ///
    /// Panics if `values` is not a whole number of age rows
    pub fn from_values(num_compartments: usize, values: Vec<f64>) -> Self {
        assert!(
            num_compartments > 0 && values.len() % num_compartments == 0,
            "region state of {} cells does not fit {} compartments",
            values.len(),
            num_compartments
        );
        Self {
            num_compartments,
            values,
        }
    }

    #[inline]
    pub fn get(&self, age: usize, compartment: usize) -> f64 {
        self.values[age * self.num_compartments + compartment]
    }

    #[inline]
    pub fn set(&mut self, age: usize, compartment: usize, value: f64) {
        self.values[age * self.num_compartments + compartment] = value;
    }

    #[inline]
    pub fn add(&mut self, age: usize, compartment: usize, value: f64) {
        self.values[age * self.num_compartments + compartment] += value;
    }

    pub fn susceptible(&self, age: usize) -> f64 {
        self.get(age, SUSCEPTIBLE_IDX)
    }

    pub fn num_ages(&self) -> usize {
        self.values.len() / self.num_compartments
    }

    pub fn num_compartments(&self) -> usize {
        self.num_compartments
    }

    /// All compartments of one age
    pub fn age_row(&self, age: usize) -> &[f64] {
        &self.values[age * self.num_compartments..(age + 1) * self.num_compartments]
    }

    pub fn age_total(&self, age: usize) -> f64 {
        self.age_row(age).iter().sum()
    }

    pub fn total(&self) -> f64 {
        (0..self.num_ages()).map(|age| self.age_total(age)).sum()
    }

    pub fn susceptible_total(&self) -> f64 {
        (0..self.num_ages()).map(|age| self.susceptible(age)).sum()
    }

    /// Infectious people of one age
    pub fn infectious(&self, age: usize, infectious: &[usize]) -> f64 {
        infectious.iter().map(|&c| self.get(age, c)).sum()
    }

    pub fn infectious_total(&self, infectious: &[usize]) -> f64 {
        (0..self.num_ages()).map(|age| self.infectious(age, infectious)).sum()
    }

    /// Move `count` people of one age from `S` to `E`
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the susceptibles of that age
    pub fn expose(&mut self, age: usize, count: f64) {
        let susceptible = self.susceptible(age);
        assert!(
            count <= susceptible,
            "cannot expose {} people, only {} susceptible",
            count,
            susceptible
        );
        self.set(age, SUSCEPTIBLE_IDX, susceptible - count);
        self.add(age, EXPOSED_IDX, count);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Complete disease state of the network on one day
///
/// # Example
///
/// ```rust
/// use network_sim_core_rs::{AgeRange, Compartment, NetworkState, StateLayout};
/// use std::sync::Arc;
///
/// let layout = Arc::new(StateLayout::new(
///     vec!["r1".to_string()],
///     vec![AgeRange::new("m")],
///     vec![Compartment::new("I")],
/// ));
/// let mut state = NetworkState::zeros(layout);
/// state.set("r1", &AgeRange::new("m"), "S", 90.0).unwrap();
/// state.set("r1", &AgeRange::new("m"), "I", 10.0).unwrap();
/// assert_eq!(state.region(0).total(), 100.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkState {
    #[serde(skip)]
    layout: Arc<StateLayout>,
    regions: Vec<RegionState>,
}

impl NetworkState {
    pub fn zeros(layout: Arc<StateLayout>) -> Self {
        let regions = (0..layout.num_regions())
            .map(|_| RegionState::zeros(layout.num_ages(), layout.num_compartments()))
            .collect();
        Self { layout, regions }
    }

    /// Rebuild from per-region cell values (snapshot restore)
    ///
    /// # Panics
    ///
    /// Panics if the values do not match the layout
    pub fn from_regions(layout: Arc<StateLayout>, regions: Vec<RegionState>) -> Self {
        assert_eq!(
            regions.len(),
            layout.num_regions(),
            "state has {} regions, layout has {}",
            regions.len(),
            layout.num_regions()
        );
        for region in &regions {
            assert_eq!(
                region.values().len(),
                layout.region_width(),
                "region state width does not match layout"
            );
        }
        Self { layout, regions }
    }

    pub fn layout(&self) -> &Arc<StateLayout> {
        &self.layout
    }

    pub fn region(&self, idx: usize) -> &RegionState {
        &self.regions[idx]
    }

    pub fn region_mut(&mut self, idx: usize) -> &mut RegionState {
        &mut self.regions[idx]
    }

    pub fn regions(&self) -> &[RegionState] {
        &self.regions
    }

    /// Labelled read
    pub fn get(&self, region: &str, age: &AgeRange, compartment: &str) -> Result<f64, LabelError> {
        let r = self.layout.region_index(region)?;
        let a = self.layout.age_index(age)?;
        let c = self.layout.compartment_index(compartment)?;
        Ok(self.regions[r].get(a, c))
    }

    /// Labelled write
    pub fn set(
        &mut self,
        region: &str,
        age: &AgeRange,
        compartment: &str,
        value: f64,
    ) -> Result<(), LabelError> {
        let r = self.layout.region_index(region)?;
        let a = self.layout.age_index(age)?;
        let c = self.layout.compartment_index(compartment)?;
        self.regions[r].set(a, c, value);
        Ok(())
    }

    /// Total population per region, in layout order
    pub fn region_totals(&self) -> Vec<f64> {
        self.regions.iter().map(RegionState::total).collect()
    }

    pub fn total_population(&self) -> f64 {
        self.regions.iter().map(RegionState::total).sum()
    }

    /// Whether two states share the same index space
    pub fn same_layout(&self, other: &NetworkState) -> bool {
        Arc::ptr_eq(&self.layout, &other.layout) || self.layout == other.layout
    }

    /// Every cell as `(region, age, compartment, value)`, in layout order
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, usize, f64)> + '_ {
        let nc = self.layout.num_compartments();
        self.regions.iter().enumerate().flat_map(move |(r, region)| {
            region
                .values()
                .iter()
                .enumerate()
                .map(move |(i, &v)| (r, i / nc, i % nc, v))
        })
    }
}
