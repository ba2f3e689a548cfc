//! Compartment transition probabilities
//!
//! Per age group and source compartment, the share of people moving to each
//! destination on one day. Staying put is an explicit self-transition, so each
//! source's outgoing probabilities sum to one.

use serde::Serialize;

/// Dense transition table in layout order
///
/// `outflows(age, src)` lists `(dst, probability)` pairs sorted by
/// destination index. `S` never has outflows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionRates {
    num_compartments: usize,
    /// `[age * num_compartments + src]` → outflows
    outflows: Vec<Vec<(usize, f64)>>,
}

impl ProgressionRates {
    pub fn new(num_ages: usize, num_compartments: usize) -> Self {
        Self {
            num_compartments,
            outflows: vec![Vec::new(); num_ages * num_compartments],
        }
    }

    /// Record one transition; kept sorted by destination
    ///
    /// Returns false if `(age, src, dst)` was already present.
    pub fn insert(&mut self, age: usize, src: usize, dst: usize, probability: f64) -> bool {
        let row = &mut self.outflows[age * self.num_compartments + src];
        match row.binary_search_by_key(&dst, |(d, _)| *d) {
            Ok(_) => false,
            Err(pos) => {
                row.insert(pos, (dst, probability));
                true
            }
        }
    }

    pub fn outflows(&self, age: usize, src: usize) -> &[(usize, f64)] {
        &self.outflows[age * self.num_compartments + src]
    }

    /// Sum of outgoing probabilities of one source
    pub fn outflow_total(&self, age: usize, src: usize) -> f64 {
        self.outflows(age, src).iter().map(|(_, p)| p).sum()
    }

    pub fn num_ages(&self) -> usize {
        self.outflows.len() / self.num_compartments.max(1)
    }

    pub fn num_compartments(&self) -> usize {
        self.num_compartments
    }
}
