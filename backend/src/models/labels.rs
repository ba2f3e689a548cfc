//! Labels and the dense index space
//!
//! Regions, age groups and compartments arrive as strings. They are resolved
//! once, at model construction, into a [`StateLayout`] that assigns every
//! label a dense index. All hot loops work on indices; labels come back only
//! when results are written out.
//!
//! # Ordering
//!
//! - regions: lexicographic by id
//! - ages: lexicographic by normalised label
//! - compartments: `S` first, `E` second, the rest lexicographic
//!
//! Floating-point sums always run in this order, which pins deterministic
//! results regardless of input row order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Susceptible compartment label
pub const SUSCEPTIBLE: &str = "S";
/// Exposed compartment label (where new infections land)
pub const EXPOSED: &str = "E";

/// Index of `S` in every layout
pub const SUSCEPTIBLE_IDX: usize = 0;
/// Index of `E` in every layout
pub const EXPOSED_IDX: usize = 1;

/// Lookup failures against a layout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("Unknown age group: {0}")]
    UnknownAgeGroup(String),

    #[error("Unknown compartment: {0}")]
    UnknownCompartment(String),
}

/// Age bracket, compared by normalised label
///
/// # Example
/// ```
/// use network_sim_core_rs::AgeRange;
///
/// assert_eq!(AgeRange::new("[0, 17)"), AgeRange::new("[0,17)"));
/// assert_eq!(AgeRange::new("70 +").as_str(), "70+");
/// assert_ne!(AgeRange::new("70+"), AgeRange::new("[70,199)"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AgeRange(String);

impl AgeRange {
    pub fn new(label: &str) -> Self {
        Self(normalize_age_label(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize_age_label(label: &str) -> String {
    let label = label.trim();

    if let Some(inner) = label.strip_prefix('[').and_then(|s| s.strip_suffix(')')) {
        if let Some((lo, hi)) = inner.split_once(',') {
            let (lo, hi) = (lo.trim(), hi.trim());
            if lo.parse::<u32>().is_ok() && hi.parse::<u32>().is_ok() {
                return format!("[{lo},{hi})");
            }
        }
    }

    if let Some(lo) = label.strip_suffix('+') {
        let lo = lo.trim();
        if lo.parse::<u32>().is_ok() {
            return format!("{lo}+");
        }
    }

    label.to_string()
}

impl From<String> for AgeRange {
    fn from(label: String) -> Self {
        Self::new(&label)
    }
}

impl From<&str> for AgeRange {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<AgeRange> for String {
    fn from(age: AgeRange) -> Self {
        age.0
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Disease-state label
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Compartment(String);

impl Compartment {
    pub fn new(label: &str) -> Self {
        Self(label.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_susceptible(&self) -> bool {
        self.0 == SUSCEPTIBLE
    }

    pub fn is_exposed(&self) -> bool {
        self.0 == EXPOSED
    }
}

impl From<&str> for Compartment {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dense index space shared by every state of one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateLayout {
    regions: Vec<String>,
    ages: Vec<AgeRange>,
    compartments: Vec<Compartment>,

    #[serde(skip)]
    region_index: BTreeMap<String, usize>,
    #[serde(skip)]
    age_index: BTreeMap<AgeRange, usize>,
    #[serde(skip)]
    compartment_index: BTreeMap<Compartment, usize>,
}

impl StateLayout {
    /// Build a layout from unordered, possibly repeated labels
    ///
    /// `S` and `E` are always present at indices 0 and 1.
    pub fn new<R, A, C>(regions: R, ages: A, compartments: C) -> Self
    where
        R: IntoIterator<Item = String>,
        A: IntoIterator<Item = AgeRange>,
        C: IntoIterator<Item = Compartment>,
    {
        let regions: Vec<String> = regions.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let ages: Vec<AgeRange> = ages.into_iter().collect::<BTreeSet<_>>().into_iter().collect();

        let rest: BTreeSet<Compartment> = compartments
            .into_iter()
            .filter(|c| !c.is_susceptible() && !c.is_exposed())
            .collect();
        let mut comps = vec![Compartment::new(SUSCEPTIBLE), Compartment::new(EXPOSED)];
        comps.extend(rest);

        let region_index = regions.iter().enumerate().map(|(i, r)| (r.clone(), i)).collect();
        let age_index = ages.iter().enumerate().map(|(i, a)| (a.clone(), i)).collect();
        let compartment_index = comps.iter().enumerate().map(|(i, c)| (c.clone(), i)).collect();

        Self {
            regions,
            ages,
            compartments: comps,
            region_index,
            age_index,
            compartment_index,
        }
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn ages(&self) -> &[AgeRange] {
        &self.ages
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn num_ages(&self) -> usize {
        self.ages.len()
    }

    pub fn num_compartments(&self) -> usize {
        self.compartments.len()
    }

    /// Cells in one region state (ages × compartments)
    pub fn region_width(&self) -> usize {
        self.ages.len() * self.compartments.len()
    }

    /// Flat offset of (age, compartment) within a region state
    #[inline]
    pub fn offset(&self, age: usize, compartment: usize) -> usize {
        age * self.compartments.len() + compartment
    }

    pub fn region_index(&self, region: &str) -> Result<usize, LabelError> {
        self.region_index
            .get(region)
            .copied()
            .ok_or_else(|| LabelError::UnknownRegion(region.to_string()))
    }

    pub fn age_index(&self, age: &AgeRange) -> Result<usize, LabelError> {
        self.age_index
            .get(age)
            .copied()
            .ok_or_else(|| LabelError::UnknownAgeGroup(age.to_string()))
    }

    pub fn compartment_index(&self, compartment: &str) -> Result<usize, LabelError> {
        self.compartment_index
            .get(&Compartment::new(compartment))
            .copied()
            .ok_or_else(|| LabelError::UnknownCompartment(compartment.to_string()))
    }
}
