//! Age mixing matrix
//!
//! Average number of contacts per person per day between two age groups.
//! `rate(a, b)` is read as: a person aged `a` meets this many people aged `b`.
//! Rows are therefore indexed by the age receiving contacts and columns by the
//! age whose infectious members produce them.

use crate::models::labels::{AgeRange, StateLayout};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixingError {
    #[error("Invalid mixing rate {rate} for {row} -> {column}")]
    InvalidRate {
        row: String,
        column: String,
        rate: f64,
    },

    #[error("Duplicate mixing entry for {row} -> {column}")]
    DuplicatePair { row: String, column: String },

    #[error("Mixing matrix has no entry for {row} -> {column}")]
    MissingPair { row: String, column: String },
}

/// Sparse, label-keyed mixing matrix as loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MixingMatrix {
    rows: BTreeMap<AgeRange, BTreeMap<AgeRange, f64>>,
}

impl MixingMatrix {
    /// Build from long-format `(source, target, rate)` triples
    ///
    /// # Example
    /// ```
    /// use network_sim_core_rs::{AgeRange, MixingMatrix};
    ///
    /// let matrix = MixingMatrix::from_triples(vec![
    ///     ("[0,17)", "[0,17)", 0.2),
    ///     ("[0,17)", "70+", 0.1),
    /// ])
    /// .unwrap();
    ///
    /// let row = matrix.row(&AgeRange::new("[0, 17)")).unwrap();
    /// assert_eq!(row.to_string(), "[[0,17): 0.2, 70+: 0.1]");
    /// ```
    pub fn from_triples<I, S>(triples: I) -> Result<Self, MixingError>
    where
        I: IntoIterator<Item = (S, S, f64)>,
        S: AsRef<str>,
    {
        let mut rows: BTreeMap<AgeRange, BTreeMap<AgeRange, f64>> = BTreeMap::new();
        for (source, target, rate) in triples {
            let (source, target) = (AgeRange::new(source.as_ref()), AgeRange::new(target.as_ref()));
            if !rate.is_finite() || rate < 0.0 {
                return Err(MixingError::InvalidRate {
                    row: source.to_string(),
                    column: target.to_string(),
                    rate,
                });
            }
            let row = rows.entry(source.clone()).or_default();
            if row.insert(target.clone(), rate).is_some() {
                return Err(MixingError::DuplicatePair {
                    row: source.to_string(),
                    column: target.to_string(),
                });
            }
        }
        Ok(Self { rows })
    }

    /// Contact rate from `source` to `target`
    pub fn get(&self, source: &AgeRange, target: &AgeRange) -> Result<f64, MixingError> {
        self.rows
            .get(source)
            .and_then(|row| row.get(target))
            .copied()
            .ok_or_else(|| MixingError::MissingPair {
                row: source.to_string(),
                column: target.to_string(),
            })
    }

    pub fn row(&self, source: &AgeRange) -> Option<MixingRow<'_>> {
        self.rows.get(source).map(|entries| MixingRow { entries })
    }

    /// Iterate rows in age order
    pub fn rows(&self) -> impl Iterator<Item = (&AgeRange, MixingRow<'_>)> {
        self.rows.iter().map(|(age, entries)| (age, MixingRow { entries }))
    }

    pub fn row_ages(&self) -> BTreeSet<AgeRange> {
        self.rows.keys().cloned().collect()
    }

    pub fn column_ages(&self) -> BTreeSet<AgeRange> {
        self.rows.values().flat_map(|row| row.keys().cloned()).collect()
    }

    /// Dense copy indexed by layout age order
    ///
    /// Fails if any (row, column) pair over the layout's ages is missing.
    pub fn to_dense(&self, layout: &StateLayout) -> Result<AgeMixing, MixingError> {
        let ages = layout.ages();
        let mut rates = Vec::with_capacity(ages.len() * ages.len());
        for source in ages {
            for target in ages {
                rates.push(self.get(source, target)?);
            }
        }
        Ok(AgeMixing {
            num_ages: ages.len(),
            rates,
        })
    }
}

/// One row of a [`MixingMatrix`]
#[derive(Debug, Clone, Copy)]
pub struct MixingRow<'a> {
    entries: &'a BTreeMap<AgeRange, f64>,
}

impl<'a> MixingRow<'a> {
    pub fn get(&self, target: &AgeRange) -> Option<f64> {
        self.entries.get(target).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a AgeRange, f64)> + 'a {
        self.entries.iter().map(|(age, rate)| (age, *rate))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for MixingRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (age, rate)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", age, rate)?;
        }
        f.write_str("]")
    }
}

/// Dense `ages × ages` mixing rates in layout order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeMixing {
    num_ages: usize,
    rates: Vec<f64>,
}

impl AgeMixing {
    #[inline]
    pub fn rate(&self, source: usize, target: usize) -> f64 {
        self.rates[source * self.num_ages + target]
    }

    pub fn row(&self, source: usize) -> &[f64] {
        &self.rates[source * self.num_ages..(source + 1) * self.num_ages]
    }

    pub fn num_ages(&self) -> usize {
        self.num_ages
    }
}
