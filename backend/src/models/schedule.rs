//! Time-varying parameter schedules
//!
//! A schedule maps dates to values. The value active on a date is the one
//! attached to the latest schedule date on or before it; before the first
//! entry the caller's default applies.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchedule<T> {
    entries: BTreeMap<NaiveDate, T>,
}

impl<T> Default for ParameterSchedule<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> ParameterSchedule<T> {
    /// Build from `(date, value)` pairs; a later pair for the same date wins
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, T)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Value in force on `date`, if any entry starts on or before it
    ///
    /// # Example
    /// ```
    /// use chrono::NaiveDate;
    /// use network_sim_core_rs::ParameterSchedule;
    ///
    /// let d = |day| NaiveDate::from_ymd_opt(2020, 3, day).unwrap();
    /// let schedule = ParameterSchedule::new(vec![(d(1), 0.5), (d(10), 0.2)]);
    /// assert_eq!(schedule.value_at(d(9)), Some(&0.5));
    /// assert_eq!(schedule.value_at(d(10)), Some(&0.2));
    /// assert_eq!(schedule.value_at(NaiveDate::from_ymd_opt(2020, 2, 1).unwrap()), None);
    /// ```
    pub fn value_at(&self, date: NaiveDate) -> Option<&T> {
        self.entries.range(..=date).next_back().map(|(_, v)| v)
    }

    /// Active value on `date`, falling back to `default`
    pub fn resolve(&self, date: NaiveDate, default: T) -> T
    where
        T: Clone,
    {
        self.value_at(date).cloned().unwrap_or(default)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.entries.keys().next().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &T)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Day's scaling of commuting and of contact rates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Multiplier {
    pub movement: f64,
    pub contact: f64,
}

impl Multiplier {
    /// No restrictions in place
    pub const UNRESTRICTED: Multiplier = Multiplier {
        movement: 1.0,
        contact: 1.0,
    };

    pub fn is_valid(&self) -> bool {
        [self.movement, self.contact]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Self::UNRESTRICTED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, day).unwrap()
    }

    #[test]
    fn test_resolve_falls_back_before_first_entry() {
        let schedule = ParameterSchedule::new(vec![(d(5), Multiplier { movement: 0.1, contact: 0.2 })]);
        assert_eq!(schedule.resolve(d(4), Multiplier::UNRESTRICTED), Multiplier::UNRESTRICTED);
        assert_eq!(schedule.resolve(d(20), Multiplier::UNRESTRICTED).contact, 0.2);
    }

    #[test]
    fn test_empty_schedule() {
        let schedule: ParameterSchedule<f64> = ParameterSchedule::default();
        assert!(schedule.is_empty());
        assert_eq!(schedule.first_date(), None);
        assert_eq!(schedule.resolve(d(1), 0.3), 0.3);
    }

    #[test]
    fn test_multiplier_validity() {
        assert!(Multiplier::UNRESTRICTED.is_valid());
        assert!(Multiplier { movement: 0.0, contact: 2.0 }.is_valid());
        assert!(!Multiplier { movement: -0.1, contact: 1.0 }.is_valid());
        assert!(!Multiplier { movement: 1.0, contact: f64::INFINITY }.is_valid());
    }
}
