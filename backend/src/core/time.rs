//! Calendar management for the simulation
//!
//! The simulation operates in whole days between an inclusive start and end
//! date. Day 0 is the start date and holds the seeded state; every later day
//! is one step of the dynamics.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Manages simulation time in discrete days
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use network_sim_core_rs::DayClock;
///
/// let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2020, 3, 3).unwrap();
/// let mut clock = DayClock::new(start, end);
/// assert_eq!(clock.current_day(), 0);
/// assert_eq!(clock.total_days(), 3);
///
/// clock.advance_day();
/// assert_eq!(clock.current_date(), NaiveDate::from_ymd_opt(2020, 3, 2).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayClock {
    start: NaiveDate,
    end: NaiveDate,
    /// Days elapsed since the start date
    current_day: usize,
}

impl DayClock {
    /// Create a new DayClock positioned at the start date
    ///
    /// # Panics
    /// Panics if `end` is before `start`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        assert!(start <= end, "end date must not be before start date");
        Self {
            start,
            end,
            current_day: 0,
        }
    }

    /// Resume a clock at a given day (used when restoring snapshots)
    pub fn at_day(start: NaiveDate, end: NaiveDate, current_day: usize) -> Self {
        let mut clock = Self::new(start, end);
        assert!(
            current_day < clock.total_days(),
            "day {} outside the {}-day range",
            current_day,
            clock.total_days()
        );
        clock.current_day = current_day;
        clock
    }

    /// Advance time by one day
    pub fn advance_day(&mut self) {
        self.current_day += 1;
    }

    /// Get the current day (0-indexed)
    pub fn current_day(&self) -> usize {
        self.current_day
    }

    /// Calendar date of the current day
    pub fn current_date(&self) -> NaiveDate {
        self.start + Duration::days(self.current_day as i64)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end
    }

    /// Number of dates in the inclusive range
    pub fn total_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// True when the current date is the end date (no more steps)
    pub fn is_finished(&self) -> bool {
        self.current_day + 1 >= self.total_days()
    }

    /// All dates in the range, in order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.total_days()).map(move |d| self.start + Duration::days(d as i64))
    }
}
