//! Non-fatal diagnostics
//!
//! Conditions the simulation can recover from (a region missing from the
//! population table, contact demand exceeding susceptibles, ...) are recorded
//! as [`Issue`]s instead of failing the run. Issues are collected in an
//! [`IssueLog`] that is threaded through every call able to raise one, and are
//! returned to the caller alongside the results.
//!
//! # Example
//!
//! ```rust
//! use network_sim_core_rs::{Issue, IssueLog};
//!
//! let mut log = IssueLog::new();
//! log.record(Issue::new("Region r9 is not in the population table", Issue::MODEL));
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.at_least(Issue::MODEL).len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub description: String,
    pub severity: u8,
}

impl Issue {
    /// Problems found while building the model
    pub const MODEL: u8 = 5;
    /// Numbers clamped during a step
    pub const CLAMPED: u8 = 10;

    pub fn new(description: impl Into<String>, severity: u8) -> Self {
        Self {
            description: description.into(),
            severity,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[severity {}] {}", self.severity, self.description)
    }
}

/// Ordered collection of issues raised during a trial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueLog {
    issues: Vec<Issue>,
}

impl IssueLog {
    /// Create a new empty issue log
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Add an issue to the log
    pub fn record(&mut self, issue: Issue) {
        warn!(severity = issue.severity, "{}", issue.description);
        self.issues.push(issue);
    }

    /// Resume a log whose issues were already reported
    pub fn from_recorded(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Issues with severity ≥ `severity`
    pub fn at_least(&self, severity: u8) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.severity >= severity).collect()
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display() {
        let issue = Issue::new("clamped", Issue::CLAMPED);
        assert_eq!(issue.to_string(), "[severity 10] clamped");
    }

    #[test]
    fn test_log_keeps_order_and_filters() {
        let mut log = IssueLog::new();
        log.record(Issue::new("first", Issue::CLAMPED));
        log.record(Issue::new("second", Issue::MODEL));

        assert_eq!(log.issues()[0].description, "first");
        assert_eq!(log.at_least(Issue::CLAMPED).len(), 1);
        assert_eq!(log.into_vec().len(), 2);
    }

    #[test]
    fn test_resumed_log_keeps_issues_as_they_were() {
        let recorded = vec![Issue::new("first", Issue::CLAMPED), Issue::new("second", Issue::MODEL)];
        let mut log = IssueLog::from_recorded(recorded.clone());
        assert_eq!(log.issues(), recorded.as_slice());

        log.record(Issue::new("third", Issue::MODEL));
        assert_eq!(log.len(), 3);
        assert_eq!(log.issues()[2].description, "third");
    }
}
