//! Long-format result tables
//!
//! One row per (date, region, age, compartment). The default output view
//! sums ages away ([`ResultTable::aggregate_ages`]); trials can be averaged
//! cell by cell ([`ResultTable::mean`]).

use crate::models::{AgeRange, Compartment, NetworkState};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub date: NaiveDate,
    pub node: String,
    pub state: Compartment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<AgeRange>,
    pub total: f64,
}

type RowKey = (NaiveDate, String, Compartment, Option<AgeRange>);

fn key(row: &ResultRow) -> RowKey {
    (row.date, row.node.clone(), row.state.clone(), row.age.clone())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Append every cell of `state` under `date`, in layout order
    pub fn record(&mut self, date: NaiveDate, state: &NetworkState) {
        let layout = state.layout();
        self.rows.reserve(layout.num_regions() * layout.region_width());
        for (r, a, c, total) in state.cells() {
            self.rows.push(ResultRow {
                date,
                node: layout.regions()[r].clone(),
                state: layout.compartments()[c].clone(),
                age: Some(layout.ages()[a].clone()),
                total,
            });
        }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows dated strictly after `date`
    pub fn after(&self, date: NaiveDate) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(move |row| row.date > date)
    }

    /// Distinct dates, in order of first appearance
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = Vec::new();
        for row in &self.rows {
            if !dates.contains(&row.date) {
                dates.push(row.date);
            }
        }
        dates
    }

    /// Sum of `total` per date
    pub fn totals_by_date(&self) -> IndexMap<NaiveDate, f64> {
        let mut totals = IndexMap::new();
        for row in &self.rows {
            *totals.entry(row.date).or_insert(0.0) += row.total;
        }
        totals
    }

    /// Same table with ages summed away, first-appearance order kept
    pub fn aggregate_ages(&self) -> ResultTable {
        let mut cells: IndexMap<(NaiveDate, &str, &Compartment), f64> = IndexMap::new();
        for row in &self.rows {
            *cells.entry((row.date, row.node.as_str(), &row.state)).or_insert(0.0) += row.total;
        }
        ResultTable {
            rows: cells
                .into_iter()
                .map(|((date, node, state), total)| ResultRow {
                    date,
                    node: node.to_string(),
                    state: state.clone(),
                    age: None,
                    total,
                })
                .collect(),
        }
    }

    /// Cell-wise mean over trials
    ///
    /// A cell missing from some tables counts as zero there. Returns `None`
    /// for an empty slice.
    pub fn mean(tables: &[ResultTable]) -> Option<ResultTable> {
        if tables.is_empty() {
            return None;
        }
        let mut cells: IndexMap<RowKey, f64> = IndexMap::new();
        for table in tables {
            for row in &table.rows {
                *cells.entry(key(row)).or_insert(0.0) += row.total;
            }
        }
        let n = tables.len() as f64;
        Some(ResultTable {
            rows: cells
                .into_iter()
                .map(|((date, node, state, age), total)| ResultRow {
                    date,
                    node,
                    state,
                    age,
                    total: total / n,
                })
                .collect(),
        })
    }
}
