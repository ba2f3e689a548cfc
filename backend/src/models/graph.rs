//! Commute graph between regions
//!
//! Directed graph over the layout's regions. An edge `u → v` carries the
//! number of daily commuters between the two regions (`weight`) and how much of
//! that movement disappears under restrictions (`delta_adjustment`).
//!
//! Key features:
//! - Vertices share the layout's region indices (sorted ids)
//! - Incoming adjacency per target in BTreeMaps, so sources iterate in order
//! - Weights validated on insertion

use crate::models::labels::{LabelError, StateLayout};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("Invalid weight {weight} on edge {from} -> {to}")]
    InvalidWeight { from: String, to: String, weight: f64 },

    #[error("Invalid delta adjustment {delta_adjustment} on edge {from} -> {to}")]
    InvalidDeltaAdjustment {
        from: String,
        to: String,
        delta_adjustment: f64,
    },

    #[error("Duplicate edge {from} -> {to}")]
    DuplicateEdge { from: String, to: String },

    #[error(transparent)]
    Label(#[from] LabelError),
}

/// Attributes of one commute edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeWeights {
    pub weight: f64,
    pub delta_adjustment: f64,
}

impl EdgeWeights {
    /// Weight after applying a movement multiplier
    ///
    /// `w' = w - δ·(1 - m)·w`: with `m = 1` the full weight, with `m = 0` the
    /// share `δ` of commuters stays home.
    ///
    /// # Example
    /// ```
    /// use network_sim_core_rs::EdgeWeights;
    ///
    /// let edge = EdgeWeights { weight: 100.0, delta_adjustment: 0.75 };
    /// assert_eq!(edge.effective_weight(1.0), 100.0);
    /// assert_eq!(edge.effective_weight(0.5), 62.5);
    /// assert_eq!(edge.effective_weight(0.0), 25.0);
    /// ```
    #[inline]
    pub fn effective_weight(&self, movement_multiplier: f64) -> f64 {
        self.weight - self.delta_adjustment * (1.0 - movement_multiplier) * self.weight
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommuteGraph {
    regions: Vec<String>,

    #[serde(skip)]
    region_to_index: BTreeMap<String, usize>,

    /// target_idx → source_idx → weights
    incoming: Vec<BTreeMap<usize, EdgeWeights>>,
}

impl CommuteGraph {
    /// Edgeless graph over the layout's regions
    pub fn new(layout: &StateLayout) -> Self {
        let regions = layout.regions().to_vec();
        let region_to_index = regions.iter().enumerate().map(|(i, r)| (r.clone(), i)).collect();
        Self {
            incoming: vec![BTreeMap::new(); regions.len()],
            regions,
            region_to_index,
        }
    }

    /// Add a validated edge
    ///
    /// Weights and delta adjustments must be finite and non-negative; an edge
    /// may only be added once.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        weight: f64,
        delta_adjustment: f64,
    ) -> Result<(), GraphError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(GraphError::InvalidWeight {
                from: from.to_string(),
                to: to.to_string(),
                weight,
            });
        }
        if !delta_adjustment.is_finite() || delta_adjustment < 0.0 {
            return Err(GraphError::InvalidDeltaAdjustment {
                from: from.to_string(),
                to: to.to_string(),
                delta_adjustment,
            });
        }

        let from_idx = self.index_of(from)?;
        let to_idx = self.index_of(to)?;

        let sources = &mut self.incoming[to_idx];
        if sources.contains_key(&from_idx) {
            return Err(GraphError::DuplicateEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        sources.insert(
            from_idx,
            EdgeWeights {
                weight,
                delta_adjustment,
            },
        );
        Ok(())
    }

    fn index_of(&self, region: &str) -> Result<usize, LabelError> {
        self.region_to_index
            .get(region)
            .copied()
            .ok_or_else(|| LabelError::UnknownRegion(region.to_string()))
    }

    /// Effective weight of `from → to` under a movement multiplier
    pub fn get_weight(&self, from: &str, to: &str, movement_multiplier: f64) -> Option<f64> {
        let from_idx = self.region_to_index.get(from)?;
        let to_idx = self.region_to_index.get(to)?;
        self.incoming[*to_idx]
            .get(from_idx)
            .map(|edge| edge.effective_weight(movement_multiplier))
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.get_weight(from, to, 1.0).is_some()
    }

    /// Edges into `target`, ordered by source index
    pub fn incoming(&self, target: usize) -> impl Iterator<Item = (usize, &EdgeWeights)> {
        self.incoming[target].iter().map(|(src, edge)| (*src, edge))
    }

    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.incoming.iter().map(|sources| sources.len()).sum()
    }

    /// Regions that no edge touches, in id order
    ///
    /// A self-loop is enough to count as part of the network.
    pub fn isolated_regions(&self) -> Vec<&str> {
        let mut connected = vec![false; self.regions.len()];
        for (target, sources) in self.incoming.iter().enumerate() {
            for &source in sources.keys() {
                connected[source] = true;
                connected[target] = true;
            }
        }
        self.regions
            .iter()
            .zip(connected)
            .filter(|(_, is_connected)| !is_connected)
            .map(|(region, _)| region.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::labels::AgeRange;

    fn layout(regions: &[&str]) -> StateLayout {
        StateLayout::new(
            regions.iter().map(|r| r.to_string()),
            vec![AgeRange::new("m")],
            vec![],
        )
    }

    #[test]
    fn test_incoming_sorted_by_source() {
        let mut graph = CommuteGraph::new(&layout(&["a", "b", "c"]));
        graph.add_edge("c", "b", 3.0, 0.0).unwrap();
        graph.add_edge("a", "b", 1.0, 0.0).unwrap();

        let sources: Vec<usize> = graph.incoming(1).map(|(s, _)| s).collect();
        assert_eq!(sources, vec![0, 2]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_duplicate_edge_rejected() {
        let mut graph = CommuteGraph::new(&layout(&["a", "b"]));
        graph.add_edge("a", "b", 1.0, 0.0).unwrap();
        assert_eq!(
            graph.add_edge("a", "b", 2.0, 0.0),
            Err(GraphError::DuplicateEdge {
                from: "a".to_string(),
                to: "b".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_attributes_rejected() {
        let mut graph = CommuteGraph::new(&layout(&["a", "b"]));
        assert!(matches!(
            graph.add_edge("a", "b", -1.0, 0.0),
            Err(GraphError::InvalidWeight { .. })
        ));
        assert!(matches!(
            graph.add_edge("a", "b", 1.0, f64::NAN),
            Err(GraphError::InvalidDeltaAdjustment { .. })
        ));
        assert!(matches!(
            graph.add_edge("a", "zz", 1.0, 0.0),
            Err(GraphError::Label(LabelError::UnknownRegion(_)))
        ));
    }

    #[test]
    fn test_isolated_regions() {
        let mut graph = CommuteGraph::new(&layout(&["a", "b", "c", "d"]));
        graph.add_edge("a", "a", 5.0, 0.0).unwrap();
        graph.add_edge("b", "c", 5.0, 0.0).unwrap();
        assert_eq!(graph.isolated_regions(), vec!["d"]);
    }
}
