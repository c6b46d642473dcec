//! Path overlap and similarity measures.
//!
//! Overlap between two paths of the same OD pair is the shared extent of
//! their edges relative to one path's own extent, raised to `gamma`:
//!
//! ```text
//! term(p, q) = (Σ_{e ∈ p ∩ q} m(e) / Σ_{e ∈ p} m(e)) ^ gamma
//! ```
//!
//! `m` is either the edge free-flow time or the edge length. A path's own
//! term is always 1.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::RepositoryError;
use crate::network::Network;
use crate::types::{EdgeId, Path, PathError};

/// Edge measure used to weigh shared edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapBasis {
    /// Free-flow travel time.
    #[default]
    FreeFlowTime,
    /// Geometric length.
    Length,
}

/// Computes overlap terms between paths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapEvaluator {
    /// Overlap exponent.
    pub gamma: f64,
    /// Edge measure.
    pub basis: OverlapBasis,
}

impl Default for OverlapEvaluator {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            basis: OverlapBasis::FreeFlowTime,
        }
    }
}

impl OverlapEvaluator {
    /// Create an evaluator.
    pub fn new(gamma: f64, basis: OverlapBasis) -> Self {
        Self { gamma, basis }
    }

    fn edge_measure(&self, network: &Network, edge: EdgeId) -> Result<f64, RepositoryError> {
        let attrs = &network.edge(edge)?.attrs;
        Ok(match self.basis {
            OverlapBasis::FreeFlowTime => attrs.free_flow_time,
            OverlapBasis::Length => attrs.length,
        })
    }

    /// Total measure of an edge sequence.
    pub fn measure(&self, network: &Network, edges: &[EdgeId]) -> Result<f64, RepositoryError> {
        edges
            .iter()
            .try_fold(0.0, |acc, e| -> Result<f64, RepositoryError> {
                Ok(acc + self.edge_measure(network, *e)?)
            })
    }

    /// Overlap of `path` with `other`, normalised by `path`'s own measure.
    pub fn term(&self, network: &Network, path: &Path, other: &Path) -> Result<f64, RepositoryError> {
        let own = self.measure(network, path.edges())?;
        if path.is_empty() || own <= 0.0 {
            return Err(PathError::EmptyPath {
                source_vertex: path.source,
                target_vertex: path.target,
            }
            .into());
        }

        let other_edges: BTreeSet<EdgeId> = other.edges().iter().copied().collect();
        let mut shared = 0.0;
        for edge in path.edges().iter().filter(|e| other_edges.contains(e)) {
            shared += self.edge_measure(network, *edge)?;
        }
        Ok((shared / own).powf(self.gamma))
    }
}

/// How much of an existing path a candidate edge set covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityStats {
    /// Existing-path edges also in the candidate.
    pub shared_edges: usize,
    /// Current travel time over the shared edges.
    pub shared_time: f64,
    /// Edge count of the existing path.
    pub path_edges: usize,
}

impl SimilarityStats {
    /// Compare `existing` against a candidate edge set.
    pub fn compute(network: &Network, existing: &Path, candidate: &BTreeSet<EdgeId>) -> Result<Self, RepositoryError> {
        let mut shared_edges = 0;
        let mut shared_time = 0.0;
        for edge in existing.edges().iter().filter(|e| candidate.contains(e)) {
            shared_edges += 1;
            shared_time += network.edge(*edge)?.attrs.current_time;
        }
        Ok(Self {
            shared_edges,
            shared_time,
            path_edges: existing.len(),
        })
    }

    /// Fraction of the existing path's edges not in the candidate.
    pub fn non_shared_fraction(&self) -> f64 {
        if self.path_edges == 0 {
            return 1.0;
        }
        (self.path_edges - self.shared_edges) as f64 / self.path_edges as f64
    }

    /// Relative gap between the shared time and the candidate cost.
    pub fn relative_time_difference(&self, candidate_cost: f64) -> f64 {
        if candidate_cost <= 0.0 {
            return if self.shared_time == 0.0 { 0.0 } else { f64::INFINITY };
        }
        (self.shared_time - candidate_cost).abs() / candidate_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PathId, VertexId};

    fn line(times: &[f64]) -> (Network, Vec<EdgeId>) {
        let mut net = Network::new();
        let mut ids = Vec::new();
        for (i, t) in times.iter().enumerate() {
            let id = net.add_isolated_real_edge(format!("e{i}")).unwrap();
            let attrs = net.edge_attributes_mut(id).unwrap();
            attrs.free_flow_time = *t;
            attrs.current_time = *t;
            attrs.length = *t * 10.0;
            ids.push(id);
        }
        (net, ids)
    }

    fn path(id: u64, edges: Vec<EdgeId>) -> Path {
        Path::new(PathId::new(id), VertexId::new(0), VertexId::new(1), edges).unwrap()
    }

    #[test]
    fn test_self_term_is_one() {
        let (net, e) = line(&[3.0, 4.0]);
        let p = path(1, e.clone());
        let eval = OverlapEvaluator::new(2.0, OverlapBasis::FreeFlowTime);
        assert_eq!(eval.term(&net, &p, &p).unwrap(), 1.0);
    }

    #[test]
    fn test_term_normalised_by_own_measure() {
        let (net, e) = line(&[2.0, 6.0, 2.0]);
        let p = path(1, vec![e[0], e[1]]);
        let q = path(2, vec![e[1], e[2]]);
        let eval = OverlapEvaluator::default();

        assert!((eval.term(&net, &p, &q).unwrap() - 0.75).abs() < 1e-12);
        assert!((eval.term(&net, &q, &p).unwrap() - 0.75).abs() < 1e-12);

        let r = path(3, vec![e[0]]);
        assert!((eval.term(&net, &p, &r).unwrap() - 0.25).abs() < 1e-12);
        assert_eq!(eval.term(&net, &r, &p).unwrap(), 1.0);
    }

    #[test]
    fn test_length_basis_with_gamma() {
        let (net, e) = line(&[1.0, 1.0]);
        let p = path(1, vec![e[0], e[1]]);
        let q = path(2, vec![e[0]]);
        let eval = OverlapEvaluator::new(2.0, OverlapBasis::Length);
        assert!((eval.term(&net, &p, &q).unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_zero_measure_is_empty_path() {
        let (net, e) = line(&[0.0]);
        let p = path(1, e);
        let err = OverlapEvaluator::default().term(&net, &p, &p).unwrap_err();
        assert!(matches!(err, RepositoryError::Path(PathError::EmptyPath { .. })));
    }

    #[test]
    fn test_similarity_stats() {
        let (net, e) = line(&[1.0, 1.0, 1.0, 1.0]);
        let existing = path(1, e[..4].to_vec());
        let candidate: BTreeSet<_> = e[..3].iter().copied().collect();
        let stats = SimilarityStats::compute(&net, &existing, &candidate).unwrap();

        assert_eq!(stats.shared_edges, 3);
        assert!((stats.non_shared_fraction() - 0.25).abs() < 1e-12);
        assert!((stats.relative_time_difference(3.0)).abs() < 1e-12);
    }
}
