//! Candidate paths between OD endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh64::Xxh64;

use super::edge::EdgeId;
use super::vertex::VertexId;

/// Identifier of a path, unique within one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathId(u64);

impl PathId {
    /// Create a path id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for path construction and normalisation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    /// The path has no real edge (or no positive extent) to normalise by.
    #[error("Empty path from {source_vertex} to {target_vertex}")]
    EmptyPath {
        /// Origin vertex.
        source_vertex: VertexId,
        /// Destination vertex.
        target_vertex: VertexId,
    },
}

/// Fingerprint of an edge sequence, used for exact-duplicate detection.
pub fn edge_sequence_fingerprint(edges: &[EdgeId]) -> u64 {
    let mut hasher = Xxh64::new(0);
    for edge in edges {
        hasher.update(&(edge.index() as u64).to_le_bytes());
    }
    hasher.digest()
}

/// A candidate route: the real edges from an origin to a destination.
///
/// Costs are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Repository-wide identifier.
    pub id: PathId,
    /// Origin vertex.
    pub source: VertexId,
    /// Destination vertex.
    pub target: VertexId,
    edges: Vec<EdgeId>,
    fingerprint: u64,
    /// Sum of edge lengths.
    pub length: f64,
    /// Sum of edge free-flow times.
    pub free_flow_cost: f64,
    /// Cost observed in the latest search round.
    pub current_cost: f64,
    /// Cost slot used by the working-cost mode.
    pub working_cost: f64,
    /// Number of rounds this path came out as a shortest path.
    pub usage: u32,
    /// Whether this path is the cheapest of its OD pair in the latest round.
    pub current_shortest: bool,
    /// Accumulated overlap against the paths of the same OD pair.
    pub sum_overlap: f64,
}

impl Path {
    /// Create a path from its real-edge sequence.
    ///
    /// Lengths and costs start at zero; the repository fills them in on
    /// insertion.
    pub fn new(
        id: PathId,
        source: VertexId,
        target: VertexId,
        edges: Vec<EdgeId>,
    ) -> Result<Self, PathError> {
        if edges.is_empty() {
            return Err(PathError::EmptyPath {
                source_vertex: source,
                target_vertex: target,
            });
        }
        let fingerprint = edge_sequence_fingerprint(&edges);
        Ok(Self {
            id,
            source,
            target,
            edges,
            fingerprint,
            length: 0.0,
            free_flow_cost: 0.0,
            current_cost: 0.0,
            working_cost: 0.0,
            usage: 0,
            current_shortest: false,
            sum_overlap: 0.0,
        })
    }

    /// Real edges in travel order.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Fingerprint of the edge sequence.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// `true` when `edges` is exactly this path's edge sequence.
    pub fn same_edges(&self, edges: &[EdgeId]) -> bool {
        self.fingerprint == edge_sequence_fingerprint(edges) && self.edges == edges
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Always `false` for a constructed path.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<EdgeId> {
        raw.iter().copied().map(EdgeId::new).collect()
    }

    #[test]
    fn test_empty_path_rejected() {
        let err = Path::new(PathId::new(1), VertexId::new(0), VertexId::new(1), vec![]).unwrap_err();
        assert!(matches!(err, PathError::EmptyPath { .. }));
    }

    #[test]
    fn test_same_edges_is_order_sensitive() {
        let path = Path::new(PathId::new(1), VertexId::new(0), VertexId::new(1), ids(&[1, 2, 3])).unwrap();

        assert!(path.same_edges(&ids(&[1, 2, 3])));
        assert!(!path.same_edges(&ids(&[3, 2, 1])));
        assert!(!path.same_edges(&ids(&[1, 2])));
    }

    #[test]
    fn test_fingerprint_distinguishes_sequences() {
        assert_ne!(
            edge_sequence_fingerprint(&ids(&[1, 2])),
            edge_sequence_fingerprint(&ids(&[2, 1]))
        );
    }
}
