//! Shortest-path search over the road network.
//!
//! Two interchangeable backends answer the same question: given a source
//! vertex and the destinations a caller needs, produce distances and a
//! predecessor edge per reached vertex. The backend is chosen once, when the
//! engine is built, and never swapped per call.
//!
//! ```text
//! SearchMode ─→ ShortestPathEngine ─→ SearchBackend (plain | accelerated)
//!                      │
//!                      └─→ k-path label propagation
//! ```

pub mod dijkstra;
pub mod kpaths;
#[cfg(feature = "accelerated")]
pub mod accelerated;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::network::{Network, NetworkError};
use crate::types::{EdgeId, VertexId};

pub use dijkstra::PlainDijkstra;
pub use kpaths::{LabelId, LabelPath, LabelTable, Predecessor};
#[cfg(feature = "accelerated")]
pub use accelerated::PetgraphSearch;

/// Error type for search operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    /// The requested backend cannot be provided by this build.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The destination was not reached from the source.
    #[error("No path from {source_vertex} to {target_vertex}")]
    Unreachable {
        /// Search origin.
        source_vertex: VertexId,
        /// Requested destination.
        target_vertex: VertexId,
    },
    /// The predecessor chain does not lead back to the source.
    #[error("Broken predecessor chain at {0}")]
    BrokenChain(VertexId),
    /// Network lookup failed.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

/// Which search backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Built-in Dijkstra.
    #[default]
    Plain,
    /// Delegate to the external graph-algorithm backend.
    Accelerated,
}

/// Result of a single-source search: distances and predecessor edges.
///
/// Both tables are dense and indexed by vertex id.
#[derive(Debug, Clone)]
pub struct SearchTree {
    source: VertexId,
    distances: Vec<Option<f64>>,
    predecessors: Vec<Option<EdgeId>>,
}

impl SearchTree {
    /// Create a tree holding only the source at distance zero.
    pub fn new(source: VertexId, capacity: usize) -> Self {
        let capacity = capacity.max(source.index() + 1);
        let mut tree = Self {
            source,
            distances: vec![None; capacity],
            predecessors: vec![None; capacity],
        };
        tree.distances[source.index()] = Some(0.0);
        tree
    }

    /// Search origin.
    pub fn source(&self) -> VertexId {
        self.source
    }

    /// Distance of a reached vertex.
    pub fn distance(&self, vertex: VertexId) -> Option<f64> {
        self.distances.get(vertex.index()).copied().flatten()
    }

    /// Edge through which a reached vertex was entered.
    pub fn predecessor(&self, vertex: VertexId) -> Option<EdgeId> {
        self.predecessors.get(vertex.index()).copied().flatten()
    }

    /// All reached vertices with their distance, ordered by vertex id.
    pub fn distances(&self) -> BTreeMap<VertexId, f64> {
        self.distances
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.map(|d| (VertexId::new(i as u32), d)))
            .collect()
    }

    /// All predecessor edges, ordered by vertex id.
    pub fn predecessors(&self) -> BTreeMap<VertexId, EdgeId> {
        self.predecessors
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (VertexId::new(i as u32), p)))
            .collect()
    }

    pub(crate) fn set_distance(&mut self, vertex: VertexId, distance: f64) {
        if let Some(slot) = self.distances.get_mut(vertex.index()) {
            *slot = Some(distance);
        }
    }

    pub(crate) fn set_predecessor(&mut self, vertex: VertexId, edge: EdgeId) {
        if let Some(slot) = self.predecessors.get_mut(vertex.index()) {
            *slot = Some(edge);
        }
    }

    /// Real edges from the source to `target`, in travel order.
    ///
    /// Connector edges on the way are dropped.
    pub fn real_path_to(&self, network: &Network, target: VertexId) -> Result<Vec<EdgeId>, SearchError> {
        if self.distance(target).is_none() {
            return Err(SearchError::Unreachable {
                source_vertex: self.source,
                target_vertex: target,
            });
        }

        let mut edges = Vec::new();
        let mut vertex = target;
        let mut steps = 0usize;
        while vertex != self.source {
            let edge_id = self.predecessor(vertex).ok_or(SearchError::BrokenChain(vertex))?;
            let edge = network.edge(edge_id)?;
            if edge.is_real() {
                edges.push(edge_id);
            }
            vertex = edge.source();
            steps += 1;
            if steps > self.distances.len() {
                return Err(SearchError::BrokenChain(vertex));
            }
        }
        edges.reverse();
        Ok(edges)
    }
}

/// A single-source shortest-path strategy.
///
/// Edge weights are the current travel times. An empty `targets` set asks
/// for the complete search tree.
pub trait SearchBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Search from `source` until every vertex in `targets` is settled.
    fn search(
        &self,
        network: &Network,
        source: VertexId,
        targets: &BTreeSet<VertexId>,
    ) -> Result<SearchTree, SearchError>;
}

/// Build the backend for a search mode.
///
/// The accelerated backend exists only when the crate is compiled with the
/// `accelerated` feature; asking for it otherwise is a configuration error.
pub fn backend_for(mode: SearchMode) -> Result<Box<dyn SearchBackend>, SearchError> {
    match mode {
        SearchMode::Plain => Ok(Box::new(PlainDijkstra::new())),
        #[cfg(feature = "accelerated")]
        SearchMode::Accelerated => Ok(Box::new(PetgraphSearch::new())),
        #[cfg(not(feature = "accelerated"))]
        SearchMode::Accelerated => Err(SearchError::Configuration(
            "accelerated search requested but the `accelerated` feature is not compiled in".to_string(),
        )),
    }
}

/// Shortest-path and k-path search over a network.
pub struct ShortestPathEngine {
    backend: Box<dyn SearchBackend>,
}

impl ShortestPathEngine {
    /// Create an engine around a backend.
    pub fn new(backend: Box<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Create an engine for a configured search mode.
    pub fn from_mode(mode: SearchMode) -> Result<Self, SearchError> {
        let backend = backend_for(mode)?;
        tracing::debug!(backend = backend.name(), "search backend selected");
        Ok(Self::new(backend))
    }

    /// Engine using the built-in Dijkstra.
    pub fn plain() -> Self {
        Self::new(Box::new(PlainDijkstra::new()))
    }

    /// Name of the active backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Single-source search towards a set of destinations.
    pub fn search(
        &self,
        network: &Network,
        source: VertexId,
        targets: &BTreeSet<VertexId>,
    ) -> Result<SearchTree, SearchError> {
        self.backend.search(network, source, targets)
    }

    /// Propagate up to `k` cheapest predecessor labels from `origin`.
    pub fn k_path_labels(&self, network: &Network, origin: VertexId, k: usize) -> Result<LabelTable, SearchError> {
        kpaths::propagate(network, origin, k)
    }
}

impl std::fmt::Debug for ShortestPathEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortestPathEngine")
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_starts_with_source_only() {
        let tree = SearchTree::new(VertexId::new(2), 4);
        assert_eq!(tree.distance(VertexId::new(2)), Some(0.0));
        assert_eq!(tree.distance(VertexId::new(0)), None);
        assert!(tree.predecessors().is_empty());
    }

    #[test]
    fn test_unreachable_target() {
        let mut net = Network::new();
        let a = net.new_vertex();
        let b = net.new_vertex();
        let tree = SearchTree::new(a, net.vertex_capacity());

        assert_eq!(
            tree.real_path_to(&net, b).unwrap_err(),
            SearchError::Unreachable { source_vertex: a, target_vertex: b }
        );
    }

    #[cfg(not(feature = "accelerated"))]
    #[test]
    fn test_accelerated_unavailable_is_configuration_error() {
        let err = ShortestPathEngine::from_mode(SearchMode::Accelerated).unwrap_err();
        assert!(matches!(err, SearchError::Configuration(_)));
    }

    #[test]
    fn test_plain_mode_builds() {
        let engine = ShortestPathEngine::from_mode(SearchMode::Plain).unwrap();
        assert_eq!(engine.backend_name(), "plain-dijkstra");
    }
}
