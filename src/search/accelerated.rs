//! Search backend delegating to petgraph's Dijkstra.
//!
//! The petgraph topology is built once per network topology revision and
//! reused by every search until the network is restructured. Edge weights
//! are read from the network on each call, so travel-time updates between
//! rounds need no rebuild.
//!
//! petgraph returns distances only. Predecessors are recovered afterwards by
//! a breadth-first walk over tight edges (`dist[u] + w == dist[v]`), visiting
//! out-edges in insertion order; every vertex is entered once, so the result
//! is always a tree rooted at the source.

use std::collections::{BTreeSet, VecDeque};

use parking_lot::RwLock;
use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};

use super::{SearchBackend, SearchError, SearchTree};
use crate::network::Network;
use crate::types::{EdgeId, VertexId};

type Topology = DiGraph<VertexId, EdgeId>;

#[derive(Debug)]
struct CachedTopology {
    revision: u64,
    graph: Topology,
}

/// petgraph-backed shortest paths.
///
/// Node indexes equal vertex ids, which keeps the side table from vertices
/// to backend handles trivial.
#[derive(Debug, Default)]
pub struct PetgraphSearch {
    cache: RwLock<Option<CachedTopology>>,
}

impl PetgraphSearch {
    /// Create the backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the topology of `network`, building it on a revision miss.
    fn with_topology<R>(&self, network: &Network, f: impl FnOnce(&Topology) -> R) -> R {
        let revision = network.topology_revision();
        {
            let cached = self.cache.read();
            if let Some(hit) = cached.as_ref().filter(|c| c.revision == revision) {
                return f(&hit.graph);
            }
        }

        let graph = Self::build_graph(network);
        tracing::debug!(
            revision,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "petgraph topology built"
        );
        let result = f(&graph);
        *self.cache.write() = Some(CachedTopology { revision, graph });
        result
    }

    fn build_graph(network: &Network) -> Topology {
        let capacity = network.vertex_capacity();
        let mut graph = DiGraph::with_capacity(capacity, network.edge_count());
        for i in 0..capacity {
            graph.add_node(VertexId::new(i as u32));
        }
        for (id, edge) in network.edges() {
            graph.add_edge(
                NodeIndex::new(edge.source().index()),
                NodeIndex::new(edge.target().index()),
                id,
            );
        }
        graph
    }
}

impl SearchBackend for PetgraphSearch {
    fn name(&self) -> &'static str {
        "petgraph-dijkstra"
    }

    fn search(
        &self,
        network: &Network,
        source: VertexId,
        targets: &BTreeSet<VertexId>,
    ) -> Result<SearchTree, SearchError> {
        network.vertex(source)?;
        let goal = match targets.len() {
            1 => targets.iter().next().map(|t| NodeIndex::new(t.index())),
            _ => None,
        };

        let mut tree = SearchTree::new(source, network.vertex_capacity());
        let reached = self.with_topology(network, |graph| {
            let scores = dijkstra(graph, NodeIndex::new(source.index()), goal, |e| {
                network
                    .edge(*e.weight())
                    .map(|edge| edge.attrs.current_time)
                    .unwrap_or(f64::INFINITY)
            });
            for (node, distance) in &scores {
                tree.set_distance(graph[*node], *distance);
            }
            scores.len()
        });

        let mut entered = vec![false; network.vertex_capacity()];
        entered[source.index()] = true;
        let mut queue = VecDeque::from([source]);
        while let Some(vertex) = queue.pop_front() {
            let Some(base) = tree.distance(vertex) else { continue };
            for &edge_id in network.vertex(vertex)?.out_edges() {
                let edge = network.edge(edge_id)?;
                let next = edge.target();
                if entered[next.index()] {
                    continue;
                }
                if tree.distance(next) == Some(base + edge.attrs.current_time) {
                    entered[next.index()] = true;
                    tree.set_predecessor(next, edge_id);
                    queue.push_back(next);
                }
            }
        }

        tracing::trace!(source = %source, reached, "petgraph search finished");
        Ok(tree)
    }
}
