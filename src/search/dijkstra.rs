//! Built-in Dijkstra over current travel times.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

use super::{SearchBackend, SearchError, SearchTree};
use crate::network::Network;
use crate::types::VertexId;

/// Heap entry ordered so that the cheapest (then lowest id) vertex pops first.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    vertex: VertexId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Label-setting Dijkstra with early termination.
///
/// Ties between equal-cost vertices settle by vertex id, and an edge only
/// replaces a predecessor when it is strictly cheaper, so repeated searches
/// over an unchanged network return the same tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainDijkstra;

impl PlainDijkstra {
    /// Create the backend.
    pub fn new() -> Self {
        Self
    }
}

impl SearchBackend for PlainDijkstra {
    fn name(&self) -> &'static str {
        "plain-dijkstra"
    }

    fn search(
        &self,
        network: &Network,
        source: VertexId,
        targets: &BTreeSet<VertexId>,
    ) -> Result<SearchTree, SearchError> {
        network.vertex(source)?;
        let capacity = network.vertex_capacity();
        let mut tree = SearchTree::new(source, capacity);
        let mut settled = vec![false; capacity];
        let mut remaining: BTreeSet<VertexId> = targets.clone();
        let mut heap = BinaryHeap::new();
        heap.push(Frontier { cost: 0.0, vertex: source });

        while let Some(Frontier { cost, vertex }) = heap.pop() {
            if settled[vertex.index()] {
                continue;
            }
            settled[vertex.index()] = true;

            remaining.remove(&vertex);
            if !targets.is_empty() && remaining.is_empty() {
                break;
            }

            for &edge_id in network.vertex(vertex)?.out_edges() {
                let edge = network.edge(edge_id)?;
                let next = edge.target();
                if settled[next.index()] {
                    continue;
                }
                let candidate = cost + edge.attrs.current_time;
                let improves = tree.distance(next).map_or(true, |known| candidate < known);
                if improves {
                    tree.set_distance(next, candidate);
                    tree.set_predecessor(next, edge_id);
                    heap.push(Frontier { cost: candidate, vertex: next });
                }
            }
        }

        tracing::trace!(
            source = %source,
            settled = settled.iter().filter(|s| **s).count(),
            "dijkstra finished"
        );
        Ok(tree)
    }
}
