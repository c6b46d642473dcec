//! K-best predecessor label propagation.
//!
//! Every vertex keeps up to `k` labels, sorted by cost. A label records the
//! edge it arrived through and the label it extends at the upstream vertex,
//! so walking parents from any label rebuilds one complete route back to the
//! origin. Labels live in an append-only arena owned by the table; nothing
//! is stored on the network itself.
//!
//! ```text
//! origin ──e1──→ u ──e2──→ v
//!   [L0]        [L1:e1←L0] [L2:e2←L1, L5:e7←L4, ...]  (≤ k per vertex)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use super::SearchError;
use crate::network::Network;
use crate::types::{EdgeId, VertexId};

/// Index of a label in a [`LabelTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabelId(u32);

impl LabelId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// One way of arriving at a vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Predecessor {
    /// Edge used to arrive; `None` only for the origin's root label.
    pub edge: Option<EdgeId>,
    /// Label at the upstream vertex this label extends.
    pub parent: Option<LabelId>,
    /// Cumulative current travel time from the origin.
    pub cost: f64,
}

/// A route rebuilt from a label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPath {
    /// Real edges in travel order.
    pub edges: Vec<EdgeId>,
    /// Sum of the free-flow times of `edges`.
    pub free_flow_cost: f64,
    /// Label cost (current travel time, connectors included).
    pub cost: f64,
}

/// Labels produced by one propagation from an origin.
#[derive(Debug, Clone)]
pub struct LabelTable {
    origin: VertexId,
    k: usize,
    labels: Vec<Predecessor>,
    per_vertex: Vec<Vec<LabelId>>,
}

enum Slot {
    Kept(LabelId),
    Fresh(LabelId),
}

impl LabelTable {
    fn new(origin: VertexId, k: usize, capacity: usize) -> Self {
        let capacity = capacity.max(origin.index() + 1);
        let mut table = Self {
            origin,
            k,
            labels: Vec::new(),
            per_vertex: vec![Vec::new(); capacity],
        };
        let root = table.push(Predecessor {
            edge: None,
            parent: None,
            cost: 0.0,
        });
        table.per_vertex[origin.index()].push(root);
        table
    }

    fn push(&mut self, label: Predecessor) -> LabelId {
        let id = LabelId(self.labels.len() as u32);
        self.labels.push(label);
        id
    }

    /// Propagation origin.
    pub fn origin(&self) -> VertexId {
        self.origin
    }

    /// Maximum labels kept per vertex.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Labels at a vertex, cheapest first.
    pub fn labels_at(&self, vertex: VertexId) -> &[LabelId] {
        self.per_vertex
            .get(vertex.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Label contents.
    pub fn label(&self, id: LabelId) -> Option<&Predecessor> {
        self.labels.get(id.index())
    }

    /// Offer the labels of `from`, extended by `edge`, to `to`.
    ///
    /// Returns `true` when the label list at `to` changed.
    fn relax(&mut self, from: VertexId, edge: EdgeId, to: VertexId, weight: f64) -> bool {
        let existing = &self.per_vertex[to.index()];
        let mut merged: Vec<(f64, Slot)> = existing
            .iter()
            .map(|&id| (self.labels[id.index()].cost, Slot::Kept(id)))
            .collect();

        for &parent in &self.per_vertex[from.index()] {
            let present = existing.iter().any(|&id| {
                let label = &self.labels[id.index()];
                label.edge == Some(edge) && label.parent == Some(parent)
            });
            if !present {
                merged.push((self.labels[parent.index()].cost + weight, Slot::Fresh(parent)));
            }
        }

        // Stable: on equal cost, labels already held stay ahead of new ones.
        merged.sort_by(|a, b| a.0.total_cmp(&b.0));
        merged.truncate(self.k);

        if !merged.iter().any(|(_, slot)| matches!(slot, Slot::Fresh(_))) {
            return false;
        }

        let mut next = Vec::with_capacity(merged.len());
        for (cost, slot) in merged {
            let id = match slot {
                Slot::Kept(id) => id,
                Slot::Fresh(parent) => self.push(Predecessor {
                    edge: Some(edge),
                    parent: Some(parent),
                    cost,
                }),
            };
            next.push(id);
        }
        self.per_vertex[to.index()] = next;
        true
    }

    /// Rebuild the route ending in `label`.
    pub fn path(&self, network: &Network, label: LabelId) -> Result<LabelPath, SearchError> {
        let cost = self
            .label(label)
            .map(|l| l.cost)
            .ok_or(SearchError::BrokenChain(self.origin))?;

        let mut edges = Vec::new();
        let mut free_flow_cost = 0.0;
        let mut cursor = Some(label);
        let mut steps = 0usize;
        while let Some(id) = cursor {
            let entry = self.label(id).ok_or(SearchError::BrokenChain(self.origin))?;
            if let Some(edge_id) = entry.edge {
                let edge = network.edge(edge_id)?;
                if edge.is_real() {
                    edges.push(edge_id);
                    free_flow_cost += edge.attrs.free_flow_time;
                }
            }
            cursor = entry.parent;
            steps += 1;
            if steps > self.labels.len() {
                return Err(SearchError::BrokenChain(self.origin));
            }
        }
        edges.reverse();
        Ok(LabelPath {
            edges,
            free_flow_cost,
            cost,
        })
    }

    /// All routes held at `vertex`, cheapest first.
    pub fn paths_to(&self, network: &Network, vertex: VertexId) -> Result<Vec<LabelPath>, SearchError> {
        self.labels_at(vertex)
            .iter()
            .map(|&id| self.path(network, id))
            .collect()
    }
}

/// Propagate up to `k` labels per vertex from `origin` until no list changes.
///
/// Edges leading back into the origin are never relaxed. A vertex is queued
/// at most once at a time; it is re-queued whenever its list changes after
/// being processed.
pub fn propagate(network: &Network, origin: VertexId, k: usize) -> Result<LabelTable, SearchError> {
    network.vertex(origin)?;
    let capacity = network.vertex_capacity();
    let mut table = LabelTable::new(origin, k.max(1), capacity);
    let mut pending = vec![false; table.per_vertex.len()];
    let mut queue = VecDeque::from([origin]);
    pending[origin.index()] = true;
    let mut relaxations = 0usize;

    while let Some(vertex) = queue.pop_front() {
        pending[vertex.index()] = false;
        for &edge_id in network.vertex(vertex)?.out_edges() {
            let edge = network.edge(edge_id)?;
            let next = edge.target();
            if next == origin {
                continue;
            }
            relaxations += 1;
            if table.relax(vertex, edge_id, next, edge.attrs.current_time) && !pending[next.index()] {
                pending[next.index()] = true;
                queue.push_back(next);
            }
        }
    }

    tracing::trace!(
        origin = %origin,
        k = table.k,
        labels = table.labels.len(),
        relaxations,
        "k-path propagation finished"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Edge;

    /// o ─a(1)→ x ─b(1)→ d
    /// o ─c(2)→ y ─e(2)→ d
    /// x ─f(5)→ y
    fn two_routes() -> (Network, VertexId, VertexId) {
        let mut net = Network::new();
        let o = net.new_vertex();
        let x = net.new_vertex();
        let y = net.new_vertex();
        let d = net.new_vertex();
        for (label, s, t, time) in [
            ("a", o, x, 1.0),
            ("b", x, d, 1.0),
            ("c", o, y, 2.0),
            ("e", y, d, 2.0),
            ("f", x, y, 5.0),
        ] {
            let id = net.add_edge(Edge::real(label, s, t)).unwrap();
            net.set_current_time(id, time).unwrap();
            net.edge_attributes_mut(id).unwrap().free_flow_time = time;
        }
        (net, o, d)
    }

    fn labels(net: &Network, path: &LabelPath) -> Vec<String> {
        path.edges
            .iter()
            .map(|e| net.edge(*e).unwrap().label().to_string())
            .collect()
    }

    #[test]
    fn test_k1_keeps_only_cheapest() {
        let (net, o, d) = two_routes();
        let table = propagate(&net, o, 1).unwrap();
        let paths = table.paths_to(&net, d).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(labels(&net, &paths[0]), vec!["a", "b"]);
        assert_eq!(paths[0].cost, 2.0);
    }

    #[test]
    fn test_k_labels_sorted_best_first() {
        let (net, o, d) = two_routes();
        let table = propagate(&net, o, 3).unwrap();
        let paths = table.paths_to(&net, d).unwrap();
        let costs: Vec<f64> = paths.iter().map(|p| p.cost).collect();
        assert_eq!(costs, vec![2.0, 4.0, 8.0]);
        assert_eq!(labels(&net, &paths[2]), vec!["a", "f", "e"]);
        assert_eq!(paths[2].free_flow_cost, 8.0);
    }

    #[test]
    fn test_no_duplicate_edge_parent_pairs() {
        let (net, o, _) = two_routes();
        let table = propagate(&net, o, 4).unwrap();
        for vertex in net.vertices() {
            let held = table.labels_at(vertex.id);
            assert!(held.len() <= 4);
            for (i, a) in held.iter().enumerate() {
                for b in &held[i + 1..] {
                    let (la, lb) = (table.label(*a).unwrap(), table.label(*b).unwrap());
                    assert!(!(la.edge == lb.edge && la.parent == lb.parent));
                }
            }
        }
    }

    #[test]
    fn test_edges_into_origin_ignored() {
        let (mut net, o, d) = two_routes();
        net.add_edge(Edge::real("back", d, o)).unwrap();
        let table = propagate(&net, o, 2).unwrap();
        assert_eq!(table.labels_at(o).len(), 1);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut net = Network::new();
        let o = net.new_vertex();
        let u = net.new_vertex();
        let v = net.new_vertex();
        net.add_edge(Edge::real("ou", o, u)).unwrap();
        net.add_edge(Edge::real("uv", u, v)).unwrap();
        net.add_edge(Edge::real("vu", v, u)).unwrap();

        // All weights are zero; ties must not keep re-queueing.
        let table = propagate(&net, o, 3).unwrap();
        assert_eq!(table.labels_at(u).len(), 3);
        assert_eq!(table.labels_at(v).len(), 3);
    }
}
