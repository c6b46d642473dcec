//! Vertex types for the road graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::edge::EdgeId;

/// Stable identifier of a vertex: its insertion index in the network arena.
///
/// Implements `Ord` so vertex-keyed maps iterate deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(u32);

impl VertexId {
    /// Create a vertex id from an arena index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Arena index of this vertex.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A vertex of the road graph.
///
/// Adjacency lists keep insertion order and never hold the same edge twice,
/// so they behave as ordered sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    /// Arena identity.
    pub id: VertexId,
    /// Zone or junction label, when the construction layer knows one.
    pub label: Option<String>,
    in_edges: Vec<EdgeId>,
    out_edges: Vec<EdgeId>,
}

impl Vertex {
    /// Create an unlabelled vertex with empty adjacency.
    pub fn new(id: VertexId) -> Self {
        Self {
            id,
            label: None,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
        }
    }

    /// Name used when printing and when comparing OD endpoints.
    ///
    /// Falls back to the numeric id for unlabelled vertices.
    pub fn name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.id.to_string(),
        }
    }

    /// Incoming edges in registration order.
    pub fn in_edges(&self) -> &[EdgeId] {
        &self.in_edges
    }

    /// Outgoing edges in registration order.
    pub fn out_edges(&self) -> &[EdgeId] {
        &self.out_edges
    }

    pub(crate) fn attach_in(&mut self, edge: EdgeId) {
        if !self.in_edges.contains(&edge) {
            self.in_edges.push(edge);
        }
    }

    pub(crate) fn attach_out(&mut self, edge: EdgeId) {
        if !self.out_edges.contains(&edge) {
            self.out_edges.push(edge);
        }
    }

    pub(crate) fn detach_in(&mut self, edge: EdgeId) {
        self.in_edges.retain(|e| *e != edge);
    }

    pub(crate) fn detach_out(&mut self, edge: EdgeId) {
        self.out_edges.retain(|e| *e != edge);
    }

    pub(crate) fn take_in_edges(&mut self) -> Vec<EdgeId> {
        std::mem::take(&mut self.in_edges)
    }

    pub(crate) fn take_out_edges(&mut self) -> Vec<EdgeId> {
        std::mem::take(&mut self.out_edges)
    }
}
