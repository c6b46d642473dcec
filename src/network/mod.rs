//! Road network: vertex and edge arenas with label indexes.
//!
//! Vertices and edges live in arenas addressed by stable ids. Removing an
//! element empties its slot; ids are never reused, so ids held by callers
//! stay unambiguous across reduction passes.

pub mod builder;
pub mod reduce;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{Edge, EdgeAttributes, EdgeId, TlJunction, Vertex, VertexId};

pub use builder::{ConnectionSpec, DistrictSpec, EdgeSpec, LaneSpec, NetworkDescription, PhaseSpec, TlLogicSpec, ZoneAccessSpec};
pub use reduce::{GraphReducer, ReductionStats};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

/// Error type for network construction and lookup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetworkError {
    /// No edge with this label is indexed.
    #[error("Unknown edge: {0}")]
    UnknownEdge(String),
    /// A real edge with this label already exists.
    #[error("Duplicate real edge: {0}")]
    DuplicateEdge(String),
    /// The vertex id does not refer to a live vertex.
    #[error("Unknown vertex: {0}")]
    UnknownVertex(VertexId),
    /// The edge id does not refer to a live edge.
    #[error("Unknown edge id: {0}")]
    UnknownEdgeId(EdgeId),
    /// No signal plan is registered under this junction label.
    #[error("Unknown junction: {0}")]
    UnknownJunction(String),
}

/// Directed road graph.
#[derive(Debug, Clone, Default)]
pub struct Network {
    vertices: Vec<Option<Vertex>>,
    edges: Vec<Option<Edge>>,
    /// Real edges by label.
    real_index: BTreeMap<String, EdgeId>,
    /// All edges (real and connector) by label.
    full_index: BTreeMap<String, EdgeId>,
    origins: Vec<VertexId>,
    destinations: Vec<VertexId>,
    /// Union of origins and destinations.
    zone_vertices: BTreeSet<VertexId>,
    junctions: BTreeMap<String, TlJunction>,
    /// Topology revision; unique across all networks, shared only by clones.
    revision: u64,
}

impl Network {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Construction ────────────────────────────────────────────────────────

    /// Append a fresh vertex; its id is its insertion index.
    pub fn new_vertex(&mut self) -> VertexId {
        let id = VertexId::new(self.vertices.len() as u32);
        self.vertices.push(Some(Vertex::new(id)));
        self.touch();
        id
    }

    /// Append a fresh vertex carrying a label.
    pub fn new_labelled_vertex(&mut self, label: impl Into<String>) -> VertexId {
        let id = self.new_vertex();
        if let Some(Some(v)) = self.vertices.get_mut(id.index()) {
            v.label = Some(label.into());
        }
        id
    }

    /// Set or replace the label of a vertex.
    pub fn set_vertex_label(&mut self, id: VertexId, label: impl Into<String>) -> Result<(), NetworkError> {
        self.vertex_mut(id)?.label = Some(label.into());
        Ok(())
    }

    /// Register an edge on both endpoints and index it by label.
    ///
    /// Real edges must have a label no other real edge uses. Nothing is
    /// modified when an error is returned.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, NetworkError> {
        if edge.is_real() && self.real_index.contains_key(edge.label()) {
            return Err(NetworkError::DuplicateEdge(edge.label().to_string()));
        }
        self.vertex(edge.source())?;
        self.vertex(edge.target())?;

        let id = EdgeId::new(self.edges.len() as u32);
        self.vertex_mut(edge.source())?.attach_out(id);
        self.vertex_mut(edge.target())?.attach_in(id);

        if edge.is_real() {
            self.real_index.insert(edge.label().to_string(), id);
        }
        self.full_index.insert(edge.label().to_string(), id);
        self.edges.push(Some(edge));
        self.touch();
        Ok(id)
    }

    /// Add a real edge between two fresh vertices.
    pub fn add_isolated_real_edge(&mut self, label: impl Into<String>) -> Result<EdgeId, NetworkError> {
        let label = label.into();
        if self.real_index.contains_key(&label) {
            return Err(NetworkError::DuplicateEdge(label));
        }
        let source = self.new_vertex();
        let target = self.new_vertex();
        self.add_edge(Edge::real(label, source, target))
    }

    /// Derive free-flow time, capacity and curve class of an edge.
    ///
    /// Edges whose endpoints carry the same label lie inside one junction
    /// and get zero free-flow time.
    pub fn init_edge(&mut self, id: EdgeId, max_speed: f64, length: f64, lanes: u32) -> Result<(), NetworkError> {
        let edge = self.edge(id)?;
        let source_label = self.vertex(edge.source())?.label.clone();
        let target_label = self.vertex(edge.target())?.label.clone();
        let intra_junction = source_label.is_some() && source_label == target_label;

        self.edge_attributes_mut(id)?
            .init(max_speed, length, lanes, intra_junction);
        Ok(())
    }

    /// Mutable access to the attributes of an edge (topology stays fixed).
    pub fn edge_attributes_mut(&mut self, id: EdgeId) -> Result<&mut EdgeAttributes, NetworkError> {
        self.edges
            .get_mut(id.index())
            .and_then(|slot| slot.as_mut())
            .map(|e| &mut e.attrs)
            .ok_or(NetworkError::UnknownEdgeId(id))
    }

    /// Overwrite the experienced travel time of an edge.
    pub fn set_current_time(&mut self, id: EdgeId, seconds: f64) -> Result<(), NetworkError> {
        self.edge_attributes_mut(id)?.current_time = seconds;
        Ok(())
    }

    /// Register an origin zone vertex.
    pub fn add_origin(&mut self, vertex: VertexId) -> Result<(), NetworkError> {
        self.vertex(vertex)?;
        self.origins.push(vertex);
        self.zone_vertices.insert(vertex);
        Ok(())
    }

    /// Register a destination zone vertex.
    pub fn add_destination(&mut self, vertex: VertexId) -> Result<(), NetworkError> {
        self.vertex(vertex)?;
        self.destinations.push(vertex);
        self.zone_vertices.insert(vertex);
        Ok(())
    }

    /// Create the origin and destination vertices of a zone and register them.
    ///
    /// Both vertices carry the zone label, so a zone is never its own OD pair.
    pub fn add_zone(&mut self, label: &str) -> (VertexId, VertexId) {
        let origin = self.new_labelled_vertex(label);
        let destination = self.new_labelled_vertex(label);
        self.origins.push(origin);
        self.destinations.push(destination);
        self.zone_vertices.insert(origin);
        self.zone_vertices.insert(destination);
        (origin, destination)
    }

    /// Register a signal plan under its junction label.
    pub fn add_tl_junction(&mut self, junction: TlJunction) {
        self.junctions.insert(junction.label.clone(), junction);
    }

    // ── Lookup ──────────────────────────────────────────────────────────────

    /// Live vertex by id.
    pub fn vertex(&self, id: VertexId) -> Result<&Vertex, NetworkError> {
        self.vertices
            .get(id.index())
            .and_then(|slot| slot.as_ref())
            .ok_or(NetworkError::UnknownVertex(id))
    }

    /// Live edge by id.
    pub fn edge(&self, id: EdgeId) -> Result<&Edge, NetworkError> {
        self.edges
            .get(id.index())
            .and_then(|slot| slot.as_ref())
            .ok_or(NetworkError::UnknownEdgeId(id))
    }

    /// Edge id by label, real or connector.
    pub fn edge_id(&self, label: &str) -> Result<EdgeId, NetworkError> {
        self.full_index
            .get(label)
            .copied()
            .ok_or_else(|| NetworkError::UnknownEdge(label.to_string()))
    }

    /// Real edge id by label.
    pub fn real_edge_id(&self, label: &str) -> Result<EdgeId, NetworkError> {
        self.real_index
            .get(label)
            .copied()
            .ok_or_else(|| NetworkError::UnknownEdge(label.to_string()))
    }

    /// Edge by label, real or connector.
    pub fn edge_by_label(&self, label: &str) -> Result<&Edge, NetworkError> {
        self.edge(self.edge_id(label)?)
    }

    /// Signal plan by junction label.
    pub fn junction(&self, label: &str) -> Result<&TlJunction, NetworkError> {
        self.junctions
            .get(label)
            .ok_or_else(|| NetworkError::UnknownJunction(label.to_string()))
    }

    /// Mutable signal plan by junction label.
    pub fn junction_mut(&mut self, label: &str) -> Result<&mut TlJunction, NetworkError> {
        self.junctions
            .get_mut(label)
            .ok_or_else(|| NetworkError::UnknownJunction(label.to_string()))
    }

    /// Live vertices in id order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter().filter_map(|slot| slot.as_ref())
    }

    /// Live edges in id order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|e| (EdgeId::new(i as u32), e)))
    }

    /// Real edges in insertion order.
    pub fn real_edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges().filter(|(_, e)| e.is_real())
    }

    /// Origin zone vertices, in registration order.
    pub fn origins(&self) -> &[VertexId] {
        &self.origins
    }

    /// Destination zone vertices, in registration order.
    pub fn destinations(&self) -> &[VertexId] {
        &self.destinations
    }

    /// `true` if the vertex is registered as an origin or destination.
    pub fn is_zone_vertex(&self, id: VertexId) -> bool {
        self.zone_vertices.contains(&id)
    }

    /// Current topology revision.
    ///
    /// Changes whenever a vertex or edge is added, re-pointed or removed.
    /// Attribute updates (travel times, labels) leave it unchanged.
    pub fn topology_revision(&self) -> u64 {
        self.revision
    }

    /// Name of a vertex (label or id).
    pub fn vertex_name(&self, id: VertexId) -> String {
        self.vertex(id).map(|v| v.name()).unwrap_or_else(|_| id.to_string())
    }

    /// Number of live vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices().count()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Upper bound on vertex ids, for dense side tables.
    pub fn vertex_capacity(&self) -> usize {
        self.vertices.len()
    }

    /// Total number of adjacency entries over all live vertices.
    ///
    /// Equals twice the edge count for a consistent network.
    pub fn adjacency_registrations(&self) -> usize {
        self.vertices()
            .map(|v| v.in_edges().len() + v.out_edges().len())
            .sum()
    }

    // ── Topology surgery (reduction passes) ─────────────────────────────────

    fn touch(&mut self) {
        self.revision = NEXT_REVISION.fetch_add(1, Ordering::Relaxed);
    }

    fn vertex_mut(&mut self, id: VertexId) -> Result<&mut Vertex, NetworkError> {
        self.vertices
            .get_mut(id.index())
            .and_then(|slot| slot.as_mut())
            .ok_or(NetworkError::UnknownVertex(id))
    }

    fn edge_mut(&mut self, id: EdgeId) -> Result<&mut Edge, NetworkError> {
        self.edges
            .get_mut(id.index())
            .and_then(|slot| slot.as_mut())
            .ok_or(NetworkError::UnknownEdgeId(id))
    }

    /// Re-point an edge to leave from `source`.
    pub(crate) fn move_source(&mut self, id: EdgeId, source: VertexId) -> Result<(), NetworkError> {
        let old = self.edge(id)?.source();
        self.vertex(source)?;
        self.vertex_mut(old)?.detach_out(id);
        self.edge_mut(id)?.set_source(source);
        self.vertex_mut(source)?.attach_out(id);
        self.touch();
        Ok(())
    }

    /// Re-point an edge to arrive at `target`.
    pub(crate) fn move_target(&mut self, id: EdgeId, target: VertexId) -> Result<(), NetworkError> {
        let old = self.edge(id)?.target();
        self.vertex(target)?;
        self.vertex_mut(old)?.detach_in(id);
        self.edge_mut(id)?.set_target(target);
        self.vertex_mut(target)?.attach_in(id);
        self.touch();
        Ok(())
    }

    /// Detach an edge from its endpoints and drop it from the indexes.
    pub(crate) fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, NetworkError> {
        let edge = self
            .edges
            .get_mut(id.index())
            .and_then(|slot| slot.take())
            .ok_or(NetworkError::UnknownEdgeId(id))?;

        if let Ok(v) = self.vertex_mut(edge.source()) {
            v.detach_out(id);
        }
        if let Ok(v) = self.vertex_mut(edge.target()) {
            v.detach_in(id);
        }
        if self.full_index.get(edge.label()) == Some(&id) {
            self.full_index.remove(edge.label());
        }
        if self.real_index.get(edge.label()) == Some(&id) {
            self.real_index.remove(edge.label());
        }
        self.touch();
        Ok(edge)
    }

    /// Drop a vertex whose adjacency has already been emptied.
    pub(crate) fn remove_vertex(&mut self, id: VertexId) -> Result<Vertex, NetworkError> {
        let vertex = self.vertex_mut(id)?;
        debug_assert!(
            vertex.in_edges().is_empty() && vertex.out_edges().is_empty(),
            "vertex {id} removed while edges still attached"
        );
        let _ = vertex.take_in_edges();
        let _ = vertex.take_out_edges();
        let removed = self
            .vertices
            .get_mut(id.index())
            .and_then(|slot| slot.take())
            .ok_or(NetworkError::UnknownVertex(id))?;
        self.touch();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeKind;

    #[test]
    fn test_vertex_ids_are_insertion_indexes() {
        let mut net = Network::new();
        assert_eq!(net.new_vertex(), VertexId::new(0));
        assert_eq!(net.new_vertex(), VertexId::new(1));
        assert_eq!(net.vertex_count(), 2);
    }

    #[test]
    fn test_add_edge_registers_both_endpoints() {
        let mut net = Network::new();
        let a = net.new_vertex();
        let b = net.new_vertex();
        let e = net.add_edge(Edge::real("ab", a, b)).unwrap();

        assert_eq!(net.vertex(a).unwrap().out_edges(), &[e]);
        assert_eq!(net.vertex(b).unwrap().in_edges(), &[e]);
        assert_eq!(net.adjacency_registrations(), 2);
    }

    #[test]
    fn test_duplicate_real_edge_rejected_without_side_effects() {
        let mut net = Network::new();
        net.add_isolated_real_edge("e1").unwrap();
        let before = net.vertex_count();

        let err = net.add_isolated_real_edge("e1").unwrap_err();
        assert_eq!(err, NetworkError::DuplicateEdge("e1".to_string()));
        assert_eq!(net.vertex_count(), before);
        assert_eq!(net.edge_count(), 1);
    }

    #[test]
    fn test_connector_only_in_full_index() {
        let mut net = Network::new();
        let a = net.new_vertex();
        let b = net.new_vertex();
        net.add_edge(Edge::connector("c1", a, b)).unwrap();

        assert!(net.edge_id("c1").is_ok());
        assert_eq!(
            net.real_edge_id("c1").unwrap_err(),
            NetworkError::UnknownEdge("c1".to_string())
        );
        assert_eq!(net.edge_by_label("c1").unwrap().kind(), EdgeKind::Connector);
    }

    #[test]
    fn test_unknown_edge_lookup() {
        let net = Network::new();
        assert!(matches!(net.edge_by_label("nope"), Err(NetworkError::UnknownEdge(_))));
    }

    #[test]
    fn test_edge_to_unknown_vertex_rejected() {
        let mut net = Network::new();
        let a = net.new_vertex();
        let err = net.add_edge(Edge::real("x", a, VertexId::new(9))).unwrap_err();
        assert_eq!(err, NetworkError::UnknownVertex(VertexId::new(9)));
        assert!(net.vertex(a).unwrap().out_edges().is_empty());
    }

    #[test]
    fn test_init_edge_intra_junction() {
        let mut net = Network::new();
        let a = net.new_labelled_vertex("J1");
        let b = net.new_labelled_vertex("J1");
        let c = net.new_labelled_vertex("J2");
        let inner = net.add_edge(Edge::real("inner", a, b)).unwrap();
        let outer = net.add_edge(Edge::real("outer", b, c)).unwrap();

        net.init_edge(inner, 10.0, 30.0, 1).unwrap();
        net.init_edge(outer, 10.0, 30.0, 1).unwrap();

        assert_eq!(net.edge(inner).unwrap().attrs.free_flow_time, 0.0);
        assert!((net.edge(outer).unwrap().attrs.free_flow_time - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_move_and_remove_keep_adjacency_consistent() {
        let mut net = Network::new();
        let a = net.new_vertex();
        let b = net.new_vertex();
        let c = net.new_vertex();
        let ab = net.add_edge(Edge::connector("ab", a, b)).unwrap();
        let bc = net.add_edge(Edge::real("bc", b, c)).unwrap();

        net.move_source(bc, a).unwrap();
        net.remove_edge(ab).unwrap();
        net.remove_vertex(b).unwrap();

        assert_eq!(net.edge(bc).unwrap().source(), a);
        assert_eq!(net.vertex(a).unwrap().out_edges(), &[bc]);
        assert_eq!(net.adjacency_registrations(), 2 * net.edge_count());
        assert!(net.edge_id("ab").is_err());
    }

    #[test]
    fn test_junction_lookup() {
        let mut net = Network::new();
        net.add_tl_junction(TlJunction::new("J7"));
        assert!(net.junction("J7").is_ok());
        assert_eq!(
            net.junction("J8").unwrap_err(),
            NetworkError::UnknownJunction("J8".to_string())
        );
    }

    #[test]
    fn test_junction_mut_updates_phase() {
        let mut net = Network::new();
        let mut plan = TlJunction::new("J7");
        plan.push_phase(31.0, "GGrr", "rrGG", "0000");
        plan.push_phase(4.0, "yyrr", "rrGG", "1100");
        net.add_tl_junction(plan);

        assert!(net.junction_mut("J7").unwrap().update_phase(2, 6.0, "Gyrr", "GGrr", "0011"));

        let phase = &net.junction("J7").unwrap().phases[1];
        assert_eq!(phase.duration, 6.0);
        assert_eq!(phase.green, "rryG");
        assert_eq!(phase.brake, "rrGG");
        assert_eq!(phase.yellow, "1100");
        assert_eq!(net.junction("J7").unwrap().cycle_time(), 37.0);
        assert!(net.junction_mut("J8").is_err());
    }

    #[test]
    fn test_topology_revision_tracks_structure_only() {
        let mut net = Network::new();
        let a = net.new_vertex();
        let b = net.new_vertex();
        let r0 = net.topology_revision();

        let ab = net.add_edge(Edge::real("ab", a, b)).unwrap();
        let r1 = net.topology_revision();
        assert_ne!(r0, r1);

        net.set_current_time(ab, 12.0).unwrap();
        assert_eq!(net.topology_revision(), r1);

        let copy = net.clone();
        assert_eq!(copy.topology_revision(), r1);

        net.move_target(ab, a).unwrap();
        assert_ne!(net.topology_revision(), r1);
        assert_ne!(net.topology_revision(), copy.topology_revision());
    }

    #[test]
    fn test_zone_vertices() {
        let mut net = Network::new();
        let plain = net.new_vertex();
        let (origin, destination) = net.add_zone("z1");
        let extra = net.new_vertex();
        net.add_destination(extra).unwrap();

        assert!(net.is_zone_vertex(origin));
        assert!(net.is_zone_vertex(destination));
        assert!(net.is_zone_vertex(extra));
        assert!(!net.is_zone_vertex(plain));
    }
}
