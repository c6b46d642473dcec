//! Topology contraction passes.
//!
//! Imported networks describe every junction with a bundle of connector
//! edges between the end vertex of each incoming road and the start vertex
//! of each outgoing road. Both passes shrink that bundle while keeping every
//! road edge reachable from every road edge it could reach before.
//!
//! Adjacency lists are copied before they are walked, and removed vertices
//! leave empty arena slots, so no pass mutates a list it is iterating.

use std::collections::BTreeSet;

use super::{Network, NetworkError};
use crate::types::{EdgeId, VertexId};

/// What a reduction pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReductionStats {
    /// Vertices removed.
    pub removed_vertices: usize,
    /// Edges removed.
    pub removed_edges: usize,
    /// Junction clusters collapsed into a single vertex.
    pub merged_clusters: usize,
}

impl ReductionStats {
    fn absorb(&mut self, other: ReductionStats) {
        self.removed_vertices += other.removed_vertices;
        self.removed_edges += other.removed_edges;
        self.merged_clusters += other.merged_clusters;
    }
}

/// Connector-only neighbourhood grown around the end of a road edge.
#[derive(Debug, Default)]
struct Cluster {
    sources: Vec<VertexId>,
    targets: Vec<VertexId>,
}

/// Graph simplification, run once after construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphReducer;

impl GraphReducer {
    /// Create a reducer.
    pub fn new() -> Self {
        Self
    }

    /// Run [`link_reduce`](Self::link_reduce) then [`reduce`](Self::reduce).
    pub fn run(&self, network: &mut Network) -> Result<ReductionStats, NetworkError> {
        let mut stats = self.link_reduce(network)?;
        stats.absorb(self.reduce(network)?);
        tracing::info!(
            removed_vertices = stats.removed_vertices,
            removed_edges = stats.removed_edges,
            merged_clusters = stats.merged_clusters,
            vertices = network.vertex_count(),
            edges = network.edge_count(),
            "network reduced"
        );
        Ok(stats)
    }

    /// Splice out connectors on degree-one chains.
    ///
    /// For a vertex with a single incoming edge, each outgoing connector
    /// whose target has a single incoming edge is removed together with that
    /// target; the target's outgoing edges now leave from the vertex. Any
    /// other vertex gets the mirrored treatment on incoming connectors whose
    /// source has a single outgoing edge.
    pub fn link_reduce(&self, network: &mut Network) -> Result<ReductionStats, NetworkError> {
        let mut stats = ReductionStats::default();
        let order: Vec<VertexId> = network.vertices().map(|v| v.id).collect();

        for node in order {
            // Already spliced away earlier in this pass.
            let Ok(vertex) = network.vertex(node) else {
                continue;
            };
            let split = vertex.in_edges().len() == 1;

            let mut candidates = Vec::new();
            if split {
                for &edge_id in vertex.out_edges() {
                    let edge = network.edge(edge_id)?;
                    let next = edge.target();
                    if !edge.is_real()
                        && next != node
                        && network.vertex(next)?.in_edges().len() == 1
                        && !network.is_zone_vertex(next)
                    {
                        candidates.push(edge_id);
                    }
                }
            } else {
                for &edge_id in vertex.in_edges() {
                    let edge = network.edge(edge_id)?;
                    let prev = edge.source();
                    if !edge.is_real()
                        && prev != node
                        && network.vertex(prev)?.out_edges().len() == 1
                        && !network.is_zone_vertex(prev)
                    {
                        candidates.push(edge_id);
                    }
                }
            }

            for connector in candidates {
                if split {
                    let spliced = network.edge(connector)?.target();
                    let moved: Vec<EdgeId> = network.vertex(spliced)?.out_edges().to_vec();
                    for link in moved {
                        network.move_source(link, node)?;
                    }
                    network.remove_edge(connector)?;
                    network.remove_vertex(spliced)?;
                } else {
                    let spliced = network.edge(connector)?.source();
                    let moved: Vec<EdgeId> = network.vertex(spliced)?.in_edges().to_vec();
                    for link in moved {
                        network.move_target(link, node)?;
                    }
                    network.remove_edge(connector)?;
                    network.remove_vertex(spliced)?;
                }
                stats.removed_edges += 1;
                stats.removed_vertices += 1;
            }
        }

        tracing::debug!(
            removed_vertices = stats.removed_vertices,
            removed_edges = stats.removed_edges,
            "link reduction finished"
        );
        Ok(stats)
    }

    /// Collapse self-contained connector clusters into single vertices.
    ///
    /// For each real edge, the connector-only neighbourhood around its
    /// target is grown by alternating expansion: downstream targets reached
    /// from sources, then upstream sources reaching those targets. Any real
    /// edge met inside the neighbourhood aborts the attempt. A finished
    /// cluster is collapsed onto the seed edge's target when every source
    /// has at least as many outgoing edges as there are targets, an
    /// approximation of "every source reaches every target".
    pub fn reduce(&self, network: &mut Network) -> Result<ReductionStats, NetworkError> {
        let mut stats = ReductionStats::default();
        let mut visited: BTreeSet<VertexId> = BTreeSet::new();
        let seeds: Vec<EdgeId> = network.real_edges().map(|(id, _)| id).collect();

        for seed in seeds {
            let hub = network.edge(seed)?.target();
            if visited.contains(&hub) {
                continue;
            }
            let Some(cluster) = self.expand(network, hub)? else {
                continue;
            };
            visited.extend(cluster.sources.iter().copied());

            let mut complete = true;
            for source in &cluster.sources {
                if network.vertex(*source)?.out_edges().len() < cluster.targets.len() {
                    complete = false;
                    break;
                }
            }
            if !complete || cluster.targets.is_empty() {
                continue;
            }

            let collapsed = self.collapse(network, hub, &cluster)?;
            stats.absorb(collapsed);
        }

        tracing::debug!(
            removed_vertices = stats.removed_vertices,
            removed_edges = stats.removed_edges,
            merged_clusters = stats.merged_clusters,
            "cluster reduction finished"
        );
        Ok(stats)
    }

    /// Grow the connector-only cluster around `hub`; `None` if a real edge
    /// is met.
    fn expand(&self, network: &Network, hub: VertexId) -> Result<Option<Cluster>, NetworkError> {
        let mut cluster = Cluster::default();
        let mut source_set: BTreeSet<VertexId> = BTreeSet::new();
        let mut target_set: BTreeSet<VertexId> = BTreeSet::new();
        let mut pending_sources = vec![hub];
        let mut pending_targets: Vec<VertexId> = Vec::new();

        source_set.insert(hub);
        cluster.sources.push(hub);

        while !pending_sources.is_empty() || !pending_targets.is_empty() {
            if let Some(source) = pending_sources.pop() {
                for &edge_id in network.vertex(source)?.out_edges() {
                    let edge = network.edge(edge_id)?;
                    if edge.is_real() {
                        return Ok(None);
                    }
                    if target_set.insert(edge.target()) {
                        cluster.targets.push(edge.target());
                        pending_targets.push(edge.target());
                    }
                }
            }
            if let Some(target) = pending_targets.pop() {
                for &edge_id in network.vertex(target)?.in_edges() {
                    let edge = network.edge(edge_id)?;
                    if edge.is_real() {
                        return Ok(None);
                    }
                    if source_set.insert(edge.source()) {
                        cluster.sources.push(edge.source());
                        pending_sources.push(edge.source());
                    }
                }
            }
        }
        Ok(Some(cluster))
    }

    /// Attach every edge entering or leaving the cluster to `hub` and drop
    /// the cluster's connectors and emptied vertices.
    fn collapse(&self, network: &mut Network, hub: VertexId, cluster: &Cluster) -> Result<ReductionStats, NetworkError> {
        let mut stats = ReductionStats {
            merged_clusters: 1,
            ..ReductionStats::default()
        };

        // Every outgoing edge of a source is a connector into a target.
        let mut internal: BTreeSet<EdgeId> = BTreeSet::new();
        for source in &cluster.sources {
            internal.extend(network.vertex(*source)?.out_edges().iter().copied());
        }

        for target in &cluster.targets {
            let outgoing: Vec<EdgeId> = network.vertex(*target)?.out_edges().to_vec();
            for edge in outgoing {
                if !internal.contains(&edge) {
                    network.move_source(edge, hub)?;
                }
            }
        }
        for source in &cluster.sources {
            let incoming: Vec<EdgeId> = network.vertex(*source)?.in_edges().to_vec();
            for edge in incoming {
                if !internal.contains(&edge) {
                    network.move_target(edge, hub)?;
                }
            }
        }

        for edge in internal {
            network.remove_edge(edge)?;
            stats.removed_edges += 1;
        }

        let members: BTreeSet<VertexId> = cluster
            .sources
            .iter()
            .chain(cluster.targets.iter())
            .copied()
            .collect();
        for member in members {
            if member == hub || network.is_zone_vertex(member) {
                continue;
            }
            let vertex = network.vertex(member)?;
            if vertex.in_edges().is_empty() && vertex.out_edges().is_empty() {
                network.remove_vertex(member)?;
                stats.removed_vertices += 1;
            }
        }
        Ok(stats)
    }
}
