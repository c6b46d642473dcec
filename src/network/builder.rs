//! Declarative network description and its construction into a [`Network`].
//!
//! The description mirrors what the network and district importers deliver:
//! road edges with their lanes, lane-level successor connections, districts
//! with their access edges, and traffic-light plans. Building goes through
//! the public construction operations only.

use serde::{Deserialize, Serialize};

use super::{Network, NetworkError};
use crate::types::{
    Edge, EdgeId, JunctionControl, TlJunction, TurnControl, TurnDirection, ZoneConnection,
};

/// First suffix handed out to zone-access edge labels.
const ZONE_ACCESS_LABEL_BASE: u32 = 100;

/// One lane of a road edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneSpec {
    /// Lane speed limit (m/s).
    pub max_speed: f64,
    /// Lane length (m).
    pub length: f64,
}

/// A road edge between two junctions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// Edge label.
    pub id: String,
    /// Label of the upstream junction.
    pub from: String,
    /// Label of the downstream junction.
    pub to: String,
    /// Edge function; `"internal"` edges are skipped.
    #[serde(default)]
    pub function: Option<String>,
    /// Lanes of the edge.
    #[serde(default)]
    pub lanes: Vec<LaneSpec>,
}

/// A turn from one road edge onto another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSpec {
    /// Incoming edge label. Internal edges (leading `:`) are ignored.
    pub from_edge: String,
    /// Outgoing edge label.
    pub to_edge: String,
    /// Junction where the turn happens.
    pub junction: String,
    /// Direction code: `r`, `s`, `l` or `t`.
    pub dir: String,
    /// Traffic-light id when the junction is signalized.
    #[serde(default)]
    pub tl: Option<String>,
    /// Signal link index (signalized junctions).
    #[serde(default)]
    pub link_index: Option<u32>,
    /// Right-of-way state (priority junctions).
    #[serde(default)]
    pub state: Option<String>,
}

/// Access edge between a district and the road network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneAccessSpec {
    /// Road edge the district connects to.
    pub edge: String,
    /// Assignment weight of the access.
    #[serde(default)]
    pub weight: f64,
}

/// A traffic-analysis zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictSpec {
    /// District label.
    pub id: String,
    /// Road edges trips may start on.
    #[serde(default)]
    pub sources: Vec<ZoneAccessSpec>,
    /// Road edges trips may end on.
    #[serde(default)]
    pub sinks: Vec<ZoneAccessSpec>,
}

/// One phase of a traffic-light plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSpec {
    /// Duration in seconds.
    pub duration: f64,
    /// Green bit string.
    pub phase: String,
    /// Brake bit string.
    pub brake: String,
    /// Yellow bit string.
    pub yellow: String,
}

/// A traffic-light plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlLogicSpec {
    /// Junction label.
    pub key: String,
    /// Phases in plan order.
    pub phases: Vec<PhaseSpec>,
}

/// Complete description of a road network and its zones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkDescription {
    /// Road edges.
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    /// Turn connections between road edges.
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
    /// Districts.
    #[serde(default)]
    pub districts: Vec<DistrictSpec>,
    /// Traffic-light plans.
    #[serde(default)]
    pub tl_logics: Vec<TlLogicSpec>,
}

impl NetworkDescription {
    /// Parse a description from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Build the network: road edges, signal plans, connectors, then zones.
    pub fn build(&self) -> Result<Network, NetworkError> {
        let mut net = Network::new();

        for spec in &self.edges {
            if spec.function.as_deref() == Some("internal") {
                continue;
            }
            add_road_edge(&mut net, spec)?;
        }

        for logic in &self.tl_logics {
            let mut junction = TlJunction::new(logic.key.clone());
            for phase in &logic.phases {
                junction.push_phase(phase.duration, &phase.phase, &phase.brake, &phase.yellow);
            }
            net.add_tl_junction(junction);
        }

        for conn in &self.connections {
            if conn.from_edge.starts_with(':') {
                continue;
            }
            add_connection(&mut net, conn)?;
        }

        let mut access_counter = ZONE_ACCESS_LABEL_BASE;
        for district in &self.districts {
            add_district(&mut net, district, &mut access_counter)?;
        }

        tracing::debug!(
            vertices = net.vertex_count(),
            edges = net.edge_count(),
            zones = net.origins().len(),
            "network built from description"
        );
        Ok(net)
    }
}

fn add_road_edge(net: &mut Network, spec: &EdgeSpec) -> Result<EdgeId, NetworkError> {
    let id = net.add_isolated_real_edge(spec.id.clone())?;
    let (source, target) = {
        let edge = net.edge(id)?;
        (edge.source(), edge.target())
    };
    net.set_vertex_label(source, spec.from.clone())?;
    net.set_vertex_label(target, spec.to.clone())?;

    let max_speed = spec.lanes.iter().map(|l| l.max_speed).fold(0.0, f64::max);
    let length = spec.lanes.last().map(|l| l.length).unwrap_or(0.0);
    net.init_edge(id, max_speed, length, spec.lanes.len() as u32)?;
    Ok(id)
}

fn add_connection(net: &mut Network, conn: &ConnectionSpec) -> Result<(), NetworkError> {
    let from_id = net.real_edge_id(&conn.from_edge)?;
    let to_id = net.real_edge_id(&conn.to_edge)?;
    let source = net.edge(from_id)?.target();
    let target = net.edge(to_id)?.source();

    // Lane-level connections repeat for every lane pair; one connector suffices.
    let label = format!("{}_{}", conn.from_edge, conn.to_edge);
    let exists = net
        .edge_by_label(&label)
        .map(|e| e.source() == source && e.target() == target)
        .unwrap_or(false);
    if !exists {
        net.add_edge(Edge::connector(label, source, target))?;
    }

    let attrs = net.edge_attributes_mut(from_id)?;
    if attrs.junction.is_none() {
        attrs.junction = Some(conn.junction.clone());
    }
    let control = match &conn.tl {
        Some(tl) => {
            attrs.junction = Some(tl.clone());
            attrs.junction_control = Some(JunctionControl::Signalized);
            TurnControl::LinkIndex(conn.link_index.unwrap_or(0))
        }
        None => {
            attrs.junction_control = Some(JunctionControl::Prioritized);
            TurnControl::State(conn.state.clone().unwrap_or_default())
        }
    };
    if let Some(direction) = TurnDirection::from_code(&conn.dir) {
        attrs.add_turn(direction, control, to_id);
    }
    Ok(())
}

fn add_district(net: &mut Network, district: &DistrictSpec, counter: &mut u32) -> Result<(), NetworkError> {
    let (origin, destination) = net.add_zone(&district.id);

    for sink in &district.sinks {
        let road = net.real_edge_id(&sink.edge)?;
        let from = net.edge(road)?.target();
        *counter += 1;
        let id = net.add_edge(Edge::real(format!("{}{}", district.id, counter), from, destination))?;
        let attrs = net.edge_attributes_mut(id)?;
        attrs.weight = sink.weight;
        attrs.connection = ZoneConnection::Sink;
    }

    for source in &district.sources {
        let road = net.real_edge_id(&source.edge)?;
        let to = net.edge(road)?.source();
        *counter += 1;
        let id = net.add_edge(Edge::real(format!("{}{}", district.id, counter), origin, to))?;
        let attrs = net.edge_attributes_mut(id)?;
        attrs.weight = source.weight;
        attrs.connection = ZoneConnection::Source;
    }
    Ok(())
}
