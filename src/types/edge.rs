//! Edge types for the road graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::vertex::VertexId;

/// Stable identifier of an edge: its insertion index in the network arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(u32);

impl EdgeId {
    /// Create an edge id from an arena index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Arena index of this edge.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of edge in the road graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Road segment (or zone-access link) with a real-world identity.
    Real,
    /// Synthetic junction-internal link.
    Connector,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => write!(f, "real"),
            Self::Connector => write!(f, "connector"),
        }
    }
}

/// Control regime of the junction an edge feeds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JunctionControl {
    /// Traffic-light controlled.
    Signalized,
    /// Priority (right-of-way) controlled.
    Prioritized,
}

/// Turn direction at the downstream junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TurnDirection {
    /// Right turn.
    Right,
    /// Straight through.
    Straight,
    /// Left turn.
    Left,
    /// U-turn.
    UTurn,
}

impl TurnDirection {
    /// Parse the one-letter direction code of the network format.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "r" => Some(Self::Right),
            "s" => Some(Self::Straight),
            "l" => Some(Self::Left),
            "t" => Some(Self::UTurn),
            _ => None,
        }
    }
}

/// How a turn movement is controlled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnControl {
    /// Index of the signal link governing the movement.
    LinkIndex(u32),
    /// Right-of-way state at a priority junction.
    State(String),
}

/// One turn movement of an edge: its control and the edges it leads to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMovement {
    /// Signal link index or priority state.
    pub control: TurnControl,
    /// Downstream edges reachable with this movement.
    pub downstream: Vec<EdgeId>,
}

/// Congestion-relation curve class used by the assignment's cost function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrCurve {
    /// Motorway.
    Cr1,
    /// Arterial.
    Cr2,
    /// Urban main road.
    Cr3,
    /// Urban collector.
    Cr4,
    /// Local street.
    Cr5,
}

impl CrCurve {
    /// Classify a road by its speed limit (m/s).
    pub fn for_speed(max_speed: f64) -> Self {
        if max_speed > 25.0 {
            Self::Cr1
        } else if max_speed > 16.0 {
            Self::Cr2
        } else if max_speed > 13.0 {
            Self::Cr3
        } else if max_speed > 8.0 {
            Self::Cr4
        } else {
            Self::Cr5
        }
    }

    /// Saturation flow per lane (veh/h) assumed for this class.
    pub fn lane_capacity(&self) -> f64 {
        match self {
            Self::Cr1 => 2000.0,
            Self::Cr2 => 1800.0,
            Self::Cr3 => 1400.0,
            Self::Cr4 => 800.0,
            Self::Cr5 => 600.0,
        }
    }
}

impl fmt::Display for CrCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cr1 => write!(f, "CR1"),
            Self::Cr2 => write!(f, "CR2"),
            Self::Cr3 => write!(f, "CR3"),
            Self::Cr4 => write!(f, "CR4"),
            Self::Cr5 => write!(f, "CR5"),
        }
    }
}

/// Whether a real edge gives access to a zone, and in which direction.
///
/// The numeric codes are the ones printed in the network dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZoneConnection {
    /// Ordinary road edge.
    #[default]
    None,
    /// Leads from the road network into a destination zone.
    Sink,
    /// Leads from an origin zone into the road network.
    Source,
}

impl ZoneConnection {
    /// Numeric code used in the network dump.
    pub fn code(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Sink => 1,
            Self::Source => 2,
        }
    }
}

/// Mutable attributes of an edge.
///
/// Times are in seconds, lengths in metres, speeds in m/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeAttributes {
    /// Physical length.
    pub length: f64,
    /// Number of lanes.
    pub lanes: u32,
    /// Speed limit.
    pub max_speed: f64,
    /// Travel time at the speed limit.
    pub free_flow_time: f64,
    /// Experienced travel time, updated between assignment rounds.
    pub current_time: f64,
    /// Estimated capacity (veh/h).
    pub capacity: f64,
    /// Congestion-relation curve class, once classified.
    pub cr_curve: Option<CrCurve>,
    /// Assignment weight of a zone-access edge.
    pub weight: f64,
    /// Zone access direction.
    pub connection: ZoneConnection,
    /// Junction the edge feeds into.
    pub junction: Option<String>,
    /// Control regime of that junction.
    pub junction_control: Option<JunctionControl>,
    /// Turn movements keyed by direction.
    pub turns: BTreeMap<TurnDirection, TurnMovement>,
}

impl Default for EdgeAttributes {
    fn default() -> Self {
        Self {
            length: 0.0,
            lanes: 0,
            max_speed: 0.0,
            free_flow_time: 0.0,
            current_time: 0.0,
            capacity: 0.0,
            cr_curve: None,
            weight: 0.0,
            connection: ZoneConnection::None,
            junction: None,
            junction_control: None,
            turns: BTreeMap::new(),
        }
    }
}

impl EdgeAttributes {
    /// Derive free-flow time, capacity and curve class from the lane data.
    ///
    /// `intra_junction` marks an edge whose endpoints belong to the same
    /// junction; such edges take no time to traverse.
    pub fn init(&mut self, max_speed: f64, length: f64, lanes: u32, intra_junction: bool) {
        self.max_speed = max_speed;
        self.length = length;
        self.lanes = lanes;
        self.free_flow_time = if intra_junction || max_speed <= 0.0 {
            0.0
        } else {
            length / max_speed
        };
        self.current_time = self.free_flow_time;

        let curve = CrCurve::for_speed(max_speed);
        self.capacity = curve.lane_capacity() * f64::from(lanes);
        self.cr_curve = Some(curve);
    }

    /// Record a turn movement, merging downstream edges for a known direction.
    pub fn add_turn(&mut self, direction: TurnDirection, control: TurnControl, downstream: EdgeId) {
        let movement = self.turns.entry(direction).or_insert_with(|| TurnMovement {
            control: control.clone(),
            downstream: Vec::new(),
        });
        movement.control = control;
        if !movement.downstream.contains(&downstream) {
            movement.downstream.push(downstream);
        }
    }
}

/// Directed edge of the road graph.
///
/// Topology (endpoints, kind, label) is only changed by the network and its
/// reduction passes; attributes are freely adjustable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    label: String,
    source: VertexId,
    target: VertexId,
    kind: EdgeKind,
    /// Physical and assignment attributes.
    pub attrs: EdgeAttributes,
}

impl Edge {
    /// Create a new edge with default attributes.
    pub fn new(label: impl Into<String>, source: VertexId, target: VertexId, kind: EdgeKind) -> Self {
        Self {
            label: label.into(),
            source,
            target,
            kind,
            attrs: EdgeAttributes::default(),
        }
    }

    /// Create a real edge.
    pub fn real(label: impl Into<String>, source: VertexId, target: VertexId) -> Self {
        Self::new(label, source, target, EdgeKind::Real)
    }

    /// Create a connector edge.
    pub fn connector(label: impl Into<String>, source: VertexId, target: VertexId) -> Self {
        Self::new(label, source, target, EdgeKind::Connector)
    }

    /// Set the attributes (builder style).
    pub fn with_attrs(mut self, attrs: EdgeAttributes) -> Self {
        self.attrs = attrs;
        self
    }

    /// Edge label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Source vertex.
    pub fn source(&self) -> VertexId {
        self.source
    }

    /// Target vertex.
    pub fn target(&self) -> VertexId {
        self.target
    }

    /// Edge kind.
    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    /// `true` for real edges.
    pub fn is_real(&self) -> bool {
        self.kind == EdgeKind::Real
    }

    pub(crate) fn set_source(&mut self, source: VertexId) {
        self.source = source;
    }

    pub(crate) fn set_target(&mut self, target: VertexId) {
        self.target = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_kind() {
        let road = Edge::real("r1", VertexId::new(0), VertexId::new(1));
        let link = Edge::connector("r1_r2", VertexId::new(1), VertexId::new(2));

        assert!(road.is_real());
        assert_eq!(link.kind(), EdgeKind::Connector);
        assert_eq!(road.kind().to_string(), "real");
        assert_eq!(link.kind().to_string(), "connector");
    }

    #[test]
    fn test_init_derives_free_flow_time() {
        let mut attrs = EdgeAttributes::default();
        attrs.init(10.0, 500.0, 2, false);

        assert!((attrs.free_flow_time - 50.0).abs() < 1e-9);
        assert_eq!(attrs.current_time, attrs.free_flow_time);
        assert_eq!(attrs.cr_curve, Some(CrCurve::Cr4));
        assert_eq!(attrs.capacity, 1600.0);
    }

    #[test]
    fn test_intra_junction_edges_take_no_time() {
        let mut attrs = EdgeAttributes::default();
        attrs.init(13.9, 20.0, 1, true);

        assert_eq!(attrs.free_flow_time, 0.0);
        assert_eq!(attrs.current_time, 0.0);
    }

    #[test]
    fn test_turns_merge_by_direction() {
        let mut attrs = EdgeAttributes::default();
        attrs.add_turn(TurnDirection::Left, TurnControl::LinkIndex(3), EdgeId::new(4));
        attrs.add_turn(TurnDirection::Left, TurnControl::LinkIndex(3), EdgeId::new(5));
        attrs.add_turn(TurnDirection::Left, TurnControl::LinkIndex(3), EdgeId::new(4));

        let left = &attrs.turns[&TurnDirection::Left];
        assert_eq!(left.downstream, vec![EdgeId::new(4), EdgeId::new(5)]);
        assert_eq!(attrs.turns.len(), 1);
    }

    #[test]
    fn test_direction_codes() {
        assert_eq!(TurnDirection::from_code("r"), Some(TurnDirection::Right));
        assert_eq!(TurnDirection::from_code("t"), Some(TurnDirection::UTurn));
        assert_eq!(TurnDirection::from_code("x"), None);
    }

    #[test]
    fn test_zone_connection_codes() {
        assert_eq!(ZoneConnection::None.code(), 0);
        assert_eq!(ZoneConnection::Sink.code(), 1);
        assert_eq!(ZoneConnection::Source.code(), 2);
    }
}
