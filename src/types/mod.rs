//! Core types for the route kernel.

pub mod vertex;
pub mod edge;
pub mod path;
pub mod junction;

pub use vertex::{Vertex, VertexId};
pub use edge::{
    CrCurve, Edge, EdgeAttributes, EdgeId, EdgeKind, JunctionControl, TurnControl,
    TurnDirection, TurnMovement, ZoneConnection,
};
pub use path::{edge_sequence_fingerprint, Path, PathError, PathId};
pub use junction::{SignalPhase, TlJunction};
