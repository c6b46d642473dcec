//! # route-kernel
//!
//! Deterministic route-set generation for macroscopic traffic assignment.
//!
//! The kernel answers one question:
//!
//! > Between two traffic zones, which routes should the assignment consider?
//!
//! ## Core Contract
//!
//! 1. Build a directed road [`Network`] of real edges and connector edges
//! 2. Contract connector clusters with [`GraphReducer`] without losing reachability
//! 3. Search shortest and k-shortest routes per OD pair ([`ShortestPathEngine`])
//! 4. Keep a deduplicated, overlap-annotated path set per OD pair ([`PathRepository`])
//!
//! ## Architecture
//!
//! ```text
//! NetworkDescription → Network → GraphReducer → RouteGenerator → PathRepository
//!                                                     ↓
//!                                          ShortestPathEngine
//!                                      (plain | accelerated backend)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Adjacency lists keep insertion order; all keyed state uses `BTreeMap`
//! - Same network + same demand + same config → identical repository fingerprint
//! - Equal-cost ties resolve by vertex id (search) or by arrival order (labels)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod network;
pub mod search;
pub mod repository;
pub mod generator;
pub mod config;
pub mod demand;
pub mod report;
pub mod canonical;

// Re-exports
pub use types::{
    CrCurve, Edge, EdgeAttributes, EdgeId, EdgeKind, JunctionControl, Path, PathError, PathId,
    SignalPhase, TlJunction, TurnControl, TurnDirection, TurnMovement, Vertex, VertexId,
    ZoneConnection,
};
pub use network::{GraphReducer, Network, NetworkDescription, NetworkError, ReductionStats};
pub use search::{
    backend_for, LabelPath, LabelTable, PlainDijkstra, SearchBackend, SearchError, SearchMode,
    SearchTree, ShortestPathEngine,
};
#[cfg(feature = "accelerated")]
pub use search::PetgraphSearch;
pub use repository::{
    InsertOutcome, Novelty, OverlapBasis, OverlapEvaluator, PathRepository, PathSet,
    RepositoryError, SimilarityStats, SimilarityTolerance,
};
pub use generator::{FoldOutcome, GenerationReport, GeneratorError, KPathRecord, KPathReport, RouteGenerator};
pub use config::{ConfigError, CostingMode, RouteGenConfig};
pub use demand::OdMatrix;
pub use report::{write_kpath_listing, write_network_dump, NETWORK_DUMP_HEADER};
pub use canonical::{canonical_hash, canonical_hash_hex, quantize_float, to_canonical_bytes};

/// Schema version of the serialized network description and reports.
/// Increment on breaking changes to any serialized type.
pub const ROUTE_KERNEL_SCHEMA_VERSION: &str = "1.0.0";
