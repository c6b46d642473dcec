//! Candidate path storage per OD pair.
//!
//! The repository owns one [`PathSet`] per (origin, destination) pair. Paths
//! are appended, never reordered, and their ids increase across the whole
//! repository. Every insertion updates the overlap accumulators of the new
//! path and of its siblings in the same set.

pub mod overlap;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::canonical::{canonical_hash_hex, quantize_float};
use crate::network::{Network, NetworkError};
use crate::types::{EdgeId, Path, PathError, PathId, VertexId};

pub use overlap::{OverlapBasis, OverlapEvaluator, SimilarityStats};

/// Error type for repository operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    /// The path cannot be stored or normalised.
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    /// Network lookup failed.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    /// Fingerprint serialization failed.
    #[error("Fingerprint error: {0}")]
    Fingerprint(String),
}

/// Thresholds below which a candidate counts as the same route as an existing one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTolerance {
    /// Largest fraction of the existing path's edges the candidate may miss.
    pub edge_fraction: f64,
    /// Largest relative gap between shared travel time and candidate cost.
    pub time_fraction: f64,
}

impl Default for SimilarityTolerance {
    fn default() -> Self {
        Self {
            edge_fraction: 0.10,
            time_fraction: 0.05,
        }
    }
}

/// How a candidate relates to the paths already stored for its OD pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Novelty {
    /// Exactly the edge sequence of a stored path.
    Duplicate(PathId),
    /// Close enough to a stored path to be treated as it.
    Similar(PathId),
    /// A genuinely new route.
    New,
}

/// Result of an insertion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The path was appended under this id.
    Inserted(PathId),
    /// A path with the same edge sequence is already stored.
    Duplicate(PathId),
}

/// Paths of one OD pair, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathSet {
    paths: Vec<Path>,
}

impl PathSet {
    /// Stored paths in insertion order.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// Number of stored paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// `true` when no path is stored.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Path by id.
    pub fn get(&self, id: PathId) -> Option<&Path> {
        self.paths.iter().find(|p| p.id == id)
    }

    /// Mutable path by id.
    pub fn get_mut(&mut self, id: PathId) -> Option<&mut Path> {
        self.paths.iter_mut().find(|p| p.id == id)
    }

    /// Id of the stored path with exactly this edge sequence.
    pub fn find_exact(&self, edges: &[EdgeId]) -> Option<PathId> {
        self.paths.iter().find(|p| p.same_edges(edges)).map(|p| p.id)
    }

    /// Smallest free-flow cost among the stored paths.
    pub fn min_free_flow_cost(&self) -> Option<f64> {
        self.paths
            .iter()
            .map(|p| p.free_flow_cost)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Drop every current-shortest mark.
    pub fn clear_current_shortest(&mut self) {
        for path in &mut self.paths {
            path.current_shortest = false;
        }
    }

    /// Classify a candidate route with travel cost `cost`.
    ///
    /// An exact match anywhere in the set wins over a similar path. Similar
    /// paths are tried in insertion order; the first within both tolerances
    /// is returned.
    pub fn classify(
        &self,
        network: &Network,
        edges: &[EdgeId],
        cost: f64,
        tolerance: &SimilarityTolerance,
    ) -> Result<Novelty, RepositoryError> {
        if let Some(id) = self.find_exact(edges) {
            return Ok(Novelty::Duplicate(id));
        }

        let candidate: BTreeSet<EdgeId> = edges.iter().copied().collect();
        for path in &self.paths {
            let stats = SimilarityStats::compute(network, path, &candidate)?;
            if stats.non_shared_fraction() <= tolerance.edge_fraction
                && stats.relative_time_difference(cost) <= tolerance.time_fraction
            {
                return Ok(Novelty::Similar(path.id));
            }
        }
        Ok(Novelty::New)
    }

    /// Append a path and update overlap accumulators.
    ///
    /// The new path's accumulator is its own term (1) plus its terms against
    /// every sibling; each sibling gains its own term against the new path.
    /// All terms are computed before anything is modified.
    fn push(&mut self, network: &Network, evaluator: &OverlapEvaluator, mut path: Path) -> Result<(), RepositoryError> {
        let mut own = evaluator.term(network, &path, &path)?;
        let mut sibling_terms = Vec::with_capacity(self.paths.len());
        for sibling in &self.paths {
            own += evaluator.term(network, &path, sibling)?;
            sibling_terms.push(evaluator.term(network, sibling, &path)?);
        }

        for (sibling, term) in self.paths.iter_mut().zip(sibling_terms) {
            sibling.sum_overlap += term;
        }
        path.sum_overlap = own;
        self.paths.push(path);
        Ok(())
    }
}

#[derive(Serialize)]
struct PathDigest {
    id: u64,
    edges: Vec<usize>,
    usage: u32,
    current_shortest: bool,
    free_flow_cost: i64,
    current_cost: i64,
    working_cost: i64,
    sum_overlap: i64,
}

#[derive(Serialize)]
struct SetDigest {
    origin: usize,
    destination: usize,
    paths: Vec<PathDigest>,
}

/// All candidate paths, keyed by OD pair.
#[derive(Debug, Clone)]
pub struct PathRepository {
    sets: BTreeMap<(VertexId, VertexId), PathSet>,
    next_id: u64,
    evaluator: OverlapEvaluator,
}

impl Default for PathRepository {
    fn default() -> Self {
        Self::new(OverlapEvaluator::default())
    }
}

impl PathRepository {
    /// Create an empty repository.
    pub fn new(evaluator: OverlapEvaluator) -> Self {
        Self {
            sets: BTreeMap::new(),
            next_id: 1,
            evaluator,
        }
    }

    /// Overlap evaluator used on insertion.
    pub fn evaluator(&self) -> &OverlapEvaluator {
        &self.evaluator
    }

    /// Create an empty set for every origin/destination pair of the network.
    pub fn initialise(&mut self, network: &Network) {
        for &origin in network.origins() {
            for &destination in network.destinations() {
                self.sets.entry((origin, destination)).or_default();
            }
        }
        tracing::debug!(pairs = self.sets.len(), "path repository initialised");
    }

    /// Remove every path, keeping the OD keys.
    pub fn clear(&mut self) {
        for set in self.sets.values_mut() {
            set.paths.clear();
        }
    }

    /// Paths of an OD pair.
    pub fn path_set(&self, origin: VertexId, destination: VertexId) -> Option<&PathSet> {
        self.sets.get(&(origin, destination))
    }

    /// Mutable paths of an OD pair, created on first use.
    pub fn path_set_mut(&mut self, origin: VertexId, destination: VertexId) -> &mut PathSet {
        self.sets.entry((origin, destination)).or_default()
    }

    /// All OD pairs with their paths, ordered by (origin, destination).
    pub fn iter(&self) -> impl Iterator<Item = (&(VertexId, VertexId), &PathSet)> {
        self.sets.iter()
    }

    /// Number of stored paths over all OD pairs.
    pub fn total_paths(&self) -> usize {
        self.sets.values().map(PathSet::len).sum()
    }

    /// Store a path unless its edge sequence is already present.
    ///
    /// Length and free-flow cost are summed from the edges; current and
    /// working cost start at the free-flow cost. The id is only consumed when
    /// the path is actually stored.
    pub fn insert_path(
        &mut self,
        network: &Network,
        origin: VertexId,
        destination: VertexId,
        edges: Vec<EdgeId>,
    ) -> Result<InsertOutcome, RepositoryError> {
        if let Some(existing) = self.path_set(origin, destination).and_then(|s| s.find_exact(&edges)) {
            return Ok(InsertOutcome::Duplicate(existing));
        }

        let id = PathId::new(self.next_id);
        let mut path = Path::new(id, origin, destination, edges)?;
        let (mut length, mut free_flow) = (0.0, 0.0);
        for edge in path.edges() {
            let attrs = &network.edge(*edge)?.attrs;
            length += attrs.length;
            free_flow += attrs.free_flow_time;
        }
        path.length = length;
        path.free_flow_cost = free_flow;
        path.current_cost = path.free_flow_cost;
        path.working_cost = path.free_flow_cost;

        let evaluator = self.evaluator;
        self.path_set_mut(origin, destination).push(network, &evaluator, path)?;
        self.next_id += 1;
        tracing::trace!(path = %id, origin = %origin, destination = %destination, "path stored");
        Ok(InsertOutcome::Inserted(id))
    }

    /// Deterministic fingerprint of the stored paths and their bookkeeping.
    pub fn fingerprint(&self) -> Result<String, RepositoryError> {
        let digest: Vec<SetDigest> = self
            .sets
            .iter()
            .map(|((origin, destination), set)| SetDigest {
                origin: origin.index(),
                destination: destination.index(),
                paths: set
                    .paths
                    .iter()
                    .map(|p| PathDigest {
                        id: p.id.value(),
                        edges: p.edges().iter().map(|e| e.index()).collect(),
                        usage: p.usage,
                        current_shortest: p.current_shortest,
                        free_flow_cost: quantize_float(p.free_flow_cost),
                        current_cost: quantize_float(p.current_cost),
                        working_cost: quantize_float(p.working_cost),
                        sum_overlap: quantize_float(p.sum_overlap),
                    })
                    .collect(),
            })
            .collect();
        canonical_hash_hex(&digest).map_err(|e| RepositoryError::Fingerprint(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(times: &[f64]) -> (Network, Vec<EdgeId>, VertexId, VertexId) {
        let mut net = Network::new();
        let (origin, destination) = {
            let (o, _) = net.add_zone("A");
            let (_, d) = net.add_zone("B");
            (o, d)
        };
        let mut ids = Vec::new();
        for (i, t) in times.iter().enumerate() {
            let id = net.add_isolated_real_edge(format!("e{i}")).unwrap();
            let attrs = net.edge_attributes_mut(id).unwrap();
            attrs.free_flow_time = *t;
            attrs.current_time = *t;
            attrs.length = *t * 10.0;
            ids.push(id);
        }
        (net, ids, origin, destination)
    }

    #[test]
    fn test_initialise_creates_all_pairs() {
        let (net, _, _, _) = network(&[]);
        let mut repo = PathRepository::new(OverlapEvaluator::default());
        repo.initialise(&net);
        assert_eq!(repo.iter().count(), 4);
        assert_eq!(repo.total_paths(), 0);
    }

    #[test]
    fn test_insert_sums_costs_and_rejects_duplicate() {
        let (net, e, o, d) = network(&[3.0, 4.0]);
        let mut repo = PathRepository::new(OverlapEvaluator::default());

        let first = repo.insert_path(&net, o, d, e.clone()).unwrap();
        let InsertOutcome::Inserted(id) = first else { panic!("expected insert") };
        let path = repo.path_set(o, d).unwrap().get(id).unwrap();
        assert_eq!(path.free_flow_cost, 7.0);
        assert_eq!(path.length, 70.0);
        assert_eq!(path.sum_overlap, 1.0);

        assert_eq!(repo.insert_path(&net, o, d, e).unwrap(), InsertOutcome::Duplicate(id));
        assert_eq!(repo.total_paths(), 1);
    }

    #[test]
    fn test_overlap_accumulates_on_both_sides() {
        let (net, e, o, d) = network(&[2.0, 6.0, 2.0]);
        let mut repo = PathRepository::new(OverlapEvaluator::default());
        repo.insert_path(&net, o, d, vec![e[0], e[1]]).unwrap();
        repo.insert_path(&net, o, d, vec![e[1], e[2]]).unwrap();

        let set = repo.path_set(o, d).unwrap();
        assert!((set.paths()[0].sum_overlap - 1.75).abs() < 1e-12);
        assert!((set.paths()[1].sum_overlap - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_failed_insert_leaves_set_untouched() {
        let (net, e, o, d) = network(&[2.0, 0.0]);
        let mut repo = PathRepository::new(OverlapEvaluator::default());
        repo.insert_path(&net, o, d, vec![e[0]]).unwrap();
        let before = repo.fingerprint().unwrap();

        let err = repo.insert_path(&net, o, d, vec![e[1]]).unwrap_err();
        assert!(matches!(err, RepositoryError::Path(PathError::EmptyPath { .. })));
        assert_eq!(repo.fingerprint().unwrap(), before);
    }

    #[test]
    fn test_ids_increase_across_pairs() {
        let (net, e, o, d) = network(&[1.0, 1.0]);
        let mut repo = PathRepository::new(OverlapEvaluator::default());
        let a = repo.insert_path(&net, o, d, vec![e[0]]).unwrap();
        let b = repo.insert_path(&net, d, o, vec![e[1]]).unwrap();
        assert_eq!(a, InsertOutcome::Inserted(PathId::new(1)));
        assert_eq!(b, InsertOutcome::Inserted(PathId::new(2)));
    }

    #[test]
    fn test_classify() {
        let times = vec![1.0; 20];
        let (net, e, o, d) = network(&times);
        let mut repo = PathRepository::new(OverlapEvaluator::default());
        repo.insert_path(&net, o, d, e[..20].to_vec()).unwrap();
        let set = repo.path_set(o, d).unwrap();
        let tol = SimilarityTolerance::default();

        assert_eq!(
            set.classify(&net, &e[..20], 20.0, &tol).unwrap(),
            Novelty::Duplicate(PathId::new(1))
        );
        // 19 of 20 edges shared, 19 s shared against a 19.5 s candidate.
        assert_eq!(
            set.classify(&net, &e[..19], 19.5, &tol).unwrap(),
            Novelty::Similar(PathId::new(1))
        );
        // Half the edges missing.
        assert_eq!(set.classify(&net, &e[..10], 10.0, &tol).unwrap(), Novelty::New);
        // All edges shared but the candidate is far slower.
        let mut longer = e[..20].to_vec();
        longer.push(e[0]);
        assert_eq!(set.classify(&net, &longer, 40.0, &tol).unwrap(), Novelty::New);
    }

    #[test]
    fn test_clear_keeps_keys() {
        let (net, e, o, d) = network(&[1.0]);
        let mut repo = PathRepository::new(OverlapEvaluator::default());
        repo.initialise(&net);
        repo.insert_path(&net, o, d, e).unwrap();
        repo.clear();
        assert_eq!(repo.total_paths(), 0);
        assert!(repo.path_set(o, d).unwrap().is_empty());
    }
}
