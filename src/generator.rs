//! Route-set generation passes.
//!
//! Two passes fill the [`PathRepository`]:
//!
//! - [`RouteGenerator::find_new_paths`] runs one shortest-path search per
//!   origin and folds each OD pair's shortest route into its path set.
//! - [`RouteGenerator::calc_k_paths`] propagates k-path labels per origin and
//!   stores up to k alternatives per OD pair, stopping at the free-flow cutoff.
//!
//! Only OD pairs with demand whose endpoints have different names are
//! visited. A failure on one pair is logged and counted; the pass continues
//! with the next pair.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::{ConfigError, CostingMode, RouteGenConfig};
use crate::demand::OdMatrix;
use crate::network::Network;
use crate::repository::{InsertOutcome, Novelty, PathRepository, RepositoryError};
use crate::search::{SearchError, SearchTree, ShortestPathEngine};
use crate::types::{Path, PathId, VertexId};

/// Error type for generation passes.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Invalid parameters.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Search failed.
    #[error("Search error: {0}")]
    Search(#[from] SearchError),
    /// Path storage failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Outcome of folding one shortest route into its path set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    /// Stored as a new path.
    Inserted(PathId),
    /// Treated as an existing similar path, which was refreshed.
    Updated(PathId),
    /// Exactly an existing path, which was refreshed.
    Unchanged(PathId),
}

/// Counters for one shortest-path round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Paths inserted.
    pub new_paths: usize,
    /// Existing paths refreshed because a similar route came out shortest.
    pub updated_paths: usize,
    /// Existing paths that came out shortest again unchanged.
    pub unchanged_paths: usize,
    /// OD pairs skipped after an error.
    pub skipped_pairs: usize,
}

/// One generated k-path, for the diagnostic listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KPathRecord {
    /// Path id.
    pub id: PathId,
    /// Origin zone name.
    pub source: String,
    /// Destination zone name.
    pub target: String,
    /// Path cost (free-flow seconds).
    pub cost: f64,
    /// Edge labels in travel order, without the first and last edge.
    pub edges: Vec<String>,
}

/// Counters and listing records for one k-path pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KPathReport {
    /// Paths inserted.
    pub new_paths: usize,
    /// OD pairs skipped after an error.
    pub skipped_pairs: usize,
    /// Listing records, when enabled.
    pub records: Vec<KPathRecord>,
}

/// Generates candidate routes into a path repository.
#[derive(Debug)]
pub struct RouteGenerator {
    engine: ShortestPathEngine,
    config: RouteGenConfig,
}

impl RouteGenerator {
    /// Validate the configuration and select the search backend.
    pub fn new(config: RouteGenConfig) -> Result<Self, GeneratorError> {
        config.validate()?;
        let engine = ShortestPathEngine::from_mode(config.search_mode)?;
        Ok(Self { engine, config })
    }

    /// Use an explicit engine.
    pub fn with_engine(engine: ShortestPathEngine, config: RouteGenConfig) -> Result<Self, GeneratorError> {
        config.validate()?;
        Ok(Self { engine, config })
    }

    /// Active parameters.
    pub fn config(&self) -> &RouteGenConfig {
        &self.config
    }

    /// Search engine in use.
    pub fn engine(&self) -> &ShortestPathEngine {
        &self.engine
    }

    /// A repository configured with this generator's overlap parameters.
    pub fn new_repository(&self, network: &Network) -> PathRepository {
        let mut repository = PathRepository::new(self.config.overlap_evaluator());
        repository.initialise(network);
        repository
    }

    fn destinations_for(
        network: &Network,
        demand: &OdMatrix,
        i: usize,
        origin: VertexId,
        has_demand: impl Fn(f64) -> bool,
    ) -> Vec<(usize, VertexId)> {
        let origin_name = network.vertex_name(origin);
        network
            .destinations()
            .iter()
            .copied()
            .enumerate()
            .filter(|(j, dest)| has_demand(demand.get(i, *j)) && network.vertex_name(*dest) != origin_name)
            .collect()
    }

    /// One shortest-path round over all OD pairs with positive demand.
    pub fn find_new_paths(
        &self,
        network: &Network,
        repository: &mut PathRepository,
        demand: &OdMatrix,
    ) -> GenerationReport {
        let mut report = GenerationReport::default();

        for (i, &origin) in network.origins().iter().enumerate() {
            let pairs = Self::destinations_for(network, demand, i, origin, |d| d > 0.0);
            if pairs.is_empty() {
                continue;
            }
            let targets: BTreeSet<VertexId> = pairs.iter().map(|(_, d)| *d).collect();

            let tree = match self.engine.search(network, origin, &targets) {
                Ok(tree) => tree,
                Err(e) => {
                    tracing::warn!(origin = %network.vertex_name(origin), error = %e, "search failed, skipping origin");
                    report.skipped_pairs += pairs.len();
                    continue;
                }
            };

            for (_, destination) in pairs {
                match self.fold_shortest_path(network, repository, &tree, destination) {
                    Ok(outcome) => {
                        tracing::debug!(
                            origin = %network.vertex_name(origin),
                            destination = %network.vertex_name(destination),
                            ?outcome,
                            "shortest path folded"
                        );
                        match outcome {
                            FoldOutcome::Inserted(_) => report.new_paths += 1,
                            FoldOutcome::Updated(_) => report.updated_paths += 1,
                            FoldOutcome::Unchanged(_) => report.unchanged_paths += 1,
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            origin = %network.vertex_name(origin),
                            destination = %network.vertex_name(destination),
                            error = %e,
                            "OD pair skipped"
                        );
                        report.skipped_pairs += 1;
                    }
                }
            }
        }

        tracing::info!(
            new = report.new_paths,
            updated = report.updated_paths,
            unchanged = report.unchanged_paths,
            skipped = report.skipped_pairs,
            "shortest-path round finished"
        );
        report
    }

    fn refresh(&self, path: &mut Path, cost: f64) {
        match self.config.costing_mode {
            CostingMode::Standard => path.current_cost = cost,
            CostingMode::Working => path.working_cost = cost,
        }
        path.usage += 1;
        path.current_shortest = true;
    }

    /// Fold the shortest route to `destination` into its OD path set.
    ///
    /// Once the route has been classified (and stored, if new) the set's
    /// current-shortest marks are cleared and only the path it resolves to
    /// is marked. A failed fold leaves the marks as they were.
    pub fn fold_shortest_path(
        &self,
        network: &Network,
        repository: &mut PathRepository,
        tree: &SearchTree,
        destination: VertexId,
    ) -> Result<FoldOutcome, GeneratorError> {
        let origin = tree.source();
        let edges = tree.real_path_to(network, destination)?;
        let cost = tree.distance(destination).ok_or(SearchError::Unreachable {
            source_vertex: origin,
            target_vertex: destination,
        })?;

        let tolerance = self.config.similarity_tolerance();
        let novelty = repository
            .path_set_mut(origin, destination)
            .classify(network, &edges, cost, &tolerance)?;

        let (id, outcome) = match novelty {
            Novelty::Duplicate(id) => (id, FoldOutcome::Unchanged(id)),
            Novelty::Similar(id) => (id, FoldOutcome::Updated(id)),
            Novelty::New => match repository.insert_path(network, origin, destination, edges)? {
                InsertOutcome::Inserted(id) => (id, FoldOutcome::Inserted(id)),
                InsertOutcome::Duplicate(id) => (id, FoldOutcome::Unchanged(id)),
            },
        };

        let set = repository.path_set_mut(origin, destination);
        set.clear_current_shortest();
        if let Some(path) = set.get_mut(id) {
            self.refresh(path, cost);
        }
        Ok(outcome)
    }

    /// Store up to k alternative routes per OD pair with nonzero demand.
    ///
    /// Labels are consumed cheapest first. The first candidate whose
    /// free-flow cost exceeds the cutoff factor times the cheapest stored
    /// free-flow cost ends the pair; exact duplicates are passed over.
    pub fn calc_k_paths(
        &self,
        network: &Network,
        repository: &mut PathRepository,
        demand: &OdMatrix,
    ) -> KPathReport {
        let mut report = KPathReport::default();

        for (i, &origin) in network.origins().iter().enumerate() {
            let pairs = Self::destinations_for(network, demand, i, origin, |d| d != 0.0);
            if pairs.is_empty() {
                continue;
            }

            let table = match self.engine.k_path_labels(network, origin, self.config.k_paths) {
                Ok(table) => table,
                Err(e) => {
                    tracing::warn!(origin = %network.vertex_name(origin), error = %e, "k-path search failed, skipping origin");
                    report.skipped_pairs += pairs.len();
                    continue;
                }
            };

            for (_, destination) in pairs {
                let candidates = match table.paths_to(network, destination) {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!(
                            destination = %network.vertex_name(destination),
                            error = %e,
                            "OD pair skipped"
                        );
                        report.skipped_pairs += 1;
                        continue;
                    }
                };

                let mut stored = 0usize;
                for candidate in candidates {
                    let cheapest = repository
                        .path_set(origin, destination)
                        .and_then(|s| s.min_free_flow_cost());
                    if let Some(cheapest) = cheapest {
                        if candidate.free_flow_cost > self.config.kpath_cutoff_factor * cheapest {
                            break;
                        }
                    }

                    match repository.insert_path(network, origin, destination, candidate.edges) {
                        Ok(InsertOutcome::Inserted(id)) => {
                            stored += 1;
                            report.new_paths += 1;
                            if self.config.emit_listing {
                                if let Some(path) = repository.path_set(origin, destination).and_then(|s| s.get(id)) {
                                    report.records.push(listing_record(network, path));
                                }
                            }
                        }
                        Ok(InsertOutcome::Duplicate(_)) => continue,
                        Err(e) => {
                            tracing::warn!(
                                origin = %network.vertex_name(origin),
                                destination = %network.vertex_name(destination),
                                error = %e,
                                "OD pair skipped"
                            );
                            report.skipped_pairs += 1;
                            break;
                        }
                    }
                }
                tracing::debug!(
                    origin = %network.vertex_name(origin),
                    destination = %network.vertex_name(destination),
                    stored,
                    "k-paths stored"
                );
            }
        }

        tracing::info!(
            new = report.new_paths,
            skipped = report.skipped_pairs,
            k = self.config.k_paths,
            "k-path pass finished"
        );
        report
    }
}

fn listing_record(network: &Network, path: &Path) -> KPathRecord {
    let inner = path.edges().get(1..path.len().saturating_sub(1)).unwrap_or(&[]);
    KPathRecord {
        id: path.id,
        source: network.vertex_name(path.source),
        target: network.vertex_name(path.target),
        cost: path.current_cost,
        edges: inner
            .iter()
            .map(|e| {
                network
                    .edge(*e)
                    .map(|edge| edge.label().to_string())
                    .unwrap_or_else(|_| e.to_string())
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Edge;

    /// Zones A and B joined by one road, with zone access edges.
    fn single_road() -> Network {
        let mut net = Network::new();
        let (a_in, _) = net.add_zone("A");
        let (_, b_out) = net.add_zone("B");
        let s = net.new_labelled_vertex("J1");
        let t = net.new_labelled_vertex("J2");
        let access = net.add_edge(Edge::real("A1", a_in, s)).unwrap();
        let road = net.add_edge(Edge::real("road", s, t)).unwrap();
        let egress = net.add_edge(Edge::real("B1", t, b_out)).unwrap();
        for (id, time) in [(access, 0.0), (road, 60.0), (egress, 0.0)] {
            let attrs = net.edge_attributes_mut(id).unwrap();
            attrs.free_flow_time = time;
            attrs.current_time = time;
        }
        net
    }

    #[test]
    fn test_zone_never_paired_with_itself() {
        let net = single_road();
        let gen = RouteGenerator::new(RouteGenConfig::default()).unwrap();
        let mut repo = gen.new_repository(&net);
        let report = gen.find_new_paths(&net, &mut repo, &OdMatrix::uniform(2, 2, 1.0));

        assert_eq!(report.new_paths, 1);
        let a = net.origins()[0];
        let b = net.destinations()[1];
        assert_eq!(repo.path_set(a, b).unwrap().len(), 1);
        assert!(repo.path_set(a, net.destinations()[0]).unwrap().is_empty());
    }

    #[test]
    fn test_unreachable_pair_is_skipped() {
        let net = single_road();
        let gen = RouteGenerator::new(RouteGenConfig::default()).unwrap();
        let mut repo = gen.new_repository(&net);
        // B → A has no road.
        let report = gen.find_new_paths(&net, &mut repo, &OdMatrix::from_rows(vec![vec![0.0, 0.0], vec![1.0, 0.0]]));
        assert_eq!(report.skipped_pairs, 1);
        assert_eq!(repo.total_paths(), 0);
    }

    #[test]
    fn test_new_path_marked_shortest() {
        let net = single_road();
        let gen = RouteGenerator::new(RouteGenConfig::default()).unwrap();
        let mut repo = gen.new_repository(&net);
        gen.find_new_paths(&net, &mut repo, &OdMatrix::uniform(2, 2, 1.0));

        let path = &repo.path_set(net.origins()[0], net.destinations()[1]).unwrap().paths()[0];
        assert!(path.current_shortest);
        assert_eq!(path.usage, 1);
        assert_eq!(path.current_cost, 60.0);
    }

    #[test]
    fn test_working_mode_writes_working_cost() {
        let net = single_road();
        let config = RouteGenConfig {
            costing_mode: CostingMode::Working,
            ..RouteGenConfig::default()
        };
        let gen = RouteGenerator::new(config).unwrap();
        let mut repo = gen.new_repository(&net);
        gen.find_new_paths(&net, &mut repo, &OdMatrix::uniform(2, 2, 1.0));
        gen.find_new_paths(&net, &mut repo, &OdMatrix::uniform(2, 2, 1.0));

        let path = &repo.path_set(net.origins()[0], net.destinations()[1]).unwrap().paths()[0];
        assert_eq!(path.working_cost, 60.0);
        assert_eq!(path.usage, 2);
    }

    #[test]
    fn test_failed_fold_keeps_shortest_marks() {
        let mut net = single_road();
        let gen = RouteGenerator::new(RouteGenConfig::default()).unwrap();
        let mut repo = gen.new_repository(&net);
        let a_to_b = OdMatrix::from_rows(vec![vec![0.0, 1.0], vec![0.0, 0.0]]);
        gen.find_new_paths(&net, &mut repo, &a_to_b);

        // A faster parallel road with zero free-flow time cannot be stored.
        let road = net.edge_by_label("road").unwrap().clone();
        let bypass = net.add_edge(Edge::real("bypass", road.source(), road.target())).unwrap();
        net.set_current_time(bypass, 1.0).unwrap();

        let report = gen.find_new_paths(&net, &mut repo, &a_to_b);
        assert_eq!(report.skipped_pairs, 1);
        assert_eq!(report.new_paths, 0);

        let set = repo.path_set(net.origins()[0], net.destinations()[1]).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.paths()[0].current_shortest);
        assert_eq!(set.paths()[0].usage, 1);
    }

    #[test]
    fn test_listing_drops_endpoint_edges() {
        let net = single_road();
        let config = RouteGenConfig {
            emit_listing: true,
            ..RouteGenConfig::default()
        };
        let gen = RouteGenerator::new(config).unwrap();
        let mut repo = gen.new_repository(&net);
        let report = gen.calc_k_paths(&net, &mut repo, &OdMatrix::uniform(2, 2, 1.0));

        assert_eq!(report.records.len(), 1);
        let record = &report.records[0];
        assert_eq!(record.source, "A");
        assert_eq!(record.target, "B");
        assert_eq!(record.edges, vec!["road".to_string()]);
        assert_eq!(record.cost, 60.0);
    }
}
