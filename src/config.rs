//! Route generation parameters.
//!
//! Floats are quantized before hashing (see [`crate::canonical`]), so two
//! configurations that differ only by float noise share a `params_hash`.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, quantize_float};
use crate::repository::{OverlapBasis, OverlapEvaluator, SimilarityTolerance};
use crate::search::SearchMode;

/// Default number of labels kept per vertex during k-path search.
pub const DEFAULT_K_PATHS: usize = 8;

/// Default free-flow cutoff relative to the cheapest stored path.
pub const DEFAULT_KPATH_CUTOFF: f64 = 1.4;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is outside its allowed range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Which cost slot the shortest-path round refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostingMode {
    /// Write the search cost to `current_cost`.
    #[default]
    Standard,
    /// Write the search cost to `working_cost`.
    Working,
}

/// Parameters for path generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteGenConfig {
    /// Shortest-path backend.
    pub search_mode: SearchMode,
    /// Labels kept per vertex in k-path search.
    pub k_paths: usize,
    /// Overlap exponent.
    pub gamma: f64,
    /// Edge measure for overlap terms.
    pub overlap_basis: OverlapBasis,
    /// Cost slot refreshed by shortest-path rounds.
    pub costing_mode: CostingMode,
    /// Candidates costlier than this factor times the cheapest stored path are dropped.
    pub kpath_cutoff_factor: f64,
    /// Largest fraction of an existing path's edges a similar candidate may miss.
    pub similarity_edge_tolerance: f64,
    /// Largest relative travel-time gap for a similar candidate.
    pub similarity_time_tolerance: f64,
    /// Collect listing records during k-path generation.
    pub emit_listing: bool,
}

impl Default for RouteGenConfig {
    fn default() -> Self {
        Self {
            search_mode: SearchMode::Plain,
            k_paths: DEFAULT_K_PATHS,
            gamma: 1.0,
            overlap_basis: OverlapBasis::FreeFlowTime,
            costing_mode: CostingMode::Standard,
            kpath_cutoff_factor: DEFAULT_KPATH_CUTOFF,
            similarity_edge_tolerance: 0.10,
            similarity_time_tolerance: 0.05,
            emit_listing: false,
        }
    }
}

#[derive(Serialize)]
struct QuantizedConfig {
    search_mode: SearchMode,
    k_paths: usize,
    gamma: i64,
    overlap_basis: OverlapBasis,
    costing_mode: CostingMode,
    kpath_cutoff_factor: i64,
    similarity_edge_tolerance: i64,
    similarity_time_tolerance: i64,
}

impl RouteGenConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k_paths == 0 {
            return Err(ConfigError::Invalid("k_paths must be at least 1".into()));
        }
        if !(self.gamma > 0.0 && self.gamma.is_finite()) {
            return Err(ConfigError::Invalid(format!("gamma must be positive, got {}", self.gamma)));
        }
        if !(self.kpath_cutoff_factor >= 1.0 && self.kpath_cutoff_factor.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "kpath_cutoff_factor must be >= 1, got {}",
                self.kpath_cutoff_factor
            )));
        }
        for (name, value) in [
            ("similarity_edge_tolerance", self.similarity_edge_tolerance),
            ("similarity_time_tolerance", self.similarity_time_tolerance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        Ok(())
    }

    /// Overlap evaluator for these parameters.
    pub fn overlap_evaluator(&self) -> OverlapEvaluator {
        OverlapEvaluator::new(self.gamma, self.overlap_basis)
    }

    /// Similarity thresholds for these parameters.
    pub fn similarity_tolerance(&self) -> SimilarityTolerance {
        SimilarityTolerance {
            edge_fraction: self.similarity_edge_tolerance,
            time_fraction: self.similarity_time_tolerance,
        }
    }

    /// Deterministic fingerprint of the parameters that affect results.
    ///
    /// `emit_listing` only controls diagnostics and is left out.
    pub fn params_hash(&self) -> Result<String, ConfigError> {
        let quantized = QuantizedConfig {
            search_mode: self.search_mode,
            k_paths: self.k_paths,
            gamma: quantize_float(self.gamma),
            overlap_basis: self.overlap_basis,
            costing_mode: self.costing_mode,
            kpath_cutoff_factor: quantize_float(self.kpath_cutoff_factor),
            similarity_edge_tolerance: quantize_float(self.similarity_edge_tolerance),
            similarity_time_tolerance: quantize_float(self.similarity_time_tolerance),
        };
        Ok(canonical_hash_hex(&quantized)?)
    }
}
