//! TOML configuration parsing and validation.
//!
//! Every section is optional; omitted keys take the defaults below. CLI
//! flags override individual values per command.
//!
//! ```toml
//! [data]
//! dir = "./data"
//!
//! [similarity]
//! min_co_rated = 5
//! zero_variance_epsilon = 0.02
//! use_absolute_similarity = false
//!
//! [neighbours]
//! k = 50
//! # min_similarity = 0.25
//!
//! [recommend]
//! min_support = 5
//! aggregator = "mean"
//! limit = 15
//!
//! [evaluation]
//! test_fraction = 0.2
//! max_users = 100
//! folds = 1
//! missing_policy = "skip"
//! round_predictions = true
//! parallel = true
//!
//! [logging]
//! level = "warn"
//! ```

use anyhow::{bail, Context, Result};
use cinematch_core::aggregate::{Aggregator, RecommendParams, DEFAULT_MIN_SUPPORT};
use cinematch_core::evaluate::{EvaluationParams, MissingPolicy};
use cinematch_core::neighbours::{NeighbourParams, DEFAULT_K};
use cinematch_core::similarity::{
    SimilarityConfig, DEFAULT_MIN_CO_RATED, DEFAULT_ZERO_VARIANCE_EPSILON,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub similarity: SimilaritySection,
    #[serde(default)]
    pub neighbours: NeighboursConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub users_file: Option<PathBuf>,
    #[serde(default)]
    pub movies_file: Option<PathBuf>,
    #[serde(default)]
    pub ratings_file: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            users_file: None,
            movies_file: None,
            ratings_file: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl DataConfig {
    pub fn users_path(&self) -> PathBuf {
        self.resolve(&self.users_file, "users.dat")
    }

    pub fn movies_path(&self) -> PathBuf {
        self.resolve(&self.movies_file, "movies.dat")
    }

    pub fn ratings_path(&self) -> PathBuf {
        self.resolve(&self.ratings_file, "ratings.dat")
    }

    fn resolve(&self, explicit: &Option<PathBuf>, file_name: &str) -> PathBuf {
        match explicit {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => self.dir.join(p),
            None => self.dir.join(file_name),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimilaritySection {
    #[serde(default = "default_min_co_rated")]
    pub min_co_rated: usize,
    #[serde(default = "default_epsilon")]
    pub zero_variance_epsilon: f64,
    #[serde(default)]
    pub use_absolute_similarity: bool,
}

impl Default for SimilaritySection {
    fn default() -> Self {
        Self {
            min_co_rated: default_min_co_rated(),
            zero_variance_epsilon: default_epsilon(),
            use_absolute_similarity: false,
        }
    }
}

fn default_min_co_rated() -> usize {
    DEFAULT_MIN_CO_RATED
}
fn default_epsilon() -> f64 {
    DEFAULT_ZERO_VARIANCE_EPSILON
}

#[derive(Debug, Deserialize, Clone)]
pub struct NeighboursConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub min_similarity: Option<f64>,
}

impl Default for NeighboursConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            min_similarity: None,
        }
    }
}

fn default_k() -> usize {
    DEFAULT_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecommendConfig {
    #[serde(default = "default_min_support")]
    pub min_support: usize,
    #[serde(default)]
    pub aggregator: Aggregator,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            min_support: default_min_support(),
            aggregator: Aggregator::default(),
            limit: default_limit(),
        }
    }
}

fn default_min_support() -> usize {
    DEFAULT_MIN_SUPPORT
}
fn default_limit() -> usize {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct EvaluationConfig {
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_max_users")]
    pub max_users: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_folds")]
    pub folds: usize,
    #[serde(default)]
    pub missing_policy: MissingPolicy,
    #[serde(default = "default_true")]
    pub round_predictions: bool,
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            max_users: default_max_users(),
            seed: None,
            folds: default_folds(),
            missing_policy: MissingPolicy::default(),
            round_predictions: true,
            parallel: true,
        }
    }
}

fn default_test_fraction() -> f64 {
    0.2
}
fn default_max_users() -> Option<usize> {
    Some(100)
}
fn default_folds() -> usize {
    1
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    pub fn similarity_config(&self) -> SimilarityConfig {
        SimilarityConfig {
            min_co_rated: self.similarity.min_co_rated,
            zero_variance_epsilon: self.similarity.zero_variance_epsilon,
            use_absolute_similarity: self.similarity.use_absolute_similarity,
        }
    }

    pub fn neighbour_params(&self) -> NeighbourParams {
        NeighbourParams {
            k: self.neighbours.k,
            min_similarity: self.neighbours.min_similarity,
            similarity: self.similarity_config(),
        }
    }

    pub fn recommend_params(&self) -> RecommendParams {
        RecommendParams {
            min_support: self.recommend.min_support,
            aggregator: self.recommend.aggregator,
        }
    }

    pub fn evaluation_params(&self) -> EvaluationParams {
        EvaluationParams {
            test_fraction: self.evaluation.test_fraction,
            max_users: self.evaluation.max_users,
            neighbours: self.neighbour_params(),
            missing_policy: self.evaluation.missing_policy,
            round_predictions: self.evaluation.round_predictions,
            parallel: self.evaluation.parallel,
            seed: self.evaluation.seed,
            folds: self.evaluation.folds,
        }
    }
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.similarity.min_co_rated == 0 {
        bail!("similarity.min_co_rated must be >= 1");
    }
    let eps = config.similarity.zero_variance_epsilon;
    if eps.is_nan() || eps < 0.0 {
        bail!("similarity.zero_variance_epsilon must be >= 0");
    }

    if config.neighbours.k == 0 {
        bail!("neighbours.k must be >= 1");
    }

    if config.recommend.limit == 0 {
        bail!("recommend.limit must be >= 1");
    }

    let e = &config.evaluation;
    if e.test_fraction.is_nan() || e.test_fraction <= 0.0 || e.test_fraction >= 1.0 {
        bail!("evaluation.test_fraction must be in (0.0, 1.0)");
    }
    if e.folds == 0 {
        bail!("evaluation.folds must be >= 1");
    }
    if e.max_users == Some(0) {
        bail!("evaluation.max_users must be >= 1 when set");
    }

    Ok(())
}
