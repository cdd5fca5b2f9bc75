//! Pairwise user similarity.
//!
//! Similarity is the Pearson correlation of two users' scores over their
//! co-rated movies, each side centred on its own mean *over the co-rated
//! set* (not the user's global mean).
//!
//! # Guards
//!
//! - Fewer than `min_co_rated` co-rated movies (default 5): the score is
//!   `0.0`, meaning "no correlation assumed" rather than "unknown".
//! - Zero variance: when either side's sum of squared deviations is
//!   exactly zero, `zero_variance_epsilon` (default 0.02) is added to
//!   *both* sums before dividing. This is an approximation that keeps the
//!   score finite, not a statistically pure correlation.
//!
//! The result is a ranking key. With `use_absolute_similarity` the
//! magnitude is used, so strongly anti-correlated users rank as highly as
//! correlated ones.

use serde::{Deserialize, Serialize};

use crate::models::{RatingVector, UserId};
use crate::store::RatingStore;

pub const DEFAULT_MIN_CO_RATED: usize = 5;
pub const DEFAULT_ZERO_VARIANCE_EPSILON: f64 = 0.02;

/// Tuning for [`similarity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Minimum co-rated movies before a correlation is computed.
    pub min_co_rated: usize,
    /// Added to both variance sums when either is zero.
    pub zero_variance_epsilon: f64,
    /// Rank by `|r|` instead of the signed correlation.
    pub use_absolute_similarity: bool,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            min_co_rated: DEFAULT_MIN_CO_RATED,
            zero_variance_epsilon: DEFAULT_ZERO_VARIANCE_EPSILON,
            use_absolute_similarity: false,
        }
    }
}

/// A similarity score together with the size of the evidence behind it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Similarity {
    pub score: f64,
    pub co_rated: usize,
}

/// Similarity between two users of `store`. Pure; symmetric in `a`/`b`.
pub fn similarity<S: RatingStore + ?Sized>(
    a: UserId,
    b: UserId,
    store: &S,
    config: &SimilarityConfig,
) -> f64 {
    pearson(&store.co_rated_with(a, b), config)
}

/// Similarity between two precomputed rating vectors.
pub fn similarity_of(a: &RatingVector, b: &RatingVector, config: &SimilarityConfig) -> Similarity {
    let pairs = a.co_rated(b);
    Similarity {
        score: pearson(&pairs, config),
        co_rated: pairs.len(),
    }
}

/// Guarded Pearson correlation over aligned `(a, b)` score pairs.
pub fn pearson(pairs: &[(f64, f64)], config: &SimilarityConfig) -> f64 {
    let n = pairs.len();
    if n == 0 || n < config.min_co_rated {
        return 0.0;
    }

    let mean_a = pairs.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let mean_b = pairs.iter().map(|(_, y)| y).sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        var_a += config.zero_variance_epsilon;
        var_b += config.zero_variance_epsilon;
    }

    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        // epsilon configured as 0 with a constant column
        return 0.0;
    }

    let r = cov / denom;
    if config.use_absolute_similarity {
        r.abs()
    } else {
        r
    }
}
