//! Rating aggregation: recommendations and point predictions.
//!
//! Both operations read neighbours' rating vectors from the store, so
//! duplicate rows for a `(user, movie)` pair have already been averaged
//! and each neighbour contributes at most one score per movie.
//!
//! # Recommendation algorithm
//!
//! 1. Collect every movie rated by at least one neighbour.
//! 2. Drop movies the target already rated.
//! 3. Drop movies rated by fewer than `min_support` distinct neighbours.
//! 4. Reduce each remaining movie's scores with the [`Aggregator`].
//! 5. Sort by score (desc), support (desc), movie id (asc).
//!
//! The full ranking is returned; callers truncate for display.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecError, RecResult};
use crate::models::{MovieId, UserId};
use crate::neighbours::Neighbour;
use crate::store::RatingStore;

pub const DEFAULT_MIN_SUPPORT: usize = 5;

/// How neighbour scores for one movie are reduced to a single value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    /// Arithmetic mean.
    #[default]
    #[serde(alias = "average")]
    Mean,
    /// Middle value; mean of the two middle values for even counts.
    Median,
    /// Mean weighted by each neighbour's similarity. Non-positive weights
    /// are ignored; with no positive weight this is the plain mean.
    Weighted,
}

impl Aggregator {
    /// Reduce `(score, weight)` pairs. `values` must not be empty.
    fn reduce(&self, values: &[(f64, f64)]) -> f64 {
        match self {
            Aggregator::Mean => mean(values.iter().map(|(s, _)| *s)),
            Aggregator::Median => {
                let mut scores: Vec<f64> = values.iter().map(|(s, _)| *s).collect();
                scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = scores.len() / 2;
                if scores.len() % 2 == 0 {
                    (scores[mid - 1] + scores[mid]) / 2.0
                } else {
                    scores[mid]
                }
            }
            Aggregator::Weighted => {
                let (num, den) = values
                    .iter()
                    .filter(|(_, w)| *w > 0.0)
                    .fold((0.0, 0.0), |(num, den), (s, w)| (num + s * w, den + w));
                if den > 0.0 {
                    num / den
                } else {
                    mean(values.iter().map(|(s, _)| *s))
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregator::Mean => "mean",
            Aggregator::Median => "median",
            Aggregator::Weighted => "weighted",
        }
    }
}

impl FromStr for Aggregator {
    type Err = RecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" | "average" => Ok(Aggregator::Mean),
            "median" => Ok(Aggregator::Median),
            "weighted" => Ok(Aggregator::Weighted),
            other => Err(RecError::InvalidParameter(format!(
                "unknown aggregator '{}'. Use mean, median, or weighted.",
                other
            ))),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    sum / n as f64
}

/// Recommendation tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendParams {
    /// Minimum distinct neighbours that must have rated a movie.
    pub min_support: usize,
    pub aggregator: Aggregator,
}

impl Default for RecommendParams {
    fn default() -> Self {
        Self {
            min_support: DEFAULT_MIN_SUPPORT,
            aggregator: Aggregator::Mean,
        }
    }
}

/// A recommended movie with its aggregated neighbour score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Recommendation {
    pub movie_id: MovieId,
    pub score: f64,
    /// Distinct neighbours who rated the movie.
    pub support: usize,
}

/// Rank movies the target has not rated by aggregated neighbour score.
///
/// # Errors
///
/// - [`RecError::InvalidUser`] if `target` is not a known user.
/// - [`RecError::ColdUser`] if `target` has no ratings.
/// - [`RecError::EmptyResult`] if no candidate survives support filtering.
pub fn recommend<S: RatingStore + ?Sized>(
    target: UserId,
    neighbours: &[Neighbour],
    store: &S,
    params: &RecommendParams,
) -> RecResult<Vec<Recommendation>> {
    if !store.contains_user(target) {
        return Err(RecError::InvalidUser(target));
    }
    let seen = store.by_user(target).ok_or(RecError::ColdUser(target))?;

    let started = Instant::now();
    let mut used: HashSet<UserId> = HashSet::new();
    let mut candidates: BTreeMap<MovieId, Vec<(f64, f64)>> = BTreeMap::new();

    for n in neighbours {
        if n.user_id == target || !used.insert(n.user_id) {
            continue;
        }
        let Some(vector) = store.by_user(n.user_id) else {
            continue;
        };
        for (movie, score) in vector.iter() {
            if seen.contains(movie) {
                continue;
            }
            candidates.entry(movie).or_default().push((score, n.score));
        }
    }

    let mut ranked: Vec<Recommendation> = candidates
        .into_iter()
        .filter(|(_, values)| values.len() >= params.min_support)
        .map(|(movie_id, values)| Recommendation {
            movie_id,
            score: params.aggregator.reduce(&values),
            support: values.len(),
        })
        .collect();

    if ranked.is_empty() {
        return Err(RecError::EmptyResult {
            min_support: params.min_support,
        });
    }

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.support.cmp(&a.support))
            .then(a.movie_id.cmp(&b.movie_id))
    });

    debug!(
        user = target,
        neighbours = used.len(),
        candidates = ranked.len(),
        aggregator = params.aggregator.as_str(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "recommendations ranked"
    );

    Ok(ranked)
}

/// Where a [`Prediction`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionSource {
    /// Mean of this many neighbours' ratings for the movie.
    Neighbours { count: usize },
    /// No neighbour rated the movie; the target's own mean rating.
    UserMean,
}

/// A point prediction for one `(user, movie)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Unrounded score, suitable for ranking.
    pub score: f64,
    pub source: PredictionSource,
}

impl Prediction {
    /// Nearest whole rating unit, for contexts that score integer ratings.
    pub fn rounded(&self) -> f64 {
        self.score.round()
    }
}

/// Predict `target`'s rating of `movie` from its neighbours.
///
/// Falls back to the target's mean over its full history when no
/// neighbour rated the movie.
///
/// # Errors
///
/// - [`RecError::InvalidUser`] if `target` is not a known user.
/// - [`RecError::ColdUser`] if `target` has no ratings. Its neighbours
///   would all have score 0, so their mean carries no signal.
pub fn predict<S: RatingStore + ?Sized>(
    target: UserId,
    movie: MovieId,
    neighbours: &[Neighbour],
    store: &S,
) -> RecResult<Prediction> {
    if !store.contains_user(target) {
        return Err(RecError::InvalidUser(target));
    }
    let own_mean = store.user_mean(target).ok_or(RecError::ColdUser(target))?;

    let mut used: HashSet<UserId> = HashSet::new();
    let scores: Vec<f64> = neighbours
        .iter()
        .filter(|n| n.user_id != target && used.insert(n.user_id))
        .filter_map(|n| store.by_user(n.user_id)?.get(movie))
        .collect();

    if scores.is_empty() {
        return Ok(Prediction {
            score: own_mean,
            source: PredictionSource::UserMean,
        });
    }

    Ok(Prediction {
        score: mean(scores.iter().copied()),
        source: PredictionSource::Neighbours {
            count: scores.len(),
        },
    })
}
