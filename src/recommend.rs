//! Neighbour, recommendation and prediction commands.
//!
//! All three share the same pipeline: load the store, select the target's
//! neighbours with the configured similarity, then rank or predict from
//! them. Output is a plain-text table or, with `--json`, a single JSON
//! document on stdout.

use anyhow::{anyhow, Result};
use cinematch_core::aggregate::{predict, recommend, Prediction, PredictionSource, Recommendation};
use cinematch_core::models::{MovieId, UserId};
use cinematch_core::neighbours::{select_neighbours, Neighbour};
use cinematch_core::store::RatingStore;
use cinematch_core::RecError;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

use crate::config::Config;
use crate::dataset;

/// Turn a core error into a CLI error. Unknown users get the valid id
/// range as a hint.
pub fn describe_error<S: RatingStore + ?Sized>(err: RecError, store: &S) -> anyhow::Error {
    match err {
        RecError::InvalidUser(user) => match store.user_id_range() {
            Some((lo, hi)) => anyhow!(
                "user {} not found. Known user ids range from {} to {}.",
                user,
                lo,
                hi
            ),
            None => anyhow!("user {} not found. The dataset has no users.", user),
        },
        RecError::EmptyResult { min_support } => anyhow!(
            "no movie was rated by at least {} neighbours. Try a lower --min-support or a larger --k.",
            min_support
        ),
        other => other.into(),
    }
}

fn neighbours_for<S: RatingStore + ?Sized>(
    config: &Config,
    user: UserId,
    store: &S,
) -> Result<Vec<Neighbour>> {
    let started = Instant::now();
    let neighbours = select_neighbours(user, store, &config.neighbour_params())
        .map_err(|e| describe_error(e, store))?;
    debug!(
        user,
        found = neighbours.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "neighbours selected"
    );
    Ok(neighbours)
}

pub fn run_neighbours(config: &Config, user: UserId, json: bool) -> Result<()> {
    let store = dataset::load_store(&config.data)?;
    let neighbours = neighbours_for(config, user, &store)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&neighbours)?);
        return Ok(());
    }

    if neighbours.is_empty() {
        println!("No neighbours.");
        return Ok(());
    }

    println!("  {:>4}  {:>7}  {:>8}  {}", "RANK", "USER", "SCORE", "CO-RATED");
    for (i, n) in neighbours.iter().enumerate() {
        println!(
            "  {:>4}  {:>7}  {:>8.4}  {}",
            i + 1,
            n.user_id,
            n.score,
            n.co_rated
        );
    }
    Ok(())
}

/// A recommendation joined with its movie metadata.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationView {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    pub title: Option<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct RecommendOutput {
    user_id: UserId,
    neighbours: usize,
    aggregator: &'static str,
    min_support: usize,
    results: Vec<RecommendationView>,
}

pub fn run_recommend(config: &Config, user: UserId, limit: Option<usize>, json: bool) -> Result<()> {
    let store = dataset::load_store(&config.data)?;
    let neighbours = neighbours_for(config, user, &store)?;
    let params = config.recommend_params();

    let ranked =
        recommend(user, &neighbours, &store, &params).map_err(|e| describe_error(e, &store))?;

    let limit = limit.unwrap_or(config.recommend.limit);
    let results: Vec<RecommendationView> = ranked
        .into_iter()
        .take(limit)
        .map(|r| {
            let movie = store.movie(r.movie_id);
            RecommendationView {
                recommendation: r,
                title: movie.map(|m| m.title.clone()),
                genres: movie.map(|m| m.genres.clone()).unwrap_or_default(),
            }
        })
        .collect();

    if json {
        let output = RecommendOutput {
            user_id: user,
            neighbours: neighbours.len(),
            aggregator: params.aggregator.as_str(),
            min_support: params.min_support,
            results,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "Recommendations for user {} ({} neighbours, {} aggregator, min support {}):",
        user,
        neighbours.len(),
        params.aggregator.as_str(),
        params.min_support
    );
    println!();
    for (i, v) in results.iter().enumerate() {
        let r = &v.recommendation;
        println!(
            "{}. [{:.2}] {} (support {})",
            i + 1,
            r.score,
            v.title.as_deref().unwrap_or("(untitled)"),
            r.support
        );
        if !v.genres.is_empty() {
            println!("    genres: {}", v.genres.join(", "));
        }
        println!("    movie: {}", r.movie_id);
        println!();
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
struct PredictOutput {
    user_id: UserId,
    movie_id: MovieId,
    title: Option<String>,
    #[serde(flatten)]
    prediction: Prediction,
    rounded: f64,
    /// The user's own rating when one exists.
    actual: Option<f64>,
}

pub fn run_predict(config: &Config, user: UserId, movie: MovieId, json: bool) -> Result<()> {
    let store = dataset::load_store(&config.data)?;
    if store.movie(movie).is_none() && store.by_movie(movie).is_empty() {
        return Err(RecError::UnknownMovie(movie).into());
    }

    let neighbours = neighbours_for(config, user, &store)?;
    let prediction =
        predict(user, movie, &neighbours, &store).map_err(|e| describe_error(e, &store))?;

    let output = PredictOutput {
        user_id: user,
        movie_id: movie,
        title: store.movie(movie).map(|m| m.title.clone()),
        rounded: prediction.rounded(),
        prediction,
        actual: store.by_user(user).and_then(|v| v.get(movie)),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "User {} / {}: predicted {:.3} (rounded {})",
        user,
        output.title.as_deref().unwrap_or("(untitled)"),
        output.prediction.score,
        output.rounded
    );
    match output.prediction.source {
        PredictionSource::Neighbours { count } => {
            println!("  source: mean of {} neighbour ratings", count)
        }
        PredictionSource::UserMean => println!("  source: user mean (no neighbour rated it)"),
    }
    if let Some(actual) = output.actual {
        println!("  actual: {}", actual);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinematch_core::store::memory::InMemoryRatingStore;

    #[test]
    fn invalid_user_message_names_range() {
        let store = InMemoryRatingStore::new([3, 8, 5], vec![], vec![]);
        let msg = describe_error(RecError::InvalidUser(99), &store).to_string();
        assert!(msg.contains("99"), "{}", msg);
        assert!(msg.contains("from 3 to 8"), "{}", msg);
    }

    #[test]
    fn other_errors_pass_through() {
        let store = InMemoryRatingStore::new([1], vec![], vec![]);
        let msg = describe_error(RecError::ColdUser(1), &store).to_string();
        assert_eq!(msg, "user 1 has no ratings");
    }
}
