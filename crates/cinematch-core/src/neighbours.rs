//! k-nearest-neighbour selection.
//!
//! Scores every other known user against the target with
//! [`similarity_of`](crate::similarity::similarity_of), sorts descending and
//! keeps the first `k`.
//!
//! # Ordering
//!
//! The sort is stable over the store's user order (ascending id), so
//! users with equal scores keep ascending-id order. Identical inputs
//! always produce identical neighbour sets.
//!
//! # Cost
//!
//! One similarity per known user, each linear in the two users' rating
//! counts (sorted-merge intersection over precomputed vectors). The target
//! vector is looked up once per call.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecError, RecResult};
use crate::models::{RatingVector, UserId};
use crate::similarity::{similarity_of, SimilarityConfig};
use crate::store::RatingStore;

pub const DEFAULT_K: usize = 50;

/// A user judged similar to the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbour {
    pub user_id: UserId,
    pub score: f64,
    /// Number of movies both users rated.
    pub co_rated: usize,
}

/// Neighbour selection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighbourParams {
    /// Maximum neighbours to keep.
    pub k: usize,
    /// When set, neighbours must score strictly above this value.
    pub min_similarity: Option<f64>,
    pub similarity: SimilarityConfig,
}

impl Default for NeighbourParams {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            min_similarity: None,
            similarity: SimilarityConfig::default(),
        }
    }
}

/// The `k` users most similar to `target`, best first.
///
/// Never contains `target`. Returns every other user when fewer than `k`
/// exist.
pub fn find_k_nearest<S: RatingStore + ?Sized>(
    target: UserId,
    store: &S,
    k: usize,
    config: &SimilarityConfig,
) -> RecResult<Vec<Neighbour>> {
    if k == 0 {
        return Err(RecError::InvalidParameter("k must be >= 1".to_string()));
    }
    if !store.contains_user(target) {
        return Err(RecError::InvalidUser(target));
    }

    let started = Instant::now();
    let empty = RatingVector::default();
    let target_vec = store.by_user(target).unwrap_or(&empty);

    let mut ranked: Vec<Neighbour> = store
        .users()
        .iter()
        .copied()
        .filter(|&u| u != target)
        .map(|u| {
            let sim = match store.by_user(u) {
                Some(v) => similarity_of(target_vec, v, config),
                None => Default::default(),
            };
            Neighbour {
                user_id: u,
                score: sim.score,
                co_rated: sim.co_rated,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(k);

    debug!(
        user = target,
        k,
        found = ranked.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "nearest neighbours computed"
    );

    Ok(ranked)
}

/// [`find_k_nearest`] followed by the optional `min_similarity` cut.
///
/// An empty result is not an error here; recommendation reports it as
/// [`RecError::EmptyResult`].
pub fn select_neighbours<S: RatingStore + ?Sized>(
    target: UserId,
    store: &S,
    params: &NeighbourParams,
) -> RecResult<Vec<Neighbour>> {
    let mut neighbours = find_k_nearest(target, store, params.k, &params.similarity)?;
    if let Some(min) = params.min_similarity {
        neighbours.retain(|n| n.score > min);
    }
    Ok(neighbours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Movie, Rating};
    use crate::store::memory::InMemoryRatingStore;

    fn scored_store(rows: &[(UserId, [f64; 5])], extra_users: &[UserId]) -> InMemoryRatingStore {
        let movies = (1..=5).map(|id| Movie::new(id, format!("m{id}"), vec![])).collect();
        let mut ratings = Vec::new();
        for (user, scores) in rows {
            for (m, s) in (1..=5).zip(scores.iter()) {
                ratings.push(Rating::new(*user, m, *s));
            }
        }
        let users = rows.iter().map(|(u, _)| *u).chain(extra_users.iter().copied());
        InMemoryRatingStore::new(users, movies, ratings)
    }

    #[test]
    fn ranks_descending_and_excludes_target() {
        let store = scored_store(
            &[
                (1, [5.0, 4.0, 3.0, 2.0, 1.0]),
                (2, [1.0, 2.0, 3.0, 4.0, 5.0]),
                (3, [5.0, 4.0, 3.0, 2.0, 1.0]),
                (4, [4.0, 5.0, 3.0, 1.0, 2.0]),
            ],
            &[],
        );
        let n = find_k_nearest(1, &store, 10, &SimilarityConfig::default()).unwrap();
        let ids: Vec<UserId> = n.iter().map(|n| n.user_id).collect();
        assert_eq!(ids, vec![3, 4, 2]);
        assert!(n.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(n[0].co_rated, 5);
    }

    #[test]
    fn truncates_to_k() {
        let store = scored_store(
            &[
                (1, [5.0, 4.0, 3.0, 2.0, 1.0]),
                (2, [5.0, 4.0, 3.0, 2.0, 1.0]),
                (3, [5.0, 4.0, 3.0, 2.0, 1.0]),
            ],
            &[],
        );
        let n = find_k_nearest(1, &store, 1, &SimilarityConfig::default()).unwrap();
        assert_eq!(n.len(), 1);
    }

    #[test]
    fn ties_keep_ascending_user_order() {
        // users 7, 3, 5 have no co-rated evidence, all score 0
        let store = scored_store(&[(1, [5.0, 4.0, 3.0, 2.0, 1.0])], &[7, 3, 5]);
        let n = find_k_nearest(1, &store, 10, &SimilarityConfig::default()).unwrap();
        let ids: Vec<UserId> = n.iter().map(|n| n.user_id).collect();
        assert_eq!(ids, vec![3, 5, 7]);
    }

    #[test]
    fn unknown_target_is_invalid_user() {
        let store = scored_store(&[(1, [5.0, 4.0, 3.0, 2.0, 1.0])], &[]);
        let err = find_k_nearest(42, &store, 5, &SimilarityConfig::default()).unwrap_err();
        assert_eq!(err, RecError::InvalidUser(42));
    }

    #[test]
    fn zero_k_is_rejected() {
        let store = scored_store(&[(1, [5.0, 4.0, 3.0, 2.0, 1.0])], &[]);
        assert!(matches!(
            find_k_nearest(1, &store, 0, &SimilarityConfig::default()),
            Err(RecError::InvalidParameter(_))
        ));
    }

    #[test]
    fn min_similarity_filters_strictly() {
        let store = scored_store(
            &[
                (1, [5.0, 4.0, 3.0, 2.0, 1.0]),
                (2, [5.0, 4.0, 3.0, 2.0, 1.0]),
                (3, [1.0, 2.0, 3.0, 4.0, 5.0]),
            ],
            &[9],
        );
        let params = NeighbourParams {
            k: 10,
            min_similarity: Some(0.0),
            ..Default::default()
        };
        let n = select_neighbours(1, &store, &params).unwrap();
        assert_eq!(n.iter().map(|n| n.user_id).collect::<Vec<_>>(), vec![2]);
    }
}
