//! In-memory [`RatingStore`] implementation.
//!
//! Built once from the three tables and immutable afterwards. Per-user
//! rating vectors are derived at construction; the per-movie index is
//! derived from them on the first [`RatingStore::by_movie`] call. Replacing
//! the snapshot (for example with a new train partition) means building a
//! new store, so nothing derived can go stale.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use crate::models::{Movie, MovieId, Rating, RatingVector, UserId};

use super::RatingStore;

/// Immutable in-memory snapshot of users, movies and ratings.
#[derive(Debug, Clone)]
pub struct InMemoryRatingStore {
    users: Vec<UserId>,
    movies: Vec<Movie>,
    movie_index: HashMap<MovieId, usize>,
    ratings: Vec<Rating>,
    by_user: HashMap<UserId, RatingVector>,
    movie_ratings: OnceLock<HashMap<MovieId, Vec<(UserId, f64)>>>,
}

impl InMemoryRatingStore {
    /// Build a store. `users` is the known user set; it may contain users
    /// without ratings. Ratings by users outside the set are kept and are
    /// visible through [`RatingStore::by_user`], but such users are never
    /// returned as neighbours.
    pub fn new(
        users: impl IntoIterator<Item = UserId>,
        mut movies: Vec<Movie>,
        ratings: Vec<Rating>,
    ) -> Self {
        let users: Vec<UserId> = users
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        movies.sort_by_key(|m| m.id);
        movies.dedup_by_key(|m| m.id);
        let movie_index = movies
            .iter()
            .enumerate()
            .map(|(idx, m)| (m.id, idx))
            .collect();

        let mut grouped: HashMap<UserId, Vec<(MovieId, f64)>> = HashMap::new();
        for r in &ratings {
            grouped
                .entry(r.user_id)
                .or_default()
                .push((r.movie_id, r.rating));
        }
        let by_user: HashMap<UserId, RatingVector> = grouped
            .into_iter()
            .map(|(user, pairs)| (user, RatingVector::from_pairs(pairs)))
            .collect();

        Self {
            users,
            movies,
            movie_index,
            ratings,
            by_user,
            movie_ratings: OnceLock::new(),
        }
    }

    fn movie_ratings(&self) -> &HashMap<MovieId, Vec<(UserId, f64)>> {
        self.movie_ratings.get_or_init(|| {
            let mut index: HashMap<MovieId, Vec<(UserId, f64)>> = HashMap::new();
            for (user, vector) in &self.by_user {
                for (movie, score) in vector.iter() {
                    index.entry(movie).or_default().push((*user, score));
                }
            }
            for list in index.values_mut() {
                list.sort_by_key(|(u, _)| *u);
            }
            index
        })
    }

    /// Number of users with at least one rating.
    pub fn rated_user_count(&self) -> usize {
        self.by_user.len()
    }
}

impl RatingStore for InMemoryRatingStore {
    fn users(&self) -> &[UserId] {
        &self.users
    }

    fn movies(&self) -> &[Movie] {
        &self.movies
    }

    fn movie(&self, id: MovieId) -> Option<&Movie> {
        self.movie_index.get(&id).map(|&idx| &self.movies[idx])
    }

    fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    fn by_user(&self, user: UserId) -> Option<&RatingVector> {
        self.by_user.get(&user)
    }

    fn by_movie(&self, movie: MovieId) -> &[(UserId, f64)] {
        self.movie_ratings()
            .get(&movie)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
