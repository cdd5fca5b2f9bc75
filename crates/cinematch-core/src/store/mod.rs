//! Rating storage abstraction.
//!
//! The [`RatingStore`] trait is the engine's only view of the dataset: a
//! read-only snapshot of users, movies and ratings with named lookups. The
//! engine never mutates a store. Per-user rating vectors are expected to be
//! precomputed by implementations, since neighbour search reads every
//! user's vector once per query.
//!
//! Implementations must be `Send + Sync` so evaluation can fan out across
//! threads over a shared snapshot.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`users`](RatingStore::users) | Known user ids, ascending |
//! | [`movies`](RatingStore::movies) / [`movie`](RatingStore::movie) | Movie metadata |
//! | [`ratings`](RatingStore::ratings) | Raw rating rows |
//! | [`by_user`](RatingStore::by_user) | One user's deduplicated [`RatingVector`] |
//! | [`by_movie`](RatingStore::by_movie) | Every user's score for one movie |
//! | [`co_rated_with`](RatingStore::co_rated_with) | Aligned scores over two users' co-rated set |

pub mod memory;

use crate::models::{Movie, MovieId, Rating, RatingVector, UserId};

pub trait RatingStore: Send + Sync {
    /// Known user ids in ascending order. This order is the tie-break
    /// order for equal similarity scores.
    fn users(&self) -> &[UserId];

    /// All movies, ascending by id.
    fn movies(&self) -> &[Movie];

    fn movie(&self, id: MovieId) -> Option<&Movie>;

    /// Raw rating rows as supplied, duplicates included.
    fn ratings(&self) -> &[Rating];

    /// The user's rating vector, or `None` when the user rated nothing.
    fn by_user(&self, user: UserId) -> Option<&RatingVector>;

    /// `(user, score)` pairs for one movie, ascending by user id, one
    /// entry per user.
    fn by_movie(&self, movie: MovieId) -> &[(UserId, f64)];

    fn contains_user(&self, user: UserId) -> bool {
        self.users().binary_search(&user).is_ok()
    }

    /// Smallest and largest known user id.
    fn user_id_range(&self) -> Option<(UserId, UserId)> {
        let users = self.users();
        Some((*users.first()?, *users.last()?))
    }

    /// Aligned `(a, b)` scores over the movies both users rated.
    fn co_rated_with(&self, a: UserId, b: UserId) -> Vec<(f64, f64)> {
        match (self.by_user(a), self.by_user(b)) {
            (Some(va), Some(vb)) => va.co_rated(vb),
            _ => Vec::new(),
        }
    }

    /// Mean over the user's full (deduplicated) history.
    fn user_mean(&self, user: UserId) -> Option<f64> {
        self.by_user(user).and_then(RatingVector::mean)
    }
}
