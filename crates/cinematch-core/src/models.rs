//! Core data models.
//!
//! These types are the typed replacement for the three tables the
//! data-access layer supplies: users (an id set), movies and ratings.

use serde::Serialize;

/// Opaque user identifier.
pub type UserId = u32;

/// Opaque movie identifier.
pub type MovieId = u32;

/// A movie with its ordered, possibly empty, genre list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
}

impl Movie {
    pub fn new(id: MovieId, title: impl Into<String>, genres: Vec<String>) -> Self {
        Self {
            id,
            title: title.into(),
            genres,
        }
    }
}

/// One `(user, movie, score)` row. Duplicate rows for the same pair are
/// allowed and averaged by the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub rating: f64,
    /// Unix timestamp, when the source provides one.
    pub timestamp: Option<i64>,
}

impl Rating {
    pub fn new(user_id: UserId, movie_id: MovieId, rating: f64) -> Self {
        Self {
            user_id,
            movie_id,
            rating,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, ts: i64) -> Self {
        self.timestamp = Some(ts);
        self
    }
}

/// Read-only projection of one user's ratings, keyed by movie id.
///
/// Entries are sorted by movie id and hold at most one value per movie
/// (the mean of any duplicate rows).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingVector {
    entries: Vec<(MovieId, f64)>,
}

impl RatingVector {
    /// Build from raw `(movie, score)` pairs, averaging duplicates.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (MovieId, f64)>) -> Self {
        let mut raw: Vec<(MovieId, f64)> = pairs.into_iter().collect();
        raw.sort_by_key(|(m, _)| *m);

        let mut entries: Vec<(MovieId, f64)> = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            let movie = raw[i].0;
            let mut sum = 0.0;
            let mut n = 0usize;
            while i < raw.len() && raw[i].0 == movie {
                sum += raw[i].1;
                n += 1;
                i += 1;
            }
            entries.push((movie, sum / n as f64));
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The user's (deduplicated) score for `movie`.
    pub fn get(&self, movie: MovieId) -> Option<f64> {
        self.entries
            .binary_search_by_key(&movie, |(m, _)| *m)
            .ok()
            .map(|idx| self.entries[idx].1)
    }

    pub fn contains(&self, movie: MovieId) -> bool {
        self.get(movie).is_some()
    }

    /// Entries in ascending movie-id order.
    pub fn iter(&self) -> impl Iterator<Item = (MovieId, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Mean over the deduplicated entries, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let sum: f64 = self.entries.iter().map(|(_, r)| r).sum();
        Some(sum / self.entries.len() as f64)
    }

    /// Aligned score pairs over the movies both vectors contain, in
    /// ascending movie-id order. `(self score, other score)`.
    pub fn co_rated(&self, other: &RatingVector) -> Vec<(f64, f64)> {
        let (a, b) = (&self.entries, &other.entries);
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    out.push((a[i].1, b[j].1));
                    i += 1;
                    j += 1;
                }
            }
        }
        out
    }
}
