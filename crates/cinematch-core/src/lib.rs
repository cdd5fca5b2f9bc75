//! # cinematch core
//!
//! User-based collaborative filtering over a static ratings snapshot:
//! data models, the [`store::RatingStore`] abstraction, Pearson similarity,
//! k-nearest-neighbour selection, rating aggregation and train/test
//! evaluation.
//!
//! This crate performs no filesystem or terminal I/O. The calling
//! application loads the users/movies/ratings tables, builds a store and
//! passes it into every operation; there is no ambient dataset state.
//!
//! ## Pipeline
//!
//! ```text
//! RatingStore ─▶ similarity ─▶ neighbours ─▶ aggregate ─▶ evaluate
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cinematch_core::models::{Movie, Rating};
//! use cinematch_core::store::memory::InMemoryRatingStore;
//! use cinematch_core::similarity::{similarity, SimilarityConfig};
//!
//! let movies: Vec<Movie> = (1..=5).map(|id| Movie::new(id, format!("m{id}"), vec![])).collect();
//! let mut ratings = Vec::new();
//! for (m, s) in (1..=5).zip([5.0, 4.0, 3.0, 2.0, 1.0]) {
//!     ratings.push(Rating::new(1, m, s));
//!     ratings.push(Rating::new(2, m, s));
//! }
//! let store = InMemoryRatingStore::new([1, 2], movies, ratings);
//! let s = similarity(1, 2, &store, &SimilarityConfig::default());
//! assert!((s - 1.0).abs() < 1e-9);
//! ```

pub mod aggregate;
pub mod error;
pub mod evaluate;
pub mod models;
pub mod neighbours;
pub mod similarity;
pub mod split;
pub mod store;

pub use error::{RecError, RecResult};
