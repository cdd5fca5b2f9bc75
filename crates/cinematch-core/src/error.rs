//! Error taxonomy for the recommendation engine.
//!
//! Every exceptional condition is returned to the caller as a [`RecError`]
//! variant; nothing in the core terminates the process. Too few co-rated
//! movies for a similarity is not an error at all: it yields the defined
//! score `0.0`.

use crate::models::{MovieId, UserId};

/// Recoverable engine errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecError {
    /// The target user is not in the store's user set.
    #[error("user {0} not found")]
    InvalidUser(UserId),

    /// The target user has no ratings, so no mean or neighbour signal exists.
    #[error("user {0} has no ratings")]
    ColdUser(UserId),

    /// Support filtering removed every candidate movie. The caller may
    /// retry with a lower `min_support` or similarity threshold.
    #[error("no candidate movie has at least {min_support} neighbour ratings")]
    EmptyResult { min_support: usize },

    /// No test row could be scored, so MAE/RMSE are undefined.
    #[error("evaluation scored no test rows ({test_rows} held out)")]
    EmptyEvaluation { test_rows: usize },

    /// A movie id the caller asked about is unknown to the store.
    #[error("movie {0} not found")]
    UnknownMovie(MovieId),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type RecResult<T> = Result<T, RecError>;
