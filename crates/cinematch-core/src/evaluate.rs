//! Train/test evaluation of neighbour-based predictions.
//!
//! # Algorithm
//!
//! 1. Split the store's rating rows at random into train and test
//!    ([`crate::split`]); build a fresh train store.
//! 2. Group test rows by user in order of first appearance and keep the
//!    first `max_users` users.
//! 3. Per user (in parallel when enabled): select neighbours from the
//!    **train** store only, then [`predict`] every held-out movie.
//! 4. Accumulate absolute and squared errors over scored rows and report
//!    MAE, RMSE and coverage.
//!
//! Users with no train-side ratings cannot be predicted. Under
//! [`MissingPolicy::Skip`] their rows are excluded from the denominator;
//! under [`MissingPolicy::ZeroPenalty`] they are scored as a prediction of
//! `0`, which is a stricter policy.
//!
//! Per-user outcomes are collected in processing order and reduced
//! sequentially, so parallel and sequential runs report identical numbers.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::predict;
use crate::error::{RecError, RecResult};
use crate::models::{Rating, UserId};
use crate::neighbours::{select_neighbours, NeighbourParams};
use crate::split::{rng_from_seed, train_test_split};
use crate::store::memory::InMemoryRatingStore;
use crate::store::RatingStore;

/// What to do with a test row that cannot be predicted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Exclude the row from scoring.
    #[default]
    Skip,
    /// Score the row as if `0` had been predicted.
    ZeroPenalty,
}

impl MissingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingPolicy::Skip => "skip",
            MissingPolicy::ZeroPenalty => "zero_penalty",
        }
    }
}

impl FromStr for MissingPolicy {
    type Err = RecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(MissingPolicy::Skip),
            "zero_penalty" | "zero-penalty" => Ok(MissingPolicy::ZeroPenalty),
            other => Err(RecError::InvalidParameter(format!(
                "unknown missing policy '{}'. Use skip or zero_penalty.",
                other
            ))),
        }
    }
}

/// Evaluation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationParams {
    /// Fraction of rating rows held out, in `(0, 1)`.
    pub test_fraction: f64,
    /// Cap on test users evaluated per fold; `None` evaluates all.
    pub max_users: Option<usize>,
    /// Neighbourhood used for every prediction.
    pub neighbours: NeighbourParams,
    pub missing_policy: MissingPolicy,
    /// Round predictions to whole rating units before scoring.
    pub round_predictions: bool,
    /// Evaluate test users on the rayon thread pool.
    pub parallel: bool,
    /// Seed for the split RNG; entropy when unset.
    pub seed: Option<u64>,
    /// Number of independent random splits.
    pub folds: usize,
}

impl Default for EvaluationParams {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            max_users: Some(100),
            neighbours: NeighbourParams::default(),
            missing_policy: MissingPolicy::Skip,
            round_predictions: true,
            parallel: true,
            seed: None,
            folds: 1,
        }
    }
}

/// Metrics for one train/test split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Mean absolute error over scored rows.
    pub mae: f64,
    /// Root mean squared error over scored rows.
    pub rmse: f64,
    /// Test rows actually scored.
    pub coverage: usize,
    /// Rows in the test partition.
    pub test_rows: usize,
    /// Rows belonging to the evaluated users.
    pub rows_considered: usize,
    pub users_evaluated: usize,
    /// Rows that could not be predicted and were left out.
    pub skipped: usize,
}

/// Metrics across all folds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    /// Mean of per-fold MAE.
    pub mae: f64,
    /// Mean of per-fold RMSE.
    pub rmse: f64,
    /// Scored rows summed over folds.
    pub coverage: usize,
    /// Reports of the folds that scored at least one row.
    pub folds: Vec<EvaluationReport>,
    /// Folds that scored no rows and are left out of the averages.
    pub empty_folds: usize,
}

/// Receives per-user progress during evaluation. Called from worker
/// threads when evaluation runs in parallel.
pub trait EvaluationProgress: Send + Sync {
    fn user_done(&self, user: UserId, done: usize, total: usize);
}

/// Progress sink that discards events.
pub struct NoProgress;

impl EvaluationProgress for NoProgress {
    fn user_done(&self, _user: UserId, _done: usize, _total: usize) {}
}

#[derive(Default)]
struct UserOutcome {
    abs_sum: f64,
    sq_sum: f64,
    scored: usize,
    skipped: usize,
}

impl UserOutcome {
    fn record(&mut self, predicted: f64, actual: f64) {
        let err = predicted - actual;
        self.abs_sum += err.abs();
        self.sq_sum += err * err;
        self.scored += 1;
    }
}

/// Split `store`'s ratings `params.folds` times and evaluate each split.
pub fn evaluate<S: RatingStore + ?Sized>(
    store: &S,
    params: &EvaluationParams,
    progress: &dyn EvaluationProgress,
) -> RecResult<EvaluationSummary> {
    if params.folds == 0 {
        return Err(RecError::InvalidParameter("folds must be >= 1".to_string()));
    }

    let mut rng = rng_from_seed(params.seed);
    let mut folds = Vec::with_capacity(params.folds);
    let mut empty_folds = 0;
    let mut held_out = 0;

    for fold in 0..params.folds {
        let split = train_test_split(store.ratings(), params.test_fraction, &mut rng)?;
        let train = InMemoryRatingStore::new(
            store.users().iter().copied(),
            store.movies().to_vec(),
            split.train,
        );
        debug!(
            fold,
            train_rows = train.ratings().len(),
            test_rows = split.test.len(),
            "split ratings"
        );
        match evaluate_split(&train, &split.test, params, progress) {
            Ok(report) => folds.push(report),
            Err(RecError::EmptyEvaluation { test_rows }) => {
                warn!(fold, test_rows, "fold scored no rows; left out of the averages");
                empty_folds += 1;
                held_out = test_rows;
            }
            Err(e) => return Err(e),
        }
    }

    let summary = summarize(folds, empty_folds, held_out)?;

    info!(
        folds = params.folds,
        empty_folds = summary.empty_folds,
        mae = summary.mae,
        rmse = summary.rmse,
        coverage = summary.coverage,
        "evaluation finished"
    );

    Ok(summary)
}

/// Average the scored folds. Fails only when no fold scored anything.
fn summarize(
    folds: Vec<EvaluationReport>,
    empty_folds: usize,
    held_out: usize,
) -> RecResult<EvaluationSummary> {
    if folds.is_empty() {
        return Err(RecError::EmptyEvaluation {
            test_rows: held_out,
        });
    }
    let n = folds.len() as f64;
    Ok(EvaluationSummary {
        mae: folds.iter().map(|f| f.mae).sum::<f64>() / n,
        rmse: folds.iter().map(|f| f.rmse).sum::<f64>() / n,
        coverage: folds.iter().map(|f| f.coverage).sum(),
        folds,
        empty_folds,
    })
}

/// Evaluate predictions for `test` rows using only `train`.
///
/// `params.test_fraction`, `seed` and `folds` are not used here; the
/// caller has already chosen the split.
pub fn evaluate_split<S: RatingStore + ?Sized>(
    train: &S,
    test: &[Rating],
    params: &EvaluationParams,
    progress: &dyn EvaluationProgress,
) -> RecResult<EvaluationReport> {
    let started = Instant::now();

    let mut index: HashMap<UserId, usize> = HashMap::new();
    let mut by_user: Vec<(UserId, Vec<&Rating>)> = Vec::new();
    for row in test {
        let slot = *index.entry(row.user_id).or_insert_with(|| {
            by_user.push((row.user_id, Vec::new()));
            by_user.len() - 1
        });
        by_user[slot].1.push(row);
    }
    if let Some(cap) = params.max_users {
        by_user.truncate(cap);
    }

    let total = by_user.len();
    let done = AtomicUsize::new(0);

    let evaluate_user = |(user, rows): &(UserId, Vec<&Rating>)| -> RecResult<UserOutcome> {
        let outcome = score_user(*user, rows, train, params)?;
        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
        progress.user_done(*user, n, total);
        Ok(outcome)
    };

    let outcomes: Vec<UserOutcome> = if params.parallel {
        by_user.par_iter().map(evaluate_user).collect::<RecResult<_>>()?
    } else {
        by_user.iter().map(evaluate_user).collect::<RecResult<_>>()?
    };

    let totals = outcomes
        .iter()
        .fold(UserOutcome::default(), |mut acc, o| {
            acc.abs_sum += o.abs_sum;
            acc.sq_sum += o.sq_sum;
            acc.scored += o.scored;
            acc.skipped += o.skipped;
            acc
        });

    if totals.scored == 0 {
        return Err(RecError::EmptyEvaluation {
            test_rows: test.len(),
        });
    }

    let report = EvaluationReport {
        mae: totals.abs_sum / totals.scored as f64,
        rmse: (totals.sq_sum / totals.scored as f64).sqrt(),
        coverage: totals.scored,
        test_rows: test.len(),
        rows_considered: by_user.iter().map(|(_, rows)| rows.len()).sum(),
        users_evaluated: total,
        skipped: totals.skipped,
    };

    debug!(
        users = report.users_evaluated,
        coverage = report.coverage,
        skipped = report.skipped,
        mae = report.mae,
        rmse = report.rmse,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "split evaluated"
    );

    Ok(report)
}

fn score_user<S: RatingStore + ?Sized>(
    user: UserId,
    rows: &[&Rating],
    train: &S,
    params: &EvaluationParams,
) -> RecResult<UserOutcome> {
    let mut outcome = UserOutcome::default();

    let predictable = train.contains_user(user) && train.by_user(user).is_some();
    if !predictable {
        for row in rows {
            match params.missing_policy {
                MissingPolicy::Skip => outcome.skipped += 1,
                MissingPolicy::ZeroPenalty => outcome.record(0.0, row.rating),
            }
        }
        return Ok(outcome);
    }

    let neighbours = select_neighbours(user, train, &params.neighbours)?;
    for row in rows {
        let prediction = predict(user, row.movie_id, &neighbours, train)?;
        let value = if params.round_predictions {
            prediction.rounded()
        } else {
            prediction.score
        };
        outcome.record(value, row.rating);
    }
    Ok(outcome)
}
