//! Row-level random train/test split.
//!
//! Rows are sampled independently of user, so one user's ratings can land
//! in both partitions. `ceil(test_fraction * n)` rows go to the test side;
//! both partitions keep the shuffled order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{RecError, RecResult};
use crate::models::Rating;

/// Train and test partitions of a rating table.
#[derive(Debug, Clone, Default)]
pub struct Split {
    pub train: Vec<Rating>,
    pub test: Vec<Rating>,
}

/// Seeded RNG when `seed` is set, entropy-seeded otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Shuffle `ratings` and cut off the test fraction.
pub fn train_test_split<R: Rng + ?Sized>(
    ratings: &[Rating],
    test_fraction: f64,
    rng: &mut R,
) -> RecResult<Split> {
    if test_fraction.is_nan() || test_fraction <= 0.0 || test_fraction >= 1.0 {
        return Err(RecError::InvalidParameter(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n = ratings.len();
    let n_test = ((test_fraction * n as f64).ceil() as usize).min(n);

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let test = order[..n_test].iter().map(|&i| ratings[i]).collect();
    let train = order[n_test..].iter().map(|&i| ratings[i]).collect();

    Ok(Split { train, test })
}
