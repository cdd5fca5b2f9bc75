//! Dataset statistics.
//!
//! Provides a quick summary of what was loaded: user, movie and rating
//! counts, the rating distribution and the oldest/newest rating. Used by
//! `cine stats` to confirm a data directory is wired up correctly.

use anyhow::Result;
use cinematch_core::store::memory::InMemoryRatingStore;
use cinematch_core::store::RatingStore;
use serde::Serialize;

use crate::config::Config;
use crate::dataset;
use crate::progress::format_number;

/// One histogram bucket. Ratings are bucketed to the nearest half star.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingBucket {
    pub rating: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub users: usize,
    /// Users with at least one rating.
    pub rated_users: usize,
    pub movies: usize,
    pub ratings: usize,
    pub mean_rating: Option<f64>,
    pub histogram: Vec<RatingBucket>,
    pub first_rated: Option<i64>,
    pub last_rated: Option<i64>,
}

pub fn compute_stats(store: &InMemoryRatingStore) -> DatasetStats {
    let ratings = store.ratings();

    let mut buckets: std::collections::BTreeMap<i64, usize> = Default::default();
    let mut sum = 0.0;
    for r in ratings {
        sum += r.rating;
        *buckets.entry((r.rating * 2.0).round() as i64).or_default() += 1;
    }

    let timestamps = ratings.iter().filter_map(|r| r.timestamp);

    DatasetStats {
        users: store.users().len(),
        rated_users: store.rated_user_count(),
        movies: store.movies().len(),
        ratings: ratings.len(),
        mean_rating: if ratings.is_empty() {
            None
        } else {
            Some(sum / ratings.len() as f64)
        },
        histogram: buckets
            .into_iter()
            .map(|(half, count)| RatingBucket {
                rating: half as f64 / 2.0,
                count,
            })
            .collect(),
        first_rated: timestamps.clone().min(),
        last_rated: timestamps.max(),
    }
}

/// Run the stats command: load the dataset and print a summary.
pub fn run_stats(config: &Config, json: bool) -> Result<()> {
    let store = dataset::load_store(&config.data)?;
    let stats = compute_stats(&store);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("cinematch - Dataset Stats");
    println!("=========================");
    println!();
    println!("  Data dir:    {}", config.data.dir.display());
    println!();
    println!(
        "  Users:       {} ({} with ratings)",
        format_number(stats.users as u64),
        format_number(stats.rated_users as u64)
    );
    println!("  Movies:      {}", format_number(stats.movies as u64));
    println!("  Ratings:     {}", format_number(stats.ratings as u64));
    match stats.mean_rating {
        Some(m) => println!("  Mean:        {:.3}", m),
        None => println!("  Mean:        -"),
    }
    if let (Some(first), Some(last)) = (stats.first_rated, stats.last_rated) {
        println!(
            "  Rated:       {} .. {}",
            format_ts_date(first),
            format_ts_date(last)
        );
    }

    if !stats.histogram.is_empty() {
        let max = stats.histogram.iter().map(|b| b.count).max().unwrap_or(1);
        println!();
        println!("  Distribution:");
        println!("  {:>6} {:>10}   {}", "RATING", "COUNT", "");
        println!("  {}", "-".repeat(60));
        for b in &stats.histogram {
            let width = (b.count * 40).div_ceil(max.max(1));
            println!(
                "  {:>6} {:>10}   {}",
                format!("{:.1}", b.rating),
                format_number(b.count as u64),
                "#".repeat(width)
            );
        }
    }

    println!();
    Ok(())
}

/// Format a Unix timestamp as a calendar date.
pub(crate) fn format_ts_date(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}
