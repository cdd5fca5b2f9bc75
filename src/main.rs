//! # cinematch CLI (`cine`)
//!
//! The `cine` binary loads a MovieLens 1M data directory and answers
//! recommendation questions about it.
//!
//! ## Usage
//!
//! ```bash
//! cine --config ./config/cine.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cine stats` | Counts and rating distribution of the loaded data |
//! | `cine profile <user>` | What a user rated, their mean and genre mix |
//! | `cine neighbours <user>` | The user's most similar users |
//! | `cine recommend <user>` | Movies the user has not rated, ranked by neighbours |
//! | `cine predict <user> <movie>` | Point prediction for one movie |
//! | `cine evaluate` | MAE/RMSE of predictions on a held-out split |
//!
//! ## Examples
//!
//! ```bash
//! # Top 15 for user 42 using the 50 nearest neighbours
//! cine recommend 42
//!
//! # Stricter support, median aggregation, JSON output
//! cine recommend 42 --min-support 10 --aggregator median --json
//!
//! # Reproducible evaluation over the first 200 test users
//! cine evaluate --seed 7 --max-users 200
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cinematch::config::{self, Config};
use cinematch::progress::ProgressMode;
use cinematch::{evaluate_cmd, logging, profile, recommend, stats};

/// cinematch CLI: user-based collaborative filtering over MovieLens ratings.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cine.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cine",
    about = "cinematch: user-based collaborative filtering movie recommendations",
    version,
    long_about = "cinematch finds each user's most similar users by Pearson correlation over \
    co-rated movies and recommends what those neighbours rated highly. It also predicts single \
    ratings and measures prediction accuracy on a held-out split."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cine.toml`. A missing file means all defaults.
    #[arg(long, global = true, default_value = "./config/cine.toml")]
    config: PathBuf,

    /// Override the data directory from the config file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log at debug level (ignored when RUST_LOG is set).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Neighbour selection flags shared by several commands.
#[derive(clap::Args, Debug, Default)]
struct NeighbourArgs {
    /// Number of neighbours to use.
    #[arg(long)]
    k: Option<usize>,

    /// Keep only neighbours scoring strictly above this similarity.
    #[arg(long)]
    min_similarity: Option<f64>,

    /// Rank neighbours by absolute correlation.
    #[arg(long)]
    absolute: bool,
}

impl NeighbourArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(k) = self.k {
            config.neighbours.k = k;
        }
        if self.min_similarity.is_some() {
            config.neighbours.min_similarity = self.min_similarity;
        }
        if self.absolute {
            config.similarity.use_absolute_similarity = true;
        }
    }
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Show dataset statistics.
    Stats {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show a user's ratings, mean rating and genre breakdown.
    Profile {
        user: u32,

        /// Maximum movies to list.
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// List a user's nearest neighbours.
    Neighbours {
        user: u32,

        #[command(flatten)]
        neighbours: NeighbourArgs,

        #[arg(long)]
        json: bool,
    },

    /// Recommend movies the user has not rated.
    ///
    /// Movies rated by fewer than `--min-support` neighbours are dropped;
    /// the rest are ranked by the aggregated neighbour score.
    Recommend {
        user: u32,

        #[command(flatten)]
        neighbours: NeighbourArgs,

        /// Minimum number of neighbours that rated a movie.
        #[arg(long)]
        min_support: Option<usize>,

        /// Score aggregator: `mean`, `median`, or `weighted`.
        #[arg(long)]
        aggregator: Option<String>,

        /// Maximum recommendations to print.
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Predict one user's rating of one movie.
    Predict {
        user: u32,
        movie: u32,

        #[command(flatten)]
        neighbours: NeighbourArgs,

        #[arg(long)]
        json: bool,
    },

    /// Measure prediction accuracy on a random held-out split.
    Evaluate {
        /// Fraction of rating rows held out for testing, in (0, 1).
        #[arg(long)]
        test_fraction: Option<f64>,

        /// Evaluate at most this many test users.
        #[arg(long, conflicts_with = "all_users")]
        max_users: Option<usize>,

        /// Evaluate every test user.
        #[arg(long)]
        all_users: bool,

        /// RNG seed for a reproducible split.
        #[arg(long)]
        seed: Option<u64>,

        /// Number of independent random splits to average.
        #[arg(long)]
        folds: Option<usize>,

        /// `skip` unpredictable rows, or score them as `zero_penalty`.
        #[arg(long)]
        missing_policy: Option<String>,

        #[command(flatten)]
        neighbours: NeighbourArgs,

        /// Run users one at a time instead of on the thread pool.
        #[arg(long)]
        sequential: bool,

        /// Progress output: `off`, `human`, or `json` (stderr).
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long)]
        progress: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load_config_or_default(&cli.config)?;
    if let Some(dir) = &cli.data_dir {
        cfg.data.dir = dir.clone();
    }
    logging::init_logging(&cfg.logging.level, cli.verbose);

    match cli.command {
        Commands::Stats { json } => {
            stats::run_stats(&cfg, json)?;
        }
        Commands::Profile { user, limit, json } => {
            profile::run_profile(&cfg, user, limit, json)?;
        }
        Commands::Neighbours {
            user,
            neighbours,
            json,
        } => {
            neighbours.apply(&mut cfg);
            config::validate(&cfg)?;
            recommend::run_neighbours(&cfg, user, json)?;
        }
        Commands::Recommend {
            user,
            neighbours,
            min_support,
            aggregator,
            limit,
            json,
        } => {
            neighbours.apply(&mut cfg);
            if let Some(n) = min_support {
                cfg.recommend.min_support = n;
            }
            if let Some(a) = aggregator {
                cfg.recommend.aggregator = a.parse()?;
            }
            config::validate(&cfg)?;
            recommend::run_recommend(&cfg, user, limit, json)?;
        }
        Commands::Predict {
            user,
            movie,
            neighbours,
            json,
        } => {
            neighbours.apply(&mut cfg);
            config::validate(&cfg)?;
            recommend::run_predict(&cfg, user, movie, json)?;
        }
        Commands::Evaluate {
            test_fraction,
            max_users,
            all_users,
            seed,
            folds,
            missing_policy,
            neighbours,
            sequential,
            progress,
            json,
        } => {
            neighbours.apply(&mut cfg);
            let e = &mut cfg.evaluation;
            if let Some(f) = test_fraction {
                e.test_fraction = f;
            }
            if all_users {
                e.max_users = None;
            } else if max_users.is_some() {
                e.max_users = max_users;
            }
            if seed.is_some() {
                e.seed = seed;
            }
            if let Some(n) = folds {
                e.folds = n;
            }
            if let Some(p) = missing_policy {
                e.missing_policy = p.parse()?;
            }
            if sequential {
                e.parallel = false;
            }
            config::validate(&cfg)?;

            let mode = ProgressMode::resolve(progress.as_deref()).map_err(anyhow::Error::msg)?;
            evaluate_cmd::run_evaluate(&cfg, mode, json)?;
        }
    }

    Ok(())
}
