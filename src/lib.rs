//! # cinematch
//!
//! User-based collaborative filtering over the MovieLens 1M ratings.
//!
//! The recommendation engine itself lives in [`cinematch_core`]; this crate
//! adds the pieces around it: configuration, the `.dat` loader, progress
//! reporting and the `cine` command handlers.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────────────┐
//! │ *.dat files│──▶│   dataset    │──▶│  InMemoryRatingStore │
//! └────────────┘   └──────────────┘   └──────────┬───────────┘
//!                                                │
//!                  ┌──────────────┬──────────────┼──────────────┐
//!                  ▼              ▼              ▼              ▼
//!             neighbours     recommend       predict        evaluate
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cine stats
//! cine recommend 42 --k 50 --min-support 5
//! cine predict 42 1193
//! cine evaluate --seed 7 --max-users 100
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`dataset`] | MovieLens `.dat` loader |
//! | [`stats`] | `cine stats` |
//! | [`profile`] | `cine profile` |
//! | [`recommend`] | `cine neighbours`, `cine recommend`, `cine predict` |
//! | [`evaluate_cmd`] | `cine evaluate` |
//! | [`progress`] | Evaluation progress on stderr |
//! | [`logging`] | `tracing` subscriber setup |

pub mod config;
pub mod dataset;
pub mod evaluate_cmd;
pub mod logging;
pub mod profile;
pub mod progress;
pub mod recommend;
pub mod stats;
