//! `cine evaluate`: held-out accuracy of the neighbour predictor.

use anyhow::Result;
use cinematch_core::evaluate::{evaluate, EvaluationReport, EvaluationSummary};
use std::time::Instant;

use crate::config::Config;
use crate::dataset;
use crate::progress::{format_number, ProgressMode};

pub fn run_evaluate(config: &Config, progress: ProgressMode, json: bool) -> Result<()> {
    let store = dataset::load_store(&config.data)?;
    let params = config.evaluation_params();

    let started = Instant::now();
    let reporter = progress.reporter();
    let summary = evaluate(&store, &params, reporter.as_ref())?;
    let elapsed = started.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_summary(config, &summary);
    println!("  Elapsed:     {:.1}s", elapsed.as_secs_f64());
    println!();
    Ok(())
}

fn print_summary(config: &Config, summary: &EvaluationSummary) {
    let e = &config.evaluation;
    println!("cinematch - Evaluation");
    println!("======================");
    println!();
    println!(
        "  Split:       {:.0}% test, {} fold{}{}",
        e.test_fraction * 100.0,
        e.folds,
        if e.folds == 1 { "" } else { "s" },
        e.seed.map(|s| format!(", seed {}", s)).unwrap_or_default()
    );
    println!(
        "  Users:       {}",
        e.max_users
            .map(|n| format!("first {}", n))
            .unwrap_or_else(|| "all".to_string())
    );
    println!(
        "  Neighbours:  k = {}, missing = {}",
        config.neighbours.k,
        e.missing_policy.as_str()
    );
    println!();
    println!("  MAE:         {:.4}", summary.mae);
    println!("  RMSE:        {:.4}", summary.rmse);
    println!("  Coverage:    {} rows", format_number(summary.coverage as u64));
    if summary.empty_folds > 0 {
        println!(
            "  Empty folds: {} (scored nothing, not averaged)",
            summary.empty_folds
        );
    }

    if summary.folds.len() > 1 {
        println!();
        println!(
            "  {:>4} {:>8} {:>8} {:>9} {:>8} {:>7}",
            "FOLD", "MAE", "RMSE", "COVERAGE", "SKIPPED", "USERS"
        );
        println!("  {}", "-".repeat(50));
        for (i, f) in summary.folds.iter().enumerate() {
            print_fold(i + 1, f);
        }
    } else if let Some(f) = summary.folds.first() {
        println!(
            "  Test rows:   {} ({} for evaluated users, {} skipped)",
            format_number(f.test_rows as u64),
            format_number(f.rows_considered as u64),
            format_number(f.skipped as u64)
        );
        println!("  Evaluated:   {} users", f.users_evaluated);
    }
}

fn print_fold(n: usize, f: &EvaluationReport) {
    println!(
        "  {:>4} {:>8.4} {:>8.4} {:>9} {:>8} {:>7}",
        n, f.mae, f.rmse, f.coverage, f.skipped, f.users_evaluated
    );
}
