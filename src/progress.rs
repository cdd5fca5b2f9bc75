//! Evaluation progress reporting.
//!
//! `cine evaluate` can run for minutes on the full MovieLens set, so it
//! reports each finished test user. Progress is emitted on **stderr** so
//! stdout remains parseable for scripts.

use cinematch_core::evaluate::{EvaluationProgress, NoProgress};
use cinematch_core::models::UserId;
use std::io::Write;
use std::str::FromStr;

/// Human-friendly progress on stderr: "evaluate  user 1,234  56 / 100 users".
pub struct StderrProgress;

impl EvaluationProgress for StderrProgress {
    fn user_done(&self, user: UserId, done: usize, total: usize) {
        let line = format!(
            "evaluate  user {}  {} / {} users\n",
            format_number(user as u64),
            format_number(done as u64),
            format_number(total as u64)
        );
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl EvaluationProgress for JsonProgress {
    fn user_done(&self, user: UserId, done: usize, total: usize) {
        let obj = serde_json::json!({
            "event": "progress",
            "phase": "evaluating",
            "user": user,
            "n": done,
            "total": total
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

/// `1234567` -> `"1,234,567"`.
pub(crate) fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let lead = match digits.len() % 3 {
        0 => 3,
        r => r,
    };
    let mut out = String::from(&digits[..lead]);
    for group in digits.as_bytes()[lead..].chunks(3) {
        out.push(',');
        out.extend(group.iter().map(|&b| b as char));
    }
    out
}

/// Where `cine evaluate` sends per-user progress.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Resolve the `--progress` flag. Without it, a terminal on stderr
    /// gets human output and anything else (pipes, CI logs) gets none.
    pub fn resolve(flag: Option<&str>) -> Result<Self, String> {
        match flag {
            Some(value) => value.parse(),
            None if atty::is(atty::Stream::Stderr) => Ok(ProgressMode::Human),
            None => Ok(ProgressMode::Off),
        }
    }

    pub fn reporter(self) -> Box<dyn EvaluationProgress> {
        match self {
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
            ProgressMode::Off => Box::new(NoProgress),
        }
    }
}

impl FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" | "none" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => Err(format!(
                "unknown progress mode '{}'. Use off, human, or json.",
                other
            )),
        }
    }
}
