// src/engines/run_history.rs
// Wilson-bound confidence over a pass/fail run history

use serde::Serialize;
use tracing::debug;

/// z-score for the Wilson interval (~68% one-sided)
pub const WILSON_Z: f64 = 1.0;

/// Statistical confidence below this marks the history as a likely flake
pub const FLAKE_THRESHOLD: f64 = 0.40;

/// Outcome of a single run. Any token other than `fail` counts as a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Pass,
    Fail,
}

impl RunOutcome {
    pub fn parse(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "fail" => Self::Fail,
            "pass" => Self::Pass,
            other => {
                debug!(token = %other, "Unrecognised run token, counting as pass");
                Self::Pass
            }
        }
    }
}

/// Summary of a run history as reported in tool output.
///
/// `failure_rate` and `stat_confidence` are rounded to three decimals for
/// display; decisions use the unrounded value kept in [`RunHistoryAnalysis`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunHistoryStats {
    pub total_runs: usize,
    pub failure_count: usize,
    pub failure_rate: f64,
    pub stat_confidence: f64,
    pub is_likely_flake: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunHistoryAnalysis {
    pub stats: RunHistoryStats,
    /// Unrounded Wilson lower bound
    pub confidence: f64,
}

/// Lower bound of the Wilson score interval for `failures` out of `total`.
/// Returns 0 when there is no data.
pub fn wilson_lower_bound(failures: usize, total: usize, z: f64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let p = failures as f64 / n;
    let z2 = z * z;
    let numerator = p + z2 / (2.0 * n) - z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();
    let denominator = 1.0 + z2 / n;
    (numerator / denominator).clamp(0.0, 1.0)
}

/// Score a run history, oldest run first
pub fn analyze<S: AsRef<str>>(history: &[S]) -> RunHistoryAnalysis {
    let total = history.len();
    let failures = history
        .iter()
        .filter(|t| RunOutcome::parse(t.as_ref()) == RunOutcome::Fail)
        .count();

    let rate = if total == 0 {
        0.0
    } else {
        failures as f64 / total as f64
    };
    let confidence = wilson_lower_bound(failures, total, WILSON_Z);

    RunHistoryAnalysis {
        stats: RunHistoryStats {
            total_runs: total,
            failure_count: failures,
            failure_rate: round3(rate),
            stat_confidence: round3(confidence),
            is_likely_flake: confidence < FLAKE_THRESHOLD,
        },
        confidence,
    }
}

pub(crate) fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
