// src/engines/classify.rs
// Keyword-driven regression classification

use super::run_history::{self, RunHistoryStats};
use crate::model::{RegressionType, Severity};
use serde::{Deserialize, Serialize};

/// Fixed padding added to the first rule's keyword count to form the
/// confidence denominator. Shared by every rule, not per-row.
const CONFIDENCE_PADDING: usize = 3;
const MIN_KEYWORD_CONFIDENCE: f64 = 0.3;
const MAX_KEYWORD_CONFIDENCE: f64 = 0.9;
const NO_MATCH_CONFIDENCE: f64 = 0.2;
const MAX_STAT_CONFIDENCE: f64 = 0.95;

/// One classification row. Rows are scanned in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRule {
    pub regression_type: RegressionType,
    pub severity: Severity,
    pub indicator: String,
    pub keywords: Vec<String>,
}

impl SignalRule {
    fn new(
        regression_type: RegressionType,
        severity: Severity,
        indicator: &str,
        keywords: &[&str],
    ) -> Self {
        Self {
            regression_type,
            severity,
            indicator: indicator.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Number of this row's keywords found as substrings of `text`
    fn score(&self, text: &str) -> usize {
        self.keywords.iter().filter(|k| text.contains(k.as_str())).count()
    }
}

/// Ordered signal rows used by the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTable {
    pub rules: Vec<SignalRule>,
}

impl Default for SignalTable {
    fn default() -> Self {
        use RegressionType as T;
        use Severity as S;
        Self {
            rules: vec![
                SignalRule::new(
                    T::NullPointer,
                    S::High,
                    "Null/nil dereference pattern",
                    &["null", "nil", "npe", "nullpointerexception", "nil pointer", "null reference"],
                ),
                SignalRule::new(
                    T::Crash,
                    S::Critical,
                    "Application crash signal",
                    &["panic", "crash", "segfault", "sigsegv", "abort", "fatal error"],
                ),
                SignalRule::new(
                    T::Performance,
                    S::Medium,
                    "Performance degradation signal",
                    &[
                        "slow",
                        "latency",
                        "timeout",
                        "performance",
                        "memory usage",
                        "cpu spike",
                        "throughput",
                    ],
                ),
                SignalRule::new(
                    T::MemoryLeak,
                    S::High,
                    "Memory leak indicator",
                    &["memory leak", "oom", "out of memory", "heap", "alloc", "gc pressure"],
                ),
                SignalRule::new(
                    T::LogicError,
                    S::Medium,
                    "Logic error pattern",
                    &[
                        "wrong result",
                        "incorrect",
                        "unexpected value",
                        "off by one",
                        "logic",
                        "calculation",
                    ],
                ),
                SignalRule::new(
                    T::DataCorruption,
                    S::Critical,
                    "Data integrity concern",
                    &["corrupt", "data loss", "inconsistent state", "transaction", "atomic"],
                ),
                SignalRule::new(
                    T::ApiBreakingChange,
                    S::High,
                    "API contract violation",
                    &[
                        "breaking change",
                        "api change",
                        "interface",
                        "signature",
                        "deprecated",
                        "removed method",
                    ],
                ),
                SignalRule::new(
                    T::SecurityFlaw,
                    S::Critical,
                    "Security vulnerability signal",
                    &[
                        "sql injection",
                        "xss",
                        "csrf",
                        "auth bypass",
                        "privilege",
                        "cve",
                        "vulnerability",
                    ],
                ),
            ],
        }
    }
}

/// Arguments of `detect_regression`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectRequest {
    pub description: String,
    #[serde(default)]
    pub files_changed: Vec<String>,
    pub environment: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub run_history: Option<Vec<String>>,
}

/// Output of `detect_regression`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub is_regression: bool,
    pub regression_type: RegressionType,
    pub severity: Severity,
    pub affected_components: Vec<String>,
    pub indicators: Vec<String>,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_stats: Option<RunHistoryStats>,
    pub summary: String,
}

/// Classify a bug report against the signal table
pub fn classify(table: &SignalTable, req: &DetectRequest) -> DetectionResult {
    let text = format!(
        "{} {}",
        req.description,
        req.error_message.as_deref().unwrap_or_default()
    )
    .to_lowercase();

    let mut indicators = Vec::new();
    // (score, rule) of the first row holding the strictly highest count
    let mut best: Option<(usize, &SignalRule)> = None;
    for rule in &table.rules {
        let score = rule.score(&text);
        if score == 0 {
            continue;
        }
        indicators.push(rule.indicator.clone());
        if best.is_none_or(|(top, _)| score > top) {
            best = Some((score, rule));
        }
    }

    let mut is_regression = false;
    let mut regression_type = RegressionType::Unknown;
    let mut severity = Severity::Low;
    let mut confidence = 0.0;

    if let Some((score, rule)) = best {
        is_regression = true;
        regression_type = rule.regression_type;
        severity = rule.severity;
        let denominator =
            table.rules.first().map(|r| r.keywords.len()).unwrap_or(0) + CONFIDENCE_PADDING;
        confidence = (score as f64 / denominator as f64)
            .clamp(MIN_KEYWORD_CONFIDENCE, MAX_KEYWORD_CONFIDENCE);
    }

    let run_stats = req.run_history.as_deref().map(|history| {
        let analysis = run_history::analyze(history);
        if analysis.stats.failure_count > 0 {
            is_regression = true;
            if analysis.confidence > confidence {
                confidence = analysis.confidence.min(MAX_STAT_CONFIDENCE);
            }
        }
        analysis.stats
    });

    let summary = if is_regression {
        let mut s = format!(
            "Detected a {} {} regression found in {} environment.",
            severity, regression_type, req.environment
        );
        if let Some(stats) = &run_stats {
            s.push_str(&format!(
                " Run history: {}/{} failures ({:.0}% failure rate, stat confidence {:.2}).",
                stats.failure_count,
                stats.total_runs,
                stats.failure_rate * 100.0,
                stats.stat_confidence
            ));
            if stats.is_likely_flake {
                s.push_str(" Low recurrence — likely a flake.");
            }
        }
        s
    } else {
        confidence = NO_MATCH_CONFIDENCE;
        "No clear regression patterns detected. Manual review recommended.".to_string()
    };

    DetectionResult {
        is_regression,
        regression_type,
        severity,
        affected_components: affected_components(&req.files_changed),
        indicators,
        confidence,
        run_stats,
        summary,
    }
}

/// First path segment of each file, deduplicated in first-seen order
pub fn affected_components(files: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for path in files {
        let path = path.trim();
        if path.is_empty() {
            continue;
        }
        let component = if path.contains('/') {
            path.split('/').find(|s| !s.is_empty()).unwrap_or(path)
        } else {
            path
        };
        if !out.iter().any(|c| c == component) {
            out.push(component.to_string());
        }
    }
    out
}
