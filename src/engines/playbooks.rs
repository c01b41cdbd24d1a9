// src/engines/playbooks.rs
// Built-in remediation playbooks

use super::fix_plan::{FixPlan, FixStep, Playbook, PlaybookLibrary};
use crate::model::RegressionType;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn step(order: u32, action: &str, description: &str, automated: bool) -> FixStep {
    FixStep {
        order,
        action: action.to_string(),
        description: description.to_string(),
        automated,
    }
}

impl Default for PlaybookLibrary {
    fn default() -> Self {
        Self {
            playbooks: vec![
                Playbook {
                    regression_type: RegressionType::NullPointer,
                    plan: null_pointer(),
                },
                Playbook {
                    regression_type: RegressionType::Performance,
                    plan: performance(),
                },
                Playbook {
                    regression_type: RegressionType::Crash,
                    plan: crash(),
                },
                Playbook {
                    regression_type: RegressionType::SecurityFlaw,
                    plan: security_flaw(),
                },
                Playbook {
                    regression_type: RegressionType::MemoryLeak,
                    plan: memory_leak(),
                },
                Playbook {
                    regression_type: RegressionType::DataCorruption,
                    plan: data_corruption(),
                },
            ],
            fallback: generic(),
            escalation_actions: strings(&[
                "PAGE ON-CALL IMMEDIATELY — this is a P0 incident",
                "Open incident bridge / war room",
            ]),
        }
    }
}

fn null_pointer() -> FixPlan {
    FixPlan {
        immediate_actions: strings(&[
            "Add null guard before the failing dereference",
            "Check if recent commit removed a non-null guarantee",
        ]),
        fix_steps: vec![
            step(1, "reproduce", "Write a failing test that reproduces the NPE", false),
            step(2, "guard", "Add nil/null check with a meaningful error message or default", false),
            step(
                3,
                "root-cause",
                "Trace back to where null was first introduced (often in a factory or constructor)",
                false,
            ),
            step(
                4,
                "annotation",
                "Add @NullSafe / null-safety annotations to prevent regression",
                false,
            ),
            step(5, "test", "Add unit test for the null-input path", true),
        ],
        prevention_measures: strings(&[
            "Enable null-safety linter rules (e.g., go vet, staticcheck SA5011)",
            "Require @NullSafe annotation on all new public APIs",
            "Add IDE plugin to flag potential nil dereferences",
        ]),
        shift_left_recommendations: strings(&[
            "Enable nil-check warnings as IDE errors (shift detection to IDE stage)",
            "Run staticcheck in pre-commit hook (shift to local_test)",
            "Add nil-pointer detection to CI pipeline",
        ]),
        estimated_effort: "1-4 hours".into(),
        rollback_plan: "Revert the commit that removed the non-null guarantee".into(),
        test_strategy: "Unit test with nil/zero-value inputs, integration test for the affected flow"
            .into(),
    }
}

fn performance() -> FixPlan {
    FixPlan {
        immediate_actions: strings(&[
            "Check if a recent DB query lost an index",
            "Look for N+1 query patterns introduced in the change",
            "Compare flame graph before and after the change",
        ]),
        fix_steps: vec![
            step(1, "profile", "Run profiler (pprof, perf, py-spy) to get baseline", true),
            step(2, "bisect", "Use git bisect to find the commit that caused the regression", true),
            step(
                3,
                "analyze",
                "Identify the hot path — DB query, loop, serialization, or allocation",
                false,
            ),
            step(
                4,
                "optimize",
                "Apply targeted fix: add index, batch queries, cache result, or reduce allocations",
                false,
            ),
            step(5, "benchmark", "Add benchmark test to lock in the performance improvement", true),
            step(6, "monitor", "Add performance metric/alert for this path", true),
        ],
        prevention_measures: strings(&[
            "Add benchmark tests for all critical code paths",
            "Set performance budgets in CI (e.g., benchstat comparison)",
            "Add DB query explain-plan checks in code review",
        ]),
        shift_left_recommendations: strings(&[
            "Run benchmarks in CI and fail on >10% regression (shift to ci stage)",
            "Use continuous profiling in staging before prod promotion",
            "Add performance linting to catch O(n²) patterns statically",
        ]),
        estimated_effort: "4-16 hours (profiling + fix + benchmarks)".into(),
        rollback_plan: "Revert to previous release; apply hotfix forward".into(),
        test_strategy: "Benchmark tests, load testing with realistic data volumes".into(),
    }
}

fn crash() -> FixPlan {
    FixPlan {
        immediate_actions: strings(&[
            "Enable feature flag to roll back or disable the new code path immediately",
            "Capture full stack trace and correlated logs",
            "Check error monitoring (Sentry, Datadog) for crash volume",
        ]),
        fix_steps: vec![
            step(1, "rollback", "Roll back or disable the change to restore stability", false),
            step(
                2,
                "reproduce",
                "Reproduce crash in a local environment using the stack trace",
                false,
            ),
            step(
                3,
                "fix",
                "Address root cause — unhandled error, resource exhaustion, or invariant violation",
                false,
            ),
            step(4, "test", "Write test that covers the crash scenario", false),
            step(5, "canary", "Re-deploy fix to canary/staging before full rollout", true),
        ],
        prevention_measures: strings(&[
            "Add crash-rate SLO alert (page when crash rate > baseline)",
            "Enable structured crash reporting with full context",
            "Use feature flags for all risky changes to allow instant rollback",
        ]),
        shift_left_recommendations: strings(&[
            "Run chaos/fault-injection tests in CI",
            "Add panic/exception tracking to staging environment",
            "Enable race detector in test runs (go test -race)",
        ]),
        estimated_effort: "2-8 hours for hotfix; 1-3 days for root cause fix".into(),
        rollback_plan: "Immediately revert via feature flag; if no flag, revert deployment".into(),
        test_strategy: "Crash reproduction test, fault injection, end-to-end scenario test".into(),
    }
}

fn security_flaw() -> FixPlan {
    FixPlan {
        immediate_actions: strings(&[
            "Immediately disable or isolate the affected endpoint/feature",
            "Notify security team (treat as incident)",
            "Assess whether the vulnerability has been exploited (check audit logs)",
        ]),
        fix_steps: vec![
            step(1, "contain", "Disable affected feature or apply WAF rule immediately", false),
            step(2, "assess", "Determine blast radius: what data/systems are exposed", false),
            step(
                3,
                "fix",
                "Apply security patch with input validation / output encoding / authz check",
                false,
            ),
            step(4, "audit", "Full security audit of adjacent code paths", false),
            step(5, "pen-test", "Targeted penetration test of the fix", false),
            step(6, "disclose", "Coordinate responsible disclosure if external impact", false),
        ],
        prevention_measures: strings(&[
            "Add SAST scanner (Semgrep, CodeQL) to CI pipeline",
            "Add DAST scanner against staging before every release",
            "Enforce security code review for all auth/data-handling changes",
        ]),
        shift_left_recommendations: strings(&[
            "Run SAST in IDE via plugin (shift to ide stage)",
            "Require security review checklist in PR template",
            "Add automated SQL injection / XSS checks to CI",
        ]),
        estimated_effort: "1-2 days for patch; 1 week for full audit".into(),
        rollback_plan: "Immediately revert; do NOT wait for a clean fix if actively exploited".into(),
        test_strategy: "OWASP test suite, targeted exploit PoC test, regression test suite".into(),
    }
}

fn memory_leak() -> FixPlan {
    FixPlan {
        immediate_actions: strings(&[
            "Check if recent change added a long-lived reference or disabled GC pressure relief",
            "Monitor heap growth rate in production",
        ]),
        fix_steps: vec![
            step(
                1,
                "profile",
                "Capture heap profile before and after change (pprof heap, valgrind)",
                true,
            ),
            step(2, "identify", "Identify the leaking allocation type and call site", false),
            step(
                3,
                "fix",
                "Close resources, remove stale references, add defer/finally cleanup",
                false,
            ),
            step(4, "test", "Add test that runs the path N times and checks heap growth", false),
            step(5, "monitor", "Add heap metric alert for abnormal growth rate", true),
        ],
        prevention_measures: strings(&[
            "Add heap memory leak detection to CI (go test with -memprofile)",
            "Require resource cleanup review for all I/O or connection changes",
        ]),
        shift_left_recommendations: strings(&[
            "Run go test -memprofile in CI and fail on unexpected heap growth",
            "Enable leak detector in integration tests",
        ]),
        estimated_effort: "4-12 hours".into(),
        rollback_plan: "Revert the change; restart affected services to clear leaked memory".into(),
        test_strategy: "Memory benchmark, long-running soak test, heap profiling".into(),
    }
}

fn data_corruption() -> FixPlan {
    FixPlan {
        immediate_actions: strings(&[
            "Freeze writes on the affected tables or stores",
            "Snapshot current state before attempting any repair",
            "Identify the first corrupted record and the write path that produced it",
        ]),
        fix_steps: vec![
            step(1, "contain", "Halt the faulty writer or switch the path to read-only", false),
            step(2, "scope", "Query for the range and count of inconsistent records", true),
            step(
                3,
                "fix",
                "Correct the write path: enforce transactions, constraints, or idempotency",
                false,
            ),
            step(
                4,
                "repair",
                "Backfill or restore affected records from snapshot or audit log",
                false,
            ),
            step(5, "verify", "Run consistency checks across the repaired data", true),
        ],
        prevention_measures: strings(&[
            "Move invariants enforced only in code into database constraints",
            "Wrap multi-step writes in a single transaction",
            "Schedule recurring data consistency checks with alerting",
        ]),
        shift_left_recommendations: strings(&[
            "Add property tests for write-path invariants (shift to local_test)",
            "Dry-run migrations against a production snapshot in CI",
            "Require DBA review on schema and migration changes",
        ]),
        estimated_effort: "1-3 days including data repair".into(),
        rollback_plan: "Revert the write path and restore from the pre-incident snapshot".into(),
        test_strategy: "Invariant tests, migration dry-run, post-repair consistency audit".into(),
    }
}

fn generic() -> FixPlan {
    FixPlan {
        immediate_actions: strings(&[
            "Reproduce the issue in a local or staging environment",
            "Identify the most recent change to the affected area",
        ]),
        fix_steps: vec![
            step(1, "reproduce", "Write a failing test case that captures the bug", false),
            step(2, "bisect", "Use git bisect to find the introducing commit", true),
            step(3, "fix", "Apply targeted fix addressing the root cause", false),
            step(4, "test", "Verify the fix with the reproduction test", false),
            step(
                5,
                "review",
                "Submit for code review with clear description of root cause and fix",
                false,
            ),
        ],
        prevention_measures: strings(&[
            "Add regression test to the test suite",
            "Document the failure mode in the codebase",
        ]),
        shift_left_recommendations: strings(&[
            "Add test coverage to catch this class of bug earlier in the pipeline",
            "Consider adding a linter rule to detect this pattern",
        ]),
        estimated_effort: "Unknown — depends on root cause".into(),
        rollback_plan: "Revert the introducing commit".into(),
        test_strategy: "Unit test covering the failure scenario".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_typed_playbooks() {
        let lib = PlaybookLibrary::default();
        assert_eq!(lib.playbooks.len(), 6);
        for pb in &lib.playbooks {
            assert_ne!(pb.regression_type, RegressionType::Unknown);
        }
    }

    #[test]
    fn test_steps_are_numbered_from_one() {
        let lib = PlaybookLibrary::default();
        let plans = lib.playbooks.iter().map(|p| &p.plan).chain([&lib.fallback]);
        for plan in plans {
            for (i, s) in plan.fix_steps.iter().enumerate() {
                assert_eq!(s.order as usize, i + 1);
            }
        }
    }

    #[test]
    fn test_fallback_has_five_steps() {
        assert_eq!(PlaybookLibrary::default().fallback.fix_steps.len(), 5);
    }

    #[test]
    fn test_step_wording_is_exact() {
        let lib = PlaybookLibrary::default();
        let analyze = &lib.lookup(RegressionType::Performance).fix_steps[2];
        assert_eq!(
            analyze.description,
            "Identify the hot path — DB query, loop, serialization, or allocation"
        );
        let fix = &lib.lookup(RegressionType::Crash).fix_steps[2];
        assert_eq!(
            fix.description,
            "Address root cause — unhandled error, resource exhaustion, or invariant violation"
        );
    }
}
