// crates/orchestrator-core/src/evalue.rs
// ============================================================================
// Module: E-value Engine
// Description: Per-test log-likelihood-ratio evidence and test-set verdicts.
// Purpose: Produce GREEN/RED/UNDECIDED verdicts over a set of tests with a
//          controlled aggregate Type II error budget (union bound).
// Dependencies: crate::status::HistoryEntry, crate::sprt::DEFAULT_MARGIN
// ============================================================================

//! ## Overview
//! Quick mode pools evidence across commits (one log-ratio per commit,
//! summed); hifi mode isolates to a single current commit. Both feed the
//! same test-set verdict combinator, which applies Markov's inequality on
//! the average E-value (false-alarm control) and a union bound on the
//! minimum S-value (missed-detection control).

use std::collections::BTreeMap;

use crate::sprt::DEFAULT_MARGIN;
use crate::status::HistoryEntry;

/// Logs are clamped to this magnitude before exponentiation, to keep
/// `exp()` finite in `f64`.
const LOG_CLAMP: f64 = 700.0;

fn clamp_prob(p: f64) -> f64 {
    p.clamp(f64::EPSILON, 1.0 - f64::EPSILON)
}

/// Computes the raw log-likelihood-ratio for `passes` out of `runs`,
/// positive favouring reliability (`p0`) over the unreliable alternative
/// `p0 - margin`.
#[must_use]
pub fn log_ratio(runs: u64, passes: u64, p0: f64, margin: f64) -> f64 {
    if runs == 0 {
        return 0.0;
    }
    let p0 = clamp_prob(p0);
    let p1 = clamp_prob(p0 - margin);
    #[allow(
        clippy::cast_precision_loss,
        reason = "run/pass counts are far below f64's exact-integer range in practice"
    )]
    let (runs_f, passes_f) = (runs as f64, passes as f64);
    let fails_f = runs_f - passes_f;
    passes_f * (p0 / p1).ln() + fails_f * ((1.0 - p0) / (1.0 - p1)).ln()
}

/// Per-test evidence: the S-value (evidence *for* reliability) and its
/// reciprocal E-value (evidence *against*).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestEvalue {
    /// `exp(+total_log_ratio)`, clamped.
    pub s_value: f64,
    /// `exp(-total_log_ratio)`, clamped.
    pub e_value: f64,
}

impl TestEvalue {
    fn from_total_log_ratio(total: f64) -> Self {
        let clamped = total.clamp(-LOG_CLAMP, LOG_CLAMP);
        Self {
            s_value: clamped.exp(),
            e_value: (-clamped).exp(),
        }
    }
}

/// Quick mode: groups `history` by commit (entries with `commit = None`
/// form singleton groups, each treated as independent evidence), computes
/// one log-ratio per group, and sums them.
#[must_use]
pub fn quick_evalue(history: &[HistoryEntry], p0: f64) -> TestEvalue {
    let mut groups: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    let mut singleton_total = 0.0_f64;

    for entry in history {
        match &entry.commit {
            Some(commit) => {
                let group = groups.entry(commit.clone()).or_insert((0, 0));
                group.0 += 1;
                if entry.passed {
                    group.1 += 1;
                }
            }
            None => {
                singleton_total += log_ratio(1, u64::from(entry.passed), p0, DEFAULT_MARGIN);
            }
        }
    }

    let grouped_total: f64 = groups
        .values()
        .map(|(runs, passes)| log_ratio(*runs, *passes, p0, DEFAULT_MARGIN))
        .sum();

    TestEvalue::from_total_log_ratio(grouped_total + singleton_total)
}

/// HiFi mode: filters `history` to entries whose `commit` matches
/// `current_commit` and computes a single log-ratio with no cross-commit
/// pooling.
#[must_use]
pub fn hifi_evalue(history: &[HistoryEntry], current_commit: &str, p0: f64) -> TestEvalue {
    let (runs, passes) = history
        .iter()
        .filter(|entry| entry.commit.as_deref() == Some(current_commit))
        .fold((0u64, 0u64), |(runs, passes), entry| {
            (runs + 1, passes + u64::from(entry.passed))
        });
    TestEvalue::from_total_log_ratio(log_ratio(runs, passes, p0, DEFAULT_MARGIN))
}

/// Test-set-level verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Markov bound on the average E-value exceeded `1/alpha_set`.
    Red,
    /// Union bound on the minimum S-value cleared `n/beta_set` for every test.
    Green,
    /// Neither bound was crossed.
    Undecided,
}

/// Aggregated test-set verdict, reporting the weakest test (smallest
/// S-value) to guide effort targeting.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSetVerdict {
    /// The combined verdict.
    pub verdict: Verdict,
    /// Average E-value across the set (the statistic RED is computed from).
    pub mean_e_value: f64,
    /// Minimum S-value across the set (the statistic GREEN is computed from).
    pub min_s_value: f64,
    /// Name of the test with the minimum S-value, if the set is non-empty.
    pub weakest_test: Option<String>,
}

/// Combines per-test E-values into a test-set verdict.
///
/// `alpha_set`/`beta_set` are the aggregate false-alarm and missed-detection
/// error budgets. An empty set is vacuously reliable: [`Verdict::Green`]
/// with `min_s_value = +inf` and no weakest test.
#[must_use]
pub fn test_set_verdict(
    evalues: &[(String, TestEvalue)],
    alpha_set: f64,
    beta_set: f64,
) -> TestSetVerdict {
    if evalues.is_empty() {
        return TestSetVerdict {
            verdict: Verdict::Green,
            mean_e_value: 0.0,
            min_s_value: f64::INFINITY,
            weakest_test: None,
        };
    }

    #[allow(
        clippy::cast_precision_loss,
        reason = "test-set sizes are far below f64's exact-integer range in practice"
    )]
    let n = evalues.len() as f64;
    let mean_e_value = evalues.iter().map(|(_, v)| v.e_value).sum::<f64>() / n;

    let weakest = evalues
        .iter()
        .min_by(|(_, a), (_, b)| a.s_value.total_cmp(&b.s_value));
    let min_s_value = weakest.map_or(f64::INFINITY, |(_, v)| v.s_value);
    let weakest_test = weakest.map(|(name, _)| name.clone());

    let verdict = if mean_e_value > 1.0 / alpha_set {
        Verdict::Red
    } else if min_s_value > n / beta_set {
        Verdict::Green
    } else {
        Verdict::Undecided
    };

    TestSetVerdict {
        verdict,
        mean_e_value,
        min_s_value,
        weakest_test,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(runs: u64, passes: u64) -> Vec<HistoryEntry> {
        (0..runs)
            .map(|i| HistoryEntry {
                passed: i < passes,
                commit: None,
                target_hash: None,
            })
            .collect()
    }

    #[test]
    fn two_test_set_is_red() {
        let strong = quick_evalue(&history_of(50, 50), 0.99);
        let weak = quick_evalue(&history_of(50, 30), 0.99);
        let verdict = test_set_verdict(
            &[("strong".to_string(), strong), ("weak".to_string(), weak)],
            0.05,
            0.05,
        );
        assert_eq!(verdict.verdict, Verdict::Red);
        assert!(verdict.mean_e_value > 20.0);
        assert_eq!(verdict.weakest_test.as_deref(), Some("weak"));
    }

    #[test]
    fn empty_set_is_green() {
        let verdict = test_set_verdict(&[], 0.05, 0.05);
        assert_eq!(verdict.verdict, Verdict::Green);
        assert!(verdict.min_s_value.is_infinite());
        assert!(verdict.weakest_test.is_none());
    }

    #[test]
    fn quick_mode_pools_by_commit() {
        let history = vec![
            HistoryEntry {
                passed: true,
                commit: Some("c1".to_string()),
                target_hash: None,
            },
            HistoryEntry {
                passed: true,
                commit: Some("c1".to_string()),
                target_hash: None,
            },
            HistoryEntry {
                passed: false,
                commit: None,
                target_hash: None,
            },
        ];
        let value = quick_evalue(&history, 0.99);
        assert!(value.s_value.is_finite());
        assert!(value.e_value.is_finite());
    }

    #[test]
    fn hifi_mode_isolates_current_commit() {
        let history = vec![
            HistoryEntry {
                passed: true,
                commit: Some("c1".to_string()),
                target_hash: None,
            },
            HistoryEntry {
                passed: false,
                commit: Some("c0".to_string()),
                target_hash: None,
            },
        ];
        let value = hifi_evalue(&history, "c1", 0.99);
        let all_pass = hifi_evalue(&[HistoryEntry {
            passed: true,
            commit: Some("c1".to_string()),
            target_hash: None,
        }], "c1", 0.99);
        assert_eq!(value.s_value, all_pass.s_value);
    }
}
