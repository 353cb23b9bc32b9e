// crates/orchestrator-core/src/sprt.rs
// ============================================================================
// Module: SPRT Decider
// Description: Pure Sequential Probability Ratio Test over (runs, passes).
// Purpose: Classify a test as reliable/unreliable/undecided from aggregate
//          run counts, and walk history in reverse for demotion decisions.
// Dependencies: crate::status::HistoryEntry
// ============================================================================

//! ## Overview
//! `sprt_evaluate` is a pure function with no I/O and no persisted state; it
//! is the single source of truth for every accept/reject/continue decision
//! in the burn-in sweep, result processor, and effort runner.

use crate::status::HistoryEntry;

/// Margin between `p0` and the unreliable hypothesis `p1 = p0 - margin`.
pub const DEFAULT_MARGIN: f64 = 0.10;

/// Outcome of a single SPRT evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprtDecision {
    /// H0 (reliable) accepted.
    Accept,
    /// H0 rejected in favour of H1 (unreliable).
    Reject,
    /// Neither boundary crossed yet; more samples needed.
    Continue,
}

fn clamp_prob(p: f64) -> f64 {
    p.clamp(f64::EPSILON, 1.0 - f64::EPSILON)
}

/// Evaluates the Wald SPRT over `runs`/`passes` against reliability
/// threshold `p0` at statistical significance `confidence` (i.e. `alpha = 1 -
/// confidence` on each side), with `p1 = p0 - margin` as the unreliable
/// alternative.
///
/// `runs <= 0` always returns [`SprtDecision::Continue`].
#[must_use]
pub fn sprt_evaluate(
    runs: u64,
    passes: u64,
    p0: f64,
    confidence: f64,
    margin: f64,
) -> SprtDecision {
    if runs == 0 {
        return SprtDecision::Continue;
    }
    let p0 = clamp_prob(p0);
    let p1 = clamp_prob(p0 - margin);
    let alpha = (1.0 - confidence).clamp(f64::EPSILON, 1.0 - f64::EPSILON);
    let beta = alpha;

    #[allow(
        clippy::cast_precision_loss,
        reason = "run/pass counts are far below f64's exact-integer range in practice"
    )]
    let (runs_f, passes_f) = (runs as f64, passes as f64);
    let fails_f = runs_f - passes_f;

    let log_ratio =
        passes_f * (p0 / p1).ln() + fails_f * ((1.0 - p0) / (1.0 - p1)).ln();

    let accept_bound = ((1.0 - beta) / alpha).ln();
    let reject_bound = (beta / (1.0 - alpha)).ln();

    if log_ratio >= accept_bound {
        SprtDecision::Accept
    } else if log_ratio <= reject_bound {
        SprtDecision::Reject
    } else {
        SprtDecision::Continue
    }
}

/// Evaluates `sprt_evaluate` with the default margin (`0.10`).
#[must_use]
pub fn sprt_evaluate_default_margin(
    runs: u64,
    passes: u64,
    p0: f64,
    confidence: f64,
) -> SprtDecision {
    sprt_evaluate(runs, passes, p0, confidence, DEFAULT_MARGIN)
}

/// Semantic outcome of walking a test's history in search of a demotion
/// decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemotionDecision {
    /// SPRT accepted reliability over some suffix: retain `stable`.
    Retain,
    /// SPRT rejected reliability over some suffix: demote to `flaky`.
    Demote,
    /// No suffix produced a decision before history was exhausted.
    Inconclusive,
}

/// Walks `history` newest-first, re-running SPRT over progressively larger
/// suffixes (1 entry, 2 entries, ...) until a non-`continue` decision is
/// reached or history is exhausted.
#[must_use]
pub fn demotion_evaluate(history: &[HistoryEntry], p0: f64, confidence: f64) -> DemotionDecision {
    for suffix_len in 1..=history.len() {
        let suffix = &history[..suffix_len];
        let runs = suffix.len() as u64;
        let passes = suffix.iter().filter(|entry| entry.passed).count() as u64;
        match sprt_evaluate_default_margin(runs, passes, p0, confidence) {
            SprtDecision::Accept => return DemotionDecision::Retain,
            SprtDecision::Reject => return DemotionDecision::Demote,
            SprtDecision::Continue => {}
        }
    }
    DemotionDecision::Inconclusive
}
