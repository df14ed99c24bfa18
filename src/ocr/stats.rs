//! C5 — Ensemble statistics.
//!
//! Aggregates per-position decisions into agreement/conflict ratios and a
//! global confidence, then gates the cédula as a whole against
//! `max_conflict_ratio`. Single-source positions count only in `total`
//!.

use super::types::{DecisionKind, PositionDecision};
use crate::config::DigitEnsembleConfig;

/// One row of the verbose per-position echo.
#[derive(Debug, Clone)]
pub struct StatsRow {
    pub position: usize,
    pub chosen_digit: char,
    pub chosen_confidence: f64,
    pub kind: DecisionKind,
}

#[derive(Debug, Clone)]
pub struct EnsembleStats {
    pub total: usize,
    pub unanimous: usize,
    pub conflicts: usize,
    pub unanimous_ratio: f64,
    pub conflict_ratio: f64,
    pub average_confidence: f64,
    pub rows: Vec<StatsRow>,
}

/// Aggregate decisions into `EnsembleStats`.
pub fn aggregate(decisions: &[PositionDecision]) -> EnsembleStats {
    let total = decisions.len();
    let unanimous = decisions.iter().filter(|d| d.kind == DecisionKind::Unanimous).count();
    let conflicts = decisions.iter().filter(|d| d.kind == DecisionKind::ConflictResolved).count();

    let unanimous_ratio = if total == 0 { 0.0 } else { unanimous as f64 / total as f64 };
    let conflict_ratio = if total == 0 { 0.0 } else { conflicts as f64 / total as f64 };
    let average_confidence = if total == 0 {
        0.0
    } else {
        decisions.iter().map(|d| d.chosen_confidence.value()).sum::<f64>() / total as f64
    };

    let rows = decisions
        .iter()
        .map(|d| StatsRow {
            position: d.position,
            chosen_digit: d.chosen_digit,
            chosen_confidence: d.chosen_confidence.value(),
            kind: d.kind,
        })
        .collect();

    EnsembleStats {
        total,
        unanimous,
        conflicts,
        unanimous_ratio,
        conflict_ratio,
        average_confidence,
        rows,
    }
}

/// The hard gate: reject when more than half the positions disagreed. Strictly greater-than, per §8 boundary property #12.
pub fn validate(stats: &EnsembleStats, cfg: &DigitEnsembleConfig) -> bool {
    stats.conflict_ratio <= cfg.max_conflict_ratio
}
