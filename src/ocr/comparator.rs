//! C4 — Digit comparator.
//!
//! Drives C3 across all positions of two equal-length `DigitConfidenceData`
//! values, producing a per-position decision record. Aborts the whole
//! cédula (returns `None`) the moment C3 rejects a position.

use super::conflict;
use super::types::{ConfidenceScore, DecisionKind, DecisionSource, DigitConfidenceData, PositionDecision};
use crate::config::DigitEnsembleConfig;

/// Compares `p_data` and `s_data` position by position. Pre-condition:
/// `p_data.text.len() == s_data.text.len()` (guaranteed by C2 having already
/// been consulted and returned `None`). Returns `None` if any position is
/// `REJECTED` by C3.
pub fn compare_all(
    p_data: &DigitConfidenceData,
    s_data: &DigitConfidenceData,
    cfg: &DigitEnsembleConfig,
) -> Option<Vec<PositionDecision>> {
    debug_assert_eq!(p_data.text.len(), s_data.text.len());

    let mut decisions = Vec::with_capacity(p_data.text.len());
    for i in 0..p_data.text.len() {
        let p_digit = p_data.text.char_at(i);
        let s_digit = s_data.text.char_at(i);

        let decision = match (p_digit, s_digit) {
            (Some(p), Some(s)) if p.is_ascii_digit() && s.is_ascii_digit() => {
                conflict::resolve(p, p_data.per_digit[i], s, s_data.per_digit[i], i, cfg)
            }
            (Some(p), _) if p.is_ascii_digit() => single_source(i, p, p_data.per_digit[i], DecisionSource::Primary),
            (_, Some(s)) if s.is_ascii_digit() => {
                single_source(i, s, s_data.per_digit[i], DecisionSource::Secondary)
            }
            _ => continue, // neither side has a digit here; nothing to emit
        };

        if decision.kind == DecisionKind::Rejected {
            return None;
        }
        decisions.push(decision);
    }
    Some(decisions)
}

fn single_source(position: usize, digit: char, confidence: ConfidenceScore, source: DecisionSource) -> PositionDecision {
    PositionDecision {
        position,
        chosen_digit: digit,
        chosen_confidence: confidence,
        source,
        kind: DecisionKind::SingleSource,
    }
}
