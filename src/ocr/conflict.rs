//! C3 — Conflict resolver.
//!
//! Given two digits at one position with confidences, chooses one using a
//! confusion-pair-aware policy, falling back to raw confidence for generic
//! disagreements. Gates the result on `min_digit_confidence`.

use super::types::{ConfidenceScore, DecisionKind, DecisionSource, PositionDecision};
use crate::config::DigitEnsembleConfig;

/// Confusion matrix. Symmetric, unordered pairs; the
/// probabilities are informational only — only pair *membership* drives the
/// resolution policy below. Extending this table is expected over the
/// system's lifetime and requires no structural change.
const CONFUSION_PAIRS: &[(char, char)] = &[
    ('1', '7'),
    ('7', '2'),
    ('5', '6'),
    ('0', '6'),
    ('3', '8'),
    ('4', '9'),
];

fn is_confusion_pair(a: char, b: char) -> bool {
    CONFUSION_PAIRS
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}

/// Resolve one digit position. `position` is carried through into the returned decision only.
pub fn resolve(
    p_digit: char,
    p_conf: ConfidenceScore,
    s_digit: char,
    s_conf: ConfidenceScore,
    position: usize,
    cfg: &DigitEnsembleConfig,
) -> PositionDecision {
    let (chosen_digit, mut chosen_confidence, source, mut kind) = if p_digit == s_digit {
        let boosted = (p_conf.value().max(s_conf.value()) * cfg.confidence_boost).min(1.0);
        (p_digit, ConfidenceScore::new(boosted), DecisionSource::Both, DecisionKind::Unanimous)
    } else if is_confusion_pair(p_digit, s_digit) {
        let diff = p_conf.value() - s_conf.value();
        if diff >= cfg.ambiguity_threshold {
            (p_digit, p_conf, DecisionSource::Primary, DecisionKind::ConflictResolved)
        } else if -diff >= cfg.ambiguity_threshold {
            (s_digit, s_conf, DecisionSource::Secondary, DecisionKind::ConflictResolved)
        } else if p_conf.value() >= s_conf.value() {
            (p_digit, p_conf, DecisionSource::Primary, DecisionKind::ConflictResolved)
        } else {
            (s_digit, s_conf, DecisionSource::Secondary, DecisionKind::ConflictResolved)
        }
    } else if p_conf.value() >= s_conf.value() {
        (p_digit, p_conf, DecisionSource::Primary, DecisionKind::ConflictResolved)
    } else {
        (s_digit, s_conf, DecisionSource::Secondary, DecisionKind::ConflictResolved)
    };

    if chosen_confidence.value() < cfg.min_digit_confidence && !cfg.allow_low_confidence_override {
        kind = DecisionKind::Rejected;
    }
    // Keep the score that was actually compared against the gate, even when
    // rejected — callers key off `kind`, not a sentinel confidence value.
    chosen_confidence = ConfidenceScore::new(chosen_confidence.value());

    PositionDecision {
        position,
        chosen_digit,
        chosen_confidence,
        source,
        kind,
    }
}
