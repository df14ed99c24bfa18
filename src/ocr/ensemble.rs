//! C7 — Ensemble OCR driver.
//!
//! Runs the two OCR providers in parallel (`rayon::join`, join-before-return
//! per spec §5), pairs their candidate lists positionally (C6), then for
//! each pair: consults the length validator (C2) first, and otherwise runs
//! the full digit-level combination (C1 → C4 → C5).

use rayon::join;
use tracing::{info, warn};

use super::comparator;
use super::digit_confidence;
use super::length;
use super::pairing;
use super::provider::OcrProvider;
use super::stats;
use super::types::CedulaRecord;
use crate::config::DigitEnsembleConfig;

/// Run both providers over `image` and return the reconciled cédula list
///. If one provider errors, falls back to
/// single-provider mode using whichever succeeded, logging the failure
///.
pub fn extract(
    image: &[u8],
    primary: &dyn OcrProvider,
    secondary: &dyn OcrProvider,
    cfg: &DigitEnsembleConfig,
) -> Vec<CedulaRecord> {
    let (p_result, s_result) = join(|| primary.extract(image), || secondary.extract(image));

    match (p_result, s_result) {
        (Ok(p_candidates), Ok(s_candidates)) => {
            let pairs = pairing::pair(&p_candidates, &s_candidates);
            pairs
                .into_iter()
                .filter_map(|(p, s)| reconcile_pair(p, s, cfg))
                .collect()
        }
        (Ok(p_candidates), Err(e)) => {
            warn!(provider = secondary.provider_id(), error = %e, "secondary provider unavailable; single-provider fallback");
            single_provider_fallback(p_candidates)
        }
        (Err(e), Ok(s_candidates)) => {
            warn!(provider = primary.provider_id(), error = %e, "primary provider unavailable; single-provider fallback");
            single_provider_fallback(s_candidates)
        }
        (Err(ep), Err(es)) => {
            warn!(primary_error = %ep, secondary_error = %es, "both OCR providers unavailable; returning no candidates");
            Vec::new()
        }
    }
}

/// Single-provider fallback: trust the surviving provider's own confidence
/// verbatim, with no digit-level reconciliation possible.
fn single_provider_fallback(candidates: Vec<super::types::RawCandidate>) -> Vec<CedulaRecord> {
    candidates
        .into_iter()
        .map(|c| CedulaRecord { digits: c.digits, confidence: c.confidence })
        .collect()
}

fn reconcile_pair(
    p: &super::types::RawCandidate,
    s: &super::types::RawCandidate,
    cfg: &DigitEnsembleConfig,
) -> Option<CedulaRecord> {
    if let Some(chosen) = length::choose_by_length(p, s) {
        return Some(CedulaRecord {
            digits: chosen.digits.clone(),
            confidence: chosen.confidence,
        });
    }

    let p_data = digit_confidence::extract(p);
    let s_data = digit_confidence::extract(s);

    let decisions = comparator::compare_all(&p_data, &s_data, cfg)?;
    let ensemble_stats = stats::aggregate(&decisions);

    if !stats::validate(&ensemble_stats, cfg) {
        warn!(
            conflict_ratio = ensemble_stats.conflict_ratio,
            max = cfg.max_conflict_ratio,
            "ensemble rejected: conflict ratio exceeds gate"
        );
        return None;
    }

    if cfg.verbose_logging {
        for row in &ensemble_stats.rows {
            info!(position = row.position, digit = row.chosen_digit, confidence = row.chosen_confidence, kind = ?row.kind, "position decision");
        }
    }

    let digits: String = decisions.iter().map(|d| d.chosen_digit).collect();
    let digit_string = super::types::DigitString::new(digits)?;

    Some(CedulaRecord {
        digits: digit_string,
        confidence: super::types::ConfidenceScore::new(ensemble_stats.average_confidence),
    })
}
