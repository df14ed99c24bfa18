//! C6 — Pairing resolver.
//!
//! Maps provider A's candidate list to provider B's **by position** — rows
//! are read top-to-bottom in the source form, and similarity-maximizing
//! pairing loses that ordering whenever one side misreads multiple digits.
//! A small symmetric window allows a positional pair to be swapped for a
//! better-matching neighbor when the straight positional match looks wrong.

use super::types::RawCandidate;
use crate::util::edit_ratio;

/// Below this similarity, a positional pair is considered suspicious enough
/// to search the window for a better match.
const SIMILARITY_FLOOR: f64 = 0.30;
/// Radius of the symmetric search window.
const WINDOW_RADIUS: usize = 2;

/// Pair `primary[i]` with `secondary[i]` for `i` in `[0, min(len))`,
/// swapping in a better-matching neighbor from within `WINDOW_RADIUS` when
/// the straight positional match falls below `SIMILARITY_FLOOR`. Unpaired
/// trailing entries on the longer side are dropped.
pub fn pair<'a>(
    primary: &'a [RawCandidate],
    secondary: &'a [RawCandidate],
) -> Vec<(&'a RawCandidate, &'a RawCandidate)> {
    let n = primary.len().min(secondary.len());
    let mut pairs = Vec::with_capacity(n);

    for i in 0..n {
        let p = &primary[i];
        let straight_sim = edit_ratio(p.digits.as_str(), secondary[i].digits.as_str());

        if straight_sim >= SIMILARITY_FLOOR {
            pairs.push((p, &secondary[i]));
            continue;
        }

        // Straight pair looks wrong; search the opposite list's window for a
        // better match. If nothing beats the straight pair, keep it anyway
        //.
        let lo = i.saturating_sub(WINDOW_RADIUS);
        let hi = (i + WINDOW_RADIUS + 1).min(secondary.len());
        let best = (lo..hi)
            .filter(|&j| j != i)
            .map(|j| (j, edit_ratio(p.digits.as_str(), secondary[j].digits.as_str())))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((j, sim)) if sim > straight_sim => pairs.push((p, &secondary[j])),
            _ => pairs.push((p, &secondary[i])),
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::types::{ConfidenceScore, DigitString, RawResponseHandle};
    use serde_json::json;

    fn candidate(digits: &str) -> RawCandidate {
        RawCandidate {
            digits: DigitString::new(digits).unwrap(),
            confidence: ConfidenceScore::new(0.9),
            provider_id: "t".to_string(),
            raw_response_handle: RawResponseHandle::google_vision(json!({})),
        }
    }

    #[test]
    fn positional_pairing_by_default() {
        let primary = vec![candidate("123456789"), candidate("987654321")];
        let secondary = vec![candidate("123456780"), candidate("987654320")];
        let pairs = pair(&primary, &secondary);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0.digits.as_str(), "123456789");
        assert_eq!(pairs[0].1.digits.as_str(), "123456780");
    }

    #[test]
    fn unpaired_trailing_entries_dropped() {
        let primary = vec![candidate("111111111"), candidate("222222222"), candidate("333333333")];
        let secondary = vec![candidate("111111110")];
        let pairs = pair(&primary, &secondary);
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn window_swap_finds_better_match_when_straight_pair_is_bad() {
        let primary = vec![candidate("531340511"), candidate("111111111")];
        // secondary[0] is a poor match for primary[0], secondary[1] is a near match
        let secondary = vec![candidate("999999999"), candidate("531340512")];
        let pairs = pair(&primary, &secondary);
        assert_eq!(pairs[0].1.digits.as_str(), "531340512");
    }

    #[test]
    fn bad_match_kept_positionally_when_no_better_candidate_in_window() {
        let primary = vec![candidate("531340511")];
        let secondary = vec![candidate("999999999")];
        let pairs = pair(&primary, &secondary);
        // only one candidate on each side; nothing better in window -> kept positionally
        assert_eq!(pairs[0].1.digits.as_str(), "999999999");
    }
}
