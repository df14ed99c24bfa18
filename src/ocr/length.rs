//! C2 — Length validator.
//!
//! When two candidate strings for the same row differ in length, picks one
//! by the priority table below and short-circuits digit-level combination
//! entirely. Rationale: one provider frequently inserts/drops a digit, and
//! blindly aligning positions in that case is worse than trusting length.

use super::types::RawCandidate;

/// Priority table from spec §4.2. Higher wins; unlisted lengths are 0.
fn priority(len: usize) -> u8 {
    match len {
        10 => 3, // current Colombian format
        8 => 2,  // legacy Colombian format
        9 => 1,  // almost always an OCR artifact
        _ => 0,  // rare
    }
}

/// Returns `Some(candidate)` when lengths differ and the length priority
/// table (ties broken by confidence) picks a winner outright, bypassing
/// digit-level reconciliation entirely. Returns `None` when lengths are
/// equal, deferring to C3/C4.
pub fn choose_by_length<'a>(
    primary: &'a RawCandidate,
    secondary: &'a RawCandidate,
) -> Option<&'a RawCandidate> {
    if primary.digits.len() == secondary.digits.len() {
        return None;
    }

    let p_priority = priority(primary.digits.len());
    let s_priority = priority(secondary.digits.len());

    match p_priority.cmp(&s_priority) {
        std::cmp::Ordering::Greater => Some(primary),
        std::cmp::Ordering::Less => Some(secondary),
        std::cmp::Ordering::Equal => {
            if primary.confidence.value() >= secondary.confidence.value() {
                Some(primary)
            } else {
                Some(secondary)
            }
        }
    }
}
