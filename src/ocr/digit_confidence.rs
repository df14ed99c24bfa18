//! C1 — Per-digit confidence extractor.
//!
//! Walks a provider's native response tree and emits `(digit, confidence)`
//! pairs aligned to the target numeric string. Handles two native shapes:
//! Google-Vision-style (`pages → blocks → paragraphs → words → symbols`,
//! per-symbol confidence) and Azure-Read-style (`blocks → lines → words`,
//! per-word confidence only, inherited by every digit in the word).

use tracing::{debug, warn};

use super::types::{ConfidenceScore, DigitConfidenceData, DigitString, RawCandidate, RawResponseHandle};

/// Uniform-confidence fallback used when the response tree is empty or
/// cannot be traversed at all.
const EMPTY_RESPONSE_FALLBACK: f64 = 0.85;

/// One flattened character with its provider-assigned confidence.
struct FlatChar {
    ch: char,
    confidence: f64,
}

/// Extract per-digit confidences for `candidate.digits` from its own
/// `raw_response_handle`.
///
/// Never propagates traversal errors: malformed trees fall back to a
/// uniform-confidence `DigitConfidenceData` with an advisory log, per §4.1
/// "Failures" and §7's `OCR_RESPONSE_MALFORMED` taxonomy entry.
pub fn extract(candidate: &RawCandidate) -> DigitConfidenceData {
    let target = &candidate.digits;
    let flat = match &candidate.raw_response_handle {
        RawResponseHandle::GoogleVision(v) => flatten_google_vision(v.as_ref()),
        RawResponseHandle::AzureRead(v) => flatten_azure_read(v.as_ref()),
    };

    if flat.is_empty() {
        warn!(
            provider = %candidate.provider_id,
            "empty OCR response tree; falling back to uniform confidence {EMPTY_RESPONSE_FALLBACK}"
        );
        return uniform_fallback(target, EMPTY_RESPONSE_FALLBACK, &candidate.provider_id);
    }

    let digits_projection: String = flat.iter().filter(|f| f.ch.is_ascii_digit()).map(|f| f.ch).collect();
    let digit_confidences: Vec<f64> = flat
        .iter()
        .filter(|f| f.ch.is_ascii_digit())
        .map(|f| f.confidence)
        .collect();

    match digits_projection.find(target.as_str()) {
        Some(start) => {
            let per_digit: Vec<ConfidenceScore> = digit_confidences[start..start + target.len()]
                .iter()
                .map(|&c| ConfidenceScore::new(c))
                .collect();
            debug!(
                provider = %candidate.provider_id,
                target = %target,
                "matched target in digits-only projection at offset {start}"
            );
            DigitConfidenceData::new(target.clone(), per_digit, candidate.provider_id.clone())
        }
        None => {
            let mean = mean_of(&digit_confidences).unwrap_or(EMPTY_RESPONSE_FALLBACK);
            warn!(
                provider = %candidate.provider_id,
                target = %target,
                "target not found in digits-only projection; using mean confidence {mean:.3}"
            );
            uniform_fallback(target, mean, &candidate.provider_id)
        }
    }
}

fn uniform_fallback(target: &DigitString, value: f64, source_id: &str) -> DigitConfidenceData {
    let per_digit = vec![ConfidenceScore::new(value); target.len()];
    DigitConfidenceData::new(target.clone(), per_digit, source_id.to_string())
}

fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Flatten `pages → blocks → paragraphs → words → symbols`, one `FlatChar`
/// per symbol, in reading order. Any unexpected shape yields an empty vec
/// (caught by the empty-response fallback above), never a panic.
fn flatten_google_vision(v: &serde_json::Value) -> Vec<FlatChar> {
    let mut out = Vec::new();
    let pages = v
        .get("fullTextAnnotation")
        .and_then(|f| f.get("pages"))
        .and_then(|p| p.as_array());
    let Some(pages) = pages else { return out };

    for page in pages {
        let Some(blocks) = page.get("blocks").and_then(|b| b.as_array()) else { continue };
        for block in blocks {
            let Some(paragraphs) = block.get("paragraphs").and_then(|p| p.as_array()) else { continue };
            for paragraph in paragraphs {
                let Some(words) = paragraph.get("words").and_then(|w| w.as_array()) else { continue };
                for word in words {
                    let Some(symbols) = word.get("symbols").and_then(|s| s.as_array()) else { continue };
                    for symbol in symbols {
                        let Some(text) = symbol.get("text").and_then(|t| t.as_str()) else { continue };
                        let confidence = symbol.get("confidence").and_then(|c| c.as_f64()).unwrap_or(0.0);
                        for ch in text.chars() {
                            out.push(FlatChar { ch, confidence });
                        }
                    }
                }
            }
        }
    }
    out
}

/// Flatten `blocks → lines → words`, one `FlatChar` per character of each
/// word's text, all inheriting that word's confidence.
fn flatten_azure_read(v: &serde_json::Value) -> Vec<FlatChar> {
    let mut out = Vec::new();
    let Some(blocks) = v
        .get("readResult")
        .and_then(|r| r.get("blocks"))
        .and_then(|b| b.as_array())
    else {
        return out;
    };

    for block in blocks {
        let Some(lines) = block.get("lines").and_then(|l| l.as_array()) else { continue };
        for line in lines {
            let Some(words) = line.get("words").and_then(|w| w.as_array()) else { continue };
            for word in words {
                let Some(text) = word.get("text").and_then(|t| t.as_str()) else { continue };
                let confidence = word.get("confidence").and_then(|c| c.as_f64()).unwrap_or(0.0);
                for ch in text.chars() {
                    out.push(FlatChar { ch, confidence });
                }
            }
        }
    }
    out
}
