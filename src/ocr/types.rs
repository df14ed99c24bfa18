//! Core data model. These are small value types shared by every
//! component in the digit-level ensemble; an implementation may realize them
//! as records, structs, classes, or algebraic types — here, structs and enums.

use std::fmt;
use std::sync::Arc;

/// An ordered sequence of decimal digits, length 3–11.
/// Invariants: non-empty, decimal only, no whitespace, immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DigitString(String);

/// Minimum accepted length for a `DigitString`.
pub const MIN_DIGITS: usize = 3;
/// Maximum accepted length for a `DigitString`.
pub const MAX_DIGITS: usize = 11;

impl DigitString {
    /// Builds a `DigitString`, returning `None` if `s` is not 3–11 decimal
    /// digits with no whitespace. Cédula validity is deliberately not
    /// checksum-verified: any digit run in range is accepted.
    pub fn new(s: impl Into<String>) -> Option<DigitString> {
        let s = s.into();
        if s.len() < MIN_DIGITS || s.len() > MAX_DIGITS {
            return None;
        }
        if !s.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(DigitString(s))
    }

    /// Builds a `DigitString` from only the digit characters found in `s`,
    /// discarding everything else, still enforcing the length bound.
    pub fn from_noisy(s: &str) -> Option<DigitString> {
        let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
        DigitString::new(digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars()
    }

    pub fn char_at(&self, i: usize) -> Option<char> {
        self.0.as_bytes().get(i).map(|&b| b as char)
    }
}

impl fmt::Display for DigitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A real in `[0.0, 1.0]`, clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceScore(f64);

impl ConfidenceScore {
    pub fn new(v: f64) -> ConfidenceScore {
        ConfidenceScore(v.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl From<f64> for ConfidenceScore {
    fn from(v: f64) -> Self {
        ConfidenceScore::new(v)
    }
}

/// A provider's native response tree handle, opaque to every component
/// except C1.
#[derive(Debug, Clone)]
pub enum RawResponseHandle {
    /// Google-Vision-style tree: pages → blocks → paragraphs → words → symbols,
    /// each symbol carrying its own confidence. `Arc`-shared: every row
    /// candidate from one API call points at the same full-page response.
    GoogleVision(Arc<serde_json::Value>),
    /// Azure-Read-style tree: blocks → lines → words, confidence per word only.
    AzureRead(Arc<serde_json::Value>),
}

impl RawResponseHandle {
    pub fn google_vision(v: serde_json::Value) -> RawResponseHandle {
        RawResponseHandle::GoogleVision(Arc::new(v))
    }

    pub fn azure_read(v: serde_json::Value) -> RawResponseHandle {
        RawResponseHandle::AzureRead(Arc::new(v))
    }
}

/// One OCR provider's guess for one row.
#[derive(Debug, Clone)]
pub struct RawCandidate {
    pub digits: DigitString,
    pub confidence: ConfidenceScore,
    pub provider_id: String,
    pub raw_response_handle: RawResponseHandle,
}

/// Output of C1: per-digit confidences aligned to `text`.
/// Invariant: `per_digit.len() == text.len()`.
#[derive(Debug, Clone)]
pub struct DigitConfidenceData {
    pub text: DigitString,
    pub per_digit: Vec<ConfidenceScore>,
    pub average: ConfidenceScore,
    pub source_id: String,
}

impl DigitConfidenceData {
    /// Panics only on a programmer error (mismatched slice/text length);
    /// every constructor in `crate::ocr::digit_confidence` upholds the
    /// invariant before calling this.
    pub fn new(
        text: DigitString,
        per_digit: Vec<ConfidenceScore>,
        source_id: impl Into<String>,
    ) -> DigitConfidenceData {
        assert_eq!(
            per_digit.len(),
            text.len(),
            "per_digit length must match text length"
        );
        let average = if per_digit.is_empty() {
            ConfidenceScore::new(0.0)
        } else {
            let sum: f64 = per_digit.iter().map(|c| c.value()).sum();
            ConfidenceScore::new(sum / per_digit.len() as f64)
        };
        DigitConfidenceData {
            text,
            per_digit,
            average,
            source_id: source_id.into(),
        }
    }
}

/// Which source(s) contributed the chosen digit at one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Primary,
    Secondary,
    Both,
}

/// How a position's digit was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    Unanimous,
    ConflictResolved,
    SingleSource,
    Rejected,
}

/// Output of C3/C4 for one digit position.
#[derive(Debug, Clone)]
pub struct PositionDecision {
    pub position: usize,
    pub chosen_digit: char,
    pub chosen_confidence: ConfidenceScore,
    pub source: DecisionSource,
    pub kind: DecisionKind,
}

/// Final reconciled output of C7 for one cédula.
#[derive(Debug, Clone, PartialEq)]
pub struct CedulaRecord {
    pub digits: DigitString,
    pub confidence: ConfidenceScore,
}
