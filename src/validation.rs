//! C8 — Fuzzy validator.
//!
//! Normalizes and compares handwritten vs. rendered name tokens, classifying
//! the row into one of `{AUTO_SAVE, REQUIRE_VALIDATION, ALERT_NOT_FOUND}`.

use std::cell::RefCell;
use std::collections::HashMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::ocr::DigitString;
use crate::util::edit_ratio;

/// Handwritten connector words filtered out of name tokens unless the full
/// name has only two tokens.
const CONNECTORS: &[&str] = &["DE", "LA", "DEL", "LAS", "LOS", "Y"];

/// The handwritten row extracted from the paper form.
#[derive(Debug, Clone)]
pub struct RowData {
    pub row_index: usize,
    pub names: String,
    pub cedula: Option<DigitString>,
    pub is_empty: bool,
    pub per_field_confidence: HashMap<String, f64>,
}

/// The rendered web-form response. `is_empty = true` encodes
/// "person not found" (all four fields blank).
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pub first_name: String,
    pub middle_name: String,
    pub first_surname: String,
    pub second_surname: String,
    pub is_empty: bool,
}

impl FormData {
    /// Builds a `FormData`, deriving `is_empty` from the four fields — true
    /// iff all four are empty after normalization.
    pub fn new(first_name: &str, middle_name: &str, first_surname: &str, second_surname: &str) -> FormData {
        let is_empty = [first_name, middle_name, first_surname, second_surname]
            .iter()
            .all(|f| f.trim().is_empty());
        FormData {
            first_name: first_name.to_string(),
            middle_name: middle_name.to_string(),
            first_surname: first_surname.to_string(),
            second_surname: second_surname.to_string(),
            is_empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub field_id: String,
    pub matched: bool,
    pub similarity: f64, // clamped [0.0, 1.0] but stored as f64 like the rest of the model
    pub compared: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationAction {
    AutoSave,
    RequireValidation,
    AlertNotFound,
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub action: ValidationAction,
    pub confidence: f64,
    pub matches: HashMap<String, FieldMatch>,
    pub detail: String,
}

/// Owns a per-instance normalization cache.
pub struct FuzzyValidator {
    min_similarity: f64,
    cache: RefCell<HashMap<String, String>>,
}

impl FuzzyValidator {
    pub fn new(min_similarity: f64) -> FuzzyValidator {
        FuzzyValidator {
            min_similarity,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Strip diacritics, uppercase, strip non-alphanumerics, collapse
    /// whitespace. Cached per input string; a threshold change
    /// invalidates the whole cache since it's a different validator config.
    pub fn normalize(&self, s: &str) -> String {
        if let Some(cached) = self.cache.borrow().get(s) {
            return cached.clone();
        }
        let normalized = normalize_text(s);
        self.cache.borrow_mut().insert(s.to_string(), normalized.clone());
        normalized
    }

    fn similarity(&self, a: &str, b: &str) -> f64 {
        edit_ratio(&self.normalize(a), &self.normalize(b))
    }

    /// Split handwritten names into a token set, dropping short connectors
    /// unless doing so would leave fewer than two tokens overall.
    fn tokenize_names(&self, names: &str) -> Vec<String> {
        let normalized = self.normalize(names);
        let all_tokens: Vec<String> = normalized.split_whitespace().map(|t| t.to_string()).collect();
        if all_tokens.len() <= 2 {
            return all_tokens;
        }
        let filtered: Vec<String> = all_tokens
            .iter()
            .filter(|t| !CONNECTORS.contains(&t.as_str()))
            .cloned()
            .collect();
        if filtered.is_empty() {
            all_tokens
        } else {
            filtered
        }
    }

    /// Best similarity (and the matched token) between `field` and any
    /// handwritten token.
    fn best_token_match(&self, field: &str, tokens: &[String]) -> (f64, String) {
        let normalized_field = self.normalize(field);
        tokens
            .iter()
            .map(|t| (edit_ratio(&normalized_field, t), t.clone()))
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((0.0, String::new()))
    }

    /// Classify one row.
    pub fn validate(&self, row: &RowData, form: &FormData) -> ValidationResult {
        if form.is_empty {
            return ValidationResult {
                status: ValidationStatus::Error,
                action: ValidationAction::AlertNotFound,
                confidence: 0.0,
                matches: HashMap::new(),
                detail: "person not in database".to_string(),
            };
        }

        let tokens = self.tokenize_names(&row.names);
        let mut matches = HashMap::new();

        // Surname gate: form.first_surname must match some handwritten token
        // at or above min_similarity.
        let (surname_sim, surname_token) = self.best_token_match(&form.first_surname, &tokens);
        let surname_matched = surname_sim >= self.min_similarity;
        matches.insert(
            "first_surname".to_string(),
            FieldMatch {
                field_id: "first_surname".to_string(),
                matched: surname_matched,
                similarity: surname_sim,
                compared: surname_token,
            },
        );

        // Name gate: at least one non-empty rendered name field must match.
        let mut name_gate = false;
        for (field_id, field_value) in [("first_name", &form.first_name), ("middle_name", &form.middle_name)] {
            if field_value.trim().is_empty() {
                continue;
            }
            let (sim, token) = self.best_token_match(field_value, &tokens);
            let matched = sim >= self.min_similarity;
            if matched {
                name_gate = true;
            }
            matches.insert(
                field_id.to_string(),
                FieldMatch {
                    field_id: field_id.to_string(),
                    matched,
                    similarity: sim,
                    compared: token,
                },
            );
        }

        let confidence = if matches.is_empty() {
            0.0
        } else {
            matches.values().map(|m| m.similarity).sum::<f64>() / matches.len() as f64
        };

        if surname_matched && name_gate {
            ValidationResult {
                status: ValidationStatus::Ok,
                action: ValidationAction::AutoSave,
                confidence,
                matches,
                detail: "surname and at least one name field matched".to_string(),
            }
        } else {
            let detail = match (surname_matched, name_gate) {
                (false, false) => "surname gate and name gate both failed".to_string(),
                (false, true) => "surname gate failed".to_string(),
                (true, false) => "name gate failed".to_string(),
                (true, true) => unreachable!(),
            };
            ValidationResult {
                status: ValidationStatus::Warning,
                action: ValidationAction::RequireValidation,
                confidence,
                matches,
                detail,
            }
        }
    }
}

/// Strip diacritics (via NFD decomposition + combining-mark filter),
/// uppercase, strip non-alphanumerics, collapse whitespace.
fn normalize_text(s: &str) -> String {
    let decomposed: String = s.nfd().filter(|c| !is_combining_mark(*c)).collect();
    let upper = decomposed.to_uppercase();
    let mut out = String::with_capacity(upper.len());
    let mut last_was_space = true; // swallow leading whitespace
    for c in upper.chars() {
        if c.is_alphanumeric() {
            out.push(c);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim_end().to_string()
}
