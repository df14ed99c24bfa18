//! Digit-Level Ensemble OCR Core.

pub mod comparator;
pub mod conflict;
pub mod digit_confidence;
pub mod ensemble;
pub mod length;
pub mod pairing;
pub mod provider;
pub mod stats;
pub mod types;

pub use ensemble::extract;
pub use provider::{AzureReadProvider, GoogleVisionProvider, NullOcrProvider, OcrProvider};
pub use types::{CedulaRecord, ConfidenceScore, DigitString};
