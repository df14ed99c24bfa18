//! Error taxonomy. Local recovery is preferred everywhere below
//! the orchestrator; only `ExtractionFailed` and `UserCancelled` are meant
//! to propagate out of [`crate::orchestrator::Orchestrator::run`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("required configuration key missing: {0}")]
    ConfigMissing(String),

    #[error("OCR provider '{provider}' unavailable: {reason}")]
    OcrProviderUnavailable { provider: String, reason: String },

    #[error("OCR response malformed for provider '{provider}': {reason}")]
    OcrResponseMalformed { provider: String, reason: String },

    #[error("ensemble rejected candidate at row {row}: {reason}")]
    EnsembleRejected { row: usize, reason: String },

    #[error("row {row} processing failed: {message}")]
    RowProcessingError { row: usize, message: String },

    #[error("handwritten row extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("run cancelled by user")]
    UserCancelled,

    #[error("not implemented: {0}")]
    NotImplemented(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
