//! Digit-Level Ensemble OCR + dual-provider orchestration core for
//! processing handwritten Colombian cédula registration forms.
//!
//! The crate is organized the way the spec's own module boundaries split the
//! problem: OCR ensemble resolution (`ocr`), fuzzy name validation
//! (`validation`), per-row automation (`row_processor`), the run-level state
//! machine (`orchestrator`), and the external collaborator traits the core
//! depends on but does not implement in full (`ports`).

pub mod config;
pub mod error;
pub mod keyboard;
pub mod ocr;
pub mod orchestrator;
pub mod ports;
pub mod reporter;
pub mod row_processor;
pub mod util;
pub mod validation;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use orchestrator::{Orchestrator, OrchestratorState};
pub use reporter::{ProcessingStats, Reporter};
