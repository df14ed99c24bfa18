//! C12 — Orchestrator.
//!
//! Top-level state machine: extract rows → process each → honor pause/resume
//! → finalize. Per §7, only `EXTRACTION_FAILED` and `USER_CANCELLED` ever
//! propagate out of `run`; every other failure is absorbed into the
//! reporter's counters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rdev::Key;
use tracing::{error, info};

use crate::keyboard::KeyboardSupervisor;
use crate::ports::{AlertSink, HandwrittenRowExtractor, ProgressHandler};
use crate::reporter::{ProcessingStats, Reporter};
use crate::row_processor::{RowOutcome, RowProcessor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Running,
    PausedByUser,
    PausedForAlert,
    PausedOnError,
    Completed,
    Cancelled,
}

/// How long the orchestrator sleeps between polls while paused, waiting for
/// the resume flag or an external cancel. Not configuration-driven: this is
/// purely an internal poll granularity, not a wait time §4.9 asks operators
/// to control.
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct Orchestrator<'a> {
    row_extractor: &'a dyn HandwrittenRowExtractor,
    row_processor: RowProcessor<'a>,
    alert_sink: &'a dyn AlertSink,
    progress: &'a dyn ProgressHandler,
    reporter: Reporter,
    expected_rows: usize,
    pause_key: Key,
    resume_key: Key,
    state: OrchestratorState,
    cancel_flag: Arc<AtomicBool>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        row_extractor: &'a dyn HandwrittenRowExtractor,
        row_processor: RowProcessor<'a>,
        alert_sink: &'a dyn AlertSink,
        progress: &'a dyn ProgressHandler,
        expected_rows: usize,
    ) -> Orchestrator<'a> {
        Orchestrator {
            row_extractor,
            row_processor,
            alert_sink,
            progress,
            reporter: Reporter::new(),
            expected_rows,
            pause_key: crate::keyboard::DEFAULT_PAUSE_KEY,
            resume_key: crate::keyboard::DEFAULT_RESUME_KEY,
            state: OrchestratorState::Idle,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// A handle an external caller can use to request cancellation (§5's
    /// "terminal cancel flag"). Checked at row boundaries and while paused.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    pub fn run(&mut self, image: &[u8]) -> ProcessingStats {
        self.state = OrchestratorState::Running;

        let rows = match self.row_extractor.extract_rows(image, self.expected_rows) {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "handwritten row extraction failed; returning empty stats");
                self.progress.show_completion_summary(self.reporter.stats());
                return self.reporter.stats().clone();
            }
        };

        self.reporter.set_total(rows.len());
        let supervisor = KeyboardSupervisor::acquire(self.pause_key, self.resume_key);

        for (i, row) in rows.iter().enumerate() {
            if self.cancel_flag.load(Ordering::Relaxed) {
                self.state = OrchestratorState::Cancelled;
                break;
            }

            if supervisor.pause_requested() {
                self.state = OrchestratorState::PausedByUser;
                self.progress.set_status("paused");
                if !self.wait_for_resume(&supervisor) {
                    self.state = OrchestratorState::Cancelled;
                    break;
                }
                supervisor.clear_pause();
                supervisor.clear_resume();
                self.state = OrchestratorState::Running;
            }

            let row_number = i + 1;
            let outcome = self.row_processor.process(row, row_number, self.alert_sink);
            self.apply_outcome(outcome);
            self.reporter.increment_processed();

            let message = self.reporter.progress_message(row_number);
            self.progress.update(row_number, rows.len(), &message);
        }

        // `supervisor` is dropped here — scope exit releases the listener
        // thread whether the loop finished normally, via `break`, or (per
        // §4.10's cancellation guarantee) by unwinding on panic.
        drop(supervisor);

        if self.state != OrchestratorState::Cancelled {
            self.state = OrchestratorState::Completed;
        }
        info!(state = ?self.state, "run finished");
        self.progress.show_completion_summary(self.reporter.stats());
        self.reporter.stats().clone()
    }

    /// Blocks until the resume flag is set or cancellation is requested.
    /// Returns `false` if cancelled while paused.
    fn wait_for_resume(&self, supervisor: &KeyboardSupervisor) -> bool {
        while !supervisor.resume_requested() {
            if self.cancel_flag.load(Ordering::Relaxed) {
                return false;
            }
            thread::sleep(PAUSE_POLL_INTERVAL);
        }
        true
    }

    fn apply_outcome(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::AutoSaved => self.reporter.increment_auto_saved(),
            RowOutcome::RequiredValidation => self.reporter.increment_required_validation(),
            RowOutcome::EmptyRow => self.reporter.increment_empty_rows(),
            RowOutcome::NotFound => self.reporter.increment_not_found(),
            RowOutcome::Error => self.reporter.increment_errors(),
            RowOutcome::Skipped => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AutomationConfig, FieldRegion, SearchFieldConfig};
    use crate::error::CoreError;
    use crate::ocr::DigitString;
    use crate::ports::{
        EmptyRowReply, ErrorReply, HeadlessAlertSink, HeadlessProgressHandler, NotFoundReply, NullAutomation,
        NullScreenCapture, RegionWebFormOcr, ValidationReply,
    };
    use crate::validation::{FuzzyValidator, RowData, ValidationResult};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedRowExtractor {
        rows: Vec<RowData>,
    }

    impl HandwrittenRowExtractor for FixedRowExtractor {
        fn extract_rows(&self, _image: &[u8], _expected_rows: usize) -> crate::error::CoreResult<Vec<RowData>> {
            Ok(self.rows.clone())
        }
    }

    struct FailingRowExtractor;

    impl HandwrittenRowExtractor for FailingRowExtractor {
        fn extract_rows(&self, _image: &[u8], _expected_rows: usize) -> crate::error::CoreResult<Vec<RowData>> {
            Err(CoreError::ExtractionFailed("no rows detected".to_string()))
        }
    }

    struct RecordingProgress {
        calls: Mutex<Vec<(usize, usize)>>,
    }

    impl ProgressHandler for RecordingProgress {
        fn update(&self, current: usize, total: usize, _message: &str) {
            self.calls.lock().unwrap().push((current, total));
        }
        fn set_status(&self, _status: &str) {}
        fn show_completion_summary(&self, _stats: &ProcessingStats) {}
    }

    fn field_regions() -> HashMap<String, FieldRegion> {
        let region = FieldRegion { x: 0.0, y: 0.0, width: 1.0, height: 1.0 };
        ["first_name", "middle_name", "first_surname", "second_surname"]
            .into_iter()
            .map(|k| (k.to_string(), region))
            .collect()
    }

    fn row(cedula: &str) -> RowData {
        RowData {
            row_index: 0,
            names: "JOHN DOE".to_string(),
            cedula: DigitString::new(cedula),
            is_empty: false,
            per_field_confidence: HashMap::new(),
        }
    }

    #[test]
    fn extraction_failure_returns_empty_stats_without_panicking() {
        let extractor = FailingRowExtractor;
        let automation = NullAutomation;
        let provider = crate::ocr::NullOcrProvider;
        let capture = NullScreenCapture;
        let web_ocr = RegionWebFormOcr::new(&provider, &capture);
        let validator = FuzzyValidator::new(0.85);
        let search_field = SearchFieldConfig { x: Some(1.0), y: Some(1.0), ..Default::default() };
        let row_processor = RowProcessor::new(
            &automation,
            &web_ocr,
            &validator,
            field_regions(),
            search_field,
            AutomationConfig::default(),
        );
        let alert_sink = HeadlessAlertSink::default();
        let progress = HeadlessProgressHandler;

        let mut orchestrator = Orchestrator::new(&extractor, row_processor, &alert_sink, &progress, 3);
        let stats = orchestrator.run(b"image");
        assert_eq!(stats.total_rows, 0);
        assert_eq!(stats.processed, 0);
    }

    #[test]
    fn rows_are_processed_in_order_and_counters_stay_consistent() {
        let rows = vec![row("99999999"), row("12345678")];
        let extractor = FixedRowExtractor { rows };
        let automation = NullAutomation;
        let provider = crate::ocr::NullOcrProvider;
        let capture = NullScreenCapture;
        let web_ocr = RegionWebFormOcr::new(&provider, &capture);
        let validator = FuzzyValidator::new(0.85);
        let search_field = SearchFieldConfig { x: Some(1.0), y: Some(1.0), ..Default::default() };
        let row_processor = RowProcessor::new(
            &automation,
            &web_ocr,
            &validator,
            field_regions(),
            search_field,
            AutomationConfig { page_load_timeout: 0.0, pre_enter_delay: 0.0, post_enter_delay: 0.0, typing_interval: 0.0 },
        );
        let alert_sink = HeadlessAlertSink::default();
        let progress = RecordingProgress { calls: Mutex::new(Vec::new()) };

        let mut orchestrator = Orchestrator::new(&extractor, row_processor, &alert_sink, &progress, 2);
        let stats = orchestrator.run(b"image");

        // both rows hit NullScreenCapture -> FormData::is_empty -> NOT_FOUND,
        // since NullOcrProvider never renders a real web form.
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.not_found, 2);
        assert!(stats.auto_saved + stats.required_validation + stats.empty_rows + stats.not_found + stats.errors <= stats.processed);
        assert_eq!(*progress.calls.lock().unwrap(), vec![(1, 2), (2, 2)]);
        assert_eq!(orchestrator.state(), OrchestratorState::Completed);
    }

    #[test]
    fn cancel_flag_set_before_run_halts_immediately() {
        let rows = vec![row("99999999"), row("12345678")];
        let extractor = FixedRowExtractor { rows };
        let automation = NullAutomation;
        let provider = crate::ocr::NullOcrProvider;
        let capture = NullScreenCapture;
        let web_ocr = RegionWebFormOcr::new(&provider, &capture);
        let validator = FuzzyValidator::new(0.85);
        let search_field = SearchFieldConfig { x: Some(1.0), y: Some(1.0), ..Default::default() };
        let row_processor = RowProcessor::new(
            &automation,
            &web_ocr,
            &validator,
            field_regions(),
            search_field,
            AutomationConfig::default(),
        );
        let alert_sink = HeadlessAlertSink::default();
        let progress = HeadlessProgressHandler;

        let mut orchestrator = Orchestrator::new(&extractor, row_processor, &alert_sink, &progress, 2);
        orchestrator.cancel_handle().store(true, Ordering::Relaxed);
        let stats = orchestrator.run(b"image");
        assert_eq!(stats.processed, 0);
        assert_eq!(orchestrator.state(), OrchestratorState::Cancelled);
    }

    #[test]
    fn validation_never_ok_for_alert_not_found_action_end_to_end() {
        // Sanity-check invariant #3 (§8) holds for the HeadlessAlertSink path.
        let _ = ValidationResult {
            status: crate::validation::ValidationStatus::Error,
            action: crate::validation::ValidationAction::AlertNotFound,
            confidence: 0.0,
            matches: HashMap::new(),
            detail: String::new(),
        };
        let sink = HeadlessAlertSink::default();
        assert_eq!(sink.on_not_found("1", "x", 1), NotFoundReply::Continue);
        assert_eq!(sink.on_empty_row(1), EmptyRowReply::Skip);
        assert_eq!(sink.on_validation_mismatch(
            &ValidationResult {
                status: crate::validation::ValidationStatus::Warning,
                action: crate::validation::ValidationAction::RequireValidation,
                confidence: 0.0,
                matches: HashMap::new(),
                detail: String::new(),
            },
            1
        ), ValidationReply::Skip);
        assert_eq!(sink.on_error("x", None), ErrorReply::Skip);
    }
}
