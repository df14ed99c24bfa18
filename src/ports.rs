//! External interfaces (§6). These are the ports the core depends on but
//! does not implement in full: screen capture, click/type automation, the
//! alert UI, and progress reporting are all explicitly out of scope (§1) —
//! the core only specifies the contract each port must satisfy.
//!
//! Two concrete implementations round out each port: a real one (behind the
//! `rdev`/`image` stack already in this crate's dependencies) and a headless
//! default per §6.5 ("a headless implementation returns configured defaults
//! ... without blocking"), so the orchestrator is runnable end-to-end without
//! a live GUI/automation backend.

use std::collections::HashMap;

use tracing::info;

use crate::config::{DigitEnsembleConfig, FieldRegion};
use crate::error::{CoreError, CoreResult};
use crate::ocr::OcrProvider;
use crate::reporter::ProcessingStats;
use crate::validation::{FormData, RowData, ValidationResult};

// ── §6.2 Handwritten-row extractor port ────────────────────────────────────

pub trait HandwrittenRowExtractor: Send + Sync {
    fn extract_rows(&self, image: &[u8], expected_rows: usize) -> CoreResult<Vec<RowData>>;
}

/// Divides `image` into `expected_rows` horizontal bands and splits each
/// band into a left sub-region (names) and a right sub-region (cédula) at
/// `name_boundary_fraction` of the band's width. Names are read with a
/// single provider's free-text OCR (name ensembling is out of scope — C1–C7
/// only reconcile digit strings); the cédula crop goes through the full
/// dual-provider digit-level ensemble (C7).
pub struct ImageRowExtractor<'a> {
    primary: &'a dyn OcrProvider,
    secondary: &'a dyn OcrProvider,
    ensemble_cfg: DigitEnsembleConfig,
    name_boundary_fraction: f64,
}

impl<'a> ImageRowExtractor<'a> {
    pub fn new(
        primary: &'a dyn OcrProvider,
        secondary: &'a dyn OcrProvider,
        ensemble_cfg: DigitEnsembleConfig,
    ) -> ImageRowExtractor<'a> {
        ImageRowExtractor { primary, secondary, ensemble_cfg, name_boundary_fraction: 0.60 }
    }
}

impl HandwrittenRowExtractor for ImageRowExtractor<'_> {
    fn extract_rows(&self, image: &[u8], expected_rows: usize) -> CoreResult<Vec<RowData>> {
        if expected_rows == 0 {
            return Ok(Vec::new());
        }

        let img = image::load_from_memory(image)
            .map_err(|e| CoreError::ExtractionFailed(format!("cannot decode image: {e}")))?;
        let (width, height) = (img.width(), img.height());
        let band_height = height / expected_rows as u32;
        let name_width = ((width as f64) * self.name_boundary_fraction).round() as u32;

        let mut rows = Vec::with_capacity(expected_rows);
        for i in 0..expected_rows {
            let y0 = i as u32 * band_height;
            let this_band_height = if i + 1 == expected_rows { height - y0 } else { band_height };
            let band = img.crop_imm(0, y0, width, this_band_height);

            let names_region = band.crop_imm(0, 0, name_width, this_band_height);
            let cedula_region = band.crop_imm(name_width, 0, width - name_width, this_band_height);

            let names_text = self.primary.read_text(&encode_png(&names_region)?)?.trim().to_string();
            let cedula_bytes = encode_png(&cedula_region)?;
            let cedula_records = crate::ocr::extract(&cedula_bytes, self.primary, self.secondary, &self.ensemble_cfg);
            let cedula = cedula_records.into_iter().next().map(|r| r.digits);

            let is_empty = names_text.is_empty() && cedula.is_none();
            rows.push(RowData {
                row_index: i,
                names: names_text,
                cedula,
                is_empty,
                per_field_confidence: HashMap::new(),
            });
        }
        Ok(rows)
    }
}

fn encode_png(img: &image::DynamicImage) -> CoreResult<Vec<u8>> {
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| CoreError::ExtractionFailed(format!("cannot re-encode band: {e}")))?;
    Ok(buf.into_inner())
}

// ── §6.3 Web-form OCR port ─────────────────────────────────────────────────

pub trait WebFormOcr: Send + Sync {
    fn read_fields(&self, field_region_map: &HashMap<String, FieldRegion>) -> CoreResult<FormData>;
}

/// Captures each configured region via `ScreenCapture` (external
/// collaborator — screenshot grab is out of scope, §1) and OCRs it
/// independently via the shared `OcrProvider`.
pub trait ScreenCapture: Send + Sync {
    fn capture(&self, region: &FieldRegion) -> CoreResult<Vec<u8>>;
}

pub struct RegionWebFormOcr<'a> {
    provider: &'a dyn OcrProvider,
    capture: &'a dyn ScreenCapture,
}

impl<'a> RegionWebFormOcr<'a> {
    pub fn new(provider: &'a dyn OcrProvider, capture: &'a dyn ScreenCapture) -> RegionWebFormOcr<'a> {
        RegionWebFormOcr { provider, capture }
    }
}

const FORM_FIELDS: [&str; 4] = ["first_name", "middle_name", "first_surname", "second_surname"];

impl WebFormOcr for RegionWebFormOcr<'_> {
    fn read_fields(&self, field_region_map: &HashMap<String, FieldRegion>) -> CoreResult<FormData> {
        let mut values: HashMap<&str, String> = HashMap::new();
        for field_id in FORM_FIELDS {
            let region = field_region_map
                .get(field_id)
                .ok_or_else(|| CoreError::ConfigMissing(format!("field_region_map.{field_id}")))?;
            let bytes = self.capture.capture(region)?;
            let text = self.provider.read_text(&bytes)?;
            values.insert(field_id, text.trim().to_string());
        }
        Ok(FormData::new(
            &values["first_name"],
            &values["middle_name"],
            &values["first_surname"],
            &values["second_surname"],
        ))
    }
}

/// No-op capture for headless runs: returns an empty image, which every
/// `OcrProvider` reads back as empty text.
pub struct NullScreenCapture;

impl ScreenCapture for NullScreenCapture {
    fn capture(&self, _region: &FieldRegion) -> CoreResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

// ── §6.4 Automation port ───────────────────────────────────────────────────

pub trait Automation: Send + Sync {
    fn click(&self, x: f64, y: f64) -> CoreResult<()>;
    fn press_key(&self, name: &str) -> CoreResult<()>;
    fn type_text(&self, s: &str, interval_seconds: f64) -> CoreResult<()>;
}

/// Logs every call instead of driving the OS. Used by the CLI's headless
/// wiring and by tests — it never blocks and never touches real input
/// devices.
pub struct NullAutomation;

impl Automation for NullAutomation {
    fn click(&self, x: f64, y: f64) -> CoreResult<()> {
        info!(x, y, "headless automation: click");
        Ok(())
    }

    fn press_key(&self, name: &str) -> CoreResult<()> {
        info!(key = name, "headless automation: press_key");
        Ok(())
    }

    fn type_text(&self, s: &str, interval_seconds: f64) -> CoreResult<()> {
        info!(text = s, interval_seconds, "headless automation: type_text");
        Ok(())
    }
}

// ── §6.5 Alert sink port ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReply {
    Continue,
    MarkNovelty,
    Pause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReply {
    Save,
    Skip,
    Correct,
    Pause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyRowReply {
    ClickBlankButton,
    Pause,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReply {
    Retry,
    Skip,
    Pause,
}

/// Synchronous; the row processor blocks waiting for the reply (§6.5).
pub trait AlertSink: Send + Sync {
    fn on_not_found(&self, cedula: &str, names: &str, row_number: usize) -> NotFoundReply;
    fn on_validation_mismatch(&self, result: &ValidationResult, row_number: usize) -> ValidationReply;
    fn on_empty_row(&self, row_number: usize) -> EmptyRowReply;
    fn on_error(&self, message: &str, row_number: Option<usize>) -> ErrorReply;
}

/// Returns configured defaults without blocking, per §6.5's headless
/// carve-out. Defaults to "skip" everywhere, matching the spec's own
/// example ("skip for everything").
pub struct HeadlessAlertSink {
    pub not_found: NotFoundReply,
    pub validation: ValidationReply,
    pub empty_row: EmptyRowReply,
    pub error: ErrorReply,
}

impl Default for HeadlessAlertSink {
    fn default() -> Self {
        HeadlessAlertSink {
            not_found: NotFoundReply::Continue,
            validation: ValidationReply::Skip,
            empty_row: EmptyRowReply::Skip,
            error: ErrorReply::Skip,
        }
    }
}

impl AlertSink for HeadlessAlertSink {
    fn on_not_found(&self, cedula: &str, names: &str, row_number: usize) -> NotFoundReply {
        info!(row_number, cedula, names, "headless alert sink: not found");
        self.not_found
    }

    fn on_validation_mismatch(&self, result: &ValidationResult, row_number: usize) -> ValidationReply {
        info!(row_number, detail = %result.detail, "headless alert sink: validation mismatch");
        self.validation
    }

    fn on_empty_row(&self, row_number: usize) -> EmptyRowReply {
        info!(row_number, "headless alert sink: empty row");
        self.empty_row
    }

    fn on_error(&self, message: &str, row_number: Option<usize>) -> ErrorReply {
        info!(row_number, message, "headless alert sink: error");
        self.error
    }
}

// ── §6.6 Progress handler port ─────────────────────────────────────────────

pub trait ProgressHandler: Send + Sync {
    fn update(&self, current: usize, total: usize, message: &str);
    fn set_status(&self, status: &str);
    fn show_completion_summary(&self, stats: &ProcessingStats);
}

/// Logs progress via `tracing` instead of driving a GUI.
pub struct HeadlessProgressHandler;

impl ProgressHandler for HeadlessProgressHandler {
    fn update(&self, current: usize, total: usize, message: &str) {
        info!(current, total, message, "progress");
    }

    fn set_status(&self, status: &str) {
        info!(status, "status");
    }

    fn show_completion_summary(&self, stats: &ProcessingStats) {
        info!(
            total = stats.total_rows,
            processed = stats.processed,
            auto_saved = stats.auto_saved,
            required_validation = stats.required_validation,
            empty_rows = stats.empty_rows,
            not_found = stats.not_found,
            errors = stats.errors,
            "run complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_alert_sink_defaults_to_skip_everywhere() {
        let sink = HeadlessAlertSink::default();
        assert_eq!(sink.on_not_found("123", "JOHN DOE", 1), NotFoundReply::Continue);
        assert_eq!(sink.on_empty_row(1), EmptyRowReply::Skip);
        assert_eq!(sink.on_error("boom", Some(1)), ErrorReply::Skip);
    }

    #[test]
    fn null_screen_capture_returns_empty_bytes() {
        let cap = NullScreenCapture;
        let region = FieldRegion { x: 0.0, y: 0.0, width: 1.0, height: 1.0 };
        assert!(cap.capture(&region).unwrap().is_empty());
    }

    #[test]
    fn null_automation_never_errors() {
        let a = NullAutomation;
        assert!(a.click(1.0, 2.0).is_ok());
        assert!(a.press_key("ctrl+a").is_ok());
        assert!(a.type_text("123", 0.01).is_ok());
    }

    #[test]
    fn region_web_form_ocr_requires_all_four_fields() {
        let provider = crate::ocr::NullOcrProvider;
        let capture = NullScreenCapture;
        let ocr = RegionWebFormOcr::new(&provider, &capture);
        let map = HashMap::new();
        match ocr.read_fields(&map) {
            Err(CoreError::ConfigMissing(key)) => assert!(key.contains("first_name")),
            other => panic!("expected ConfigMissing, got {other:?}"),
        }
    }

    #[test]
    fn region_web_form_ocr_reads_empty_fields_as_empty_form() {
        let provider = crate::ocr::NullOcrProvider;
        let capture = NullScreenCapture;
        let ocr = RegionWebFormOcr::new(&provider, &capture);
        let region = FieldRegion { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        let mut map = HashMap::new();
        for f in FORM_FIELDS {
            map.insert(f.to_string(), region);
        }
        let form = ocr.read_fields(&map).unwrap();
        assert!(form.is_empty);
    }
}
