//! C9 — Row processor.
//!
//! For one handwritten row: type the cédula into the target application,
//! wait, read back the rendered name fields, fuzzy-validate, and route to a
//! terminal outcome. Any failure below this protocol boundary yields
//! `RowOutcome::Error` — it never propagates (§4.9, §7's
//! `ROW_PROCESSING_ERROR`).

use std::thread;
use std::time::Duration;

use tracing::{error, warn};

use crate::config::{AutomationConfig, FieldRegion, SearchFieldConfig};
use crate::error::{CoreError, CoreResult};
use crate::ports::{AlertSink, Automation, EmptyRowReply, NotFoundReply, ValidationReply, WebFormOcr};
use crate::validation::{FuzzyValidator, RowData, ValidationAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    AutoSaved,
    RequiredValidation,
    EmptyRow,
    NotFound,
    Error,
    Skipped,
}

pub struct RowProcessor<'a> {
    automation: &'a dyn Automation,
    web_ocr: &'a dyn WebFormOcr,
    validator: &'a FuzzyValidator,
    field_regions: std::collections::HashMap<String, FieldRegion>,
    search_field: SearchFieldConfig,
    automation_cfg: AutomationConfig,
}

impl<'a> RowProcessor<'a> {
    pub fn new(
        automation: &'a dyn Automation,
        web_ocr: &'a dyn WebFormOcr,
        validator: &'a FuzzyValidator,
        field_regions: std::collections::HashMap<String, FieldRegion>,
        search_field: SearchFieldConfig,
        automation_cfg: AutomationConfig,
    ) -> RowProcessor<'a> {
        RowProcessor { automation, web_ocr, validator, field_regions, search_field, automation_cfg }
    }

    pub fn process(&self, row: &RowData, row_number: usize, alert_sink: &dyn AlertSink) -> RowOutcome {
        if row.is_empty {
            return self.handle_empty_row(row_number, alert_sink);
        }

        match self.run_protocol(row, row_number, alert_sink) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(row_number, error = %e, "row processing failed");
                alert_sink.on_error(&e.to_string(), Some(row_number));
                RowOutcome::Error
            }
        }
    }

    fn handle_empty_row(&self, row_number: usize, alert_sink: &dyn AlertSink) -> RowOutcome {
        match alert_sink.on_empty_row(row_number) {
            EmptyRowReply::Skip | EmptyRowReply::Pause => RowOutcome::EmptyRow,
            EmptyRowReply::ClickBlankButton => {
                match (self.search_field.blank_row_button_x, self.search_field.blank_row_button_y) {
                    (Some(x), Some(y)) => {
                        if let Err(e) = self.automation.click(x, y) {
                            warn!(row_number, error = %e, "blank-row button click failed");
                        }
                        RowOutcome::EmptyRow
                    }
                    _ => {
                        // §9 open question: the button-click branch must either be
                        // fully implemented or raise a clearly-typed error — never
                        // a silent no-op.
                        let e = CoreError::NotImplemented(
                            "empty-row 'click blank button' reply with no blank_row_button coordinates configured"
                                .to_string(),
                        );
                        error!(row_number, error = %e, "empty row handling not implemented");
                        alert_sink.on_error(&e.to_string(), Some(row_number));
                        RowOutcome::Error
                    }
                }
            }
        }
    }

    fn run_protocol(
        &self,
        row: &RowData,
        row_number: usize,
        alert_sink: &dyn AlertSink,
    ) -> CoreResult<RowOutcome> {
        let x = self.search_field.x.ok_or_else(|| CoreError::ConfigMissing("search_field.x".to_string()))?;
        let y = self.search_field.y.ok_or_else(|| CoreError::ConfigMissing("search_field.y".to_string()))?;
        let cedula = row
            .cedula
            .as_ref()
            .ok_or_else(|| CoreError::RowProcessingError { row: row_number, message: "row has no cédula".to_string() })?;

        self.automation.click(x, y)?;
        self.automation.press_key("ctrl+a")?;
        self.automation.press_key("delete")?;
        self.automation.type_text(cedula.as_str(), self.automation_cfg.typing_interval)?;

        sleep_seconds(self.automation_cfg.pre_enter_delay);
        self.automation.press_key("enter")?;
        sleep_seconds(self.automation_cfg.post_enter_delay);
        sleep_seconds(self.automation_cfg.page_load_timeout);

        let form = self.web_ocr.read_fields(&self.field_regions)?;
        let result = self.validator.validate(row, &form);

        match result.action {
            ValidationAction::AutoSave => {
                self.automation.press_key(&self.search_field.save_key)?;
                Ok(RowOutcome::AutoSaved)
            }
            ValidationAction::RequireValidation => {
                match alert_sink.on_validation_mismatch(&result, row_number) {
                    ValidationReply::Save => {
                        self.automation.press_key(&self.search_field.save_key)?;
                        Ok(RowOutcome::AutoSaved)
                    }
                    ValidationReply::Skip => Ok(RowOutcome::Skipped),
                    ValidationReply::Correct | ValidationReply::Pause => Ok(RowOutcome::RequiredValidation),
                }
            }
            ValidationAction::AlertNotFound => {
                match alert_sink.on_not_found(cedula.as_str(), &row.names, row_number) {
                    NotFoundReply::Continue | NotFoundReply::MarkNovelty => Ok(RowOutcome::NotFound),
                    NotFoundReply::Pause => Ok(RowOutcome::NotFound),
                }
            }
        }
    }
}

fn sleep_seconds(seconds: f64) {
    if seconds > 0.0 {
        thread::sleep(Duration::from_secs_f64(seconds));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldRegion;
    use crate::ocr::DigitString;
    use crate::ports::{ErrorReply, NullAutomation, NullScreenCapture, RegionWebFormOcr};
    use crate::validation::{FormData, ValidationResult, ValidationStatus};
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FixedAlertSink {
        empty_row: EmptyRowReply,
        not_found: NotFoundReply,
        validation: ValidationReply,
        errors_seen: RefCell<Vec<String>>,
    }

    impl AlertSink for FixedAlertSink {
        fn on_not_found(&self, _cedula: &str, _names: &str, _row_number: usize) -> NotFoundReply {
            self.not_found
        }
        fn on_validation_mismatch(&self, _result: &ValidationResult, _row_number: usize) -> ValidationReply {
            self.validation
        }
        fn on_empty_row(&self, _row_number: usize) -> EmptyRowReply {
            self.empty_row
        }
        fn on_error(&self, message: &str, _row_number: Option<usize>) -> ErrorReply {
            self.errors_seen.borrow_mut().push(message.to_string());
            ErrorReply::Skip
        }
    }

    fn field_regions() -> HashMap<String, FieldRegion> {
        let region = FieldRegion { x: 0.0, y: 0.0, width: 1.0, height: 1.0 };
        ["first_name", "middle_name", "first_surname", "second_surname"]
            .into_iter()
            .map(|k| (k.to_string(), region))
            .collect()
    }

    fn row(names: &str, cedula: &str) -> RowData {
        RowData {
            row_index: 0,
            names: names.to_string(),
            cedula: DigitString::new(cedula),
            is_empty: false,
            per_field_confidence: HashMap::new(),
        }
    }

    #[test]
    fn empty_row_without_blank_button_config_is_skip_by_default() {
        let automation = NullAutomation;
        let provider = crate::ocr::NullOcrProvider;
        let capture = NullScreenCapture;
        let web_ocr = RegionWebFormOcr::new(&provider, &capture);
        let validator = FuzzyValidator::new(0.85);
        let search_field = SearchFieldConfig { x: Some(1.0), y: Some(1.0), ..Default::default() };
        let processor = RowProcessor::new(
            &automation,
            &web_ocr,
            &validator,
            field_regions(),
            search_field,
            AutomationConfig::default(),
        );
        let sink = FixedAlertSink {
            empty_row: EmptyRowReply::Skip,
            not_found: NotFoundReply::Continue,
            validation: ValidationReply::Skip,
            errors_seen: RefCell::new(Vec::new()),
        };
        let r = RowData {
            row_index: 0,
            names: String::new(),
            cedula: None,
            is_empty: true,
            per_field_confidence: HashMap::new(),
        };
        assert_eq!(processor.process(&r, 1, &sink), RowOutcome::EmptyRow);
    }

    #[test]
    fn empty_row_click_blank_button_without_coordinates_is_not_implemented() {
        let automation = NullAutomation;
        let provider = crate::ocr::NullOcrProvider;
        let capture = NullScreenCapture;
        let web_ocr = RegionWebFormOcr::new(&provider, &capture);
        let validator = FuzzyValidator::new(0.85);
        let search_field = SearchFieldConfig { x: Some(1.0), y: Some(1.0), ..Default::default() };
        let processor = RowProcessor::new(
            &automation,
            &web_ocr,
            &validator,
            field_regions(),
            search_field,
            AutomationConfig::default(),
        );
        let sink = FixedAlertSink {
            empty_row: EmptyRowReply::ClickBlankButton,
            not_found: NotFoundReply::Continue,
            validation: ValidationReply::Skip,
            errors_seen: RefCell::new(Vec::new()),
        };
        let r = RowData {
            row_index: 0,
            names: String::new(),
            cedula: None,
            is_empty: true,
            per_field_confidence: HashMap::new(),
        };
        assert_eq!(processor.process(&r, 1, &sink), RowOutcome::Error);
        assert!(sink.errors_seen.borrow()[0].contains("not implemented"));
    }

    #[test]
    fn e5_not_found_row_routes_through_alert_sink() {
        let automation = NullAutomation;
        let provider = crate::ocr::NullOcrProvider;
        let capture = NullScreenCapture; // empty capture -> FormData::is_empty == true
        let web_ocr = RegionWebFormOcr::new(&provider, &capture);
        let validator = FuzzyValidator::new(0.85);
        let search_field = SearchFieldConfig { x: Some(1.0), y: Some(1.0), ..Default::default() };
        let processor = RowProcessor::new(
            &automation,
            &web_ocr,
            &validator,
            field_regions(),
            search_field,
            AutomationConfig { page_load_timeout: 0.0, pre_enter_delay: 0.0, post_enter_delay: 0.0, typing_interval: 0.0 },
        );
        let sink = FixedAlertSink {
            empty_row: EmptyRowReply::Skip,
            not_found: NotFoundReply::Continue,
            validation: ValidationReply::Skip,
            errors_seen: RefCell::new(Vec::new()),
        };
        let r = row("JOHN DOE", "99999999");
        assert_eq!(processor.process(&r, 1, &sink), RowOutcome::NotFound);
    }

    #[test]
    fn missing_cedula_on_nonempty_row_yields_error() {
        let automation = NullAutomation;
        let provider = crate::ocr::NullOcrProvider;
        let capture = NullScreenCapture;
        let web_ocr = RegionWebFormOcr::new(&provider, &capture);
        let validator = FuzzyValidator::new(0.85);
        let search_field = SearchFieldConfig { x: Some(1.0), y: Some(1.0), ..Default::default() };
        let processor = RowProcessor::new(
            &automation,
            &web_ocr,
            &validator,
            field_regions(),
            search_field,
            AutomationConfig { page_load_timeout: 0.0, pre_enter_delay: 0.0, post_enter_delay: 0.0, typing_interval: 0.0 },
        );
        let sink = FixedAlertSink {
            empty_row: EmptyRowReply::Skip,
            not_found: NotFoundReply::Continue,
            validation: ValidationReply::Skip,
            errors_seen: RefCell::new(Vec::new()),
        };
        let r = RowData {
            row_index: 0,
            names: "JOHN DOE".to_string(),
            cedula: None,
            is_empty: false,
            per_field_confidence: HashMap::new(),
        };
        assert_eq!(processor.process(&r, 1, &sink), RowOutcome::Error);
    }

    #[test]
    fn validation_status_never_ok_for_not_found_action() {
        let result = ValidationResult {
            status: ValidationStatus::Error,
            action: ValidationAction::AlertNotFound,
            confidence: 0.0,
            matches: HashMap::new(),
            detail: String::new(),
        };
        assert_eq!(result.status, ValidationStatus::Error);
        let _ = FormData::default();
    }
}
