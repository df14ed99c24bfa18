//! Configuration keys recognized by the core.
//!
//! Read once at startup into immutable fields per component — no lookups on
//! hot paths. Missing required keys
//! surface as [`CoreError::ConfigMissing`] at construction time, matching
//! §7's "fatal at startup" rule for `CONFIG_MISSING`.

use serde::Deserialize;
use std::path::Path;

use crate::error::{CoreError, CoreResult};

fn default_provider() -> String {
    "digit_ensemble".to_string()
}
fn default_min_digit_confidence() -> f64 {
    0.70
}
fn default_min_agreement_ratio() -> f64 {
    0.60
}
fn default_max_conflict_ratio() -> f64 {
    0.50
}
fn default_confidence_boost() -> f64 {
    1.10
}
fn default_ambiguity_threshold() -> f64 {
    0.05
}
fn default_min_similarity() -> f64 {
    0.85
}
fn default_typing_interval() -> f64 {
    0.01
}
fn default_page_load_timeout() -> f64 {
    5.0
}
fn default_pre_enter_delay() -> f64 {
    0.3
}
fn default_post_enter_delay() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct DigitEnsembleConfig {
    #[serde(default = "default_min_digit_confidence")]
    pub min_digit_confidence: f64,
    #[serde(default = "default_min_agreement_ratio")]
    pub min_agreement_ratio: f64,
    #[serde(default = "default_max_conflict_ratio")]
    pub max_conflict_ratio: f64,
    #[serde(default = "default_confidence_boost")]
    pub confidence_boost: f64,
    #[serde(default = "default_ambiguity_threshold")]
    pub ambiguity_threshold: f64,
    #[serde(default)]
    pub allow_low_confidence_override: bool,
    #[serde(default)]
    pub verbose_logging: bool,
}

impl Default for DigitEnsembleConfig {
    fn default() -> Self {
        DigitEnsembleConfig {
            min_digit_confidence: default_min_digit_confidence(),
            min_agreement_ratio: default_min_agreement_ratio(),
            max_conflict_ratio: default_max_conflict_ratio(),
            confidence_boost: default_confidence_boost(),
            ambiguity_threshold: default_ambiguity_threshold(),
            allow_low_confidence_override: false,
            verbose_logging: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub digit_ensemble: DigitEnsembleConfig,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            provider: default_provider(),
            digit_ensemble: DigitEnsembleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            min_similarity: default_min_similarity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutomationConfig {
    #[serde(default = "default_typing_interval")]
    pub typing_interval: f64,
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout: f64,
    #[serde(default = "default_pre_enter_delay")]
    pub pre_enter_delay: f64,
    #[serde(default = "default_post_enter_delay")]
    pub post_enter_delay: f64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        AutomationConfig {
            typing_interval: default_typing_interval(),
            page_load_timeout: default_page_load_timeout(),
            pre_enter_delay: default_pre_enter_delay(),
            post_enter_delay: default_post_enter_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchFieldConfig {
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Coordinates of the "blank row" button the empty-row alert reply
    /// (`click_blank_button`) clicks. Optional: if the operator never
    /// configures it, that reply path raises `CoreError::NotImplemented`
    /// rather than silently doing nothing (spec §9 open question).
    #[serde(default)]
    pub blank_row_button_x: Option<f64>,
    #[serde(default)]
    pub blank_row_button_y: Option<f64>,
    /// Key combination the row processor presses to persist an
    /// `AUTO_SAVE` row, e.g. `"enter"` or `"ctrl+s"`.
    #[serde(default = "default_save_key")]
    pub save_key: String,
}

fn default_save_key() -> String {
    "enter".to_string()
}

impl Default for SearchFieldConfig {
    fn default() -> Self {
        SearchFieldConfig {
            x: None,
            y: None,
            blank_row_button_x: None,
            blank_row_button_y: None,
            save_key: default_save_key(),
        }
    }
}

/// One screen region, `(x, y, width, height)`, matching §6.3's
/// `field_region_map` value type.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FieldRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FieldRegionsConfig {
    pub first_name: Option<FieldRegion>,
    pub middle_name: Option<FieldRegion>,
    pub first_surname: Option<FieldRegion>,
    pub second_surname: Option<FieldRegion>,
}

impl FieldRegionsConfig {
    /// Builds the `{field_id -> region}` map §6.3's `read_fields` expects.
    /// Fatal (`ConfigMissing`) if any of the four fields is absent —
    /// the web-form OCR port cannot read a field it has no region for.
    pub fn as_map(&self) -> CoreResult<std::collections::HashMap<String, FieldRegion>> {
        let mut map = std::collections::HashMap::new();
        for (key, region) in [
            ("first_name", self.first_name),
            ("middle_name", self.middle_name),
            ("first_surname", self.first_surname),
            ("second_surname", self.second_surname),
        ] {
            let region = region.ok_or_else(|| CoreError::ConfigMissing(format!("field_regions.{key}")))?;
            map.insert(key.to_string(), region);
        }
        Ok(map)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
    #[serde(default)]
    pub search_field: SearchFieldConfig,
    #[serde(default)]
    pub field_regions: FieldRegionsConfig,
}

impl Config {
    /// Load configuration from a TOML file on disk.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Config> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigMissing(format!("cannot read {}: {e}", path.display()))
        })?;
        let cfg: Config = toml::from_str(&text).map_err(|e| {
            CoreError::ConfigMissing(format!("parse error in {}: {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check that every key the spec marks `required` is present.
    pub fn validate(&self) -> CoreResult<()> {
        if self.search_field.x.is_none() {
            return Err(CoreError::ConfigMissing("search_field.x".to_string()));
        }
        if self.search_field.y.is_none() {
            return Err(CoreError::ConfigMissing("search_field.y".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = DigitEnsembleConfig::default();
        assert_eq!(cfg.min_digit_confidence, 0.70);
        assert_eq!(cfg.max_conflict_ratio, 0.50);
        assert_eq!(cfg.confidence_boost, 1.10);
        assert_eq!(cfg.ambiguity_threshold, 0.05);
        assert!(!cfg.allow_low_confidence_override);
    }

    #[test]
    fn missing_search_field_is_config_missing() {
        let cfg = Config::default();
        match cfg.validate() {
            Err(CoreError::ConfigMissing(key)) => assert_eq!(key, "search_field.x"),
            other => panic!("expected ConfigMissing, got {other:?}"),
        }
    }

    #[test]
    fn load_parses_minimal_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [search_field]
            x = 100.0
            y = 200.0
            "#,
        )
        .unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.search_field.x, Some(100.0));
        assert_eq!(cfg.ocr.digit_ensemble.min_digit_confidence, 0.70);
        assert_eq!(cfg.search_field.save_key, "enter");
    }

    #[test]
    fn field_regions_as_map_fails_when_any_region_missing() {
        let regions = FieldRegionsConfig::default();
        match regions.as_map() {
            Err(CoreError::ConfigMissing(key)) => assert_eq!(key, "field_regions.first_name"),
            other => panic!("expected ConfigMissing, got {other:?}"),
        }
    }

    #[test]
    fn field_regions_as_map_succeeds_when_complete() {
        let region = FieldRegion { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        let regions = FieldRegionsConfig {
            first_name: Some(region),
            middle_name: Some(region),
            first_surname: Some(region),
            second_surname: Some(region),
        };
        let map = regions.as_map().unwrap();
        assert_eq!(map.len(), 4);
    }
}
