//! CLI entry point: load a config file, wire up providers and ports, and run
//! the orchestrator against a single form image.
//!
//! Real providers need API credentials (`GOOGLE_VISION_API_KEY`,
//! `AZURE_READ_ENDPOINT`/`AZURE_READ_KEY`); `--headless` runs entirely on
//! null ports for dry runs and CI smoke tests.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cedula_ocr_core::ocr::{AzureReadProvider, GoogleVisionProvider, NullOcrProvider, OcrProvider};
use cedula_ocr_core::ports::{HeadlessAlertSink, HeadlessProgressHandler, ImageRowExtractor, NullAutomation, NullScreenCapture, RegionWebFormOcr};
use cedula_ocr_core::row_processor::RowProcessor;
use cedula_ocr_core::validation::FuzzyValidator;
use cedula_ocr_core::{Config, Orchestrator};

#[derive(Parser)]
#[command(
    name = "cedula-ocr",
    about = "Dual-OCR ensemble transcription of handwritten cédula registration forms",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    /// Path to the scanned registration-sheet image.
    image: PathBuf,

    /// Path to the TOML configuration file.
    #[arg(long, default_value = "cedula-ocr.toml")]
    config: PathBuf,

    /// Number of handwritten rows on the sheet.
    #[arg(long, default_value_t = 20)]
    rows: usize,

    /// Run entirely against null ports: no network calls, no automation, no
    /// screen capture. Useful for smoke-testing the pipeline end to end.
    #[arg(long)]
    headless: bool,

    /// Google Vision API key. Falls back to `GOOGLE_VISION_API_KEY`.
    #[arg(long, env = "GOOGLE_VISION_API_KEY")]
    google_api_key: Option<String>,

    /// Azure Read endpoint, e.g. `https://<resource>.cognitiveservices.azure.com`.
    #[arg(long, env = "AZURE_READ_ENDPOINT")]
    azure_endpoint: Option<String>,

    /// Azure Read subscription key.
    #[arg(long, env = "AZURE_READ_KEY")]
    azure_key: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cedula_ocr_core=info".parse()?))
        .compact()
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config).with_context(|| format!("loading {}", cli.config.display()))?;
    let image = std::fs::read(&cli.image).with_context(|| format!("reading {}", cli.image.display()))?;

    info!(image = %cli.image.display(), rows = cli.rows, headless = cli.headless, "starting run");

    let null_provider = NullOcrProvider;
    let google_provider;
    let azure_provider;
    let (primary, secondary): (&dyn OcrProvider, &dyn OcrProvider) = if cli.headless {
        (&null_provider, &null_provider)
    } else {
        let google_key = cli
            .google_api_key
            .context("--google-api-key (or GOOGLE_VISION_API_KEY) is required unless --headless")?;
        let azure_endpoint = cli
            .azure_endpoint
            .context("--azure-endpoint (or AZURE_READ_ENDPOINT) is required unless --headless")?;
        let azure_key = cli
            .azure_key
            .context("--azure-key (or AZURE_READ_KEY) is required unless --headless")?;
        google_provider = GoogleVisionProvider::new(google_key);
        azure_provider = AzureReadProvider::new(azure_endpoint, azure_key);
        (&google_provider, &azure_provider)
    };

    let row_extractor = ImageRowExtractor::new(primary, secondary, config.ocr.digit_ensemble.clone());
    let field_regions = config.field_regions.as_map()?;
    let validator = FuzzyValidator::new(config.validation.min_similarity);
    let automation = NullAutomation;
    let capture = NullScreenCapture;
    let web_ocr = RegionWebFormOcr::new(primary, &capture);
    let alert_sink = HeadlessAlertSink::default();
    let progress = HeadlessProgressHandler;

    let row_processor = RowProcessor::new(
        &automation,
        &web_ocr,
        &validator,
        field_regions,
        config.search_field.clone(),
        config.automation.clone(),
    );

    let mut orchestrator = Orchestrator::new(&row_extractor, row_processor, &alert_sink, &progress, cli.rows);
    let stats = orchestrator.run(&image);

    println!(
        "processed {}/{} rows — auto-saved {}, needs validation {}, not found {}, empty {}, errors {}",
        stats.processed, stats.total_rows, stats.auto_saved, stats.required_validation, stats.not_found, stats.empty_rows, stats.errors,
    );

    Ok(())
}
