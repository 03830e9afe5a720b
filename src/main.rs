//! Plant Diagnosis CLI
//!
//! Loads the configuration, validates the catalog, loads the model once and
//! classifies a single leaf photo or every supported image in a directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tracing::{error, info};
use walkdir::WalkDir;

use plant_diagnosis::backend::{backend_name, default_device, InferenceBackend};
use plant_diagnosis::inference::preprocess::is_supported_extension;
use plant_diagnosis::utils::format_millis;
use plant_diagnosis::utils::logging::{init_logging, LogConfig, LogLevel, ProgressLogger};
use plant_diagnosis::{
    AppConfig, Catalog, ClassificationResult, DiagnosisError, DiseaseRecord, InferenceEngine,
    Predictor, Severity,
};

/// Images classified per parallel batch when scanning a directory
const DIRECTORY_CHUNK: usize = 16;

/// Plant leaf disease classification
///
/// Classifies a photographed leaf into one of the PlantVillage crop/disease
/// categories and explains the diagnosis.
#[derive(Parser, Debug)]
#[command(name = "plant_diagnosis")]
#[command(version)]
#[command(about = "Plant leaf disease classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a leaf image or a directory of images
    Classify {
        /// Image file or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Model checkpoint (.mpk), overrides the configuration
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Print description, symptoms, causes, treatment and prevention
        #[arg(short, long, default_value = "false")]
        detailed: bool,

        /// Print results as JSON on stdout
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List the label registry
    Labels,

    /// Show the knowledge base record for a label
    Describe {
        /// Label, e.g. Tomato___Late_blight
        label: String,
    },

    /// Validate the knowledge base and, if given, the model checkpoint
    Check {
        /// Model checkpoint (.mpk), overrides the configuration
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(cli.config.as_deref())?;
    let json_output = matches!(cli.command, Commands::Classify { json: true, .. });

    let log_config = if json_output {
        LogConfig::quiet()
    } else if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::with_level(config.logging.level.parse::<LogLevel>()?)
    };
    let _ = init_logging(&log_config);

    if !json_output {
        print_banner();
    }

    match cli.command {
        Commands::Classify {
            input,
            model,
            detailed,
            json,
        } => cmd_classify(&config, &input, model, detailed, json),
        Commands::Labels => cmd_labels(&config),
        Commands::Describe { label } => cmd_describe(&config, &label),
        Commands::Check { model } => cmd_check(&config, model),
    }
}

fn print_banner() {
    println!(
        "{}",
        r#"
 +--------------------------------------------------------------+
 |   Plant Diagnosis                                            |
 |   Leaf Disease Classification with Burn + Rust               |
 +--------------------------------------------------------------+
  "#
        .green()
    );
}

fn load_catalog(config: &AppConfig) -> Result<Catalog> {
    Catalog::load(config.knowledge.path.as_deref()).context("Knowledge base validation failed")
}

fn build_predictor(
    config: &AppConfig,
    checkpoint: &Path,
) -> Result<Predictor<InferenceBackend>> {
    let catalog = load_catalog(config)?;
    let device = default_device();
    let engine = InferenceEngine::<InferenceBackend>::load(
        checkpoint,
        &config.classifier_config(),
        &device,
    )?;

    Ok(Predictor::new(
        Arc::new(engine),
        Arc::new(catalog),
        config.preprocess_config(),
    )?)
}

fn resolve_checkpoint(config: &AppConfig, model: Option<PathBuf>) -> Option<PathBuf> {
    model.or_else(|| config.model.checkpoint.clone())
}

/// Supported images under `input`, sorted for stable output
fn collect_images(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        bail!("Input path not found: {}", input.display());
    }
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_supported_extension(p))
        .collect();
    files.sort();
    Ok(files)
}

/// One line of directory output: a diagnosis or the reason there is none
#[derive(Debug, Serialize)]
struct BatchEntry {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<ClassificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl BatchEntry {
    fn new(path: PathBuf, outcome: Result<ClassificationResult, DiagnosisError>) -> Self {
        match outcome {
            Ok(result) => Self {
                path,
                result: Some(result),
                error: None,
            },
            Err(e) => Self {
                path,
                result: None,
                error: Some(e.to_string()),
            },
        }
    }
}

fn cmd_classify(
    config: &AppConfig,
    input: &Path,
    model: Option<PathBuf>,
    detailed: bool,
    json: bool,
) -> Result<()> {
    let Some(checkpoint) = resolve_checkpoint(config, model) else {
        bail!("No model checkpoint given; pass --model or set [model].checkpoint");
    };

    info!("Running classification");
    info!("  Input: {}", input.display());
    info!("  Model: {}", checkpoint.display());

    if !json {
        println!("{}", "Classification Configuration:".cyan().bold());
        println!("  Input:   {}", input.display());
        println!("  Model:   {}", checkpoint.display());
        println!("  Backend: {}", backend_name());
        println!();
        println!("{}", "Loading model...".cyan());
    }

    let predictor = build_predictor(config, &checkpoint)?;
    let files = collect_images(input)?;
    if files.is_empty() {
        bail!("No supported images found in {}", input.display());
    }

    // a single file propagates its error unchanged
    if input.is_file() {
        let result = predictor.classify_detailed(input)?;
        if json {
            println!("{}", result.to_json()?);
        } else {
            print_result(input, &result, detailed);
        }
        return Ok(());
    }

    if !json {
        println!("{}", format!("Classifying {} images...", files.len()).cyan());
        println!();
    }

    let start = std::time::Instant::now();
    let mut progress = ProgressLogger::new("Classify", files.len());
    let mut entries = Vec::with_capacity(files.len());
    let mut failures = 0usize;

    for chunk in files.chunks(DIRECTORY_CHUNK) {
        for (path, outcome) in predictor.classify_batch(chunk) {
            progress.increment();
            match &outcome {
                Ok(result) => {
                    if !json {
                        print_result(&path, result, detailed);
                    }
                }
                Err(e) => {
                    failures += 1;
                    error!("Failed to classify {}: {}", path.display(), e);
                    if !json {
                        println!("{} {}: {}", "Error:".red(), path.display(), e);
                        println!();
                    }
                }
            }
            entries.push(BatchEntry::new(path, outcome));
        }
    }
    progress.finish();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!(
            "{} {} classified, {} failed in {}",
            "Done:".green().bold(),
            entries.len() - failures,
            failures,
            format_millis(start.elapsed().as_secs_f64() * 1000.0)
        );
    }

    if failures > 0 {
        bail!("{} of {} images failed", failures, entries.len());
    }
    Ok(())
}

fn severity_colored(severity: Severity) -> colored::ColoredString {
    let text = severity.to_string();
    match severity {
        Severity::None => text.green(),
        Severity::Low => text.yellow(),
        Severity::Medium => text.truecolor(255, 165, 0),
        Severity::High => text.red().bold(),
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("  {}", title.yellow());
    for item in items {
        println!("    - {}", item);
    }
}

fn print_result(path: &Path, result: &ClassificationResult, detailed: bool) {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    println!("{}", file_name.bold());
    let verdict = if result.is_healthy {
        "healthy".green()
    } else {
        result.disease_name.red()
    };
    println!("  Prediction: {} ({})", result.prediction.as_str().cyan(), verdict);
    println!("  Crop:       {}", result.crop);
    println!("  Confidence: {:.2}%", result.confidence);
    println!("  Severity:   {}", severity_colored(result.severity));
    println!("  Top-{}:", result.top_predictions.len());
    for (i, top) in result.top_predictions.iter().enumerate() {
        println!("    {}. {} ({})", i + 1, top.class, top.confidence);
    }

    if detailed {
        println!("  {}", result.description);
        print_list("Symptoms:", &result.symptoms);
        print_list("Causes:", &result.causes);
        print_list("Treatment:", &result.treatment);
        print_list("Prevention:", &result.prevention);
    }
    println!();
}

fn cmd_labels(config: &AppConfig) -> Result<()> {
    let catalog = load_catalog(config)?;

    println!("{}", "Label Registry:".cyan().bold());
    for (index, (label, record)) in catalog.iter().enumerate() {
        let status = if record.is_healthy {
            "healthy".green()
        } else {
            severity_colored(record.severity)
        };
        println!("  {:>2}  {:45} {:18} {}", index, label.as_str(), record.crop, status);
    }
    println!();
    println!("  {} labels", catalog.len());
    Ok(())
}

fn print_record(record: &DiseaseRecord) {
    println!("{}", record.label.as_str().cyan().bold());
    println!("  Crop:      {}", record.crop);
    println!("  Condition: {}", record.disease_name);
    println!("  Severity:  {}", severity_colored(record.severity));
    println!("  {}", record.description);
    print_list("Symptoms:", &record.symptoms);
    print_list("Causes:", &record.causes);
    print_list("Treatment:", &record.treatment);
    print_list("Prevention:", &record.prevention);
}

fn cmd_describe(config: &AppConfig, label: &str) -> Result<()> {
    let catalog = load_catalog(config)?;

    match catalog.record(label) {
        Some(record) => {
            print_record(record);
            Ok(())
        }
        None => {
            let needle = label.to_lowercase();
            let similar: Vec<&str> = catalog
                .registry()
                .iter()
                .map(|l| l.as_str())
                .filter(|l| l.to_lowercase().contains(&needle))
                .collect();
            if !similar.is_empty() {
                println!("{}", "Did you mean:".yellow());
                for name in similar {
                    println!("  {}", name);
                }
            }
            bail!("Unknown label: {}", label)
        }
    }
}

fn cmd_check(config: &AppConfig, model: Option<PathBuf>) -> Result<()> {
    println!("{}", "Startup Validation:".cyan().bold());

    let catalog = load_catalog(config)?;
    println!(
        "  {} Knowledge base covers all {} labels",
        "ok".green(),
        catalog.len()
    );

    let inconsistent: Vec<&str> = catalog
        .iter()
        .filter(|(_, record)| !record.severity_consistent())
        .map(|(label, _)| label.as_str())
        .collect();
    for label in &inconsistent {
        println!("  {} '{}' severity disagrees with its health flag", "warn".yellow(), label);
    }

    match resolve_checkpoint(config, model) {
        Some(checkpoint) => {
            let predictor = build_predictor(config, &checkpoint)?;
            println!(
                "  {} Model {} loaded ({} classes, {}x{} input, {})",
                "ok".green(),
                checkpoint.display(),
                predictor.engine().num_classes(),
                predictor.engine().input_size(),
                predictor.engine().input_size(),
                backend_name()
            );
        }
        None => {
            println!("  {} No checkpoint configured, model not checked", "skip".yellow());
        }
    }

    println!();
    println!("{}", "All checks passed".green().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plant_diagnosis::inference::{compose, rank, TOP_K};
    use tempfile::TempDir;

    #[test]
    fn test_failed_entry_keeps_path_and_error() {
        let entry = BatchEntry::new(
            PathBuf::from("leaves/c.png"),
            Err(DiagnosisError::unsupported_image("leaves/c.png", "bad header")),
        );
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["path"], "leaves/c.png");
        assert!(value["error"].as_str().unwrap().contains("bad header"));
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_successful_entry_has_no_error() {
        let catalog = Catalog::builtin().unwrap();
        let index = catalog.registry().position("Tomato___Late_blight").unwrap();
        let mut logits = vec![0.0f32; catalog.len()];
        logits[index] = 10.0;
        let ranking = rank(&logits, TOP_K).unwrap();
        let result = compose(&catalog, &ranking).unwrap();

        let value = serde_json::to_value(BatchEntry::new(PathBuf::from("a.png"), Ok(result))).unwrap();
        assert_eq!(value["result"]["prediction"], "Tomato___Late_blight");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_collect_images_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b.png", "a.JPG", "notes.txt"] {
            std::fs::write(temp_dir.path().join(name), b"x").unwrap();
        }

        let files = collect_images(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png"]);
        assert!(collect_images(&temp_dir.path().join("missing")).is_err());
    }
}
