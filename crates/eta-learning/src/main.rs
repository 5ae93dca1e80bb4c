//! eta CLI
//!
//! Cleans delivery order exports, trains the stacked delivery-time model and
//! predicts with a saved artifact.
//!
//! # Usage
//!
//! ```bash
//! eta clean -i deliveries.csv -o cleaned.csv
//! eta train -i deliveries.csv --model stacking_model.json
//! eta predict -i new_orders.csv --model stacking_model.json -o predictions.csv
//! ```

use anyhow::{Context, Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use dotenv::dotenv;
use eta_learning::{DEFAULT_TARGET, Metrics, ModelBuilder, ModelConfig, ModelInfo, SplitSizes};
use eta_processing::{CleaningConfig, CleaningReport, Preprocessor, write_csv};
use polars::prelude::{Column, DataFrame};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Artifact path used when `--model` is not given.
const DEFAULT_MODEL_PATH: &str = "stacking_model.json";

/// Column appended to the cleaned table by `predict`.
const PREDICTION_COLUMN: &str = "predicted_time_taken";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "Delivery time estimation: order cleaning and a stacked regression ensemble.

Logging can be tuned with RUST_LOG, which overrides --log-level.")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print the run report as JSON on stdout (disables logging)
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean a raw order export and write the model-ready table
    Clean {
        /// Input CSV file path
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Clean an order export, fit the stacked ensemble and save the artifact
    Train(TrainArgs),

    /// Predict delivery times for an order export with a saved artifact
    Predict {
        /// Input CSV file path
        #[arg(short, long)]
        input: PathBuf,

        /// Model artifact written by `train`
        #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,

        /// Output CSV file path (cleaned rows plus a prediction column)
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
struct TrainArgs {
    /// Input CSV file path
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the model artifact
    #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Target column
    #[arg(short, long, default_value = DEFAULT_TARGET)]
    target: String,

    /// Numeric feature columns, comma separated (default: delivery features)
    #[arg(long, value_delimiter = ',')]
    numeric: Option<Vec<String>>,

    /// Categorical feature columns, comma separated (default: delivery features)
    #[arg(long, value_delimiter = ',')]
    categorical: Option<Vec<String>>,

    /// Seed for the split and every randomized learner
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

/// Everything `train --json` prints.
#[derive(Serialize)]
struct TrainReport {
    cleaning: CleaningReport,
    split: Option<SplitSizes>,
    validation: Metrics,
    test: Metrics,
    model: ModelInfo,
    artifact: PathBuf,
}

/// Initialize the tracing subscriber.
///
/// In JSON mode no subscriber is installed so stdout carries only the report.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level, quiet))
        .with_target(false)
        .init();
}

/// `RUST_LOG` when set (including from `.env`), otherwise the CLI level.
fn log_filter(level: &str, quiet: bool) -> EnvFilter {
    let effective_level = if quiet { "error" } else { level };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load .env before logging so a RUST_LOG set there reaches the filter
    dotenv().ok();

    init_logging(&args.log_level, args.quiet, args.json);

    match args.command {
        Command::Clean { input, output } => run_clean(&input, &output, args.json),
        Command::Train(train) => run_train(&train, args.json),
        Command::Predict { input, model, output } => run_predict(&input, &model, &output, args.json),
    }
}

fn clean(input: &Path) -> Result<(DataFrame, CleaningReport)> {
    let preprocessor = Preprocessor::from_csv(input, CleaningConfig::default())
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let (cleaned, report) = preprocessor.clean_with_report()?;

    for line in report.summary_lines() {
        info!("{}", line);
    }
    if cleaned.height() == 0 {
        return Err(anyhow!("No rows left after cleaning {}", input.display()));
    }
    Ok((cleaned, report))
}

fn run_clean(input: &Path, output: &Path, json: bool) -> Result<()> {
    let (mut cleaned, report) = clean(input)?;
    write_csv(&mut cleaned, output)?;
    info!("Wrote {} rows to {}", cleaned.height(), output.display());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn run_train(args: &TrainArgs, json: bool) -> Result<()> {
    let (cleaned, cleaning) = clean(&args.input)?;

    let defaults = ModelConfig::default();
    let config = ModelConfig::builder()
        .numeric_features(args.numeric.clone().unwrap_or(defaults.numeric_features))
        .categorical_features(args.categorical.clone().unwrap_or(defaults.categorical_features))
        .target_column(&args.target)
        .random_seed(args.seed)
        .build()?;

    let mut builder = ModelBuilder::for_training(&cleaned, config)?;
    builder.fit()?;

    let validation = builder.validation_metrics()?;
    let test = builder.evaluate(None)?;
    log_metrics("Validation", &validation);
    log_metrics("Test", &test);

    builder.save(&args.model)?;

    if json {
        let info = builder.info();
        let report = TrainReport {
            cleaning,
            split: info.split,
            validation,
            test,
            model: info,
            artifact: args.model.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn run_predict(input: &Path, model: &Path, output: &Path, json: bool) -> Result<()> {
    let builder = ModelBuilder::load(model)
        .with_context(|| format!("Failed to load model {}", model.display()))?;
    let (mut cleaned, _) = clean(input)?;

    let predictions = builder.predict(Some(&cleaned))?;
    cleaned.with_column(Column::new(PREDICTION_COLUMN.into(), &predictions))?;
    write_csv(&mut cleaned, output)?;
    info!("Wrote {} predictions to {}", predictions.len(), output.display());

    if json {
        println!("{}", serde_json::to_string_pretty(&predictions)?);
    }
    Ok(())
}

fn log_metrics(label: &str, metrics: &Metrics) {
    info!(
        "{} ({} rows): R²={:.4} MSE={:.3} RMSE={:.3} MAE={:.3}",
        label, metrics.n_samples, metrics.r2, metrics.mse, metrics.rmse, metrics.mae
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test: it mutates the process environment.
    #[test]
    fn test_dotenv_log_level_reaches_filter() {
        if std::env::var_os("RUST_LOG").is_some() {
            // an explicit shell setting always wins over .env
            return;
        }
        assert_eq!(log_filter("info", false).to_string(), "info");
        assert_eq!(log_filter("debug", true).to_string(), "error");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "RUST_LOG=eta=trace\n").unwrap();
        dotenv::from_path(&path).unwrap();

        assert_eq!(log_filter("info", true).to_string(), "eta=trace");
    }
}
