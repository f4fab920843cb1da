use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use clap::{Parser, Subcommand};
use kgloss::{logging, LoggingConfig, LossConfig, LossRegistry};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "kgloss")]
#[command(about = "Knowledge-graph embedding loss functions", long_about = None)]
struct Cli {
    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info", env = "KGLOSS_LOG")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered losses with their hyperparameters
    List,

    /// Validate a loss configuration file
    Validate {
        /// Configuration file (JSON or YAML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Evaluate a configured loss on scores read from a JSON file
    Eval {
        /// Configuration file (JSON or YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// JSON file with "positive" and "negative" score arrays
        #[arg(short, long)]
        scores: PathBuf,
    },
}

/// Scores file layout; for `bce`, positive holds y_true and negative y_pred.
#[derive(Deserialize)]
struct ScoresFile {
    positive: Vec<f32>,
    negative: Vec<f32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        json: cli.json_logs,
    })?;

    match cli.command {
        Commands::List => list_losses(),
        Commands::Validate { config } => validate_config(config)?,
        Commands::Eval { config, scores } => evaluate(config, scores)?,
    }

    Ok(())
}

fn list_losses() {
    for descriptor in LossRegistry::global().descriptors() {
        println!(
            "{:<18} params=[{}] require_same_size_pos_neg={}",
            descriptor.name(),
            descriptor.external_params().join(", "),
            descriptor.class_params().require_same_size_pos_neg
        );
    }
}

fn validate_config(config_path: PathBuf) -> Result<()> {
    info!("Validating configuration file: {}", config_path.display());

    let config = LossConfig::from_file(&config_path).context("Failed to load configuration file")?;
    let loss = config
        .build(LossRegistry::global())
        .context("Failed to construct loss")?;

    info!("Configuration is valid: {}", loss);
    Ok(())
}

fn evaluate(config_path: PathBuf, scores_path: PathBuf) -> Result<()> {
    let config = LossConfig::from_file(&config_path).context("Failed to load configuration file")?;
    let loss = config
        .build(LossRegistry::global())
        .context("Failed to construct loss")?;

    let content = fs::read_to_string(&scores_path).context("Failed to read scores file")?;
    let scores: ScoresFile = serde_json::from_str(&content).context("Failed to parse scores file")?;
    info!(
        positives = scores.positive.len(),
        negatives = scores.negative.len(),
        "Evaluating {}",
        loss
    );

    let device = Device::Cpu;
    let scores_pos = Tensor::new(scores.positive.as_slice(), &device)?;
    let scores_neg = Tensor::new(scores.negative.as_slice(), &device)?;
    let value = loss
        .apply(&scores_pos, &scores_neg)
        .context("Failed to evaluate loss")?
        .to_scalar::<f32>()?;

    println!("{}", value);
    Ok(())
}
