//! CLI for secbench - accuracy and cost evaluation of LLMs on multiple-choice
//! cybersecurity benchmarks.

mod progress;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use progress::ProgressDisplay;
use secbench_core::completion::{HttpCompletionClient, SamplingParams};
use secbench_core::config::{load_config_with_overrides, resolve_backend, ConfigOverrides, RunConfig};
use secbench_core::datasets::{get_dataset_loader, EvalType};
use secbench_core::metrics::compute_accuracy;
use secbench_core::persistence::{results_file_name, write_results, CheckpointWriter};
use secbench_core::pricing::{PriceCache, PriceEntry, RegistryPriceSource};
use secbench_core::reporter::{PrintReporter, ProgressReporter};
use secbench_core::{EvaluationRunner, Question, RunOutcome, RunnerSettings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "secbench",
    version,
    about = "Security Benchmark Evaluation for LLMs"
)]
struct Cli {
    /// Path to the dataset file.
    #[arg(short = 'd', long = "dataset-file", alias = "dataset_file")]
    dataset_file: PathBuf,

    /// Evaluation type (seceval, cybermetric, cti_bench).
    #[arg(short = 'e', long, value_parser = parse_eval_type)]
    eval: EvalType,

    /// LLM backend (openai, anthropic, ollama, groq, ...).
    #[arg(short = 'B', long)]
    backend: String,

    /// Model name as the backend knows it.
    #[arg(short = 'm', long)]
    model: String,

    /// Save intermediate results every N questions.
    #[arg(short = 's', long = "save-interval", alias = "save_interval")]
    save_interval: Option<u64>,

    /// Print a status update every N seconds (default: only at the end).
    #[arg(long)]
    status_interval: Option<u64>,

    /// Model temperature (0.0-2.0).
    #[arg(long)]
    temperature: Option<f64>,

    /// Maximum tokens in the response.
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Nucleus sampling parameter.
    #[arg(long)]
    top_p: Option<f64>,

    /// Top-k sampling parameter.
    #[arg(long)]
    top_k: Option<u32>,

    /// Frequency penalty (-2.0 to 2.0).
    #[arg(long, allow_hyphen_values = true)]
    frequency_penalty: Option<f64>,

    /// Presence penalty (-2.0 to 2.0).
    #[arg(long, allow_hyphen_values = true)]
    presence_penalty: Option<f64>,

    /// Optional YAML configuration file.
    #[arg(short = 'c', long, env = "SECBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Stop once the cumulative cost exceeds this many USD.
    #[arg(long)]
    budget_cap: Option<f64>,

    /// Directory for the final results file.
    #[arg(long)]
    output_dir: Option<String>,

    /// Root directory for checkpoints.
    #[arg(long)]
    checkpoint_dir: Option<String>,

    /// Only evaluate the first N questions.
    #[arg(long)]
    limit: Option<usize>,

    /// Plain line output instead of a progress bar.
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            top_k: self.top_k,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
        }
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            budget_cap: self.budget_cap,
            save_interval: self.save_interval,
            status_interval: self.status_interval,
            checkpoint_dir: self.checkpoint_dir.clone(),
            output_dir: self.output_dir.clone(),
            sampling: self.sampling(),
        }
    }
}

fn parse_eval_type(value: &str) -> std::result::Result<EvalType, String> {
    value.parse::<EvalType>().map_err(|e| e.to_string())
}

fn init_tracing() {
    // Logs go to stderr so stdout carries only the report.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = load_config_with_overrides(cli.config.as_deref(), cli.overrides())
        .context("failed to load configuration")?;
    debug!(?config, "resolved configuration");

    let questions = get_dataset_loader(&cli.dataset_file, cli.eval)
        .load(cli.limit)
        .with_context(|| format!("failed to load dataset {}", cli.dataset_file.display()))?;
    if questions.is_empty() {
        warn!(dataset = %cli.dataset_file.display(), "dataset contains no questions");
    }
    info!(count = questions.len(), eval = %cli.eval, "dataset loaded");

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(evaluate(&cli, &config, &questions))?;

    let accuracy = compute_accuracy(&outcome.records);
    println!(
        "Final Accuracy: {:.2}% ({}/{})",
        accuracy.accuracy, accuracy.correct, accuracy.total
    );

    let out_file = config
        .output_root()
        .join(results_file_name(cli.eval.as_str(), &cli.model));
    write_results(&out_file, &outcome.records)
        .with_context(|| format!("failed to write {}", out_file.display()))?;
    println!(
        "{} Results saved to {}",
        style("✓").green().bold(),
        out_file.display()
    );

    Ok(())
}

async fn evaluate(cli: &Cli, config: &RunConfig, questions: &[Question]) -> Result<RunOutcome> {
    let backend = resolve_backend(&cli.backend, config.request_timeout());
    let client = HttpCompletionClient::new(backend)
        .with_context(|| format!("cannot set up backend '{}'", cli.backend))?;
    info!(url = client.url(), "using completion endpoint");

    let price = resolve_price(&cli.model, config).await?;
    if price.is_free() {
        debug!(model = %cli.model, "no pricing available, cost will stay at zero");
    }

    let checkpoints = CheckpointWriter::new(config.checkpoint_root(), &cli.model, config.save_interval)?;
    let reporter: Arc<dyn ProgressReporter> = if cli.no_progress {
        Arc::new(PrintReporter)
    } else {
        Arc::new(ProgressDisplay::new())
    };

    let runner = EvaluationRunner::new(
        Arc::new(client),
        reporter,
        checkpoints,
        price,
        RunnerSettings::from_config(cli.model.clone(), config),
    );
    Ok(runner.run(questions).await?)
}

async fn resolve_price(model: &str, config: &RunConfig) -> Result<PriceEntry> {
    if let Some(price) = config.price_override {
        return Ok(price);
    }
    let source = RegistryPriceSource::new(config.pricing_url.clone(), config.pricing_timeout())?;
    let mut cache = PriceCache::new();
    Ok(cache.price_for(model, &source).await)
}
