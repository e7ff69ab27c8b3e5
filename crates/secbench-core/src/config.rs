//! Run configuration.
//!
//! Configuration is loaded via figment from multiple layers:
//! 1. Built-in defaults
//! 2. YAML file (optional)
//! 3. Environment variables (SECBENCH_ prefix, __ as nested separator)
//! 4. CLI overrides (passed programmatically)

use crate::completion::{
    BackendSettings, SamplingParams, DEFAULT_INSTRUCTION, DEFAULT_SYSTEM_PROMPT,
};
use crate::pricing::{PriceEntry, LITELLM_PRICES_URL};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Figment(#[from] figment::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// DEFAULTS
// ============================================================================

fn default_budget_cap() -> f64 {
    20.0
}

fn default_checkpoint_dir() -> String {
    "checkpoints".to_string()
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_pricing_url() -> String {
    LITELLM_PRICES_URL.to_string()
}

fn default_pricing_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_instruction() -> String {
    DEFAULT_INSTRUCTION.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

// ============================================================================
// RUN CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Stop once cumulative cost exceeds this amount (USD).
    #[serde(default = "default_budget_cap")]
    pub budget_cap: f64,
    /// Write a checkpoint every N processed questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_interval: Option<u64>,
    /// Print a status line every N seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_interval: Option<u64>,
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_pricing_url")]
    pub pricing_url: String,
    #[serde(default = "default_pricing_timeout_secs")]
    pub pricing_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_instruction")]
    pub instruction: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Fixed per-token prices; skips the registry lookup when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_override: Option<PriceEntry>,
    #[serde(default)]
    pub sampling: SamplingParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            budget_cap: default_budget_cap(),
            save_interval: None,
            status_interval: None,
            checkpoint_dir: default_checkpoint_dir(),
            output_dir: default_output_dir(),
            pricing_url: default_pricing_url(),
            pricing_timeout_secs: default_pricing_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            instruction: default_instruction(),
            system_prompt: default_system_prompt(),
            price_override: None,
            sampling: SamplingParams::default(),
        }
    }
}

impl RunConfig {
    pub fn checkpoint_root(&self) -> PathBuf {
        expand_home(&self.checkpoint_dir)
    }

    pub fn output_root(&self) -> PathBuf {
        expand_home(&self.output_dir)
    }

    pub fn pricing_timeout(&self) -> Duration {
        Duration::from_secs(self.pricing_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

// ============================================================================
// CLI OVERRIDES
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "SamplingParams::is_empty")]
    pub sampling: SamplingParams,
}

// ============================================================================
// LOADING
// ============================================================================

pub fn load_config(path: Option<&Path>) -> Result<RunConfig, ConfigError> {
    load_config_with_overrides(path, ConfigOverrides::default())
}

pub fn load_config_with_overrides(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<RunConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(RunConfig::default()));

    if let Some(path) = path {
        let contents = std::fs::read_to_string(path)?;
        figment = figment.merge(Yaml::string(&interpolate_env_vars(&contents)));
    }

    let figment = figment
        .merge(Env::prefixed("SECBENCH_").split("__"))
        .merge(Serialized::defaults(overrides));

    let mut cfg: RunConfig = figment.extract()?;
    normalize_config(&mut cfg);
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn interpolate_env_vars(input: &str) -> String {
    use once_cell::sync::Lazy;
    use regex::Regex;
    use std::env;

    static ENV_VAR_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid regex")
    });

    ENV_VAR_RE
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_val = caps.get(2).map(|m| m.as_str());
            match env::var(var_name) {
                Ok(val) => val,
                Err(_) => default_val.unwrap_or("").to_string(),
            }
        })
        .to_string()
}

// A zero interval means "off", same as leaving it unset.
fn normalize_config(cfg: &mut RunConfig) {
    cfg.save_interval = cfg.save_interval.filter(|n| *n > 0);
    cfg.status_interval = cfg.status_interval.filter(|n| *n > 0);
}

fn validate_config(cfg: &RunConfig) -> Result<(), ConfigError> {
    if !cfg.budget_cap.is_finite() || cfg.budget_cap <= 0.0 {
        return Err(ConfigError::Invalid(format!(
            "budget_cap must be a positive number, got {}",
            cfg.budget_cap
        )));
    }
    if cfg.pricing_timeout_secs == 0 || cfg.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("timeouts must be at least one second".into()));
    }
    if cfg.instruction.trim().is_empty() {
        return Err(ConfigError::Invalid("instruction must not be empty".into()));
    }
    if cfg.checkpoint_dir.trim().is_empty() || cfg.output_dir.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "checkpoint_dir and output_dir must not be empty".into(),
        ));
    }
    Ok(())
}

// ============================================================================
// BACKEND RESOLUTION
// ============================================================================

/// Build backend settings from `<BACKEND>_API_BASE` / `<BACKEND>_API_KEY`.
///
/// Ollama runs without a key.
pub fn resolve_backend(backend: &str, timeout: Duration) -> BackendSettings {
    resolve_backend_with(backend, timeout, |key| std::env::var(key).ok())
}

pub fn resolve_backend_with(
    backend: &str,
    timeout: Duration,
    lookup: impl Fn(&str) -> Option<String>,
) -> BackendSettings {
    let prefix = backend.to_ascii_uppercase();
    let api_base = lookup(&format!("{prefix}_API_BASE")).filter(|v| !v.trim().is_empty());
    let api_key = if backend.eq_ignore_ascii_case("ollama") {
        None
    } else {
        lookup(&format!("{prefix}_API_KEY")).filter(|v| !v.trim().is_empty())
    };
    BackendSettings {
        provider: backend.to_string(),
        api_base,
        api_key,
        timeout,
    }
}
