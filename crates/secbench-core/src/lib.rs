//! Core library for secbench, a multiple-choice security benchmark runner.
//!
//! This crate provides the building blocks for evaluating a chat model on
//! cybersecurity question sets:
//!
//! - [`datasets`]: Loaders for SecEval, CyberMetric and CTI-Bench files
//! - [`completion`]: Chat completion clients (OpenAI-compatible, Anthropic)
//! - [`evaluators`]: Answer parsing and exact letter-set scoring
//! - [`pricing`]: Per-token prices and cost estimation
//! - [`runner`]: The sequential evaluation loop
//! - [`reporter`]: Progress events and status lines
//! - [`persistence`]: Checkpoint and result files
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Unified error types
//!
//! # Architecture
//!
//! The runner asks one question at a time, scores the reply, adds its cost to
//! the running total and stops early once the budget cap is exceeded. Progress
//! flows out through a [`reporter::ProgressReporter`]; checkpoints are written
//! every `save_interval` questions.

// Foundation modules (no internal dependencies)
pub mod types;

// Error types
pub mod error;

// Core modules
pub mod completion;
pub mod config;
pub mod pricing;

// Data loading
pub mod datasets;

// Execution
pub mod evaluators;
pub mod metrics;
pub mod persistence;
pub mod reporter;
pub mod runner;
pub mod state;

pub use error::{Result, SecbenchError};
pub use runner::{EvaluationRunner, RunnerSettings};
pub use types::{Question, ResultRecord, RunOutcome, RunStatus, TokenUsage};
