//! Dataset loaders.
//!
//! Each supported benchmark ships in its own file format. Loaders turn a file
//! into an ordered list of [`Question`]s; order is preserved end to end.

use crate::error::{Result, SecbenchError};
use crate::types::Question;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

mod cti_bench;
pub use cti_bench::CtiBenchDataset;

mod cybermetric;
pub use cybermetric::CyberMetricDataset;

mod seceval;
pub use seceval::SecEvalDataset;

/// Benchmark family, selected with `-e/--eval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalType {
    SecEval,
    CyberMetric,
    CtiBench,
}

impl EvalType {
    pub const ALL: [EvalType; 3] = [EvalType::SecEval, EvalType::CyberMetric, EvalType::CtiBench];

    pub fn as_str(self) -> &'static str {
        match self {
            EvalType::SecEval => "seceval",
            EvalType::CyberMetric => "cybermetric",
            EvalType::CtiBench => "cti_bench",
        }
    }
}

impl fmt::Display for EvalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvalType {
    type Err = SecbenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seceval" => Ok(EvalType::SecEval),
            "cybermetric" => Ok(EvalType::CyberMetric),
            "cti_bench" | "cti-bench" => Ok(EvalType::CtiBench),
            other => {
                let known: Vec<&str> = EvalType::ALL.iter().map(|e| e.as_str()).collect();
                Err(SecbenchError::Dataset(format!(
                    "unknown eval type '{other}' (expected one of: {})",
                    known.join(", ")
                )))
            }
        }
    }
}

pub trait DatasetLoader {
    fn load(&self, limit: Option<usize>) -> Result<Vec<Question>>;
}

pub fn get_dataset_loader(path: impl Into<PathBuf>, eval_type: EvalType) -> Box<dyn DatasetLoader> {
    let path = path.into();
    match eval_type {
        EvalType::SecEval => Box::new(SecEvalDataset::new(path)),
        EvalType::CyberMetric => Box::new(CyberMetricDataset::new(path)),
        EvalType::CtiBench => Box::new(CtiBenchDataset::new(path)),
    }
}

/// Load every question from `path`.
pub fn load_dataset(path: impl AsRef<Path>, eval_type: EvalType) -> Result<Vec<Question>> {
    get_dataset_loader(path.as_ref(), eval_type).load(None)
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        SecbenchError::Dataset(format!("failed to read {}: {e}", path.display()))
    })
}

fn apply_limit(mut questions: Vec<Question>, limit: Option<usize>) -> Vec<Question> {
    if let Some(limit) = limit {
        questions.truncate(limit);
    }
    questions
}
