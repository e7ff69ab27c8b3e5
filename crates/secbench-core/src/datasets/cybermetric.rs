use super::{apply_limit, read_source, DatasetLoader};
use crate::error::{Result, SecbenchError};
use crate::types::Question;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct CyberMetricFile {
    #[serde(default)]
    questions: Vec<CyberMetricRecord>,
}

#[derive(Debug, Deserialize)]
struct CyberMetricRecord {
    question: String,
    // Keyed by option letter; BTreeMap keeps A..D in order.
    answers: BTreeMap<String, String>,
    solution: String,
}

/// CyberMetric: `{"questions": [{question, answers: {A: ..}, solution}]}`.
pub struct CyberMetricDataset {
    path: PathBuf,
}

impl CyberMetricDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetLoader for CyberMetricDataset {
    fn load(&self, limit: Option<usize>) -> Result<Vec<Question>> {
        let raw = read_source(&self.path)?;
        let file: CyberMetricFile = serde_json::from_str(&raw).map_err(|e| {
            SecbenchError::Dataset(format!(
                "invalid CyberMetric file {}: {e}",
                self.path.display()
            ))
        })?;
        let questions = file
            .questions
            .into_iter()
            .map(|r| {
                let choices = r
                    .answers
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                Question::new(r.question, choices, r.solution)
            })
            .collect();
        Ok(apply_limit(questions, limit))
    }
}
