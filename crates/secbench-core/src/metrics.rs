//! Metrics aggregation utilities.

use crate::evaluators::score;
use crate::types::ResultRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Accuracy {
    /// Percentage in `[0, 100]`.
    pub accuracy: f64,
    pub correct: u64,
    pub total: u64,
    /// Records whose request failed and carry no model answer.
    pub unanswered: u64,
}

impl Accuracy {
    pub fn wrong(&self) -> u64 {
        self.total - self.correct
    }
}

/// Percentage of `correct` out of `total`; zero when there is nothing to score.
pub fn percentage(correct: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    }
}

pub fn compute_accuracy(records: &[ResultRecord]) -> Accuracy {
    let total = records.len() as u64;
    let correct = records
        .iter()
        .filter(|r| score(&r.solution, r.model_answer.as_deref()))
        .count() as u64;
    let unanswered = records.iter().filter(|r| r.model_answer.is_none()).count() as u64;

    Accuracy {
        accuracy: percentage(correct, total),
        correct,
        total,
        unanswered,
    }
}
