//! Shared data types for secbench.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A normalized benchmark question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub question: String,
    /// Rendered choice block, one choice per line. Empty when the question
    /// carries its choices inline.
    #[serde(default)]
    pub choices: String,
    pub solution: String,
}

impl Question {
    pub fn new(
        question: impl Into<String>,
        choices: impl Into<String>,
        solution: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            choices: choices.into(),
            solution: solution.into(),
        }
    }
}

/// Token counts reported by the completion backend. Zero when unavailable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// One processed question, as written to checkpoints and the results file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultRecord {
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Choices", default)]
    pub choices: String,
    #[serde(rename = "ModelAnswer", default)]
    pub model_answer: Option<String>,
    #[serde(rename = "Solution")]
    pub solution: String,
}

impl ResultRecord {
    pub fn new(question: &Question, model_answer: Option<String>) -> Self {
        Self {
            question: question.question.clone(),
            choices: question.choices.clone(),
            model_answer,
            solution: question.solution.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    BudgetStopped,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::BudgetStopped)
    }
}

/// What the runner hands back once the loop ends.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub records: Vec<ResultRecord>,
    pub status: RunStatus,
    pub total_questions: u64,
    pub correct: u64,
    pub wrong: u64,
    pub total_cost: f64,
    pub elapsed: Duration,
}

impl RunOutcome {
    pub fn processed(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn budget_stopped(&self) -> bool {
        self.status == RunStatus::BudgetStopped
    }
}
