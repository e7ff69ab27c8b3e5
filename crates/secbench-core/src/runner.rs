//! Sequential evaluation loop.
//!
//! The `EvaluationRunner` asks the model one question at a time, scores the
//! reply, accumulates cost and writes checkpoints. A run ends when every
//! question was processed or the cumulative cost went past the budget cap.
//!
//! A failed completion request never aborts the run: the question is recorded
//! with no answer and scored as wrong. Checkpoint I/O errors are fatal.

use crate::completion::{CompletionClient, CompletionRequest, SamplingParams};
use crate::config::RunConfig;
use crate::error::Result;
use crate::evaluators::{Evaluator, MultipleChoiceEvaluator};
use crate::persistence::CheckpointWriter;
use crate::pricing::{estimate_cost, PriceEntry};
use crate::reporter::{ProgressEvent, ProgressReporter, StatusTracker};
use crate::state::RunState;
use crate::types::{Question, ResultRecord, RunOutcome, RunStatus, TokenUsage};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Per-run knobs that do not change between questions.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerSettings {
    pub model: String,
    pub instruction: String,
    pub system_prompt: String,
    pub sampling: SamplingParams,
    pub budget_cap: f64,
    pub status_interval: Option<u64>,
}

impl RunnerSettings {
    pub fn from_config(model: impl Into<String>, config: &RunConfig) -> Self {
        Self {
            model: model.into(),
            instruction: config.instruction.clone(),
            system_prompt: config.system_prompt.clone(),
            sampling: config.sampling,
            budget_cap: config.budget_cap,
            status_interval: config.status_interval,
        }
    }
}

pub struct EvaluationRunner {
    client: Arc<dyn CompletionClient>,
    reporter: Arc<dyn ProgressReporter>,
    evaluator: Box<dyn Evaluator>,
    checkpoints: CheckpointWriter,
    price: PriceEntry,
    settings: RunnerSettings,
}

impl EvaluationRunner {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        reporter: Arc<dyn ProgressReporter>,
        checkpoints: CheckpointWriter,
        price: PriceEntry,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            client,
            reporter,
            evaluator: Box::new(MultipleChoiceEvaluator),
            checkpoints,
            price,
            settings,
        }
    }

    /// Evaluate `questions` in order and return every record produced.
    ///
    /// On a budget stop the returned records cover only the processed prefix.
    pub async fn run(&self, questions: &[Question]) -> Result<RunOutcome> {
        let total = questions.len() as u64;
        let tracker = StatusTracker::new(self.settings.status_interval);
        let mut state = RunState::new(total);
        let mut records: Vec<ResultRecord> = Vec::with_capacity(questions.len());

        state.transition(RunStatus::Running);
        info!(
            model = %self.settings.model,
            total,
            budget_cap = self.settings.budget_cap,
            evaluator = self.evaluator.kind(),
            checkpoints = self.checkpoints.is_enabled(),
            status_lines = tracker.is_enabled(),
            "starting evaluation"
        );
        self.reporter.report(ProgressEvent::RunStarted {
            model: self.settings.model.clone(),
            total_questions: total,
            params: self.settings.sampling,
        });

        for (idx, question) in questions.iter().enumerate() {
            let index = idx as u64 + 1;
            let (answer, usage) = self.ask(index, question).await;

            let evaluation = self.evaluator.evaluate(question, answer.as_deref());
            let cost = estimate_cost(&usage, &self.price);
            let answered = answer.is_some();
            records.push(ResultRecord::new(question, answer));
            state.record(evaluation.passed, cost);

            debug!(
                index,
                passed = evaluation.passed,
                predicted = ?evaluation.predicted,
                expected = %evaluation.expected,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                cost,
                "question scored"
            );
            self.reporter.report(ProgressEvent::QuestionScored {
                index,
                total,
                passed: evaluation.passed,
                answered,
                cost,
                total_cost: state.total_cost(),
            });

            if let Some(line) = tracker.maybe_report(Instant::now(), &mut state) {
                self.reporter.report(ProgressEvent::Status(line));
            }

            if let Some(path) = self
                .checkpoints
                .maybe_checkpoint(state.processed(), &records)?
            {
                info!(path = %path.display(), records = records.len(), "checkpoint saved");
                self.reporter.report(ProgressEvent::CheckpointSaved {
                    path,
                    records: records.len() as u64,
                });
            }

            if state.over_budget(self.settings.budget_cap) {
                warn!(
                    total_cost = state.total_cost(),
                    budget_cap = self.settings.budget_cap,
                    processed = state.processed(),
                    "budget cap exceeded, stopping run"
                );
                self.reporter.report(ProgressEvent::BudgetExceeded {
                    cap: self.settings.budget_cap,
                    total_cost: state.total_cost(),
                    processed: state.processed(),
                    total,
                });
                state.transition(RunStatus::BudgetStopped);
                break;
            }
        }

        if state.status == RunStatus::Running {
            state.transition(RunStatus::Completed);
        }

        let elapsed = state.elapsed_at(Instant::now());
        info!(
            status = ?state.status,
            processed = state.processed(),
            correct = state.correct(),
            total_cost = state.total_cost(),
            "evaluation finished"
        );
        self.reporter.report(ProgressEvent::RunCompleted {
            status: state.status,
            processed: state.processed(),
            total,
            correct: state.correct(),
            wrong: state.wrong(),
            elapsed,
            total_cost: state.total_cost(),
        });

        Ok(RunOutcome {
            records,
            status: state.status,
            total_questions: total,
            correct: state.correct(),
            wrong: state.wrong(),
            total_cost: state.total_cost(),
            elapsed,
        })
    }

    async fn ask(&self, index: u64, question: &Question) -> (Option<String>, TokenUsage) {
        let request = CompletionRequest::for_question(
            question,
            &self.settings.instruction,
            &self.settings.system_prompt,
            &self.settings.model,
            self.settings.sampling,
        );
        match self.client.complete(&request).await {
            Ok(completion) => (completion.text, completion.usage),
            Err(err) => {
                warn!(index, error = %err, "completion request failed");
                (None, TokenUsage::default())
            }
        }
    }
}
