//! Progress reporting trait and types for evaluation runs.

use crate::completion::SamplingParams;
use crate::metrics::percentage;
use crate::state::RunState;
use crate::types::RunStatus;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// Events emitted by the runner, in processing order.
#[derive(Debug, Clone, Serialize)]
pub enum ProgressEvent {
    /// Run started with the question count and the sampling parameters in use.
    RunStarted {
        model: String,
        total_questions: u64,
        params: SamplingParams,
    },
    /// Emitted after every question, before any status line or checkpoint.
    QuestionScored {
        index: u64,
        total: u64,
        passed: bool,
        answered: bool,
        cost: f64,
        total_cost: f64,
    },
    /// Periodic status line, emitted once per status interval.
    Status(StatusLine),
    /// A checkpoint snapshot was written.
    CheckpointSaved {
        path: PathBuf,
        records: u64,
    },
    /// Cumulative cost went over the cap; no further questions are asked.
    BudgetExceeded {
        cap: f64,
        total_cost: f64,
        processed: u64,
        total: u64,
    },
    /// Run finished, either completed or stopped by the budget cap.
    RunCompleted {
        status: RunStatus,
        processed: u64,
        total: u64,
        correct: u64,
        wrong: u64,
        elapsed: Duration,
        total_cost: f64,
    },
}

/// Receives events during a run and renders them somewhere.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

#[derive(Debug, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _event: ProgressEvent) {}
}

/// Plain stdout reporter.
#[derive(Debug, Default)]
pub struct PrintReporter;

impl ProgressReporter for PrintReporter {
    fn report(&self, event: ProgressEvent) {
        let rule = "=".repeat(70);
        match event {
            ProgressEvent::RunStarted {
                model,
                total_questions,
                params,
            } => {
                println!("\n{rule}");
                println!("Starting Evaluation");
                println!("Model: {model}");
                println!("Total questions: {total_questions}");
                if !params.is_empty() {
                    println!("Model parameters: {params}");
                }
                println!("{rule}\n");
            }
            ProgressEvent::QuestionScored { .. } => {}
            ProgressEvent::Status(line) => println!("{line}"),
            ProgressEvent::CheckpointSaved { path, records } => {
                println!("Checkpoint saved ({records} results): {}", path.display());
            }
            ProgressEvent::BudgetExceeded { cap, .. } => {
                println!("\nCost cap reached (${cap:.2}), stopping.");
            }
            ProgressEvent::RunCompleted {
                status,
                processed,
                total,
                correct,
                wrong,
                elapsed,
                total_cost,
            } => {
                println!("\n{rule}");
                match status {
                    RunStatus::BudgetStopped => println!("Evaluation Stopped (cost cap)"),
                    _ => println!("Evaluation Completed"),
                }
                println!("Questions: {processed}/{total}");
                println!("Correct: {correct} | Wrong: {wrong}");
                println!("Total time: {}", format_duration(elapsed));
                println!("Total cost: ${total_cost:.4}");
                println!("{rule}\n");
            }
        }
    }
}

/// Snapshot of run progress rendered as one status line.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusLine {
    pub processed: u64,
    pub total: u64,
    pub percent_complete: f64,
    pub correct: u64,
    pub wrong: u64,
    pub accuracy: f64,
    pub elapsed: Duration,
    pub remaining: Duration,
    pub total_cost: f64,
}

impl StatusLine {
    pub fn from_state(state: &RunState, now: Instant) -> Self {
        let elapsed = state.elapsed_at(now);
        let processed = state.processed();
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 {
            processed as f64 / secs
        } else {
            0.0
        };
        let remaining = if rate > 0.0 {
            Duration::from_secs_f64(state.total.saturating_sub(processed) as f64 / rate)
        } else {
            Duration::ZERO
        };

        Self {
            processed,
            total: state.total,
            percent_complete: percentage(processed, state.total),
            correct: state.correct(),
            wrong: state.wrong(),
            accuracy: state.accuracy(),
            elapsed,
            remaining,
            total_cost: state.total_cost(),
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:4}/{}] {:5.1}% | Correct: {:4} | Wrong: {:4} | Accuracy: {:5.2}% | Time: {} | Est. remaining: {} | Cost: ${:.4}",
            self.processed,
            self.total,
            self.percent_complete,
            self.correct,
            self.wrong,
            self.accuracy,
            format_duration(self.elapsed),
            format_duration(self.remaining),
            self.total_cost
        )
    }
}

/// Decides when a status line is due.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusTracker {
    interval: Option<Duration>,
}

impl StatusTracker {
    /// A zero or missing interval disables periodic status lines.
    pub fn new(interval_secs: Option<u64>) -> Self {
        Self {
            interval: interval_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    /// Returns a status line when at least one interval has passed since the
    /// last report, and moves the last-report mark to `now`.
    pub fn maybe_report(&self, now: Instant, state: &mut RunState) -> Option<StatusLine> {
        let interval = self.interval?;
        if now.saturating_duration_since(state.last_report_at()) < interval {
            return None;
        }
        let line = StatusLine::from_state(state, now);
        state.mark_reported(now);
        Some(line)
    }
}

/// Formats whole seconds as `1h 2m 3s`, dropping leading zero units.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(5025)), "1h 23m 45s");
        assert_eq!(format_duration(Duration::from_secs(3605)), "1h 0m 5s");
        assert_eq!(format_duration(Duration::from_millis(1999)), "1s");
    }

    #[test]
    fn disabled_tracker_never_reports() {
        let start = Instant::now();
        let mut state = RunState::starting_at(10, start);
        let tracker = StatusTracker::new(None);
        assert!(!tracker.is_enabled());
        assert!(tracker
            .maybe_report(start + Duration::from_secs(3600), &mut state)
            .is_none());
        assert!(!StatusTracker::new(Some(0)).is_enabled());
    }

    #[test]
    fn reports_once_per_interval() {
        let start = Instant::now();
        let mut state = RunState::starting_at(10, start);
        let tracker = StatusTracker::new(Some(5));

        state.record(true, 0.0);
        assert!(tracker
            .maybe_report(start + Duration::from_secs(4), &mut state)
            .is_none());

        let at = start + Duration::from_secs(5);
        let line = tracker.maybe_report(at, &mut state).expect("due");
        assert_eq!(line.processed, 1);
        assert_eq!(state.last_report_at(), at);

        assert!(tracker
            .maybe_report(at + Duration::from_secs(2), &mut state)
            .is_none());
        assert!(tracker
            .maybe_report(at + Duration::from_secs(5), &mut state)
            .is_some());
    }

    #[test]
    fn status_line_estimates_remaining_time() {
        let start = Instant::now();
        let mut state = RunState::starting_at(10, start);
        state.record(true, 0.001);
        state.record(false, 0.001);

        let line = StatusLine::from_state(&state, start + Duration::from_secs(4));
        assert!((line.percent_complete - 20.0).abs() < 1e-9);
        assert!((line.accuracy - 50.0).abs() < 1e-9);
        // 2 questions in 4s -> 0.5/s -> 8 remaining take 16s.
        assert_eq!(line.remaining.as_secs(), 16);
        assert_eq!(
            line.to_string(),
            "[   2/10]  20.0% | Correct:    1 | Wrong:    1 | Accuracy: 50.00% | Time: 4s | Est. remaining: 16s | Cost: $0.0020"
        );
    }

    #[test]
    fn remaining_is_zero_without_progress() {
        let start = Instant::now();
        let state = RunState::starting_at(10, start);
        let line = StatusLine::from_state(&state, start);
        assert_eq!(line.remaining, Duration::ZERO);
        assert_eq!(line.accuracy, 0.0);
    }
}
