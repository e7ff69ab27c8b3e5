//! Indicatif-based progress display for the CLI.
//!
//! Renders runner events as a single progress bar with a running
//! correct/wrong/cost message. Banners, status lines and checkpoint notices
//! go to stdout above the bar.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use secbench_core::reporter::{format_duration, ProgressEvent, ProgressReporter};
use secbench_core::RunStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const RULE_WIDTH: usize = 70;

struct Counters {
    correct: AtomicU64,
    wrong: AtomicU64,
    unanswered: AtomicU64,
}

/// Progress display using indicatif for rich terminal output.
pub struct ProgressDisplay {
    bar: Mutex<Option<ProgressBar>>,
    counters: Counters,
    start_time: Mutex<Option<Instant>>,
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressDisplay {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            counters: Counters {
                correct: AtomicU64::new(0),
                wrong: AtomicU64::new(0),
                unanswered: AtomicU64::new(0),
            },
            start_time: Mutex::new(None),
        }
    }

    fn current_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|guard| guard.clone())
    }

    // Print above the bar. `suspend` also works while the bar is hidden.
    fn emit(&self, line: String) {
        match self.current_bar() {
            Some(bar) => bar.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    fn elapsed(&self) -> Duration {
        self.start_time
            .lock()
            .ok()
            .and_then(|t| *t)
            .map(|t| t.elapsed())
            .unwrap_or_default()
    }

    fn update_message(&self, bar: &ProgressBar, total_cost: f64) {
        let msg = format!(
            "{} {} {} {} {} {} {} {}",
            style("✓").green(),
            style(self.counters.correct.load(Ordering::Relaxed)).green().bold(),
            style("✗").red(),
            style(self.counters.wrong.load(Ordering::Relaxed)).red().bold(),
            style("⚠").yellow(),
            style(self.counters.unanswered.load(Ordering::Relaxed)).yellow(),
            style(format!("${total_cost:.4}")).cyan(),
            style(format_duration(self.elapsed())).dim(),
        );
        bar.set_message(msg);
    }

    fn start(&self, model: &str, total_questions: u64, params: String) {
        if let Ok(mut start) = self.start_time.lock() {
            *start = Some(Instant::now());
        }

        let rule = "=".repeat(RULE_WIDTH);
        println!("\n{rule}");
        println!("{} Starting Evaluation", style("→").cyan().bold());
        println!("Model: {}", style(model).bold());
        println!("Total questions: {total_questions}");
        if !params.is_empty() {
            println!("Model parameters: {params}");
        }
        println!("{rule}\n");

        let bar_style = ProgressStyle::with_template(
            "{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ");

        let bar = ProgressBar::new(total_questions);
        bar.set_style(bar_style);
        self.update_message(&bar, 0.0);
        bar.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        status: RunStatus,
        processed: u64,
        total: u64,
        correct: u64,
        wrong: u64,
        elapsed: Duration,
        total_cost: f64,
    ) {
        if let Some(bar) = self.bar.lock().ok().and_then(|mut slot| slot.take()) {
            bar.finish_and_clear();
        }

        let headline = match status {
            RunStatus::BudgetStopped => style("Evaluation Stopped (cost cap)").yellow().bold(),
            _ => style("Evaluation Completed").green().bold(),
        };

        let rule = "=".repeat(RULE_WIDTH);
        println!("\n{rule}");
        println!("{headline}");
        if processed < total {
            println!(
                "Questions: {processed}/{total} [{} not attempted]",
                style(total - processed).yellow()
            );
        } else {
            println!("Questions: {processed}/{total}");
        }
        println!(
            "Correct: {} | Wrong: {}",
            style(correct).green(),
            style(wrong).red()
        );
        println!("Total time: {}", format_duration(elapsed));
        println!("Total cost: {}", style(format!("${total_cost:.4}")).cyan());
        println!("{rule}\n");
    }
}

impl ProgressReporter for ProgressDisplay {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::RunStarted {
                model,
                total_questions,
                params,
            } => self.start(&model, total_questions, params.to_string()),

            ProgressEvent::QuestionScored {
                index,
                passed,
                answered,
                total_cost,
                ..
            } => {
                if passed {
                    self.counters.correct.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.counters.wrong.fetch_add(1, Ordering::Relaxed);
                }
                if !answered {
                    self.counters.unanswered.fetch_add(1, Ordering::Relaxed);
                }
                if let Some(bar) = self.current_bar() {
                    bar.set_position(index);
                    self.update_message(&bar, total_cost);
                }
            }

            ProgressEvent::Status(line) => self.emit(line.to_string()),

            ProgressEvent::CheckpointSaved { path, records } => self.emit(format!(
                "{} Checkpoint saved ({records} results): {}",
                style("→").cyan(),
                path.display()
            )),

            ProgressEvent::BudgetExceeded {
                cap,
                total_cost,
                processed,
                total,
            } => self.emit(format!(
                "\n{} Cost cap reached (${cap:.2}), stopping. Spent ${total_cost:.4} on {processed}/{total} questions.",
                style("⚠").yellow().bold()
            )),

            ProgressEvent::RunCompleted {
                status,
                processed,
                total,
                correct,
                wrong,
                elapsed,
                total_cost,
            } => self.finish(status, processed, total, correct, wrong, elapsed, total_cost),
        }
    }
}
