//! Run state management.
//!
//! Counters for a single evaluation run plus its lifecycle status
//! (`Idle -> Running -> Completed | BudgetStopped`).

use crate::metrics::percentage;
use crate::types::RunStatus;
use std::time::Duration;
use tokio::time::Instant;

/// Live counters for one run. Owned and mutated by the runner only.
#[derive(Debug, Clone)]
pub struct RunState {
    pub status: RunStatus,
    pub total: u64,
    processed: u64,
    correct: u64,
    wrong: u64,
    total_cost: f64,
    started_at: Instant,
    last_report_at: Instant,
}

impl RunState {
    pub fn new(total: u64) -> Self {
        Self::starting_at(total, Instant::now())
    }

    pub fn starting_at(total: u64, now: Instant) -> Self {
        Self {
            status: RunStatus::Idle,
            total,
            processed: 0,
            correct: 0,
            wrong: 0,
            total_cost: 0.0,
            started_at: now,
            last_report_at: now,
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn correct(&self) -> u64 {
        self.correct
    }

    pub fn wrong(&self) -> u64 {
        self.wrong
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn last_report_at(&self) -> Instant {
        self.last_report_at
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Live accuracy over the questions processed so far, in percent.
    pub fn accuracy(&self) -> f64 {
        percentage(self.correct, self.processed)
    }

    /// Count one scored question. A failed request counts as wrong.
    pub fn record(&mut self, passed: bool, cost: f64) {
        self.processed += 1;
        if passed {
            self.correct += 1;
        } else {
            self.wrong += 1;
        }
        if cost.is_finite() && cost > 0.0 {
            self.total_cost += cost;
        }
    }

    pub fn mark_reported(&mut self, now: Instant) {
        self.last_report_at = now;
    }

    pub fn over_budget(&self, cap: f64) -> bool {
        self.total_cost > cap
    }

    pub fn transition(&mut self, to: RunStatus) {
        debug_assert!(
            !self.status.is_terminal(),
            "run already finished as {:?}",
            self.status
        );
        self.status = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_correct_and_wrong() {
        let mut state = RunState::new(3);
        state.transition(RunStatus::Running);
        state.record(true, 0.5);
        state.record(false, 0.25);
        assert_eq!(state.processed(), 2);
        assert_eq!(state.correct(), 1);
        assert_eq!(state.wrong(), 1);
        assert!((state.total_cost() - 0.75).abs() < 1e-12);
        assert!((state.accuracy() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn cost_never_decreases() {
        let mut state = RunState::new(2);
        state.record(true, 1.0);
        state.record(true, -5.0);
        state.record(true, f64::NAN);
        assert!((state.total_cost() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn budget_is_exceeded_strictly_above_cap() {
        let mut state = RunState::new(2);
        state.record(true, 20.0);
        assert!(!state.over_budget(20.0));
        state.record(true, 0.01);
        assert!(state.over_budget(20.0));
    }

    #[test]
    fn accuracy_before_any_question_is_zero() {
        assert_eq!(RunState::new(10).accuracy(), 0.0);
    }
}
