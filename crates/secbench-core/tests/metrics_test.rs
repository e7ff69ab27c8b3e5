//! Tests for the metrics module.

use secbench_core::metrics::{compute_accuracy, percentage};
use secbench_core::types::{Question, ResultRecord};

fn record(solution: &str, answer: Option<&str>) -> ResultRecord {
    ResultRecord::new(
        &Question::new("q", "A: x\nB: y", solution),
        answer.map(String::from),
    )
}

#[test]
fn empty_result_set_has_zero_accuracy() {
    let acc = compute_accuracy(&[]);
    assert_eq!(acc.accuracy, 0.0);
    assert_eq!(acc.total, 0);
    assert_eq!(acc.correct, 0);
}

#[test]
fn aggregates_accuracy() {
    let res = vec![
        record("A", Some("ANSWER: A")),
        record("BC", Some("b c")),
        record("D", None),
    ];
    let acc = compute_accuracy(&res);
    assert_eq!(acc.total, 3);
    assert_eq!(acc.correct, 2);
    assert_eq!(acc.wrong(), 1);
    assert_eq!(acc.unanswered, 1);
    assert!((acc.accuracy - 66.666_666).abs() < 1e-3);
    assert_eq!(format!("{:.2}", acc.accuracy), "66.67");
}

#[test]
fn unparseable_answers_count_as_wrong() {
    let res = vec![record("A", Some("I refuse")), record("A", Some("A"))];
    let acc = compute_accuracy(&res);
    assert_eq!(acc.correct, 1);
    assert_eq!(acc.unanswered, 0);
    assert!((acc.accuracy - 50.0).abs() < 1e-9);
}

#[test]
fn percentage_guards_division_by_zero() {
    assert_eq!(percentage(0, 0), 0.0);
    assert!((percentage(1, 4) - 25.0).abs() < 1e-9);
}
