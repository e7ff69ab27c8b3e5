//! Tests for the evaluators module.

use secbench_core::evaluators::{canonicalize, parse_answer, score, Evaluator, MultipleChoiceEvaluator};
use secbench_core::Question;

#[test]
fn parsed_answers_are_unique_sorted_letters() {
    let inputs = [
        "ANSWER: AC",
        "answer: d, b, b",
        "I think the answer is c and a",
        "B",
        "Options A and D are correct.",
        "ANSWER:\nC",
        "",
        "no letters here",
        "Because the firewall blocks it, D",
        "ANSWER: ZZZ but really B",
    ];
    for input in inputs {
        if let Some(answer) = parse_answer(Some(input)) {
            assert!(!answer.is_empty(), "{input:?}");
            let letters: Vec<char> = answer.chars().collect();
            assert!(letters.iter().all(|c| ('A'..='D').contains(c)), "{input:?} -> {answer}");
            assert!(letters.windows(2).all(|w| w[0] < w[1]), "{input:?} -> {answer}");
        }
    }
}

#[test]
fn known_parses() {
    assert_eq!(parse_answer(Some("ANSWER: AC")).as_deref(), Some("AC"));
    assert_eq!(
        parse_answer(Some("I think the answer is c and a")).as_deref(),
        Some("AC")
    );
    assert_eq!(parse_answer(Some("no letters here")), None);
    assert_eq!(parse_answer(None), None);
}

#[test]
fn scoring_is_exact_set_match() {
    assert!(score("a,c", Some("CA")));
    assert!(!score("A", Some("AB")));
    assert!(!score("A", None));
    assert_eq!(canonicalize("c, a"), "AC");
}

#[test]
fn evaluator_reports_prediction_and_expectation() {
    let question = Question::new("q", "A: x\nB: y", "b");
    let eval = MultipleChoiceEvaluator.evaluate(&question, Some("ANSWER: B"));
    assert!(eval.passed);
    assert_eq!(eval.predicted.as_deref(), Some("B"));
    assert_eq!(eval.expected, "B");

    let miss = MultipleChoiceEvaluator.evaluate(&question, Some("nothing useful"));
    assert!(!miss.passed);
    assert_eq!(miss.predicted, None);
    assert_eq!(MultipleChoiceEvaluator.kind(), "multiple_choice");
}
