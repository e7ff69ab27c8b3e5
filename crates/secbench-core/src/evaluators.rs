//! Multiple-choice answer extraction and scoring.
//!
//! Answers are compared as canonical letter sets: the A-D letters found in a
//! text, deduplicated, sorted and concatenated (`"c, A, a"` becomes `"AC"`).

use crate::types::Question;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static ANSWER_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ANSWER:?\s*([A-D,\s]+)").expect("valid regex"));

fn is_choice_letter(c: char) -> bool {
    matches!(c, 'A'..='D')
}

/// Extract the canonical answer from free-form model output.
///
/// An `ANSWER:` marker restricts extraction to the letters that follow it.
/// Without a usable marker the whole text is scanned for standalone choice
/// tokens such as `c`, `(A)` or `BD`; letters inside ordinary words are
/// ignored.
pub fn parse_answer(text: Option<&str>) -> Option<String> {
    let text = text?.to_uppercase();
    if text.trim().is_empty() {
        return None;
    }

    if let Some(span) = ANSWER_MARKER_RE
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|span| span.chars().any(is_choice_letter))
    {
        return join_letters(span.chars().filter(|c| is_choice_letter(*c)));
    }

    join_letters(
        text.split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|token| !token.is_empty() && token.chars().all(is_choice_letter))
            .flat_map(str::chars),
    )
}

/// Canonical form of a ground-truth solution, e.g. `"a,c"` -> `"AC"`.
///
/// Uses the same extraction as [`parse_answer`]; returns an empty string when
/// the solution holds no choice letters.
pub fn canonicalize(solution: &str) -> String {
    parse_answer(Some(solution)).unwrap_or_default()
}

fn join_letters(letters: impl Iterator<Item = char>) -> Option<String> {
    let set: BTreeSet<char> = letters.collect();
    if set.is_empty() {
        None
    } else {
        Some(set.into_iter().collect())
    }
}

/// True when the model answer names exactly the solution's letter set.
pub fn score(solution: &str, model_answer: Option<&str>) -> bool {
    match parse_answer(model_answer) {
        Some(pred) => {
            let expected = canonicalize(solution);
            !expected.is_empty() && pred == expected
        }
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub passed: bool,
    pub predicted: Option<String>,
    pub expected: String,
}

pub trait Evaluator: Send + Sync {
    fn evaluate(&self, question: &Question, answer: Option<&str>) -> Evaluation;
    fn kind(&self) -> &str;
}

/// Exact letter-set match, no partial credit.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultipleChoiceEvaluator;

impl Evaluator for MultipleChoiceEvaluator {
    fn evaluate(&self, question: &Question, answer: Option<&str>) -> Evaluation {
        let expected = canonicalize(&question.solution);
        let predicted = parse_answer(answer);
        let passed = !expected.is_empty() && predicted.as_deref() == Some(expected.as_str());
        Evaluation {
            passed,
            predicted,
            expected,
        }
    }

    fn kind(&self) -> &str {
        "multiple_choice"
    }
}
