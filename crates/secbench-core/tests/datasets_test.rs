//! Tests for the datasets module.

use secbench_core::datasets::{get_dataset_loader, load_dataset, EvalType};
use serde_json::json;
use std::io::Write;
use tempfile::tempdir;

#[test]
fn seceval_file_loads_in_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("questions.json");
    let data = json!([
        {"question": "q1", "choices": ["A: one", "B: two"], "answer": "A"},
        {"question": "q2", "choices": ["A: x", "B: y", "C: z"], "answer": "BC"},
        {"question": "q3", "choices": [], "answer": "D"}
    ]);
    std::fs::write(&path, data.to_string()).unwrap();

    let questions = load_dataset(&path, EvalType::SecEval).unwrap();
    let ids: Vec<&str> = questions.iter().map(|q| q.question.as_str()).collect();
    assert_eq!(ids, ["q1", "q2", "q3"]);
    assert_eq!(questions[1].choices, "A: x\nB: y\nC: z");
    assert_eq!(questions[1].solution, "BC");
}

#[test]
fn loader_limit_truncates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cybermetric.json");
    let data = json!({"questions": [
        {"question": "q1", "answers": {"A": "a", "B": "b"}, "solution": "A"},
        {"question": "q2", "answers": {"A": "a", "B": "b"}, "solution": "B"}
    ]});
    std::fs::write(&path, data.to_string()).unwrap();

    let loader = get_dataset_loader(path.clone(), EvalType::CyberMetric);
    assert_eq!(loader.load(Some(1)).unwrap().len(), 1);
    assert_eq!(loader.load(None).unwrap().len(), 2);
}

#[test]
fn cti_bench_tsv_loads_answer_column() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cti-mcq.tsv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "URL\tQuestion\tOption A\tOption B\tOption C\tOption D\tPrompt\tGT").unwrap();
    writeln!(file, "u\tWhat is APT29?\tA group\tA tool\tA CVE\tA port\tp\tA").unwrap();

    let questions = load_dataset(&path, EvalType::CtiBench).unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].solution, "A");
    assert!(questions[0].choices.starts_with("A: A group\nB: A tool"));
}

#[test]
fn malformed_json_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = load_dataset(&path, EvalType::SecEval).unwrap_err();
    assert!(err.to_string().contains("invalid SecEval file"));
}
