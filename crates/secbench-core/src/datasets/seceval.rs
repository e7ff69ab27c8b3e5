use super::{apply_limit, read_source, DatasetLoader};
use crate::error::{Result, SecbenchError};
use crate::types::Question;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct SecEvalRecord {
    question: String,
    #[serde(default)]
    choices: Vec<String>,
    answer: String,
}

/// SecEval: a JSON array of `{question, choices: [..], answer}`.
pub struct SecEvalDataset {
    path: PathBuf,
}

impl SecEvalDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetLoader for SecEvalDataset {
    fn load(&self, limit: Option<usize>) -> Result<Vec<Question>> {
        let raw = read_source(&self.path)?;
        let records: Vec<SecEvalRecord> = serde_json::from_str(&raw).map_err(|e| {
            SecbenchError::Dataset(format!("invalid SecEval file {}: {e}", self.path.display()))
        })?;
        let questions = records
            .into_iter()
            .map(|r| Question::new(r.question, r.choices.join("\n"), r.answer))
            .collect();
        Ok(apply_limit(questions, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn joins_choices_with_newlines() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"question": "Which port does SSH use?", "choices": ["A: 21", "B: 22"], "answer": "B"}},
               {{"question": "Pick all ciphers", "choices": [], "answer": "AC"}}]"#
        )
        .unwrap();

        let questions = SecEvalDataset::new(file.path()).load(None).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].choices, "A: 21\nB: 22");
        assert_eq!(questions[0].solution, "B");
        assert_eq!(questions[1].choices, "");

        let limited = SecEvalDataset::new(file.path()).load(Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
    }
}
