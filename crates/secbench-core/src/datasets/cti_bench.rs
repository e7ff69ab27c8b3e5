use super::{apply_limit, read_source, DatasetLoader};
use crate::error::{Result, SecbenchError};
use crate::types::Question;
use csv::ReaderBuilder;
use std::path::PathBuf;
use tracing::debug;

const MIN_COLUMNS: usize = 8;

/// CTI-Bench MCQ: tab-separated, one header row.
///
/// Columns: `url, question, option_a, option_b, option_c, option_d, prompt, answer`.
/// Quoted fields may contain tabs and newlines. Records with fewer than eight
/// columns are skipped.
pub struct CtiBenchDataset {
    path: PathBuf,
}

impl CtiBenchDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetLoader for CtiBenchDataset {
    fn load(&self, limit: Option<usize>) -> Result<Vec<Question>> {
        let raw = read_source(&self.path)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(raw.as_bytes());

        let mut questions = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                SecbenchError::Dataset(format!(
                    "invalid CTI-Bench file {}: {e}",
                    self.path.display()
                ))
            })?;
            if record.len() < MIN_COLUMNS {
                debug!(record = idx + 1, columns = record.len(), "skipping short TSV record");
                continue;
            }
            let choices = format!(
                "A: {}\nB: {}\nC: {}\nD: {}",
                &record[2], &record[3], &record[4], &record[5]
            );
            questions.push(Question::new(&record[1], choices, &record[7]));
        }
        Ok(apply_limit(questions, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "URL\tQuestion\tA\tB\tC\tD\tPrompt\tGT";

    fn load(body: &str) -> Vec<Question> {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{HEADER}\n{body}").unwrap();
        CtiBenchDataset::new(file.path()).load(None).unwrap()
    }

    #[test]
    fn parses_rows_and_skips_header_and_short_rows() {
        let questions = load(concat!(
            "https://attack.mitre.org\tWhich tactic is T1059?\tExecution\tPersistence\tDiscovery\tImpact\tprompt\tA\n",
            "too\tshort\n",
            "u\t\"Quoted \"\"q\"\"\"\ta\tb\tc\td\tp\tD\textra\n",
        ));
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "Which tactic is T1059?");
        assert_eq!(
            questions[0].choices,
            "A: Execution\nB: Persistence\nC: Discovery\nD: Impact"
        );
        assert_eq!(questions[0].solution, "A");
        assert_eq!(questions[1].question, "Quoted \"q\"");
        assert_eq!(questions[1].solution, "D");
    }

    #[test]
    fn quoted_field_keeps_embedded_tab() {
        let questions = load("u\t\"Split\there\"\ta\tb\tc\td\tp\tC\n");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "Split\there");
        assert_eq!(questions[0].choices, "A: a\nB: b\nC: c\nD: d");
        assert_eq!(questions[0].solution, "C");
    }

    #[test]
    fn quoted_field_may_span_lines() {
        let questions = load(concat!(
            "u\t\"line1\nline2\"\ta\tb\tc\td\tp\tB\n",
            "u2\tnext\ta\tb\tc\td\tp\tA\n",
        ));
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "line1\nline2");
        assert_eq!(questions[0].solution, "B");
        assert_eq!(questions[1].question, "next");
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let questions = load("u\tq\ta\tb\tc\td\tp\tD\r\n");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].solution, "D");
    }
}
