//! Checkpoint and result file persistence.
//!
//! Every file is a pretty-printed JSON array of [`ResultRecord`]s. Checkpoints
//! hold the full result list accumulated so far, never a delta.

use crate::error::Result;
use crate::types::ResultRecord;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Replace every character other than alphanumerics, `-` and `_` with `_`.
pub fn sanitize_model_id(model: &str) -> String {
    model
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `benchmark_results_<eval>_<sanitized-model>.json`
pub fn results_file_name(eval_type: &str, model: &str) -> String {
    format!(
        "benchmark_results_{eval_type}_{}.json",
        sanitize_model_id(model)
    )
}

pub fn write_results(path: impl AsRef<Path>, records: &[ResultRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn load_results(path: impl AsRef<Path>) -> Result<Vec<ResultRecord>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    Ok(serde_json::from_reader(reader)?)
}

/// Writes `checkpoint_<N>.json` snapshots under a per-model directory.
#[derive(Debug, Clone)]
pub struct CheckpointWriter {
    dir: PathBuf,
    save_interval: Option<u64>,
}

impl CheckpointWriter {
    /// Resolves `<root>/<sanitized-model>` and creates it. Safe to call when
    /// the directory already exists.
    pub fn new(root: impl AsRef<Path>, model: &str, save_interval: Option<u64>) -> Result<Self> {
        let dir = root.as_ref().join(sanitize_model_id(model));
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            save_interval: save_interval.filter(|n| *n > 0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_enabled(&self) -> bool {
        self.save_interval.is_some()
    }

    pub fn checkpoint_path(&self, processed: u64) -> PathBuf {
        self.dir.join(format!("checkpoint_{processed}.json"))
    }

    pub fn is_due(&self, processed: u64) -> bool {
        matches!(self.save_interval, Some(n) if processed > 0 && processed % n == 0)
    }

    /// Persist `records` when `processed` lands on the save interval.
    pub fn maybe_checkpoint(
        &self,
        processed: u64,
        records: &[ResultRecord],
    ) -> Result<Option<PathBuf>> {
        if !self.is_due(processed) {
            return Ok(None);
        }
        let path = self.checkpoint_path(processed);
        write_results(&path, records)?;
        Ok(Some(path))
    }
}
