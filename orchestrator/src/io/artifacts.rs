//! Timestamped deliverable and transcript files (`out/`, `logs/`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::core::types::Transcript;

/// Timestamp prefix of artifact file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Persistence seam for pipeline outputs. Returns the written locations.
pub trait ArtifactSink {
    fn write_text(&self, stem: &str, text: &str) -> Result<PathBuf>;

    fn write_transcript(&self, stem: &str, transcript: &Transcript) -> Result<PathBuf>;
}

/// Writes `out/<ts>-<stem>.txt` and `logs/<ts>-<stem>.json`.
#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    out_dir: PathBuf,
    log_dir: PathBuf,
    clock: fn() -> DateTime<Local>,
}

impl FsArtifactSink {
    pub fn new(out_dir: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            log_dir: log_dir.into(),
            clock: Local::now,
        }
    }

    /// Replace the wall clock used for file-name timestamps.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    fn stamped_path(&self, dir: &Path, stem: &str, ext: &str) -> PathBuf {
        let ts = (self.clock)().format(TIMESTAMP_FORMAT);
        dir.join(format!("{ts}-{stem}.{ext}"))
    }
}

impl ArtifactSink for FsArtifactSink {
    fn write_text(&self, stem: &str, text: &str) -> Result<PathBuf> {
        let path = self.stamped_path(&self.out_dir, stem, "txt");
        write_file(&path, text.as_bytes())?;
        info!(path = %path.display(), "deliverable written");
        Ok(path)
    }

    fn write_transcript(&self, stem: &str, transcript: &Transcript) -> Result<PathBuf> {
        let path = self.stamped_path(&self.log_dir, stem, "json");
        write_json(&path, transcript)?;
        info!(path = %path.display(), "transcript written");
        Ok(path)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize {}", path.display()))?;
    buf.push('\n');
    write_file(path, buf.as_bytes())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
