//! Durable record of processed task ids (`state.json`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::types::QueueState;

/// Load/save seam for the queue's processed-id set.
pub trait Ledger {
    /// Current state; empty when nothing has been recorded yet.
    fn load(&self) -> Result<QueueState>;

    fn save(&self, state: &QueueState) -> Result<()>;
}

/// JSON ledger: `{"processed": [...]}` with ids sorted.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Ledger for FileLedger {
    /// A missing file is an empty ledger. An unreadable or corrupt file is
    /// logged and also treated as empty, so its tasks run again.
    fn load(&self) -> Result<QueueState> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no ledger yet");
            return Ok(QueueState::default());
        }
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(path = %self.path.display(), err = %err, "unreadable ledger, starting empty");
                return Ok(QueueState::default());
            }
        };
        match serde_json::from_str::<QueueState>(&contents) {
            Ok(state) => {
                debug!(processed = state.processed.len(), "ledger loaded");
                Ok(state)
            }
            Err(err) => {
                warn!(path = %self.path.display(), err = %err, "corrupt ledger, starting empty");
                Ok(QueueState::default())
            }
        }
    }

    fn save(&self, state: &QueueState) -> Result<()> {
        debug!(path = %self.path.display(), processed = state.processed.len(), "writing ledger");
        let mut buf = serde_json::to_string_pretty(state).context("serialize ledger")?;
        buf.push('\n');
        super::write_atomic(&self.path, buf.as_bytes())
    }
}
