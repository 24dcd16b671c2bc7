//! Side-effecting adapters: HTTP, git, and the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod artifacts;
pub mod completion;
pub mod config;
pub mod git;
pub mod ledger;
pub mod process;
pub mod tasks;

/// Write `contents` to `path` via a sibling temp file and rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
