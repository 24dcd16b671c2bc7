//! Orchestrator configuration stored in `orchestrator.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::policy::GuardrailPolicy;

/// Default config file name, resolved against the working root.
pub const DEFAULT_CONFIG_FILE: &str = "orchestrator.toml";

/// Orchestrator configuration (TOML).
///
/// Built once at startup and handed by value to every component. Missing
/// fields fall back to values that work against a local OpenAI-compatible
/// server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Base URL of the chat-completion API (without `/chat/completions`).
    pub api_base: String,

    /// Model used for any role without an explicit override.
    pub model_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub planner_model_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_model_id: Option<String>,

    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,

    pub temperature: f32,
    pub max_tokens: u32,

    pub retry: RetrySettings,
    pub guardrail: GuardrailPolicy,
    pub paths: PathSettings,
    pub git: GitSettings,
    pub queue: QueueSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts per completion request, including the first.
    pub tries: u32,
    /// Linear backoff unit: attempt `n` failing sleeps `n * backoff_secs`.
    pub backoff_secs: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            tries: 3,
            backoff_secs: 2.0,
        }
    }
}

/// Output and bookkeeping locations, relative to the working root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathSettings {
    pub out_dir: PathBuf,
    pub log_dir: PathBuf,
    pub state_file: PathBuf,
    pub tasks_file: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("out"),
            log_dir: PathBuf::from("logs"),
            state_file: PathBuf::from("state.json"),
            tasks_file: PathBuf::from("tasks.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitSettings {
    pub base_branch: String,
    /// Wall-clock limit for any single git command.
    pub timeout_secs: u64,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            base_branch: "main".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueueSettings {
    /// Persist the ledger after every completed task, not only at the end.
    pub checkpoint_each_task: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:1234/v1".to_string(),
            model_id: "local-model".to_string(),
            planner_model_id: None,
            worker_model_id: None,
            timeout_secs: 90,
            temperature: 0.2,
            max_tokens: 512,
            retry: RetrySettings::default(),
            guardrail: GuardrailPolicy::default(),
            paths: PathSettings::default(),
            git: GitSettings::default(),
            queue: QueueSettings::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn planner_model(&self) -> &str {
        self.planner_model_id.as_deref().unwrap_or(&self.model_id)
    }

    pub fn worker_model(&self) -> &str {
        self.worker_model_id.as_deref().unwrap_or(&self.model_id)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(anyhow!("api_base must be non-empty"));
        }
        if self.planner_model().trim().is_empty() || self.worker_model().trim().is_empty() {
            return Err(anyhow!("model ids must be non-empty"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be > 0"));
        }
        if self.retry.tries == 0 {
            return Err(anyhow!("retry.tries must be > 0"));
        }
        if !self.retry.backoff_secs.is_finite() || self.retry.backoff_secs < 0.0 {
            return Err(anyhow!("retry.backoff_secs must be a non-negative number"));
        }
        if self.guardrail.post_count == 0 {
            return Err(anyhow!("guardrail.post_count must be > 0"));
        }
        let link = self.guardrail.join_link.trim();
        if !(link.starts_with("https://") || link.starts_with("http://")) {
            return Err(anyhow!("guardrail.join_link must start with http:// or https://"));
        }
        let suffix_len = self.guardrail.link_suffix().chars().count();
        if self.guardrail.max_chars <= suffix_len {
            return Err(anyhow!(
                "guardrail.max_chars must exceed the CTA suffix length ({suffix_len})"
            ));
        }
        if self.git.base_branch.trim().is_empty() {
            return Err(anyhow!("git.base_branch must be non-empty"));
        }
        if self.git.timeout_secs == 0 {
            return Err(anyhow!("git.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `OrchestratorConfig::default()`.
pub fn load_config(path: &Path) -> Result<OrchestratorConfig> {
    if !path.exists() {
        let cfg = OrchestratorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: OrchestratorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &OrchestratorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, buf.as_bytes())
}
