//! Scripted and in-memory stand-ins for the orchestrator's I/O seams.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use serde_json::json;

use crate::core::sanitize::sanitize;
use crate::core::task::branch_name;
use crate::core::types::{CompletionRequest, CompletionResult, Message, QueueState, Step, Transcript};
use crate::error::{RepositoryError, RequestError};
use crate::events::{EventSink, QueueEvent};
use crate::io::artifacts::ArtifactSink;
use crate::io::completion::CompletionClient;
use crate::io::git::{CommitOutcome, VersionControlRepository};
use crate::io::ledger::Ledger;
use crate::io::tasks::TaskSource;

/// A request as seen by [`ScriptedCompletionClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

/// Completion client that replays queued replies in order.
///
/// Running out of replies is a transport error, so a test that makes more
/// calls than scripted fails loudly.
#[derive(Debug, Default)]
pub struct ScriptedCompletionClient {
    replies: RefCell<VecDeque<Result<String, RequestError>>>,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl ScriptedCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.borrow_mut().push_back(Ok(text.into()));
        self
    }

    /// Queue a planner reply followed by a worker reply.
    pub fn run(self, plan: impl Into<String>, draft: impl Into<String>) -> Self {
        self.reply(plan).reply(draft)
    }

    pub fn fail(self, err: RequestError) -> Self {
        self.replies.borrow_mut().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl CompletionClient for ScriptedCompletionClient {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<CompletionResult, RequestError> {
        self.requests.borrow_mut().push(RecordedRequest {
            model: request.model.to_string(),
            messages: request.messages.to_vec(),
        });
        let reply = self
            .replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(RequestError::Transport("script exhausted".to_string())))?;
        Ok(CompletionResult {
            text: sanitize(&reply),
            raw: json!({"choices": [{"message": {"role": "assistant", "content": reply}}]}),
        })
    }
}

/// One commit recorded by [`FakeRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCommit {
    pub branch: String,
    pub message: String,
    pub artifacts: Vec<PathBuf>,
}

/// In-memory branch-per-task repository.
#[derive(Debug, Default)]
pub struct FakeRepository {
    branches: RefCell<Vec<String>>,
    current: RefCell<Option<String>>,
    commits: RefCell<Vec<FakeCommit>>,
    fail_checkout_for: Option<String>,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `checkout_task_branch(goal)` fail for this goal.
    pub fn failing_checkout_for(mut self, goal: impl Into<String>) -> Self {
        self.fail_checkout_for = Some(goal.into());
        self
    }

    pub fn commits(&self) -> Vec<FakeCommit> {
        self.commits.borrow().clone()
    }

    pub fn branches(&self) -> Vec<String> {
        self.branches.borrow().clone()
    }

    pub fn current_branch(&self) -> Option<String> {
        self.current.borrow().clone()
    }
}

impl VersionControlRepository for FakeRepository {
    fn ensure_repository(&self) -> Result<()> {
        Ok(())
    }

    fn checkout_task_branch(&self, goal: &str) -> Result<String> {
        let branch = branch_name(goal);
        if self.fail_checkout_for.as_deref() == Some(goal) {
            return Err(RepositoryError::Command {
                command: format!("checkout -b {branch} main"),
                stderr: "fatal: scripted failure".to_string(),
            }
            .into());
        }
        let mut branches = self.branches.borrow_mut();
        if !branches.contains(&branch) {
            branches.push(branch.clone());
        }
        *self.current.borrow_mut() = Some(branch.clone());
        Ok(branch)
    }

    fn commit_artifacts(&self, goal: &str, artifacts: &[PathBuf]) -> Result<CommitOutcome> {
        let Some(branch) = self.current_branch() else {
            bail!("commit without a checked out branch");
        };
        self.commits.borrow_mut().push(FakeCommit {
            branch,
            message: format!("content: {goal}"),
            artifacts: artifacts.to_vec(),
        });
        Ok(CommitOutcome::Committed)
    }
}

/// Artifact sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryArtifactSink {
    texts: RefCell<Vec<(PathBuf, String)>>,
    transcripts: RefCell<Vec<(PathBuf, Transcript)>>,
}

impl MemoryArtifactSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<(PathBuf, String)> {
        self.texts.borrow().clone()
    }

    pub fn transcripts(&self) -> Vec<(PathBuf, Transcript)> {
        self.transcripts.borrow().clone()
    }

    fn next_path(&self, stem: &str, ext: &str) -> PathBuf {
        let n = self.texts.borrow().len() + self.transcripts.borrow().len() + 1;
        PathBuf::from(format!("mem/{n:03}-{stem}.{ext}"))
    }
}

impl ArtifactSink for MemoryArtifactSink {
    fn write_text(&self, stem: &str, text: &str) -> Result<PathBuf> {
        let path = self.next_path(stem, "txt");
        self.texts.borrow_mut().push((path.clone(), text.to_string()));
        Ok(path)
    }

    fn write_transcript(&self, stem: &str, transcript: &Transcript) -> Result<PathBuf> {
        let path = self.next_path(stem, "json");
        self.transcripts
            .borrow_mut()
            .push((path.clone(), transcript.clone()));
        Ok(path)
    }
}

/// Ledger held in memory; counts saves.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RefCell<QueueState>,
    saves: Cell<usize>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_processed<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ledger = Self::default();
        for id in ids {
            ledger.state.borrow_mut().mark_processed(id);
        }
        ledger
    }

    pub fn state(&self) -> QueueState {
        self.state.borrow().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.get()
    }
}

impl Ledger for MemoryLedger {
    fn load(&self) -> Result<QueueState> {
        Ok(self.state.borrow().clone())
    }

    fn save(&self, state: &QueueState) -> Result<()> {
        *self.state.borrow_mut() = state.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

/// Task source backed by literal lines; `None` behaves like a missing file.
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskSource {
    lines: Option<Vec<String>>,
}

impl MemoryTaskSource {
    pub fn missing() -> Self {
        Self { lines: None }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: Some(lines.into_iter().map(Into::into).collect()),
        }
    }
}

impl TaskSource for MemoryTaskSource {
    fn read_lines(&self) -> Result<Option<Vec<String>>> {
        Ok(self.lines.clone())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Event sink that records everything it is told.
#[derive(Debug, Default)]
pub struct RecordingEvents {
    steps: RefCell<Vec<Step>>,
    errors: RefCell<Vec<String>>,
    queue: RefCell<Vec<QueueEvent>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.borrow().iter().map(Step::name).collect()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.steps.borrow().clone()
    }

    /// Reported errors, rendered with their full context chain.
    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }

    pub fn queue_events(&self) -> Vec<QueueEvent> {
        self.queue.borrow().clone()
    }
}

impl EventSink for RecordingEvents {
    fn on_step(&self, step: &Step) {
        self.steps.borrow_mut().push(step.clone());
    }

    fn on_error(&self, err: &anyhow::Error) {
        self.errors.borrow_mut().push(format!("{err:#}"));
    }

    fn on_queue(&self, event: &QueueEvent) {
        self.queue.borrow_mut().push(event.clone());
    }
}

/// Temporary git repository with a committer identity configured.
pub struct TestRepo {
    temp: tempfile::TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create temp repo dir")?;
        let repo = Self { temp };
        repo.git(&["init", "-q"])?;
        repo.git(&["config", "user.name", "Orchestrator Tests"])?;
        repo.git(&["config", "user.email", "tests@example.invalid"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Run git in the repository and return trimmed stdout.
    pub fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Number of commits reachable from any ref.
    pub fn commit_count(&self) -> Result<usize> {
        let count = self.git(&["rev-list", "--all", "--count"])?;
        count
            .parse()
            .with_context(|| format!("parse commit count {count:?}"))
    }
}

/// Worker reply that passes every guardrail with the default policy.
pub fn valid_draft() -> String {
    [
        "Fossils, field notes, and first looks: the Triebold Institute is opening its doors. Join our mailing list!",
        "Curious how a mosasaur skeleton gets mounted? Sign up for behind-the-scenes updates.",
        "Subscribe for workshop dates and volunteer calls: https://trieboldinstitute.org/join",
    ]
    .join("\n")
}
