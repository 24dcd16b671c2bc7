//! Git adapter: branch-per-task isolation and artifact commits.
//!
//! Each task gets its own `task/<id>-<slug>` branch cut from the base branch.
//! The orchestrator shells out to `git` through a small, explicit wrapper so
//! every command is bounded by a timeout and failures carry git's stderr.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::task::branch_name;
use crate::error::RepositoryError;
use crate::io::config::GitSettings;
use crate::io::process::{BoundedOutput, run_bounded};

/// Keep at most this much of any git command's stdout/stderr.
const GIT_OUTPUT_LIMIT_BYTES: usize = 100_000;

/// Message of the commit that brings the base branch into existence.
pub const BOOTSTRAP_COMMIT_MESSAGE: &str = "chore: bootstrap repo";

/// Result of an artifact commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Git reported nothing to commit; treated as success.
    NothingToCommit,
}

/// Branch-per-task version control operations used by the orchestrator.
pub trait VersionControlRepository {
    /// Initialize the repository and base branch pointer if missing.
    fn ensure_repository(&self) -> Result<()>;

    /// Create or switch to the branch for `goal`, returning its name.
    fn checkout_task_branch(&self, goal: &str) -> Result<String>;

    /// Stage `artifacts` (plus ledger/task-list files) and commit them.
    fn commit_artifacts(&self, goal: &str, artifacts: &[PathBuf]) -> Result<CommitOutcome>;
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    timeout: Duration,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            workdir: workdir.into(),
            timeout,
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// True if the working root has its own `.git`.
    pub fn has_repository(&self) -> bool {
        self.workdir.join(".git").exists()
    }

    pub fn init(&self) -> Result<()> {
        self.run_checked(&["init"])?;
        Ok(())
    }

    /// True once HEAD points at a commit (false on an unborn branch).
    pub fn has_commits(&self) -> Result<bool> {
        let out = self.run(&["rev-parse", "--verify", "--quiet", "HEAD"])?;
        Ok(out.status.success())
    }

    /// Point HEAD at `refs/heads/<branch>` without touching the worktree.
    pub fn point_head_at(&self, branch: &str) -> Result<()> {
        let target = format!("refs/heads/{branch}");
        self.run_checked(&["symbolic-ref", "HEAD", &target])?;
        Ok(())
    }

    /// Current branch name, or `None` on detached HEAD.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let out = self.run(&["symbolic-ref", "--short", "-q", "HEAD"])?;
        if !out.status.success() {
            return Ok(None);
        }
        let name = out.stdout_lossy().trim().to_string();
        Ok((!name.is_empty()).then_some(name))
    }

    /// Check whether a local branch exists.
    pub fn branch_exists(&self, branch: &str) -> Result<bool> {
        let reference = format!("refs/heads/{branch}");
        let out = self.run(&["show-ref", "--verify", "--quiet", &reference])?;
        Ok(out.status.success())
    }

    /// Create and checkout `branch`, starting at `start_point` or HEAD.
    #[instrument(skip_all)]
    pub fn checkout_new_branch(&self, branch: &str, start_point: Option<&str>) -> Result<()> {
        debug!(branch, ?start_point, "creating and checking out new branch");
        match start_point {
            Some(start) => self.run_checked(&["checkout", "-b", branch, start])?,
            None => self.run_checked(&["checkout", "-b", branch])?,
        };
        Ok(())
    }

    /// Checkout an existing branch.
    #[instrument(skip_all)]
    pub fn checkout_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "checking out branch");
        self.run_checked(&["checkout", branch])?;
        Ok(())
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// Stage a single path.
    pub fn add_path(&self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy();
        self.run_checked(&["add", "--", &path])?;
        Ok(())
    }

    /// Commit whatever is staged.
    ///
    /// A refusal because there is nothing to commit is reported as
    /// [`CommitOutcome::NothingToCommit`] rather than an error.
    #[instrument(skip_all)]
    pub fn commit(&self, message: &str, allow_empty: bool) -> Result<CommitOutcome> {
        let mut args = vec!["commit", "-m", message];
        if allow_empty {
            args.push("--allow-empty");
        }
        let out = self.run(&args)?;
        if out.status.success() {
            debug!("commit created");
            return Ok(CommitOutcome::Committed);
        }
        let combined = format!("{}{}", out.stdout_lossy(), out.stderr_lossy()).to_lowercase();
        if combined.contains("nothing to commit") || combined.contains("nothing added to commit") {
            debug!("nothing to commit");
            return Ok(CommitOutcome::NothingToCommit);
        }
        Err(command_error(&args, &out).into())
    }

    fn run_checked(&self, args: &[&str]) -> Result<BoundedOutput> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(command_error(args, &output).into());
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<BoundedOutput> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        let output = run_bounded(cmd, self.timeout, GIT_OUTPUT_LIMIT_BYTES).map_err(|source| {
            RepositoryError::Spawn {
                command: args.join(" "),
                source,
            }
        })?;
        if output.timed_out {
            return Err(RepositoryError::TimedOut {
                command: args.join(" "),
                timeout: self.timeout,
            }
            .into());
        }
        Ok(output)
    }
}

fn command_error(args: &[&str], output: &BoundedOutput) -> RepositoryError {
    let stderr = output.stderr_lossy();
    let detail = if stderr.trim().is_empty() {
        output.stdout_lossy()
    } else {
        stderr
    };
    RepositoryError::Command {
        command: args.join(" "),
        stderr: detail.trim().to_string(),
    }
}

/// [`VersionControlRepository`] backed by the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitRepository {
    git: Git,
    base_branch: String,
    /// Ledger and task-list files staged with every commit when present.
    tracked_files: Vec<PathBuf>,
}

impl GitRepository {
    pub fn new(root: impl Into<PathBuf>, settings: &GitSettings, tracked_files: Vec<PathBuf>) -> Self {
        Self {
            git: Git::new(root, Duration::from_secs(settings.timeout_secs)),
            base_branch: settings.base_branch.clone(),
            tracked_files,
        }
    }

    pub fn git(&self) -> &Git {
        &self.git
    }

    /// Make sure the base branch has a commit so task branches can start from it.
    fn bootstrap_base_branch(&self) -> Result<()> {
        info!(base = %self.base_branch, "bootstrapping base branch");
        if self.git.has_commits()? {
            self.git.checkout_new_branch(&self.base_branch, None)?;
        }
        // On an unborn repository HEAD already names the base branch.
        self.git.add_all()?;
        self.git.commit(BOOTSTRAP_COMMIT_MESSAGE, true)?;
        Ok(())
    }
}

impl VersionControlRepository for GitRepository {
    #[instrument(skip_all)]
    fn ensure_repository(&self) -> Result<()> {
        if !self.git.has_repository() {
            info!(root = %self.git.workdir().display(), "initializing git repository");
            self.git.init()?;
        }
        if !self.git.has_commits()? {
            debug!(base = %self.base_branch, "unborn HEAD, pointing at base branch");
            self.git.point_head_at(&self.base_branch)?;
        }
        Ok(())
    }

    #[instrument(skip_all)]
    fn checkout_task_branch(&self, goal: &str) -> Result<String> {
        self.ensure_repository()?;
        let branch = branch_name(goal);
        if self.git.branch_exists(&branch)? {
            debug!(branch = %branch, "switching to existing task branch");
            self.git.checkout_branch(&branch)?;
            return Ok(branch);
        }
        if !self.git.branch_exists(&self.base_branch)? {
            self.bootstrap_base_branch()?;
        }
        info!(branch = %branch, base = %self.base_branch, "creating task branch");
        self.git
            .checkout_new_branch(&branch, Some(&self.base_branch))?;
        Ok(branch)
    }

    #[instrument(skip_all, fields(artifacts = artifacts.len()))]
    fn commit_artifacts(&self, goal: &str, artifacts: &[PathBuf]) -> Result<CommitOutcome> {
        for path in artifacts {
            self.git.add_path(path)?;
        }
        for path in &self.tracked_files {
            if !path.exists() {
                continue;
            }
            if let Err(err) = self.git.add_path(path) {
                warn!(path = %path.display(), err = %err, "could not stage tracked file");
            }
        }
        let outcome = self.git.commit(&format!("content: {goal}"), false)?;
        info!(?outcome, "artifacts committed");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;
    use std::fs;

    fn repo_for(test_repo: &TestRepo, tracked: Vec<PathBuf>) -> GitRepository {
        GitRepository::new(test_repo.path(), &GitSettings::default(), tracked)
    }

    #[test]
    fn ensure_repository_initializes_plain_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let repo = GitRepository::new(temp.path(), &GitSettings::default(), Vec::new());
        repo.ensure_repository().expect("ensure");
        assert!(temp.path().join(".git").exists());
        assert_eq!(
            repo.git().current_branch().expect("branch").as_deref(),
            Some("main")
        );
    }

    #[test]
    fn checkout_bootstraps_base_and_creates_task_branch() {
        let test_repo = TestRepo::new().expect("repo");
        let repo = repo_for(&test_repo, Vec::new());
        let goal = "Announce the fossil open house";

        let branch = repo.checkout_task_branch(goal).expect("checkout");
        assert_eq!(branch, branch_name(goal));
        assert_eq!(
            repo.git().current_branch().expect("branch"),
            Some(branch.clone())
        );
        assert!(repo.git().branch_exists("main").expect("main exists"));
        let log = test_repo.git(&["log", "-1", "--pretty=%s", "main"]).expect("log");
        assert_eq!(log, BOOTSTRAP_COMMIT_MESSAGE);
    }

    #[test]
    fn checkout_switches_to_existing_branch() {
        let test_repo = TestRepo::new().expect("repo");
        let repo = repo_for(&test_repo, Vec::new());

        let first = repo.checkout_task_branch("goal one").expect("first");
        let second = repo.checkout_task_branch("goal two").expect("second");
        assert_ne!(first, second);

        let again = repo.checkout_task_branch("goal one").expect("again");
        assert_eq!(again, first);
        assert_eq!(repo.git().current_branch().expect("branch"), Some(first));
    }

    #[test]
    fn bootstrap_branches_from_existing_history() {
        let test_repo = TestRepo::new().expect("repo");
        test_repo
            .git(&["symbolic-ref", "HEAD", "refs/heads/trunk"])
            .expect("rename unborn branch");
        fs::write(test_repo.path().join("README.md"), "hello\n").expect("write");
        test_repo.git(&["add", "-A"]).expect("add");
        test_repo.git(&["commit", "-m", "initial"]).expect("commit");

        let repo = repo_for(&test_repo, Vec::new());
        repo.checkout_task_branch("goal").expect("checkout");

        let base_parent = test_repo
            .git(&["log", "-1", "--pretty=%s", "main~1"])
            .expect("log");
        assert_eq!(base_parent, "initial");
    }

    #[test]
    fn commit_artifacts_commits_then_reports_nothing_to_commit() {
        let test_repo = TestRepo::new().expect("repo");
        let repo = repo_for(&test_repo, Vec::new());
        let goal = "Write three posts";
        repo.checkout_task_branch(goal).expect("checkout");

        let artifact = test_repo.path().join("out").join("posts.txt");
        fs::create_dir_all(artifact.parent().expect("parent")).expect("mkdir");
        fs::write(&artifact, "post\n").expect("write artifact");

        let first = repo
            .commit_artifacts(goal, std::slice::from_ref(&artifact))
            .expect("commit");
        assert_eq!(first, CommitOutcome::Committed);
        let subject = test_repo.git(&["log", "-1", "--pretty=%s"]).expect("log");
        assert_eq!(subject, format!("content: {goal}"));

        let second = repo
            .commit_artifacts(goal, std::slice::from_ref(&artifact))
            .expect("recommit");
        assert_eq!(second, CommitOutcome::NothingToCommit);
    }

    #[test]
    fn commit_artifacts_stages_tracked_files_when_present() {
        let test_repo = TestRepo::new().expect("repo");
        let state = test_repo.path().join("state.json");
        let tasks = test_repo.path().join("tasks.jsonl");
        let repo = repo_for(&test_repo, vec![state.clone(), tasks]);
        repo.checkout_task_branch("goal").expect("checkout");

        let artifact = test_repo.path().join("deliverable.txt");
        fs::write(&artifact, "text\n").expect("write artifact");
        fs::write(&state, "{\"processed\": []}\n").expect("write state");

        repo.commit_artifacts("goal", &[artifact]).expect("commit");
        let files = test_repo
            .git(&["show", "--name-only", "--pretty=format:", "HEAD"])
            .expect("show");
        let files: Vec<&str> = files.lines().filter(|l| !l.is_empty()).collect();
        assert!(files.contains(&"deliverable.txt"));
        assert!(files.contains(&"state.json"));
        assert!(!files.contains(&"tasks.jsonl"));
    }

    #[test]
    fn commit_artifacts_fails_on_missing_artifact() {
        let test_repo = TestRepo::new().expect("repo");
        let repo = repo_for(&test_repo, Vec::new());
        repo.checkout_task_branch("goal").expect("checkout");

        let err = repo
            .commit_artifacts("goal", &[test_repo.path().join("missing.txt")])
            .expect_err("missing artifact must fail");
        assert!(matches!(
            err.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::Command { .. })
        ));
    }

    #[test]
    fn checkout_failure_is_fatal() {
        let test_repo = TestRepo::new().expect("repo");
        let repo = repo_for(&test_repo, Vec::new());
        repo.ensure_repository().expect("ensure");

        let err = repo
            .git()
            .checkout_branch("does-not-exist")
            .expect_err("checkout must fail");
        assert!(err.to_string().contains("git checkout does-not-exist failed"));
    }
}
