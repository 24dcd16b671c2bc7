//! End-to-end queue runs against a real git repository and real files.
//!
//! Only the completion endpoint is scripted.

use std::fs;
use std::path::{Path, PathBuf};

use orchestrator::core::task::{branch_name, task_id};
use orchestrator::core::types::QueueState;
use orchestrator::io::artifacts::FsArtifactSink;
use orchestrator::io::config::OrchestratorConfig;
use orchestrator::io::git::{BOOTSTRAP_COMMIT_MESSAGE, CommitOutcome, GitRepository};
use orchestrator::io::ledger::{FileLedger, Ledger};
use orchestrator::io::tasks::JsonlTaskSource;
use orchestrator::pipeline::{ModelSettings, PipelineRunner};
use orchestrator::queue::{QueueProcessor, QueueSummary};
use orchestrator::run::run_goal;
use orchestrator::test_support::{RecordingEvents, ScriptedCompletionClient, TestRepo, valid_draft};

struct Workspace {
    repo: TestRepo,
    cfg: OrchestratorConfig,
}

impl Workspace {
    fn new() -> Self {
        Self {
            repo: TestRepo::new().expect("test repo"),
            cfg: OrchestratorConfig::default(),
        }
    }

    fn root(&self) -> &Path {
        self.repo.path()
    }

    fn tasks_path(&self) -> PathBuf {
        self.root().join(&self.cfg.paths.tasks_file)
    }

    fn state_path(&self) -> PathBuf {
        self.root().join(&self.cfg.paths.state_file)
    }

    fn git_repository(&self) -> GitRepository {
        GitRepository::new(
            self.root(),
            &self.cfg.git,
            vec![self.tasks_path(), self.state_path()],
        )
    }

    fn sink(&self) -> FsArtifactSink {
        FsArtifactSink::new(
            self.root().join(&self.cfg.paths.out_dir),
            self.root().join(&self.cfg.paths.log_dir),
        )
    }

    fn drain(&self, client: &ScriptedCompletionClient) -> QueueSummary {
        let sink = self.sink();
        let events = RecordingEvents::new();
        let pipeline = PipelineRunner::new(
            client,
            &sink,
            &events,
            ModelSettings::from_config(&self.cfg),
            self.cfg.guardrail.clone(),
        );
        let repo = self.git_repository();
        let ledger = FileLedger::new(self.state_path());
        let source = JsonlTaskSource::new(self.tasks_path());
        QueueProcessor::new(&repo, &ledger, &pipeline, self.cfg.queue.clone())
            .drain(&source)
            .expect("drain")
    }

    fn subject(&self, rev: &str) -> String {
        self.repo
            .git(&["log", "-1", "--pretty=%s", rev])
            .expect("git log")
    }
}

fn scripted(runs: usize) -> ScriptedCompletionClient {
    (0..runs).fold(ScriptedCompletionClient::new(), |client, _| {
        client.run("1. Hook\n2. Details\n3. CTA", valid_draft())
    })
}

#[test]
fn queue_commits_each_task_once_and_rerun_is_a_no_op() {
    let ws = Workspace::new();
    fs::write(
        ws.tasks_path(),
        "{\"goal\": \"Announce the open house\"}\n\n{\"id\": \"volunteers\", \"goal\": \"Recruit volunteers\"}\n",
    )
    .expect("write tasks");

    let client = scripted(2);
    let summary = ws.drain(&client);
    assert_eq!(
        summary.ran,
        vec![task_id("Announce the open house"), "volunteers".to_string()]
    );
    assert_eq!(client.remaining(), 0);

    // Bootstrap plus one commit per task.
    assert_eq!(ws.repo.commit_count().expect("count"), 3);
    assert_eq!(ws.subject("main"), BOOTSTRAP_COMMIT_MESSAGE);
    assert_eq!(
        ws.subject(&branch_name("Announce the open house")),
        "content: Announce the open house"
    );
    assert_eq!(
        ws.subject(&branch_name("Recruit volunteers")),
        "content: Recruit volunteers"
    );

    let files = ws
        .repo
        .git(&[
            "show",
            "--name-only",
            "--pretty=format:",
            &branch_name("Recruit volunteers"),
        ])
        .expect("show");
    let files: Vec<&str> = files.lines().filter(|l| !l.is_empty()).collect();
    assert_eq!(files.len(), 2, "{files:?}");
    assert!(files.iter().any(|f| f.starts_with("out/") && f.ends_with("-social-intro.txt")));
    assert!(
        files
            .iter()
            .any(|f| f.starts_with("logs/") && f.ends_with("-planner-worker-critic.json"))
    );

    let state = FileLedger::new(ws.state_path()).load().expect("ledger");
    let mut expected = QueueState::default();
    expected.mark_processed(task_id("Announce the open house"));
    expected.mark_processed("volunteers");
    assert_eq!(state, expected);

    let idle = scripted(0);
    let rerun = ws.drain(&idle);
    assert!(rerun.ran.is_empty());
    assert_eq!(rerun.already_processed, 2);
    assert!(idle.requests().is_empty());
    assert_eq!(ws.repo.commit_count().expect("count"), 3);
}

#[test]
fn appended_task_runs_alone_and_commits_ledger() {
    let ws = Workspace::new();
    fs::write(ws.tasks_path(), "{\"goal\": \"First goal\"}\n").expect("write tasks");
    ws.drain(&scripted(1));
    assert_eq!(ws.repo.commit_count().expect("count"), 2);

    let mut tasks = fs::read_to_string(ws.tasks_path()).expect("read tasks");
    tasks.push_str("{\"goal\": \"Second goal\"}\n");
    fs::write(ws.tasks_path(), tasks).expect("append task");

    let client = scripted(1);
    let summary = ws.drain(&client);
    assert_eq!(summary.ran, vec![task_id("Second goal")]);
    assert_eq!(summary.already_processed, 1);
    assert_eq!(ws.repo.commit_count().expect("count"), 3);

    // The ledger written by the first drain is committed with the second task.
    let committed_state = ws
        .repo
        .git(&[
            "show",
            &format!("{}:state.json", branch_name("Second goal")),
        ])
        .expect("state in commit");
    let committed: QueueState = serde_json::from_str(&committed_state).expect("ledger json");
    assert!(committed.contains(&task_id("First goal")));

    let state = FileLedger::new(ws.state_path()).load().expect("ledger");
    assert!(state.contains(&task_id("First goal")));
    assert!(state.contains(&task_id("Second goal")));
}

#[test]
fn missing_task_list_touches_nothing() {
    let ws = Workspace::new();
    let client = scripted(0);
    let summary = ws.drain(&client);
    assert!(summary.missing_source);
    assert!(!ws.state_path().exists());
    assert!(ws.repo.git(&["rev-parse", "--verify", "--quiet", "HEAD"]).is_err());
}

#[test]
fn run_goal_twice_reuses_branch() {
    let ws = Workspace::new();
    let repo = ws.git_repository();
    let sink = ws.sink();
    let events = RecordingEvents::new();
    let client = scripted(2);
    let pipeline = PipelineRunner::new(
        &client,
        &sink,
        &events,
        ModelSettings::from_config(&ws.cfg),
        ws.cfg.guardrail.clone(),
    );

    let goal = "Share the dig-site livestream";
    let first = run_goal(goal, &repo, &pipeline).expect("first run");
    assert_eq!(first.commit, CommitOutcome::Committed);
    let second = run_goal(goal, &repo, &pipeline).expect("second run");
    assert_eq!(second.branch, first.branch);
    assert_eq!(
        ws.repo
            .git(&["rev-parse", "--abbrev-ref", "HEAD"])
            .expect("head"),
        first.branch
    );
    assert!(events.errors().is_empty());
}
