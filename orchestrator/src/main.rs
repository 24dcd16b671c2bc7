//! Guardrailed social-post generator.
//!
//! Runs a goal through planner and worker completions, enforces the post
//! guardrails deterministically, and commits the result on a per-task git
//! branch. `queue` drains `tasks.jsonl`, running each task id at most once.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use orchestrator::core::policy::GuardrailPolicy;
use orchestrator::events::TracingEvents;
use orchestrator::io::artifacts::FsArtifactSink;
use orchestrator::io::completion::HttpCompletionClient;
use orchestrator::io::config::{DEFAULT_CONFIG_FILE, OrchestratorConfig, load_config, write_config};
use orchestrator::io::git::GitRepository;
use orchestrator::io::ledger::FileLedger;
use orchestrator::io::tasks::JsonlTaskSource;
use orchestrator::logging;
use orchestrator::pipeline::{ModelSettings, PipelineRunner};
use orchestrator::queue::QueueProcessor;
use orchestrator::run::{DEFAULT_GOAL, run_goal};

#[derive(Parser)]
#[command(
    name = "orchestrator",
    version,
    about = "Planner/worker social-post generator with guardrails and branch-per-task commits"
)]
struct Cli {
    /// Config file; relative paths resolve against --root.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Working root holding artifacts, the ledger, the task list, and the git repository.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Without a subcommand the built-in goal is run.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default config file if it is missing.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Run a single goal and commit it on its task branch.
    Run {
        #[arg(long)]
        goal: String,
    },
    /// Process every unprocessed task in the task list.
    Queue,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let root = fs::canonicalize(&cli.root)
        .with_context(|| format!("resolve root {}", cli.root.display()))?;
    let config_path = root.join(&cli.config);
    let load = || load_config(&config_path);
    match cli.command {
        Some(Command::Init { force }) => cmd_init(&config_path, force),
        None => cmd_run(&root, &load()?, DEFAULT_GOAL),
        Some(Command::Run { goal }) => cmd_run(&root, &load()?, &goal),
        Some(Command::Queue) => cmd_queue(&root, &load()?),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    write_config(path, &OrchestratorConfig::default())
        .with_context(|| format!("write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Adapters shared by every command that runs the pipeline.
struct Runtime {
    client: HttpCompletionClient,
    artifacts: FsArtifactSink,
    events: TracingEvents,
    repo: GitRepository,
    models: ModelSettings,
    policy: GuardrailPolicy,
}

impl Runtime {
    fn new(root: &Path, cfg: &OrchestratorConfig) -> Result<Self> {
        let tracked = vec![
            root.join(&cfg.paths.tasks_file),
            root.join(&cfg.paths.state_file),
        ];
        Ok(Self {
            client: HttpCompletionClient::from_config(cfg)?,
            artifacts: FsArtifactSink::new(
                root.join(&cfg.paths.out_dir),
                root.join(&cfg.paths.log_dir),
            ),
            events: TracingEvents,
            repo: GitRepository::new(root, &cfg.git, tracked),
            models: ModelSettings::from_config(cfg),
            policy: cfg.guardrail.clone(),
        })
    }

    fn pipeline(&self) -> PipelineRunner<'_, HttpCompletionClient, FsArtifactSink, TracingEvents> {
        PipelineRunner::new(
            &self.client,
            &self.artifacts,
            &self.events,
            self.models.clone(),
            self.policy.clone(),
        )
    }
}

fn cmd_run(root: &Path, cfg: &OrchestratorConfig, goal: &str) -> Result<()> {
    let runtime = Runtime::new(root, cfg)?;
    let outcome = run_goal(goal, &runtime.repo, &runtime.pipeline())?;
    println!("{}", outcome.deliverable_path.display());
    println!("{}", outcome.transcript_path.display());
    println!("Committed on branch: {}", outcome.branch);
    Ok(())
}

fn cmd_queue(root: &Path, cfg: &OrchestratorConfig) -> Result<()> {
    let runtime = Runtime::new(root, cfg)?;
    let pipeline = runtime.pipeline();
    let ledger = FileLedger::new(root.join(&cfg.paths.state_file));
    let source = JsonlTaskSource::new(root.join(&cfg.paths.tasks_file));

    let summary =
        QueueProcessor::new(&runtime.repo, &ledger, &pipeline, cfg.queue.clone()).drain(&source)?;
    if summary.missing_source {
        println!("No tasks file at {}", source.path().display());
        return Ok(());
    }
    println!(
        "Queue done: {} ran, {} already processed, {} skipped",
        summary.ran.len(),
        summary.already_processed,
        summary.skipped_records
    );
    Ok(())
}
