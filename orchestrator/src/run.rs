//! Orchestration for running one goal end to end.
//!
//! Running a goal: checks out `task/<id>-<slug>` (creating it from the base
//! branch if needed), runs the pipeline, and commits the deliverable and
//! transcript on that branch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::events::EventSink;
use crate::io::artifacts::ArtifactSink;
use crate::io::completion::CompletionClient;
use crate::io::git::{CommitOutcome, VersionControlRepository};
use crate::pipeline::PipelineRunner;

/// Goal used when the CLI is invoked without a subcommand.
pub const DEFAULT_GOAL: &str = "Draft a 3-post intro for Triebold Institute (≤280 chars each) with a CTA to join the mailing list.";

/// Outcome of running one goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub branch: String,
    pub deliverable_path: PathBuf,
    pub transcript_path: PathBuf,
    pub commit: CommitOutcome,
}

/// Checkout the task branch for `goal`, run the pipeline, commit the artifacts.
///
/// Repository failures are reported to the pipeline's event sink before they
/// are returned; pipeline failures are reported by the pipeline itself.
pub fn run_goal<R, C, A, E>(
    goal: &str,
    repo: &R,
    pipeline: &PipelineRunner<'_, C, A, E>,
) -> Result<RunOutcome>
where
    R: VersionControlRepository,
    C: CompletionClient,
    A: ArtifactSink,
    E: EventSink,
{
    debug!(goal, "running goal");
    let branch = repo
        .checkout_task_branch(goal)
        .context("checkout task branch")
        .inspect_err(|err| pipeline.events().on_error(err))?;

    let outcome = pipeline.run(goal)?;

    let artifacts = [
        outcome.deliverable_path.clone(),
        outcome.transcript_path.clone(),
    ];
    let commit = repo
        .commit_artifacts(goal, &artifacts)
        .with_context(|| format!("commit artifacts on {branch}"))
        .inspect_err(|err| pipeline.events().on_error(err))?;
    info!(branch = %branch, ?commit, "goal complete");

    Ok(RunOutcome {
        branch,
        deliverable_path: outcome.deliverable_path,
        transcript_path: outcome.transcript_path,
        commit,
    })
}
