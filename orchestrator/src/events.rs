//! Progress reporting for pipeline steps and queue bookkeeping.

use tracing::{error, info, warn};

use crate::core::types::Step;
use crate::io::git::CommitOutcome;

/// Queue lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// The task list does not exist; nothing was run.
    NoTaskFile { location: String },
    /// A line could not be turned into a task.
    SkippedRecord { line: usize, reason: String },
    AlreadyProcessed { id: String },
    Started { id: String, goal: String },
    Committed {
        id: String,
        branch: String,
        outcome: CommitOutcome,
    },
    Done { ran: usize, skipped: usize },
}

/// Observer injected into the pipeline and the queue.
pub trait EventSink {
    /// Called after each step is appended to the transcript.
    fn on_step(&self, step: &Step);

    /// Called with a fatal error before it is propagated.
    fn on_error(&self, err: &anyhow::Error);

    fn on_queue(&self, event: &QueueEvent);
}

/// Renders events as structured tracing output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn on_step(&self, step: &Step) {
        match step {
            Step::Planner { response, .. } => info!(step = "planner", %response, "plan received"),
            Step::Worker { response, .. } => info!(step = "worker", %response, "draft received"),
            Step::Critic { ok, feedback, .. } => {
                let verdict = if *ok { "PASS" } else { "FAIL" };
                info!(step = "critic", verdict, feedback = %feedback.join(" | "), "draft checked");
            }
            Step::Reviser { response, .. } => info!(step = "reviser", %response, "draft repaired"),
        }
    }

    fn on_error(&self, err: &anyhow::Error) {
        let chain = format!("{err:#}");
        error!(err = %chain, "run failed");
    }

    fn on_queue(&self, event: &QueueEvent) {
        match event {
            QueueEvent::NoTaskFile { location } => warn!(%location, "no task list, nothing to do"),
            QueueEvent::SkippedRecord { line, reason } => warn!(line, %reason, "skipping task record"),
            QueueEvent::AlreadyProcessed { id } => info!(%id, "skipping already processed task"),
            QueueEvent::Started { id, goal } => info!(%id, %goal, "running task"),
            QueueEvent::Committed {
                id,
                branch,
                outcome,
            } => info!(%id, %branch, ?outcome, "task committed"),
            QueueEvent::Done { ran, skipped } => info!(ran, skipped, "queue drained"),
        }
    }
}
