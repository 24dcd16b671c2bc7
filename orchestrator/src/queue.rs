//! Idempotent draining of the task list for `orchestrator queue`.
//!
//! Each task id runs at most once across invocations: ids are checked
//! against the ledger before running and recorded after a successful commit.

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::types::QueueState;
use crate::events::{EventSink, QueueEvent};
use crate::io::artifacts::ArtifactSink;
use crate::io::completion::CompletionClient;
use crate::io::config::QueueSettings;
use crate::io::git::VersionControlRepository;
use crate::io::ledger::Ledger;
use crate::io::tasks::{TaskSource, parse_task_record};
use crate::pipeline::PipelineRunner;
use crate::run::run_goal;

/// What one drain did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSummary {
    /// Ids run to completion, in file order.
    pub ran: Vec<String>,
    /// Lines that could not be parsed into a task.
    pub skipped_records: usize,
    /// Tasks skipped because the ledger already had their id.
    pub already_processed: usize,
    /// The task source did not exist.
    pub missing_source: bool,
}

/// Drains a [`TaskSource`] through the pipeline, one task branch per task.
pub struct QueueProcessor<'a, R, L, C, A, E> {
    repo: &'a R,
    ledger: &'a L,
    pipeline: &'a PipelineRunner<'a, C, A, E>,
    settings: QueueSettings,
}

impl<'a, R, L, C, A, E> QueueProcessor<'a, R, L, C, A, E>
where
    R: VersionControlRepository,
    L: Ledger,
    C: CompletionClient,
    A: ArtifactSink,
    E: EventSink,
{
    pub fn new(
        repo: &'a R,
        ledger: &'a L,
        pipeline: &'a PipelineRunner<'a, C, A, E>,
        settings: QueueSettings,
    ) -> Self {
        Self {
            repo,
            ledger,
            pipeline,
            settings,
        }
    }

    /// Run every task in `source` whose id is not yet in the ledger.
    ///
    /// The ledger is written once at the end (and after every task when
    /// `checkpoint_each_task` is set). A fatal error stops the drain; ids
    /// finished before it are only durable if they were checkpointed.
    #[instrument(skip_all)]
    pub fn drain<S: TaskSource>(&self, source: &S) -> Result<QueueSummary> {
        let events = self.pipeline.events();
        let mut state = self
            .ledger
            .load()
            .context("load ledger")
            .inspect_err(|err| events.on_error(err))?;
        let lines = source
            .read_lines()
            .inspect_err(|err| events.on_error(err))?;
        let Some(lines) = lines else {
            events.on_queue(&QueueEvent::NoTaskFile {
                location: source.describe(),
            });
            return Ok(QueueSummary {
                missing_source: true,
                ..QueueSummary::default()
            });
        };
        debug!(lines = lines.len(), processed = state.processed.len(), "draining queue");

        let mut summary = QueueSummary::default();
        for (index, raw) in lines.iter().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            let line = index + 1;
            let task = match parse_task_record(line, raw) {
                Ok(task) => task,
                Err(err) => {
                    events.on_queue(&QueueEvent::SkippedRecord {
                        line,
                        reason: err.to_string(),
                    });
                    summary.skipped_records += 1;
                    continue;
                }
            };
            if state.contains(&task.id) {
                events.on_queue(&QueueEvent::AlreadyProcessed { id: task.id });
                summary.already_processed += 1;
                continue;
            }

            events.on_queue(&QueueEvent::Started {
                id: task.id.clone(),
                goal: task.goal.clone(),
            });
            let outcome = run_goal(&task.goal, self.repo, self.pipeline)
                .with_context(|| format!("task {}", task.id))?;
            events.on_queue(&QueueEvent::Committed {
                id: task.id.clone(),
                branch: outcome.branch,
                outcome: outcome.commit,
            });

            state.mark_processed(task.id.clone());
            summary.ran.push(task.id);
            if self.settings.checkpoint_each_task {
                self.persist(&state)?;
            }
        }

        self.persist(&state)?;
        events.on_queue(&QueueEvent::Done {
            ran: summary.ran.len(),
            skipped: summary.skipped_records + summary.already_processed,
        });
        info!(ran = summary.ran.len(), "queue done");
        Ok(summary)
    }

    fn persist(&self, state: &QueueState) -> Result<()> {
        self.ledger
            .save(state)
            .context("save ledger")
            .inspect_err(|err| self.pipeline.events().on_error(err))
    }
}
