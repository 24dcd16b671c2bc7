//! Planner → Worker → Critic → (Reviser) → Persist for a single goal.
//!
//! Only the planner and worker call the model. The critic and reviser are
//! deterministic, so a run makes exactly two completion requests and never
//! loops back to the worker.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::critic::validate;
use crate::core::policy::GuardrailPolicy;
use crate::core::reviser::repair;
use crate::core::sanitize::sanitize;
use crate::core::types::{CompletionRequest, CompletionResult, Message, Step, Transcript};
use crate::events::EventSink;
use crate::io::artifacts::ArtifactSink;
use crate::io::completion::CompletionClient;
use crate::io::config::OrchestratorConfig;
use crate::prompt::PromptEngine;

/// File stem of the deliverable artifact.
pub const DELIVERABLE_STEM: &str = "social-intro";

/// File stem of the transcript artifact.
pub const TRANSCRIPT_STEM: &str = "planner-worker-critic";

/// Model parameters shared by both completion requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub api_base: String,
    pub planner_model: String,
    pub worker_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelSettings {
    pub fn from_config(cfg: &OrchestratorConfig) -> Self {
        Self {
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            planner_model: cfg.planner_model().to_string(),
            worker_model: cfg.worker_model().to_string(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        }
    }
}

/// Result of a completed pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub deliverable_path: PathBuf,
    pub transcript_path: PathBuf,
    /// Final sanitized deliverable text.
    pub deliverable: String,
    /// True when the critic rejected the draft and the reviser ran.
    pub repaired: bool,
}

/// Runs the role pipeline for one goal.
pub struct PipelineRunner<'a, C, A, E> {
    client: &'a C,
    artifacts: &'a A,
    events: &'a E,
    prompts: PromptEngine,
    models: ModelSettings,
    policy: GuardrailPolicy,
}

impl<'a, C, A, E> PipelineRunner<'a, C, A, E>
where
    C: CompletionClient,
    A: ArtifactSink,
    E: EventSink,
{
    pub fn new(
        client: &'a C,
        artifacts: &'a A,
        events: &'a E,
        models: ModelSettings,
        policy: GuardrailPolicy,
    ) -> Self {
        Self {
            client,
            artifacts,
            events,
            prompts: PromptEngine::new(),
            models,
            policy,
        }
    }

    pub fn events(&self) -> &E {
        self.events
    }

    /// Run the pipeline for `goal` and persist its artifacts.
    ///
    /// A completion failure is reported to the event sink and aborts the run
    /// before anything is written.
    #[instrument(skip_all)]
    pub fn run(&self, goal: &str) -> Result<PipelineOutcome> {
        match self.execute(goal) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.events.on_error(&err);
                Err(err)
            }
        }
    }

    fn execute(&self, goal: &str) -> Result<PipelineOutcome> {
        let mut transcript = Transcript::new(
            goal,
            &self.models.planner_model,
            &self.models.worker_model,
            &self.models.api_base,
        );

        let planner_messages = self.prompts.planner_messages(goal)?;
        let plan = self
            .complete(&self.models.planner_model, &planner_messages)
            .context("planner request")?;
        let plan_text = plan.text.clone();
        self.record(
            &mut transcript,
            Step::Planner {
                messages: planner_messages,
                response: plan.text,
                raw: plan.raw,
            },
        );

        let worker_messages = self
            .prompts
            .worker_messages(goal, &plan_text, &self.policy)?;
        let draft = self
            .complete(&self.models.worker_model, &worker_messages)
            .context("worker request")?;
        let draft_text = draft.text.clone();
        self.record(
            &mut transcript,
            Step::Worker {
                messages: worker_messages,
                response: draft.text,
                raw: draft.raw,
            },
        );

        let verdict = validate(&draft_text, &self.policy);
        self.record(
            &mut transcript,
            Step::Critic {
                ok: verdict.ok,
                feedback: verdict.feedback.clone(),
                parsed_posts: verdict.posts.clone(),
            },
        );

        let (final_text, repaired) = if verdict.ok {
            (draft_text, false)
        } else {
            let revised = repair(&verdict.posts, &verdict.feedback, &self.policy);
            self.record(
                &mut transcript,
                Step::Reviser {
                    feedback: verdict.feedback,
                    response: revised.clone(),
                },
            );
            (revised, true)
        };

        let deliverable = sanitize(&final_text);
        let deliverable_path = self
            .artifacts
            .write_text(DELIVERABLE_STEM, &deliverable)
            .context("write deliverable")?;
        let transcript_path = self
            .artifacts
            .write_transcript(TRANSCRIPT_STEM, &transcript)
            .context("write transcript")?;
        info!(
            deliverable = %deliverable_path.display(),
            transcript = %transcript_path.display(),
            repaired,
            "pipeline finished"
        );

        Ok(PipelineOutcome {
            deliverable_path,
            transcript_path,
            deliverable,
            repaired,
        })
    }

    fn complete(&self, model: &str, messages: &[Message]) -> Result<CompletionResult> {
        let request = CompletionRequest {
            model,
            messages,
            temperature: self.models.temperature,
            max_tokens: self.models.max_tokens,
        };
        Ok(self.client.complete(&request)?)
    }

    fn record(&self, transcript: &mut Transcript, step: Step) {
        self.events.on_step(&step);
        transcript.push(step);
    }
}
