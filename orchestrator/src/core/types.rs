//! Shared deterministic types for the orchestrator core.
//!
//! These types define stable contracts between the pipeline stages and the
//! persisted artifacts. Serialized field names are part of the transcript and
//! ledger formats and must stay stable.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One entry of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Parameters for a single completion call.
///
/// Serializes directly into the `/chat/completions` request body.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Sanitized completion text plus the untouched response body.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub text: String,
    /// Raw response record, kept for transcript logging only.
    pub raw: Value,
}

/// Critic verdict over a normalized post set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub ok: bool,
    /// One message per violated rule class, in fixed order (count, length, CTA).
    pub feedback: Vec<String>,
    /// Normalized posts the verdict was computed over.
    pub posts: Vec<String>,
}

/// One recorded pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Step {
    Planner {
        messages: Vec<Message>,
        response: String,
        raw: Value,
    },
    Worker {
        messages: Vec<Message>,
        response: String,
        raw: Value,
    },
    Critic {
        ok: bool,
        feedback: Vec<String>,
        parsed_posts: Vec<String>,
    },
    Reviser {
        feedback: Vec<String>,
        response: String,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Planner { .. } => "planner",
            Step::Worker { .. } => "worker",
            Step::Critic { .. } => "critic",
            Step::Reviser { .. } => "reviser",
        }
    }
}

/// Append-only record of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub goal: String,
    pub planner_model: String,
    pub worker_model: String,
    pub api_base: String,
    pub steps: Vec<Step>,
}

impl Transcript {
    pub fn new(
        goal: impl Into<String>,
        planner_model: impl Into<String>,
        worker_model: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            goal: goal.into(),
            planner_model: planner_model.into(),
            worker_model: worker_model.into(),
            api_base: api_base.into(),
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }
}

/// A queued goal and its stable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub goal: String,
}

/// Durable record of processed task ids (`state.json`).
///
/// Ids are kept in a sorted set so the serialized ledger is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    #[serde(default)]
    pub processed: BTreeSet<String>,
}

impl QueueState {
    pub fn contains(&self, id: &str) -> bool {
        self.processed.contains(id)
    }

    /// Record `id` as processed. Returns false if it was already present.
    pub fn mark_processed(&mut self, id: impl Into<String>) -> bool {
        self.processed.insert(id.into())
    }
}
