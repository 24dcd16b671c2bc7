//! Chat-completion client abstraction.
//!
//! The [`CompletionClient`] trait decouples the pipeline from the HTTP
//! backend. Tests use scripted clients that return predetermined responses
//! without touching the network.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::core::sanitize::sanitize;
use crate::core::types::{CompletionRequest, CompletionResult};
use crate::error::RequestError;
use crate::io::config::{OrchestratorConfig, RetrySettings};

/// Keep at most this many characters of an error response body.
const ERROR_BODY_LIMIT_CHARS: usize = 600;

/// Abstraction over completion backends.
pub trait CompletionClient {
    /// Run one completion, retrying transient failures.
    ///
    /// The returned text is already sanitized.
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<CompletionResult, RequestError>;
}

/// Number of attempts and the linear backoff unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub tries: u32,
    pub backoff: Duration,
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            tries: settings.tries,
            backoff: Duration::try_from_secs_f64(settings.backoff_secs).unwrap_or(Duration::ZERO),
        }
    }
}

/// Run `op` up to `policy.tries` times.
///
/// After failed attempt `n`, when another attempt remains, `sleep` is called
/// with `backoff * n`. The last failure is wrapped in
/// [`RequestError::Exhausted`].
pub fn retry_with_backoff<T>(
    policy: &RetryPolicy,
    mut sleep: impl FnMut(Duration),
    mut op: impl FnMut(u32) -> Result<T, RequestError>,
) -> Result<T, RequestError> {
    let tries = policy.tries.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if attempt < tries => {
                let delay = policy.backoff * attempt;
                warn!(attempt, tries, delay_ms = delay.as_millis() as u64, err = %err, "completion attempt failed, retrying");
                sleep(delay);
                attempt += 1;
            }
            Err(err) => {
                warn!(attempt, tries, err = %err, "completion attempts exhausted");
                return Err(RequestError::Exhausted {
                    tries,
                    last: Box::new(err),
                });
            }
        }
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl HttpCompletionClient {
    pub fn new(api_base: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            retry,
        })
    }

    pub fn from_config(cfg: &OrchestratorConfig) -> Result<Self> {
        Self::new(
            &cfg.api_base,
            cfg.request_timeout(),
            RetryPolicy::from(&cfg.retry),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn attempt(&self, request: &CompletionRequest<'_>) -> Result<CompletionResult, RequestError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|err| RequestError::Transport(error_chain(&err)))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|err| RequestError::Transport(error_chain(&err)))?;
        if !status.is_success() {
            return Err(RequestError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT_CHARS).collect(),
            });
        }
        let raw: Value = serde_json::from_str(&body)
            .map_err(|err| RequestError::Malformed(format!("response is not JSON: {err}")))?;
        let content = extract_content(&raw)?;
        Ok(CompletionResult {
            text: sanitize(&content),
            raw,
        })
    }
}

impl CompletionClient for HttpCompletionClient {
    #[instrument(skip_all, fields(model = request.model))]
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<CompletionResult, RequestError> {
        retry_with_backoff(&self.retry, thread::sleep, |attempt| {
            debug!(attempt, endpoint = %self.endpoint, "posting completion request");
            self.attempt(request)
        })
    }
}

/// `choices[0].message.content` of a chat-completion response.
pub fn extract_content(raw: &Value) -> Result<String, RequestError> {
    raw.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            RequestError::Malformed("missing choices[0].message.content".to_string())
        })
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
