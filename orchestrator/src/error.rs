//! Typed failures that callers may want to match on.
//!
//! Orchestration code passes these around inside `anyhow::Error`; use
//! `err.downcast_ref::<RequestError>()` (etc.) to classify a failure.

use std::time::Duration;

use thiserror::Error;

/// Failure talking to the completion endpoint.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Endpoint answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// Connection, TLS, or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// Success status but the body lacks `choices[0].message.content`.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// Every attempt failed; wraps the last attempt's error.
    #[error("completion failed after {tries} tries")]
    Exhausted {
        tries: u32,
        #[source]
        last: Box<RequestError>,
    },
}

/// Failure of a version-control command.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },
    #[error("spawn git {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("git {command} timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },
}

/// A task-list line the queue cannot run. Reported and skipped, never fatal.
#[derive(Debug, Error)]
pub enum TaskRecordError {
    #[error("line {line}: invalid task record: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("line {line}: task record has no goal")]
    MissingGoal { line: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_error_chains_last_failure() {
        let err = anyhow::Error::new(RequestError::Exhausted {
            tries: 3,
            last: Box::new(RequestError::Status {
                status: 503,
                body: "busy".to_string(),
            }),
        });
        assert_eq!(
            format!("{err:#}"),
            "completion failed after 3 tries: HTTP 503: busy"
        );
        assert!(err.downcast_ref::<RequestError>().is_some());
    }
}
