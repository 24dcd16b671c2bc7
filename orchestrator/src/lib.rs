//! Guardrailed social-post orchestration.
//!
//! A goal goes through a planner completion, a worker completion, a
//! deterministic critic and, when needed, a deterministic reviser. The result
//! is written to disk and committed on a per-task git branch. The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (sanitizing, splitting,
//!   validation, repair, task identity). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (HTTP completions, git, artifact
//!   files, the ledger, the task list, configuration). Each sits behind a
//!   trait so tests can substitute in-memory fakes.
//!
//! Orchestration modules ([`pipeline`], [`run`], [`queue`]) coordinate core
//! logic with I/O to implement CLI commands.

pub mod core;
pub mod error;
pub mod events;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod queue;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
