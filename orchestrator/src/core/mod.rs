//! Deterministic, pure logic shared by the orchestrator.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod critic;
pub mod policy;
pub mod reviser;
pub mod sanitize;
pub mod split;
pub mod task;
pub mod types;
