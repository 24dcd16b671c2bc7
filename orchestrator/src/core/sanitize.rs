//! Removal of reasoning blocks and role-tagged meta lines from model output.

use std::sync::LazyLock;

use regex::Regex;

/// `<think> ... </think>` blocks, case-insensitive, non-greedy across newlines.
static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<\s*think\s*>.*?<\s*/\s*think\s*>").unwrap());

/// Whole lines starting with a bracketed pipeline role label.
static META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*\[(?:PLANNER|WORKER|CRITIC|REVISER|LOG)\].*$").unwrap()
});

/// Strip reasoning blocks, then meta lines, then surrounding whitespace.
pub fn sanitize(text: &str) -> String {
    let without_think = THINK_RE.replace_all(text, "");
    let without_meta = META_RE.replace_all(&without_think, "");
    without_meta.trim().to_string()
}
