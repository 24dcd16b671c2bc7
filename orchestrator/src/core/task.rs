//! Stable task identity and branch naming.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

/// Hex characters kept from the goal fingerprint.
pub const TASK_ID_LEN: usize = 12;

/// Maximum slug length in branch names.
pub const SLUG_MAX_LEN: usize = 40;

/// Prefix for per-task branches.
pub const TASK_BRANCH_PREFIX: &str = "task/";

static NON_ALNUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Deterministic id for a goal: the first [`TASK_ID_LEN`] hex chars of its SHA-256.
pub fn task_id(goal: &str) -> String {
    let digest = Sha256::digest(goal.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(TASK_ID_LEN);
    id
}

/// Lower-case `s`, collapse non-alphanumeric runs into `-`, cap at `max_len`.
///
/// Returns `"task"` when nothing usable remains.
pub fn slugify(s: &str, max_len: usize) -> String {
    let lowered = s.trim().to_ascii_lowercase();
    let dashed = NON_ALNUM_RE.replace_all(&lowered, "-");
    let capped: String = dashed.trim_matches('-').chars().take(max_len).collect();
    let slug = capped.trim_matches('-');
    if slug.is_empty() {
        "task".to_string()
    } else {
        slug.to_string()
    }
}

/// Branch name for `goal`: `task/<id>-<slug>`.
pub fn branch_name(goal: &str) -> String {
    format!(
        "{TASK_BRANCH_PREFIX}{}-{}",
        task_id(goal),
        slugify(goal, SLUG_MAX_LEN)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_is_stable_and_short_hex() {
        let goal = "Draft a 3-post intro";
        let id = task_id(goal);
        assert_eq!(id, task_id(goal));
        assert_eq!(id.len(), TASK_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn task_id_differs_for_different_goals() {
        assert_ne!(task_id("goal a"), task_id("goal b"));
        assert_ne!(task_id(""), task_id(" "));
    }

    #[test]
    fn task_id_is_sha256_prefix() {
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(task_id("abc"), "ba7816bf8f01");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(
            slugify("  Draft a 3-post intro (≤280 chars)!  ", SLUG_MAX_LEN),
            "draft-a-3-post-intro-280-chars"
        );
    }

    #[test]
    fn slugify_caps_length_without_trailing_dash() {
        let slug = slugify("abcd efgh ijkl", 5);
        assert_eq!(slug, "abcd");
        assert!(slugify(&"word ".repeat(20), SLUG_MAX_LEN).len() <= SLUG_MAX_LEN);
    }

    #[test]
    fn slugify_falls_back_to_task() {
        assert_eq!(slugify("!!! ???", SLUG_MAX_LEN), "task");
        assert_eq!(slugify("", SLUG_MAX_LEN), "task");
    }

    #[test]
    fn branch_name_combines_id_and_slug() {
        let goal = "Launch the Newsletter";
        assert_eq!(
            branch_name(goal),
            format!("task/{}-launch-the-newsletter", task_id(goal))
        );
    }
}
