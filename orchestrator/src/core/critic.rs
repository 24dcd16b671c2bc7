//! Deterministic guardrail validation (the critic role).

use std::sync::LazyLock;

use regex::Regex;

use crate::core::policy::GuardrailPolicy;
use crate::core::split::split_posts;
use crate::core::types::ValidationVerdict;

/// "join" followed later by "mailing list" / "maillist".
static JOIN_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bjoin\b.*\bmail(?:ing)?\s*list\b").unwrap());

static SIGNUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:sign\s*up|subscribe)\b").unwrap());

/// True if `post` carries a recognizable call-to-action.
pub fn has_call_to_action(post: &str, policy: &GuardrailPolicy) -> bool {
    let fragment = policy.link_fragment();
    if !fragment.is_empty() && post.to_lowercase().contains(&fragment) {
        return true;
    }
    JOIN_LIST_RE.is_match(post) || SIGNUP_RE.is_match(post)
}

/// Character length as used by every guardrail rule.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Truncate or pad `posts` to exactly `policy.post_count` entries.
pub fn normalize_count(mut posts: Vec<String>, policy: &GuardrailPolicy) -> Vec<String> {
    posts.retain(|post| !post.is_empty());
    posts.truncate(policy.post_count);
    while posts.len() < policy.post_count {
        posts.push(policy.fallback_post());
    }
    posts
}

/// Split, normalize, and check a raw deliverable.
pub fn validate(raw: &str, policy: &GuardrailPolicy) -> ValidationVerdict {
    let posts = normalize_count(split_posts(raw), policy);

    let count_ok = posts.len() == policy.post_count;
    let length_ok = posts.iter().all(|p| char_len(p) <= policy.max_chars);
    let cta_ok = posts.iter().all(|p| has_call_to_action(p, policy));

    let mut feedback = Vec::new();
    if !count_ok {
        feedback.push(format!(
            "Expected {} posts; got {}.",
            policy.post_count,
            posts.len()
        ));
    }
    if !length_ok {
        feedback.push(format!(
            "One or more posts exceed {} chars.",
            policy.max_chars
        ));
    }
    if !cta_ok {
        feedback.push(
            "Each post must include a clear CTA (Join/Sign up/Subscribe or /join link).".to_string(),
        );
    }

    ValidationVerdict {
        ok: count_ok && length_ok && cta_ok,
        feedback,
        posts,
    }
}
