//! Deterministic, non-generative repair of a post set (the reviser role).
//!
//! Repair never calls a model. It runs three passes over the critic's
//! normalized posts: trim to the length limit, add a CTA suffix where one is
//! missing, then trim again so the limit holds after the append.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::critic::{char_len, has_call_to_action};
use crate::core::policy::GuardrailPolicy;

/// Marker appended to truncated text.
pub const ELLIPSIS: char = '…';

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());

/// Shorten `text` to at most `limit` characters, preferring a whitespace boundary.
///
/// Text that already fits is returned unchanged. Otherwise the cut happens at
/// the last whitespace at or before index `limit - 1` (trailing whitespace is
/// dropped), or hard at `limit - 1` when there is none, and [`ELLIPSIS`] is
/// appended. The result never exceeds `limit` characters.
pub fn trim_to_limit(text: &str, limit: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }

    let head: String = match chars[..limit].iter().rposition(|c| c.is_whitespace()) {
        Some(cut) => {
            let kept: String = chars[..cut].iter().collect();
            kept.trim_end().to_string()
        }
        None => chars[..limit - 1].iter().collect(),
    };
    format!("{head}{ELLIPSIS}")
}

/// Repair `posts` and join them into the final deliverable text.
///
/// The critic feedback is informational; repair is driven entirely by the
/// guardrail rules so that it stays idempotent.
pub fn repair(posts: &[String], _feedback: &[String], policy: &GuardrailPolicy) -> String {
    let limit = policy.max_chars;
    posts
        .iter()
        .map(|post| trim_to_limit(post, limit))
        .map(|post| ensure_call_to_action(post, policy))
        .map(|post| trim_to_limit(&post, limit))
        .collect::<Vec<_>>()
        .join("\n")
}

fn ensure_call_to_action(post: String, policy: &GuardrailPolicy) -> String {
    if has_call_to_action(&post, policy) {
        return post;
    }

    let link_suffix;
    let suffix: &str = if URL_RE.is_match(&post) {
        policy.short_suffix()
    } else {
        link_suffix = policy.link_suffix();
        &link_suffix
    };

    let suffix_len = char_len(suffix);
    let body = if char_len(&post) + suffix_len > policy.max_chars {
        trim_to_limit(&post, policy.max_chars.saturating_sub(suffix_len))
    } else {
        post
    };
    format!("{body}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::critic::validate;

    fn policy() -> GuardrailPolicy {
        GuardrailPolicy::default()
    }

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn trim_keeps_short_text() {
        assert_eq!(trim_to_limit("short", 10), "short");
        assert_eq!(trim_to_limit("exactly10!", 10), "exactly10!");
    }

    #[test]
    fn trim_prefers_word_boundary() {
        assert_eq!(trim_to_limit("aaaa bbbbbbbbbb", 10), "aaaa…");
    }

    #[test]
    fn trim_hard_cuts_without_whitespace() {
        let out = trim_to_limit("abcdefghijklmnop", 10);
        assert_eq!(out, "abcdefghi…");
        assert_eq!(char_len(&out), 10);
    }

    #[test]
    fn trim_drops_trailing_whitespace_before_ellipsis() {
        assert_eq!(trim_to_limit("ab   cdefghijkl", 6), "ab…");
    }

    #[test]
    fn trim_never_exceeds_limit() {
        let samples = [
            "",
            "a",
            " ",
            "word word word word",
            "nospacesatallinthisstring",
            "ünïcödé wörds ärë cöüntëd bý chärs",
            "   leading spaces then text",
        ];
        for text in samples {
            for limit in 0..=30 {
                let out = trim_to_limit(text, limit);
                assert!(
                    char_len(&out) <= limit || out == text,
                    "limit {limit} violated for {text:?}: {out:?}"
                );
                if char_len(text) > limit {
                    assert!(char_len(&out) <= limit);
                }
            }
        }
    }

    #[test]
    fn repair_leaves_valid_posts_untouched() {
        let posts = vec![
            "Join our mailing list for fossils!".to_string(),
            "Subscribe for field notes.".to_string(),
            "Details: https://trieboldinstitute.org/join".to_string(),
        ];
        let out = repair(&posts, &[], &policy());
        assert_eq!(out, posts.join("\n"));
    }

    #[test]
    fn repair_adds_link_suffix_to_plain_post() {
        let posts = vec!["Meet our new T. rex cast.".to_string()];
        let out = repair(&posts, &[], &policy());
        assert_eq!(
            out,
            "Meet our new T. rex cast. — Join our mailing list: https://trieboldinstitute.org/join"
        );
    }

    #[test]
    fn repair_uses_short_suffix_when_post_has_url() {
        let posts = vec!["Watch https://example.com/video".to_string()];
        let out = repair(&posts, &[], &policy());
        assert_eq!(out, "Watch https://example.com/video — Join our mailing list.");
        assert_eq!(out.matches("http").count(), 1);
    }

    #[test]
    fn repair_makes_room_for_suffix_in_long_post() {
        let long = "word ".repeat(60).trim_end().to_string();
        assert!(char_len(&long) > 280);
        let out = repair(std::slice::from_ref(&long), &[], &policy());
        assert!(char_len(&out) <= 280);
        assert!(has_call_to_action(&out, &policy()));
        assert!(out.ends_with(&policy().link_suffix()));
        assert!(out.contains('…'));
    }

    #[test]
    fn repair_fixes_300_char_post_without_cta_or_url() {
        let long = "a".repeat(300);
        let raw = format!("{long}\nSubscribe today.\nSign up here.");
        let verdict = validate(&raw, &policy());
        assert!(!verdict.ok);

        let out = repair(&verdict.posts, &verdict.feedback, &policy());
        let posts = lines(&out);
        assert_eq!(posts.len(), 3);
        assert!(posts.iter().all(|p| char_len(p) <= 280));
        assert!(posts.iter().all(|p| has_call_to_action(p, &policy())));
        assert!(validate(&out, &policy()).ok);
    }

    #[test]
    fn repair_re_adds_cta_lost_to_truncation() {
        let post = format!("{} sign up", "b".repeat(290));
        let out = repair(&[post], &[], &policy());
        assert!(char_len(&out) <= 280);
        assert!(has_call_to_action(&out, &policy()));
    }

    #[test]
    fn repair_is_idempotent() {
        let inputs = vec![
            vec!["x".repeat(400), "plain".to_string(), "see http://a.b/c".to_string()],
            vec![
                "Join our mailing list".to_string(),
                "word ".repeat(70),
                "é".repeat(279),
            ],
        ];
        for posts in inputs {
            let once = repair(&posts, &[], &policy());
            let twice = repair(&lines(&once), &[], &policy());
            assert_eq!(once, twice);
        }
    }
}
