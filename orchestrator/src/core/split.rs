//! Parsing a free-form deliverable into post candidates.
//!
//! Two strategies, tried in order:
//!
//! 1. One post per non-empty line. Used whenever it yields at least three
//!    candidates.
//! 2. Numbered list: split on `<digits>` followed by one of `)`, `.`, `-` and
//!    optional whitespace, at the start of the text or after a newline.

use std::sync::LazyLock;

use regex::Regex;

/// Line-based split must produce at least this many candidates to win.
const MIN_LINE_CANDIDATES: usize = 3;

/// Every line boundary, including lone `\r` and the Unicode separators.
static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r\n|[\n\r\x0b\x0c\x1c-\x1e\x{85}\x{2028}\x{2029}]").unwrap()
});

static NUMBERING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:^\s*\d+[).\-]\s*|\n\s*\d+[).\-]\s*)").unwrap());

/// Split `text` into trimmed, non-empty post candidates.
pub fn split_posts(text: &str) -> Vec<String> {
    let lines: Vec<String> = LINE_BREAK_RE
        .split(text)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if lines.len() >= MIN_LINE_CANDIDATES {
        return lines;
    }

    NUMBERING_RE
        .split(text)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty() && !is_all_digits(fragment))
        .map(str::to_string)
        .collect()
}

fn is_all_digits(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_nothing() {
        assert!(split_posts("").is_empty());
        assert!(split_posts("  \n\n ").is_empty());
    }

    #[test]
    fn line_split_wins_with_three_or_more_lines() {
        let text = "1. first\n\n2. second\n3. third\n4. fourth";
        // Numbering is preserved because the line strategy already succeeded.
        assert_eq!(
            split_posts(text),
            vec!["1. first", "2. second", "3. third", "4. fourth"]
        );
    }

    #[test]
    fn line_split_honors_carriage_returns_and_unicode_separators() {
        assert_eq!(
            split_posts("a sign up\rb sign up\rc sign up"),
            vec!["a sign up", "b sign up", "c sign up"]
        );
        assert_eq!(
            split_posts("one\r\ntwo\u{2028}three\u{85}four"),
            vec!["one", "two", "three", "four"]
        );
    }

    #[test]
    fn numbered_fallback_splits_inline_list() {
        let text = "1) Alpha post\n2) Beta post";
        assert_eq!(split_posts(text), vec!["Alpha post", "Beta post"]);
    }

    #[test]
    fn numbered_fallback_accepts_all_separators() {
        let text = "1. one 2) not a split\n2- two";
        assert_eq!(split_posts(text), vec!["one 2) not a split", "two"]);
    }

    #[test]
    fn fallback_drops_bare_digit_fragments() {
        assert_eq!(split_posts("1) only post"), vec!["only post"]);
        assert_eq!(split_posts("42"), Vec::<String>::new());
    }

    #[test]
    fn unnumbered_short_text_stays_one_multiline_candidate() {
        // Two lines and no numbering: the fallback keeps the inner newline.
        assert_eq!(split_posts("\nx\n y"), vec!["x\n y"]);
    }

    #[test]
    fn single_unnumbered_line_is_one_candidate() {
        assert_eq!(split_posts("  just one post  "), vec!["just one post"]);
    }
}
