//! Structural constraints a deliverable must satisfy.

use serde::{Deserialize, Serialize};

/// Guardrail parameters shared by the critic and the reviser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GuardrailPolicy {
    /// Exact number of posts in a finished deliverable.
    pub post_count: usize,
    /// Maximum post length in characters.
    pub max_chars: usize,
    /// Canonical sign-up link used for CTA detection and repair.
    pub join_link: String,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self {
            post_count: 3,
            max_chars: 280,
            join_link: "https://trieboldinstitute.org/join".to_string(),
        }
    }
}

impl GuardrailPolicy {
    /// Lower-cased join link without its scheme, e.g. `example.org/join`.
    pub fn link_fragment(&self) -> String {
        let link = self.join_link.trim().to_lowercase();
        link.strip_prefix("https://")
            .or_else(|| link.strip_prefix("http://"))
            .unwrap_or(&link)
            .trim_end_matches('/')
            .to_string()
    }

    /// Canned post appended when a deliverable has too few posts.
    pub fn fallback_post(&self) -> String {
        format!("Join our mailing list for updates: {}", self.join_link)
    }

    /// CTA suffix for posts that already carry a link.
    pub fn short_suffix(&self) -> &'static str {
        " — Join our mailing list."
    }

    /// CTA suffix carrying the join link.
    pub fn link_suffix(&self) -> String {
        format!(" — Join our mailing list: {}", self.join_link)
    }
}
