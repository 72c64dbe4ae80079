//! Located text spans.

use serde::{Deserialize, Serialize};

use super::NormalizedRect;

/// Which search tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    /// The whole target was found verbatim (case-insensitive)
    Exact,
    /// A leading prefix of a long target was found verbatim
    Partial,
    /// A token-set similarity match
    Fuzzy,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMethod::Exact => write!(f, "exact"),
            MatchMethod::Partial => write!(f, "partial"),
            MatchMethod::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// A target string located on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// The target text as supplied by the caller
    pub content: String,

    /// Zero-based page index
    pub page_index: usize,

    /// Normalized, top-left-origin rectangle covering the match
    pub rect: NormalizedRect,

    /// Match quality in `[0, 1]`
    pub match_quality: f64,

    /// Tier that produced the match
    pub match_method: MatchMethod,
}

impl TextSpan {
    /// Create a new text span.
    pub fn new(
        content: impl Into<String>,
        page_index: usize,
        rect: NormalizedRect,
        match_quality: f64,
        match_method: MatchMethod,
    ) -> Self {
        Self {
            content: content.into(),
            page_index,
            rect,
            match_quality,
            match_method,
        }
    }
}

/// One visual line of page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Line text, runs joined with single spaces
    pub text: String,

    /// Normalized, top-left-origin rectangle covering the line
    pub rect: NormalizedRect,
}

impl TextLine {
    /// Create a new text line.
    pub fn new(text: impl Into<String>, rect: NormalizedRect) -> Self {
        Self {
            text: text.into(),
            rect,
        }
    }
}
