//! Locating target strings on a page.
//!
//! Search runs in tiers. An exact (case-insensitive) hit wins outright; a
//! long target may then match on its leading prefix; failing both, page text
//! is chunked and compared by token-set similarity.

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

use super::geometry::GeometryResolver;
use super::options::{token_pattern, Granularity, LocateOptions};
use super::text_layer::TextSearch;
use crate::model::{MatchMethod, PdfRect, TextSpan};

/// Lowercase alphanumeric tokens of a string.
pub fn tokenize(text: &str) -> HashSet<String> {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();
    token_pattern()
        .find_iter(&folded)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Jaccard similarity of the token sets of two strings.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a = tokenize(a);
    let b = tokenize(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Cut page text into fuzzy-match candidates.
pub fn candidates(page_text: &str, target: &str, granularity: Granularity) -> Vec<String> {
    match granularity {
        Granularity::Word => {
            let words: Vec<&str> = page_text.split_whitespace().collect();
            let n = target.split_whitespace().count().max(1);
            if words.len() <= n {
                return if words.is_empty() {
                    Vec::new()
                } else {
                    vec![words.join(" ")]
                };
            }
            words.windows(n).map(|w| w.join(" ")).collect()
        }
        Granularity::Sentence => page_text
            .split(['.', '!', '?'])
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty())
            .collect(),
        Granularity::Paragraph => {
            let mut paragraphs = Vec::new();
            let mut current: Vec<&str> = Vec::new();
            for line in page_text.lines() {
                if line.trim().is_empty() {
                    if !current.is_empty() {
                        paragraphs.push(current.join(" "));
                        current.clear();
                    }
                } else {
                    current.push(line.trim());
                }
            }
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
            }
            paragraphs
        }
    }
}

/// Finds where target strings sit on one page.
pub struct TextSpanLocator<'a> {
    search: &'a dyn TextSearch,
    resolver: GeometryResolver<'a>,
    options: &'a LocateOptions,
    page_index: usize,
}

impl<'a> TextSpanLocator<'a> {
    /// Create a locator over a page's text primitive.
    pub fn new(
        search: &'a dyn TextSearch,
        media_box: PdfRect,
        page_index: usize,
        options: &'a LocateOptions,
    ) -> Self {
        Self {
            search,
            resolver: GeometryResolver::new(media_box, options),
            options,
            page_index,
        }
    }

    /// Union rectangle of the first hit for `needle`.
    fn first_hit(&self, needle: &str) -> Option<PdfRect> {
        self.search
            .find_text(needle)
            .iter()
            .find_map(|selection| selection.bounds())
    }

    fn span(&self, target: &str, rect: &PdfRect, quality: f64, method: MatchMethod) -> TextSpan {
        let (normalized, _) = self.resolver.normalize_clamped(rect);
        TextSpan::new(target, self.page_index, normalized, quality, method)
    }

    /// Exact, then partial, then fuzzy at the stricter fallback threshold.
    pub fn locate(&self, target: &str) -> Option<TextSpan> {
        let span = self
            .locate_exact(target)
            .or_else(|| self.locate_partial(target))
            .or_else(|| self.locate_fuzzy_above(target, self.options.fuzzy_fallback_threshold));
        if span.is_none() {
            log::debug!("No match for '{}' on page {}", target, self.page_index + 1);
        }
        span
    }

    /// Case-insensitive search for the whole target.
    pub fn locate_exact(&self, target: &str) -> Option<TextSpan> {
        if target.trim().is_empty() {
            return None;
        }
        let rect = self.first_hit(target)?;
        Some(self.span(target, &rect, 1.0, MatchMethod::Exact))
    }

    /// Search for the leading prefix of a long target.
    pub fn locate_partial(&self, target: &str) -> Option<TextSpan> {
        let limit = self.options.partial_prefix_chars;
        if limit == 0 || target.chars().count() <= limit {
            return None;
        }
        let prefix: String = target.chars().take(limit).collect();
        let rect = self.first_hit(&prefix)?;
        Some(self.span(
            target,
            &rect,
            self.options.partial_quality,
            MatchMethod::Partial,
        ))
    }

    /// Token-set similarity search at the standalone threshold.
    pub fn locate_fuzzy(&self, target: &str) -> Option<TextSpan> {
        self.locate_fuzzy_above(target, self.options.fuzzy_threshold)
    }

    /// Best candidate scoring strictly above `threshold` that can be found
    /// on the page. Ties go to the earlier candidate.
    pub fn locate_fuzzy_above(&self, target: &str, threshold: f64) -> Option<TextSpan> {
        let target_tokens = tokenize(target);
        if target_tokens.is_empty() {
            return None;
        }

        let page_text = self.search.plain_text();
        let mut scored: Vec<(f64, String)> =
            candidates(&page_text, target, self.options.granularity)
                .into_iter()
                .filter_map(|chunk| {
                    let tokens = tokenize(&chunk);
                    let union = target_tokens.union(&tokens).count();
                    let score = target_tokens.intersection(&tokens).count() as f64 / union as f64;
                    (score > threshold).then_some((score, chunk))
                })
                .collect();

        // Stable: equal scores keep page order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored.into_iter().find_map(|(score, chunk)| {
            let rect = self.first_hit(&chunk)?;
            log::trace!("Fuzzy match {:.3} for '{}'", score, target);
            Some(self.span(target, &rect, score, MatchMethod::Fuzzy))
        })
    }
}
