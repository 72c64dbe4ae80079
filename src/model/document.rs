//! Document-level output.

use serde::{Deserialize, Serialize};

use super::{NormalizedRegion, PageRegions, TextSpan};

/// Located regions and spans for a whole document, page-indexed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRegions {
    /// PDF version from the header, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_version: Option<String>,

    /// Total number of pages in the source document
    pub page_count: u32,

    /// Processed pages, ordered by page index
    pub pages: Vec<PageRegions>,
}

impl DocumentRegions {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a processed page.
    pub fn add_page(&mut self, page: PageRegions) {
        self.pages.push(page);
    }

    /// Get a processed page by zero-based index.
    pub fn page(&self, page_index: usize) -> Option<&PageRegions> {
        self.pages.iter().find(|p| p.page_index == page_index)
    }

    /// All regions across pages.
    pub fn regions(&self) -> impl Iterator<Item = &NormalizedRegion> {
        self.pages.iter().flat_map(|p| p.regions.iter())
    }

    /// All spans across pages.
    pub fn spans(&self) -> impl Iterator<Item = &TextSpan> {
        self.pages.iter().flat_map(|p| p.spans.iter())
    }

    /// The best span for a target over all pages.
    ///
    /// Highest quality wins; ties go to the earliest page.
    pub fn best_span(&self, target: &str) -> Option<&TextSpan> {
        self.spans()
            .filter(|s| s.content == target)
            .fold(None, |best: Option<&TextSpan>, s| match best {
                Some(b) if b.match_quality >= s.match_quality => Some(b),
                _ => Some(s),
            })
    }

    /// Check if no page produced anything.
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchMethod, NormalizedRect, PdfRect};

    fn span(page_index: usize, quality: f64) -> TextSpan {
        TextSpan::new(
            "target",
            page_index,
            NormalizedRect::new(0.1, 0.1, 0.1, 0.02),
            quality,
            MatchMethod::Fuzzy,
        )
    }

    #[test]
    fn test_best_span_prefers_quality_then_earliest_page() {
        let mut doc = DocumentRegions::new();
        for (index, quality) in [(0, 0.72), (1, 0.9), (2, 0.9)] {
            let mut page = PageRegions::new(index, PdfRect::letter());
            page.spans.push(span(index, quality));
            doc.add_page(page);
        }

        let best = doc.best_span("target").unwrap();
        assert_eq!(best.page_index, 1);
        assert!(doc.best_span("other").is_none());
    }

    #[test]
    fn test_empty_document() {
        let mut doc = DocumentRegions::new();
        doc.add_page(PageRegions::new(0, PdfRect::letter()));
        assert!(doc.is_empty());
        assert!(doc.page(0).is_some());
        assert!(doc.page(3).is_none());
    }
}
