//! Page-level output.

use serde::{Deserialize, Serialize};

use super::{NormalizedRegion, PdfRect, TextLine, TextSpan};
use crate::error::Degradation;

/// Everything located on a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRegions {
    /// Zero-based page index
    pub page_index: usize,

    /// Media box the regions were normalized against
    pub media_box: PdfRect,

    /// Image (and annotation) regions, in content-stream order
    pub regions: Vec<NormalizedRegion>,

    /// Located text spans, in target order
    pub spans: Vec<TextSpan>,

    /// Whole-page plain text, when text output was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Positioned text lines, when text output was requested
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<TextLine>,

    /// Non-fatal problems absorbed while producing this page
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<Degradation>,
}

impl PageRegions {
    /// Create an empty page result.
    pub fn new(page_index: usize, media_box: PdfRect) -> Self {
        Self {
            page_index,
            media_box,
            regions: Vec::new(),
            spans: Vec::new(),
            text: None,
            lines: Vec::new(),
            degradations: Vec::new(),
        }
    }

    /// One-based page number.
    pub fn page_number(&self) -> u32 {
        self.page_index as u32 + 1
    }

    /// Check if nothing was located on this page.
    ///
    /// An empty page is a soft signal, not an error.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.spans.is_empty()
    }

    /// Image regions whose geometry was resolved from the content stream.
    pub fn resolved_regions(&self) -> impl Iterator<Item = &NormalizedRegion> {
        self.regions.iter().filter(|r| !r.estimated)
    }

    /// Image regions whose geometry was estimated.
    pub fn estimated_regions(&self) -> impl Iterator<Item = &NormalizedRegion> {
        self.regions.iter().filter(|r| r.estimated)
    }
}
