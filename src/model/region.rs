//! Located image regions.

use serde::{Deserialize, Serialize};

use super::{NormalizedRect, PdfRect};

/// Where a region came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// An image XObject painted with `Do`
    Image,
    /// A Stamp/Image annotation rectangle
    Annotation,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Image => write!(f, "image"),
            SourceKind::Annotation => write!(f, "annotation"),
        }
    }
}

/// A region of the page occupied by an image, in normalized coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRegion {
    /// XObject resource name (without the leading slash), or `AnnotN`
    pub name: String,

    /// Zero-based page index
    pub page_index: usize,

    /// Normalized, top-left-origin rectangle
    pub rect: NormalizedRect,

    /// Geometry confidence in `[0, 1]`
    pub confidence: f64,

    /// Region origin
    pub source_kind: SourceKind,

    /// True when the rectangle was synthesized rather than resolved
    pub estimated: bool,

    /// Resolved rectangle in PDF user space, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_rect: Option<PdfRect>,
}

impl NormalizedRegion {
    /// A region whose geometry was resolved from the content stream.
    pub fn resolved(
        name: impl Into<String>,
        page_index: usize,
        rect: NormalizedRect,
        pdf_rect: PdfRect,
        confidence: f64,
    ) -> Self {
        Self {
            name: name.into(),
            page_index,
            rect,
            confidence,
            source_kind: SourceKind::Image,
            estimated: false,
            pdf_rect: Some(pdf_rect),
        }
    }

    /// A region whose geometry was estimated.
    pub fn estimated(
        name: impl Into<String>,
        page_index: usize,
        rect: NormalizedRect,
        confidence: f64,
    ) -> Self {
        Self {
            name: name.into(),
            page_index,
            rect,
            confidence,
            source_kind: SourceKind::Image,
            estimated: true,
            pdf_rect: None,
        }
    }

    /// Mark the region as coming from an annotation.
    pub fn with_source(mut self, kind: SourceKind) -> Self {
        self.source_kind = kind;
        self
    }

    /// Check if this region came from an image XObject.
    pub fn is_image(&self) -> bool {
        matches!(self.source_kind, SourceKind::Image)
    }
}
