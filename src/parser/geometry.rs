//! Placement geometry: from a CTM and pixel size to a normalized rectangle.

use super::catalog::StreamDescriptor;
use super::options::LocateOptions;
use super::walker::ImagePlacement;
use crate::model::{NormalizedRect, NormalizedRegion, PdfRect, SourceKind};

/// Why a placement could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    /// The descriptor has no positive pixel dimensions
    MissingDimensions,
    /// The CTM maps the image to nothing (or to non-finite values)
    DegenerateMatrix,
    /// The placement lies entirely off the page
    OffPage,
    /// No `Do` painted the image
    NeverPainted,
}

impl std::fmt::Display for Unresolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unresolved::MissingDimensions => write!(f, "no usable pixel dimensions"),
            Unresolved::DegenerateMatrix => write!(f, "degenerate transform"),
            Unresolved::OffPage => write!(f, "placement lies outside the page"),
            Unresolved::NeverPainted => write!(f, "no Do operator paints it"),
        }
    }
}

/// Converts placements on one page into normalized regions.
pub struct GeometryResolver<'a> {
    media_box: PdfRect,
    options: &'a LocateOptions,
}

impl<'a> GeometryResolver<'a> {
    /// Create a resolver for a page with the given media box.
    pub fn new(media_box: PdfRect, options: &'a LocateOptions) -> Self {
        Self { media_box, options }
    }

    /// The image's rectangle in PDF user space.
    ///
    /// For an axis-aligned, unflipped CTM this is `(e, f, a*w, d*h)`. Other
    /// CTMs (flips, rotations) give the bounding box of the transformed
    /// image rectangle.
    pub fn pdf_rect(
        &self,
        placement: &ImagePlacement,
        descriptor: &StreamDescriptor,
    ) -> Result<PdfRect, Unresolved> {
        if !descriptor.has_dimensions() {
            return Err(Unresolved::MissingDimensions);
        }
        let m = &placement.matrix;
        if !m.is_finite() {
            return Err(Unresolved::DegenerateMatrix);
        }

        let pw = descriptor.pixel_width as f64;
        let ph = descriptor.pixel_height as f64;
        let corners = [
            m.apply(0.0, 0.0),
            m.apply(pw, 0.0),
            m.apply(0.0, ph),
            m.apply(pw, ph),
        ];
        let (x0, x1) = corners
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (x, _)| {
                (lo.min(*x), hi.max(*x))
            });
        let (y0, y1) = corners
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, y)| {
                (lo.min(*y), hi.max(*y))
            });

        let rect = PdfRect::from_corners(x0, y0, x1, y1);
        if rect.is_degenerate() {
            return Err(Unresolved::DegenerateMatrix);
        }
        Ok(rect)
    }

    /// Normalize a PDF-space rectangle to page fractions with a top-left
    /// origin. No clamping.
    pub fn normalize(&self, rect: &PdfRect) -> NormalizedRect {
        let mb = &self.media_box;
        let x = (rect.x - mb.x) / mb.width;
        let y = (rect.y - mb.y) / mb.height;
        let width = rect.width / mb.width;
        let height = rect.height / mb.height;
        NormalizedRect::new(x, 1.0 - (y + height), width, height)
    }

    /// Normalize, clamping only past the overflow tolerance.
    ///
    /// Returns the rectangle and whether it was clamped.
    pub fn normalize_clamped(&self, rect: &PdfRect) -> (NormalizedRect, bool) {
        let normalized = self.normalize(rect);
        if normalized.overflows(self.options.overflow_tolerance) {
            (normalized.clamped(), true)
        } else {
            (normalized, false)
        }
    }

    /// Resolve a placement into a region.
    pub fn resolve(
        &self,
        placement: &ImagePlacement,
        descriptor: &StreamDescriptor,
    ) -> Result<NormalizedRegion, Unresolved> {
        let pdf_rect = self.pdf_rect(placement, descriptor)?;
        let (rect, clamped) = self.normalize_clamped(&pdf_rect);
        if clamped && (rect.width <= 0.0 || rect.height <= 0.0) {
            return Err(Unresolved::OffPage);
        }

        let confidence = if clamped {
            log::debug!("/{} overflows the page; clamped", placement.name);
            self.options.clamped_confidence
        } else {
            self.options.resolved_confidence
        };

        Ok(NormalizedRegion::resolved(
            placement.name.clone(),
            placement.page_index,
            rect,
            pdf_rect,
            confidence,
        ))
    }

    /// A page-centered estimate for an image whose placement is unknown.
    ///
    /// `aspect` is the image's width over height. Without one the rectangle
    /// fills the size caps.
    pub fn fallback(&self, name: &str, page_index: usize, aspect: Option<f64>) -> NormalizedRegion {
        NormalizedRegion::estimated(
            name,
            page_index,
            self.fallback_rect(aspect),
            self.options.fallback_confidence,
        )
    }

    fn fallback_rect(&self, aspect: Option<f64>) -> NormalizedRect {
        let max_w = self.options.fallback_max_width;
        let max_h = self.options.fallback_max_height;
        let page_ratio = self.media_box.width / self.media_box.height;

        let (width, height) = match aspect {
            Some(r) if r.is_finite() && r > 0.0 && page_ratio.is_finite() => {
                // Keep the physical aspect: w * W / (h * H) == r.
                let height = max_h;
                let width = r * height / page_ratio;
                if width > max_w {
                    (max_w, max_w * page_ratio / r)
                } else {
                    (width, height)
                }
            }
            _ => (max_w, max_h),
        };

        let top = self.options.fallback_top_margin;
        let band = (1.0 - 2.0 * top).max(0.0);
        let x = (1.0 - width) / 2.0;
        let y = top + ((band - height) / 2.0).max(0.0);

        NormalizedRect::new(x, y, width, height).clamped()
    }

    /// Region for a Stamp/Image annotation.
    pub fn annotation(&self, name: &str, page_index: usize, rect: &PdfRect) -> NormalizedRegion {
        let (normalized, clamped) = self.normalize_clamped(rect);
        let confidence = if clamped {
            self.options.clamped_confidence
        } else {
            self.options.resolved_confidence
        };
        NormalizedRegion::resolved(name, page_index, normalized, *rect, confidence)
            .with_source(SourceKind::Annotation)
    }
}
