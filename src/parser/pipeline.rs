//! Per-page orchestration and the document driver.
//!
//! Backend reads happen one page at a time on the calling thread. What comes
//! back is an owned [`PageInput`], and everything after that (catalog, walk,
//! geometry, text search) is a pure function of it, so pages can be
//! processed in parallel without the backend being shared across threads.

use rayon::prelude::*;

use super::backend::{AnnotationEntry, PageId, PdfBackend, XObjectEntry};
use super::catalog::ResourceCatalog;
use super::geometry::{GeometryResolver, Unresolved};
use super::options::{ErrorMode, LocateOptions};
use super::text_layer::{TextLayer, TextSearch};
use super::text_locator::TextSpanLocator;
use super::walker::ContentStreamWalker;
use crate::error::{Degradation, Error, Result};
use crate::model::{DocumentRegions, PageRegions, PdfRect, TextLine, TextSpan};

/// Annotation subtypes reported as regions.
const IMAGE_ANNOTATIONS: &[&str] = &["Stamp", "Image"];

/// Everything the pipeline reads from one page.
#[derive(Debug, Clone)]
pub struct PageInput {
    /// Zero-based page index
    pub page_index: usize,
    /// Page media box
    pub media_box: PdfRect,
    /// XObject listing, or why the resource dictionary could not be read
    pub xobjects: std::result::Result<Vec<XObjectEntry>, String>,
    /// Decoded content stream
    pub content: Vec<u8>,
    /// Positioned text
    pub text: TextLayer,
    /// Annotations with rectangles
    pub annotations: Vec<AnnotationEntry>,
}

impl PageInput {
    /// Read a page from a backend.
    ///
    /// Only failures that leave nothing to walk (no media box, no content
    /// stream) are errors. An unreadable resource dictionary or text layer
    /// is carried along and degrades the page instead.
    pub fn fetch<B: PdfBackend + ?Sized>(
        backend: &B,
        page_index: usize,
        page: PageId,
        options: &LocateOptions,
    ) -> Result<Self> {
        let media_box = backend.media_box(page)?;
        let content = backend.page_content(page)?;
        let xobjects = backend.page_xobjects(page).map_err(|e| e.to_string());

        let text = if options.targets.is_empty() && !options.include_text {
            TextLayer::default()
        } else {
            backend.text_layer(page).unwrap_or_else(|e| {
                log::warn!("No text layer for page {}: {}", page_index + 1, e);
                TextLayer::default()
            })
        };

        let annotations = if options.include_annotations {
            backend.page_annotations(page)
        } else {
            Vec::new()
        };

        Ok(Self {
            page_index,
            media_box,
            xobjects,
            content,
            text,
            annotations,
        })
    }
}

/// Locates images and text on one page at a time.
///
/// Holds no state between pages: each call builds its own catalog and
/// matrix stack and drops them when the page is assembled.
pub struct ContentExtractionPipeline<'a> {
    options: &'a LocateOptions,
}

impl<'a> ContentExtractionPipeline<'a> {
    /// Create a pipeline with the given options.
    pub fn new(options: &'a LocateOptions) -> Self {
        Self { options }
    }

    /// Process a fetched page.
    pub fn process(&self, input: &PageInput) -> PageRegions {
        self.process_with(input, &input.text)
    }

    /// Process a fetched page, searching text through `search` instead of
    /// the page's own text layer.
    pub fn process_with(&self, input: &PageInput, search: &dyn TextSearch) -> PageRegions {
        let page_index = input.page_index;
        let mut media_box = input.media_box;
        let mut degradations = Vec::new();

        if media_box.is_degenerate() {
            degradations.push(Degradation::MalformedResource {
                reason: format!(
                    "degenerate media box {}x{}, assuming Letter",
                    media_box.width, media_box.height
                ),
            });
            media_box = PdfRect::letter();
        }

        let mut page = PageRegions::new(page_index, media_box);

        let catalog = match &input.xobjects {
            Ok(entries) => ResourceCatalog::from_entries(entries.iter().cloned()),
            Err(reason) => {
                degradations.push(Degradation::MalformedResource {
                    reason: reason.clone(),
                });
                ResourceCatalog::empty()
            }
        };

        let walk = ContentStreamWalker::new(&catalog, page_index, self.options.dimension_hint_threshold)
            .walk(&input.content);
        degradations.extend(walk.degradations);

        let resolver = GeometryResolver::new(media_box, self.options);
        let mut painted = std::collections::HashSet::new();

        for placement in &walk.placements {
            let Some(descriptor) = catalog.get(&placement.name) else {
                continue;
            };
            painted.insert(placement.name.as_str());

            match resolver.resolve(placement, descriptor) {
                Ok(region) => page.regions.push(region),
                Err(reason) => {
                    let aspect = descriptor.aspect_ratio().or_else(|| {
                        placement
                            .dimension_hint
                            .filter(|(w, h)| *w > 0.0 && *h > 0.0)
                            .map(|(w, h)| w / h)
                    });
                    degradations.push(Degradation::UnresolvedPlacement {
                        name: placement.name.clone(),
                        reason: reason.to_string(),
                    });
                    page.regions
                        .push(resolver.fallback(&placement.name, page_index, aspect));
                }
            }
        }

        for (name, descriptor) in catalog.iter() {
            if painted.contains(name) {
                continue;
            }
            degradations.push(Degradation::UnresolvedPlacement {
                name: name.to_string(),
                reason: Unresolved::NeverPainted.to_string(),
            });
            page.regions
                .push(resolver.fallback(name, page_index, descriptor.aspect_ratio()));
        }

        for annot in &input.annotations {
            if IMAGE_ANNOTATIONS.contains(&annot.subtype.as_str()) {
                let name = format!("Annot{}", annot.index + 1);
                page.regions
                    .push(resolver.annotation(&name, page_index, &annot.rect));
            }
        }

        if !self.options.targets.is_empty() {
            let locator = TextSpanLocator::new(search, media_box, page_index, self.options);
            for target in &self.options.targets {
                match locator.locate(target) {
                    Some(span) => page.spans.push(span),
                    None => degradations.push(Degradation::NoTextMatch {
                        target: target.clone(),
                    }),
                }
            }
        }

        if self.options.include_text {
            page.text = Some(input.text.plain_text());
            page.lines = input
                .text
                .lines()
                .into_iter()
                .map(|line| TextLine::new(line.text, resolver.normalize_clamped(&line.bbox).0))
                .collect();
        }

        for d in &degradations {
            log::warn!("Page {}: {}", page_index + 1, d);
        }
        page.degradations = degradations;
        page
    }
}

/// Locate content on one page (1-indexed page number).
pub fn locate_page<B: PdfBackend + ?Sized>(
    backend: &B,
    page_number: u32,
    options: &LocateOptions,
) -> Result<PageRegions> {
    let pages = backend.pages();
    let page_id = *pages
        .get(&page_number)
        .ok_or(Error::PageOutOfRange(page_number, pages.len() as u32))?;
    let page_index = page_number.saturating_sub(1) as usize;

    match PageInput::fetch(backend, page_index, page_id, options) {
        Ok(input) => Ok(ContentExtractionPipeline::new(options).process(&input)),
        Err(e) if options.error_mode == ErrorMode::Lenient => {
            log::warn!("Failed to read page {}: {}", page_number, e);
            Ok(PageRegions::new(page_index, PdfRect::letter()))
        }
        Err(e) => Err(e),
    }
}

/// Locate content on every selected page of a document.
pub fn locate_document<B: PdfBackend + ?Sized>(
    backend: &B,
    options: &LocateOptions,
) -> Result<DocumentRegions> {
    let pages = backend.pages();
    let mut doc = DocumentRegions {
        pdf_version: backend.version(),
        page_count: pages.len() as u32,
        pages: Vec::new(),
    };

    // Backend access stays on this thread.
    let mut inputs = Vec::new();
    let mut unreadable = Vec::new();
    for (&page_number, &page_id) in &pages {
        if !options.pages.includes(page_number) {
            continue;
        }
        let page_index = page_number.saturating_sub(1) as usize;
        match PageInput::fetch(backend, page_index, page_id, options) {
            Ok(input) => inputs.push(input),
            Err(e) if options.error_mode == ErrorMode::Lenient => {
                log::warn!("Failed to read page {}: {}", page_number, e);
                unreadable.push(PageRegions::new(page_index, PdfRect::letter()));
            }
            Err(e) => return Err(e),
        }
    }

    let pipeline = ContentExtractionPipeline::new(options);
    let mut results: Vec<PageRegions> = if options.parallel {
        inputs.par_iter().map(|input| pipeline.process(input)).collect()
    } else {
        inputs.iter().map(|input| pipeline.process(input)).collect()
    };
    results.extend(unreadable);
    results.sort_by_key(|p| p.page_index);

    for page in results {
        doc.add_page(page);
    }
    Ok(doc)
}

/// The best span for `target` over every selected page.
///
/// Highest quality wins; ties go to the earliest page.
pub fn locate_across_pages<B: PdfBackend + ?Sized>(
    backend: &B,
    target: &str,
    options: &LocateOptions,
) -> Result<Option<TextSpan>> {
    let mut options = options.clone();
    options.targets = vec![target.to_string()];
    options.include_annotations = false;
    options.include_text = false;

    let doc = locate_document(backend, &options)?;
    Ok(doc.best_span(target).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchMethod;
    use crate::parser::backend::{MemoryBackend, MemoryPage};

    fn square_page() -> MemoryPage {
        MemoryPage::new(PdfRect::new(0.0, 0.0, 200.0, 200.0))
    }

    #[test]
    fn test_fixture_page() {
        let backend = MemoryBackend::new().with_page(
            square_page()
                .with_xobject(XObjectEntry::image("Im1", 100, 100))
                .with_content("q 2 0 0 2 10 20 cm /Im1 Do Q"),
        );

        let page = locate_page(&backend, 1, &LocateOptions::default()).unwrap();
        assert_eq!(page.regions.len(), 1);
        let region = &page.regions[0];
        assert_eq!(region.name, "Im1");
        assert_eq!(region.confidence, 1.0);
        assert!((region.rect.y + 0.1).abs() < 1e-9);
        assert!(page.degradations.is_empty());
    }

    #[test]
    fn test_every_cataloged_image_yields_a_region() {
        let backend = MemoryBackend::new().with_page(
            square_page()
                .with_xobject(XObjectEntry::image("Im1", 100, 100))
                .with_xobject(XObjectEntry::image("Im2", 0, 50))
                .with_xobject(XObjectEntry::image("Im3", 40, 20))
                .with_xobject(XObjectEntry::new("Fm1").with_subtype("Form"))
                .with_content("q 1 0 0 1 0 0 cm /Im1 Do /Im2 Do /Fm1 Do Q"),
        );

        let page = locate_page(&backend, 1, &LocateOptions::default()).unwrap();
        let names: Vec<&str> = page.regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Im1", "Im2", "Im3"]);

        assert!(!page.regions[0].estimated);
        for region in &page.regions[1..] {
            assert!(region.estimated);
            assert!(region.confidence < 1.0);
            assert!(region.rect.is_within_page());
        }
        assert_eq!(
            page.degradations
                .iter()
                .filter(|d| matches!(d, Degradation::UnresolvedPlacement { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_malformed_resources_degrade_to_empty_catalog() {
        let backend = MemoryBackend::new().with_page(
            square_page()
                .with_broken_resources("XObject is not a dictionary")
                .with_content("/Im1 Do"),
        );

        let page = locate_page(&backend, 1, &LocateOptions::default()).unwrap();
        assert!(page.regions.is_empty());
        assert!(matches!(
            page.degradations[0],
            Degradation::MalformedResource { .. }
        ));
    }

    #[test]
    fn test_text_targets_and_no_match() {
        let backend = MemoryBackend::new().with_page(
            square_page().with_text("Emotion drives the story", PdfRect::new(20.0, 150.0, 160.0, 10.0)),
        );
        let options = LocateOptions::new()
            .with_target("drives the")
            .with_target("nowhere to be found");

        let page = locate_page(&backend, 1, &options).unwrap();
        assert_eq!(page.spans.len(), 1);
        assert_eq!(page.spans[0].match_method, MatchMethod::Exact);
        assert!(page
            .degradations
            .iter()
            .any(|d| matches!(d, Degradation::NoTextMatch { target } if target == "nowhere to be found")));
    }

    #[test]
    fn test_annotations_are_opt_in() {
        let backend = MemoryBackend::new().with_page(
            square_page()
                .with_annotation("Link", PdfRect::new(0.0, 0.0, 10.0, 10.0))
                .with_annotation("Stamp", PdfRect::new(50.0, 50.0, 100.0, 50.0)),
        );

        let page = locate_page(&backend, 1, &LocateOptions::default()).unwrap();
        assert!(page.regions.is_empty());

        let page = locate_page(&backend, 1, &LocateOptions::new().with_annotations(true)).unwrap();
        assert_eq!(page.regions.len(), 1);
        assert_eq!(page.regions[0].name, "Annot2");
        assert!(!page.regions[0].is_image());
    }

    #[test]
    fn test_text_output_is_opt_in() {
        let backend = MemoryBackend::new().with_page(
            square_page()
                .with_text("Harbor survey", PdfRect::new(20.0, 150.0, 80.0, 10.0))
                .with_text("results", PdfRect::new(104.0, 150.0, 40.0, 10.0))
                .with_text("Appendix", PdfRect::new(20.0, 100.0, 50.0, 10.0)),
        );

        let page = locate_page(&backend, 1, &LocateOptions::default()).unwrap();
        assert_eq!(page.text, None);
        assert!(page.lines.is_empty());

        let page = locate_page(&backend, 1, &LocateOptions::new().with_text(true)).unwrap();
        assert_eq!(
            page.text.as_deref(),
            Some("Harbor survey results\n\nAppendix")
        );
        assert_eq!(page.lines.len(), 2);
        assert_eq!(page.lines[0].text, "Harbor survey results");
        let rect = page.lines[0].rect;
        assert!((rect.x - 0.1).abs() < 1e-9);
        assert!((rect.y - 0.2).abs() < 1e-9);
        assert!((rect.width - 0.62).abs() < 1e-9);
        assert!((rect.height - 0.05).abs() < 1e-9);
        assert!(page.spans.is_empty());
    }

    #[test]
    fn test_page_out_of_range() {
        let backend = MemoryBackend::new().with_page(square_page());
        assert!(matches!(
            locate_page(&backend, 2, &LocateOptions::default()),
            Err(Error::PageOutOfRange(2, 1))
        ));
    }

    #[test]
    fn test_dimension_hint_sizes_fallback() {
        let backend = MemoryBackend::new().with_page(
            square_page()
                .with_xobject(XObjectEntry::new("Im1").with_subtype("Image"))
                .with_content("q 400 0 0 200 0 0 cm 1 0 0 1 10 10 cm /Im1 Do Q"),
        );

        let page = locate_page(&backend, 1, &LocateOptions::default()).unwrap();
        let rect = page.regions[0].rect;
        assert!(page.regions[0].estimated);
        assert!((rect.width - 0.6).abs() < 1e-9);
        assert!((rect.height - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut backend = MemoryBackend::new();
        for i in 0..6 {
            backend.push_page(
                square_page()
                    .with_xobject(XObjectEntry::image("Im1", 10, 10))
                    .with_content(format!("q 1 0 0 1 {} {} cm /Im1 Do Q", i * 10, i * 5)),
            );
        }

        let sequential = locate_document(&backend, &LocateOptions::default()).unwrap();
        let parallel = locate_document(&backend, &LocateOptions::new().with_parallel(true)).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(sequential.pages.len(), 6);
        assert!(sequential
            .pages
            .windows(2)
            .all(|w| w[0].page_index < w[1].page_index));
    }
}
