//! Integration tests for the locate pipeline over an in-memory object model.

use pdfloc::parser::{locate_across_pages, locate_document, locate_page, XObjectEntry};
use pdfloc::{
    Degradation, ErrorMode, LocateOptions, MatchMethod, MemoryBackend, MemoryPage,
    NormalizedRect, PageSelection, PdfRect, SourceKind,
};

const EPS: f64 = 1e-9;

fn letter() -> MemoryPage {
    MemoryPage::new(PdfRect::letter())
}

fn sequential() -> LocateOptions {
    LocateOptions::new().sequential()
}

#[test]
fn test_full_arithmetic_chain() {
    let backend = MemoryBackend::new().with_page(
        MemoryPage::new(PdfRect::new(0.0, 0.0, 200.0, 200.0))
            .with_xobject(XObjectEntry::image("Im1", 100, 100))
            .with_content("q 2 0 0 2 10 20 cm /Im1 Do Q"),
    );

    let page = locate_page(&backend, 1, &sequential()).unwrap();
    assert_eq!(page.regions.len(), 1);

    let region = &page.regions[0];
    assert_eq!(region.pdf_rect, Some(PdfRect::new(10.0, 20.0, 200.0, 200.0)));
    // Top edge sits 0.1 above the page, inside the overflow tolerance
    assert!(region
        .rect
        .approx_eq(&NormalizedRect::new(0.05, -0.1, 1.0, 1.0), EPS));
    assert_eq!(region.confidence, 1.0);
    assert!(!region.estimated);
    assert!(page.degradations.is_empty());
}

#[test]
fn test_dimension_hint_is_not_composed() {
    let backend = MemoryBackend::new().with_page(
        letter()
            .with_xobject(XObjectEntry::image("Im1", 400, 200))
            .with_content("q 500 0 0 500 0 0 cm 0.5 0 0 0.5 100 100 cm /Im1 Do Q"),
    );

    let page = locate_page(&backend, 1, &sequential()).unwrap();
    let region = &page.regions[0];
    assert_eq!(region.pdf_rect, Some(PdfRect::new(100.0, 100.0, 200.0, 100.0)));
    assert!((region.rect.x - 100.0 / 612.0).abs() < EPS);
    assert!((region.rect.width - 200.0 / 612.0).abs() < EPS);
    assert!((region.rect.height - 100.0 / 792.0).abs() < EPS);
}

#[test]
fn test_zero_width_image_falls_back_inside_page() {
    let backend = MemoryBackend::new().with_page(
        letter()
            .with_xobject(XObjectEntry::image("Im1", 0, 480))
            .with_content("q 1 0 0 1 50 50 cm /Im1 Do Q"),
    );

    let page = locate_page(&backend, 1, &sequential()).unwrap();
    assert_eq!(page.regions.len(), 1);

    let region = &page.regions[0];
    assert!(region.estimated);
    assert!(region.confidence < 1.0);
    assert!(region.rect.is_within_page());
    assert!(matches!(
        &page.degradations[0],
        Degradation::UnresolvedPlacement { name, .. } if name == "Im1"
    ));
}

#[test]
fn test_fallback_uses_hint_aspect() {
    let backend = MemoryBackend::new().with_page(
        letter()
            .with_xobject(XObjectEntry::image("Im1", 0, 0))
            .with_content("q 300 0 0 200 0 0 cm /Im1 Do Q"),
    );

    let page = locate_page(&backend, 1, &sequential()).unwrap();
    let rect = page.regions[0].rect;

    // 3:2 image is width-capped at 60% of the page
    let page_ratio = 612.0 / 792.0;
    let height = 0.6 * page_ratio / 1.5;
    assert!(rect.approx_eq(
        &NormalizedRect::new(0.2, 0.1 + (0.8 - height) / 2.0, 0.6, height),
        EPS
    ));
    assert!((rect.width * 612.0 / (rect.height * 792.0) - 1.5).abs() < 1e-6);
}

#[test]
fn test_every_cataloged_image_gets_a_region() {
    let backend = MemoryBackend::new().with_page(
        letter()
            .with_xobject(XObjectEntry::image("Im2", 100, 100))
            .with_xobject(XObjectEntry::image("Im1", 100, 100))
            .with_xobject(XObjectEntry::new("Fm1").with_subtype("Form"))
            .with_content("q 1 0 0 1 72 72 cm /Im2 Do /Fm1 Do Q"),
    );

    let page = locate_page(&backend, 1, &sequential()).unwrap();
    let names: Vec<&str> = page.regions.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Im2", "Im1"]);
    assert!(!page.regions[0].estimated);
    assert!(page.regions[1].estimated);
    assert_eq!(page.regions[1].confidence, 0.4);
}

#[test]
fn test_off_page_placement_falls_back() {
    let backend = MemoryBackend::new().with_page(
        letter()
            .with_xobject(XObjectEntry::image("Im1", 100, 100))
            .with_content("q 1 0 0 1 2000 2000 cm /Im1 Do Q"),
    );

    let page = locate_page(&backend, 1, &sequential()).unwrap();
    assert!(page.regions[0].estimated);
    assert!(page.regions[0].rect.is_within_page());
}

#[test]
fn test_large_overflow_is_clamped() {
    let backend = MemoryBackend::new().with_page(
        letter()
            .with_xobject(XObjectEntry::image("Im1", 612, 792))
            .with_content("q 1 0 0 1 -300 0 cm /Im1 Do Q"),
    );

    let page = locate_page(&backend, 1, &sequential()).unwrap();
    let region = &page.regions[0];
    assert!(!region.estimated);
    assert_eq!(region.confidence, 0.8);
    assert!(region.rect.is_within_page());
    assert!(region.rect.x.abs() < EPS);
}

#[test]
fn test_degradations_are_absorbed() {
    let backend = MemoryBackend::new()
        .with_page(
            letter()
                .with_broken_resources("XObject is not a dictionary")
                .with_content("q 1 0 0 1 0 0 cm /Im1 Do Q"),
        )
        .with_page(
            letter()
                .with_xobject(XObjectEntry::image("Im1", 10, 10))
                .with_content("Q Q 1 0 0 1 5 5 cm /Im1 Do"),
        );

    let doc = locate_document(&backend, &sequential()).unwrap();
    assert_eq!(doc.pages.len(), 2);

    assert!(doc.pages[0].regions.is_empty());
    assert!(matches!(
        doc.pages[0].degradations[0],
        Degradation::MalformedResource { .. }
    ));

    let restores = doc.pages[1]
        .degradations
        .iter()
        .filter(|d| matches!(d, Degradation::UnbalancedRestore { .. }))
        .count();
    assert_eq!(restores, 2);
    assert!(!doc.pages[1].regions[0].estimated);
}

#[test]
fn test_annotations_are_optional_regions() {
    let page = letter()
        .with_annotation("Link", PdfRect::new(0.0, 0.0, 10.0, 10.0))
        .with_annotation("Stamp", PdfRect::new(306.0, 396.0, 153.0, 198.0));
    let backend = MemoryBackend::new().with_page(page);

    let without = locate_page(&backend, 1, &sequential()).unwrap();
    assert!(without.regions.is_empty());

    let with = locate_page(&backend, 1, &sequential().with_annotations(true)).unwrap();
    assert_eq!(with.regions.len(), 1);
    let region = &with.regions[0];
    assert_eq!(region.name, "Annot2");
    assert_eq!(region.source_kind, SourceKind::Annotation);
    assert!(region
        .rect
        .approx_eq(&NormalizedRect::new(0.5, 0.25, 0.25, 0.25), EPS));
}

#[test]
fn test_text_tiers_through_pipeline() {
    let backend = MemoryBackend::new().with_page(
        letter()
            .with_text(
                "Annual rainfall in the northern valley rose sharply",
                PdfRect::new(72.0, 700.0, 300.0, 12.0),
            )
            .with_text(
                "after the reservoir was completed in the spring",
                PdfRect::new(72.0, 686.0, 280.0, 12.0),
            ),
    );
    let options = sequential().with_targets(["NORTHERN VALLEY", "tidal estuary sediment"]);

    let page = locate_page(&backend, 1, &options).unwrap();
    assert_eq!(page.spans.len(), 1);
    assert_eq!(page.spans[0].content, "NORTHERN VALLEY");
    assert_eq!(page.spans[0].match_method, MatchMethod::Exact);
    assert_eq!(page.spans[0].match_quality, 1.0);
    assert!(matches!(
        &page.degradations[..],
        [Degradation::NoTextMatch { target }] if target == "tidal estuary sediment"
    ));
}

#[test]
fn test_locate_across_pages_prefers_best_quality() {
    let backend = MemoryBackend::new()
        .with_page(letter())
        .with_page(letter().with_text(
            "Harbor expansion plan approved",
            PdfRect::new(72.0, 500.0, 200.0, 12.0),
        ))
        .with_page(letter().with_text(
            "Harbor expansion plan approved",
            PdfRect::new(72.0, 300.0, 200.0, 12.0),
        ));

    let span = locate_across_pages(&backend, "expansion plan", &sequential())
        .unwrap()
        .unwrap();
    assert_eq!(span.page_index, 1);

    let none = locate_across_pages(&backend, "municipal budget", &sequential()).unwrap();
    assert!(none.is_none());
}

#[test]
fn test_pipeline_is_deterministic() {
    let backend = MemoryBackend::new().with_page(
        letter()
            .with_xobject(XObjectEntry::image("Im1", 640, 480))
            .with_xobject(XObjectEntry::image("Im2", 0, 0))
            .with_content("q 0.5 0 0 0.5 72 300 cm /Im1 Do Q q 300 0 0 200 0 0 cm /Im2 Do Q")
            .with_text("Figure 2: survey map", PdfRect::new(72.0, 280.0, 120.0, 10.0)),
    );
    let options = sequential().with_target("survey map");

    let first = locate_document(&backend, &options).unwrap();
    let second = locate_document(&backend, &options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_parallel_matches_sequential() {
    let mut backend = MemoryBackend::new();
    for i in 0..12 {
        backend.push_page(
            letter()
                .with_xobject(XObjectEntry::image("Im1", 100 + i, 100))
                .with_content(format!("q 1 0 0 1 {} 100 cm /Im1 Do Q", 10 * i)),
        );
    }

    let parallel = locate_document(&backend, &LocateOptions::new()).unwrap();
    let sequential = locate_document(&backend, &sequential()).unwrap();
    assert_eq!(parallel, sequential);

    let order: Vec<usize> = parallel.pages.iter().map(|p| p.page_index).collect();
    assert_eq!(order, (0..12).collect::<Vec<_>>());
}

#[test]
fn test_page_selection_and_range_errors() {
    let backend = MemoryBackend::new()
        .with_page(letter())
        .with_page(letter())
        .with_page(letter());

    let doc = locate_document(
        &backend,
        &sequential().with_pages(PageSelection::parse("2-3").unwrap()),
    )
    .unwrap();
    assert_eq!(doc.page_count, 3);
    let indices: Vec<usize> = doc.pages.iter().map(|p| p.page_index).collect();
    assert_eq!(indices, vec![1, 2]);

    assert!(locate_page(&backend, 4, &sequential()).is_err());
    assert!(locate_page(
        &backend,
        0,
        &sequential().with_error_mode(ErrorMode::Lenient)
    )
    .is_err());
}
