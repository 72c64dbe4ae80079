//! Benchmarks for pdfloc locate performance.
//!
//! Run with: cargo bench
//!
//! These benchmarks use synthetic content streams and in-memory pages.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pdfloc::parser::{
    jaccard, locate_document, ContentStreamWalker, ResourceCatalog, XObjectEntry,
};
use pdfloc::{LocateOptions, MemoryBackend, MemoryPage, PdfRect};

/// A content stream painting `images` images, each inside its own q/Q with
/// a dimension hint, interleaved with text blocks.
fn create_content(images: usize) -> Vec<u8> {
    let mut content = String::new();
    for i in 0..images {
        content.push_str(&format!(
            "q 640 0 0 480 0 0 cm 0.1 0 0 0.1 {} {} cm /Im{} Do Q\n",
            20 + (i % 8) * 70,
            40 + (i / 8) * 60,
            i + 1
        ));
        content.push_str("BT /F1 9 Tf 72 700 Td (Caption text for the figure above) Tj ET\n");
    }
    content.into_bytes()
}

fn create_entries(images: usize) -> Vec<XObjectEntry> {
    (0..images)
        .map(|i| XObjectEntry::image(format!("Im{}", i + 1), 640, 480).with_filter("DCTDecode"))
        .collect()
}

/// Creates a backend with `page_count` pages of 16 images and some text.
fn create_backend(page_count: usize) -> MemoryBackend {
    let mut backend = MemoryBackend::new();
    for p in 0..page_count {
        let mut page = MemoryPage::new(PdfRect::letter()).with_content(create_content(16));
        for entry in create_entries(16) {
            page = page.with_xobject(entry);
        }
        for line in 0..30 {
            page = page.with_text(
                format!("Page {} line {} of the benchmark body text.", p + 1, line + 1),
                PdfRect::new(72.0, 720.0 - line as f64 * 14.0, 400.0, 10.0),
            );
        }
        backend.push_page(page);
    }
    backend
}

/// Benchmark content stream walking at various sizes.
fn bench_walker(c: &mut Criterion) {
    let mut group = c.benchmark_group("walker");

    for images in [1, 16, 128].iter() {
        let catalog = ResourceCatalog::from_entries(create_entries(*images));
        let content = create_content(*images);

        group.bench_function(format!("{}_images", images), |b| {
            b.iter(|| ContentStreamWalker::new(&catalog, 0, 100.0).walk(black_box(&content)));
        });
    }

    group.finish();
}

/// Benchmark the full pipeline, sequential and parallel.
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let backend = create_backend(20);
    let targets = ["line 17 of the benchmark", "Page 3 line 2 of the benchmark body"];

    group.bench_function("20_pages_sequential", |b| {
        let options = LocateOptions::new().with_targets(targets).sequential();
        b.iter(|| locate_document(black_box(&backend), &options).unwrap());
    });

    group.bench_function("20_pages_parallel", |b| {
        let options = LocateOptions::new().with_targets(targets);
        b.iter(|| locate_document(black_box(&backend), &options).unwrap());
    });

    group.finish();
}

/// Benchmark token-set similarity.
fn bench_jaccard(c: &mut Criterion) {
    let a = "The committee reviewed seven proposals for the new river bridge";
    let b = "The committee reviewed eight proposals for the new river crossing";

    c.bench_function("jaccard", |bench| {
        bench.iter(|| jaccard(black_box(a), black_box(b)));
    });
}

criterion_group!(benches, bench_walker, bench_pipeline, bench_jaccard);
criterion_main!(benches);
