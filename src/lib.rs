//! # pdfloc
//!
//! Locate embedded images and text spans on PDF pages.
//!
//! Every result is a rectangle in normalized, top-left-origin page
//! coordinates: `x` and `y` grow right and down, and a rectangle fully on the
//! page lies inside the unit square. Image regions come from walking each
//! page's content stream and tracking the current transformation matrix up
//! to the `Do` that paints the image. Text spans come from searching the
//! page's positioned text layer, exactly first, then by prefix, then by
//! token-set similarity.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfloc::{locate_file, render};
//!
//! fn main() -> pdfloc::Result<()> {
//!     let regions = locate_file("document.pdf")?;
//!     for region in regions.regions() {
//!         println!("{} on page {}: {:?}", region.name, region.page_index + 1, region.rect);
//!     }
//!
//!     let json = render::to_json(&regions, render::JsonFormat::Pretty)?;
//!     println!("{}", json);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Placement tracking**: `q`/`Q`/`cm` matrix stack with dimension-hint detection
//! - **Graceful degradation**: every cataloged image yields a region, estimated if need be
//! - **Tiered text search**: exact, partial prefix and fuzzy matching
//! - **Pluggable object model**: the `PdfBackend` trait, with `lopdf` and in-memory backends
//! - **Parallel processing**: Uses Rayon for multi-page documents

pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, detect_format_from_path, PdfFormat};
pub use error::{Degradation, Error, Result};
pub use model::{
    DocumentRegions, MatchMethod, NormalizedRect, NormalizedRegion, PageRegions, PdfRect,
    SourceKind, TextLine, TextSpan,
};
pub use parser::{
    ErrorMode, Granularity, LocateOptions, LopdfBackend, MemoryBackend, MemoryPage, PageSelection,
    PdfBackend,
};
pub use render::JsonFormat;

use std::io::Read;
use std::path::Path;

/// Locate image regions on every page of a PDF file.
///
/// # Example
///
/// ```no_run
/// use pdfloc::locate_file;
///
/// let regions = locate_file("document.pdf").unwrap();
/// println!("Pages: {}", regions.page_count);
/// ```
pub fn locate_file<P: AsRef<Path>>(path: P) -> Result<DocumentRegions> {
    let backend = LopdfBackend::load_file(path)?;
    parser::locate_document(&backend, parser::default_options())
}

/// Locate regions and spans in a PDF file with custom options.
///
/// # Example
///
/// ```no_run
/// use pdfloc::{locate_file_with_options, LocateOptions};
///
/// let options = LocateOptions::new()
///     .with_target("Quarterly revenue")
///     .lenient();
/// let regions = locate_file_with_options("report.pdf", &options).unwrap();
/// ```
pub fn locate_file_with_options<P: AsRef<Path>>(
    path: P,
    options: &LocateOptions,
) -> Result<DocumentRegions> {
    let backend = LopdfBackend::load_file(path)?;
    parser::locate_document(&backend, options)
}

/// Locate image regions in a PDF held in memory.
pub fn locate_bytes(data: &[u8]) -> Result<DocumentRegions> {
    let backend = LopdfBackend::load_bytes(data)?;
    parser::locate_document(&backend, parser::default_options())
}

/// Locate regions and spans in a PDF held in memory with custom options.
pub fn locate_bytes_with_options(data: &[u8], options: &LocateOptions) -> Result<DocumentRegions> {
    let backend = LopdfBackend::load_bytes(data)?;
    parser::locate_document(&backend, options)
}

/// Locate image regions in a PDF read from `reader`.
pub fn locate_reader<R: Read>(reader: R) -> Result<DocumentRegions> {
    let backend = LopdfBackend::load_reader(reader)?;
    parser::locate_document(&backend, parser::default_options())
}

/// Find the best location of `target` anywhere in a PDF file.
///
/// # Example
///
/// ```no_run
/// use pdfloc::find_text;
///
/// if let Some(span) = find_text("paper.pdf", "we propose a new method").unwrap() {
///     println!("page {} ({})", span.page_index + 1, span.match_method);
/// }
/// ```
pub fn find_text<P: AsRef<Path>>(path: P, target: &str) -> Result<Option<TextSpan>> {
    let backend = LopdfBackend::load_file(path)?;
    parser::locate_across_pages(&backend, target, parser::default_options())
}

/// Builder tying a document backend to locate options.
///
/// # Example
///
/// ```no_run
/// use pdfloc::{Locator, PageSelection};
///
/// let regions = Locator::open("document.pdf")?
///     .with_target("Figure 3")
///     .with_pages(PageSelection::Range(1..=5))
///     .with_annotations(true)
///     .lenient()
///     .locate()?;
/// # Ok::<(), pdfloc::Error>(())
/// ```
pub struct Locator<B: PdfBackend = LopdfBackend> {
    backend: B,
    options: LocateOptions,
}

impl Locator<LopdfBackend> {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::with_backend(LopdfBackend::load_file(path)?))
    }

    /// Load a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self::with_backend(LopdfBackend::load_bytes(data)?))
    }

    /// Load a PDF from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::with_backend(LopdfBackend::load_reader(reader)?))
    }
}

impl<B: PdfBackend> Locator<B> {
    /// Wrap an existing backend with default options.
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            options: parser::default_options().clone(),
        }
    }

    /// Replace all options.
    pub fn with_options(mut self, options: LocateOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a target string to locate on every page.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.options = self.options.with_target(target);
        self
    }

    /// Replace the target strings.
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = self.options.with_targets(targets);
        self
    }

    /// Restrict processing to some pages.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.options = self.options.with_pages(pages);
        self
    }

    /// Include Stamp/Image annotation rectangles as regions.
    pub fn with_annotations(mut self, include: bool) -> Self {
        self.options = self.options.with_annotations(include);
        self
    }

    /// Also report page text and positioned text lines.
    pub fn with_text(mut self, include: bool) -> Self {
        self.options = self.options.with_text(include);
        self
    }

    /// Set the fuzzy-match chunking.
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.options = self.options.with_granularity(granularity);
        self
    }

    /// Keep going when a page cannot be read at all.
    pub fn lenient(mut self) -> Self {
        self.options = self.options.lenient();
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.options = self.options.sequential();
        self
    }

    /// Current options.
    pub fn options(&self) -> &LocateOptions {
        &self.options
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.backend.pages().len() as u32
    }

    /// PDF version, when the backend knows it.
    pub fn version(&self) -> Option<String> {
        self.backend.version()
    }

    /// Locate regions and spans on every selected page.
    pub fn locate(&self) -> Result<DocumentRegions> {
        parser::locate_document(&self.backend, &self.options)
    }

    /// Locate regions and spans on one page (1-indexed).
    pub fn locate_page(&self, page_number: u32) -> Result<PageRegions> {
        parser::locate_page(&self.backend, page_number, &self.options)
    }

    /// Best location of `target` over every selected page.
    pub fn locate_across_pages(&self, target: &str) -> Result<Option<TextSpan>> {
        parser::locate_across_pages(&self.backend, target, &self.options)
    }

    /// Locate and render as JSON.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        render::to_json(&self.locate()?, format)
    }
}
