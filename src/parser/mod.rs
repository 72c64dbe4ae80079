//! Content location: from a page's object model to image regions and text
//! spans.

mod backend;
mod catalog;
mod content;
mod geometry;
mod matrix;
mod options;
mod pipeline;
mod text_layer;
mod text_locator;
mod walker;

pub use backend::{
    decode_text_simple, AnnotationEntry, LopdfBackend, MemoryBackend, MemoryPage, PageId,
    PdfBackend, XObjectEntry,
};
pub use catalog::{classify, Classification, ResourceCatalog, StreamDescriptor, IMAGE_FILTERS};
pub use content::{operations, parse_content, ContentItem, ContentOp, ContentParser, Operand};
pub use geometry::{GeometryResolver, Unresolved};
pub use matrix::{concatenate, AffineMatrix, MatrixStack};
pub use options::{default_options, ErrorMode, Granularity, LocateOptions, PageSelection};
pub use pipeline::{
    locate_across_pages, locate_document, locate_page, ContentExtractionPipeline, PageInput,
};
pub use text_layer::{
    runs_from_content, runs_from_operations, TextLayer, TextRun, TextSearch, TextSelection,
};
pub use text_locator::{candidates, jaccard, tokenize, TextSpanLocator};
pub use walker::{ContentStreamWalker, ImagePlacement, WalkOutput};
