//! Output model for located content.
//!
//! Everything here is plain data: rectangles, regions and spans tagged with
//! their page index. The model carries no references back into the PDF and
//! serializes with serde.

mod document;
mod geometry;
mod page;
mod region;
mod span;

pub use document::DocumentRegions;
pub use geometry::{NormalizedRect, PdfRect, COORD_EPSILON};
pub use page::PageRegions;
pub use region::{NormalizedRegion, SourceKind};
pub use span::{MatchMethod, TextLine, TextSpan};
