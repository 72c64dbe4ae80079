//! Error types for the pdfloc library.
//!
//! Two kinds of failure exist. [`Error`] is fatal and only raised outside a
//! page walk (loading the document, reading a page that does not exist,
//! serializing output). [`Degradation`] records everything that went wrong
//! *inside* a page walk; those are absorbed into a best-effort result and
//! attached to the page output instead of being returned as errors.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pdfloc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that can occur while loading or driving a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error reading the PDF object model.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Error while rendering output (JSON).
    #[error("Rendering error: {0}")]
    Render(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

/// A non-fatal problem absorbed while processing one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// The resource dictionary could not be read; the catalog is empty.
    MalformedResource { reason: String },

    /// A content-stream token group was not understood and was skipped.
    UnparseableOperator { operator: String, offset: usize },

    /// A `Q` arrived with nothing saved; the current transform was kept.
    UnbalancedRestore { offset: usize },

    /// A cataloged image got estimated geometry instead of a resolved one.
    UnresolvedPlacement { name: String, reason: String },

    /// None of the search tiers found the target text.
    NoTextMatch { target: String },
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Degradation::MalformedResource { reason } => {
                write!(f, "malformed resource dictionary: {}", reason)
            }
            Degradation::UnparseableOperator { operator, offset } => {
                write!(f, "skipped operator '{}' at byte {}", operator, offset)
            }
            Degradation::UnbalancedRestore { offset } => {
                write!(f, "unbalanced Q at byte {}", offset)
            }
            Degradation::UnresolvedPlacement { name, reason } => {
                write!(f, "estimated placement for /{}: {}", name, reason)
            }
            Degradation::NoTextMatch { target } => {
                write!(f, "no match for '{}'", target)
            }
        }
    }
}
