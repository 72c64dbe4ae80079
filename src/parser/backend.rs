//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface to the PDF object model, isolating the
//! concrete PDF library (lopdf) from the locating logic. Everything the
//! locator needs from a page (XObject fields, content bytes, the media box,
//! a text layer and annotations) goes through [`PdfBackend`].

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use super::text_layer::{runs_from_content, TextLayer, TextRun, TextSearch, TextSelection};
use crate::detect::{detect_format_from_bytes, detect_format_from_path};
use crate::error::{Error, Result};
use crate::model::PdfRect;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Raw field reads for one named XObject in a page's resources.
///
/// Fields are `None` when absent or unreadable; classification happens in
/// [`ResourceCatalog`](super::ResourceCatalog).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XObjectEntry {
    /// Resource name, without the leading slash
    pub name: String,
    /// Declared `/Subtype`
    pub subtype: Option<String>,
    /// Declared `/Width`
    pub width: Option<i64>,
    /// Declared `/Height`
    pub height: Option<i64>,
    /// Declared `/Filter` (a single name or an array of names)
    pub filters: Vec<String>,
}

impl XObjectEntry {
    /// An entry with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// An image XObject entry with declared pixel dimensions.
    pub fn image(name: impl Into<String>, width: i64, height: i64) -> Self {
        Self::new(name)
            .with_subtype("Image")
            .with_dimensions(width, height)
    }

    /// Set the declared subtype.
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    /// Set the declared pixel dimensions.
    pub fn with_dimensions(mut self, width: i64, height: i64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Add a declared filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }
}

/// An annotation with a rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationEntry {
    /// Zero-based position in the page's `/Annots` array
    pub index: usize,
    /// Declared `/Subtype`
    pub subtype: String,
    /// `/Rect` in PDF user space
    pub rect: PdfRect,
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration and per-page object-model reads
/// without exposing any concrete PDF library types.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId), page numbers 1-indexed.
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// List the named XObjects in a page's resource dictionary.
    ///
    /// An error means the resource dictionary itself could not be read.
    fn page_xobjects(&self, page: PageId) -> Result<Vec<XObjectEntry>>;

    /// Return the decoded content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Return the page's media box.
    fn media_box(&self, page: PageId) -> Result<PdfRect>;

    /// Build the page's positioned text layer.
    fn text_layer(&self, page: PageId) -> Result<TextLayer>;

    /// Return the page's annotations that carry a rectangle.
    fn page_annotations(&self, page: PageId) -> Vec<AnnotationEntry>;

    /// PDF version, when known.
    fn version(&self) -> Option<String> {
        None
    }

    /// Case-insensitive search for `needle` on a page.
    fn find_text(&self, page: PageId, needle: &str) -> Vec<TextSelection> {
        self.text_layer(page)
            .map(|layer| layer.find_text(needle))
            .unwrap_or_default()
    }

    /// Whole-page plain text.
    fn page_text(&self, page: PageId) -> String {
        self.text_layer(page)
            .map(|layer| layer.plain_text())
            .unwrap_or_default()
    }
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // Try UTF-16BE first (BOM marker)
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    // Try UTF-8
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Fallback: Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// LopdfBackend: concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

/// Inherited page attributes are looked up at most this many levels up.
const MAX_PARENT_DEPTH: usize = 32;

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
    version: String,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = detect_format_from_path(path)?;
        let doc = LopdfDocument::load(path)?;
        Self::from_document(doc, format.version)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let format = detect_format_from_bytes(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        Self::from_document(doc, format.version)
    }

    /// Load from a reader.
    pub fn load_reader<R: std::io::Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load_bytes(&data)
    }

    fn from_document(doc: LopdfDocument, version: String) -> Result<Self> {
        // lopdf 0.34 cannot decrypt, so an encrypted document has no
        // readable content streams.
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        Ok(Self { doc, version })
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Decode a text byte sequence using the font's encoding on the given page.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    pub fn decode_text(
        &self,
        fonts: &BTreeMap<Vec<u8>, &Dictionary>,
        font_name: &[u8],
        bytes: &[u8],
    ) -> String {
        if let Some(font_dict) = fonts.get(font_name) {
            if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }

    /// Follow a reference to the object it names.
    fn deref<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(r) => self.doc.get_object(*r).ok(),
            other => Some(other),
        }
    }

    fn deref_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.deref(obj)? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Look up a page attribute, walking the `/Parent` chain for
    /// inheritable keys.
    fn inherited(&self, page: PageId, key: &[u8]) -> Option<&Object> {
        let mut dict = self.doc.get_dictionary(page).ok()?;
        for _ in 0..MAX_PARENT_DEPTH {
            if let Ok(value) = dict.get(key) {
                return self.deref(value);
            }
            let parent = dict.get(b"Parent").ok()?;
            dict = self.deref_dict(parent)?;
        }
        None
    }

    fn number(&self, obj: &Object) -> Option<f64> {
        match self.deref(obj)? {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r as f64),
            _ => None,
        }
    }

    fn rect_from_array(&self, obj: &Object) -> Option<PdfRect> {
        let arr = self.deref(obj)?.as_array().ok()?;
        if arr.len() < 4 {
            return None;
        }
        let v: Vec<f64> = arr.iter().take(4).filter_map(|o| self.number(o)).collect();
        if v.len() != 4 {
            return None;
        }
        Some(PdfRect::from_corners(v[0], v[1], v[2], v[3]))
    }

    fn xobject_entry(&self, name: &[u8], obj: &Object) -> XObjectEntry {
        let mut entry = XObjectEntry::new(String::from_utf8_lossy(name));

        let Some(dict) = self.deref_dict(obj) else {
            log::debug!("XObject /{} is not a stream", entry.name);
            return entry;
        };

        entry.subtype = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| self.deref(o))
            .and_then(|o| o.as_name_str().ok())
            .map(String::from);
        entry.width = dict
            .get(b"Width")
            .ok()
            .and_then(|o| self.number(o))
            .map(|w| w as i64);
        entry.height = dict
            .get(b"Height")
            .ok()
            .and_then(|o| self.number(o))
            .map(|h| h as i64);
        entry.filters = match dict.get(b"Filter").ok().and_then(|o| self.deref(o)) {
            Some(Object::Name(n)) => vec![String::from_utf8_lossy(n).to_string()],
            Some(Object::Array(arr)) => arr
                .iter()
                .filter_map(|o| self.deref(o))
                .filter_map(|o| o.as_name_str().ok())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        };

        entry
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_xobjects(&self, page: PageId) -> Result<Vec<XObjectEntry>> {
        let Some(resources) = self.inherited(page, b"Resources") else {
            return Ok(Vec::new());
        };
        let resources = match resources {
            Object::Dictionary(d) => d,
            _ => {
                return Err(Error::PdfParse(
                    "Resources is not a dictionary".to_string(),
                ))
            }
        };

        let Ok(xobjects) = resources.get(b"XObject") else {
            return Ok(Vec::new());
        };
        let xobjects = self
            .deref_dict(xobjects)
            .ok_or_else(|| Error::PdfParse("XObject is not a dictionary".to_string()))?;

        Ok(xobjects
            .iter()
            .map(|(name, obj)| self.xobject_entry(name, obj))
            .collect())
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        // A page without contents is blank, not broken.
        let Ok(contents) = page_dict.get(b"Contents") else {
            return Ok(Vec::new());
        };

        match self.deref(contents) {
            Some(Object::Stream(s)) => Ok(stream_bytes(s)),
            Some(Object::Array(arr)) => {
                let mut content = Vec::new();
                for obj in arr {
                    match self.deref(obj) {
                        Some(Object::Stream(s)) => {
                            content.extend_from_slice(&stream_bytes(s));
                            content.push(b'\n');
                        }
                        _ => log::warn!("Skipping /Contents entry that is not a stream"),
                    }
                }
                Ok(content)
            }
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn media_box(&self, page: PageId) -> Result<PdfRect> {
        match self
            .inherited(page, b"MediaBox")
            .and_then(|o| self.rect_from_array(o))
        {
            Some(rect) if !rect.is_degenerate() => Ok(rect),
            Some(rect) => Err(Error::PdfParse(format!(
                "Degenerate media box {}x{}",
                rect.width, rect.height
            ))),
            None => {
                // Default to Letter size
                log::debug!("Page {:?} has no MediaBox, assuming Letter", page);
                Ok(PdfRect::letter())
            }
        }
    }

    fn text_layer(&self, page: PageId) -> Result<TextLayer> {
        let content = self.page_content(page)?;
        let fonts = self.doc.get_page_fonts(page).unwrap_or_default();

        let runs: Vec<TextRun> = runs_from_content(&content, |font, bytes| {
            self.decode_text(&fonts, font.as_bytes(), bytes)
        });
        Ok(TextLayer::new(runs))
    }

    fn page_annotations(&self, page: PageId) -> Vec<AnnotationEntry> {
        let Ok(page_dict) = self.doc.get_dictionary(page) else {
            return Vec::new();
        };
        let Some(annots) = page_dict
            .get(b"Annots")
            .ok()
            .and_then(|o| self.deref(o))
            .and_then(|o| o.as_array().ok())
        else {
            return Vec::new();
        };

        annots
            .iter()
            .enumerate()
            .filter_map(|(index, obj)| {
                let dict = self.deref_dict(obj)?;
                let subtype = dict.get(b"Subtype").ok()?.as_name_str().ok()?.to_string();
                let rect = self.rect_from_array(dict.get(b"Rect").ok()?)?;
                Some(AnnotationEntry {
                    index,
                    subtype,
                    rect,
                })
            })
            .collect()
    }

    fn version(&self) -> Option<String> {
        Some(self.version.clone())
    }
}

/// Decoded bytes of a content stream.
///
/// lopdf reports an error for streams without a `/Filter`; their raw bytes
/// are the content.
fn stream_bytes(stream: &Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

// ---------------------------------------------------------------------------
// MemoryBackend: an object model built in memory
// ---------------------------------------------------------------------------

/// One page of a [`MemoryBackend`].
#[derive(Debug, Clone)]
pub struct MemoryPage {
    /// Page media box
    pub media_box: PdfRect,
    /// XObject listing; `Err` simulates an unreadable resource dictionary
    pub xobjects: std::result::Result<Vec<XObjectEntry>, String>,
    /// Decoded content stream
    pub content: Vec<u8>,
    /// Positioned text runs
    pub runs: Vec<TextRun>,
    /// Annotations
    pub annotations: Vec<AnnotationEntry>,
}

impl MemoryPage {
    /// An empty page with the given media box.
    pub fn new(media_box: PdfRect) -> Self {
        Self {
            media_box,
            xobjects: Ok(Vec::new()),
            content: Vec::new(),
            runs: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Add an XObject entry.
    pub fn with_xobject(mut self, entry: XObjectEntry) -> Self {
        if let Ok(entries) = &mut self.xobjects {
            entries.push(entry);
        }
        self
    }

    /// Mark the resource dictionary as unreadable.
    pub fn with_broken_resources(mut self, reason: impl Into<String>) -> Self {
        self.xobjects = Err(reason.into());
        self
    }

    /// Set the content stream.
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self
    }

    /// Add a positioned text run.
    pub fn with_text(mut self, text: impl Into<String>, bbox: PdfRect) -> Self {
        self.runs.push(TextRun::new(text, bbox));
        self
    }

    /// Add an annotation.
    pub fn with_annotation(mut self, subtype: impl Into<String>, rect: PdfRect) -> Self {
        let index = self.annotations.len();
        self.annotations.push(AnnotationEntry {
            index,
            subtype: subtype.into(),
            rect,
        });
        self
    }
}

/// A [`PdfBackend`] over pages built in memory.
///
/// Useful for callers that bring their own PDF loader, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    pages: Vec<MemoryPage>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page.
    pub fn with_page(mut self, page: MemoryPage) -> Self {
        self.pages.push(page);
        self
    }

    /// Append a page.
    pub fn push_page(&mut self, page: MemoryPage) {
        self.pages.push(page);
    }

    fn page(&self, page: PageId) -> Result<&MemoryPage> {
        let count = self.pages.len() as u32;
        page.0
            .checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .ok_or(Error::PageOutOfRange(page.0, count))
    }
}

impl PdfBackend for MemoryBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        (1..=self.pages.len() as u32).map(|n| (n, (n, 0))).collect()
    }

    fn page_xobjects(&self, page: PageId) -> Result<Vec<XObjectEntry>> {
        self.page(page)?.xobjects.clone().map_err(Error::PdfParse)
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>> {
        Ok(self.page(page)?.content.clone())
    }

    fn media_box(&self, page: PageId) -> Result<PdfRect> {
        Ok(self.page(page)?.media_box)
    }

    fn text_layer(&self, page: PageId) -> Result<TextLayer> {
        Ok(TextLayer::new(self.page(page)?.runs.clone()))
    }

    fn page_annotations(&self, page: PageId) -> Vec<AnnotationEntry> {
        self.page(page)
            .map(|p| p.annotations.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        // 0xE9 = 'é' in Latin-1
        let bytes = vec![0x48, 0x65, 0x6C, 0x6C, 0xE9];
        assert_eq!(decode_text_simple(&bytes), "Hellé");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_simple(&bytes), "Hi");
    }

    #[test]
    fn test_memory_backend_pages() {
        let backend = MemoryBackend::new()
            .with_page(MemoryPage::new(PdfRect::letter()))
            .with_page(
                MemoryPage::new(PdfRect::new(0.0, 0.0, 200.0, 200.0))
                    .with_xobject(XObjectEntry::image("Im1", 100, 100))
                    .with_content("q 2 0 0 2 10 20 cm /Im1 Do Q"),
            );

        let pages = backend.pages();
        assert_eq!(pages.len(), 2);
        let second = pages[&2];
        assert_eq!(backend.media_box(second).unwrap().width, 200.0);
        assert_eq!(backend.page_xobjects(second).unwrap().len(), 1);
        assert!(matches!(
            backend.page_content((3, 0)),
            Err(Error::PageOutOfRange(3, 2))
        ));
    }

    #[test]
    fn test_memory_backend_broken_resources() {
        let backend = MemoryBackend::new()
            .with_page(MemoryPage::new(PdfRect::letter()).with_broken_resources("dangling"));
        assert!(backend.page_xobjects((1, 0)).is_err());
    }

    #[test]
    fn test_memory_backend_text_search() {
        let backend = MemoryBackend::new().with_page(
            MemoryPage::new(PdfRect::letter())
                .with_text("Hello World", PdfRect::new(72.0, 700.0, 110.0, 12.0)),
        );
        assert_eq!(backend.find_text((1, 0), "hello").len(), 1);
        assert_eq!(backend.page_text((1, 0)), "Hello World");
    }
}
