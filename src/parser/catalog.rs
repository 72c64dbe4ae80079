//! Classification of a page's XObjects into image descriptors.

use std::collections::BTreeMap;

use super::backend::XObjectEntry;

/// Filters taken as evidence of image data when no subtype is declared.
pub const IMAGE_FILTERS: &[&str] = &[
    "DCTDecode",
    "JPXDecode",
    "FlateDecode",
    "LZWDecode",
    "CCITTFaxDecode",
    "JBIG2Decode",
    "RunLengthDecode",
];

/// Which rule classified an XObject as an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// `/Subtype /Image`
    Subtype,
    /// Positive `/Width` and `/Height` without a subtype
    Dimensions,
    /// An image filter without a subtype
    Filter,
}

/// An XObject classified as an image.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Resource name, without the leading slash
    pub name: String,
    /// Declared pixel width (0 when absent)
    pub pixel_width: i64,
    /// Declared pixel height (0 when absent)
    pub pixel_height: i64,
    /// First declared filter, if any
    pub filter_kind: Option<String>,
    /// Declared subtype, if any
    pub declared_subtype: Option<String>,
    /// Rule that matched
    pub classification: Classification,
}

impl StreamDescriptor {
    /// Whether the declared pixel dimensions can size a placement.
    pub fn has_dimensions(&self) -> bool {
        self.pixel_width > 0 && self.pixel_height > 0
    }

    /// Width over height, when both are positive.
    pub fn aspect_ratio(&self) -> Option<f64> {
        self.has_dimensions()
            .then(|| self.pixel_width as f64 / self.pixel_height as f64)
    }
}

/// Classify one XObject. First match wins: subtype, then dimensions, then
/// filter.
///
/// An XObject that declares a subtype other than `Image` (a form, a
/// PostScript XObject) is never an image, whatever its other fields say:
/// forms are routinely Flate-compressed.
pub fn classify(entry: &XObjectEntry) -> Option<StreamDescriptor> {
    let classification = match entry.subtype.as_deref() {
        Some("Image") => Classification::Subtype,
        Some(_) => return None,
        None if entry.width.unwrap_or(0) > 0 && entry.height.unwrap_or(0) > 0 => {
            Classification::Dimensions
        }
        None if entry
            .filters
            .iter()
            .any(|f| IMAGE_FILTERS.contains(&f.as_str())) =>
        {
            Classification::Filter
        }
        None => return None,
    };

    Some(StreamDescriptor {
        name: entry.name.clone(),
        pixel_width: entry.width.unwrap_or(0),
        pixel_height: entry.height.unwrap_or(0),
        filter_kind: entry.filters.first().cloned(),
        declared_subtype: entry.subtype.clone(),
        classification,
    })
}

/// The image XObjects of one page, keyed by resource name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceCatalog {
    images: BTreeMap<String, StreamDescriptor>,
}

impl ResourceCatalog {
    /// An empty catalog.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from an XObject listing, keeping only images.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = XObjectEntry>,
    {
        let mut images = BTreeMap::new();
        for entry in entries {
            match classify(&entry) {
                Some(descriptor) => {
                    log::trace!(
                        "/{} classified as image by {:?}",
                        descriptor.name,
                        descriptor.classification
                    );
                    images.insert(descriptor.name.clone(), descriptor);
                }
                None => log::trace!("/{} is not an image", entry.name),
            }
        }
        Self { images }
    }

    /// Look up an image by resource name.
    pub fn get(&self, name: &str) -> Option<&StreamDescriptor> {
        self.images.get(name)
    }

    /// Check if a resource name is a cataloged image.
    pub fn contains(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }

    /// (name, descriptor) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StreamDescriptor)> {
        self.images.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Check if the catalog has no images.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
