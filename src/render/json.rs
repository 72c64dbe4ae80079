//! JSON rendering for located regions.

use crate::error::{Error, Result};
use crate::model::DocumentRegions;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert located regions to JSON.
pub fn to_json(doc: &DocumentRegions, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(doc),
        JsonFormat::Compact => serde_json::to_string(doc),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NormalizedRect, NormalizedRegion, PageRegions, PdfRect, TextLine};

    fn sample() -> DocumentRegions {
        let mut doc = DocumentRegions::new();
        doc.page_count = 1;
        let mut page = PageRegions::new(0, PdfRect::letter());
        page.regions.push(NormalizedRegion::resolved(
            "Im1",
            0,
            NormalizedRect::new(0.1, 0.2, 0.3, 0.4),
            PdfRect::new(61.2, 316.8, 183.6, 316.8),
            1.0,
        ));
        doc.add_page(page);
        doc
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&sample(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"Im1\""));
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&sample(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_json_parses_back() {
        let doc = sample();
        let json = to_json(&doc, JsonFormat::Compact).unwrap();
        let back: DocumentRegions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_text_fields_only_when_present() {
        let json = to_json(&sample(), JsonFormat::Compact).unwrap();
        assert!(!json.contains("\"text\""));

        let mut doc = sample();
        doc.pages[0].text = Some("Harbor survey".to_string());
        doc.pages[0]
            .lines
            .push(TextLine::new("Harbor survey", NormalizedRect::new(0.1, 0.1, 0.3, 0.02)));

        let json = to_json(&doc, JsonFormat::Compact).unwrap();
        assert!(json.contains("\"text\":\"Harbor survey\""));
        assert!(json.contains("\"lines\":[{\"text\":\"Harbor survey\""));
        let back: DocumentRegions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
