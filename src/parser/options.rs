//! Locating options and policy constants.
//!
//! The tolerance and sizing ratios below are empirical; nothing in the PDF
//! format dictates them. They are kept together so callers can tune them.

use std::ops::RangeInclusive;
use std::sync::OnceLock;

use regex::Regex;

/// Process-wide state built once on first use.
struct SharedDefaults {
    options: LocateOptions,
    token_pattern: Regex,
}

static SHARED: OnceLock<SharedDefaults> = OnceLock::new();

fn shared() -> &'static SharedDefaults {
    SHARED.get_or_init(|| SharedDefaults {
        options: LocateOptions::default(),
        token_pattern: Regex::new(r"[\p{L}\p{N}]+").expect("valid token regex"),
    })
}

/// Shared default options, for callers that do not configure anything.
pub fn default_options() -> &'static LocateOptions {
    &shared().options
}

/// Lowercase-alphanumeric token pattern used by fuzzy matching.
pub(crate) fn token_pattern() -> &'static Regex {
    &shared().token_pattern
}

/// Options for locating content in PDF documents.
#[derive(Debug, Clone)]
pub struct LocateOptions {
    /// How far (as a page fraction) a resolved rectangle may overflow any
    /// page edge before it is clamped
    pub overflow_tolerance: f64,

    /// Fallback rectangle cap as a fraction of page width
    pub fallback_max_width: f64,

    /// Fallback rectangle cap as a fraction of page height
    pub fallback_max_height: f64,

    /// Top of the band fallback rectangles are centered in
    pub fallback_top_margin: f64,

    /// Confidence assigned to estimated regions
    pub fallback_confidence: f64,

    /// Confidence assigned to resolved regions
    pub resolved_confidence: f64,

    /// Confidence assigned to resolved regions that had to be clamped
    pub clamped_confidence: f64,

    /// Diagonal terms above this mark a `[w 0 0 h 0 0] cm` as a pixel
    /// dimension hint rather than a geometric scale
    pub dimension_hint_threshold: f64,

    /// Prefix length (characters) used by the partial search tier
    pub partial_prefix_chars: usize,

    /// Quality reported for partial matches
    pub partial_quality: f64,

    /// Minimum similarity for the standalone fuzzy search
    pub fuzzy_threshold: f64,

    /// Minimum similarity when fuzzy search is the last resort after
    /// exact and partial search failed
    pub fuzzy_fallback_threshold: f64,

    /// Chunking used to build fuzzy candidates
    pub granularity: Granularity,

    /// Text targets to locate on every processed page
    pub targets: Vec<String>,

    /// Also report Stamp/Image annotation rectangles
    pub include_annotations: bool,

    /// Also report page text and positioned text lines
    pub include_text: bool,

    /// Error handling mode for document-level failures
    pub error_mode: ErrorMode,

    /// Process pages in parallel
    pub parallel: bool,

    /// Which pages to process (1-indexed)
    pub pages: PageSelection,
}

impl LocateOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the overflow tolerance.
    pub fn with_overflow_tolerance(mut self, tolerance: f64) -> Self {
        self.overflow_tolerance = tolerance.max(0.0);
        self
    }

    /// Set the fallback size caps (fractions of page width and height).
    pub fn with_fallback_caps(mut self, max_width: f64, max_height: f64) -> Self {
        self.fallback_max_width = max_width.clamp(0.0, 1.0);
        self.fallback_max_height = max_height.clamp(0.0, 1.0);
        self
    }

    /// Set the confidence for estimated regions.
    pub fn with_fallback_confidence(mut self, confidence: f64) -> Self {
        self.fallback_confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the dimension-hint threshold.
    pub fn with_dimension_hint_threshold(mut self, threshold: f64) -> Self {
        self.dimension_hint_threshold = threshold;
        self
    }

    /// Set the partial search prefix length.
    pub fn with_partial_prefix(mut self, chars: usize) -> Self {
        self.partial_prefix_chars = chars;
        self
    }

    /// Set both fuzzy thresholds.
    pub fn with_fuzzy_thresholds(mut self, standalone: f64, fallback: f64) -> Self {
        self.fuzzy_threshold = standalone;
        self.fuzzy_fallback_threshold = fallback;
        self
    }

    /// Set fuzzy candidate granularity.
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Add a text target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    /// Replace the text targets.
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable annotation regions.
    pub fn with_annotations(mut self, include: bool) -> Self {
        self.include_annotations = include;
        self
    }

    /// Enable or disable page text and line output.
    pub fn with_text(mut self, include: bool) -> Self {
        self.include_text = include;
        self
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (unreadable pages become empty results).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable or disable parallel page processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            overflow_tolerance: 0.10,
            fallback_max_width: 0.60,
            fallback_max_height: 0.40,
            fallback_top_margin: 0.10,
            fallback_confidence: 0.40,
            resolved_confidence: 1.0,
            clamped_confidence: 0.80,
            dimension_hint_threshold: 100.0,
            partial_prefix_chars: 50,
            partial_quality: 0.80,
            fuzzy_threshold: 0.60,
            fuzzy_fallback_threshold: 0.70,
            granularity: Granularity::Word,
            targets: Vec::new(),
            include_annotations: false,
            include_text: false,
            error_mode: ErrorMode::Strict,
            parallel: false,
            pages: PageSelection::All,
        }
    }
}

/// Error handling mode for document-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Propagate the error
    #[default]
    Strict,
    /// Log the error and emit an empty page
    Lenient,
}

/// How page text is cut into fuzzy-match candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// Sliding windows of the target's word count
    #[default]
    Word,
    /// Sentences split on `.`, `!` and `?`
    Sentence,
    /// Paragraphs split on blank lines
    Paragraph,
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "word" => Ok(Granularity::Word),
            "sentence" => Ok(Granularity::Sentence),
            "paragraph" => Ok(Granularity::Paragraph),
            other => Err(format!("Unknown granularity: {}", other)),
        }
    }
}

/// Page selection.
#[derive(Debug, Clone, Default)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start: u32 = start.trim().parse().map_err(|_| "Invalid start page")?;
                let end: u32 = end.trim().parse().map_err(|_| "Invalid end page")?;
                if start == 0 || end < start {
                    return Err(format!("Invalid page range: {}", s));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            let (start, end) = match part.split_once('-') {
                Some((a, b)) => (a.trim(), b.trim()),
                None => (part, part),
            };
            let start: u32 = start.parse().map_err(|_| "Invalid page number")?;
            let end: u32 = end.parse().map_err(|_| "Invalid page number")?;
            if start == 0 || end < start {
                return Err(format!("Invalid page range: {}", part));
            }
            pages.extend(start..=end);
        }

        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}
