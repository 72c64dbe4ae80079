//! Positioned page text and the substring search primitive.

use std::collections::BTreeMap;

use super::content::{operations, ContentOp, Operand};
use super::matrix::{AffineMatrix, MatrixStack};
use crate::model::PdfRect;

/// Average glyph advance as a fraction of the font size.
///
/// Glyph widths are not read from font programs, so run widths are an
/// estimate.
const AVG_GLYPH_WIDTH: f64 = 0.5;

/// Portion of the font size below the baseline.
const DESCENT: f64 = 0.2;

/// TJ adjustments above this many thousandths of an em read as a word gap.
const TJ_SPACE_THRESHOLD: f64 = 200.0;

/// A run of text painted by one text-showing operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Decoded text
    pub text: String,
    /// Bounding box in PDF user space
    pub bbox: PdfRect,
}

impl TextRun {
    /// Create a new run.
    pub fn new(text: impl Into<String>, bbox: PdfRect) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// One hit of a text search.
///
/// A hit that crosses runs has one fragment per run.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSelection {
    /// Matched text, lowercased with whitespace collapsed
    pub text: String,
    /// Per-run rectangles in PDF user space
    pub fragments: Vec<PdfRect>,
}

impl TextSelection {
    /// Union of all fragments.
    pub fn bounds(&self) -> Option<PdfRect> {
        PdfRect::union_all(self.fragments.iter())
    }
}

/// The text primitive the span locator searches through.
pub trait TextSearch {
    /// Case-insensitive substring search.
    fn find_text(&self, needle: &str) -> Vec<TextSelection>;

    /// Whole-page plain text.
    fn plain_text(&self) -> String;
}

/// Positioned text runs of one page, in content-stream order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayer {
    runs: Vec<TextRun>,
}

/// Page text flattened for searching: lowercased, whitespace collapsed,
/// each char tagged with the (run, char) it came from.
struct SearchIndex {
    chars: Vec<char>,
    origin: Vec<Option<(usize, usize)>>,
}

impl TextLayer {
    /// Create a layer from runs.
    pub fn new(runs: Vec<TextRun>) -> Self {
        Self { runs }
    }

    /// The runs.
    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    /// Check if the layer has no runs.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn visible_runs(&self) -> impl Iterator<Item = &TextRun> {
        self.runs.iter().filter(|r| !r.text.trim().is_empty())
    }

    /// Runs merged into visual lines, in stream order.
    ///
    /// A run joins the current line when its vertical center is within half
    /// a line height of the previous run's.
    pub fn lines(&self) -> Vec<TextRun> {
        let mut lines: Vec<TextRun> = Vec::new();
        let mut prev: Option<PdfRect> = None;

        for run in self.visible_runs() {
            let joins = prev.is_some_and(|p| on_same_line(&p, &run.bbox));
            if let (true, Some(line)) = (joins, lines.last_mut()) {
                line.text.push(' ');
                line.text.push_str(run.text.trim());
                line.bbox = line.bbox.union(&run.bbox);
            } else {
                lines.push(TextRun::new(run.text.trim(), run.bbox));
            }
            prev = Some(run.bbox);
        }

        lines
    }

    fn index(&self) -> SearchIndex {
        let mut chars = Vec::new();
        let mut origin = Vec::new();
        let mut pending_space = false;

        for (ri, run) in self.runs.iter().enumerate() {
            if !chars.is_empty() {
                pending_space = true;
            }
            for (ci, c) in run.text.chars().enumerate() {
                if c.is_whitespace() {
                    pending_space |= !chars.is_empty();
                    continue;
                }
                if pending_space {
                    chars.push(' ');
                    origin.push(None);
                    pending_space = false;
                }
                for lc in c.to_lowercase() {
                    chars.push(lc);
                    origin.push(Some((ri, ci)));
                }
            }
        }

        SearchIndex { chars, origin }
    }

    /// Slice of a run's box covering chars `start..end`, by char proportion.
    fn fragment(&self, run_index: usize, start: usize, end: usize) -> PdfRect {
        let run = &self.runs[run_index];
        let len = run.text.chars().count().max(1) as f64;
        let x0 = run.bbox.x + run.bbox.width * (start as f64 / len);
        let x1 = run.bbox.x + run.bbox.width * (end as f64 / len);
        PdfRect::new(x0, run.bbox.y, x1 - x0, run.bbox.height)
    }
}

fn on_same_line(a: &PdfRect, b: &PdfRect) -> bool {
    let line_height = a.height.max(b.height).max(1.0);
    ((a.y + a.height / 2.0) - (b.y + b.height / 2.0)).abs() < line_height / 2.0
}

fn normalize_needle(needle: &str) -> Vec<char> {
    needle
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .flat_map(char::to_lowercase)
        .collect()
}

impl TextSearch for TextLayer {
    fn find_text(&self, needle: &str) -> Vec<TextSelection> {
        let needle = normalize_needle(needle);
        if needle.is_empty() {
            return Vec::new();
        }

        let index = self.index();
        let mut selections = Vec::new();
        let mut pos = 0;

        while pos + needle.len() <= index.chars.len() {
            if index.chars[pos..pos + needle.len()] != needle[..] {
                pos += 1;
                continue;
            }

            let mut per_run: BTreeMap<usize, (usize, usize)> = BTreeMap::new();
            for (ri, ci) in index.origin[pos..pos + needle.len()].iter().flatten() {
                per_run
                    .entry(*ri)
                    .and_modify(|(lo, hi)| {
                        *lo = (*lo).min(*ci);
                        *hi = (*hi).max(*ci);
                    })
                    .or_insert((*ci, *ci));
            }

            selections.push(TextSelection {
                text: needle.iter().collect(),
                fragments: per_run
                    .into_iter()
                    .map(|(ri, (lo, hi))| self.fragment(ri, lo, hi + 1))
                    .collect(),
            });
            pos += needle.len();
        }

        selections
    }

    fn plain_text(&self) -> String {
        let mut out = String::new();
        let mut prev: Option<&PdfRect> = None;

        for run in self.visible_runs() {
            if let Some(p) = prev {
                let line_height = p.height.max(run.bbox.height).max(1.0);
                if on_same_line(p, &run.bbox) {
                    out.push(' ');
                } else if p.y - run.bbox.top() > line_height {
                    out.push_str("\n\n");
                } else {
                    out.push('\n');
                }
            }
            out.push_str(run.text.trim());
            prev = Some(&run.bbox);
        }

        out
    }
}

/// Text state tracked while walking a content stream.
struct TextState {
    tm: AffineMatrix,
    tlm: AffineMatrix,
    font: String,
    size: f64,
    leading: f64,
    in_text: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            tm: AffineMatrix::identity(),
            tlm: AffineMatrix::identity(),
            font: String::new(),
            size: 12.0,
            leading: 0.0,
            in_text: false,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f64, ty: f64) {
        self.tlm = self.tlm.compose(&AffineMatrix::translation(tx, ty));
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        // Producers that never set TL still expect T* to move down a line.
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.size
        };
        self.move_line(0.0, -leading);
    }

    /// Record a run and advance the text matrix past it.
    fn show(&mut self, text: String, adjustment: f64, ctm: &AffineMatrix, runs: &mut Vec<TextRun>) {
        let advance = text.chars().count() as f64 * self.size * AVG_GLYPH_WIDTH + adjustment;

        if self.in_text && !text.trim().is_empty() {
            let trm = ctm.compose(&self.tm);
            let corners = [
                trm.apply(0.0, -DESCENT * self.size),
                trm.apply(advance, -DESCENT * self.size),
                trm.apply(0.0, (1.0 - DESCENT) * self.size),
                trm.apply(advance, (1.0 - DESCENT) * self.size),
            ];
            let (mut x0, mut y0) = corners[0];
            let (mut x1, mut y1) = corners[0];
            for (x, y) in &corners[1..] {
                x0 = x0.min(*x);
                y0 = y0.min(*y);
                x1 = x1.max(*x);
                y1 = y1.max(*y);
            }
            runs.push(TextRun::new(text, PdfRect::from_corners(x0, y0, x1, y1)));
        }

        self.tm = self.tm.compose(&AffineMatrix::translation(advance, 0.0));
    }
}

fn numbers(operands: &[Operand]) -> Vec<f64> {
    operands.iter().filter_map(Operand::as_number).collect()
}

/// Build positioned runs from parsed content-stream operations.
///
/// `decode` turns string bytes into text given the current font resource
/// name.
pub fn runs_from_operations<F>(ops: &[ContentOp], decode: F) -> Vec<TextRun>
where
    F: Fn(&str, &[u8]) -> String,
{
    let mut runs = Vec::new();
    let mut gs = MatrixStack::identity();
    let mut ts = TextState::default();

    for op in ops {
        match op.operator.as_str() {
            "q" => gs.push(),
            "Q" => {
                gs.pop();
            }
            "cm" => {
                if let Some(m) = AffineMatrix::from_operands(&numbers(&op.operands)) {
                    gs.concatenate(&m);
                }
            }
            "BT" => {
                ts.in_text = true;
                ts.tm = AffineMatrix::identity();
                ts.tlm = AffineMatrix::identity();
            }
            "ET" => ts.in_text = false,
            "Tf" => {
                if let Some(name) = op.operands.first().and_then(Operand::as_name) {
                    ts.font = name.to_string();
                }
                if let Some(size) = op.operands.get(1).and_then(Operand::as_number) {
                    ts.size = size;
                }
            }
            "TL" => {
                if let Some(l) = op.operands.first().and_then(Operand::as_number) {
                    ts.leading = l;
                }
            }
            "Td" | "TD" => {
                if let [tx, ty] = numbers(&op.operands).as_slice() {
                    if op.operator == "TD" {
                        ts.leading = -ty;
                    }
                    ts.move_line(*tx, *ty);
                }
            }
            "Tm" => {
                if let Some(m) = AffineMatrix::from_operands(&numbers(&op.operands)) {
                    ts.tlm = m;
                    ts.tm = m;
                }
            }
            "T*" => ts.next_line(),
            "Tj" => {
                if let Some(bytes) = op.operands.first().and_then(Operand::as_bytes) {
                    let text = decode(ts.font.as_str(), bytes);
                    ts.show(text, 0.0, &gs.current(), &mut runs);
                }
            }
            "TJ" => {
                if let Some(Operand::Array(items)) = op.operands.first() {
                    let mut combined = String::new();
                    let mut adjustment = 0.0;
                    for item in items {
                        match item {
                            Operand::Str(bytes) => combined.push_str(&decode(ts.font.as_str(), bytes)),
                            other => {
                                let Some(n) = other.as_number() else {
                                    continue;
                                };
                                adjustment -= n / 1000.0 * ts.size;
                                // Large negative values are word gaps
                                if -n > TJ_SPACE_THRESHOLD
                                    && combined
                                        .chars()
                                        .last()
                                        .is_some_and(|c| !c.is_whitespace() && !is_spaceless_script_char(c))
                                {
                                    combined.push(' ');
                                }
                            }
                        }
                    }
                    ts.show(combined, adjustment, &gs.current(), &mut runs);
                }
            }
            "'" | "\"" => {
                ts.next_line();
                let text_idx = if op.operator == "\"" { 2 } else { 0 };
                if let Some(bytes) = op.operands.get(text_idx).and_then(Operand::as_bytes) {
                    let text = decode(ts.font.as_str(), bytes);
                    ts.show(text, 0.0, &gs.current(), &mut runs);
                }
            }
            _ => {}
        }
    }

    runs
}

/// Build positioned runs straight from content stream bytes.
///
/// Bytes the parser cannot make sense of are skipped; the text around them
/// is kept.
pub fn runs_from_content<F>(data: &[u8], decode: F) -> Vec<TextRun>
where
    F: Fn(&str, &[u8]) -> String,
{
    runs_from_operations(&operations(data), decode)
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and Extension A
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    // CJK Extensions B-F
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana and Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}
