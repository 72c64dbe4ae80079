//! Content stream walking.
//!
//! The walker understands only what it needs to find image placements:
//! `q`, `Q`, `cm` and `Do`. Other operations are parsed so their operands
//! are consumed correctly, then ignored. Bad input is skipped and recorded
//! as a [`Degradation`]; a walk always reaches the end of the stream.

use super::catalog::ResourceCatalog;
use super::content::{ContentItem, ContentOp, ContentParser, Operand};
use super::matrix::{AffineMatrix, MatrixStack};
use crate::error::Degradation;

/// A `Do` that painted a cataloged image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    /// XObject resource name
    pub name: String,
    /// CTM in effect at the `Do`
    pub matrix: AffineMatrix,
    /// Zero-based page index
    pub page_index: usize,
    /// Pixel size from a dimension-hint `cm` seen before the `Do`
    pub dimension_hint: Option<(f64, f64)>,
    /// Byte offset of the `Do` operator
    pub offset: usize,
}

/// Result of walking one content stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkOutput {
    /// Placements in stream order
    pub placements: Vec<ImagePlacement>,
    /// Problems skipped over
    pub degradations: Vec<Degradation>,
}

/// Walks a content stream and reports where cataloged images are painted.
pub struct ContentStreamWalker<'a> {
    catalog: &'a ResourceCatalog,
    page_index: usize,
    hint_threshold: f64,
}

impl<'a> ContentStreamWalker<'a> {
    /// Create a walker for one page.
    pub fn new(catalog: &'a ResourceCatalog, page_index: usize, hint_threshold: f64) -> Self {
        Self {
            catalog,
            page_index,
            hint_threshold,
        }
    }

    /// Walk decoded content stream bytes.
    pub fn walk(&self, data: &[u8]) -> WalkOutput {
        let mut out = WalkOutput::default();
        let mut stack = MatrixStack::identity();
        let mut pending_hint: Option<(f64, f64)> = None;

        for item in ContentParser::new(data) {
            let ContentOp {
                operator,
                operands,
                offset,
            } = match item {
                ContentItem::Op(op) => op,
                ContentItem::Invalid { text, offset } => {
                    log::debug!("Skipping unparseable token '{}' at byte {}", text, offset);
                    out.degradations.push(Degradation::UnparseableOperator {
                        operator: text,
                        offset,
                    });
                    continue;
                }
            };

            match operator.as_str() {
                "q" => stack.push(),
                "Q" => {
                    if !stack.pop() {
                        out.degradations.push(Degradation::UnbalancedRestore { offset });
                    }
                    pending_hint = None;
                }
                "cm" => match matrix_operands(&operands) {
                    Some(m) if m.is_dimension_hint(self.hint_threshold) => {
                        log::trace!("Dimension hint {}x{} at byte {}", m.a, m.d, offset);
                        pending_hint = Some((m.a, m.d));
                    }
                    Some(m) => stack.concatenate(&m),
                    None => {
                        log::debug!("Malformed cm at byte {}", offset);
                        out.degradations.push(Degradation::UnparseableOperator {
                            operator: operator.clone(),
                            offset,
                        });
                    }
                },
                "Do" => match operands.last().and_then(Operand::as_name) {
                    Some(name) if self.catalog.contains(name) => {
                        let placement = ImagePlacement {
                            name: name.to_string(),
                            matrix: stack.current(),
                            page_index: self.page_index,
                            dimension_hint: pending_hint.take(),
                            offset,
                        };
                        log::trace!("/{} Do with CTM {:?}", placement.name, placement.matrix);
                        out.placements.push(placement);
                    }
                    Some(name) => {
                        log::trace!("/{} Do is not a cataloged image", name);
                    }
                    None => {
                        out.degradations.push(Degradation::UnparseableOperator {
                            operator: operator.clone(),
                            offset,
                        });
                    }
                },
                _ => {}
            }
        }

        out
    }
}

/// The six numbers preceding a `cm`, when that is exactly what was given.
fn matrix_operands(operands: &[Operand]) -> Option<AffineMatrix> {
    let values: Vec<f64> = operands
        .iter()
        .map(Operand::as_number)
        .collect::<Option<Vec<_>>>()?;
    AffineMatrix::from_operands(&values)
}
