//! Affine transforms and the graphics-state stack.
//!
//! Matrices follow the PDF layout `[a b c d e f]`, mapping a point as
//! `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.

/// A 2D affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMatrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for AffineMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineMatrix {
    /// Create a matrix from its six components.
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// The identity transform.
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// Build from six operands, as read off a `cm` or `Tm` operator.
    pub fn from_operands(ops: &[f64]) -> Option<Self> {
        match ops {
            [a, b, c, d, e, f] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    /// A pure translation.
    pub const fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self ∘ other`: the transform that applies `other` first, then `self`.
    pub fn compose(&self, other: &AffineMatrix) -> AffineMatrix {
        AffineMatrix {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    /// Map a point.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Whether all components are finite.
    pub fn is_finite(&self) -> bool {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Whether this is a `[w 0 0 h 0 0]` matrix with both diagonal terms
    /// above `threshold`.
    ///
    /// Some producers emit such a `cm` only to record an image's pixel size.
    /// It is indistinguishable from a real large scale, so this is a
    /// heuristic.
    pub fn is_dimension_hint(&self, threshold: f64) -> bool {
        self.b == 0.0
            && self.c == 0.0
            && self.e == 0.0
            && self.f == 0.0
            && self.a > threshold
            && self.d > threshold
    }
}

/// Concatenate two matrices: the result applies `m2` and then `m1`.
pub fn concatenate(m1: &AffineMatrix, m2: &AffineMatrix) -> AffineMatrix {
    m1.compose(m2)
}

/// The current transform plus the `q`/`Q` save stack.
#[derive(Debug, Clone, Default)]
pub struct MatrixStack {
    current: AffineMatrix,
    saved: Vec<AffineMatrix>,
}

impl MatrixStack {
    /// A stack whose current transform is the identity.
    pub fn identity() -> Self {
        Self::default()
    }

    /// The current transform.
    pub fn current(&self) -> AffineMatrix {
        self.current
    }

    /// Number of saved states.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Apply a `cm`: `new` is applied before everything already in effect.
    pub fn concatenate(&mut self, new: &AffineMatrix) {
        self.current = self.current.compose(new);
    }

    /// Save the current transform (`q`).
    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Restore the last saved transform (`Q`).
    ///
    /// Returns `false` and leaves the current transform unchanged when
    /// nothing was saved.
    pub fn pop(&mut self) -> bool {
        match self.saved.pop() {
            Some(m) => {
                self.current = m;
                true
            }
            None => {
                log::warn!("Q with empty graphics-state stack; keeping current transform");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(p: (f64, f64), q: (f64, f64)) -> bool {
        (p.0 - q.0).abs() < 1e-9 && (p.1 - q.1).abs() < 1e-9
    }

    #[test]
    fn test_concatenate_applies_second_then_first() {
        let m1 = AffineMatrix::new(0.0, 1.0, -1.0, 0.0, 5.0, 7.0);
        let m2 = AffineMatrix::new(2.0, 0.0, 0.0, 3.0, 1.0, -1.0);
        let composed = concatenate(&m1, &m2);

        for &(x, y) in &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (3.5, -2.0)] {
            let (x2, y2) = m2.apply(x, y);
            assert!(approx(composed.apply(x, y), m1.apply(x2, y2)));
        }

        // Hand-computed: m2 maps (1, 1) to (3, 2); m1 maps that to (3, 10).
        assert!(approx(composed.apply(1.0, 1.0), (3.0, 10.0)));
    }

    #[test]
    fn test_identity_is_neutral() {
        let m = AffineMatrix::new(1.5, 0.2, -0.3, 2.0, 10.0, 20.0);
        assert_eq!(m.compose(&AffineMatrix::identity()), m);
        assert_eq!(AffineMatrix::identity().compose(&m), m);
    }

    #[test]
    fn test_nested_cm_composes_inner_first() {
        let mut stack = MatrixStack::identity();
        stack.concatenate(&AffineMatrix::translation(100.0, 200.0));
        stack.concatenate(&AffineMatrix::new(50.0, 0.0, 0.0, 40.0, 0.0, 0.0));

        let ctm = stack.current();
        assert_eq!(ctm, AffineMatrix::new(50.0, 0.0, 0.0, 40.0, 100.0, 200.0));
    }

    #[test]
    fn test_balanced_push_pop_restores() {
        let mut stack = MatrixStack::identity();
        stack.concatenate(&AffineMatrix::new(2.0, 0.0, 0.0, 2.0, 3.0, 4.0));
        let before = stack.current();

        for depth in 1..=8 {
            stack.push();
            stack.concatenate(&AffineMatrix::new(1.1, 0.3, -0.2, 0.9, depth as f64, 1.0));
        }
        for _ in 0..8 {
            assert!(stack.pop());
        }

        assert_eq!(stack.current(), before);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_pop_on_empty_stack_is_noop() {
        let mut stack = MatrixStack::identity();
        stack.concatenate(&AffineMatrix::translation(5.0, 6.0));
        let before = stack.current();

        assert!(!stack.pop());
        assert_eq!(stack.current(), before);
    }

    #[test]
    fn test_dimension_hint_detection() {
        assert!(AffineMatrix::new(500.0, 0.0, 0.0, 500.0, 0.0, 0.0).is_dimension_hint(100.0));
        assert!(!AffineMatrix::new(500.0, 0.0, 0.0, 500.0, 10.0, 0.0).is_dimension_hint(100.0));
        assert!(!AffineMatrix::new(80.0, 0.0, 0.0, 500.0, 0.0, 0.0).is_dimension_hint(100.0));
        assert!(!AffineMatrix::new(-500.0, 0.0, 0.0, 500.0, 0.0, 0.0).is_dimension_hint(100.0));
    }

    #[test]
    fn test_from_operands() {
        assert!(AffineMatrix::from_operands(&[1.0, 0.0, 0.0, 1.0, 0.0]).is_none());
        assert_eq!(
            AffineMatrix::from_operands(&[1.0, 0.0, 0.0, 1.0, 2.0, 3.0]),
            Some(AffineMatrix::translation(2.0, 3.0))
        );
    }
}
