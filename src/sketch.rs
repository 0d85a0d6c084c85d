use crate::error::SketchError;

/// Operations shared by all sketch kinds, used by set-algebra algorithms such as
/// [`intersect`](crate::intersection::intersect).
pub trait Sketch: Clone {
    /// Number of bits used for register index
    fn precision(&self) -> u8;

    /// Bias corrected cardinality estimate
    fn estimate(&self) -> f64;

    /// Merge `rhs` into `self`, failing without mutation on precision mismatch.
    fn combine(&mut self, rhs: &Self) -> Result<(), SketchError>;

    /// Cardinality estimate rounded to the nearest integer
    fn size(&self) -> u64 {
        self.estimate().round() as u64
    }

    /// Return union of `self` and `rhs` leaving both operands untouched.
    fn union(&self, rhs: &Self) -> Result<Self, SketchError> {
        let mut union = self.clone();
        union.combine(rhs)?;
        Ok(union)
    }
}
