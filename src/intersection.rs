//! ## Intersection estimation
//! HyperLogLog sketches natively support only union and cardinality, so intersection
//! of `k` sketches is estimated with the inclusion-exclusion principle:
//!
//! `|A1 ∩ ... ∩ Ak| = Σ (-1)^(|S| + 1) · |∪ S|` over all non-empty subsets `S`.
//!
//! Every subset union is computed on a fresh copy, so caller-owned sketches are never
//! mutated. The cost is `2^k - 1` unions which is fine for the handful of operands
//! intersections are used with.

use log::{debug, warn};

use crate::error::SketchError;
use crate::sketch::Sketch;

/// Maximum number of operands accepted by [`intersect`]
pub const MAX_INTERSECT_OPERANDS: usize = 24;

/// Estimate cardinality of the intersection of all `sketches`.
///
/// Returns 0 for fewer than two operands, intersection needs at least two sets.
/// Negative sums caused by estimation noise are clamped to 0.
pub fn intersect<S: Sketch>(sketches: &[&S]) -> Result<u64, SketchError> {
    let k = sketches.len();
    if k < 2 {
        return Ok(0);
    }
    if k > MAX_INTERSECT_OPERANDS {
        return Err(SketchError::TooManyOperands(k));
    }

    let precision = sketches[0].precision();
    if let Some(other) = sketches.iter().find(|s| s.precision() != precision) {
        warn!(
            "refusing to intersect sketches with precisions {} and {}",
            precision,
            other.precision()
        );
        return Err(SketchError::PrecisionMismatch {
            left: precision,
            right: other.precision(),
        });
    }

    debug!("intersecting {} sketches through {} subset unions", k, (1usize << k) - 1);

    let mut sum = 0.0;
    for subset in 1..(1usize << k) {
        let estimate = subset_union(sketches, subset)?.estimate();
        if subset.count_ones() % 2 == 1 {
            sum += estimate;
        } else {
            sum -= estimate;
        }
    }

    Ok(sum.max(0.0).round() as u64)
}

/// Return union of sketches selected by non-empty `subset` bit mask.
fn subset_union<S: Sketch>(sketches: &[&S], subset: usize) -> Result<S, SketchError> {
    let first = subset.trailing_zeros() as usize;
    let mut union = sketches[first].clone();
    for (i, sketch) in sketches.iter().enumerate().skip(first + 1) {
        if subset & (1 << i) != 0 {
            union.combine(sketch)?;
        }
    }
    Ok(union)
}

/// Estimate cardinality of the intersection of the given sketches.
///
/// ```
/// use partitioned_sketch::{intersect, CardinalitySketch};
///
/// let mut a = CardinalitySketch::<wyhash::WyHash>::new(12).unwrap();
/// let mut b = CardinalitySketch::<wyhash::WyHash>::new(12).unwrap();
/// a.insert("x");
/// b.insert("y");
/// assert_eq!(intersect!(&a).unwrap(), 0);
/// assert!(intersect!(&a, &b).unwrap() <= 1);
/// ```
#[macro_export]
macro_rules! intersect {
    () => {
        ::core::result::Result::<u64, $crate::SketchError>::Ok(0)
    };
    ($($sketch:expr),+ $(,)?) => {
        $crate::intersection::intersect(&[$($sketch),+])
    };
}
