use thiserror::Error;

/// Errors surfaced by sketch construction, combination and (de)serialization.
#[derive(Debug, Error)]
pub enum SketchError {
    /// Register array length is zero or not a power of two.
    #[error("register array length must be a non-zero power of two, got {0}")]
    InvalidLength(usize),

    /// Precision is outside of the supported `[MIN_PRECISION..=MAX_PRECISION]` range.
    #[error("precision must be in [{}..={}] range, got {0}", crate::MIN_PRECISION, crate::MAX_PRECISION)]
    InvalidPrecision(u8),

    /// Operands were built with different precisions.
    #[error("precision mismatch: {left} != {right}")]
    PrecisionMismatch { left: u8, right: u8 },

    /// Intersection requested over more operands than subset enumeration allows.
    #[error("cannot intersect {0} sketches, at most {} are supported", crate::intersection::MAX_INTERSECT_OPERANDS)]
    TooManyOperands(usize),

    /// Reading or writing the dense register format failed.
    #[error("dense register serialization failed: {0}")]
    Serialization(#[from] std::io::Error),
}
